//! Binary exposure masks derived from hazard-duration rasters.
//!
//! A duration raster counts 3-hourly samples during which a cell experienced
//! winds at or above a given category. Thresholding it at a cutoff yields a
//! binary "exposed this year" mask; OR-ing yearly masks over a window yields
//! an "ever exposed" mask.
use crate::dimensions::{LandfallCutoff, WindCategory};
use crate::error::ExposureError;
use crate::grid::Grid;
use crate::raster::{MaskLayer, RasterLayer, align};
use crate::source::RasterSource;
use log::debug;
use ndarray::Zip;
use std::ops::RangeInclusive;

/// Temporal sampling of the duration rasters: one sample every 3 hours.
///
/// Made explicit here rather than encoded in dataset file names; dividing a
/// sample count by this converts it to days.
pub const SAMPLES_PER_DAY: f64 = 8.0;

/// Build the binary exposure mask for one duration raster.
///
/// `mask[r, c] = duration[r, c] >= cutoff`, with negative/invalid durations
/// treated as zero first. The cutoff is in duration samples.
pub fn threshold_mask(duration: &RasterLayer, cutoff: f64) -> MaskLayer {
    let data = duration.data().mapv(|v| v.max(0.0) >= cutoff);
    MaskLayer::new(*duration.grid(), data).expect("layer and mask share a grid")
}

/// Build the mask of cells with no exposure at all this year.
pub fn unexposed_mask(duration: &RasterLayer) -> MaskLayer {
    let data = duration.data().mapv(|v| v.max(0.0) == 0.0);
    MaskLayer::new(*duration.grid(), data).expect("layer and mask share a grid")
}

/// Convert a duration raster from 3-hourly sample counts to days.
///
/// Negative/invalid durations are clamped to zero.
pub fn person_day_factor(duration: &RasterLayer) -> RasterLayer {
    let data = duration.data().mapv(|v| v.max(0.0) / SAMPLES_PER_DAY);
    RasterLayer::new(*duration.grid(), data).expect("conversion preserves shape")
}

/// Union per-year exposure masks over an inclusive year range.
///
/// A cell is marked exposed if any year's duration meets or exceeds one
/// sample. Year order does not affect the result; the per-cell OR is
/// commutative and idempotent. A year that cannot be loaded is fatal to the
/// whole accumulation: treating it as zero exposure would silently corrupt
/// "ever exposed" semantics downstream.
pub fn accumulate_years(
    source: &dyn RasterSource,
    grid: &Grid,
    years: RangeInclusive<u32>,
    wind: WindCategory,
    landfall: LandfallCutoff,
) -> Result<MaskLayer, ExposureError> {
    let mut ever_exposed = MaskLayer::all_false(*grid);
    for year in years {
        let raw = source
            .duration(year, wind, landfall)
            .map_err(|source| ExposureError::MissingYearData { year, source })?;
        let duration = align(raw, grid)?;
        Zip::from(ever_exposed.data_mut())
            .and(duration.data())
            .for_each(|m, &d| {
                if d >= 1.0 {
                    *m = true;
                }
            });
        debug!("Accumulated exposure for year {year} ({wind})");
    }

    Ok(ever_exposed)
}
