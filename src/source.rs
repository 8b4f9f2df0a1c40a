//! Abstract raster-loading collaborators.
//!
//! The aggregation engine consumes decoded 2-D arrays plus grid metadata; it
//! does not own raster file formats. Implementations of [`RasterSource`]
//! provide keyed loads for the layer classes the analyses need.
use crate::dimensions::{AgeBand, Gender, LandfallCutoff, WindCategory};
use crate::raster::{MaskLayer, RawRaster};
use anyhow::Result;

pub mod csv_dir;
pub mod memory;

pub use csv_dir::CsvDirSource;
pub use memory::InMemorySource;

/// A supplier of decoded raster layers.
///
/// Layers are returned as stored ([`RawRaster`] carries the producer's row
/// orientation); callers align them to their reference grid before use.
/// `Sync` because sources are shared read-only across batch workers.
pub trait RasterSource: Sync {
    /// Total population for `year`
    fn population(&self, year: u32) -> Result<RawRaster>;

    /// Population for `year` stratified by age band and gender
    fn population_age_gender(
        &self,
        year: u32,
        age: AgeBand,
        gender: Gender,
    ) -> Result<RawRaster>;

    /// Hazard duration (3-hourly sample counts) for `year` at the given
    /// wind category and landfall cutoff
    fn duration(
        &self,
        year: u32,
        wind: WindCategory,
        landfall: LandfallCutoff,
    ) -> Result<RawRaster>;

    /// The relative deprivation index layer, produced at the reference grid
    fn deprivation(&self) -> Result<RawRaster>;

    /// The global validity mask (true where a cell carries valid land data)
    fn reference_mask(&self) -> Result<MaskLayer>;
}
