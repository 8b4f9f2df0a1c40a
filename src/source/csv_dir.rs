//! A raster source backed by a directory of headerless CSV grids.
//!
//! This keeps real raster formats outside the crate while still giving the
//! CLI something concrete to run against. File names follow the upstream
//! dataset conventions: `duration_{year}_{wind}.csv` (with a `_6h`/`_12h`
//! suffix for limited landfall variants), `ppp_{year}.csv`,
//! `global_{gender}_{age}_{year}.csv`, `grdi.csv` and `global_mask.csv`.
//!
//! Duration and deprivation grids are stored south-up by their producers;
//! population and the validity mask are stored north-up. The tags here
//! record that so alignment can normalize all layers to north-up.
use super::RasterSource;
use crate::dimensions::{AgeBand, Gender, LandfallCutoff, WindCategory};
use crate::grid::Grid;
use crate::raster::{MaskLayer, Orientation, RawRaster};
use anyhow::{Context, Result, ensure};
use ndarray::Array2;
use std::path::{Path, PathBuf};

/// Subdirectory for duration rasters
const DURATION_DIR: &str = "duration";
/// Subdirectory for population rasters
const POPULATION_DIR: &str = "worldpop";
/// Subdirectory for the deprivation index and the validity mask
const MISC_DIR: &str = "misc";

/// A [`RasterSource`] reading CSV-encoded grids below a data directory.
#[derive(Debug, Clone)]
pub struct CsvDirSource {
    root: PathBuf,
    grid: Grid,
}

impl CsvDirSource {
    /// Create a source rooted at `root`, expecting layers on `grid`
    pub fn new(root: &Path, grid: Grid) -> Self {
        Self {
            root: root.to_path_buf(),
            grid,
        }
    }

    /// Read a headerless CSV of numbers into a grid-shaped array
    fn read_grid_csv(&self, file_path: &Path) -> Result<Array2<f64>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(file_path)
            .with_context(|| format!("Failed to open {}", file_path.display()))?;

        let (rows, cols) = self.grid.shape();
        let mut values = Vec::with_capacity(rows * cols);
        for record in reader.records() {
            let record =
                record.with_context(|| format!("Error reading {}", file_path.display()))?;
            for field in record.iter() {
                let value: f64 = field.trim().parse().with_context(|| {
                    format!("Invalid number {field:?} in {}", file_path.display())
                })?;
                values.push(value);
            }
        }
        ensure!(
            values.len() == rows * cols,
            "{} contains {} values; expected {}x{}",
            file_path.display(),
            values.len(),
            rows,
            cols
        );

        Ok(Array2::from_shape_vec((rows, cols), values).expect("length checked above"))
    }

    fn load(&self, relative: &str, orientation: Orientation) -> Result<RawRaster> {
        let data = self.read_grid_csv(&self.root.join(relative))?;
        Ok(RawRaster {
            grid: self.grid,
            orientation,
            data,
        })
    }

    /// The file stem for a duration raster; the unlimited-landfall variant
    /// carries no suffix
    fn duration_name(year: u32, wind: WindCategory, landfall: LandfallCutoff) -> String {
        match landfall {
            LandfallCutoff::Unlimited => format!("duration_{year}_{wind}.csv"),
            other => format!("duration_{year}_{wind}_{other}.csv"),
        }
    }
}

impl RasterSource for CsvDirSource {
    fn population(&self, year: u32) -> Result<RawRaster> {
        self.load(
            &format!("{POPULATION_DIR}/ppp_{year}.csv"),
            Orientation::NorthUp,
        )
    }

    fn population_age_gender(
        &self,
        year: u32,
        age: AgeBand,
        gender: Gender,
    ) -> Result<RawRaster> {
        self.load(
            &format!("{POPULATION_DIR}/global_{gender}_{age}_{year}.csv"),
            Orientation::NorthUp,
        )
    }

    fn duration(
        &self,
        year: u32,
        wind: WindCategory,
        landfall: LandfallCutoff,
    ) -> Result<RawRaster> {
        let name = Self::duration_name(year, wind, landfall);
        self.load(&format!("{DURATION_DIR}/{name}"), Orientation::SouthUp)
    }

    fn deprivation(&self) -> Result<RawRaster> {
        self.load(&format!("{MISC_DIR}/grdi.csv"), Orientation::SouthUp)
    }

    fn reference_mask(&self) -> Result<MaskLayer> {
        let raw = self.load(&format!("{MISC_DIR}/global_mask.csv"), Orientation::NorthUp)?;
        let data = raw.data.mapv(|v| v == 1.0);
        MaskLayer::new(self.grid, data)
    }
}
