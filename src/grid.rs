//! The geographic grid raster layers are expressed against.
//!
//! A grid is regular in lon/lat: corner coordinates are the centres of the
//! first and last cells, so the resolution is `(max - min) / (count - 1)`.
//! Row 0 is the northernmost row; layers stored south-up are flipped on
//! alignment before any indexing happens.
use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// A regular lon/lat grid.
///
/// Two grids are interchangeable only if all six parameters are equal;
/// there is no resampling anywhere in the crate. Deserialization routes
/// through [`Grid::new`] so a settings file cannot produce a degenerate
/// grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GridDef")]
pub struct Grid {
    /// Longitude of the centre of the first (westernmost) column
    pub min_lon: f64,
    /// Latitude of the centre of the last (southernmost) row
    pub min_lat: f64,
    /// Longitude of the centre of the last (easternmost) column
    pub max_lon: f64,
    /// Latitude of the centre of the first (northernmost) row
    pub max_lat: f64,
    /// Number of rows (latitudes)
    pub rows: usize,
    /// Number of columns (longitudes)
    pub cols: usize,
}

/// The unvalidated serialized form of a [`Grid`]
#[derive(Deserialize)]
struct GridDef {
    min_lon: f64,
    min_lat: f64,
    max_lon: f64,
    max_lat: f64,
    rows: usize,
    cols: usize,
}

impl TryFrom<GridDef> for Grid {
    type Error = anyhow::Error;

    fn try_from(def: GridDef) -> Result<Self> {
        Grid::new(
            def.min_lon,
            def.min_lat,
            def.max_lon,
            def.max_lat,
            def.rows,
            def.cols,
        )
    }
}

impl Grid {
    /// Create a grid, validating its parameters.
    pub fn new(
        min_lon: f64,
        min_lat: f64,
        max_lon: f64,
        max_lat: f64,
        rows: usize,
        cols: usize,
    ) -> Result<Self> {
        ensure!(rows >= 2 && cols >= 2, "Grid must have at least 2x2 cells");
        ensure!(
            max_lon > min_lon && max_lat > min_lat,
            "Grid bounds must be increasing"
        );

        Ok(Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
            rows,
            cols,
        })
    }

    /// The ~1km global population grid
    pub fn worldpop() -> Self {
        Self {
            min_lon: -180.0012,
            min_lat: -71.99208,
            max_lon: 179.9987,
            max_lat: 84.00792,
            rows: 18720,
            cols: 43200,
        }
    }

    /// The native grid of the relative deprivation index dataset.
    ///
    /// Not interchangeable with [`Grid::worldpop`]; the deprivation layer
    /// must be regridded to the reference grid before it is loaded.
    pub fn deprivation_native() -> Self {
        Self {
            min_lon: -180.0,
            min_lat: -56.0,
            max_lon: 179.8,
            max_lat: 82.18,
            rows: 16580,
            cols: 43178,
        }
    }

    /// Array shape `(rows, cols)` of layers on this grid
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Latitude step between adjacent rows
    pub fn lat_res(&self) -> f64 {
        (self.max_lat - self.min_lat) / (self.rows - 1) as f64
    }

    /// Longitude step between adjacent columns
    pub fn lon_res(&self) -> f64 {
        (self.max_lon - self.min_lon) / (self.cols - 1) as f64
    }

    /// Latitude of the centre of `row` (row 0 is northernmost)
    pub fn lat(&self, row: usize) -> f64 {
        self.max_lat - row as f64 * self.lat_res()
    }

    /// Longitude of the centre of `col`
    pub fn lon(&self, col: usize) -> f64 {
        self.min_lon + col as f64 * self.lon_res()
    }

    /// Rows whose centres may fall in the latitude band, padded by one row
    /// on each side and clamped to the grid.
    ///
    /// The range may be empty when the band lies entirely off-grid.
    pub fn row_span(&self, band_min_lat: f64, band_max_lat: f64) -> RangeInclusive<usize> {
        let top = (self.max_lat - band_max_lat) / self.lat_res();
        let bottom = (self.max_lat - band_min_lat) / self.lat_res();
        let first = (top.floor() - 1.0).max(0.0) as usize;
        let last = ((bottom.ceil() + 1.0).max(0.0) as usize).min(self.rows - 1);

        first..=last
    }

    /// Columns whose centres may fall in the longitude band, padded by one
    /// column on each side and clamped to the grid.
    pub fn col_span(&self, band_min_lon: f64, band_max_lon: f64) -> RangeInclusive<usize> {
        let left = (band_min_lon - self.min_lon) / self.lon_res();
        let right = (band_max_lon - self.min_lon) / self.lon_res();
        let first = (left.floor() - 1.0).max(0.0) as usize;
        let last = ((right.ceil() + 1.0).max(0.0) as usize).min(self.cols - 1);

        first..=last
    }

    /// Whether layers on `other` can be used directly against this grid
    pub fn is_compatible(&self, other: &Grid) -> bool {
        self == other
    }
}
