//! Raster layers: decoded 2-D arrays tied to a grid.
//!
//! Layers arrive from sources as [`RawRaster`]s carrying the producer's row
//! orientation. [`align`] normalizes them to north-up on the caller's
//! reference grid; everything downstream indexes north-up only. Source
//! datasets encode missing cells as negative sentinels or huge fill values,
//! so layers are cleaned with [`RasterLayer::normalize_counts`] or
//! [`RasterLayer::normalize_weights`] depending on how they are aggregated.
use crate::error::ExposureError;
use crate::grid::Grid;
use anyhow::{Result, ensure};
use ndarray::{Array2, Axis};

/// Values at or above this are treated as dataset fill values, not data.
pub const DEFAULT_VALUE_CEILING: f64 = 1e10;

/// Row order of a stored raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Row 0 is the northernmost row
    NorthUp,
    /// Row 0 is the southernmost row
    SouthUp,
}

/// A decoded raster as its producer stored it.
#[derive(Debug, Clone)]
pub struct RawRaster {
    /// The grid the layer was produced on
    pub grid: Grid,
    /// Stored row order
    pub orientation: Orientation,
    /// Cell values, in stored row order
    pub data: Array2<f64>,
}

/// A north-up raster layer on a known grid.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterLayer {
    grid: Grid,
    data: Array2<f64>,
}

impl RasterLayer {
    /// Create a layer, checking the array shape against the grid.
    pub fn new(grid: Grid, data: Array2<f64>) -> Result<Self> {
        ensure!(
            data.dim() == grid.shape(),
            "Layer shape {:?} does not match grid shape {:?}",
            data.dim(),
            grid.shape()
        );

        Ok(Self { grid, data })
    }

    /// An all-zero layer on `grid`
    pub fn zeros(grid: Grid) -> Self {
        Self {
            data: Array2::zeros(grid.shape()),
            grid,
        }
    }

    /// The grid this layer is expressed against
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// The cell values
    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    /// Mutable access to the cell values
    pub fn data_mut(&mut self) -> &mut Array2<f64> {
        &mut self.data
    }

    /// Value at `(row, col)`
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[[row, col]]
    }

    /// Clean a count layer: sentinel and fill cells become zero.
    ///
    /// Used for layers that are summed, where an invalid cell must simply
    /// contribute nothing.
    pub fn normalize_counts(mut self, ceiling: f64) -> Self {
        self.data
            .mapv_inplace(|v| if v <= 0.0 || v >= ceiling || v.is_nan() { 0.0 } else { v });
        self
    }

    /// Clean a weight layer: sentinel and fill cells become NaN.
    ///
    /// Used for layers feeding weighted averages, where an invalid cell must
    /// be excluded rather than act as a zero weight.
    pub fn normalize_weights(mut self, ceiling: f64) -> Self {
        self.data
            .mapv_inplace(|v| if v <= 0.0 || v >= ceiling { f64::NAN } else { v });
        self
    }
}

/// A north-up boolean layer on a known grid.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskLayer {
    grid: Grid,
    data: Array2<bool>,
}

impl MaskLayer {
    /// Create a mask, checking the array shape against the grid.
    pub fn new(grid: Grid, data: Array2<bool>) -> Result<Self> {
        ensure!(
            data.dim() == grid.shape(),
            "Mask shape {:?} does not match grid shape {:?}",
            data.dim(),
            grid.shape()
        );

        Ok(Self { grid, data })
    }

    /// An all-false mask on `grid`
    pub fn all_false(grid: Grid) -> Self {
        Self {
            data: Array2::from_elem(grid.shape(), false),
            grid,
        }
    }

    /// The grid this mask is expressed against
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// The cell values
    pub fn data(&self) -> &Array2<bool> {
        &self.data
    }

    /// Mutable access to the cell values
    pub fn data_mut(&mut self) -> &mut Array2<bool> {
        &mut self.data
    }

    /// Value at `(row, col)`
    pub fn get(&self, row: usize, col: usize) -> bool {
        self.data[[row, col]]
    }

    /// Number of true cells
    pub fn count_true(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }
}

/// Align a stored raster to the reference grid, north-up.
///
/// Rejects layers on a different grid; there is no resampling. South-up
/// layers have their row order inverted.
pub fn align(mut raw: RawRaster, target: &Grid) -> Result<RasterLayer, ExposureError> {
    if !raw.grid.is_compatible(target) {
        return Err(ExposureError::GridMismatch {
            detail: format!("layer grid {:?} != reference grid {target:?}", raw.grid),
        });
    }
    if raw.data.dim() != target.shape() {
        return Err(ExposureError::GridMismatch {
            detail: format!(
                "layer shape {:?} != grid shape {:?}",
                raw.data.dim(),
                target.shape()
            ),
        });
    }
    if raw.orientation == Orientation::SouthUp {
        raw.data.invert_axis(Axis(0));
    }

    Ok(RasterLayer {
        grid: *target,
        data: raw.data,
    })
}
