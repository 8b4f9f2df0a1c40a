//! Structured errors for the aggregation engine.
//!
//! Most fallible paths use `anyhow` with context strings, matching the rest
//! of the crate. The variants here exist where callers need to distinguish
//! failure kinds: a bad geometry is skippable, a grid mismatch or a missing
//! hazard year is not.
use thiserror::Error;

/// Errors the aggregation engine distinguishes by kind.
#[derive(Debug, Error)]
pub enum ExposureError {
    /// A region geometry that cannot be rasterized
    #[error("Region {region} has invalid geometry: {reason}")]
    Geometry {
        /// Name of the offending region
        region: String,
        /// What was wrong with the geometry
        reason: String,
    },

    /// A raster layer whose grid does not match the reference grid
    #[error("Grid mismatch: {detail}")]
    GridMismatch {
        /// Which grids disagreed and how
        detail: String,
    },

    /// A hazard year that could not be loaded during a multi-year
    /// accumulation. Treating it as zero exposure would silently corrupt
    /// "ever exposed" semantics, so it aborts the accumulation.
    #[error("Missing hazard data for year {year}")]
    MissingYearData {
        /// The year whose layer failed to load
        year: u32,
        /// The underlying load failure
        #[source]
        source: anyhow::Error,
    },
}
