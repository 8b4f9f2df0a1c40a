//! Spatial exposure aggregation for tropical-cyclone wind hazards.
//!
//! Combines a gridded population raster, per-category hazard-duration
//! rasters and administrative boundary polygons into population exposure
//! tables: exposed/unexposed population, person-day exposure and
//! population-weighted deprivation statistics per region, year and
//! wind-intensity threshold.
#![warn(missing_docs)]
pub mod aggregate;
pub mod analysis;
pub mod batch;
pub mod cli;
pub mod dimensions;
pub mod error;
pub mod exposure;
pub mod grid;
pub mod id;
pub mod log;
pub mod output;
pub mod raster;
pub mod region;
pub mod region_index;
pub mod settings;
pub mod source;

#[cfg(test)]
mod fixture;
