//! Regions are named administrative or continental boundary polygons.
//!
//! A region collection (continents, countries, sub-national areas) is read
//! once at startup from a boundary dataset and is immutable afterwards. The
//! core never parses boundary file formats itself; collections arrive as
//! ordered `(name, geometry)` sequences.
use crate::id::define_id_type;
use anyhow::{Context, Result};
use geo::MultiPolygon;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

define_id_type! {RegionID}

/// A map of [`Region`]s, keyed by region ID, preserving collection order
pub type RegionMap = IndexMap<RegionID, Region>;

/// A named boundary polygon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Unique name within its collection (e.g. "Oceania", "Japan")
    pub id: RegionID,
    /// Boundary geometry in lon/lat coordinates
    pub geometry: MultiPolygon<f64>,
}

/// Read an ordered region collection from a JSON boundary file.
///
/// The boundary dataset itself (shapefiles etc.) is decoded upstream; this
/// reads the pre-extracted `(name, geometry)` sequence. Order is preserved
/// because index building is keep-first on duplicate names.
pub fn read_region_file(file_path: &Path) -> Result<Vec<Region>> {
    let file = File::open(file_path)
        .with_context(|| format!("Failed to open {}", file_path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse {}", file_path.display()))
}
