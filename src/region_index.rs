//! Correspondence between region geometries and grid-cell indices.
//!
//! Rasterizing a boundary polygon against the ~1km reference grid is
//! expensive, so the resulting row/column index arrays are built once per
//! region collection and persisted. All later aggregation slices rasters
//! through these cached indices instead of re-deriving geometry.
use crate::error::ExposureError;
use crate::grid::Grid;
use crate::raster::MaskLayer;
use crate::region::{Region, RegionID};
use anyhow::{Context, Result, ensure};
use geo::{BoundingRect, Contains, point};
use indexmap::IndexMap;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tempfile::NamedTempFile;

/// Grid-cell indices covered by one region, as parallel row/column arrays.
///
/// Invariant: the arrays have equal length and every entry is a valid index
/// into the grid the set was built against. An empty set is never stored;
/// regions with no matching cells are omitted from the collection entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionIndexSet {
    rows: Vec<u32>,
    cols: Vec<u32>,
}

/// Cached index sets for a region collection, keyed by region name.
///
/// A missing key means "no cells matched" for that region, which callers
/// must treat differently from "region present with zero exposure".
pub type RegionIndexMap = IndexMap<RegionID, RegionIndexSet>;

impl RegionIndexSet {
    /// Create an index set from parallel row/column arrays.
    pub fn new(rows: Vec<u32>, cols: Vec<u32>) -> Result<Self> {
        ensure!(
            rows.len() == cols.len(),
            "Row/col index arrays have different lengths"
        );
        Ok(Self { rows, cols })
    }

    /// Number of cells in the set
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the set contains no cells
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate over (row, col) cell indices
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.rows
            .iter()
            .zip(&self.cols)
            .map(|(&r, &c)| (r as usize, c as usize))
    }

    /// Check the parallel-arrays invariant (used when loading a cache)
    fn validate(&self, name: &RegionID) -> Result<()> {
        ensure!(
            self.rows.len() == self.cols.len(),
            "Region {name}: row/col index arrays have different lengths"
        );
        ensure!(!self.rows.is_empty(), "Region {name}: empty index set");
        Ok(())
    }
}

/// Rasterize one region against the reference grid, restricted to cells
/// where `reference_mask` is true.
///
/// Cells are selected by the cell-centre rule: a cell belongs to the region
/// if its centre lies inside the geometry.
fn rasterize_region(
    region: &Region,
    grid: &Grid,
    reference_mask: &MaskLayer,
) -> Result<RegionIndexSet, ExposureError> {
    let bounds = region
        .geometry
        .bounding_rect()
        .ok_or_else(|| ExposureError::Geometry {
            region: region.id.to_string(),
            reason: "geometry has no bounding rectangle".into(),
        })?;

    let mut rows = Vec::new();
    let mut cols = Vec::new();
    for row in grid.row_span(bounds.min().y, bounds.max().y) {
        let lat = grid.lat(row);
        for col in grid.col_span(bounds.min().x, bounds.max().x) {
            if !reference_mask.get(row, col) {
                continue;
            }
            let centre = point!(x: grid.lon(col), y: lat);
            if region.geometry.contains(&centre) {
                rows.push(row as u32);
                cols.push(col as u32);
            }
        }
    }

    Ok(RegionIndexSet { rows, cols })
}

/// Build index sets for a region collection against a reference grid.
///
/// Regions with invalid geometry or no matching cells are skipped and
/// logged, not stored as empty sets. A duplicate region name keeps the
/// first-built entry and reports the collision as a data-quality warning.
pub fn build_region_indices(
    regions: &[Region],
    grid: &Grid,
    reference_mask: &MaskLayer,
) -> Result<RegionIndexMap> {
    ensure!(
        reference_mask.grid().is_compatible(grid),
        "Reference mask grid does not match the reference grid"
    );

    let mut indices = RegionIndexMap::new();
    for region in regions {
        let index_set = match rasterize_region(region, grid, reference_mask) {
            Ok(set) => set,
            Err(err) => {
                warn!("Skipping region: {err}");
                continue;
            }
        };
        if index_set.is_empty() {
            warn!("Region {} has no cells on the reference grid", region.id);
            continue;
        }
        if indices.contains_key(&region.id) {
            warn!("Region {} already added; keeping first entry", region.id);
            continue;
        }

        info!("Added region {} ({} cells)", region.id, index_set.len());
        indices.insert(region.id.clone(), index_set);
    }

    Ok(indices)
}

/// Persist an index cache, atomically.
///
/// JSON round-trips the integer index arrays losslessly. The file is written
/// to a temporary sibling and renamed into place so that a crash mid-write
/// never leaves a readable-looking but truncated cache.
pub fn save_index_cache(file_path: &Path, indices: &RegionIndexMap) -> Result<()> {
    let dir = file_path.parent().context("Cache path has no parent")?;
    std::fs::create_dir_all(dir)?;
    let file = NamedTempFile::new_in(dir)?;
    serde_json::to_writer(file.as_file(), indices)
        .context("Failed to serialise index cache")?;
    file.persist(file_path)
        .with_context(|| format!("Failed to write {}", file_path.display()))?;
    Ok(())
}

/// Load a previously saved index cache, validating its invariants.
pub fn load_index_cache(file_path: &Path) -> Result<RegionIndexMap> {
    let file = File::open(file_path)
        .with_context(|| format!("Failed to open {}", file_path.display()))?;
    let indices: RegionIndexMap = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse {}", file_path.display()))?;
    for (name, set) in &indices {
        set.validate(name)?;
    }

    Ok(indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{quad_grid, quad_mask, square_region};
    use rstest::rstest;
    use tempfile::tempdir;

    /// A region well away from the mask should be absent from the map, not
    /// present with empty arrays.
    #[rstest]
    fn test_no_overlap_region_omitted(quad_grid: Grid, quad_mask: MaskLayer) {
        let far = square_region("far", 100.0, 100.0, 110.0, 110.0);
        let indices = build_region_indices(&[far], &quad_grid, &quad_mask).unwrap();
        assert!(!indices.contains_key("far"));
    }

    #[rstest]
    fn test_parallel_arrays(quad_grid: Grid, quad_mask: MaskLayer) {
        let region = square_region("inner", -0.5, -0.5, 3.5, 3.5);
        let indices = build_region_indices(&[region], &quad_grid, &quad_mask).unwrap();
        let set = &indices["inner"];
        assert_eq!(set.rows.len(), set.cols.len());
        assert!(!set.is_empty());
    }

    #[rstest]
    fn test_mask_filters_cells(quad_grid: Grid) {
        // Mask with only the top-left cell valid
        let mut mask = MaskLayer::all_false(quad_grid);
        mask.data_mut()[[0, 0]] = true;
        let region = square_region("inner", -0.5, -0.5, 3.5, 3.5);
        let indices = build_region_indices(&[region], &quad_grid, &mask).unwrap();
        let set = &indices["inner"];
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![(0, 0)]);
    }

    #[rstest]
    fn test_duplicate_name_keeps_first(quad_grid: Grid, quad_mask: MaskLayer) {
        let full = square_region("dup", -0.5, -0.5, 3.5, 3.5);
        let partial = square_region("dup", -0.5, -0.5, 0.5, 0.5);
        let n_full = {
            let indices =
                build_region_indices(&[full.clone()], &quad_grid, &quad_mask).unwrap();
            indices["dup"].len()
        };
        let indices = build_region_indices(&[full, partial], &quad_grid, &quad_mask).unwrap();
        assert_eq!(indices.len(), 1);
        assert_eq!(indices["dup"].len(), n_full);
    }

    #[rstest]
    fn test_cache_round_trip(quad_grid: Grid, quad_mask: MaskLayer) {
        let region = square_region("inner", -0.5, -0.5, 3.5, 3.5);
        let indices = build_region_indices(&[region], &quad_grid, &quad_mask).unwrap();

        let dir = tempdir().unwrap();
        let path = dir.path().join("cache").join("indices.json");
        save_index_cache(&path, &indices).unwrap();
        let loaded = load_index_cache(&path).unwrap();
        assert_eq!(loaded, indices);
    }
}
