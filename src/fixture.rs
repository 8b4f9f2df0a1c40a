//! Fixtures for tests
use crate::grid::Grid;
use crate::raster::MaskLayer;
use crate::region::Region;
use crate::region_index::RegionIndexSet;
use geo::{LineString, MultiPolygon, Polygon};
use ndarray::Array2;
use rstest::fixture;

/// A 2x2 grid for scenario tests
#[fixture]
pub fn small_grid() -> Grid {
    Grid::new(0.0, 0.0, 1.0, 1.0, 2, 2).unwrap()
}

/// Index set covering all four cells of [`small_grid`]
#[fixture]
pub fn small_indices() -> RegionIndexSet {
    RegionIndexSet::new(vec![0, 0, 1, 1], vec![0, 1, 0, 1]).unwrap()
}

/// A 4x4 grid with 1-degree cells for rasterization tests
#[fixture]
pub fn quad_grid() -> Grid {
    Grid::new(0.0, 0.0, 3.0, 3.0, 4, 4).unwrap()
}

/// An all-valid reference mask over [`quad_grid`]
#[fixture]
pub fn quad_mask(quad_grid: Grid) -> MaskLayer {
    MaskLayer::new(quad_grid, Array2::from_elem(quad_grid.shape(), true)).unwrap()
}

/// A rectangular single-polygon region from corner coordinates
pub fn square_region(name: &str, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Region {
    let exterior = LineString::from(vec![
        (min_x, min_y),
        (max_x, min_y),
        (max_x, max_y),
        (min_x, max_y),
        (min_x, min_y),
    ]);
    Region {
        id: name.into(),
        geometry: MultiPolygon(vec![Polygon::new(exterior, vec![])]),
    }
}
