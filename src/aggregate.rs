//! Population-weighted aggregation over region index sets.
//!
//! All sums are NaN-aware in the `nansum` sense (NaN contributes nothing).
//! Weighted averages drop cells with a NaN indicator from both numerator and
//! denominator, so missing indicator cells do not act as zero-weight cells.
//! A zero in-scope weight makes the average undefined (NaN), never zero.
use crate::raster::{MaskLayer, RasterLayer};
use crate::region_index::RegionIndexSet;

/// Whether a cell passes the optional exposure filter.
fn in_scope(filter: Option<(&MaskLayer, bool)>, row: usize, col: usize) -> bool {
    match filter {
        Some((mask, exposed)) => mask.get(row, col) == exposed,
        None => true,
    }
}

/// Sum of `weight` over the region's cells (NaN cells contribute nothing).
pub fn weight_sum(weight: &RasterLayer, indices: &RegionIndexSet) -> f64 {
    masked_weight_sum(weight, indices, None)
}

/// Sum of `weight` over the region's cells, restricted to the exposed
/// (`filter = Some((mask, true))`) or unexposed subset.
pub fn masked_weight_sum(
    weight: &RasterLayer,
    indices: &RegionIndexSet,
    filter: Option<(&MaskLayer, bool)>,
) -> f64 {
    indices
        .iter()
        .filter(|&(r, c)| in_scope(filter, r, c))
        .map(|(r, c)| weight.get(r, c))
        .filter(|v| !v.is_nan())
        .sum()
}

/// Weighted mean of `indicator` over the region's cells, optionally
/// restricted to the exposed/unexposed subset.
///
/// Cells where the indicator is NaN are excluded from both numerator and
/// denominator. Returns NaN when the in-scope weight sums to zero; callers
/// must report that as "undefined", not coerce it to zero.
pub fn weighted_mean(
    indicator: &RasterLayer,
    weight: &RasterLayer,
    indices: &RegionIndexSet,
    filter: Option<(&MaskLayer, bool)>,
) -> f64 {
    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (r, c) in indices.iter() {
        if !in_scope(filter, r, c) {
            continue;
        }
        let a = indicator.get(r, c);
        let w = weight.get(r, c);
        if a.is_nan() || w.is_nan() {
            continue;
        }
        numerator += a * w;
        denominator += w;
    }

    numerator / denominator
}

/// Convert an aggregate value to `None` when it is undefined.
pub fn defined(value: f64) -> Option<f64> {
    (!value.is_nan()).then_some(value)
}

/// Sum of a layer over the whole grid, restricted to the exposed or
/// unexposed subset of `mask`.
pub fn masked_total_sum(layer: &RasterLayer, mask: &MaskLayer, exposed: bool) -> f64 {
    layer
        .data()
        .indexed_iter()
        .filter(|&((r, c), _)| mask.get(r, c) == exposed)
        .map(|(_, &v)| v)
        .filter(|v| !v.is_nan())
        .sum()
}

/// Sum of the elementwise product of two layers over the whole grid,
/// skipping cells where either factor is NaN.
pub fn product_sum(a: &RasterLayer, b: &RasterLayer) -> f64 {
    a.data()
        .iter()
        .zip(b.data())
        .map(|(&x, &y)| x * y)
        .filter(|v| !v.is_nan())
        .sum()
}

/// Total/exposed/unexposed population and population-weighted indicator
/// means for one region.
#[derive(Debug, Clone, PartialEq)]
pub struct ExposureBreakdown {
    /// Population over the whole region
    pub total_pop: f64,
    /// Population in exposed cells
    pub exposed_pop: f64,
    /// Population in unexposed cells
    pub unexposed_pop: f64,
    /// Weighted indicator mean over the whole region (None when undefined)
    pub mean_total: Option<f64>,
    /// Weighted indicator mean over exposed cells (None when undefined)
    pub mean_exposed: Option<f64>,
    /// Weighted indicator mean over unexposed cells (None when undefined)
    pub mean_unexposed: Option<f64>,
}

impl ExposureBreakdown {
    /// Aggregate one region given a population weight layer, an indicator
    /// layer and an exposure mask.
    pub fn compute(
        weight: &RasterLayer,
        indicator: &RasterLayer,
        indices: &RegionIndexSet,
        mask: &MaskLayer,
    ) -> Self {
        Self {
            total_pop: weight_sum(weight, indices),
            exposed_pop: masked_weight_sum(weight, indices, Some((mask, true))),
            unexposed_pop: masked_weight_sum(weight, indices, Some((mask, false))),
            mean_total: defined(weighted_mean(indicator, weight, indices, None)),
            mean_exposed: defined(weighted_mean(indicator, weight, indices, Some((mask, true)))),
            mean_unexposed: defined(weighted_mean(
                indicator,
                weight,
                indices,
                Some((mask, false)),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{small_grid, small_indices};
    use crate::grid::Grid;
    use float_cmp::assert_approx_eq;
    use ndarray::array;
    use rstest::rstest;

    /// `weight_sum` equals the plain sum of weights over the region.
    #[rstest]
    fn test_weight_sum_plain(small_grid: Grid, small_indices: RegionIndexSet) {
        let weight =
            RasterLayer::new(small_grid, array![[10.0, 0.0], [5.0, 0.0]]).unwrap();
        assert_approx_eq!(f64, weight_sum(&weight, &small_indices), 15.0);
    }

    /// Weight [[10,0],[5,0]] with indicator [[2,NaN],[4,NaN]] over all four
    /// cells: total weight 15, weighted mean (10*2 + 5*4) / (10 + 5).
    #[rstest]
    fn test_weighted_mean_drops_nan(small_grid: Grid, small_indices: RegionIndexSet) {
        let weight =
            RasterLayer::new(small_grid, array![[10.0, 0.0], [5.0, 0.0]]).unwrap();
        let indicator =
            RasterLayer::new(small_grid, array![[2.0, f64::NAN], [4.0, f64::NAN]]).unwrap();

        assert_approx_eq!(f64, weight_sum(&weight, &small_indices), 15.0);
        assert_approx_eq!(
            f64,
            weighted_mean(&indicator, &weight, &small_indices, None),
            40.0 / 15.0
        );
    }

    /// An all-NaN indicator makes the mean undefined, never zero.
    #[rstest]
    fn test_weighted_mean_all_nan_is_undefined(small_grid: Grid, small_indices: RegionIndexSet) {
        let weight =
            RasterLayer::new(small_grid, array![[10.0, 1.0], [5.0, 1.0]]).unwrap();
        let indicator = RasterLayer::new(
            small_grid,
            array![[f64::NAN, f64::NAN], [f64::NAN, f64::NAN]],
        )
        .unwrap();

        let mean = weighted_mean(&indicator, &weight, &small_indices, None);
        assert!(mean.is_nan());
        assert_eq!(defined(mean), None);
    }

    /// Zero in-scope weight also makes the mean undefined.
    #[rstest]
    fn test_weighted_mean_zero_weight_is_undefined(
        small_grid: Grid,
        small_indices: RegionIndexSet,
    ) {
        let weight =
            RasterLayer::new(small_grid, array![[0.0, 0.0], [0.0, 0.0]]).unwrap();
        let indicator =
            RasterLayer::new(small_grid, array![[1.0, 2.0], [3.0, 4.0]]).unwrap();

        assert!(weighted_mean(&indicator, &weight, &small_indices, None).is_nan());
    }

    #[rstest]
    fn test_exposure_breakdown(small_grid: Grid, small_indices: RegionIndexSet) {
        let weight =
            RasterLayer::new(small_grid, array![[10.0, 20.0], [5.0, 15.0]]).unwrap();
        let indicator =
            RasterLayer::new(small_grid, array![[2.0, 4.0], [6.0, 8.0]]).unwrap();
        let mask = MaskLayer::new(small_grid, array![[true, false], [true, false]]).unwrap();

        let breakdown = ExposureBreakdown::compute(&weight, &indicator, &small_indices, &mask);
        assert_approx_eq!(f64, breakdown.total_pop, 50.0);
        assert_approx_eq!(f64, breakdown.exposed_pop, 15.0);
        assert_approx_eq!(f64, breakdown.unexposed_pop, 35.0);
        // exposed mean: (10*2 + 5*6) / 15
        assert_approx_eq!(f64, breakdown.mean_exposed.unwrap(), 50.0 / 15.0);
        // unexposed mean: (20*4 + 15*8) / 35
        assert_approx_eq!(f64, breakdown.mean_unexposed.unwrap(), 200.0 / 35.0);
    }
}
