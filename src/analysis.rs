//! The concrete analyses run over the exposure engine.
//!
//! Each analysis is a family of independent batch tasks over a Cartesian
//! product of dimensions, producing one CSV table with a fixed column
//! schema. Rows always carry their own dimension keys, so merge order never
//! matters.
use crate::aggregate::{
    ExposureBreakdown, masked_total_sum, masked_weight_sum, product_sum, weight_sum,
};
use crate::batch::BatchTask;
use crate::dimensions::{AgeBand, Gender, LandfallCutoff, WindCategory};
use crate::error::ExposureError;
use crate::exposure::{accumulate_years, person_day_factor, threshold_mask, unexposed_mask};
use crate::grid::Grid;
use crate::raster::{RasterLayer, align};
use crate::region::RegionID;
use crate::region_index::{RegionIndexMap, RegionIndexSet};
use crate::settings::AnalysisParams;
use crate::source::RasterSource;
use anyhow::Result;
use itertools::iproduct;
use ndarray::Zip;
use serde::Serialize;

/// Region key used for whole-grid rows in tables that also carry
/// per-region rows
const GLOBAL_REGION: &str = "all";

/// Read-only inputs shared by every task in a batch.
///
/// Constructed once before dispatch and never mutated afterwards.
pub struct AnalysisContext<'a> {
    /// The reference grid all layers and index sets are expressed against
    pub grid: Grid,
    /// Raster supplier
    pub source: &'a dyn RasterSource,
    /// Parameter lists for task enumeration
    pub params: &'a AnalysisParams,
}

impl AnalysisContext<'_> {
    /// Total population for `year`, aligned, invalid reads collapsed to zero
    fn population(&self, year: u32) -> Result<RasterLayer> {
        let raw = self.source.population(year)?;
        Ok(align(raw, &self.grid)?.normalize_counts(self.params.value_ceiling))
    }

    /// Total population for `year` as a weight layer: invalid reads become
    /// NaN so they are excluded from weighted averages
    fn population_weights(&self, year: u32) -> Result<RasterLayer> {
        let raw = self.source.population(year)?;
        Ok(align(raw, &self.grid)?.normalize_weights(self.params.value_ceiling))
    }

    /// Stratified population layer, aligned and cleaned
    fn age_gender_population(
        &self,
        year: u32,
        age: AgeBand,
        gender: Gender,
    ) -> Result<RasterLayer> {
        let raw = self.source.population_age_gender(year, age, gender)?;
        Ok(align(raw, &self.grid)?.normalize_counts(self.params.value_ceiling))
    }

    /// Duration layer, aligned
    fn duration(
        &self,
        year: u32,
        wind: WindCategory,
        landfall: LandfallCutoff,
    ) -> Result<RasterLayer> {
        let raw = self.source.duration(year, wind, landfall)?;
        Ok(align(raw, &self.grid)?)
    }

    /// Deprivation index layer, aligned (must be produced at the reference
    /// grid; the native deprivation grid is rejected)
    fn deprivation(&self) -> Result<RasterLayer> {
        let raw = self.source.deprivation()?;
        Ok(align(raw, &self.grid)?)
    }
}

/// A row of the annual total exposure table.
#[derive(Debug, Serialize, PartialEq)]
pub struct AnnualExposureRow {
    year: u32,
    wind_cutoff: WindCategory,
    landfall_cutoff: LandfallCutoff,
    exposed_pop: f64,
    person_days: f64,
}

/// Global population exposure for one (year, wind, landfall) combination.
pub struct AnnualExposureTask<'a> {
    ctx: &'a AnalysisContext<'a>,
    year: u32,
    wind: WindCategory,
    landfall: LandfallCutoff,
}

/// Enumerate annual exposure tasks over years x winds x landfall cutoffs.
pub fn annual_exposure_tasks<'a>(ctx: &'a AnalysisContext<'a>) -> Vec<AnnualExposureTask<'a>> {
    let params = ctx.params;
    iproduct!(
        params.years.iter(),
        params.wind_categories.iter().copied(),
        params.landfall_cutoffs.iter().copied()
    )
    .map(|(year, wind, landfall)| AnnualExposureTask {
        ctx,
        year,
        wind,
        landfall,
    })
    .collect()
}

impl BatchTask for AnnualExposureTask<'_> {
    type Row = AnnualExposureRow;

    fn key(&self) -> String {
        format!("exposure_{}_{}_{}", self.year, self.wind, self.landfall)
    }

    fn run(&self) -> Result<Vec<AnnualExposureRow>> {
        let pop = self.ctx.population(self.year)?;
        let duration = self.ctx.duration(self.year, self.wind, self.landfall)?;

        let exposed = threshold_mask(&duration, 1.0);
        let exposed_pop = masked_total_sum(&pop, &exposed, true);
        let person_days = product_sum(&person_day_factor(&duration), &pop);

        Ok(vec![AnnualExposureRow {
            year: self.year,
            wind_cutoff: self.wind,
            landfall_cutoff: self.landfall,
            exposed_pop,
            person_days,
        }])
    }
}

/// A row of the age/gender exposed-population table.
#[derive(Debug, Serialize, PartialEq)]
pub struct AgeGenderExposureRow {
    year: u32,
    wind_cutoff: WindCategory,
    duration_cutoff: f64,
    region: String,
    age: AgeBand,
    gender: Gender,
    exposed_pop: f64,
}

/// Exposed population by age band and gender, globally and per continent.
pub struct AgeGenderExposureTask<'a> {
    ctx: &'a AnalysisContext<'a>,
    continents: &'a RegionIndexMap,
    year: u32,
    wind: WindCategory,
    age: AgeBand,
    gender: Gender,
}

/// Enumerate age/gender exposure tasks over years x winds x ages x genders.
pub fn age_gender_exposure_tasks<'a>(
    ctx: &'a AnalysisContext<'a>,
    continents: &'a RegionIndexMap,
) -> Vec<AgeGenderExposureTask<'a>> {
    let params = ctx.params;
    iproduct!(
        params.years.iter(),
        params.wind_categories.iter().copied(),
        params.ages.iter().copied(),
        params.genders.iter().copied()
    )
    .map(|(year, wind, age, gender)| AgeGenderExposureTask {
        ctx,
        continents,
        year,
        wind,
        age,
        gender,
    })
    .collect()
}

impl BatchTask for AgeGenderExposureTask<'_> {
    type Row = AgeGenderExposureRow;

    fn key(&self) -> String {
        format!(
            "age_gender_exposure_{}_{}_{}_{}",
            self.year, self.wind, self.age, self.gender
        )
    }

    fn run(&self) -> Result<Vec<AgeGenderExposureRow>> {
        let pop = self
            .ctx
            .age_gender_population(self.year, self.age, self.gender)?;
        let duration = self
            .ctx
            .duration(self.year, self.wind, LandfallCutoff::Unlimited)?;

        let mut rows = Vec::new();
        for &cutoff in &self.ctx.params.duration_cutoffs {
            let mask = threshold_mask(&duration, cutoff);
            rows.push(AgeGenderExposureRow {
                year: self.year,
                wind_cutoff: self.wind,
                duration_cutoff: cutoff,
                region: GLOBAL_REGION.into(),
                age: self.age,
                gender: self.gender,
                exposed_pop: masked_total_sum(&pop, &mask, true),
            });
            for (region, indices) in self.continents {
                let exposed_pop = masked_weight_sum(&pop, indices, Some((&mask, true)));
                // regions with no exposure at this cutoff get no row
                if exposed_pop == 0.0 {
                    continue;
                }
                rows.push(AgeGenderExposureRow {
                    year: self.year,
                    wind_cutoff: self.wind,
                    duration_cutoff: cutoff,
                    region: region.to_string(),
                    age: self.age,
                    gender: self.gender,
                    exposed_pop,
                });
            }
        }

        Ok(rows)
    }
}

/// A row of the age/gender unexposed-population table.
#[derive(Debug, Serialize, PartialEq)]
pub struct AgeGenderUnexposedRow {
    year: u32,
    wind_cutoff: WindCategory,
    region: String,
    age: AgeBand,
    gender: Gender,
    unexposed_pop: f64,
}

/// Unexposed population by age band and gender (sensitivity companion to
/// [`AgeGenderExposureTask`]).
pub struct AgeGenderUnexposedTask<'a> {
    ctx: &'a AnalysisContext<'a>,
    continents: &'a RegionIndexMap,
    year: u32,
    wind: WindCategory,
    age: AgeBand,
    gender: Gender,
}

/// Enumerate age/gender unexposed tasks over years x winds x ages x genders.
pub fn age_gender_unexposed_tasks<'a>(
    ctx: &'a AnalysisContext<'a>,
    continents: &'a RegionIndexMap,
) -> Vec<AgeGenderUnexposedTask<'a>> {
    let params = ctx.params;
    iproduct!(
        params.years.iter(),
        params.wind_categories.iter().copied(),
        params.ages.iter().copied(),
        params.genders.iter().copied()
    )
    .map(|(year, wind, age, gender)| AgeGenderUnexposedTask {
        ctx,
        continents,
        year,
        wind,
        age,
        gender,
    })
    .collect()
}

impl BatchTask for AgeGenderUnexposedTask<'_> {
    type Row = AgeGenderUnexposedRow;

    fn key(&self) -> String {
        format!(
            "age_gender_unexposed_{}_{}_{}_{}",
            self.year, self.wind, self.age, self.gender
        )
    }

    fn run(&self) -> Result<Vec<AgeGenderUnexposedRow>> {
        let pop = self
            .ctx
            .age_gender_population(self.year, self.age, self.gender)?;
        let duration = self
            .ctx
            .duration(self.year, self.wind, LandfallCutoff::Unlimited)?;
        let mask = unexposed_mask(&duration);

        let mut rows = vec![AgeGenderUnexposedRow {
            year: self.year,
            wind_cutoff: self.wind,
            region: GLOBAL_REGION.into(),
            age: self.age,
            gender: self.gender,
            unexposed_pop: masked_total_sum(&pop, &mask, true),
        }];
        for (region, indices) in self.continents {
            let unexposed_pop = masked_weight_sum(&pop, indices, Some((&mask, true)));
            if unexposed_pop == 0.0 {
                continue;
            }
            rows.push(AgeGenderUnexposedRow {
                year: self.year,
                wind_cutoff: self.wind,
                region: region.to_string(),
                age: self.age,
                gender: self.gender,
                unexposed_pop,
            });
        }

        Ok(rows)
    }
}

/// A row of the country deprivation-index table.
#[derive(Debug, Serialize, PartialEq)]
pub struct CountryDeprivationRow {
    country: String,
    wind_cutoff: WindCategory,
    total_pop: f64,
    exposed_pop: f64,
    unexposed_pop: f64,
    /// Population-weighted mean deprivation index (empty when undefined)
    avg_rdi: Option<f64>,
    exposed_avg_rdi: Option<f64>,
    unexposed_avg_rdi: Option<f64>,
}

/// Deprivation index of exposed vs unexposed populations per country, for
/// one wind category over the configured multi-year window.
pub struct CountryDeprivationTask<'a> {
    ctx: &'a AnalysisContext<'a>,
    countries: &'a RegionIndexMap,
    wind: WindCategory,
}

/// Enumerate country deprivation tasks, one per wind category.
pub fn country_deprivation_tasks<'a>(
    ctx: &'a AnalysisContext<'a>,
    countries: &'a RegionIndexMap,
) -> Vec<CountryDeprivationTask<'a>> {
    ctx.params
        .wind_categories
        .iter()
        .map(|&wind| CountryDeprivationTask {
            ctx,
            countries,
            wind,
        })
        .collect()
}

impl BatchTask for CountryDeprivationTask<'_> {
    type Row = CountryDeprivationRow;

    fn key(&self) -> String {
        let window = self.ctx.params.window;
        format!("country_rdi_{}_{}_{}", self.wind, window.start, window.end)
    }

    fn run(&self) -> Result<Vec<CountryDeprivationRow>> {
        let params = self.ctx.params;
        let ever_exposed = accumulate_years(
            self.ctx.source,
            &self.ctx.grid,
            params.window.iter(),
            self.wind,
            params.deprivation_landfall,
        )?;
        let pop = self.ctx.population_weights(params.population_year)?;
        let rdi = self.ctx.deprivation()?;

        let mut rows = Vec::new();
        for (country, indices) in self.countries {
            let breakdown = ExposureBreakdown::compute(&pop, &rdi, indices, &ever_exposed);
            // countries with no population or no exposure in the window have
            // nothing to report
            if breakdown.total_pop == 0.0 || breakdown.exposed_pop == 0.0 {
                continue;
            }
            rows.push(CountryDeprivationRow {
                country: country.to_string(),
                wind_cutoff: self.wind,
                total_pop: breakdown.total_pop,
                exposed_pop: breakdown.exposed_pop,
                unexposed_pop: breakdown.unexposed_pop,
                avg_rdi: breakdown.mean_total,
                exposed_avg_rdi: breakdown.mean_exposed,
                unexposed_avg_rdi: breakdown.mean_unexposed,
            });
        }

        Ok(rows)
    }
}

/// A row of the region person-day table.
#[derive(Debug, Serialize, PartialEq)]
pub struct RegionPersonDaysRow {
    region: String,
    avg_person_days: f64,
}

/// Mean per-cell person-day exposure for one region over the window.
pub struct RegionPersonDaysTask<'a> {
    region: &'a RegionID,
    indices: &'a RegionIndexSet,
    layer: &'a RasterLayer,
}

/// Mean annual person-day exposure per cell, accumulated over the window.
///
/// This is the shared input of the per-region person-day tasks; it is
/// computed once before dispatch. A year that cannot be loaded aborts the
/// whole analysis.
pub fn total_person_day_layer(
    ctx: &AnalysisContext,
    wind: WindCategory,
    landfall: LandfallCutoff,
) -> Result<RasterLayer> {
    let window = ctx.params.window;
    let mut total = RasterLayer::zeros(ctx.grid);
    for year in window.iter() {
        let raw = ctx
            .source
            .duration(year, wind, landfall)
            .map_err(|source| ExposureError::MissingYearData { year, source })?;
        let days = person_day_factor(&align(raw, &ctx.grid)?);
        let pop = ctx.population(year)?;
        Zip::from(total.data_mut())
            .and(days.data())
            .and(pop.data())
            .for_each(|t, &d, &p| *t += d * p);
    }
    let n_years = window.len() as f64;
    total.data_mut().mapv_inplace(|v| v / n_years);

    Ok(total)
}

/// Enumerate person-day tasks, one per region.
pub fn region_person_day_tasks<'a>(
    layer: &'a RasterLayer,
    regions: &'a RegionIndexMap,
) -> Vec<RegionPersonDaysTask<'a>> {
    regions
        .iter()
        .map(|(region, indices)| RegionPersonDaysTask {
            region,
            indices,
            layer,
        })
        .collect()
}

impl BatchTask for RegionPersonDaysTask<'_> {
    type Row = RegionPersonDaysRow;

    fn key(&self) -> String {
        format!("person_day_{}", self.region)
    }

    fn run(&self) -> Result<Vec<RegionPersonDaysRow>> {
        let total = weight_sum(self.layer, self.indices);
        // regions with no exposure over the window have nothing to report
        if total == 0.0 || total.is_nan() {
            return Ok(Vec::new());
        }

        Ok(vec![RegionPersonDaysRow {
            region: self.region.to_string(),
            avg_person_days: total / self.indices.len() as f64,
        }])
    }
}
