//! An in-memory raster source, used by tests and small synthetic runs.
use super::RasterSource;
use crate::dimensions::{AgeBand, Gender, LandfallCutoff, WindCategory};
use crate::grid::Grid;
use crate::raster::{MaskLayer, Orientation, RawRaster};
use anyhow::{Context, Result};
use ndarray::Array2;
use std::collections::HashMap;

/// A [`RasterSource`] backed by pre-built arrays.
///
/// All layers are stored north-up and already on the source's grid.
#[derive(Debug)]
pub struct InMemorySource {
    grid: Grid,
    population: HashMap<u32, Array2<f64>>,
    age_gender: HashMap<(u32, AgeBand, Gender), Array2<f64>>,
    durations: HashMap<(u32, WindCategory, LandfallCutoff), Array2<f64>>,
    deprivation: Option<Array2<f64>>,
    mask: Option<Array2<bool>>,
}

impl InMemorySource {
    /// An empty source over `grid`
    pub fn new(grid: Grid) -> Self {
        Self {
            grid,
            population: HashMap::new(),
            age_gender: HashMap::new(),
            durations: HashMap::new(),
            deprivation: None,
            mask: None,
        }
    }

    /// Add a total population layer
    pub fn with_population(mut self, year: u32, data: Array2<f64>) -> Self {
        self.population.insert(year, data);
        self
    }

    /// Add an age/gender-stratified population layer
    pub fn with_age_gender(
        mut self,
        year: u32,
        age: AgeBand,
        gender: Gender,
        data: Array2<f64>,
    ) -> Self {
        self.age_gender.insert((year, age, gender), data);
        self
    }

    /// Add a duration layer
    pub fn with_duration(
        mut self,
        year: u32,
        wind: WindCategory,
        landfall: LandfallCutoff,
        data: Array2<f64>,
    ) -> Self {
        self.durations.insert((year, wind, landfall), data);
        self
    }

    /// Set the deprivation index layer
    pub fn with_deprivation(mut self, data: Array2<f64>) -> Self {
        self.deprivation = Some(data);
        self
    }

    /// Set the validity mask
    pub fn with_mask(mut self, data: Array2<bool>) -> Self {
        self.mask = Some(data);
        self
    }

    fn raw(&self, data: &Array2<f64>) -> RawRaster {
        RawRaster {
            grid: self.grid,
            orientation: Orientation::NorthUp,
            data: data.clone(),
        }
    }
}

impl RasterSource for InMemorySource {
    fn population(&self, year: u32) -> Result<RawRaster> {
        let data = self
            .population
            .get(&year)
            .with_context(|| format!("No population layer for year {year}"))?;
        Ok(self.raw(data))
    }

    fn population_age_gender(
        &self,
        year: u32,
        age: AgeBand,
        gender: Gender,
    ) -> Result<RawRaster> {
        let data = self
            .age_gender
            .get(&(year, age, gender))
            .with_context(|| {
                format!("No population layer for year {year}, age {age}, gender {gender}")
            })?;
        Ok(self.raw(data))
    }

    fn duration(
        &self,
        year: u32,
        wind: WindCategory,
        landfall: LandfallCutoff,
    ) -> Result<RawRaster> {
        let data = self
            .durations
            .get(&(year, wind, landfall))
            .with_context(|| {
                format!("No duration layer for year {year}, wind {wind}, landfall {landfall}")
            })?;
        Ok(self.raw(data))
    }

    fn deprivation(&self) -> Result<RawRaster> {
        let data = self
            .deprivation
            .as_ref()
            .context("No deprivation layer loaded")?;
        Ok(self.raw(data))
    }

    fn reference_mask(&self) -> Result<MaskLayer> {
        let data = self.mask.as_ref().context("No validity mask loaded")?;
        MaskLayer::new(self.grid, data.clone())
    }
}
