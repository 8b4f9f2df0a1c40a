//! The independent dimensions a batch of exposure tasks ranges over.
//!
//! String forms follow the tokens used by the hazard dataset's file naming
//! and appear unchanged in output CSV columns, so they are fixed here as
//! labelled enums rather than free strings.
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};
use std::fmt;
use strum::EnumIter;

/// Wind-intensity category of a tropical cyclone.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    SerializeLabeledStringEnum,
    DeserializeLabeledStringEnum,
)]
pub enum WindCategory {
    /// Tropical depression
    #[string = "td"]
    TropicalDepression,
    /// Tropical storm
    #[string = "ts"]
    TropicalStorm,
    /// Category 1 tropical cyclone
    #[string = "cat1"]
    Cat1,
    /// Category 2 tropical cyclone
    #[string = "cat2"]
    Cat2,
    /// Category 3 tropical cyclone
    #[string = "cat3"]
    Cat3,
    /// Category 4 tropical cyclone
    #[string = "cat4"]
    Cat4,
    /// Category 5 tropical cyclone
    #[string = "cat5"]
    Cat5,
}

/// Assumed limit of sustained winds over land.
///
/// Selects which pre-computed duration raster variant is loaded; the
/// per-cutoff rasters are produced upstream by the hazard model.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    SerializeLabeledStringEnum,
    DeserializeLabeledStringEnum,
)]
pub enum LandfallCutoff {
    /// No limit on sustained winds over land
    #[string = "all"]
    Unlimited,
    /// Sustained winds limited to 6 hours after landfall
    #[string = "6h"]
    SixHours,
    /// Sustained winds limited to 12 hours after landfall
    #[string = "12h"]
    TwelveHours,
}

/// Gender of a stratified population layer.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    SerializeLabeledStringEnum,
    DeserializeLabeledStringEnum,
)]
pub enum Gender {
    /// Female population layer
    #[string = "f"]
    Female,
    /// Male population layer
    #[string = "m"]
    Male,
}

/// Lower bound (in years) of a population age band.
///
/// The stratified population dataset provides bands starting at 0 and 1,
/// then 5-year bands from 5 to 80.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct AgeBand(pub u8);

impl AgeBand {
    /// All age bands provided by the stratified population dataset
    pub fn all() -> Vec<AgeBand> {
        let mut bands = vec![AgeBand(0), AgeBand(1)];
        bands.extend((1..17).map(|i| AgeBand(i * 5)));
        bands
    }
}

impl fmt::Display for AgeBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
