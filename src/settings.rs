//! Code for loading program settings.
use crate::dimensions::{AgeBand, Gender, LandfallCutoff, WindCategory};
use crate::grid::Grid;
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::ops::RangeInclusive;
use std::path::Path;

const SETTINGS_FILE_NAME: &str = "settings.toml";

/// Default log level for the program
fn default_log_level() -> String {
    crate::log::DEFAULT_LOG_LEVEL.to_string()
}

fn default_workers() -> usize {
    4
}

fn default_grid() -> Grid {
    Grid::worldpop()
}

/// An inclusive, non-empty range of years.
///
/// Deserialization rejects an inverted range; every loaded range covers at
/// least one year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "YearRangeDef")]
pub struct YearRange {
    /// First year of the range
    pub start: u32,
    /// Last year of the range (inclusive)
    pub end: u32,
}

/// The unvalidated serialized form of a [`YearRange`]
#[derive(Deserialize)]
struct YearRangeDef {
    start: u32,
    end: u32,
}

impl TryFrom<YearRangeDef> for YearRange {
    type Error = anyhow::Error;

    fn try_from(def: YearRangeDef) -> Result<Self> {
        ensure!(
            def.start <= def.end,
            "Year range {}..{} is inverted",
            def.start,
            def.end
        );

        Ok(Self {
            start: def.start,
            end: def.end,
        })
    }
}

impl YearRange {
    /// Iterate over the years in the range
    pub fn iter(&self) -> RangeInclusive<u32> {
        self.start..=self.end
    }

    /// Number of years in the range
    pub fn len(&self) -> usize {
        (self.end - self.start + 1) as usize
    }

    /// Whether the range is empty (never true for a deserialized range)
    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

fn default_years() -> YearRange {
    YearRange {
        start: 2002,
        end: 2019,
    }
}

fn default_window() -> YearRange {
    YearRange {
        start: 2010,
        end: 2019,
    }
}

fn default_wind_categories() -> Vec<WindCategory> {
    vec![
        WindCategory::TropicalStorm,
        WindCategory::Cat1,
        WindCategory::Cat2,
        WindCategory::Cat3,
        WindCategory::Cat4,
        WindCategory::Cat5,
    ]
}

fn default_landfall_cutoffs() -> Vec<LandfallCutoff> {
    vec![
        LandfallCutoff::Unlimited,
        LandfallCutoff::SixHours,
        LandfallCutoff::TwelveHours,
    ]
}

fn default_deprivation_landfall() -> LandfallCutoff {
    LandfallCutoff::TwelveHours
}

fn default_duration_cutoffs() -> Vec<f64> {
    vec![1.0, 2.0]
}

fn default_genders() -> Vec<Gender> {
    vec![Gender::Female, Gender::Male]
}

fn default_population_year() -> u32 {
    2015
}

fn default_value_ceiling() -> f64 {
    crate::raster::DEFAULT_VALUE_CEILING
}

/// Parameter lists the analysis batches range over.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnalysisParams {
    /// Years covered by the per-year analyses
    #[serde(default = "default_years")]
    pub years: YearRange,
    /// Year window for multi-year "ever exposed" analyses
    #[serde(default = "default_window")]
    pub window: YearRange,
    /// Wind-intensity categories to analyse
    #[serde(default = "default_wind_categories")]
    pub wind_categories: Vec<WindCategory>,
    /// Landfall cutoffs to analyse
    #[serde(default = "default_landfall_cutoffs")]
    pub landfall_cutoffs: Vec<LandfallCutoff>,
    /// Landfall cutoff used by the deprivation and person-day analyses
    #[serde(default = "default_deprivation_landfall")]
    pub deprivation_landfall: LandfallCutoff,
    /// Duration cutoffs (in 3-hourly samples) for the age/gender analysis
    #[serde(default = "default_duration_cutoffs")]
    pub duration_cutoffs: Vec<f64>,
    /// Age bands to analyse (defaults to the full stratification)
    #[serde(default = "AgeBand::all")]
    pub ages: Vec<AgeBand>,
    /// Genders to analyse
    #[serde(default = "default_genders")]
    pub genders: Vec<Gender>,
    /// Reference year for the population weight in the deprivation analysis
    #[serde(default = "default_population_year")]
    pub population_year: u32,
    /// Values at or above this are treated as source read artefacts
    #[serde(default = "default_value_ceiling")]
    pub value_ceiling: f64,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        toml::from_str("").expect("all analysis parameters have defaults")
    }
}

/// Program settings from the data directory's config file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    /// The default program log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Number of parallel batch workers
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// The reference grid layers and index sets are expressed against
    #[serde(default = "default_grid")]
    pub grid: Grid,
    /// Analysis parameter lists
    #[serde(default)]
    pub analysis: AnalysisParams,
}

impl Default for Settings {
    fn default() -> Self {
        toml::from_str("").expect("all settings have defaults")
    }
}

impl Settings {
    /// Read settings from `settings.toml` in the data directory.
    ///
    /// If the file is not present, default values are used.
    pub fn from_path(data_dir: &Path) -> Result<Settings> {
        let file_path = data_dir.join(SETTINGS_FILE_NAME);
        if !file_path.is_file() {
            return Ok(Settings::default());
        }

        let contents = std::fs::read_to_string(&file_path)
            .with_context(|| format!("Failed to read {}", file_path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", file_path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_settings_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        assert_eq!(
            Settings::from_path(dir.path()).unwrap(),
            Settings::default()
        );
    }

    #[test]
    fn test_settings_partial_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(SETTINGS_FILE_NAME);

        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "log_level = \"warn\"\nworkers = 2").unwrap();
            writeln!(file, "[analysis]\nwind_categories = [\"ts\", \"cat3\"]").unwrap();
        }

        let settings = Settings::from_path(dir.path()).unwrap();
        assert_eq!(settings.log_level, "warn");
        assert_eq!(settings.workers, 2);
        assert_eq!(
            settings.analysis.wind_categories,
            vec![WindCategory::TropicalStorm, WindCategory::Cat3]
        );
        // unspecified fields keep their defaults
        assert_eq!(settings.grid, Grid::worldpop());
        assert_eq!(settings.analysis.years, default_years());
    }

    #[test]
    fn test_year_range() {
        let range = YearRange {
            start: 2002,
            end: 2019,
        };
        assert_eq!(range.len(), 18);
        assert_eq!(range.iter().next(), Some(2002));
        assert_eq!(range.iter().last(), Some(2019));
    }

    /// An inverted year window in the settings file is a load error, not a
    /// silently empty (or wrapping) range.
    #[test]
    fn test_inverted_year_range_rejected() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(SETTINGS_FILE_NAME);

        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "[analysis]\nwindow = {{ start = 2019, end = 2010 }}").unwrap();
        }

        assert!(Settings::from_path(dir.path()).is_err());
    }

    /// A degenerate grid in the settings file is a load error; it must
    /// never reach resolution arithmetic.
    #[test]
    fn test_degenerate_grid_rejected() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(SETTINGS_FILE_NAME);

        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "[grid]").unwrap();
            writeln!(
                file,
                "min_lon = 0.0\nmin_lat = 0.0\nmax_lon = 1.0\nmax_lat = 1.0"
            )
            .unwrap();
            writeln!(file, "rows = 0\ncols = 2").unwrap();
        }

        assert!(Settings::from_path(dir.path()).is_err());
    }
}
