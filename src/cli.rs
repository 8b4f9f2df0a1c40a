//! The command line interface for the exposure engine.
use crate::analysis::{
    AnalysisContext, age_gender_exposure_tasks, age_gender_unexposed_tasks,
    annual_exposure_tasks, country_deprivation_tasks, region_person_day_tasks,
    total_person_day_layer,
};
use crate::batch::{BatchSummary, run_batch, write_failure_listing};
use crate::dimensions::WindCategory;
use crate::log;
use crate::output::merge_table;
use crate::region::read_region_file;
use crate::region_index::{
    RegionIndexMap, build_region_indices, load_index_cache, save_index_cache,
};
use crate::settings::Settings;
use crate::source::{CsvDirSource, RasterSource};
use ::log::info;
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

/// Subdirectory of the data directory holding region boundary files
const REGIONS_DIR: &str = "regions";
/// Subdirectory of the data directory holding cached index sets
const CACHE_DIR: &str = "cache";
/// File name for the failed-task listing of a batch run
const FAILED_TASKS_FILE_NAME: &str = "failed_tasks.csv";

/// The command line interface for the exposure engine.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Commands,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Rasterize a region collection and cache its grid indices.
    BuildIndex {
        /// Path to the data directory.
        data_dir: PathBuf,
        /// Which region collection to build.
        #[arg(value_enum)]
        collection: Collection,
    },
    /// Run an analysis batch.
    Run {
        /// Which analysis to run.
        #[arg(value_enum)]
        analysis: Analysis,
        /// Path to the data directory.
        data_dir: PathBuf,
        /// Directory for output files.
        #[arg(short, long)]
        output_dir: PathBuf,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::BuildIndex {
                data_dir,
                collection,
            } => handle_build_index_command(&data_dir, collection),
            Self::Run {
                analysis,
                data_dir,
                output_dir,
            } => handle_run_command(analysis, &data_dir, &output_dir),
        }
    }
}

/// Parse CLI arguments and start the program
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    cli.command.execute()
}

/// A cached region collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Collection {
    /// Continental boundaries
    Continents,
    /// Country boundaries
    Countries,
}

impl Collection {
    fn name(self) -> &'static str {
        match self {
            Self::Continents => "continents",
            Self::Countries => "countries",
        }
    }
}

/// The available analyses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Analysis {
    /// Global exposed population and person-days per year/wind/landfall
    AnnualExposure,
    /// Exposed population by age band and gender, per continent
    AgeGenderExposure,
    /// Unexposed population by age band and gender, per continent
    AgeGenderUnexposed,
    /// Deprivation index of exposed vs unexposed populations per country
    CountryDeprivation,
    /// Mean person-day exposure per region over the year window
    RegionPersonDays,
}

impl Analysis {
    /// The name of the output table (and its task subdirectory)
    fn table_name(self) -> &'static str {
        match self {
            Self::AnnualExposure => "total_exposure",
            Self::AgeGenderExposure => "age_gender_exposure",
            Self::AgeGenderUnexposed => "age_gender_unexposed",
            Self::CountryDeprivation => "country_rdi",
            Self::RegionPersonDays => "region_person_day",
        }
    }
}

/// Path of the cached index file for a collection
fn cache_path(data_dir: &Path, collection: Collection) -> PathBuf {
    data_dir
        .join(CACHE_DIR)
        .join(format!("{}_indices.json", collection.name()))
}

/// Load a collection's cached index sets, failing with a hint if absent.
fn load_indices(data_dir: &Path, collection: Collection) -> Result<RegionIndexMap> {
    let file_path = cache_path(data_dir, collection);
    if !file_path.is_file() {
        bail!(
            "No cached indices for {}; run `cyclex build-index` first",
            collection.name()
        );
    }

    load_index_cache(&file_path)
}

/// Handle the `build-index` command.
pub fn handle_build_index_command(data_dir: &Path, collection: Collection) -> Result<()> {
    let settings = Settings::from_path(data_dir)?;
    if !log::is_logger_initialised() {
        log::init(&settings.log_level).context("Failed to initialise logging.")?;
    }

    let file_path = data_dir
        .join(REGIONS_DIR)
        .join(format!("{}.json", collection.name()));
    let regions = read_region_file(&file_path).context("Failed to load region collection.")?;
    info!("Loaded {} regions from {}", regions.len(), file_path.display());

    let source = CsvDirSource::new(data_dir, settings.grid);
    let reference_mask = source
        .reference_mask()
        .context("Failed to load the global validity mask.")?;
    let indices = build_region_indices(&regions, &settings.grid, &reference_mask)?;

    let out_path = cache_path(data_dir, collection);
    save_index_cache(&out_path, &indices)?;
    info!(
        "Cached {} index sets to {}",
        indices.len(),
        out_path.display()
    );

    Ok(())
}

/// Handle the `run` command.
pub fn handle_run_command(analysis: Analysis, data_dir: &Path, output_dir: &Path) -> Result<()> {
    let settings = Settings::from_path(data_dir)?;
    if !log::is_logger_initialised() {
        log::init(&settings.log_level).context("Failed to initialise logging.")?;
    }

    let source = CsvDirSource::new(data_dir, settings.grid);
    let ctx = AnalysisContext {
        grid: settings.grid,
        source: &source,
        params: &settings.analysis,
    };
    let task_dir = output_dir.join(analysis.table_name());
    let workers = settings.workers;
    let summary = match analysis {
        Analysis::AnnualExposure => {
            run_batch(&annual_exposure_tasks(&ctx), &task_dir, workers)?
        }
        Analysis::AgeGenderExposure => {
            let continents = load_indices(data_dir, Collection::Continents)?;
            run_batch(
                &age_gender_exposure_tasks(&ctx, &continents),
                &task_dir,
                workers,
            )?
        }
        Analysis::AgeGenderUnexposed => {
            let continents = load_indices(data_dir, Collection::Continents)?;
            run_batch(
                &age_gender_unexposed_tasks(&ctx, &continents),
                &task_dir,
                workers,
            )?
        }
        Analysis::CountryDeprivation => {
            let countries = load_indices(data_dir, Collection::Countries)?;
            run_batch(
                &country_deprivation_tasks(&ctx, &countries),
                &task_dir,
                workers,
            )?
        }
        Analysis::RegionPersonDays => {
            let countries = load_indices(data_dir, Collection::Countries)?;
            let layer = total_person_day_layer(
                &ctx,
                WindCategory::TropicalStorm,
                settings.analysis.deprivation_landfall,
            )
            .context("Failed to accumulate the person-day layer.")?;
            run_batch(
                &region_person_day_tasks(&layer, &countries),
                &task_dir,
                workers,
            )?
        }
    };

    finish_batch(&summary, analysis, &task_dir, output_dir)
}

/// Log the batch outcome, persist the failure listing and merge the table.
fn finish_batch(
    summary: &BatchSummary,
    analysis: Analysis,
    task_dir: &Path,
    output_dir: &Path,
) -> Result<()> {
    summary.log();
    if summary.has_failures() {
        // outside the task directory so it is never merged into the table
        write_failure_listing(summary, &output_dir.join(FAILED_TASKS_FILE_NAME))?;
    }

    let table_path = output_dir.join(format!("{}.csv", analysis.table_name()));
    merge_table(task_dir, &table_path)?;
    info!("Wrote {}", table_path.display());

    Ok(())
}
