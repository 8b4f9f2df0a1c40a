//! Integration tests for the `run` command.
use cyclex::cli::{Analysis, handle_run_command};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tempfile::tempdir;

fn write_file(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    write!(File::create(path).unwrap(), "{contents}").unwrap();
}

/// A 2x2 data directory with one year of population and hazard data.
fn write_data_dir(data_dir: &Path) {
    write_file(
        &data_dir.join("settings.toml"),
        r#"
log_level = "off"
workers = 2

[grid]
min_lon = 0.0
min_lat = 0.0
max_lon = 1.0
max_lat = 1.0
rows = 2
cols = 2

[analysis]
years = { start = 2005, end = 2005 }
window = { start = 2005, end = 2005 }
wind_categories = ["ts"]
landfall_cutoffs = ["all"]
population_year = 2005
"#,
    );
    // north-up population
    write_file(&data_dir.join("worldpop/ppp_2005.csv"), "10,20\n30,40\n");
    // south-up duration; north-up this is [[0,8],[4,0]] samples
    write_file(&data_dir.join("duration/duration_2005_ts.csv"), "4,0\n0,8\n");
}

/// An end-to-end run of the annual exposure analysis.
#[test]
fn test_handle_run_command() {
    let dir = tempdir().unwrap();
    let data_dir = dir.path().join("data");
    write_data_dir(&data_dir);

    // Save results to a non-existent directory to check directory creation
    let output_dir = dir.path().join("results");
    handle_run_command(Analysis::AnnualExposure, &data_dir, &output_dir).unwrap();

    let table = fs::read_to_string(output_dir.join("total_exposure.csv")).unwrap();
    // exposed: cells with >= 1 sample hold populations 20 and 30;
    // person-days: 20 * 8/8 + 30 * 4/8
    assert_eq!(
        table,
        "year,wind_cutoff,landfall_cutoff,exposed_pop,person_days\n2005,ts,all,50.0,35.0\n"
    );

    // A re-run skips the finished task and leaves artifacts byte-identical
    let task_file = output_dir.join("total_exposure").join("exposure_2005_ts_all.csv");
    let before = fs::read(&task_file).unwrap();
    handle_run_command(Analysis::AnnualExposure, &data_dir, &output_dir).unwrap();
    assert_eq!(fs::read(&task_file).unwrap(), before);
    assert_eq!(
        fs::read_to_string(output_dir.join("total_exposure.csv")).unwrap(),
        table
    );
}
