//! Integration tests for the `build-index` command and an analysis that
//! consumes the cached indices.
use cyclex::cli::{Analysis, Collection, handle_build_index_command, handle_run_command};
use cyclex::region::Region;
use geo::{LineString, MultiPolygon, Polygon};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tempfile::tempdir;

fn write_file(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    write!(File::create(path).unwrap(), "{contents}").unwrap();
}

/// A 2x2 data directory with boundaries, a validity mask and one year of
/// population and hazard data.
fn write_data_dir(data_dir: &Path) {
    write_file(
        &data_dir.join("settings.toml"),
        r#"
log_level = "off"
workers = 1

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
population_year = 2005
"#,
    );
    write_file(&data_dir.join("worldpop/ppp_2005.csv"), "10,20\n30,40\n");
    // south-up 12h-landfall duration; north-up this is [[0,8],[0,0]]
    write_file(
        &data_dir.join("duration/duration_2005_ts_12h.csv"),
        "0,0\n0,8\n",
    );
    write_file(&data_dir.join("misc/global_mask.csv"), "1,1\n1,1\n");

    // one country covering the whole grid
    let exterior = LineString::from(vec![
        (-0.5, -0.5),
        (1.5, -0.5),
        (1.5, 1.5),
        (-0.5, 1.5),
        (-0.5, -0.5),
    ]);
    let regions = vec![Region {
        id: "Atlantis".into(),
        geometry: MultiPolygon(vec![Polygon::new(exterior, vec![])]),
    }];
    write_file(
        &data_dir.join("regions/countries.json"),
        &serde_json::to_string(&regions).unwrap(),
    );
}

/// Build the country indices, then run the person-day analysis over them.
#[test]
fn test_build_index_then_run() {
    let dir = tempdir().unwrap();
    let data_dir = dir.path().join("data");
    write_data_dir(&data_dir);

    // The analysis fails before the index cache exists
    let output_dir = dir.path().join("results");
    assert!(handle_run_command(Analysis::RegionPersonDays, &data_dir, &output_dir).is_err());

    handle_build_index_command(&data_dir, Collection::Countries).unwrap();
    assert!(data_dir.join("cache/countries_indices.json").is_file());

    handle_run_command(Analysis::RegionPersonDays, &data_dir, &output_dir).unwrap();
    let table = fs::read_to_string(output_dir.join("region_person_day.csv")).unwrap();
    // the exposed cell holds 20 people for 1 day; averaged over 4 cells
    assert_eq!(table, "region,avg_person_days\nAtlantis,5.0\n");
}
