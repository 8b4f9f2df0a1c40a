//! The module responsible for writing output tables to disk.
//!
//! Each batch task writes its own small CSV; presence of that file is the
//! sole "task already done" marker, so writes go through a temporary file
//! and an atomic rename. A crash mid-write must never leave a file that
//! passes the existence check but is truncated.
use anyhow::{Context, Result};
use itertools::Itertools;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Create the output directory for an analysis, with parents.
pub fn create_output_directory(output_dir: &Path) -> Result<()> {
    if output_dir.is_dir() {
        // already exists
        return Ok(());
    }
    fs::create_dir_all(output_dir)?;

    Ok(())
}

/// Write serialisable rows to a CSV file atomically.
///
/// The file appears under its final name only once fully written. An empty
/// row set still produces the file (it marks the task complete), just with
/// no records.
pub fn write_rows_atomic<R: Serialize>(file_path: &Path, rows: &[R]) -> Result<()> {
    let dir = file_path.parent().context("Output path has no parent")?;
    let file = NamedTempFile::new_in(dir)?;
    {
        let mut writer = csv::Writer::from_writer(file.as_file());
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
    }
    file.persist(file_path)
        .with_context(|| format!("Failed to write {}", file_path.display()))?;

    Ok(())
}

/// Concatenate all per-task CSVs in a directory into one table.
///
/// Every per-task file of an analysis shares the same column schema; the
/// merged table carries the header once. Files are visited in name order so
/// the merge is deterministic, and rows remain keyed by their own dimension
/// columns rather than by write order. Tasks that produced no rows leave an
/// empty file and contribute nothing.
pub fn merge_table(task_dir: &Path, table_path: &Path) -> Result<()> {
    let mut task_files: Vec<PathBuf> = fs::read_dir(task_dir)?
        .map_ok(|entry| entry.path())
        .filter_ok(|path| path.extension().is_some_and(|ext| ext == "csv"))
        .try_collect()?;
    task_files.sort();

    let dir = table_path.parent().context("Output path has no parent")?;
    let file = NamedTempFile::new_in(dir)?;
    {
        let mut writer = csv::Writer::from_writer(file.as_file());
        let mut header_written = false;
        for task_file in &task_files {
            let mut reader = csv::Reader::from_path(task_file)
                .with_context(|| format!("Failed to open {}", task_file.display()))?;
            let headers = reader.headers()?.clone();
            if headers.is_empty() {
                // empty marker file from a task with nothing to report
                continue;
            }
            if !header_written {
                writer.write_record(&headers)?;
                header_written = true;
            }
            for record in reader.records() {
                writer.write_record(&record?)?;
            }
        }
        writer.flush()?;
    }
    file.persist(table_path)
        .with_context(|| format!("Failed to write {}", table_path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use tempfile::tempdir;

    #[derive(Serialize)]
    struct Row {
        year: u32,
        value: f64,
    }

    #[test]
    fn test_write_rows_atomic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rows.csv");
        write_rows_atomic(
            &path,
            &[
                Row {
                    year: 2005,
                    value: 1.5,
                },
                Row {
                    year: 2006,
                    value: 2.5,
                },
            ],
        )
        .unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "year,value\n2005,1.5\n2006,2.5\n");
    }

    #[test]
    fn test_write_empty_rows_creates_marker() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rows.csv");
        write_rows_atomic::<Row>(&path, &[]).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_merge_table() {
        let dir = tempdir().unwrap();
        let tasks = dir.path().join("tasks");
        fs::create_dir(&tasks).unwrap();
        write_rows_atomic(
            &tasks.join("b.csv"),
            &[Row {
                year: 2006,
                value: 2.0,
            }],
        )
        .unwrap();
        write_rows_atomic(
            &tasks.join("a.csv"),
            &[Row {
                year: 2005,
                value: 1.0,
            }],
        )
        .unwrap();
        write_rows_atomic::<Row>(&tasks.join("empty.csv"), &[]).unwrap();

        let table = dir.path().join("table.csv");
        merge_table(&tasks, &table).unwrap();
        let contents = fs::read_to_string(&table).unwrap();
        assert_eq!(contents, "year,value\n2005,1.0\n2006,2.0\n");
    }
}
