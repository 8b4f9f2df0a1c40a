//! The batch driver: enumerate, skip, dispatch, record.
//!
//! Tasks are independent combinations of analysis dimensions; none of them
//! communicate, and shared inputs (grids, index sets, sources) are read-only
//! once a batch starts. A task is considered done solely by the presence of
//! its output file, which together with atomic writes makes interrupted
//! batches resumable by re-running them. One task's failure never aborts its
//! siblings; failures are recorded against the task key and summarised at
//! the end, so a partial run is always visible.
use crate::output::{create_output_directory, write_rows_atomic};
use anyhow::{Context, Result};
use log::{info, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::path::Path;

/// One unit of batch work.
///
/// `Sync` because tasks are dispatched across a worker pool; any shared
/// state a task captures must be read-only.
pub trait BatchTask: Sync {
    /// The output row type for this task family
    type Row: Serialize + Send;

    /// A stable key unique within the batch; doubles as the output file stem
    fn key(&self) -> String;

    /// Execute the task, returning the rows to write.
    ///
    /// An empty row set is valid: it means "nothing to report for this
    /// combination" and still marks the task complete.
    fn run(&self) -> Result<Vec<Self::Row>>;
}

/// How a single task ended.
enum TaskStatus {
    Completed,
    Skipped,
    Failed(String),
}

/// Per-key outcome listing for a finished batch.
#[derive(Debug, Default)]
pub struct BatchSummary {
    /// Keys of tasks computed in this run
    pub completed: Vec<String>,
    /// Keys of tasks whose output already existed
    pub skipped: Vec<String>,
    /// Keys and reasons for tasks that failed
    pub failed: Vec<(String, String)>,
}

impl BatchSummary {
    /// Whether any task failed
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Log the outcome of the batch, one warning per failed task.
    pub fn log(&self) {
        info!(
            "Batch finished: {} computed, {} skipped (already present), {} failed",
            self.completed.len(),
            self.skipped.len(),
            self.failed.len()
        );
        for (key, reason) in &self.failed {
            warn!("Task {key} failed: {reason}");
        }
    }
}

/// A failed task's key and reason, as written to the failure side channel.
#[derive(Serialize)]
struct FailedTaskRow<'a> {
    task: &'a str,
    reason: &'a str,
}

/// Write the failed-task listing for a finished batch.
///
/// A batch that partially fails must leave a machine-readable trace, not
/// just log lines.
pub fn write_failure_listing(summary: &BatchSummary, file_path: &Path) -> Result<()> {
    let rows: Vec<_> = summary
        .failed
        .iter()
        .map(|(task, reason)| FailedTaskRow {
            task,
            reason: reason.as_str(),
        })
        .collect();
    write_rows_atomic(file_path, &rows)
}

/// Run every task whose output file does not already exist.
///
/// Task outputs land in `task_dir` as `<key>.csv`, written atomically.
/// Execution order is irrelevant to the result; rows carry their own
/// dimension keys.
pub fn run_batch<T: BatchTask>(
    tasks: &[T],
    task_dir: &Path,
    workers: usize,
) -> Result<BatchSummary> {
    create_output_directory(task_dir)?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .context("Failed to create worker pool")?;

    let statuses: Vec<(String, TaskStatus)> = pool.install(|| {
        tasks
            .par_iter()
            .map(|task| {
                let key = task.key();
                let file_path = task_dir.join(format!("{key}.csv"));
                if file_path.exists() {
                    info!("Already exists: {key}");
                    return (key, TaskStatus::Skipped);
                }

                let status = match task.run().and_then(|rows| {
                    write_rows_atomic(&file_path, &rows)
                }) {
                    Ok(()) => {
                        info!("Finished: {key}");
                        TaskStatus::Completed
                    }
                    Err(err) => TaskStatus::Failed(format!("{err:#}")),
                };
                (key, status)
            })
            .collect()
    });

    let mut summary = BatchSummary::default();
    for (key, status) in statuses {
        match status {
            TaskStatus::Completed => summary.completed.push(key),
            TaskStatus::Skipped => summary.skipped.push(key),
            TaskStatus::Failed(reason) => summary.failed.push((key, reason)),
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use serde::Serialize;
    use std::fs;
    use tempfile::tempdir;

    #[derive(Serialize)]
    struct Row {
        key: String,
        value: u32,
    }

    struct TestTask {
        name: String,
        fail: bool,
    }

    impl BatchTask for TestTask {
        type Row = Row;

        fn key(&self) -> String {
            self.name.clone()
        }

        fn run(&self) -> Result<Vec<Row>> {
            if self.fail {
                bail!("synthetic failure");
            }
            Ok(vec![Row {
                key: self.name.clone(),
                value: 1,
            }])
        }
    }

    fn tasks(names: &[&str]) -> Vec<TestTask> {
        names
            .iter()
            .map(|&name| TestTask {
                name: name.into(),
                fail: false,
            })
            .collect()
    }

    #[test]
    fn test_run_batch_writes_outputs() {
        let dir = tempdir().unwrap();
        let summary = run_batch(&tasks(&["a", "b"]), dir.path(), 2).unwrap();
        assert_eq!(summary.completed.len(), 2);
        assert!(dir.path().join("a.csv").exists());
        assert!(dir.path().join("b.csv").exists());
    }

    /// Re-running a batch leaves existing artifacts byte-identical and
    /// computes nothing new.
    #[test]
    fn test_rerun_is_idempotent() {
        let dir = tempdir().unwrap();
        run_batch(&tasks(&["a"]), dir.path(), 1).unwrap();
        let before = fs::read(dir.path().join("a.csv")).unwrap();

        let summary = run_batch(&tasks(&["a"]), dir.path(), 1).unwrap();
        assert!(summary.completed.is_empty());
        assert_eq!(summary.skipped, vec!["a".to_string()]);
        assert_eq!(fs::read(dir.path().join("a.csv")).unwrap(), before);
    }

    /// A failing task is recorded but does not abort its siblings.
    #[test]
    fn test_failure_does_not_abort_siblings() {
        let dir = tempdir().unwrap();
        let tasks = vec![
            TestTask {
                name: "good".into(),
                fail: false,
            },
            TestTask {
                name: "bad".into(),
                fail: true,
            },
        ];
        let summary = run_batch(&tasks, dir.path(), 2).unwrap();
        assert_eq!(summary.completed, vec!["good".to_string()]);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, "bad");
        assert!(!dir.path().join("bad.csv").exists());

        let listing = dir.path().join("failed_tasks.csv");
        write_failure_listing(&summary, &listing).unwrap();
        let contents = fs::read_to_string(listing).unwrap();
        assert!(contents.contains("synthetic failure"));
    }
}
