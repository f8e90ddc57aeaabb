//! Parallel batch processing over a fixed-size worker pool

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use console::style;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{ErrorKind, Result, ResizeError};
use crate::processing::{ProcessingEngine, ResizeTask, TaskOutput};

pub mod progress;

pub use progress::*;

/// Runs resize tasks on a dedicated thread pool.
///
/// Tasks are independent: a failing task is recorded and never stops its
/// siblings. `run` returns only after every task has finished.
pub struct BatchProcessor {
    engine: ProcessingEngine,
    workers: usize,
    progress_tracker: Arc<ProgressTracker>,
}

impl BatchProcessor {
    /// Create a new batch processor with `workers` threads (at least one)
    pub fn new(engine: ProcessingEngine, workers: usize) -> Self {
        let workers = workers.max(1);
        info!("Initializing batch processor with {} workers", workers);

        Self {
            engine,
            workers,
            progress_tracker: Arc::new(ProgressTracker::new()),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Shared progress tracker, for subscribing reporters
    pub fn progress(&self) -> &Arc<ProgressTracker> {
        &self.progress_tracker
    }

    /// Process every task and aggregate the outcomes.
    ///
    /// A task whose outputs overlap those of an earlier task is recorded as
    /// failed without running. Only failure to build the worker pool is
    /// returned as an error.
    pub fn run(&self, tasks: Vec<ResizeTask>) -> Result<BatchReport> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|index| format!("resize-worker-{}", index))
            .build()
            .map_err(|e| ResizeError::parallel(format!("Failed to build worker pool: {}", e)))?;

        let start_time = Instant::now();
        let total = tasks.len();
        info!("Starting parallel processing of {} files", total);
        self.progress_tracker.start(total, self.workers);

        let planned = claim_outputs(tasks);
        let reports: Vec<TaskReport> = pool.install(|| {
            planned
                .into_par_iter()
                .map(|(task, conflict)| match conflict {
                    Some(e) => self.record_failure(&task, e),
                    None => self.process_one(task),
                })
                .collect()
        });

        self.progress_tracker.complete_batch();
        let duration = start_time.elapsed();

        Ok(BatchReport::from_reports(reports, self.workers, duration))
    }

    fn process_one(&self, task: ResizeTask) -> TaskReport {
        match self.engine.process_task(&task) {
            Ok(output) => {
                self.progress_tracker
                    .complete_file(task.source().to_path_buf(), output.files_written());
                TaskReport {
                    source: task.source().to_path_buf(),
                    outcome: TaskOutcome::Completed(output),
                }
            }
            Err(e) => self.record_failure(&task, e),
        }
    }

    fn record_failure(&self, task: &ResizeTask, e: ResizeError) -> TaskReport {
        warn!("Failed to process {}: {}", task.source().display(), e);
        self.progress_tracker
            .fail_file(task.source().to_path_buf(), e.to_string());
        TaskReport {
            source: task.source().to_path_buf(),
            outcome: TaskOutcome::Failed {
                kind: e.kind(),
                message: e.user_message(),
            },
        }
    }
}

/// Pair each task with the conflict that keeps it from running, if any.
///
/// Output paths are claimed in task order, so the first task to name a path
/// owns it regardless of worker count.
fn claim_outputs(tasks: Vec<ResizeTask>) -> Vec<(ResizeTask, Option<ResizeError>)> {
    let mut owners: HashMap<PathBuf, PathBuf> = HashMap::new();

    tasks
        .into_iter()
        .map(|task| {
            let outputs = task.output_paths();
            let conflict = outputs
                .iter()
                .find_map(|path| owners.get(path).map(|owner| (path, owner)))
                .map(|(path, owner)| ResizeError::output_conflict(path, owner));

            if conflict.is_none() {
                let source = task.source().to_path_buf();
                owners.extend(outputs.into_iter().map(|path| (path, source.clone())));
            }
            (task, conflict)
        })
        .collect()
}

/// Outcome of a single task
#[derive(Debug, Clone, Serialize)]
pub struct TaskReport {
    pub source: PathBuf,
    pub outcome: TaskOutcome,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskOutcome {
    Completed(TaskOutput),
    Failed { kind: ErrorKind, message: String },
}

impl TaskReport {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, TaskOutcome::Completed(_))
    }
}

/// Result of a batch run
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub files_written: usize,
    pub workers: usize,
    #[serde(rename = "elapsed_secs", serialize_with = "serialize_secs")]
    pub duration: Duration,
    pub reports: Vec<TaskReport>,
}

impl BatchReport {
    /// Aggregate per-task reports after the pool has drained
    pub fn from_reports(reports: Vec<TaskReport>, workers: usize, duration: Duration) -> Self {
        let mut successful = 0;
        let mut files_written = 0;
        for report in &reports {
            if let TaskOutcome::Completed(output) = &report.outcome {
                successful += 1;
                files_written += output.files_written();
            }
        }

        Self {
            total: reports.len(),
            successful,
            failed: reports.len() - successful,
            files_written,
            workers,
            duration,
            reports,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Failed tasks with their error kind and message
    pub fn failures(&self) -> impl Iterator<Item = (&PathBuf, ErrorKind, &str)> {
        self.reports.iter().filter_map(|report| match &report.outcome {
            TaskOutcome::Failed { kind, message } => Some((&report.source, *kind, message.as_str())),
            TaskOutcome::Completed(_) => None,
        })
    }

    /// Print summary to console
    pub fn print_summary(&self) {
        println!();
        println!(
            "Batch resizing completed in {:.2} seconds.",
            self.duration.as_secs_f64()
        );
        println!("Total images resized: {}", style(self.successful).green().bold());
        if self.failed > 0 {
            println!("{}: {}", style("Failed").red().bold(), self.failed);
            for (i, (path, kind, message)) in self.failures().enumerate() {
                println!("  {}: [{:?}] {} ({})", i + 1, kind, message, path.display());
            }
        }
    }
}

fn serialize_secs<S: serde::Serializer>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::{ImageFormat, ImageInfo};

    fn completed(path: &str, variants: usize) -> TaskReport {
        TaskReport {
            source: PathBuf::from(path),
            outcome: TaskOutcome::Completed(TaskOutput {
                original: ImageInfo {
                    path: PathBuf::from(path),
                    width: 10,
                    height: 10,
                    format: ImageFormat::Png,
                },
                original_copy: PathBuf::from("out").join(path),
                variants: (0..variants)
                    .map(|i| crate::processing::VariantInfo {
                        target: i as u32 + 1,
                        path: PathBuf::from(format!("out/{}_{}px.png", path, i + 1)),
                        width: i as u32 + 1,
                        height: i as u32 + 1,
                    })
                    .collect(),
            }),
        }
    }

    fn failed(path: &str) -> TaskReport {
        TaskReport {
            source: PathBuf::from(path),
            outcome: TaskOutcome::Failed {
                kind: ErrorKind::Decode,
                message: "bad".to_string(),
            },
        }
    }

    #[test]
    fn test_batch_processor_creation() {
        let processor = BatchProcessor::new(ProcessingEngine::new(), 4);
        assert_eq!(processor.workers(), 4);

        let clamped = BatchProcessor::new(ProcessingEngine::new(), 0);
        assert_eq!(clamped.workers(), 1);
    }

    #[test]
    fn test_report_aggregation() {
        let report = BatchReport::from_reports(
            vec![completed("a.png", 5), failed("b.png"), completed("c.png", 5)],
            2,
            Duration::from_secs(2),
        );

        assert_eq!(report.total, 3);
        assert_eq!(report.successful, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.files_written, 12);
        assert!(report.has_failures());

        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, &PathBuf::from("b.png"));
        assert_eq!(failures[0].1, ErrorKind::Decode);
    }

    #[test]
    fn test_report_json() {
        let report = BatchReport::from_reports(vec![failed("b.png")], 1, Duration::from_millis(1500));
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["failed"], 1);
        assert_eq!(json["elapsed_secs"], 1.5);
        assert_eq!(json["reports"][0]["outcome"]["status"], "failed");
        assert_eq!(json["reports"][0]["outcome"]["kind"], "decode");
    }

    #[test]
    fn test_claim_outputs_keeps_first_owner() {
        let widths: std::sync::Arc<[u32]> = std::sync::Arc::from(vec![100]);
        let task = |name: &str| {
            ResizeTask::new(
                PathBuf::from("in").join(name),
                PathBuf::from("out").join(name),
                widths.clone(),
            )
        };

        let planned = claim_outputs(vec![task("img.png"), task("img_100px.png"), task("other.png")]);

        assert!(planned[0].1.is_none());
        assert!(planned[2].1.is_none());
        match &planned[1].1 {
            Some(ResizeError::OutputConflict { path, claimed_by }) => {
                assert_eq!(path, &PathBuf::from("out/img_100px.png"));
                assert_eq!(claimed_by, &PathBuf::from("in/img.png"));
            }
            other => panic!("Expected OutputConflict, got {:?}", other),
        }
    }

    #[test]
    fn test_conflicting_task_fails_and_first_owner_wins() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("in");
        std::fs::create_dir(&input).unwrap();
        image::RgbImage::from_pixel(400, 200, image::Rgb([10, 20, 30]))
            .save(input.join("img.png"))
            .unwrap();
        image::RgbImage::from_pixel(50, 50, image::Rgb([200, 0, 0]))
            .save(input.join("img_100px.png"))
            .unwrap();

        let tasks = crate::processing::discover_tasks(&input, dir.path().join("out"), &[100]).unwrap();
        let report = BatchProcessor::new(ProcessingEngine::new(), 4).run(tasks).unwrap();

        assert_eq!(report.successful, 1);
        assert_eq!(report.failed, 1);
        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures[0].0, &input.join("img_100px.png"));
        assert_eq!(failures[0].1, ErrorKind::Config);

        let variant = image::open(dir.path().join("out/img_100px.png")).unwrap();
        assert_eq!((variant.width(), variant.height()), (100, 50));
        assert!(!dir.path().join("out/img_100px_100px.png").exists());
    }

    #[test]
    fn test_empty_batch() {
        let processor = BatchProcessor::new(ProcessingEngine::new(), 2);
        let report = processor.run(Vec::new()).unwrap();

        assert_eq!(report.total, 0);
        assert_eq!(report.files_written, 0);
        assert!(!report.has_failures());
    }
}
