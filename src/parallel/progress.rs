//! Progress tracking for parallel operations

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, Sender};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::{debug, info};

/// Thread-safe progress tracker shared by every worker of a batch.
///
/// Counters are atomics; the mutexes only guard the start time and the
/// subscriber list.
pub struct ProgressTracker {
    total: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
    start_time: Mutex<Option<Instant>>,
    subscribers: Mutex<Vec<Sender<ProgressUpdate>>>,
}

/// Snapshot of batch progress
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressState {
    pub total_files: usize,
    pub completed_files: usize,
    pub failed_files: usize,
    pub elapsed_time: Duration,
}

/// Progress update event
#[derive(Debug, Clone)]
pub enum ProgressUpdate {
    Started {
        total_files: usize,
        workers: usize,
    },
    FileCompleted {
        path: PathBuf,
        completed: usize,
        files_written: usize,
    },
    FileFailed {
        path: PathBuf,
        failed: usize,
        error: String,
    },
    BatchCompleted {
        final_state: ProgressState,
    },
}

impl ProgressTracker {
    /// Create a new progress tracker
    pub fn new() -> Self {
        Self {
            total: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            start_time: Mutex::new(None),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Reset counters and start tracking a batch
    pub fn start(&self, total_files: usize, workers: usize) {
        *lock(&self.start_time) = Some(Instant::now());
        self.total.store(total_files, Ordering::Relaxed);
        self.completed.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);

        self.broadcast(ProgressUpdate::Started {
            total_files,
            workers,
        });

        info!("Started progress tracking for {} files", total_files);
    }

    /// Record a successful task; returns the number completed so far
    pub fn complete_file(&self, path: PathBuf, files_written: usize) -> usize {
        let completed = self.completed.fetch_add(1, Ordering::Relaxed) + 1;
        debug!("Completed processing file: {:?} ({} so far)", path, completed);

        self.broadcast(ProgressUpdate::FileCompleted {
            path,
            completed,
            files_written,
        });
        completed
    }

    /// Record a failed task; returns the number failed so far
    pub fn fail_file(&self, path: PathBuf, error: String) -> usize {
        let failed = self.failed.fetch_add(1, Ordering::Relaxed) + 1;
        self.broadcast(ProgressUpdate::FileFailed {
            path,
            failed,
            error,
        });
        failed
    }

    /// Get current progress state
    pub fn get_state(&self) -> ProgressState {
        let start_time = *lock(&self.start_time);
        let elapsed_time = start_time
            .map(|start| start.elapsed())
            .unwrap_or_default();

        ProgressState {
            total_files: self.total.load(Ordering::Relaxed),
            completed_files: self.completed.load(Ordering::Relaxed),
            failed_files: self.failed.load(Ordering::Relaxed),
            elapsed_time,
        }
    }

    /// Subscribe to progress updates
    pub fn subscribe(&self) -> Receiver<ProgressUpdate> {
        let (sender, receiver) = channel::unbounded();
        lock(&self.subscribers).push(sender);
        receiver
    }

    /// Mark batch as completed
    pub fn complete_batch(&self) -> ProgressState {
        let final_state = self.get_state();

        self.broadcast(ProgressUpdate::BatchCompleted {
            final_state: final_state.clone(),
        });

        info!(
            "Batch processing completed: {}/{} files successful in {:.2}s",
            final_state.completed_files,
            final_state.total_files,
            final_state.elapsed_time.as_secs_f64()
        );
        final_state
    }

    /// Disconnect every subscriber so their receive loops end
    pub fn close(&self) {
        lock(&self.subscribers).clear();
    }

    fn broadcast(&self, update: ProgressUpdate) {
        let mut subscribers = lock(&self.subscribers);
        subscribers.retain(|sender| sender.send(update.clone()).is_ok());
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ProgressState {
    pub fn processed(&self) -> usize {
        self.completed_files + self.failed_files
    }

    /// Get human-readable completion status
    pub fn status_text(&self) -> String {
        format!("{}/{} files processed", self.processed(), self.total_files)
    }
}

/// How the console reporter renders progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStyle {
    /// Live progress bar (interactive terminals)
    Bar,
    /// One line per completed file
    Lines,
    /// Nothing
    Silent,
}

impl ReportStyle {
    /// Bar on a terminal, plain lines otherwise
    pub fn detect() -> Self {
        if console::Term::stdout().is_term() {
            Self::Bar
        } else {
            Self::Lines
        }
    }
}

/// Console progress reporter
pub struct ConsoleProgressReporter {
    receiver: Receiver<ProgressUpdate>,
    style: ReportStyle,
}

impl ConsoleProgressReporter {
    /// Create a new console progress reporter
    pub fn new(tracker: &ProgressTracker, style: ReportStyle) -> Self {
        Self {
            receiver: tracker.subscribe(),
            style,
        }
    }

    /// Report progress until the batch completes or the tracker closes
    pub fn run(self) {
        let mut bar: Option<ProgressBar> = None;

        for update in self.receiver.iter() {
            match update {
                ProgressUpdate::Started { total_files, .. } => {
                    if self.style == ReportStyle::Bar {
                        bar = Some(progress_bar(total_files));
                    }
                }
                ProgressUpdate::FileCompleted { completed, .. } => match (&bar, self.style) {
                    (Some(pb), _) => {
                        pb.inc(1);
                        pb.set_message(format!("Resized {} images so far...", completed));
                    }
                    (None, ReportStyle::Lines) => {
                        println!("Resized {} images so far...", completed);
                    }
                    _ => {}
                },
                ProgressUpdate::FileFailed { .. } => {
                    if let Some(pb) = &bar {
                        pb.inc(1);
                    }
                }
                ProgressUpdate::BatchCompleted { .. } => break,
            }
        }

        if let Some(pb) = bar {
            pb.finish_and_clear();
        }
    }
}

fn progress_bar(total: usize) -> ProgressBar {
    let pb = ProgressBar::with_draw_target(Some(total as u64), ProgressDrawTarget::stdout());
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}
