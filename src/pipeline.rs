//! Runs the strip over a whole directory tree with a pool of worker threads.
//!
//! The coordinating thread walks the input tree and feeds one [`Task`] per
//! matching file into a bounded queue. Worker threads are started when the
//! first task turns up and pull tasks until the queue is closed and empty.
//! The queue's capacity doesn't depend on the size of the tree: when it's
//! full, the walk waits for the workers to catch up. Because workers write
//! while the walk is still going, the output directory is never walked, even
//! when it sits inside the input tree.
//!
//! Each task runs in isolation. An error (or even a panic) while processing
//! one file is logged, recorded as [`TaskState::Failed`], and the worker moves
//! on to the next task.

use std::{
  fs,
  panic::{self, AssertUnwindSafe},
  path::{Path, PathBuf},
  sync::Arc,
  thread::{self, JoinHandle},
  time::{Duration, Instant},
};

use crossbeam_channel::Receiver;
use tracing::{debug, error, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::{
  png::{read_document_from_path, read_verified_document_from_path, Stripper},
  sink::OutputSink,
  Config, PipelineError, PngResult,
};

/// One file to process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
  /// Position in enumeration order, starting at 0.
  pub id: usize,
  pub input: PathBuf,
  pub output: PathBuf,
}

/// Lifecycle of a [`Task`].
///
/// `Pending -> Running -> Completed | Failed`. There's no retry, a terminal
/// state is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
  Pending,
  Running,
  Completed,
  Failed,
}
impl TaskState {
  #[inline]
  #[must_use]
  pub const fn is_terminal(self) -> bool {
    matches!(self, Self::Completed | Self::Failed)
  }
}

/// What happened to one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
  pub id: usize,
  pub input: PathBuf,
  /// Always a terminal state.
  pub state: TaskState,
  /// The file that was written, when the task completed.
  pub written: Option<PathBuf>,
  /// Display text of the failure, when the task failed.
  pub error: Option<String>,
  /// Index of the worker that ran it.
  pub worker: usize,
}

/// Summary of a whole run.
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
  /// Tasks created by the walk.
  pub enumerated: usize,
  /// Directory entries that couldn't be read and were skipped.
  pub skipped_entries: usize,
  pub completed: usize,
  pub failed: usize,
  pub workers_spawned: usize,
  /// One per task, sorted by task id.
  pub outcomes: Vec<TaskOutcome>,
  /// Time the walk spent on its own work: reading directories and building
  /// tasks. Time spent waiting on a full queue is not included.
  pub enumeration_elapsed: Duration,
  /// Time the walk spent waiting for room in the queue. This overlaps with
  /// [`execution_elapsed`](PipelineReport::execution_elapsed).
  pub enumeration_blocked: Duration,
  /// Time from starting the workers until the last one finished.
  pub execution_elapsed: Duration,
}

/// The work done for each file.
pub trait FileProcessor: Send + Sync {
  /// Processes one task, returning the path of the file that was written.
  fn process(&self, task: &Task) -> PngResult<PathBuf>;
}

/// Decode, strip, and write: the normal per-file work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StripProcessor {
  pub stripper: Stripper,
  pub sink: OutputSink,
  pub verify_signature: bool,
}
impl StripProcessor {
  #[must_use]
  pub fn from_config(config: &Config) -> Self {
    Self {
      stripper: config.stripper(),
      sink: config.sink(),
      verify_signature: config.verify_signature,
    }
  }
}
impl FileProcessor for StripProcessor {
  fn process(&self, task: &Task) -> PngResult<PathBuf> {
    let document = if self.verify_signature {
      read_verified_document_from_path(&task.input)?
    } else {
      read_document_from_path(&task.input)?
    };
    let bytes = self.stripper.strip(&document, &task.output)?;
    drop(document);
    self.sink.write(&bytes, &task.output)
  }
}

/// A configured batch run.
pub struct BatchPipeline {
  config: Arc<Config>,
  processor: Arc<dyn FileProcessor>,
}
impl BatchPipeline {
  /// A pipeline that strips files as described by the config.
  #[must_use]
  pub fn new(config: Config) -> Self {
    let processor = Arc::new(StripProcessor::from_config(&config));
    Self::with_processor(config, processor)
  }

  /// A pipeline that runs some other per-file work.
  #[must_use]
  pub fn with_processor(config: Config, processor: Arc<dyn FileProcessor>) -> Self {
    Self { config: Arc::new(config), processor }
  }

  #[inline]
  #[must_use]
  pub fn config(&self) -> &Config {
    &self.config
  }

  /// Walks the input tree and runs every matching file through the workers.
  ///
  /// Returns once every worker has finished.
  ///
  /// ## Failure
  /// Only problems with the run as a whole are errors here. Per-file failures
  /// show up in the report instead.
  /// * [`PipelineError::InputNotADirectory`] if the input dir isn't one.
  /// * [`PipelineError::OutputDir`] if the output dir can't be created.
  /// * [`PipelineError::WorkerSpawn`] if a worker thread can't be started.
  /// * [`PipelineError::WorkerPanicked`] if a worker dies outside a task.
  pub fn run(&self) -> Result<PipelineReport, PipelineError> {
    let config = &*self.config;
    if !config.input_dir.is_dir() {
      return Err(PipelineError::InputNotADirectory(config.input_dir.clone()));
    }
    fs::create_dir_all(&config.output_dir)
      .map_err(|e| PipelineError::OutputDir(config.output_dir.clone(), e))?;
    let output_root = fs::canonicalize(&config.output_dir)
      .map_err(|e| PipelineError::OutputDir(config.output_dir.clone(), e))?;
    info!(
      input = %config.input_dir.display(),
      output = %config.output_dir.display(),
      workers = config.workers,
      verify_checksums = config.verify_checksums,
      encoder = ?config.encoder.as_ref().map(|e| &e.program),
      "starting batch"
    );

    let walk_start = Instant::now();
    let mut execution_start = None;
    let (task_tx, task_rx) = crossbeam_channel::bounded::<Task>(config.queue_capacity.max(1));
    let mut handles: Vec<JoinHandle<Vec<TaskOutcome>>> = Vec::new();
    let mut report = PipelineReport::default();

    let mut blocked = Duration::ZERO;
    let walk = WalkDir::new(&config.input_dir)
      .follow_links(true)
      .into_iter()
      .filter_entry(|entry| !is_output_dir(entry, &output_root));
    for entry in walk {
      let entry = match entry {
        Ok(entry) => entry,
        Err(e) => {
          warn!(error = %e, "skipping unreadable directory entry");
          report.skipped_entries += 1;
          continue;
        }
      };
      if !entry.file_type().is_file() || !config.matches_extension(entry.path()) {
        continue;
      }
      let task = Task {
        id: report.enumerated,
        input: entry.path().to_path_buf(),
        output: config.output_path_for(entry.path()),
      };
      if handles.is_empty() {
        execution_start = Some(Instant::now());
        handles = self.spawn_workers(&task_rx)?;
      }
      report.enumerated += 1;
      let send_start = Instant::now();
      let sent = task_tx.send(task);
      blocked += send_start.elapsed();
      if sent.is_err() {
        // every receiver is gone, so every worker is gone
        error!("all workers exited early, stopping the walk");
        break;
      }
    }
    // Closing the queue: workers drain what's left and then exit.
    drop(task_tx);
    drop(task_rx);
    report.enumeration_blocked = blocked;
    report.enumeration_elapsed = walk_start.elapsed().saturating_sub(blocked);
    info!(
      tasks = report.enumerated,
      skipped = report.skipped_entries,
      seconds = report.enumeration_elapsed.as_secs_f64(),
      blocked_seconds = report.enumeration_blocked.as_secs_f64(),
      "collected tasks"
    );

    report.workers_spawned = handles.len();
    report.outcomes = join_workers(handles)?;
    report.execution_elapsed = execution_start.map(|t| t.elapsed()).unwrap_or_default();
    report.outcomes.sort_by_key(|outcome| outcome.id);
    report.completed = report.outcomes.iter().filter(|o| o.state == TaskState::Completed).count();
    report.failed = report.outcomes.iter().filter(|o| o.state == TaskState::Failed).count();

    info!(
      completed = report.completed,
      failed = report.failed,
      seconds = report.execution_elapsed.as_secs_f64(),
      "batch complete"
    );
    Ok(report)
  }

  fn spawn_workers(
    &self, task_rx: &Receiver<Task>,
  ) -> Result<Vec<JoinHandle<Vec<TaskOutcome>>>, PipelineError> {
    let worker_count = self.config.workers.max(1);
    let mut handles = Vec::with_capacity(worker_count);
    for worker in 0..worker_count {
      let rx = task_rx.clone();
      let processor = Arc::clone(&self.processor);
      let handle = thread::Builder::new()
        .name(format!("strip-worker-{worker}"))
        .spawn(move || {
          debug!(worker, "worker started");
          let mut outcomes = Vec::new();
          for task in rx.iter() {
            outcomes.push(run_task(worker, processor.as_ref(), task));
          }
          debug!(worker, tasks = outcomes.len(), "worker finished");
          outcomes
        })
        .map_err(PipelineError::WorkerSpawn)?;
      handles.push(handle);
    }
    Ok(handles)
  }
}

/// If a directory below the walk root resolves to the output directory.
fn is_output_dir(entry: &DirEntry, output_root: &Path) -> bool {
  entry.depth() > 0
    && entry.file_type().is_dir()
    && fs::canonicalize(entry.path()).map_or(false, |p| p == output_root)
}

/// Joins every worker, even after one of them turns out to have panicked, and
/// reports the first panic.
fn join_workers(
  handles: Vec<JoinHandle<Vec<TaskOutcome>>>,
) -> Result<Vec<TaskOutcome>, PipelineError> {
  let mut outcomes = Vec::new();
  let mut first_panic = None;
  for (worker, handle) in handles.into_iter().enumerate() {
    match handle.join() {
      Ok(worker_outcomes) => outcomes.extend(worker_outcomes),
      Err(_) => {
        error!(worker, "worker panicked");
        first_panic.get_or_insert(worker);
      }
    }
  }
  match first_panic {
    Some(worker) => Err(PipelineError::WorkerPanicked(worker)),
    None => Ok(outcomes),
  }
}

/// Runs one task to a terminal state, catching errors and panics.
fn run_task(worker: usize, processor: &dyn FileProcessor, task: Task) -> TaskOutcome {
  debug!(worker, id = task.id, input = %task.input.display(), state = ?TaskState::Running, "processing");

  let result = panic::catch_unwind(AssertUnwindSafe(|| processor.process(&task)));
  let (state, written, error) = match result {
    Ok(Ok(written)) => {
      debug!(worker, id = task.id, output = %written.display(), "completed");
      (TaskState::Completed, Some(written), None)
    }
    Ok(Err(e)) => {
      warn!(worker, id = task.id, input = %task.input.display(), error = %e, "failed");
      (TaskState::Failed, None, Some(e.to_string()))
    }
    Err(payload) => {
      let message = panic_message(payload.as_ref());
      warn!(worker, id = task.id, input = %task.input.display(), panic = %message, "panicked");
      (TaskState::Failed, None, Some(format!("panicked: {message}")))
    }
  };
  TaskOutcome { id: task.id, input: task.input, state, written, error, worker }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
  if let Some(s) = payload.downcast_ref::<&str>() {
    (*s).to_string()
  } else if let Some(s) = payload.downcast_ref::<String>() {
    s.clone()
  } else {
    "<unknown panic>".to_string()
  }
}
