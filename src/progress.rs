//! Progress reporting and cancellation for crop sessions.
//!
//! The session reports stage transitions and per-sample render progress to a
//! [`ProgressObserver`]. Long runs can be stopped between renders through a
//! shared [`CancelToken`].

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};

/// Processing stages of a crop session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingStage {
    /// Loading the document
    #[default]
    Initializing,
    /// Grouping pages by geometry
    Clustering,
    /// Rendering sample pages into dispersion previews
    Rendering,
    /// Proposing crop rectangles
    Detecting,
    /// Mapping crop rectangles onto pages
    Cropping,
    /// Writing the output document
    Writing,
    /// Completed
    Completed,
}

impl ProcessingStage {
    /// Stage name
    pub fn name(&self) -> &'static str {
        match self {
            ProcessingStage::Initializing => "Initializing",
            ProcessingStage::Clustering => "Clustering",
            ProcessingStage::Rendering => "Rendering",
            ProcessingStage::Detecting => "Detecting",
            ProcessingStage::Cropping => "Cropping",
            ProcessingStage::Writing => "Writing",
            ProcessingStage::Completed => "Completed",
        }
    }

    /// Human readable description
    pub fn description(&self) -> &'static str {
        match self {
            ProcessingStage::Initializing => "loading document",
            ProcessingStage::Clustering => "grouping pages",
            ProcessingStage::Rendering => "rendering sample pages",
            ProcessingStage::Detecting => "detecting content bounds",
            ProcessingStage::Cropping => "applying crop rectangles",
            ProcessingStage::Writing => "writing PDF",
            ProcessingStage::Completed => "done",
        }
    }
}

impl fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.description())
    }
}

/// Output verbosity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// No output
    Quiet,
    /// Normal output (stage display only)
    #[default]
    Normal,
    /// Verbose output (sample-level progress)
    Verbose,
    /// Very verbose (debug logging)
    VeryVerbose,
}

impl OutputMode {
    /// Create OutputMode from verbosity level
    pub fn from_verbosity(level: u8) -> Self {
        match level {
            0 => OutputMode::Normal,
            1 => OutputMode::Verbose,
            _ => OutputMode::VeryVerbose,
        }
    }

    /// Check if output should be shown at this mode
    pub fn should_show(&self, required: OutputMode) -> bool {
        use OutputMode::*;
        match (self, required) {
            (Quiet, _) => false,
            (Normal, Quiet | Normal) => true,
            (Verbose, Quiet | Normal | Verbose) => true,
            (VeryVerbose, _) => true,
            _ => false,
        }
    }
}

/// Receiver of session progress
///
/// All methods default to doing nothing.
pub trait ProgressObserver {
    /// A new stage started
    fn on_stage(&self, _stage: ProcessingStage) {}

    /// Sample rendering for a cluster started
    fn on_cluster_start(&self, _cluster_index: usize, _sample_count: usize) {}

    /// One more sample page rendered (or skipped) out of `total` for the run
    fn on_sample_rendered(&self, _done: usize, _total: usize) {}
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressObserver for NoopProgress {}

/// Terminal progress bar
pub struct ConsoleProgress {
    bar: ProgressBar,
    mode: OutputMode,
}

impl ConsoleProgress {
    /// Create a bar; hidden in quiet mode
    pub fn new(mode: OutputMode) -> Self {
        let bar = if mode.should_show(OutputMode::Normal) {
            let pb = ProgressBar::new(0);
            let style = ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
            )
            .map(|s| s.progress_chars("=> "))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
            pb.set_style(style);
            pb
        } else {
            ProgressBar::hidden()
        };
        Self { bar, mode }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }
}

impl ProgressObserver for ConsoleProgress {
    fn on_stage(&self, stage: ProcessingStage) {
        if stage == ProcessingStage::Completed {
            self.bar.finish_and_clear();
            return;
        }
        self.bar.set_message(stage.description());
        if self.mode.should_show(OutputMode::Verbose) {
            self.bar.println(format!("Stage: {}", stage));
        }
    }

    fn on_cluster_start(&self, cluster_index: usize, sample_count: usize) {
        if self.mode.should_show(OutputMode::Verbose) {
            self.bar.set_message(format!(
                "cluster {} ({} samples)",
                cluster_index + 1,
                sample_count
            ));
        }
    }

    fn on_sample_rendered(&self, done: usize, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(done as u64);
    }
}

/// Shared cancellation flag, checked between sample renders
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; every clone observes it
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // PROG-001: stage names
    #[test]
    fn test_processing_stage_name() {
        assert_eq!(ProcessingStage::Initializing.name(), "Initializing");
        assert_eq!(ProcessingStage::Clustering.name(), "Clustering");
        assert_eq!(ProcessingStage::Rendering.name(), "Rendering");
        assert_eq!(ProcessingStage::Detecting.name(), "Detecting");
        assert_eq!(ProcessingStage::Cropping.name(), "Cropping");
        assert_eq!(ProcessingStage::Writing.name(), "Writing");
        assert_eq!(ProcessingStage::Completed.name(), "Completed");
    }

    // PROG-002: stage display
    #[test]
    fn test_processing_stage_display() {
        let display = format!("{}", ProcessingStage::Rendering);
        assert_eq!(display, "Rendering (rendering sample pages)");
    }

    #[test]
    fn test_processing_stage_default() {
        let stage: ProcessingStage = Default::default();
        assert_eq!(stage, ProcessingStage::Initializing);
    }

    // PROG-003: verbosity mapping
    #[test]
    fn test_output_mode_from_verbosity() {
        assert_eq!(OutputMode::from_verbosity(0), OutputMode::Normal);
        assert_eq!(OutputMode::from_verbosity(1), OutputMode::Verbose);
        assert_eq!(OutputMode::from_verbosity(2), OutputMode::VeryVerbose);
        assert_eq!(OutputMode::from_verbosity(10), OutputMode::VeryVerbose);
    }

    #[test]
    fn test_output_mode_quiet() {
        let mode = OutputMode::Quiet;
        assert!(!mode.should_show(OutputMode::Quiet));
        assert!(!mode.should_show(OutputMode::Normal));
        assert!(!mode.should_show(OutputMode::Verbose));
    }

    #[test]
    fn test_output_mode_normal() {
        let mode = OutputMode::Normal;
        assert!(mode.should_show(OutputMode::Normal));
        assert!(!mode.should_show(OutputMode::Verbose));
        assert!(!mode.should_show(OutputMode::VeryVerbose));
    }

    #[test]
    fn test_output_mode_verbose() {
        let mode = OutputMode::Verbose;
        assert!(mode.should_show(OutputMode::Normal));
        assert!(mode.should_show(OutputMode::Verbose));
        assert!(!mode.should_show(OutputMode::VeryVerbose));
    }

    // PROG-004: cancellation is shared between clones
    #[test]
    fn test_cancel_token_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_cancel_token_across_threads() {
        let token = CancelToken::new();
        let worker = token.clone();
        std::thread::spawn(move || worker.cancel()).join().unwrap();
        assert!(token.is_cancelled());
    }

    // PROG-005: default observer methods are no-ops
    #[test]
    fn test_noop_and_custom_observer() {
        struct Recorder(Mutex<Vec<ProcessingStage>>);
        impl ProgressObserver for Recorder {
            fn on_stage(&self, stage: ProcessingStage) {
                self.0.lock().unwrap().push(stage);
            }
        }

        NoopProgress.on_stage(ProcessingStage::Rendering);
        NoopProgress.on_sample_rendered(1, 2);

        let recorder = Recorder(Mutex::new(Vec::new()));
        recorder.on_stage(ProcessingStage::Clustering);
        recorder.on_sample_rendered(1, 1);
        recorder.on_stage(ProcessingStage::Completed);
        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec![ProcessingStage::Clustering, ProcessingStage::Completed]
        );
    }

    #[test]
    fn test_console_progress_quiet_is_hidden() {
        let progress = ConsoleProgress::new(OutputMode::Quiet);
        assert_eq!(progress.mode(), OutputMode::Quiet);
        progress.on_stage(ProcessingStage::Rendering);
        progress.on_sample_rendered(3, 10);
        progress.on_stage(ProcessingStage::Completed);
        assert!(progress.bar.is_hidden());
    }
}
