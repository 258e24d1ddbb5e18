//! Polling folder watcher
//!
//! One watcher instance drives one pipeline over one directory. There is no
//! filesystem-event machinery on the rig's SBC image, so ingestion is a plain
//! poll-sleep loop: list, diff against what this process already handled,
//! convert in lexical filename order.
//!
//! Failures are isolated per file. A frame that keeps failing is quarantined
//! after a bounded number of attempts so a truncated capture cannot occupy
//! the loop forever; quarantine lasts for the process lifetime only, like the
//! processed set itself.

use std::collections::{HashMap, HashSet};
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::pipeline::common::error::{PipelineError, Result};

/// A pipeline the watcher can hand discovered files to.
pub trait FrameProcessor {
    /// Short pipeline name for log lines.
    fn name(&self) -> &str;

    fn process(&self, path: &Path) -> Result<()>;
}

/// Sleep source, injectable so scheduler tests run without wall-clock delay.
pub trait Clock {
    fn sleep(&self, duration: Duration);
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Directory polled for new frames
    pub directory: PathBuf,
    /// Accepted file extensions, matched case-insensitively
    pub extensions: Vec<String>,
    /// Delay between ticks
    pub poll_interval: Duration,
    /// Delay before retrying when the watched directory is absent
    pub missing_dir_backoff: Duration,
    /// Failed conversions per file before it is quarantined
    pub max_attempts: u32,
}

impl WatchConfig {
    pub fn new(directory: PathBuf, extensions: &[&str], poll_interval: Duration) -> Self {
        Self {
            directory,
            extensions: extensions.iter().map(|e| e.to_lowercase()).collect(),
            poll_interval,
            missing_dir_backoff: Duration::from_secs(5),
            max_attempts: 3,
        }
    }
}

/// What one tick did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// New files seen this tick
    pub discovered: usize,
    /// Conversions that succeeded
    pub converted: usize,
    /// Conversions that failed (the files stay eligible for retry)
    pub failed: usize,
}

pub struct FolderWatcher<P: FrameProcessor, C: Clock = SystemClock> {
    config: WatchConfig,
    processor: P,
    clock: C,
    processed: HashSet<OsString>,
    attempts: HashMap<OsString, u32>,
    quarantined: HashSet<OsString>,
}

impl<P: FrameProcessor> FolderWatcher<P, SystemClock> {
    pub fn new(config: WatchConfig, processor: P) -> Self {
        Self::with_clock(config, processor, SystemClock)
    }
}

impl<P: FrameProcessor, C: Clock> FolderWatcher<P, C> {
    pub fn with_clock(config: WatchConfig, processor: P, clock: C) -> Self {
        Self {
            config,
            processor,
            clock,
            processed: HashSet::new(),
            attempts: HashMap::new(),
            quarantined: HashSet::new(),
        }
    }

    /// List the watched directory and process every file not yet handled,
    /// in lexical filename order. Does not sleep.
    pub fn tick(&mut self) -> Result<TickReport> {
        let entries = match fs::read_dir(&self.config.directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(PipelineError::MissingDirectory(
                    self.config.directory.display().to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        };

        let mut names: Vec<OsString> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name())
            .filter(|name| self.accepts(name))
            .collect();
        names.sort();

        let mut report = TickReport::default();
        for name in names {
            if self.processed.contains(&name) || self.quarantined.contains(&name) {
                continue;
            }
            report.discovered += 1;
            let path = self.config.directory.join(&name);
            match self.processor.process(&path) {
                Ok(()) => {
                    self.processed.insert(name.clone());
                    self.attempts.remove(&name);
                    report.converted += 1;
                }
                Err(e) => {
                    report.failed += 1;
                    let attempts = self.attempts.entry(name.clone()).or_insert(0);
                    *attempts += 1;
                    error!(
                        pipeline = self.processor.name(),
                        attempt = *attempts,
                        "Failed to process {}: {}",
                        path.display(),
                        e
                    );
                    if *attempts >= self.config.max_attempts {
                        warn!(
                            pipeline = self.processor.name(),
                            "Quarantining {} after {} failed attempts",
                            path.display(),
                            attempts
                        );
                        self.quarantined.insert(name.clone());
                        self.attempts.remove(&name);
                    }
                }
            }
        }
        Ok(report)
    }

    /// One scheduler step: tick, then sleep the appropriate delay.
    pub fn poll_once(&mut self) {
        match self.tick() {
            Ok(report) => {
                if report.discovered > 0 {
                    debug!(
                        pipeline = self.processor.name(),
                        converted = report.converted,
                        failed = report.failed,
                        "Tick complete"
                    );
                }
                self.clock.sleep(self.config.poll_interval);
            }
            Err(PipelineError::MissingDirectory(dir)) => {
                error!(
                    pipeline = self.processor.name(),
                    "Directory not found: {dir}"
                );
                self.clock.sleep(self.config.missing_dir_backoff);
            }
            Err(e) => {
                error!(
                    pipeline = self.processor.name(),
                    "Failed to list watched directory: {e}"
                );
                self.clock.sleep(self.config.poll_interval);
            }
        }
    }

    /// Run until the process is terminated.
    pub fn run(&mut self) -> ! {
        info!(
            pipeline = self.processor.name(),
            "Monitoring {} for new frames",
            self.config.directory.display()
        );
        loop {
            self.poll_once();
        }
    }

    fn accepts(&self, name: &OsString) -> bool {
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .is_some_and(|e| self.config.extensions.iter().any(|accepted| *accepted == e))
    }
}
