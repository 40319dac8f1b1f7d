/*!
 * Progress and log reporting.
 *
 * Long-running work reports through a [`ProgressSink`] instead of printing,
 * so the same driver can feed an `indicatif` bar, the `log` facade or a
 * test buffer. Sinks are shared across concurrent file jobs and must accept
 * calls from several tasks at once.
 */

use indicatif::{ProgressBar, ProgressStyle};
use log::Level;
use parking_lot::Mutex;

/// Receives progress updates and user-facing log lines
pub trait ProgressSink: Send + Sync {
    /// `current` of `total` units are done
    fn on_progress(&self, current: usize, total: usize, message: &str);

    /// A message worth showing or recording
    fn on_log(&self, level: Level, message: &str);
}

impl<S: ProgressSink + ?Sized> ProgressSink for &S {
    fn on_progress(&self, current: usize, total: usize, message: &str) {
        (**self).on_progress(current, total, message)
    }

    fn on_log(&self, level: Level, message: &str) {
        (**self).on_log(level, message)
    }
}

/// Captured log line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: Level,
    pub message: String,
}

/// Forwards everything to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn on_progress(&self, current: usize, total: usize, message: &str) {
        log::debug!("[{}/{}] {}", current, total, message);
    }

    fn on_log(&self, level: Level, message: &str) {
        log::log!(level, "{}", message);
    }
}

/// Event recorded by [`CollectingSink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Progress { current: usize, total: usize, message: String },
    Log(LogEntry),
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().clone()
    }

    /// `(current, total)` pairs in arrival order
    pub fn progress(&self) -> Vec<(usize, usize)> {
        self.events.lock()
            .iter()
            .filter_map(|event| match event {
                ProgressEvent::Progress { current, total, .. } => Some((*current, *total)),
                ProgressEvent::Log(_) => None,
            })
            .collect()
    }

    /// Log entries at `level` or more severe
    pub fn logs_at_least(&self, level: Level) -> Vec<LogEntry> {
        self.events.lock()
            .iter()
            .filter_map(|event| match event {
                ProgressEvent::Log(entry) if entry.level <= level => Some(entry.clone()),
                _ => None,
            })
            .collect()
    }
}

impl ProgressSink for CollectingSink {
    fn on_progress(&self, current: usize, total: usize, message: &str) {
        self.events.lock().push(ProgressEvent::Progress {
            current,
            total,
            message: message.to_string(),
        });
    }

    fn on_log(&self, level: Level, message: &str) {
        self.events.lock().push(ProgressEvent::Log(LogEntry {
            level,
            message: message.to_string(),
        }));
    }
}

/// Drives an `indicatif` bar; log lines are printed above it
pub struct ProgressBarSink {
    bar: ProgressBar,
}

impl ProgressBarSink {
    /// Wrap a bar, applying the standard style with `unit` as the counted noun
    pub fn new(bar: ProgressBar, unit: &str) -> Self {
        let template = format!(
            "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} ({{percent}}%) {{msg}}",
            unit
        );
        let style = ProgressStyle::default_bar()
            .template(&template)
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style.progress_chars("█▓▒░"));

        Self { bar }
    }

    pub fn bar(&self) -> &ProgressBar {
        &self.bar
    }

    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressSink for ProgressBarSink {
    fn on_progress(&self, current: usize, total: usize, message: &str) {
        self.bar.set_length(total as u64);
        self.bar.set_position(current as u64);
        self.bar.set_message(message.to_string());
    }

    fn on_log(&self, level: Level, message: &str) {
        self.bar.suspend(|| log::log!(level, "{}", message));
    }
}

/// Passes events through and keeps warnings and errors for the issues log
pub struct IssueRecorder<S> {
    inner: S,
    issues: Mutex<Vec<LogEntry>>,
}

impl<S: ProgressSink> IssueRecorder<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            issues: Mutex::new(Vec::new()),
        }
    }

    pub fn issues(&self) -> Vec<LogEntry> {
        self.issues.lock().clone()
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: ProgressSink> ProgressSink for IssueRecorder<S> {
    fn on_progress(&self, current: usize, total: usize, message: &str) {
        self.inner.on_progress(current, total, message);
    }

    fn on_log(&self, level: Level, message: &str) {
        if level <= Level::Warn {
            self.issues.lock().push(LogEntry {
                level,
                message: message.to_string(),
            });
        }
        self.inner.on_log(level, message);
    }
}
