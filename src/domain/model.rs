use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One input path submitted in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub source: PathBuf,
    pub basename: String,
    /// Lower-cased, including the leading dot (`.epub`), empty if none.
    pub extension: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Convert,
    Copy,
}

impl Job {
    /// Builds a job from user input, trimming surrounding whitespace.
    pub fn from_raw(raw: &str) -> Self {
        Self::from_source(PathBuf::from(raw.trim()))
    }

    /// Like [`Job::from_raw`]; non UTF-8 paths are taken as they are.
    pub fn from_path(path: &Path) -> Self {
        match path.to_str() {
            Some(raw) => Self::from_raw(raw),
            None => Self::from_source(path.to_path_buf()),
        }
    }

    fn from_source(source: PathBuf) -> Self {
        let basename = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = Path::new(&basename)
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
            .unwrap_or_default();

        Self {
            source,
            basename,
            extension,
        }
    }

    pub fn kind(&self) -> JobKind {
        if self.extension == ".epub" {
            JobKind::Convert
        } else {
            JobKind::Copy
        }
    }

    /// `<stem>.<target_extension>`
    pub fn output_name(&self, target_extension: &str) -> String {
        let stem = Path::new(&self.basename)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.basename.clone());
        format!("{}.{}", stem, target_extension)
    }

    pub fn exists(&self) -> bool {
        !self.basename.is_empty() && self.source.is_file()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    Succeeded,
    ExitFailure { stderr: String },
    TimedOut,
    SpawnFailed { error: String },
}

impl ConversionOutcome {
    /// Last non-empty stderr line, or `unknown error`.
    pub fn failure_reason(stderr: &str) -> String {
        stderr
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .last()
            .unwrap_or("unknown error")
            .to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Error,
}

impl Severity {
    pub fn of(message: &str) -> Self {
        if message.starts_with("Done:") || message.starts_with("Copied:") {
            Severity::Success
        } else if message.starts_with("ERROR") || message.starts_with("FAILED") {
            Severity::Error
        } else {
            Severity::Info
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub message: String,
    pub timestamp: DateTime<Local>,
}

impl LogEntry {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timestamp: Local::now(),
        }
    }

    pub fn severity(&self) -> Severity {
        Severity::of(&self.message)
    }

    /// `Converting:` lines precede the terminal line for the same job.
    pub fn is_progress(&self) -> bool {
        self.message.starts_with("Converting:")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub converter_available: bool,
    pub server_url: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub copied: usize,
    pub converted: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.copied + self.converted + self.skipped + self.failed
    }
}
