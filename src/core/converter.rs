use crate::domain::model::ConversionOutcome;
use crate::domain::ports::Converter;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Calibre's `ebook-convert`, run as `<program> <input> <output>`.
#[derive(Debug, Clone)]
pub struct CalibreConverter {
    program: PathBuf,
    timeout: Duration,
    available: bool,
}

impl CalibreConverter {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        let program = program.into();
        let available = program.is_file();
        if available {
            tracing::debug!("Converter found at {}", program.display());
        } else {
            tracing::warn!("Converter not found at {}", program.display());
        }

        Self {
            program,
            timeout,
            available,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl Converter for CalibreConverter {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn convert(&self, input: &Path, output: &Path) -> ConversionOutcome {
        let child = Command::new(&self.program)
            .arg(input)
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) => {
                tracing::error!("Failed to start {}: {}", self.program.display(), e);
                return ConversionOutcome::SpawnFailed {
                    error: e.to_string(),
                };
            }
        };

        // On timeout the future is dropped, which drops the child and
        // kill_on_drop terminates it.
        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) if output.status.success() => ConversionOutcome::Succeeded,
            Ok(Ok(output)) => {
                tracing::debug!(
                    "Converter exited with {:?} for {}",
                    output.status.code(),
                    input.display()
                );
                ConversionOutcome::ExitFailure {
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                }
            }
            Ok(Err(e)) => ConversionOutcome::SpawnFailed {
                error: e.to_string(),
            },
            Err(_) => {
                tracing::warn!(
                    "Conversion of {} exceeded {:?}, killed",
                    input.display(),
                    self.timeout
                );
                ConversionOutcome::TimedOut
            }
        }
    }
}
