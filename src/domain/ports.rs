use crate::domain::model::ConversionOutcome;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One-way, ordered channel from the pipeline to whatever displays progress.
pub trait LogSink: Send + Sync {
    fn emit(&self, message: &str);
}

impl<T: LogSink + ?Sized> LogSink for Arc<T> {
    fn emit(&self, message: &str) {
        (**self).emit(message)
    }
}

#[async_trait]
pub trait Converter: Send + Sync {
    /// Checked once when the converter is constructed.
    fn is_available(&self) -> bool;

    async fn convert(&self, input: &Path, output: &Path) -> ConversionOutcome;
}

/// Source of user-selected file paths (a native dialog, a terminal prompt).
#[async_trait]
pub trait FilePicker: Send + Sync {
    /// `None` when the user cancelled.
    async fn pick_files(&self) -> Option<Vec<PathBuf>>;
}
