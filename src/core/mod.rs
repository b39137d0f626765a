pub mod api;
pub mod converter;
pub mod network;
pub mod picker;
pub mod pipeline;
pub mod server;
pub mod sink;

pub use crate::domain::model::{BatchSummary, ConversionOutcome, Job, JobKind, LogEntry, Severity, Status};
pub use crate::domain::ports::{Converter, FilePicker, LogSink};
pub use crate::utils::error::Result;
