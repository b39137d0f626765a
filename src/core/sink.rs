use crate::domain::model::{LogEntry, Severity};
use crate::domain::ports::LogSink;
use std::sync::Mutex;

/// Used when no display is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl LogSink for NullSink {
    fn emit(&self, _message: &str) {}
}

/// Writes every message to the `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn emit(&self, message: &str) {
        match Severity::of(message) {
            Severity::Error => tracing::error!("{}", message),
            Severity::Success | Severity::Info => tracing::info!("{}", message),
        }
    }
}

/// Keeps every entry in memory, in emission order.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.entries().into_iter().map(|e| e.message).collect()
    }

    /// Entries that end a job (everything but `Converting:` lines).
    pub fn terminal_messages(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| !e.is_progress())
            .map(|e| e.message)
            .collect()
    }
}

impl LogSink for MemorySink {
    fn emit(&self, message: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(LogEntry::new(message));
        }
    }
}

/// Prints each entry to stdout as it arrives.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl LogSink for ConsoleSink {
    fn emit(&self, message: &str) {
        println!("{}", render_entry(&LogEntry::new(message)));
    }
}

/// Renders an entry for a terminal: timestamp, severity marker, message.
pub fn render_entry(entry: &LogEntry) -> String {
    let marker = match entry.severity() {
        Severity::Success => "✅",
        Severity::Error => "❌",
        Severity::Info => "  ",
    };
    format!(
        "[{}] {} {}",
        entry.timestamp.format("%H:%M:%S"),
        marker,
        entry.message
    )
}
