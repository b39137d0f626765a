use crate::core::network;
use crate::core::pipeline::IntakePipeline;
use crate::domain::model::{BatchSummary, Status};
use crate::domain::ports::{Converter, FilePicker, LogSink};
use crate::utils::error::Result;
use std::net::Ipv4Addr;
use std::path::Path;

/// Process-wide facts the UI shows, decided once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppContext {
    pub server_url: String,
    pub converter_available: bool,
}

impl AppContext {
    pub fn new(lan_ip: Ipv4Addr, port: u16, converter_available: bool) -> Self {
        Self {
            server_url: network::server_url(lan_ip, port),
            converter_available,
        }
    }
}

/// The entry points a front end (window, terminal) drives.
pub struct KindleDropApi<C: Converter, L: LogSink, P: FilePicker> {
    context: AppContext,
    pipeline: IntakePipeline<C, L>,
    picker: P,
}

impl<C: Converter, L: LogSink, P: FilePicker> KindleDropApi<C, L, P> {
    pub fn new(context: AppContext, pipeline: IntakePipeline<C, L>, picker: P) -> Self {
        Self {
            context,
            pipeline,
            picker,
        }
    }

    pub fn get_status(&self) -> Status {
        Status {
            converter_available: self.context.converter_available,
            server_url: self.context.server_url.clone(),
        }
    }

    pub fn status_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.get_status())?)
    }

    /// Asks the picker for files and processes them. Returns `None` when the
    /// user picked nothing.
    pub async fn choose_and_process(&self) -> Option<BatchSummary> {
        let paths = self.picker.pick_files().await?;
        if paths.is_empty() {
            return None;
        }
        Some(self.process_files(paths).await)
    }

    pub async fn process_files<I>(&self, paths: I) -> BatchSummary
    where
        I: IntoIterator,
        I::Item: AsRef<Path>,
    {
        self.pipeline.process_files(paths).await
    }

    pub fn picker(&self) -> &P {
        &self.picker
    }
}
