#![allow(dead_code)]

use kindle_drop::core::sink::MemorySink;
use kindle_drop::{CalibreConverter, IntakePipeline};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub struct Workspace {
    pub root: TempDir,
    pub sink: Arc<MemorySink>,
}

impl Workspace {
    pub fn new() -> Self {
        let root = TempDir::new().unwrap();
        std::fs::create_dir(root.path().join("inbox")).unwrap();
        Self {
            root,
            sink: Arc::new(MemorySink::new()),
        }
    }

    pub fn inbox(&self) -> PathBuf {
        self.root.path().join("inbox")
    }

    pub fn serve_dir(&self) -> PathBuf {
        self.root.path().join("kindle_drop")
    }

    pub fn source(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.inbox().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    pub fn served_files(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(self.serve_dir()) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    /// Writes an executable shell script standing in for ebook-convert.
    #[cfg(unix)]
    pub fn stub_converter(&self, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = self.root.path().join("ebook-convert");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    pub fn pipeline(
        &self,
        converter: &Path,
        timeout: Duration,
    ) -> IntakePipeline<CalibreConverter, Arc<MemorySink>> {
        IntakePipeline::new(
            self.serve_dir(),
            "azw3",
            CalibreConverter::new(converter, timeout),
            self.sink.clone(),
        )
    }
}
