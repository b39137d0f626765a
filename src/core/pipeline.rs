use crate::config::AppConfig;
use crate::domain::model::{BatchSummary, ConversionOutcome, Job, JobKind};
use crate::domain::ports::{Converter, LogSink};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobOutcome {
    Copied,
    Converted,
    Skipped,
    Failed,
}

/// Converts or copies each submitted file into the serve directory, one at a
/// time and in order, reporting every step to the log sink. Never fails:
/// problems become log lines.
pub struct IntakePipeline<C: Converter, L: LogSink> {
    serve_dir: PathBuf,
    target_extension: String,
    converter: C,
    sink: L,
    batch_lock: Mutex<()>,
}

impl<C: Converter, L: LogSink> IntakePipeline<C, L> {
    pub fn new(
        serve_dir: impl Into<PathBuf>,
        target_extension: impl Into<String>,
        converter: C,
        sink: L,
    ) -> Self {
        Self {
            serve_dir: serve_dir.into(),
            target_extension: target_extension.into(),
            converter,
            sink,
            batch_lock: Mutex::new(()),
        }
    }

    pub fn from_config(config: &AppConfig, converter: C, sink: L) -> Self {
        Self::new(
            config.serve_dir.clone(),
            config.target_extension.clone(),
            converter,
            sink,
        )
    }

    pub fn converter_available(&self) -> bool {
        self.converter.is_available()
    }

    /// Processes a batch to completion. Concurrent calls are serialized so
    /// two batches never write the same output at once.
    pub async fn process_files<I>(&self, paths: I) -> BatchSummary
    where
        I: IntoIterator,
        I::Item: AsRef<Path>,
    {
        let _guard = self.batch_lock.lock().await;
        let mut summary = BatchSummary::default();

        for path in paths {
            let job = Job::from_path(path.as_ref());
            match self.process_job(&job).await {
                JobOutcome::Copied => summary.copied += 1,
                JobOutcome::Converted => summary.converted += 1,
                JobOutcome::Skipped => summary.skipped += 1,
                JobOutcome::Failed => summary.failed += 1,
            }
        }

        tracing::debug!("Batch finished: {:?}", summary);
        summary
    }

    async fn process_job(&self, job: &Job) -> JobOutcome {
        if !job.exists() {
            self.sink
                .emit(&format!("Skipped (not found): {}", job.basename));
            return JobOutcome::Skipped;
        }

        match job.kind() {
            JobKind::Convert => self.convert(job).await,
            JobKind::Copy => self.copy(job).await,
        }
    }

    /// Created lazily so batches that skip every path leave no trace.
    async fn ensure_serve_dir(&self, job: &Job) -> bool {
        match tokio::fs::create_dir_all(&self.serve_dir).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(
                    "Cannot create serve directory {}: {}",
                    self.serve_dir.display(),
                    e
                );
                self.sink
                    .emit(&format!("FAILED: {} — {}", job.basename, e));
                false
            }
        }
    }

    async fn copy(&self, job: &Job) -> JobOutcome {
        if !self.ensure_serve_dir(job).await {
            return JobOutcome::Failed;
        }
        let dest = self.serve_dir.join(&job.basename);

        // Same inode (path, symlink or hard link): copying would truncate it.
        if same_file::is_same_file(&job.source, &dest).unwrap_or(false) {
            tracing::debug!("{} is already in the serve directory", job.basename);
            self.sink.emit(&format!("Copied: {}", job.basename));
            return JobOutcome::Copied;
        }

        match tokio::fs::copy(&job.source, &dest).await {
            Ok(bytes) => {
                tracing::debug!("Copied {} bytes to {}", bytes, dest.display());
                preserve_mtime(&job.source, &dest).await;
                self.sink.emit(&format!("Copied: {}", job.basename));
                JobOutcome::Copied
            }
            Err(e) => {
                self.sink
                    .emit(&format!("FAILED: {} — {}", job.basename, e));
                JobOutcome::Failed
            }
        }
    }

    async fn convert(&self, job: &Job) -> JobOutcome {
        if !self.converter.is_available() {
            self.sink.emit(&format!(
                "ERROR: Calibre not found — cannot convert {}",
                job.basename
            ));
            return JobOutcome::Failed;
        }

        if !self.ensure_serve_dir(job).await {
            return JobOutcome::Failed;
        }

        let output_name = job.output_name(&self.target_extension);
        let output_path = self.serve_dir.join(&output_name);
        self.sink
            .emit(&format!("Converting: {} ...", job.basename));

        match self.converter.convert(&job.source, &output_path).await {
            ConversionOutcome::Succeeded => {
                self.sink.emit(&format!("Done: {}", output_name));
                JobOutcome::Converted
            }
            ConversionOutcome::ExitFailure { stderr } => {
                self.sink.emit(&format!(
                    "FAILED: {} — {}",
                    job.basename,
                    ConversionOutcome::failure_reason(&stderr)
                ));
                JobOutcome::Failed
            }
            ConversionOutcome::TimedOut => {
                self.sink.emit(&format!(
                    "FAILED: {} — conversion timed out",
                    job.basename
                ));
                JobOutcome::Failed
            }
            ConversionOutcome::SpawnFailed { error } => {
                self.sink
                    .emit(&format!("FAILED: {} — {}", job.basename, error));
                JobOutcome::Failed
            }
        }
    }
}

/// Keeps the source's modification time so the listing shows original dates.
async fn preserve_mtime(source: &Path, dest: &Path) {
    let result = match tokio::fs::metadata(source).await {
        Ok(meta) => filetime::set_file_mtime(
            dest,
            filetime::FileTime::from_last_modification_time(&meta),
        ),
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        tracing::debug!("Could not preserve mtime on {}: {}", dest.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sink::MemorySink;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex as StdMutex};
    use std::time::Duration;
    use tempfile::TempDir;

    /// Writes `converted:<input name>` to the output on success.
    struct MockConverter {
        available: bool,
        outcome: ConversionOutcome,
        delay: Duration,
        calls: StdMutex<Vec<(PathBuf, PathBuf)>>,
    }

    impl MockConverter {
        fn succeeding() -> Self {
            Self::with_outcome(ConversionOutcome::Succeeded)
        }

        fn with_outcome(outcome: ConversionOutcome) -> Self {
            Self {
                available: true,
                outcome,
                delay: Duration::ZERO,
                calls: StdMutex::new(Vec::new()),
            }
        }

        fn unavailable() -> Self {
            Self {
                available: false,
                ..Self::succeeding()
            }
        }

        fn calls(&self) -> Vec<(PathBuf, PathBuf)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Converter for MockConverter {
        fn is_available(&self) -> bool {
            self.available
        }

        async fn convert(&self, input: &Path, output: &Path) -> ConversionOutcome {
            self.calls
                .lock()
                .unwrap()
                .push((input.to_path_buf(), output.to_path_buf()));
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.outcome == ConversionOutcome::Succeeded {
                let name = input.file_name().unwrap().to_string_lossy();
                std::fs::write(output, format!("converted:{}", name)).unwrap();
            }
            self.outcome.clone()
        }
    }

    struct Fixture {
        source_dir: TempDir,
        serve_dir: TempDir,
        sink: Arc<MemorySink>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                source_dir: TempDir::new().unwrap(),
                serve_dir: TempDir::new().unwrap(),
                sink: Arc::new(MemorySink::new()),
            }
        }

        fn source(&self, name: &str, contents: &[u8]) -> PathBuf {
            let path = self.source_dir.path().join(name);
            std::fs::write(&path, contents).unwrap();
            path
        }

        fn pipeline(&self, converter: MockConverter) -> IntakePipeline<MockConverter, Arc<MemorySink>> {
            IntakePipeline::new(self.serve_dir.path(), "azw3", converter, self.sink.clone())
        }

        fn served(&self) -> Vec<String> {
            let mut names: Vec<String> = std::fs::read_dir(self.serve_dir.path())
                .unwrap()
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect();
            names.sort();
            names
        }
    }

    #[tokio::test]
    async fn test_copy_non_epub_verbatim() {
        let fx = Fixture::new();
        let bytes = b"line one\nline two\n\x00\xff binary tail";
        let notes = fx.source("notes.txt", bytes);
        let pipeline = fx.pipeline(MockConverter::succeeding());

        let summary = pipeline.process_files([&notes]).await;

        assert_eq!(fx.sink.messages(), vec!["Copied: notes.txt"]);
        assert_eq!(std::fs::read(fx.serve_dir.path().join("notes.txt")).unwrap(), bytes);
        assert_eq!(summary.copied, 1);
        assert!(pipeline.converter.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_skipped_without_mutation() {
        let fx = Fixture::new();
        let missing = fx.source_dir.path().join("missing.epub");
        let pipeline = fx.pipeline(MockConverter::succeeding());

        let summary = pipeline.process_files([&missing]).await;

        assert_eq!(fx.sink.messages(), vec!["Skipped (not found): missing.epub"]);
        assert!(fx.served().is_empty());
        assert_eq!(summary.skipped, 1);
        assert!(pipeline.converter.calls().is_empty());
    }

    #[tokio::test]
    async fn test_blank_and_directory_paths_skipped() {
        let fx = Fixture::new();
        let subdir = fx.source_dir.path().join("folder.epub");
        std::fs::create_dir(&subdir).unwrap();
        let pipeline = fx.pipeline(MockConverter::succeeding());

        pipeline
            .process_files(["   ".to_string(), subdir.to_string_lossy().into_owned()])
            .await;

        assert_eq!(
            fx.sink.messages(),
            vec!["Skipped (not found): ", "Skipped (not found): folder.epub"]
        );
        assert!(fx.served().is_empty());
    }

    #[tokio::test]
    async fn test_whitespace_around_path_is_trimmed() {
        let fx = Fixture::new();
        let notes = fx.source("notes.txt", b"hi");
        let pipeline = fx.pipeline(MockConverter::succeeding());

        pipeline
            .process_files([format!("  {}\n", notes.display())])
            .await;

        assert_eq!(fx.sink.messages(), vec!["Copied: notes.txt"]);
    }

    #[tokio::test]
    async fn test_epub_converted_into_serve_dir() {
        let fx = Fixture::new();
        let book = fx.source("book.epub", b"epub bytes");
        let pipeline = fx.pipeline(MockConverter::succeeding());

        let summary = pipeline.process_files([&book]).await;

        assert_eq!(
            fx.sink.messages(),
            vec!["Converting: book.epub ...", "Done: book.azw3"]
        );
        assert_eq!(fx.served(), vec!["book.azw3"]);
        assert_eq!(
            pipeline.converter.calls(),
            vec![(book.clone(), fx.serve_dir.path().join("book.azw3"))]
        );
        assert_eq!(summary.converted, 1);
    }

    #[tokio::test]
    async fn test_uppercase_epub_extension_is_converted() {
        let fx = Fixture::new();
        let book = fx.source("Book.EPUB", b"epub bytes");
        let pipeline = fx.pipeline(MockConverter::succeeding());

        pipeline.process_files([&book]).await;

        assert_eq!(
            fx.sink.messages(),
            vec!["Converting: Book.EPUB ...", "Done: Book.azw3"]
        );
    }

    #[tokio::test]
    async fn test_epub_without_converter_never_served() {
        let fx = Fixture::new();
        let book = fx.source("book.epub", b"epub bytes");
        let pipeline = fx.pipeline(MockConverter::unavailable());

        let summary = pipeline.process_files([&book]).await;

        assert_eq!(
            fx.sink.messages(),
            vec!["ERROR: Calibre not found — cannot convert book.epub"]
        );
        assert!(fx.served().is_empty());
        assert!(pipeline.converter.calls().is_empty());
        assert_eq!(summary.failed, 1);
    }

    #[tokio::test]
    async fn test_converter_exit_failure_uses_last_stderr_line() {
        let fx = Fixture::new();
        let book = fx.source("book.epub", b"epub bytes");
        let pipeline = fx.pipeline(MockConverter::with_outcome(ConversionOutcome::ExitFailure {
            stderr: "bad format\n".to_string(),
        }));

        pipeline.process_files([&book]).await;

        assert_eq!(
            fx.sink.messages(),
            vec!["Converting: book.epub ...", "FAILED: book.epub — bad format"]
        );
    }

    #[tokio::test]
    async fn test_converter_exit_failure_without_stderr() {
        let fx = Fixture::new();
        let book = fx.source("book.epub", b"epub bytes");
        let pipeline = fx.pipeline(MockConverter::with_outcome(ConversionOutcome::ExitFailure {
            stderr: String::new(),
        }));

        pipeline.process_files([&book]).await;

        assert_eq!(
            fx.sink.terminal_messages(),
            vec!["FAILED: book.epub — unknown error"]
        );
    }

    #[tokio::test]
    async fn test_timeout_and_spawn_failures_reported() {
        let fx = Fixture::new();
        let book = fx.source("book.epub", b"epub bytes");

        fx.pipeline(MockConverter::with_outcome(ConversionOutcome::TimedOut))
            .process_files([&book])
            .await;
        fx.pipeline(MockConverter::with_outcome(ConversionOutcome::SpawnFailed {
            error: "permission denied".to_string(),
        }))
        .process_files([&book])
        .await;

        assert_eq!(
            fx.sink.terminal_messages(),
            vec![
                "FAILED: book.epub — conversion timed out",
                "FAILED: book.epub — permission denied"
            ]
        );
    }

    #[tokio::test]
    async fn test_mixed_batch_keeps_order_with_one_terminal_entry_per_path() {
        let fx = Fixture::new();
        let book = fx.source("book.epub", b"epub bytes");
        let notes = fx.source("notes.txt", b"notes");
        let missing = fx.source_dir.path().join("gone.pdf");
        let other = fx.source("other.epub", b"more epub");
        let pipeline = fx.pipeline(MockConverter::succeeding());

        let summary = pipeline
            .process_files([&book, &notes, &missing, &other])
            .await;

        assert_eq!(
            fx.sink.messages(),
            vec![
                "Converting: book.epub ...",
                "Done: book.azw3",
                "Copied: notes.txt",
                "Skipped (not found): gone.pdf",
                "Converting: other.epub ...",
                "Done: other.azw3",
            ]
        );
        assert_eq!(fx.sink.terminal_messages().len(), 4);
        assert_eq!(summary.total(), 4);
        assert_eq!(fx.served(), vec!["book.azw3", "notes.txt", "other.azw3"]);
    }

    #[tokio::test]
    async fn test_existing_output_is_overwritten() {
        let fx = Fixture::new();
        std::fs::write(fx.serve_dir.path().join("notes.txt"), b"old").unwrap();
        let notes = fx.source("notes.txt", b"new");
        let pipeline = fx.pipeline(MockConverter::succeeding());

        pipeline.process_files([&notes]).await;

        assert_eq!(std::fs::read(fx.serve_dir.path().join("notes.txt")).unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_file_already_in_serve_dir_is_left_intact() {
        let fx = Fixture::new();
        let inside = fx.serve_dir.path().join("notes.txt");
        std::fs::write(&inside, b"keep me").unwrap();
        let pipeline = fx.pipeline(MockConverter::succeeding());

        pipeline.process_files([&inside]).await;

        assert_eq!(fx.sink.messages(), vec!["Copied: notes.txt"]);
        assert_eq!(std::fs::read(&inside).unwrap(), b"keep me");
    }

    #[tokio::test]
    async fn test_missing_serve_dir_is_created() {
        let fx = Fixture::new();
        let nested = fx.serve_dir.path().join("not").join("yet");
        let notes = fx.source("notes.txt", b"hi");
        let pipeline = IntakePipeline::new(
            &nested,
            "azw3",
            MockConverter::succeeding(),
            fx.sink.clone(),
        );

        pipeline.process_files([&notes]).await;

        assert!(nested.join("notes.txt").is_file());
    }

    #[tokio::test]
    async fn test_skipped_batch_does_not_create_serve_dir() {
        let fx = Fixture::new();
        let nested = fx.serve_dir.path().join("not").join("yet");
        let missing = fx.source_dir.path().join("missing.epub");
        let no_calibre = fx.source("book.epub", b"epub");
        let pipeline = IntakePipeline::new(
            &nested,
            "azw3",
            MockConverter::unavailable(),
            fx.sink.clone(),
        );

        let summary = pipeline.process_files([&missing, &no_calibre]).await;

        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 1);
        assert!(!fx.serve_dir.path().join("not").exists());
    }

    #[tokio::test]
    async fn test_hard_link_into_serve_dir_is_left_intact() {
        let fx = Fixture::new();
        let notes = fx.source("notes.txt", b"shared inode");
        let linked = fx.serve_dir.path().join("notes.txt");
        std::fs::hard_link(&notes, &linked).unwrap();
        let pipeline = fx.pipeline(MockConverter::succeeding());

        let summary = pipeline.process_files([&notes]).await;

        assert_eq!(fx.sink.messages(), vec!["Copied: notes.txt"]);
        assert_eq!(summary.copied, 1);
        assert_eq!(std::fs::read(&notes).unwrap(), b"shared inode");
        assert_eq!(std::fs::read(&linked).unwrap(), b"shared inode");
    }

    #[tokio::test]
    async fn test_copy_preserves_modification_time() {
        let fx = Fixture::new();
        let notes = fx.source("notes.txt", b"old news");
        let old = filetime::FileTime::from_unix_time(1_000_000_000, 0);
        filetime::set_file_mtime(&notes, old).unwrap();
        let pipeline = fx.pipeline(MockConverter::succeeding());

        pipeline.process_files([&notes]).await;

        let served = std::fs::metadata(fx.serve_dir.path().join("notes.txt")).unwrap();
        assert_eq!(filetime::FileTime::from_last_modification_time(&served), old);
    }

    #[tokio::test]
    async fn test_concurrent_batches_do_not_interleave() {
        let fx = Fixture::new();
        let a = fx.source("a.epub", b"a");
        let b = fx.source("b.epub", b"b");
        let mut converter = MockConverter::succeeding();
        converter.delay = Duration::from_millis(50);
        let pipeline = fx.pipeline(converter);

        tokio::join!(pipeline.process_files([&a]), pipeline.process_files([&b]));

        let messages = fx.sink.messages();
        assert_eq!(messages.len(), 4);
        for pair in messages.chunks(2) {
            let name = pair[0]
                .strip_prefix("Converting: ")
                .and_then(|s| s.strip_suffix(".epub ..."))
                .unwrap();
            assert_eq!(pair[1], format!("Done: {}.azw3", name));
        }
    }

    #[tokio::test]
    async fn test_empty_batch_does_nothing() {
        let fx = Fixture::new();
        let pipeline = fx.pipeline(MockConverter::succeeding());

        let summary = pipeline.process_files(Vec::<PathBuf>::new()).await;

        assert_eq!(summary, BatchSummary::default());
        assert!(fx.sink.messages().is_empty());
    }
}
