use crate::domain::ports::FilePicker;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};
use tokio::sync::Mutex;

/// Terminal stand-in for a file dialog: reads paths line by line until a
/// blank line or end of input. Paths dragged into a terminal arrive quoted or
/// backslash-escaped and several per line; both forms are accepted.
pub struct LinePicker<R> {
    reader: Mutex<R>,
    closed: AtomicBool,
}

pub type StdinPicker = LinePicker<BufReader<Stdin>>;

impl StdinPicker {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

impl<R: AsyncBufRead + Unpin + Send> LinePicker<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: Mutex::new(reader),
            closed: AtomicBool::new(false),
        }
    }

    /// True once the input has reached EOF.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> FilePicker for LinePicker<R> {
    async fn pick_files(&self) -> Option<Vec<PathBuf>> {
        let mut reader = self.reader.lock().await;
        let mut paths = Vec::new();

        loop {
            let mut line = String::new();
            match reader.read_line(&mut line).await {
                Ok(0) => {
                    self.closed.store(true, Ordering::SeqCst);
                    break;
                }
                Ok(_) if line.trim().is_empty() => break,
                Ok(_) => paths.extend(split_dropped_paths(&line).into_iter().map(PathBuf::from)),
                Err(e) => {
                    tracing::warn!("Could not read file selection: {}", e);
                    self.closed.store(true, Ordering::SeqCst);
                    break;
                }
            }
        }

        if paths.is_empty() && self.is_closed() {
            None
        } else {
            Some(paths)
        }
    }
}

/// Splits one line of terminal input into paths. A line naming an existing
/// file is taken whole; otherwise it is split like shell words.
pub fn split_dropped_paths(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if Path::new(trimmed).is_file() {
        return vec![trimmed.to_string()];
    }

    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = trimmed.chars();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                in_word = true;
                for q in chars.by_ref() {
                    if q == '\'' {
                        break;
                    }
                    current.push(q);
                }
            }
            '"' => {
                in_word = true;
                while let Some(q) = chars.next() {
                    match q {
                        '"' => break,
                        '\\' if !cfg!(windows) => {
                            if let Some(escaped) = chars.next() {
                                current.push(escaped);
                            }
                        }
                        _ => current.push(q),
                    }
                }
            }
            '\\' if !cfg!(windows) => {
                in_word = true;
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            _ => {
                in_word = true;
                current.push(c);
            }
        }
    }
    if in_word {
        words.push(current);
    }
    words
}
