//! # Receipt Output
//!
//! Where rendered receipts and prescriptions go. The file sink writes one
//! HTML document per transaction and optionally opens it in the system
//! browser, whose print dialog does the rest.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Destination for printable documents.
pub trait ReceiptSink: Send + Sync {
    /// Writes `html` under `name` and returns where it went, if anywhere.
    ///
    /// `open` asks for the document to be shown for printing right away.
    fn deliver(&self, name: &str, html: &str, open: bool) -> ClientResult<Option<PathBuf>>;
}

// =============================================================================
// File Sink
// =============================================================================

#[derive(Debug, Clone)]
pub struct FileReceiptSink {
    dir: PathBuf,
    auto_open: bool,
}

impl FileReceiptSink {
    pub fn new(dir: impl Into<PathBuf>, auto_open: bool) -> Self {
        Self {
            dir: dir.into(),
            auto_open,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.receipt_dir(), config.auto_open)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ReceiptSink for FileReceiptSink {
    fn deliver(&self, name: &str, html: &str, open: bool) -> ClientResult<Option<PathBuf>> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            ClientError::ReceiptOutput(format!("cannot create {}: {e}", self.dir.display()))
        })?;

        let path = self.dir.join(format!("{}.html", file_stem(name)));
        fs::write(&path, html).map_err(|e| {
            ClientError::ReceiptOutput(format!("cannot write {}: {e}", path.display()))
        })?;
        info!(path = %path.display(), "Document written");

        // A missing browser is not a failed sale.
        if open && self.auto_open {
            if let Err(e) = webbrowser::open(&path.to_string_lossy()) {
                warn!(error = %e, path = %path.display(), "Could not open document for printing");
            }
        }

        Ok(Some(path))
    }
}

/// Keeps names filesystem-safe.
fn file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "document".to_string()
    } else {
        stem
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_stem_sanitizes() {
        assert_eq!(file_stem("receipt-12a1b2c3"), "receipt-12a1b2c3");
        assert_eq!(file_stem("../etc/passwd"), "___etc_passwd");
        assert_eq!(file_stem(""), "document");
    }

    #[test]
    fn test_deliver_writes_html() {
        let dir = std::env::temp_dir().join(format!("medipos-sink-{}", uuid::Uuid::new_v4()));
        let sink = FileReceiptSink::new(&dir, false);

        let path = sink
            .deliver("receipt-abc", "<p>ok</p>", true)
            .unwrap()
            .unwrap();

        assert_eq!(path, dir.join("receipt-abc.html"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "<p>ok</p>");
        fs::remove_dir_all(dir).ok();
    }
}
