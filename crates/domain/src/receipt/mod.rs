//! Receipt rendering.
//!
//! A receipt is composed as a format-independent [`ReceiptLayout`], drawn to
//! PDF, and written to a uniquely named temporary file. [`ReceiptFiles`] holds
//! the temp files per session and deletes them on release.

/// Line composition
pub mod layout;

/// PDF output
pub mod pdf;

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::TempPath;

use crate::errors::Error;
use crate::orders::record::OrderRecord;

pub use layout::{ReceiptFields, ReceiptLayout, ReceiptLine};

/// Name offered to the user when downloading the receipt.
pub const DOWNLOAD_FILE_NAME: &str = "medicine_order.pdf";

pub trait ReceiptRenderer: Send + Sync {
    fn render(&self, order: &OrderRecord) -> Result<RenderedReceipt, Error>;
}

/// A rendered receipt. Dropping it deletes the temp file.
#[derive(Debug)]
pub struct RenderedReceipt {
    pub layout: ReceiptLayout,
    pub file: TempPath,
}

impl RenderedReceipt {
    pub fn file_name(&self) -> String {
        self.file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn summary(&self) -> ReceiptSummary {
        ReceiptSummary {
            file_name: self.file_name(),
            lines: self.layout.text_lines(),
            rendered_at: Utc::now(),
        }
    }
}

/// What the session remembers about its receipt.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct ReceiptSummary {
    pub file_name: String,
    pub lines: Vec<String>,
    pub rendered_at: DateTime<Utc>,
}

/// Writes receipts as PDF files under the system temp dir, or `dir` if set.
#[derive(Clone, Debug, Default)]
pub struct PdfReceiptRenderer {
    dir: Option<PathBuf>,
}

impl PdfReceiptRenderer {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }
}

impl ReceiptRenderer for PdfReceiptRenderer {
    fn render(&self, order: &OrderRecord) -> Result<RenderedReceipt, Error> {
        let layout = ReceiptLayout::for_order(order);
        let bytes = pdf::render_pdf(&layout)?;

        let mut builder = tempfile::Builder::new();
        builder.prefix("receipt-").suffix(".pdf");
        let mut file = match &self.dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(Error::rendering)?;

        file.write_all(&bytes).map_err(Error::rendering)?;
        file.flush().map_err(Error::rendering)?;

        let receipt = RenderedReceipt {
            layout,
            file: file.into_temp_path(),
        };
        tracing::info!(
            "Rendered receipt {} ({} bytes)",
            receipt.file_name(),
            bytes.len()
        );
        Ok(receipt)
    }
}

/// Custody of rendered receipt files, keyed by file name.
///
/// A file is stored while its command is still being handled, so a render
/// whose events never commit stays here, unreferenced, until its session is
/// released or the custody is dropped.
#[derive(Clone, Debug, Default)]
pub struct ReceiptFiles {
    files: Arc<Mutex<HashMap<String, HeldReceipt>>>,
}

#[derive(Debug)]
struct HeldReceipt {
    session_id: String,
    file: TempPath,
}

impl ReceiptFiles {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, HeldReceipt>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Keeps `file` for the session and returns the name it is held under.
    pub fn store(&self, session_id: &str, file: TempPath) -> String {
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.lock().insert(
            file_name.clone(),
            HeldReceipt {
                session_id: session_id.to_string(),
                file,
            },
        );
        file_name
    }

    pub fn path(&self, file_name: &str) -> Option<PathBuf> {
        self.lock()
            .get(file_name)
            .map(|held| AsRef::<Path>::as_ref(&held.file).to_path_buf())
    }

    pub async fn read(&self, file_name: &str) -> Result<Option<Vec<u8>>, Error> {
        let Some(path) = self.path(file_name) else {
            return Ok(None);
        };
        tokio::fs::read(&path)
            .await
            .map(Some)
            .map_err(Error::rendering)
    }

    /// Deletes every receipt file held for the session. Returns whether any existed.
    pub fn release(&self, session_id: &str) -> bool {
        let released: Vec<HeldReceipt> = {
            let mut files = self.lock();
            let names: Vec<String> = files
                .iter()
                .filter(|(_, held)| held.session_id == session_id)
                .map(|(name, _)| name.clone())
                .collect();
            names.iter().filter_map(|name| files.remove(name)).collect()
        };

        let any = !released.is_empty();
        for held in released {
            let path = held.file.to_path_buf();
            if let Err(e) = held.file.close() {
                tracing::warn!("Failed to remove receipt {}: {}", path.display(), e);
            }
        }
        any
    }
}
