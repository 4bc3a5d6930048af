//! # Job Model
//!
//! Tipi che descrivono un file lungo tutta la pipeline: il file caricato, il job
//! di compressione risolto e il risultato per-file riportato al chiamante.

use crate::error::CompressError;
use crate::file_manager::{FileManager, MediaKind};
use crate::image_processor::OutputFormat;
use crate::settings::CompressionSettings;
use serde::Serialize;
use std::path::PathBuf;

/// A file submitted by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Where the transport layer left the bytes
    pub temp_path: PathBuf,
    /// Name as given by the client, possibly unsafe
    pub original_name: String,
    pub size_bytes: u64,
}

impl UploadedFile {
    pub fn new(temp_path: impl Into<PathBuf>, original_name: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            temp_path: temp_path.into(),
            original_name: original_name.into(),
            size_bytes,
        }
    }
}

/// One unit of compression work, owning its resolved settings
#[derive(Debug, Clone)]
pub struct MediaJob {
    /// Working copy inside the work directory
    pub source_path: PathBuf,
    pub extension: String,
    pub kind: MediaKind,
    pub settings: CompressionSettings,
    pub max_dimension: Option<u32>,
}

/// Successful compression of one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompressedFile {
    pub original_name: String,
    pub output_name: String,
    pub media_kind: MediaKind,
    pub output_format: OutputFormat,
    pub original_bytes: u64,
    pub compressed_bytes: u64,
    /// Rounded, negative when the output grew
    pub reduction_percent: i64,
    pub original_dims: Option<(u32, u32)>,
    pub output_dims: Option<(u32, u32)>,
    pub download_locator: String,
    pub preview_locator: String,
}

impl CompressedFile {
    pub fn bytes_saved(&self) -> i64 {
        self.original_bytes as i64 - self.compressed_bytes as i64
    }
}

/// Per-file outcome, in submission order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JobResult {
    Success(CompressedFile),
    Failure {
        original_name: String,
        error_message: String,
    },
}

impl JobResult {
    pub fn failure(original_name: impl Into<String>, error: &CompressError) -> Self {
        Self::Failure {
            original_name: original_name.into(),
            error_message: error.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn original_name(&self) -> &str {
        match self {
            Self::Success(file) => &file.original_name,
            Self::Failure { original_name, .. } => original_name,
        }
    }

    /// One-line description for logs and the progress bar
    pub fn summary(&self) -> String {
        match self {
            Self::Success(file) => format!(
                "✅ {} → {} ({} → {}, {}%)",
                file.original_name,
                file.output_name,
                FileManager::format_size(file.original_bytes),
                FileManager::format_size(file.compressed_bytes),
                file.reduction_percent
            ),
            Self::Failure {
                original_name,
                error_message,
            } => format!("❌ {}: {}", original_name, error_message),
        }
    }
}
