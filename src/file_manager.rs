//! # File Management Module
//!
//! Questo modulo gestisce il routing per estensione e le utilità sui file.
//!
//! ## Responsabilità:
//! - Tabella di routing estensione → compressore (`MediaKind`)
//! - Discovery ricorsiva di file media in directory (usata dalla CLI)
//! - Sanitizzazione dei nomi file caricati
//! - Utilità per calcoli dimensioni e percentuali
//! - Formattazione human-readable delle dimensioni
//!
//! ## Tabella di routing:
//! - **Immagini**: jpg, jpeg, png, webp, bmp, tiff
//! - **GIF**: gif
//! - **Video**: mp4, mov, avi, webm, mkv
//! - Qualsiasi altra estensione → `UnsupportedFormat`
//!
//! ## Esempio:
//! ```ignore
//! match FileManager::media_kind(&path) {
//!     Some(MediaKind::Image) => { /* ImageCompressor */ }
//!     Some(MediaKind::Gif) => { /* GifCompressor */ }
//!     Some(MediaKind::Video) => { /* VideoTranscoder */ }
//!     None => { /* unsupported */ }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp", "tiff"];
const GIF_EXTENSIONS: &[&str] = &["gif"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "webm", "mkv"];

/// Which compressor handles a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Gif,
    Video,
}

/// Manages file operations and routing
pub struct FileManager;

impl FileManager {
    /// Lowercased extension of a path, if any
    pub fn extension(path: &Path) -> Option<String> {
        path.extension().map(|ext| ext.to_string_lossy().to_lowercase())
    }

    /// Route a file to its compressor by extension
    pub fn media_kind(path: &Path) -> Option<MediaKind> {
        Self::kind_for_extension(&Self::extension(path)?)
    }

    pub fn kind_for_extension(ext: &str) -> Option<MediaKind> {
        let ext = ext.to_ascii_lowercase();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Image)
        } else if GIF_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Gif)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }

    /// Check if a file format is supported
    pub fn is_supported_format(path: &Path) -> bool {
        Self::media_kind(path).is_some()
    }

    pub fn is_video(path: &Path) -> bool {
        Self::media_kind(path) == Some(MediaKind::Video)
    }

    /// Find all supported media files in a directory
    pub fn find_media_files(media_dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(media_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| Self::is_supported_format(p))
            .collect();
        files.sort();
        files
    }

    /// Size of a file in bytes
    pub async fn file_size(path: &Path) -> std::io::Result<u64> {
        Ok(fs::metadata(path).await?.len())
    }

    /// Reduce an uploaded file name to a safe ASCII name.
    ///
    /// Letters, digits, `.`, `_` and `-` are kept, whitespace becomes `_`, anything else
    /// is dropped together with leading dots and underscores.
    pub fn sanitize_filename(name: &str) -> String {
        // Keep only the last path component, whatever separator the client used
        let base = name.rsplit(['/', '\\']).next().unwrap_or("");

        let mut cleaned = String::with_capacity(base.len());
        for ch in base.chars() {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-') {
                cleaned.push(ch);
            } else if ch.is_whitespace() {
                cleaned.push('_');
            }
        }

        let cleaned = cleaned.trim_start_matches(['.', '_']).trim_end_matches('.');
        if cleaned.is_empty() {
            "file".to_string()
        } else {
            cleaned.to_string()
        }
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }

    /// Rounded percentage reduction; negative when the output grew.
    pub fn calculate_reduction(original_size: u64, new_size: u64) -> i64 {
        if original_size == 0 {
            0
        } else {
            ((1.0 - new_size as f64 / original_size as f64) * 100.0).round() as i64
        }
    }

    /// Format a `(width, height)` pair as `WxH`
    pub fn format_dimensions(dims: (u32, u32)) -> String {
        format!("{}x{}", dims.0, dims.1)
    }
}
