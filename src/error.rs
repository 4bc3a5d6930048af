//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom della pipeline di compressione.
//!
//! ## Responsabilità:
//! - Definisce `CompressError` enum per categorizzare tutti gli errori possibili
//! - Distingue errori per singolo file (finiscono nel `JobResult::Failure`) da errori di batch
//! - Integra con `thiserror` per automatic error conversion
//! - Mappa gli errori del crate `image` nella tassonomia decode/encode/resize
//!
//! ## Categorie di errori:
//! - `UnsupportedFormat`: estensione non presente nella tabella di routing
//! - `Decode`: media corrotto o illeggibile
//! - `Encode`: errore di scrittura o dell'encoder esterno
//! - `Resize`: dimensione di destinazione non valida
//! - `Io`: errori di I/O sul working file o sull'output
//! - `EmptyBatch`: nessun job fornito (unico errore a livello di batch)
//! - `MissingDependency`: tool esterno mancante (ffmpeg)
//! - `Validation`: parametri di batch non validi
//!
//! ## Esempio:
//! ```ignore
//! if jobs.is_empty() {
//!     return Err(CompressError::EmptyBatch);
//! }
//! ```

use image::ImageError;

/// Custom error types for media compression
#[derive(thiserror::Error, Debug)]
pub enum CompressError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Decode error: {0}")]
    Decode(String),

    /// `detail` carries diagnostics (e.g. encoder stderr) that are logged but not displayed.
    #[error("{message}")]
    Encode {
        message: String,
        detail: Option<String>,
    },

    #[error("Resize error: {0}")]
    Resize(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No files supplied")]
    EmptyBatch,

    #[error("Dependency missing: {0}")]
    MissingDependency(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl CompressError {
    pub fn encode(message: impl Into<String>) -> Self {
        Self::Encode {
            message: message.into(),
            detail: None,
        }
    }

    pub fn encode_with_detail(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Encode {
            message: message.into(),
            detail: Some(detail.into()),
        }
    }

    /// True for errors that abort the whole batch instead of a single file.
    pub fn is_batch_scoped(&self) -> bool {
        matches!(self, Self::EmptyBatch | Self::Validation(_))
    }
}

impl From<ImageError> for CompressError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::Decoding(e) => Self::Decode(e.to_string()),
            ImageError::Unsupported(e) => Self::Decode(e.to_string()),
            ImageError::Encoding(e) => Self::encode(e.to_string()),
            ImageError::Parameter(e) => Self::Resize(e.to_string()),
            ImageError::Limits(e) => Self::Resize(e.to_string()),
            ImageError::IoError(e) => Self::Io(e),
        }
    }
}

impl From<gif::DecodingError> for CompressError {
    fn from(err: gif::DecodingError) -> Self {
        match err {
            gif::DecodingError::Io(e) => Self::Io(e),
            other => Self::Decode(other.to_string()),
        }
    }
}

impl From<gif::EncodingError> for CompressError {
    fn from(err: gif::EncodingError) -> Self {
        match err {
            gif::EncodingError::Io(e) => Self::Io(e),
            other => Self::encode(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_hides_detail() {
        let err = CompressError::encode_with_detail("Video compression failed", "x264 [error]: boom");
        assert_eq!(err.to_string(), "Video compression failed");
        match err {
            CompressError::Encode { detail, .. } => assert_eq!(detail.as_deref(), Some("x264 [error]: boom")),
            _ => panic!("expected encode error"),
        }
    }

    #[test]
    fn test_batch_scope() {
        assert!(CompressError::EmptyBatch.is_batch_scoped());
        assert!(!CompressError::UnsupportedFormat("txt".into()).is_batch_scoped());
        assert!(!CompressError::Decode("bad".into()).is_batch_scoped());
    }
}
