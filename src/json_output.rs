//! # JSON Output Module
//!
//! Output strutturato in JSON (una riga per messaggio) per chi integra il compressore
//! come processo figlio.
//!
//! ## Tipi di messaggi:
//! - `start`: inizio del batch con le impostazioni risolte
//! - `file_complete`: risultato di un singolo file
//! - `complete`: risultati ordinati e statistiche finali
//! - `error`: errore a livello di batch (es. nessun file)

use crate::file_manager::FileManager;
use crate::job::JobResult;
use crate::progress::BatchStats;
use crate::settings::CompressionSettings;
use serde::Serialize;

/// Tipo di messaggio JSON
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JsonMessage {
    Start {
        total_files: usize,
        settings: CompressionSettings,
        max_dimension: Option<u32>,
    },

    FileComplete {
        index: usize,
        total: usize,
        #[serde(flatten)]
        result: JsonResult,
    },

    Complete {
        success: bool,
        results: Vec<JsonResult>,
        stats: BatchStats,
        total_saved_human: String,
    },

    Error {
        message: String,
    },
}

/// A `JobResult` with human-readable sizes and dimensions added
#[derive(Debug, Serialize)]
pub struct JsonResult {
    #[serde(flatten)]
    pub result: JobResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compressed_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_dimensions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dimensions: Option<String>,
}

impl From<&JobResult> for JsonResult {
    fn from(result: &JobResult) -> Self {
        match result {
            JobResult::Success(file) => Self {
                result: result.clone(),
                original_size: Some(FileManager::format_size(file.original_bytes)),
                compressed_size: Some(FileManager::format_size(file.compressed_bytes)),
                original_dimensions: file.original_dims.map(FileManager::format_dimensions),
                output_dimensions: file.output_dims.map(FileManager::format_dimensions),
            },
            JobResult::Failure { .. } => Self {
                result: result.clone(),
                original_size: None,
                compressed_size: None,
                original_dimensions: None,
                output_dimensions: None,
            },
        }
    }
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    pub fn start(total_files: usize, settings: CompressionSettings, max_dimension: Option<u32>) -> Self {
        Self::Start {
            total_files,
            settings,
            max_dimension,
        }
    }

    pub fn file_complete(index: usize, total: usize, result: &JobResult) -> Self {
        Self::FileComplete {
            index,
            total,
            result: result.into(),
        }
    }

    pub fn complete(results: &[JobResult], stats: BatchStats) -> Self {
        let total_saved_human = if stats.total_bytes_saved >= 0 {
            FileManager::format_size(stats.total_bytes_saved as u64)
        } else {
            format!("-{}", FileManager::format_size(stats.total_bytes_saved.unsigned_abs()))
        };
        Self::Complete {
            success: true,
            results: results.iter().map(JsonResult::from).collect(),
            stats,
            total_saved_human,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}
