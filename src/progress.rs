//! # Progress Tracking and Statistics Module
//!
//! Questo modulo gestisce il progress tracking e le statistiche aggregate di un batch.
//!
//! ## Componenti principali:
//! - `ProgressManager`: progress bar `indicatif`, nascosta quando disabilitata
//! - `BatchStats`: statistiche calcolate dai `JobResult` del batch
//!
//! ## Statistiche:
//! - **total_bytes_saved**: somma di (originale − compresso) sui successi, può essere negativa
//! - **average_reduction_percent**: media arrotondata delle riduzioni dei successi
//! - **processed_count**: numero di successi
//!
//! Con zero successi tutte e tre valgono 0.
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:00:12] [========================>---------------] 6/10 (60%) ✅ photo.jpg → photo.webp
//! ```

use crate::file_manager::FileManager;
use crate::job::JobResult;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::time::Duration;

/// Progress bar over the files of a batch
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    pub fn new(total_files: u64) -> Self {
        let bar = ProgressBar::new(total_files);

        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
        {
            bar.set_style(style.progress_chars("=>-"));
        }
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Progress manager that draws nothing
    pub fn hidden(total_files: u64) -> Self {
        let bar = ProgressBar::hidden();
        bar.set_length(total_files);
        Self { bar }
    }

    pub fn update(&self, message: &str) {
        self.bar.inc(1);
        self.bar.set_message(message.to_string());
    }

    pub fn set_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

/// Aggregate statistics of a finished batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    pub total_bytes_saved: i64,
    pub average_reduction_percent: i64,
    pub processed_count: usize,
}

impl BatchStats {
    /// Compute from per-file results; failures are ignored
    pub fn from_results(results: &[JobResult]) -> Self {
        let successes: Vec<_> = results
            .iter()
            .filter_map(|r| match r {
                JobResult::Success(file) => Some(file),
                JobResult::Failure { .. } => None,
            })
            .collect();

        if successes.is_empty() {
            return Self::default();
        }

        let total_bytes_saved = successes.iter().map(|f| f.bytes_saved()).sum();
        let reduction_sum: i64 = successes.iter().map(|f| f.reduction_percent).sum();
        let average = (reduction_sum as f64 / successes.len() as f64).round() as i64;

        Self {
            total_bytes_saved,
            average_reduction_percent: average,
            processed_count: successes.len(),
        }
    }

    pub fn format_summary(&self, total_files: usize) -> String {
        let saved = if self.total_bytes_saved >= 0 {
            FileManager::format_size(self.total_bytes_saved as u64)
        } else {
            format!("-{}", FileManager::format_size(self.total_bytes_saved.unsigned_abs()))
        };
        format!(
            "Compressed: {}/{} files | Failed: {} | Total saved: {} | Average reduction: {}%",
            self.processed_count,
            total_files,
            total_files.saturating_sub(self.processed_count),
            saved,
            self.average_reduction_percent
        )
    }
}
