//! # Path Resolution Module
//!
//! Centralizza tutta la logica di calcolo dei path di lavoro e di output.
//! Evita duplicazione tra i compressori e il TaskOptimizer.
//!
//! ## Regole di naming:
//! - Immagini e GIF: stem sanitizzato + nuova estensione (`foto.png` → `foto.webp`)
//! - Upscaling: prefisso `upscaled_` (`foto.png` → `upscaled_foto.webp`)
//! - Video: suffisso fisso prima dell'estensione (`clip.mp4` → `clip_compressed.mp4`)

use crate::error::CompressError;
use std::path::{Path, PathBuf};

/// Utility per calcolare i path in modo centralizzato
pub struct PathResolver;

impl PathResolver {
    /// Stem of a file name, used as the base of every output name
    pub fn stem(path: &Path) -> Result<String, CompressError> {
        path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CompressError::Validation(format!("Invalid file name: {}", path.display())))
    }

    /// Output path for a compressed file
    pub fn output_path(
        output_dir: &Path,
        input_path: &Path,
        prefix: &str,
        suffix: &str,
        extension: &str,
    ) -> Result<PathBuf, CompressError> {
        let stem = Self::stem(input_path)?;
        Ok(output_dir.join(format!("{}{}{}.{}", prefix, stem, suffix, extension)))
    }

    /// Working copy location for a submitted file
    pub fn working_path(work_dir: &Path, sanitized_name: &str) -> PathBuf {
        work_dir.join(sanitized_name)
    }

    /// Crea le directory parent se necessario
    pub async fn ensure_parent_dirs(path: &Path) -> Result<(), CompressError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}
