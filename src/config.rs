//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con i parametri di runtime (directory, encoder, output)
//! - Definisce `BatchOptions`, la tupla (livello, qualità, dimensione massima) valida per un batch
//! - Fornisce validazione robusta dei parametri di input
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Fornisce valori di default sensati per tutti i parametri
//!
//! ## Parametri di configurazione:
//! - `output_dir`: Directory dei file compressi (default: `outputs`)
//! - `work_dir`: Directory delle copie di lavoro dei file caricati (default: `uploads`)
//! - `audio_bitrate`: Bitrate audio AAC (default: "128k")
//! - `video_suffix`: Suffisso per gli output video (default: "_compressed")
//! - `ffmpeg_path`: Path esplicito di ffmpeg (default: None = ricerca automatica)
//! - `strict_levels`: Rifiuta livelli sconosciuti invece del fallback a Balanced
//! - `video_timeout_secs`: Timeout opzionale per video (default: None)
//! - `show_progress`: Mostra la progress bar (default: true)
//! - `json_output`: Report finale in JSON su stdout (default: false)
//!
//! ## Esempio:
//! ```ignore
//! let config = Config {
//!     output_dir: PathBuf::from("/srv/outputs"),
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use crate::error::CompressError;
use crate::settings::CompressionLevel;
use crate::upscale::SUPPORTED_FACTORS;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory for compressed outputs
    pub output_dir: PathBuf,
    /// Directory holding working copies of submitted files
    pub work_dir: PathBuf,
    /// AAC audio bitrate for video outputs
    pub audio_bitrate: String,
    /// Appended to the stem of video outputs
    pub video_suffix: String,
    /// Explicit ffmpeg binary
    pub ffmpeg_path: Option<PathBuf>,
    /// Reject unknown level names instead of falling back to balanced
    pub strict_levels: bool,
    /// Optional upper bound on a single video encode
    pub video_timeout_secs: Option<u64>,
    /// Draw a progress bar while the batch runs
    pub show_progress: bool,
    /// Print the batch report as JSON
    pub json_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("outputs"),
            work_dir: PathBuf::from("uploads"),
            audio_bitrate: "128k".to_string(),
            video_suffix: "_compressed".to_string(),
            ffmpeg_path: None,
            strict_levels: false,
            video_timeout_secs: None,
            show_progress: true,
            json_output: false,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.output_dir.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("Output directory must not be empty"));
        }

        if self.work_dir.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("Work directory must not be empty"));
        }

        if self.output_dir == self.work_dir {
            return Err(anyhow::anyhow!(
                "Output and work directories must differ: {}",
                self.output_dir.display()
            ));
        }

        let bitrate = self.audio_bitrate.trim_end_matches(['k', 'K']);
        if bitrate.is_empty() || bitrate.parse::<u32>().map_or(true, |b| b == 0) {
            return Err(anyhow::anyhow!("Invalid audio bitrate: {}", self.audio_bitrate));
        }

        if self.video_suffix.is_empty() {
            return Err(anyhow::anyhow!("Video suffix must not be empty"));
        }

        if self.video_timeout_secs == Some(0) {
            return Err(anyhow::anyhow!("Video timeout must be greater than 0"));
        }

        Ok(())
    }

    /// Default location of the config file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("media-compressor").join("config.json"))
    }

    /// Load configuration from file
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// Parse a level name according to `strict_levels`
    pub fn parse_level(&self, value: &str) -> Result<CompressionLevel, CompressError> {
        if self.strict_levels {
            value.parse()
        } else {
            Ok(CompressionLevel::parse_lenient(value))
        }
    }
}

/// Batch-wide compression request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOptions {
    pub level: CompressionLevel,
    /// Only read for `Custom`
    pub quality: Option<u8>,
    /// Longest-edge cap in pixels
    pub max_dimension: Option<u32>,
    /// Run images through the upscaler first (2 or 4)
    pub upscale_factor: Option<u32>,
}

impl BatchOptions {
    pub fn new(level: CompressionLevel) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), CompressError> {
        if let Some(quality) = self.quality {
            if !(1..=100).contains(&quality) {
                return Err(CompressError::Validation(format!(
                    "Quality must be between 1 and 100, got {}",
                    quality
                )));
            }
        }

        if self.max_dimension == Some(0) {
            return Err(CompressError::Validation(
                "Maximum dimension must be greater than 0".to_string(),
            ));
        }

        if let Some(factor) = self.upscale_factor {
            if !SUPPORTED_FACTORS.contains(&factor) {
                return Err(CompressError::Validation(format!(
                    "Upscale factor must be 2 or 4, got {}",
                    factor
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.audio_bitrate = "fast".to_string();
        assert!(config.validate().is_err());

        config.audio_bitrate = "128k".to_string();
        config.work_dir = config.output_dir.clone();
        assert!(config.validate().is_err());

        config.work_dir = PathBuf::from("uploads");
        config.video_timeout_secs = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.output_dir, PathBuf::from("outputs"));
        assert_eq!(config.work_dir, PathBuf::from("uploads"));
        assert_eq!(config.audio_bitrate, "128k");
        assert_eq!(config.video_suffix, "_compressed");
        assert!(!config.strict_levels);
        assert!(config.video_timeout_secs.is_none());
    }

    #[test]
    fn test_parse_level_strictness() {
        let mut config = Config::default();
        assert_eq!(config.parse_level("bogus").unwrap(), CompressionLevel::Balanced);

        config.strict_levels = true;
        assert!(config.parse_level("bogus").is_err());
        assert_eq!(config.parse_level("lossless").unwrap(), CompressionLevel::Lossless);
    }

    #[test]
    fn test_batch_options_validation() {
        let mut options = BatchOptions::new(CompressionLevel::Custom);
        assert!(options.validate().is_ok());

        options.quality = Some(0);
        assert!(options.validate().is_err());
        options.quality = Some(100);
        assert!(options.validate().is_ok());

        options.max_dimension = Some(0);
        assert!(options.validate().is_err());
        options.max_dimension = Some(600);

        options.upscale_factor = Some(3);
        assert!(options.validate().is_err());
        options.upscale_factor = Some(4);
        assert!(options.validate().is_ok());
    }

    #[tokio::test]
    async fn test_config_save_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.json");

        let original_config = Config {
            output_dir: PathBuf::from("/srv/out"),
            audio_bitrate: "192k".to_string(),
            strict_levels: true,
            video_timeout_secs: Some(300),
            ..Default::default()
        };

        original_config.save_to_file(&config_path).await.unwrap();
        let loaded_config = Config::from_file(&config_path).await.unwrap();

        assert_eq!(loaded_config.output_dir, PathBuf::from("/srv/out"));
        assert_eq!(loaded_config.audio_bitrate, "192k");
        assert!(loaded_config.strict_levels);
        assert_eq!(loaded_config.video_timeout_secs, Some(300));
        assert_eq!(loaded_config.work_dir, PathBuf::from("uploads"));
    }

    #[tokio::test]
    async fn test_missing_config_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::from_file(&temp_dir.path().join("absent.json")).await.unwrap();
        assert_eq!(config.audio_bitrate, "128k");
    }
}
