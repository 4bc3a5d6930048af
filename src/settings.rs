//! # Compression Settings Module
//!
//! Questo modulo traduce un livello di compressione richiesto nei parametri concreti dei codec.
//!
//! ## Responsabilità:
//! - Definisce `CompressionLevel` (Lossless, Balanced, Aggressive, Custom)
//! - Definisce `CompressionSettings`, il bundle immutabile creato una volta per batch
//! - Risolve livello + qualità opzionale tramite la tabella fissa dei preset
//! - Espone il budget di palette per le GIF
//!
//! ## Tabella dei preset:
//!
//! | livello    | quality        | effort | crf | preset |
//! |------------|----------------|--------|-----|--------|
//! | Lossless   | 95             | max    | 18  | slow   |
//! | Balanced   | 85             | max    | 23  | medium |
//! | Aggressive | 70             | medium | 28  | fast   |
//! | Custom     | fornita (o 85) | max    | 23  | medium |
//!
//! ## Esempio:
//! ```ignore
//! let settings = resolve(CompressionLevel::Aggressive, None);
//! assert_eq!(settings.quality, 70);
//! ```

use crate::error::CompressError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Quality used by `Custom` when the caller supplies none.
pub const DEFAULT_CUSTOM_QUALITY: u8 = 85;

/// Requested compression level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    Lossless,
    #[default]
    Balanced,
    Aggressive,
    Custom,
}

impl CompressionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lossless => "lossless",
            Self::Balanced => "balanced",
            Self::Aggressive => "aggressive",
            Self::Custom => "custom",
        }
    }

    /// Parses a level name, falling back to `Balanced` for anything unrecognised.
    pub fn parse_lenient(value: &str) -> Self {
        value.parse().unwrap_or_else(|_| {
            warn!("Unknown compression level '{}', falling back to balanced", value);
            Self::Balanced
        })
    }

    /// Maximum number of colors a GIF frame may use at this level.
    pub fn palette_budget(&self) -> usize {
        match self {
            Self::Lossless => 256,
            Self::Balanced => 128,
            Self::Aggressive => 64,
            Self::Custom => 128,
        }
    }
}

impl FromStr for CompressionLevel {
    type Err = CompressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lossless" => Ok(Self::Lossless),
            "balanced" => Ok(Self::Balanced),
            "aggressive" => Ok(Self::Aggressive),
            "custom" => Ok(Self::Custom),
            other => Err(CompressError::Validation(format!(
                "Unknown compression level: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encoder effort, higher is slower and tighter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncoderEffort {
    Medium,
    Max,
}

impl EncoderEffort {
    /// libwebp `method` value (0-6).
    pub fn webp_method(&self) -> i32 {
        match self {
            Self::Medium => 4,
            Self::Max => 6,
        }
    }

    /// NeuQuant sampling factor (1 = every pixel, 30 = fastest).
    pub fn neuquant_sample_factor(&self) -> i32 {
        match self {
            Self::Medium => 10,
            Self::Max => 1,
        }
    }
}

/// x264 speed/efficiency preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoPreset {
    Slow,
    Medium,
    Fast,
}

impl VideoPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Slow => "slow",
            Self::Medium => "medium",
            Self::Fast => "fast",
        }
    }
}

impl fmt::Display for VideoPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved parameter bundle, created once per batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionSettings {
    pub level: CompressionLevel,
    /// 1-100, meaning depends on the codec
    pub quality: u8,
    pub effort: EncoderEffort,
    pub optimize_entropy: bool,
    /// Video constant rate factor, lower = better quality
    pub crf: u8,
    pub preset: VideoPreset,
}

impl CompressionSettings {
    pub fn palette_budget(&self) -> usize {
        self.level.palette_budget()
    }

    pub fn is_lossless(&self) -> bool {
        self.level == CompressionLevel::Lossless
    }
}

/// Maps a compression level (and the caller's quality for `Custom`) to codec parameters.
///
/// The quality argument is ignored for the fixed presets. A `Custom` quality outside
/// 1..=100 is clamped into range.
pub fn resolve(level: CompressionLevel, quality: Option<u8>) -> CompressionSettings {
    let (quality, effort, crf, preset) = match level {
        CompressionLevel::Lossless => (95, EncoderEffort::Max, 18, VideoPreset::Slow),
        CompressionLevel::Balanced => (85, EncoderEffort::Max, 23, VideoPreset::Medium),
        CompressionLevel::Aggressive => (70, EncoderEffort::Medium, 28, VideoPreset::Fast),
        CompressionLevel::Custom => (
            quality.unwrap_or(DEFAULT_CUSTOM_QUALITY).clamp(1, 100),
            EncoderEffort::Max,
            23,
            VideoPreset::Medium,
        ),
    };

    CompressionSettings {
        level,
        quality,
        effort,
        optimize_entropy: true,
        crf,
        preset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_table() {
        let lossless = resolve(CompressionLevel::Lossless, None);
        assert_eq!((lossless.quality, lossless.crf), (95, 18));
        assert_eq!(lossless.effort, EncoderEffort::Max);
        assert_eq!(lossless.preset, VideoPreset::Slow);

        let balanced = resolve(CompressionLevel::Balanced, None);
        assert_eq!((balanced.quality, balanced.crf), (85, 23));
        assert_eq!(balanced.effort, EncoderEffort::Max);
        assert_eq!(balanced.preset, VideoPreset::Medium);

        let aggressive = resolve(CompressionLevel::Aggressive, None);
        assert_eq!((aggressive.quality, aggressive.crf), (70, 28));
        assert_eq!(aggressive.effort, EncoderEffort::Medium);
        assert_eq!(aggressive.preset, VideoPreset::Fast);
    }

    #[test]
    fn test_custom_quality() {
        assert_eq!(resolve(CompressionLevel::Custom, Some(42)).quality, 42);
        assert_eq!(resolve(CompressionLevel::Custom, None).quality, 85);
        assert_eq!(resolve(CompressionLevel::Custom, Some(0)).quality, 1);
        assert_eq!(resolve(CompressionLevel::Custom, Some(200)).quality, 100);

        let custom = resolve(CompressionLevel::Custom, Some(42));
        assert_eq!(custom.crf, 23);
        assert_eq!(custom.preset, VideoPreset::Medium);
    }

    #[test]
    fn test_presets_ignore_quality() {
        assert_eq!(resolve(CompressionLevel::Aggressive, Some(10)).quality, 70);
    }

    #[test]
    fn test_palette_budget() {
        assert_eq!(CompressionLevel::Lossless.palette_budget(), 256);
        assert_eq!(CompressionLevel::Balanced.palette_budget(), 128);
        assert_eq!(CompressionLevel::Aggressive.palette_budget(), 64);
        assert_eq!(CompressionLevel::Custom.palette_budget(), 128);
        // Custom quality does not move the budget
        assert_eq!(resolve(CompressionLevel::Custom, Some(10)).palette_budget(), 128);
    }

    #[test]
    fn test_level_parsing() {
        assert_eq!("Lossless".parse::<CompressionLevel>().unwrap(), CompressionLevel::Lossless);
        assert_eq!(" aggressive ".parse::<CompressionLevel>().unwrap(), CompressionLevel::Aggressive);
        assert!("ultra".parse::<CompressionLevel>().is_err());
        assert_eq!(CompressionLevel::parse_lenient("ultra"), CompressionLevel::Balanced);
        assert_eq!(CompressionLevel::parse_lenient("custom"), CompressionLevel::Custom);
    }
}
