//! # Upscaling Module
//!
//! Variante di upscaling della pipeline immagini: l'immagine viene prima ingrandita da un
//! `Upscaler` e poi compressa come WebP.
//!
//! ## Responsabilità:
//! - Definisce il trait `Upscaler`, una risorsa posseduta esplicitamente e iniettata
//!   nell'`ImageCompressor` (nessuno stato globale, nessuna inizializzazione lazy)
//! - Fornisce `ResampleUpscaler`: Lanczos + unsharp mask (raggio 2, 150%, soglia 3)
//!
//! Un backend più pesante (es. un modello neurale) implementa lo stesso trait, viene creato
//! una volta all'avvio e passato al compressore.

use crate::error::CompressError;
use crate::resize::{ResizeAlgorithm, UnsharpMask};
use image::DynamicImage;
use tracing::debug;

/// Factors accepted by the upscaling variant.
pub const SUPPORTED_FACTORS: [u32; 2] = [2, 4];

/// Enlarges an image by an integer factor
pub trait Upscaler: Send + Sync {
    fn name(&self) -> &str;

    fn upscale(&self, image: DynamicImage, factor: u32) -> Result<DynamicImage, CompressError>;
}

/// Resampling upscaler with edge enhancement
#[derive(Debug, Clone, Default)]
pub struct ResampleUpscaler {
    algorithm: ResizeAlgorithm,
    sharpen: UnsharpMask,
}

impl ResampleUpscaler {
    pub fn new(algorithm: ResizeAlgorithm, sharpen: UnsharpMask) -> Self {
        Self { algorithm, sharpen }
    }
}

impl Upscaler for ResampleUpscaler {
    fn name(&self) -> &str {
        "resample"
    }

    fn upscale(&self, image: DynamicImage, factor: u32) -> Result<DynamicImage, CompressError> {
        if !SUPPORTED_FACTORS.contains(&factor) {
            return Err(CompressError::Resize(format!(
                "unsupported upscale factor: {}",
                factor
            )));
        }

        let width = image
            .width()
            .checked_mul(factor)
            .ok_or_else(|| CompressError::Resize("upscaled width overflows".to_string()))?;
        let height = image
            .height()
            .checked_mul(factor)
            .ok_or_else(|| CompressError::Resize("upscaled height overflows".to_string()))?;

        debug!(
            "Upscaling {}x{} -> {}x{} ({:?})",
            image.width(),
            image.height(),
            width,
            height,
            self.algorithm
        );

        let enlarged = image
            .resize_exact(width, height, self.algorithm.filter())
            .to_rgba8();
        Ok(DynamicImage::ImageRgba8(self.sharpen.apply(&enlarged)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upscale_doubles_dimensions() {
        let upscaler = ResampleUpscaler::default();
        let out = upscaler.upscale(DynamicImage::new_rgb8(30, 20), 2).unwrap();
        assert_eq!((out.width(), out.height()), (60, 40));
    }

    #[test]
    fn test_upscale_rejects_unknown_factor() {
        let upscaler = ResampleUpscaler::default();
        let err = upscaler.upscale(DynamicImage::new_rgb8(4, 4), 3).unwrap_err();
        assert!(matches!(err, CompressError::Resize(_)));
    }
}
