//! # Image Resize Module
//!
//! Questo modulo gestisce la geometria del ridimensionamento e i filtri di resampling
//! usati da immagini e GIF, interamente in-process con il crate `image`.
//!
//! ## Caratteristiche
//! - **Longest-edge cap**: limita il lato maggiore preservando l'aspect ratio
//! - **Solo downscaling**: un'immagine già entro il limite non viene toccata
//! - **Arrotondamento**: il lato minore viene arrotondato all'intero più vicino (minimo 1px)
//! - **Filtri**: Lanczos di default, area-weighted e di alta qualità
//! - **Unsharp mask**: usata solo dalla variante di upscaling per compensare il blur
//!
//! ## Esempio
//! ```text
//! 4000x2000, cap 600  -> 600x300
//! 1000x3000, cap 600  -> 200x600
//! 500x400,   cap 600  -> invariato
//! ```

use crate::error::CompressError;
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};

/// Algoritmi di resize disponibili
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResizeAlgorithm {
    /// Lanczos - Migliore qualità per downscaling (default)
    #[default]
    Lanczos,
    /// Catmull-Rom, buona qualità generale
    Catrom,
    /// Triangle - Veloce, qualità accettabile per anteprime
    Triangle,
    /// Point - Pixel perfetto per pixel art
    Point,
}

impl ResizeAlgorithm {
    pub fn filter(&self) -> FilterType {
        match self {
            ResizeAlgorithm::Lanczos => FilterType::Lanczos3,
            ResizeAlgorithm::Catrom => FilterType::CatmullRom,
            ResizeAlgorithm::Triangle => FilterType::Triangle,
            ResizeAlgorithm::Point => FilterType::Nearest,
        }
    }
}

/// Rejects caps that cannot produce an image.
pub fn validate_max_dimension(max_dimension: Option<u32>) -> Result<(), CompressError> {
    match max_dimension {
        Some(0) => Err(CompressError::Resize(
            "maximum dimension must be greater than zero".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Target size for a longest-edge cap, or `None` when no resize is needed.
pub fn fit_within(width: u32, height: u32, max_dimension: Option<u32>) -> Option<(u32, u32)> {
    let max = max_dimension?;
    let longest = width.max(height);
    if max == 0 || longest <= max {
        return None;
    }

    let ratio = max as f64 / longest as f64;
    Some(scale_dimensions(width, height, ratio))
}

/// Scales both edges by `ratio`, rounding to the nearest pixel and never below 1.
pub fn scale_dimensions(width: u32, height: u32, ratio: f64) -> (u32, u32) {
    let scale = |v: u32| ((v as f64 * ratio).round() as u32).max(1);
    (scale(width), scale(height))
}

/// Downscales `img` so its longer edge is at most `max_dimension`.
pub fn downscale(
    img: DynamicImage,
    max_dimension: Option<u32>,
    algorithm: ResizeAlgorithm,
) -> Result<DynamicImage, CompressError> {
    validate_max_dimension(max_dimension)?;
    match fit_within(img.width(), img.height(), max_dimension) {
        Some((w, h)) => Ok(img.resize_exact(w, h, algorithm.filter())),
        None => Ok(img),
    }
}

/// Unsharp mask parameters (radius in pixels, amount in percent, threshold in levels)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnsharpMask {
    pub radius: f32,
    pub amount: f32,
    pub threshold: u8,
}

impl Default for UnsharpMask {
    fn default() -> Self {
        Self {
            radius: 2.0,
            amount: 150.0,
            threshold: 3,
        }
    }
}

impl UnsharpMask {
    /// Applies the mask to every color channel; alpha is left untouched.
    pub fn apply(&self, image: &RgbaImage) -> RgbaImage {
        let blurred = imageops::blur(image, self.radius);
        let gain = self.amount / 100.0;
        let threshold = self.threshold as i32;

        let mut out = image.clone();
        for (dst, (src, blur)) in out
            .pixels_mut()
            .zip(image.pixels().zip(blurred.pixels()))
        {
            for c in 0..3 {
                let diff = src[c] as i32 - blur[c] as i32;
                if diff.abs() >= threshold {
                    let sharpened = src[c] as f32 + diff as f32 * gain;
                    dst[c] = sharpened.round().clamp(0.0, 255.0) as u8;
                }
            }
        }
        out
    }
}
