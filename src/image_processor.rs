//! # Image Processing Module
//!
//! Questo modulo comprime le immagini statiche interamente in-process: decodifica con il
//! crate `image`, normalizzazione del color mode, resize opzionale e codifica WebP/PNG.
//!
//! ## Formati Supportati
//!
//! | Input | Output (default) | Output (Lossless + alpha) |
//! |-------|------------------|---------------------------|
//! | JPEG  | WebP lossy       | -                         |
//! | PNG   | WebP lossy       | PNG                       |
//! | WebP  | WebP lossy       | WebP lossless             |
//! | TIFF  | WebP lossy       | PNG                       |
//! | BMP   | WebP lossy       | -                         |
//!
//! ## Pipeline di Compressione
//!
//! 1. **Decodifica**: formato rilevato dal contenuto, non dall'estensione
//! 2. **Upscaling** (solo variante upscale): tramite l'`Upscaler` iniettato
//! 3. **Color mode**: le immagini con alpha vengono composte su sfondo bianco e convertite
//!    in RGB, tranne al livello Lossless quando il formato sorgente supporta l'alpha
//! 4. **Resize**: longest-edge cap con Lanczos, solo se il limite è superato
//! 5. **Formato**: alpha conservato → formato lossless; altrimenti WebP lossy con
//!    `quality`, `effort` e `optimize_entropy` del livello
//! 6. **Scrittura**: `<output_dir>/<stem>.<ext>`
//!
//! La trasparenza sopravvive solo quando la compressione è lossless.
//!
//! ## Esempio
//! ```ignore
//! let compressor = ImageCompressor::new("outputs");
//! let outcome = compressor.compress(&path, &settings, Some(1920))?;
//! ```

use crate::error::CompressError;
use crate::optimizer::path_resolver::PathResolver;
use crate::resize::{self, ResizeAlgorithm};
use crate::settings::CompressionSettings;
use crate::upscale::Upscaler;
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::io::Reader as ImageReader;
use image::{ColorType, DynamicImage, ImageEncoder, ImageFormat, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Encoded output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Webp,
    WebpLossless,
    Png,
    Gif,
    Mp4,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Webp | Self::WebpLossless => "webp",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Mp4 => "mp4",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Webp => "WebP",
            Self::WebpLossless => "WebP (lossless)",
            Self::Png => "PNG",
            Self::Gif => "GIF",
            Self::Mp4 => "MP4 (H.264/AAC)",
        }
    }
}

/// Result of compressing one still image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageOutcome {
    pub output_path: PathBuf,
    pub format: OutputFormat,
    pub original_dims: (u32, u32),
    pub output_dims: (u32, u32),
}

#[derive(Clone)]
struct UpscaleStage {
    upscaler: Arc<dyn Upscaler>,
    factor: u32,
}

/// Pixels after color-mode normalization
enum Normalized {
    /// Alpha preserved, must be written losslessly
    Rgba(RgbaImage),
    Rgb(RgbImage),
}

/// Still-image compressor
#[derive(Clone)]
pub struct ImageCompressor {
    output_dir: PathBuf,
    algorithm: ResizeAlgorithm,
    upscale: Option<UpscaleStage>,
}

impl ImageCompressor {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            algorithm: ResizeAlgorithm::default(),
            upscale: None,
        }
    }

    pub fn with_algorithm(mut self, algorithm: ResizeAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Switches to the upscaling variant: enlarge by `factor`, always emit lossy WebP.
    pub fn with_upscaler(mut self, upscaler: Arc<dyn Upscaler>, factor: u32) -> Self {
        self.upscale = Some(UpscaleStage { upscaler, factor });
        self
    }

    pub fn is_upscaling(&self) -> bool {
        self.upscale.is_some()
    }

    /// Compress a single image into the output directory
    pub fn compress(
        &self,
        input_path: &Path,
        settings: &CompressionSettings,
        max_dimension: Option<u32>,
    ) -> Result<ImageOutcome, CompressError> {
        resize::validate_max_dimension(max_dimension)?;

        let reader = ImageReader::open(input_path)?.with_guessed_format()?;
        let source_format = reader.format();
        let img = reader.decode()?;
        let original_dims = (img.width(), img.height());

        debug!(
            "Decoded {} ({:?}, {:?}, {}x{})",
            input_path.display(),
            source_format,
            img.color(),
            original_dims.0,
            original_dims.1
        );

        let img = match &self.upscale {
            Some(stage) => {
                debug!("Upscaling x{} with {}", stage.factor, stage.upscaler.name());
                stage.upscaler.upscale(img, stage.factor)?
            }
            None => img,
        };

        let keep_alpha = !self.is_upscaling()
            && img.color().has_alpha()
            && settings.is_lossless()
            && source_format.map_or(false, supports_alpha);

        let normalized = normalize(img, keep_alpha);
        let normalized = match normalized {
            Normalized::Rgba(rgba) => Normalized::Rgba(
                resize::downscale(DynamicImage::ImageRgba8(rgba), max_dimension, self.algorithm)?
                    .into_rgba8(),
            ),
            Normalized::Rgb(rgb) => Normalized::Rgb(
                resize::downscale(DynamicImage::ImageRgb8(rgb), max_dimension, self.algorithm)?
                    .into_rgb8(),
            ),
        };

        let (format, bytes, output_dims) = match &normalized {
            Normalized::Rgba(rgba) if source_format == Some(ImageFormat::WebP) => (
                OutputFormat::WebpLossless,
                encode_webp_lossless(rgba, settings)?,
                rgba.dimensions(),
            ),
            Normalized::Rgba(rgba) => (OutputFormat::Png, encode_png(rgba, settings)?, rgba.dimensions()),
            Normalized::Rgb(rgb) => (OutputFormat::Webp, encode_webp(rgb, settings)?, rgb.dimensions()),
        };

        let prefix = if self.is_upscaling() { "upscaled_" } else { "" };
        let output_path =
            PathResolver::output_path(&self.output_dir, input_path, prefix, "", format.extension())?;
        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&output_path, &bytes)?;

        debug!(
            "Wrote {} ({}, {} bytes, {}x{})",
            output_path.display(),
            format.label(),
            bytes.len(),
            output_dims.0,
            output_dims.1
        );

        Ok(ImageOutcome {
            output_path,
            format,
            original_dims,
            output_dims,
        })
    }
}

fn supports_alpha(format: ImageFormat) -> bool {
    matches!(format, ImageFormat::Png | ImageFormat::WebP | ImageFormat::Tiff)
}

fn normalize(img: DynamicImage, keep_alpha: bool) -> Normalized {
    if keep_alpha {
        Normalized::Rgba(img.into_rgba8())
    } else if img.color().has_alpha() {
        Normalized::Rgb(flatten_on_white(&img.into_rgba8()))
    } else {
        Normalized::Rgb(img.into_rgb8())
    }
}

/// Composites an RGBA image over an opaque white canvas.
pub fn flatten_on_white(rgba: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let p = rgba.get_pixel(x, y);
        let alpha = p[3] as u32;
        let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        image::Rgb([blend(p[0]), blend(p[1]), blend(p[2])])
    })
}

fn webp_config(settings: &CompressionSettings) -> Result<webp::WebPConfig, CompressError> {
    let mut config = webp::WebPConfig::new()
        .map_err(|_| CompressError::encode("Failed to initialise WebP encoder"))?;
    config.quality = settings.quality as f32;
    config.method = settings.effort.webp_method();
    if settings.optimize_entropy {
        config.pass = 6;
        config.segments = 4;
    }
    Ok(config)
}

fn encode_webp(rgb: &RgbImage, settings: &CompressionSettings) -> Result<Vec<u8>, CompressError> {
    let config = webp_config(settings)?;
    let encoder = webp::Encoder::from_rgb(rgb.as_raw(), rgb.width(), rgb.height());
    let memory = encoder
        .encode_advanced(&config)
        .map_err(|e| CompressError::encode(format!("WebP encoding failed: {:?}", e)))?;
    Ok(memory.to_vec())
}

fn encode_webp_lossless(rgba: &RgbaImage, settings: &CompressionSettings) -> Result<Vec<u8>, CompressError> {
    let mut config = webp_config(settings)?;
    config.lossless = 1;
    config.exact = 1;
    config.quality = 100.0;
    let encoder = webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height());
    let memory = encoder
        .encode_advanced(&config)
        .map_err(|e| CompressError::encode(format!("WebP encoding failed: {:?}", e)))?;
    Ok(memory.to_vec())
}

fn encode_png(rgba: &RgbaImage, settings: &CompressionSettings) -> Result<Vec<u8>, CompressError> {
    let (compression, filter) = if settings.optimize_entropy {
        (CompressionType::Best, PngFilterType::Adaptive)
    } else {
        (CompressionType::Default, PngFilterType::Sub)
    };

    let mut buffer = Vec::new();
    PngEncoder::new_with_quality(&mut buffer, compression, filter).write_image(
        rgba.as_raw(),
        rgba.width(),
        rgba.height(),
        ColorType::Rgba8,
    )?;
    Ok(buffer)
}
