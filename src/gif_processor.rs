//! # GIF Processing Module
//!
//! Ricompressione di GIF statiche e animate, interamente in-process con i crate `gif`
//! e `color_quant`.
//!
//! ## Pipeline:
//! 1. Decodifica di tutti i frame in RGBA (rettangolo, offset, delay e disposal inclusi)
//! 2. Resize opzionale: il rapporto viene calcolato una volta sul canvas logico e
//!    applicato a ogni frame (dimensioni e offset), con Lanczos
//! 3. Quantizzazione per frame con NeuQuant entro il budget di colori del livello
//!    (256 / 128 / 64 / 128); un indice è riservato alla trasparenza se serve
//! 4. Codifica con palette locali; il loop count originale viene conservato
//!
//! ## Invarianti:
//! - Numero e ordine dei frame invariati
//! - Delay e disposal di ogni frame invariati
//! - Loop count invariato (assenza di estensione NETSCAPE inclusa)
//! - Ogni frame usa al massimo `palette_budget` colori

use crate::error::CompressError;
use crate::optimizer::path_resolver::PathResolver;
use crate::resize::{self, ResizeAlgorithm};
use crate::settings::CompressionSettings;
use color_quant::NeuQuant;
use gif::{ColorOutput, DecodeOptions, Frame, Repeat};
use image::{imageops, RgbaImage};
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Alpha below this is written as the transparent index
const ALPHA_THRESHOLD: u8 = 128;

/// Loop behaviour of an animation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopCount {
    /// No NETSCAPE extension, plays once
    Unset,
    Infinite,
    Finite(u16),
}

impl LoopCount {
    fn from_repeat(repeat: Repeat) -> Self {
        match repeat {
            Repeat::Infinite => Self::Infinite,
            Repeat::Finite(0) => Self::Unset,
            Repeat::Finite(n) => Self::Finite(n),
        }
    }

    fn to_repeat(self) -> Option<Repeat> {
        match self {
            Self::Unset => None,
            Self::Infinite => Some(Repeat::Infinite),
            Self::Finite(n) => Some(Repeat::Finite(n)),
        }
    }
}

/// Summary of a GIF file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GifInfo {
    pub width: u32,
    pub height: u32,
    pub frame_count: usize,
    pub loop_count: LoopCount,
    /// Largest palette used by any frame
    pub max_palette_colors: usize,
    pub delays: Vec<u16>,
}

/// Result of recompressing one GIF
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GifOutcome {
    pub output_path: PathBuf,
    pub frame_count: usize,
    pub loop_count: LoopCount,
    pub original_dims: (u32, u32),
    pub output_dims: (u32, u32),
}

/// Animated and static GIF compressor
#[derive(Debug, Clone)]
pub struct GifCompressor {
    output_dir: PathBuf,
    algorithm: ResizeAlgorithm,
}

impl GifCompressor {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            algorithm: ResizeAlgorithm::default(),
        }
    }

    pub fn compress(
        &self,
        input_path: &Path,
        settings: &CompressionSettings,
        max_dimension: Option<u32>,
    ) -> Result<GifOutcome, CompressError> {
        resize::validate_max_dimension(max_dimension)?;

        let mut options = DecodeOptions::new();
        options.set_color_output(ColorOutput::RGBA);
        let mut decoder = options.read_info(BufReader::new(File::open(input_path)?))?;

        let screen = (decoder.width() as u32, decoder.height() as u32);
        let mut frames = Vec::new();
        while let Some(frame) = decoder.read_next_frame()? {
            frames.push(frame.clone());
        }
        if frames.is_empty() {
            return Err(CompressError::Decode("GIF contains no frames".to_string()));
        }
        let loop_count = LoopCount::from_repeat(decoder.repeat());

        // One ratio for the whole animation, taken from the canvas longest edge
        let target = resize::fit_within(screen.0, screen.1, max_dimension);
        let ratio = target
            .and(max_dimension)
            .map(|max| max as f64 / screen.0.max(screen.1) as f64);
        let output_dims = target.unwrap_or(screen);

        debug!(
            "GIF {}: {} frames, {:?}, {}x{} -> {}x{}, budget {}",
            input_path.display(),
            frames.len(),
            loop_count,
            screen.0,
            screen.1,
            output_dims.0,
            output_dims.1,
            settings.palette_budget()
        );

        let output_path = PathResolver::output_path(&self.output_dir, input_path, "", "", "gif")?;
        std::fs::create_dir_all(&self.output_dir)?;

        let writer = BufWriter::new(File::create(&output_path)?);
        let mut encoder = gif::Encoder::new(writer, output_dims.0 as u16, output_dims.1 as u16, &[])?;
        if let Some(repeat) = loop_count.to_repeat() {
            encoder.set_repeat(repeat)?;
        }

        let sample_factor = settings.effort.neuquant_sample_factor();
        for frame in &frames {
            let (rgba, rect) = match ratio {
                Some(ratio) => self.scale_frame(frame, ratio, output_dims),
                None => (
                    frame.buffer.to_vec(),
                    (frame.left, frame.top, frame.width, frame.height),
                ),
            };
            let mut out = quantize(&rgba, settings.palette_budget(), sample_factor);
            out.left = rect.0;
            out.top = rect.1;
            out.width = rect.2;
            out.height = rect.3;
            out.delay = frame.delay;
            out.dispose = frame.dispose;
            out.needs_user_input = frame.needs_user_input;
            encoder.write_frame(&out)?;
        }

        let mut writer = encoder.into_inner()?;
        writer.flush()?;

        Ok(GifOutcome {
            output_path,
            frame_count: frames.len(),
            loop_count,
            original_dims: screen,
            output_dims,
        })
    }

    /// Resample one sub-frame and move it to the scaled canvas position
    fn scale_frame(&self, frame: &Frame<'_>, ratio: f64, canvas: (u32, u32)) -> (Vec<u8>, (u16, u16, u16, u16)) {
        let (width, height) = resize::scale_dimensions(frame.width as u32, frame.height as u32, ratio);
        let width = width.min(canvas.0);
        let height = height.min(canvas.1);
        let left = ((frame.left as f64 * ratio).round() as u32).min(canvas.0 - width);
        let top = ((frame.top as f64 * ratio).round() as u32).min(canvas.1 - height);

        let rect = (left as u16, top as u16, width as u16, height as u16);
        match RgbaImage::from_raw(frame.width as u32, frame.height as u32, frame.buffer.to_vec()) {
            Some(source) => {
                let scaled = imageops::resize(&source, width, height, self.algorithm.filter());
                (scaled.into_raw(), rect)
            }
            // Truncated frame data: keep a blank rectangle so frame count stays intact
            None => (vec![0; (width * height * 4) as usize], rect),
        }
    }

    /// Frame count, loop count and palette sizes of a GIF file
    pub fn probe(path: &Path) -> Result<GifInfo, CompressError> {
        let mut decoder = DecodeOptions::new().read_info(BufReader::new(File::open(path)?))?;
        let global_colors = decoder.global_palette().map_or(0, |p| p.len() / 3);

        let mut frame_count = 0;
        let mut max_palette_colors = 0;
        let mut delays = Vec::new();
        while let Some(frame) = decoder.read_next_frame()? {
            frame_count += 1;
            delays.push(frame.delay);
            let colors = frame.palette.as_ref().map_or(global_colors, |p| p.len() / 3);
            max_palette_colors = max_palette_colors.max(colors);
        }

        Ok(GifInfo {
            width: decoder.width() as u32,
            height: decoder.height() as u32,
            frame_count,
            loop_count: LoopCount::from_repeat(decoder.repeat()),
            max_palette_colors,
            delays,
        })
    }
}

/// Reduce RGBA pixels to an indexed frame of at most `budget` colors.
fn quantize(rgba: &[u8], budget: usize, sample_factor: i32) -> Frame<'static> {
    let has_transparency = rgba.chunks_exact(4).any(|p| p[3] < ALPHA_THRESHOLD);
    let color_slots = if has_transparency { budget - 1 } else { budget };

    let opaque: Vec<u8> = rgba
        .chunks_exact(4)
        .filter(|p| p[3] >= ALPHA_THRESHOLD)
        .flat_map(|p| [p[0], p[1], p[2], 255])
        .collect();

    let mut frame = Frame::default();
    let (mut palette, mut indices) = if opaque.is_empty() {
        (Vec::new(), vec![0u8; rgba.len() / 4])
    } else {
        let quantizer = NeuQuant::new(sample_factor, color_slots, &opaque);
        let indices = rgba
            .chunks_exact(4)
            .map(|p| quantizer.index_of(&[p[0], p[1], p[2], 255]) as u8)
            .collect();
        (quantizer.color_map_rgb(), indices)
    };

    if has_transparency {
        let transparent = (palette.len() / 3) as u8;
        palette.extend_from_slice(&[0, 0, 0]);
        for (index, pixel) in indices.iter_mut().zip(rgba.chunks_exact(4)) {
            if pixel[3] < ALPHA_THRESHOLD {
                *index = transparent;
            }
        }
        frame.transparent = Some(transparent);
    }

    frame.palette = Some(palette);
    frame.buffer = Cow::Owned(indices);
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{resolve, CompressionLevel};
    use gif::DisposalMethod;
    use tempfile::TempDir;

    fn frame_pixels(width: u16, height: u16, seed: u32) -> Vec<u8> {
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
        for y in 0..height as u32 {
            for x in 0..width as u32 {
                pixels.extend_from_slice(&[
                    ((x * 7 + seed * 25) % 256) as u8,
                    ((y * 5 + seed * 40) % 256) as u8,
                    ((x * y + seed) % 256) as u8,
                    255,
                ]);
            }
        }
        pixels
    }

    fn write_gif(path: &Path, width: u16, height: u16, frame_count: u32, repeat: Option<Repeat>) {
        let file = File::create(path).unwrap();
        let mut encoder = gif::Encoder::new(file, width, height, &[]).unwrap();
        if let Some(repeat) = repeat {
            encoder.set_repeat(repeat).unwrap();
        }
        for i in 0..frame_count {
            let mut pixels = frame_pixels(width, height, i);
            let mut frame = Frame::from_rgba_speed(width, height, &mut pixels, 10);
            frame.delay = 10 + i as u16;
            frame.dispose = DisposalMethod::Keep;
            encoder.write_frame(&frame).unwrap();
        }
    }

    #[test]
    fn test_animated_gif_keeps_frames_and_loop() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("spinner.gif");
        write_gif(&input, 48, 32, 10, Some(Repeat::Infinite));

        let compressor = GifCompressor::new(dir.path().join("out"));
        let settings = resolve(CompressionLevel::Balanced, None);
        let outcome = compressor.compress(&input, &settings, None).unwrap();

        assert_eq!(outcome.frame_count, 10);
        assert_eq!(outcome.loop_count, LoopCount::Infinite);
        assert_eq!(outcome.output_path, dir.path().join("out").join("spinner.gif"));

        let info = GifCompressor::probe(&outcome.output_path).unwrap();
        assert_eq!(info.frame_count, 10);
        assert_eq!(info.loop_count, LoopCount::Infinite);
        assert!(info.max_palette_colors <= 128, "palette {}", info.max_palette_colors);
        assert_eq!(info.delays, (0..10).map(|i| 10 + i).collect::<Vec<u16>>());
        assert_eq!((info.width, info.height), (48, 32));
    }

    #[test]
    fn test_aggressive_palette_budget() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("colors.gif");
        write_gif(&input, 64, 64, 3, Some(Repeat::Finite(3)));

        let outcome = GifCompressor::new(dir.path().join("out"))
            .compress(&input, &resolve(CompressionLevel::Aggressive, None), None)
            .unwrap();
        let info = GifCompressor::probe(&outcome.output_path).unwrap();
        assert!(info.max_palette_colors <= 64);
        assert_eq!(info.loop_count, LoopCount::Finite(3));
    }

    #[test]
    fn test_static_gif() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("still.gif");
        write_gif(&input, 20, 20, 1, None);

        let outcome = GifCompressor::new(dir.path().join("out"))
            .compress(&input, &resolve(CompressionLevel::Lossless, None), None)
            .unwrap();
        assert_eq!(outcome.frame_count, 1);

        let info = GifCompressor::probe(&outcome.output_path).unwrap();
        assert_eq!(info.frame_count, 1);
        assert_eq!(info.loop_count, LoopCount::Unset);
    }

    #[test]
    fn test_resize_scales_every_frame() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("big.gif");
        write_gif(&input, 200, 100, 4, Some(Repeat::Infinite));

        let outcome = GifCompressor::new(dir.path().join("out"))
            .compress(&input, &resolve(CompressionLevel::Balanced, None), Some(50))
            .unwrap();
        assert_eq!(outcome.original_dims, (200, 100));
        assert_eq!(outcome.output_dims, (50, 25));

        let mut decoder = DecodeOptions::new()
            .read_info(File::open(&outcome.output_path).unwrap())
            .unwrap();
        assert_eq!((decoder.width(), decoder.height()), (50, 25));
        let mut count = 0;
        while let Some(frame) = decoder.read_next_frame().unwrap() {
            assert_eq!((frame.width, frame.height), (50, 25));
            count += 1;
        }
        assert_eq!(count, 4);
    }

    #[test]
    fn test_resize_tall_narrow_gif_respects_cap() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("ribbon.gif");
        write_gif(&input, 33, 1000, 2, Some(Repeat::Infinite));

        let outcome = GifCompressor::new(dir.path().join("out"))
            .compress(&input, &resolve(CompressionLevel::Balanced, None), Some(600))
            .unwrap();
        assert_eq!(outcome.output_dims, (20, 600));

        let mut decoder = DecodeOptions::new()
            .read_info(File::open(&outcome.output_path).unwrap())
            .unwrap();
        while let Some(frame) = decoder.read_next_frame().unwrap() {
            assert_eq!((frame.width, frame.height), (20, 600));
        }
    }

    #[test]
    fn test_quantize_reserves_transparent_index() {
        let mut rgba = frame_pixels(16, 16, 1);
        for pixel in rgba.chunks_exact_mut(4).take(10) {
            pixel[3] = 0;
        }
        let frame = quantize(&rgba, 64, 10);
        let palette = frame.palette.unwrap();
        let transparent = frame.transparent.unwrap();
        assert!(palette.len() / 3 <= 64);
        assert_eq!(transparent as usize, palette.len() / 3 - 1);
        assert!(frame.buffer[..10].iter().all(|&i| i == transparent));
        assert!(frame.buffer[10..].iter().all(|&i| i != transparent));
    }

    #[test]
    fn test_fully_transparent_frame() {
        let rgba = vec![0u8; 8 * 8 * 4];
        let frame = quantize(&rgba, 128, 10);
        assert_eq!(frame.transparent, Some(0));
        assert_eq!(frame.palette.unwrap().len(), 3);
    }

    #[test]
    fn test_not_a_gif() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("fake.gif");
        std::fs::write(&input, b"plain text").unwrap();

        let err = GifCompressor::new(dir.path())
            .compress(&input, &resolve(CompressionLevel::Balanced, None), None)
            .unwrap_err();
        assert!(matches!(err, CompressError::Decode(_) | CompressError::Io(_)));
    }
}
