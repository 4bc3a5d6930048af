//! # Task Optimizer Module
//!
//! Worker per la compressione di un singolo file caricato.
//! Separato dall'orchestratore del batch per maggiore modularità.
//!
//! ## Flusso per file:
//! 1. Nome sanitizzato e routing per estensione (estensioni sconosciute falliscono subito)
//! 2. Copia di lavoro in `work_dir` e misura della dimensione originale
//! 3. Dispatch al compressore (immagini e GIF su thread bloccanti, video async)
//! 4. Successo: misura dell'output, calcolo della riduzione, rimozione della copia di lavoro
//! 5. Fallimento: `JobResult::Failure` con il messaggio, la copia di lavoro resta
//!
//! Un file che si trova già nel path di lavoro appartiene al chiamante e non viene mai
//! rimosso, così come una copia di lavoro sovrascritta dall'output stesso.

use crate::{
    config::{BatchOptions, Config},
    error::CompressError,
    file_manager::{FileManager, MediaKind},
    gif_processor::GifCompressor,
    image_processor::{ImageCompressor, OutputFormat},
    job::{CompressedFile, JobResult, MediaJob, UploadedFile},
    optimizer::path_resolver::PathResolver,
    settings::CompressionSettings,
    upscale::{ResampleUpscaler, Upscaler},
    video_processor::{VideoEncoder, VideoTranscoder},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// What a compressor produced for one job
struct Produced {
    output_path: PathBuf,
    format: OutputFormat,
    original_dims: Option<(u32, u32)>,
    output_dims: Option<(u32, u32)>,
}

/// Worker per elaborazione singoli file
#[derive(Clone)]
pub struct TaskOptimizer {
    work_dir: PathBuf,
    images: ImageCompressor,
    gifs: GifCompressor,
    videos: VideoTranscoder,
    upscaler: Arc<dyn Upscaler>,
}

impl TaskOptimizer {
    pub fn new(config: &Config, encoder: Arc<dyn VideoEncoder>) -> Self {
        Self {
            work_dir: config.work_dir.clone(),
            images: ImageCompressor::new(&config.output_dir),
            gifs: GifCompressor::new(&config.output_dir),
            videos: VideoTranscoder::new(encoder, config),
            upscaler: Arc::new(ResampleUpscaler::default()),
        }
    }

    /// Replace the default resampling upscaler
    pub fn with_upscaler(mut self, upscaler: Arc<dyn Upscaler>) -> Self {
        self.upscaler = upscaler;
        self
    }

    /// Compress one file; never fails, errors become `JobResult::Failure`
    pub async fn process(
        &self,
        file: &UploadedFile,
        settings: &CompressionSettings,
        options: &BatchOptions,
    ) -> JobResult {
        match self.try_process(file, settings, options).await {
            Ok(compressed) => JobResult::Success(compressed),
            Err(e) => {
                if let CompressError::Encode { detail: Some(detail), .. } = &e {
                    warn!("❌ {}: {} ({})", file.original_name, e, detail);
                } else {
                    warn!("❌ {}: {}", file.original_name, e);
                }
                JobResult::failure(&file.original_name, &e)
            }
        }
    }

    async fn try_process(
        &self,
        file: &UploadedFile,
        settings: &CompressionSettings,
        options: &BatchOptions,
    ) -> Result<CompressedFile, CompressError> {
        let name = FileManager::sanitize_filename(&file.original_name);
        let extension = FileManager::extension(Path::new(&name)).unwrap_or_default();
        let kind = FileManager::kind_for_extension(&extension).ok_or_else(|| {
            CompressError::UnsupportedFormat(if extension.is_empty() {
                "no file extension".to_string()
            } else {
                extension.clone()
            })
        })?;

        let working_path = PathResolver::working_path(&self.work_dir, &name);
        PathResolver::ensure_parent_dirs(&working_path).await?;
        let owns_copy = !same_file(&file.temp_path, &working_path).await;
        if owns_copy {
            tokio::fs::copy(&file.temp_path, &working_path).await?;
        }
        let original_bytes = FileManager::file_size(&working_path).await?;

        let job = MediaJob {
            source_path: working_path,
            extension,
            kind,
            settings: *settings,
            max_dimension: options.max_dimension,
        };
        debug!("Dispatching {} as {:?}", job.source_path.display(), job.kind);

        let produced = self.dispatch(&job, options.upscale_factor).await?;

        let compressed_bytes = FileManager::file_size(&produced.output_path).await?;
        let output_name = produced
            .output_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if !owns_copy || same_file(&produced.output_path, &job.source_path).await {
            debug!("Keeping {}", job.source_path.display());
        } else if let Err(e) = tokio::fs::remove_file(&job.source_path).await {
            warn!("Could not remove working copy {}: {}", job.source_path.display(), e);
        }

        Ok(CompressedFile {
            original_name: name,
            download_locator: format!("download/{}", output_name),
            preview_locator: format!("preview/{}", output_name),
            output_name,
            media_kind: job.kind,
            output_format: produced.format,
            original_bytes,
            compressed_bytes,
            reduction_percent: FileManager::calculate_reduction(original_bytes, compressed_bytes),
            original_dims: produced.original_dims,
            output_dims: produced.output_dims,
        })
    }

    async fn dispatch(&self, job: &MediaJob, upscale_factor: Option<u32>) -> Result<Produced, CompressError> {
        match job.kind {
            MediaKind::Image => {
                let compressor = match upscale_factor {
                    Some(factor) => self.images.clone().with_upscaler(self.upscaler.clone(), factor),
                    None => self.images.clone(),
                };
                let job = job.clone();
                let outcome = tokio::task::spawn_blocking(move || {
                    compressor.compress(&job.source_path, &job.settings, job.max_dimension)
                })
                .await
                .map_err(|e| CompressError::encode(format!("Image worker failed: {}", e)))??;

                Ok(Produced {
                    output_path: outcome.output_path,
                    format: outcome.format,
                    original_dims: Some(outcome.original_dims),
                    output_dims: Some(outcome.output_dims),
                })
            }
            MediaKind::Gif => {
                let compressor = self.gifs.clone();
                let job = job.clone();
                let outcome = tokio::task::spawn_blocking(move || {
                    compressor.compress(&job.source_path, &job.settings, job.max_dimension)
                })
                .await
                .map_err(|e| CompressError::encode(format!("GIF worker failed: {}", e)))??;

                Ok(Produced {
                    output_path: outcome.output_path,
                    format: OutputFormat::Gif,
                    original_dims: Some(outcome.original_dims),
                    output_dims: Some(outcome.output_dims),
                })
            }
            MediaKind::Video => {
                let outcome = self
                    .videos
                    .transcode(&job.source_path, &job.settings, job.max_dimension)
                    .await?;
                Ok(Produced {
                    output_path: outcome.output_path,
                    format: OutputFormat::Mp4,
                    original_dims: None,
                    output_dims: None,
                })
            }
        }
    }
}

/// Whether two paths name the same existing file
async fn same_file(a: &Path, b: &Path) -> bool {
    match (tokio::fs::canonicalize(a).await, tokio::fs::canonicalize(b).await) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
