//! # Batch Optimizer
//!
//! Orchestratore del batch: risolve le impostazioni una volta, elabora i file in
//! sequenza nell'ordine di invio e raccoglie un `JobResult` per ciascuno.
//!
//! Il fallimento di un file non interrompe il batch; l'unico errore a livello di
//! batch è una lista vuota (oltre a opzioni non valide).

use crate::{
    config::{BatchOptions, Config},
    error::CompressError,
    job::{JobResult, UploadedFile},
    json_output::JsonMessage,
    optimizer::task_optimizer::TaskOptimizer,
    progress::{BatchStats, ProgressManager},
    settings::{resolve, CompressionSettings},
    upscale::Upscaler,
    video_processor::VideoEncoder,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Files and options of one request
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub files: Vec<UploadedFile>,
    pub options: BatchOptions,
}

/// Ordered results and aggregate statistics
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub settings: CompressionSettings,
    pub results: Vec<JobResult>,
    pub stats: BatchStats,
}

/// Orchestratore principale
pub struct BatchOptimizer {
    config: Config,
    task: TaskOptimizer,
}

impl BatchOptimizer {
    pub fn new(config: Config, encoder: Arc<dyn VideoEncoder>) -> Self {
        let task = TaskOptimizer::new(&config, encoder);
        Self { config, task }
    }

    pub fn with_upscaler(mut self, upscaler: Arc<dyn Upscaler>) -> Self {
        self.task = self.task.with_upscaler(upscaler);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Compress every file of the request, strictly one after another
    pub async fn run(&self, request: &BatchRequest) -> Result<BatchOutcome, CompressError> {
        if request.files.is_empty() {
            return Err(CompressError::EmptyBatch);
        }
        self.config
            .validate()
            .map_err(|e| CompressError::Validation(e.to_string()))?;
        request.options.validate()?;

        let settings = resolve(request.options.level, request.options.quality);
        let total = request.files.len();

        tokio::fs::create_dir_all(&self.config.work_dir).await?;
        tokio::fs::create_dir_all(&self.config.output_dir).await?;

        info!(
            "🚀 Compressing {} files (level {}, quality {}, crf {}, max dimension {:?})",
            total, settings.level, settings.quality, settings.crf, request.options.max_dimension
        );

        if self.config.json_output {
            JsonMessage::start(total, settings, request.options.max_dimension).emit();
        }

        let progress = if self.config.show_progress && !self.config.json_output {
            ProgressManager::new(total as u64)
        } else {
            ProgressManager::hidden(total as u64)
        };

        let mut results = Vec::with_capacity(total);
        for (index, file) in request.files.iter().enumerate() {
            progress.set_message(&file.original_name);
            let result = self.task.process(file, &settings, &request.options).await;

            if self.config.json_output {
                JsonMessage::file_complete(index + 1, total, &result).emit();
            }
            progress.update(&result.summary());
            results.push(result);
        }

        let stats = BatchStats::from_results(&results);
        let summary = stats.format_summary(total);
        progress.finish(&summary);
        info!("✨ {}", summary);

        Ok(BatchOutcome {
            settings,
            results,
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompressError;
    use crate::settings::CompressionLevel;
    use futures::future::BoxFuture;
    use image::{Rgb, RgbImage};
    use std::path::Path;
    use tempfile::TempDir;

    struct FakeEncoder {
        fail: bool,
    }

    impl VideoEncoder for FakeEncoder {
        fn name(&self) -> &str {
            "fake"
        }

        fn encode<'a>(
            &'a self,
            request: &'a crate::video_processor::EncodeRequest,
        ) -> BoxFuture<'a, Result<(), CompressError>> {
            Box::pin(async move {
                if self.fail {
                    return Err(CompressError::encode_with_detail(
                        "Video compression failed",
                        "Invalid data found when processing input",
                    ));
                }
                tokio::fs::write(&request.output, vec![0u8; 100]).await?;
                Ok(())
            })
        }
    }

    fn optimizer(dir: &TempDir, fail_video: bool) -> BatchOptimizer {
        let config = Config {
            output_dir: dir.path().join("outputs"),
            work_dir: dir.path().join("uploads"),
            show_progress: false,
            ..Default::default()
        };
        BatchOptimizer::new(config, Arc::new(FakeEncoder { fail: fail_video }))
    }

    fn upload(dir: &TempDir, name: &str, bytes: &[u8]) -> UploadedFile {
        let incoming = dir.path().join("incoming");
        std::fs::create_dir_all(&incoming).unwrap();
        let path = incoming.join(format!("tmp-{}", name.replace(' ', "-")));
        std::fs::write(&path, bytes).unwrap();
        UploadedFile::new(path, name, bytes.len() as u64)
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]));
        let mut bytes = std::io::Cursor::new(Vec::new());
        img.write_to(&mut bytes, image::ImageOutputFormat::Png).unwrap();
        bytes.into_inner()
    }

    #[tokio::test]
    async fn test_empty_batch_is_rejected() {
        let dir = TempDir::new().unwrap();
        let request = BatchRequest {
            files: vec![],
            options: BatchOptions::default(),
        };
        let err = optimizer(&dir, false).run(&request).await.unwrap_err();
        assert!(matches!(err, CompressError::EmptyBatch));
    }

    #[tokio::test]
    async fn test_invalid_options_rejected() {
        let dir = TempDir::new().unwrap();
        let request = BatchRequest {
            files: vec![upload(&dir, "a.png", &png_bytes(4, 4))],
            options: BatchOptions {
                max_dimension: Some(0),
                ..Default::default()
            },
        };
        let err = optimizer(&dir, false).run(&request).await.unwrap_err();
        assert!(err.is_batch_scoped());
    }

    #[tokio::test]
    async fn test_shared_output_and_work_dir_rejected() {
        let dir = TempDir::new().unwrap();
        let shared = dir.path().join("shared");
        let config = Config {
            output_dir: shared.clone(),
            work_dir: shared,
            show_progress: false,
            ..Default::default()
        };
        let opt = BatchOptimizer::new(config, Arc::new(FakeEncoder { fail: false }));
        let request = BatchRequest {
            files: vec![upload(&dir, "anim.gif", b"GIF89a")],
            options: BatchOptions::default(),
        };

        let err = opt.run(&request).await.unwrap_err();
        assert!(matches!(err, CompressError::Validation(_)), "{:?}", err);
        assert!(err.is_batch_scoped());
    }

    #[tokio::test]
    async fn test_failures_are_isolated_and_ordered() {
        let dir = TempDir::new().unwrap();
        let files = vec![
            upload(&dir, "holiday photo.png", &png_bytes(64, 48)),
            upload(&dir, "notes.txt", b"just text"),
            upload(&dir, "broken.jpg", b"not really a jpeg"),
            upload(&dir, "clip.mov", &[7u8; 400]),
        ];
        let request = BatchRequest {
            files,
            options: BatchOptions::new(CompressionLevel::Balanced),
        };

        let opt = optimizer(&dir, false);
        let outcome = opt.run(&request).await.unwrap();
        assert_eq!(outcome.results.len(), 4);

        let names: Vec<&str> = outcome.results.iter().map(|r| r.original_name()).collect();
        assert_eq!(names, vec!["holiday_photo.png", "notes.txt", "broken.jpg", "clip.mov"]);

        match &outcome.results[0] {
            JobResult::Success(file) => {
                assert_eq!(file.output_name, "holiday_photo.webp");
                assert_eq!(file.original_dims, Some((64, 48)));
                assert_eq!(file.download_locator, "download/holiday_photo.webp");
                assert!(opt.config().output_dir.join("holiday_photo.webp").exists());
            }
            other => panic!("expected success, got {:?}", other),
        }

        match &outcome.results[1] {
            JobResult::Failure { error_message, .. } => {
                assert_eq!(error_message, "Unsupported format: txt");
            }
            other => panic!("expected failure, got {:?}", other),
        }

        assert!(!outcome.results[2].is_success());

        match &outcome.results[3] {
            JobResult::Success(file) => {
                assert_eq!(file.output_name, "clip_compressed.mp4");
                assert_eq!(file.original_bytes, 400);
                assert_eq!(file.compressed_bytes, 100);
                assert_eq!(file.reduction_percent, 75);
            }
            other => panic!("expected success, got {:?}", other),
        }

        assert_eq!(outcome.stats.processed_count, 2);
    }

    #[tokio::test]
    async fn test_working_copies() {
        let dir = TempDir::new().unwrap();
        let opt = optimizer(&dir, true);
        let request = BatchRequest {
            files: vec![
                upload(&dir, "ok.png", &png_bytes(8, 8)),
                upload(&dir, "bad.mp4", &[1u8; 64]),
            ],
            options: BatchOptions::default(),
        };

        let outcome = opt.run(&request).await.unwrap();
        let work_dir = &opt.config().work_dir;

        // Successful job cleans up, failed job keeps its working copy
        assert!(!work_dir.join("ok.png").exists());
        assert!(work_dir.join("bad.mp4").exists());

        match &outcome.results[1] {
            JobResult::Failure { error_message, .. } => {
                assert_eq!(error_message, "Video compression failed");
                assert!(!error_message.contains("Invalid data"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(outcome.stats.processed_count, 1);
    }

    #[tokio::test]
    async fn test_custom_quality_and_resize() {
        let dir = TempDir::new().unwrap();
        let opt = optimizer(&dir, false);
        let request = BatchRequest {
            files: vec![upload(&dir, "wide.png", &png_bytes(300, 100))],
            options: BatchOptions {
                level: CompressionLevel::Custom,
                quality: Some(40),
                max_dimension: Some(150),
                upscale_factor: None,
            },
        };

        let outcome = opt.run(&request).await.unwrap();
        assert_eq!(outcome.settings.quality, 40);
        match &outcome.results[0] {
            JobResult::Success(file) => assert_eq!(file.output_dims, Some((150, 50))),
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_upscale_batch() {
        let dir = TempDir::new().unwrap();
        let opt = optimizer(&dir, false);
        let request = BatchRequest {
            files: vec![upload(&dir, "tiny.png", &png_bytes(20, 10))],
            options: BatchOptions {
                upscale_factor: Some(4),
                ..Default::default()
            },
        };

        let outcome = opt.run(&request).await.unwrap();
        match &outcome.results[0] {
            JobResult::Success(file) => {
                assert_eq!(file.output_name, "upscaled_tiny.webp");
                assert_eq!(file.output_dims, Some((80, 40)));
                assert!(Path::new(&opt.config().output_dir).join("upscaled_tiny.webp").exists());
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[test]
    fn test_blocking_entry_point() {
        let dir = TempDir::new().unwrap();
        let opt = optimizer(&dir, false);
        let request = BatchRequest {
            files: vec![upload(&dir, "unknown.xyz", b"??")],
            options: BatchOptions::default(),
        };
        let outcome = tokio_test::block_on(opt.run(&request)).unwrap();
        assert_eq!(outcome.stats, BatchStats::default());
    }
}
