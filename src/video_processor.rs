//! # Video Processing Module
//!
//! Questo modulo gestisce la transcodifica di tutti i formati video supportati verso
//! MP4 (H.264 + AAC).
//!
//! ## Responsabilità:
//! - Trait `VideoEncoder`: il confine verso il backend esterno (ffmpeg in produzione,
//!   encoder finti nei test)
//! - `FfmpegEncoder`: invoca ffmpeg come processo figlio e cattura stderr
//! - `VideoTranscoder`: naming dell'output, scrittura atomica tramite file temporaneo,
//!   timeout opzionale
//!
//! ## Formati supportati:
//! - **Input**: MP4, MOV, AVI, WebM, MKV
//! - **Output**: MP4 (H.264 + AAC) con `+faststart`
//!
//! ## Parametri per livello:
//! | Livello    | CRF | Preset |
//! |------------|-----|--------|
//! | Lossless   | 18  | slow   |
//! | Balanced   | 23  | medium |
//! | Aggressive | 28  | fast   |
//! | Custom     | 23  | medium |
//!
//! ## Resize:
//! Con `max_dimension` il lato lungo viene limitato senza mai ingrandire; il lato corto
//! è calcolato da ffmpeg mantenendo l'aspect ratio e arrotondato a un valore pari.
//!
//! ## Errori:
//! Qualsiasi fallimento produce "Video compression failed"; lo stderr di ffmpeg resta
//! nel dettaglio dell'errore e nei log, mai nel messaggio per l'utente.
//!
//! ## Esempio:
//! ```ignore
//! let encoder = Arc::new(FfmpegEncoder::locate(&config)?);
//! let transcoder = VideoTranscoder::new(encoder, &config);
//! let outcome = transcoder.transcode(&path, &settings, Some(1280)).await?;
//! ```

use crate::args;
use crate::config::Config;
use crate::error::CompressError;
use crate::optimizer::path_resolver::PathResolver;
use crate::platform::ToolLocator;
use crate::resize;
use crate::settings::{CompressionSettings, VideoPreset};
use futures::future::BoxFuture;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const VIDEO_FAILURE_MESSAGE: &str = "Video compression failed";

/// Parameters for one encode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub crf: u8,
    pub preset: VideoPreset,
    pub audio_bitrate: String,
    /// Longest-edge cap, never upscales
    pub max_dimension: Option<u32>,
}

impl EncodeRequest {
    /// Full ffmpeg command line, without the binary
    pub fn ffmpeg_args(&self) -> Vec<String> {
        let mut args = args![
            "-hide_banner",
            "-loglevel",
            "error",
            "-nostdin",
            "-i",
            self.input.display(),
            "-c:v",
            "libx264",
            "-preset",
            self.preset,
            "-crf",
            self.crf,
            "-c:a",
            "aac",
            "-b:a",
            self.audio_bitrate,
        ];
        if let Some(max) = self.max_dimension {
            args.extend(args!["-vf", scale_filter(max)]);
        }
        args.extend(args!["-movflags", "+faststart", "-f", "mp4", "-y", self.output.display()]);
        args
    }
}

/// ffmpeg scale expression capping the longest edge at `max` without upscaling.
/// Both edges come out even, as yuv420p requires.
pub fn scale_filter(max: u32) -> String {
    format!(
        "scale='if(gt(iw,ih),trunc(min({m},iw)/2)*2,-2)':'if(gt(iw,ih),-2,trunc(min({m},ih)/2)*2)'",
        m = max
    )
}

/// Backend that turns an `EncodeRequest` into an MP4 file at `request.output`
pub trait VideoEncoder: Send + Sync {
    fn name(&self) -> &str;

    fn encode<'a>(&'a self, request: &'a EncodeRequest) -> BoxFuture<'a, Result<(), CompressError>>;
}

/// ffmpeg child-process encoder
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    binary: PathBuf,
}

impl FfmpegEncoder {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self { binary: binary.into() }
    }

    /// Find ffmpeg from config, environment or PATH
    pub fn locate(config: &Config) -> Result<Self, CompressError> {
        ToolLocator::from_env()
            .resolve("ffmpeg", config.ffmpeg_path.as_deref())
            .map(Self::new)
            .ok_or_else(|| {
                CompressError::MissingDependency(
                    "ffmpeg not found (set ffmpeg_path, FFMPEG_PATH or add it to PATH)".to_string(),
                )
            })
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    async fn run(&self, request: &EncodeRequest) -> Result<(), CompressError> {
        let args = request.ffmpeg_args();
        debug!("Running {} {}", self.binary.display(), args.join(" "));

        let start_time = std::time::Instant::now();
        let output = tokio::process::Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                CompressError::encode_with_detail(
                    VIDEO_FAILURE_MESSAGE,
                    format!("failed to execute {}: {}", self.binary.display(), e),
                )
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(CompressError::encode_with_detail(VIDEO_FAILURE_MESSAGE, stderr));
        }

        debug!("ffmpeg finished in {:.1}s", start_time.elapsed().as_secs_f64());
        Ok(())
    }
}

impl VideoEncoder for FfmpegEncoder {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn encode<'a>(&'a self, request: &'a EncodeRequest) -> BoxFuture<'a, Result<(), CompressError>> {
        Box::pin(self.run(request))
    }
}

/// Result of one video transcode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoOutcome {
    pub output_path: PathBuf,
}

/// Transcodes videos to MP4 through a `VideoEncoder`
#[derive(Clone)]
pub struct VideoTranscoder {
    encoder: Arc<dyn VideoEncoder>,
    output_dir: PathBuf,
    audio_bitrate: String,
    suffix: String,
    timeout: Option<Duration>,
}

impl VideoTranscoder {
    pub fn new(encoder: Arc<dyn VideoEncoder>, config: &Config) -> Self {
        Self {
            encoder,
            output_dir: config.output_dir.clone(),
            audio_bitrate: config.audio_bitrate.clone(),
            suffix: config.video_suffix.clone(),
            timeout: config.video_timeout_secs.map(Duration::from_secs),
        }
    }

    /// Output path for a video input
    pub fn output_path(&self, input_path: &Path) -> Result<PathBuf, CompressError> {
        PathResolver::output_path(&self.output_dir, input_path, "", &self.suffix, "mp4")
    }

    pub async fn transcode(
        &self,
        input_path: &Path,
        settings: &CompressionSettings,
        max_dimension: Option<u32>,
    ) -> Result<VideoOutcome, CompressError> {
        resize::validate_max_dimension(max_dimension)?;

        let output_path = self.output_path(input_path)?;
        tokio::fs::create_dir_all(&self.output_dir).await?;

        // The encoder writes next to the destination, then the file is moved into place
        let temp_file = tempfile::Builder::new()
            .prefix(".encoding-")
            .suffix(".mp4")
            .tempfile_in(&self.output_dir)?;

        let request = EncodeRequest {
            input: input_path.to_path_buf(),
            output: temp_file.path().to_path_buf(),
            crf: settings.crf,
            preset: settings.preset,
            audio_bitrate: self.audio_bitrate.clone(),
            max_dimension,
        };

        info!(
            "🎬 Transcoding {} with {} (CRF {}, preset {})",
            input_path.display(),
            self.encoder.name(),
            request.crf,
            request.preset
        );

        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, self.encoder.encode(&request)).await {
                Ok(result) => result,
                Err(_) => Err(CompressError::encode_with_detail(
                    VIDEO_FAILURE_MESSAGE,
                    format!("timed out after {}s", limit.as_secs()),
                )),
            },
            None => self.encoder.encode(&request).await,
        };

        if let Err(e) = result {
            if let CompressError::Encode { detail: Some(detail), .. } = &e {
                warn!("Encoder failed for {}: {}", input_path.display(), detail);
            }
            return Err(e);
        }

        temp_file
            .persist(&output_path)
            .map_err(|e| CompressError::Io(e.error))?;

        Ok(VideoOutcome { output_path })
    }
}
