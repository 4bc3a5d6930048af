//! # Media Compressor - Main Entry Point
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del logging con `tracing` (`RUST_LOG` ha la precedenza)
//! - Caricamento della configurazione e override da CLI
//! - Raccolta dei file (le directory vengono esplorate ricorsivamente)
//! - Avvio del batch e stampa del riepilogo
//!
//! ## Esempio di utilizzo:
//! ```bash
//! media-compressor photos/ clip.mov --level aggressive --max-dimension 1920 --json
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use media_compressor::file_manager::FileManager;
use media_compressor::json_output::JsonMessage;
use media_compressor::platform::ToolLocator;
use media_compressor::{
    BatchOptimizer, BatchOptions, BatchRequest, Config, FfmpegEncoder, JobResult, UploadedFile,
};

#[derive(Parser)]
#[command(name = "media-compressor")]
#[command(about = "Compress images, animated GIFs and videos by compression level")]
struct Args {
    /// Files or directories to compress
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Compression level: lossless, balanced, aggressive or custom
    #[arg(short, long, default_value = "balanced")]
    level: String,

    /// Quality (1-100), only used with --level custom
    #[arg(short, long)]
    quality: Option<u8>,

    /// Cap the longest edge of every output, in pixels
    #[arg(short, long)]
    max_dimension: Option<u32>,

    /// Upscale still images by 2 or 4 before compressing
    #[arg(short, long)]
    upscale: Option<u32>,

    /// Output directory for compressed files
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory for working copies
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the ffmpeg binary
    #[arg(long)]
    ffmpeg: Option<PathBuf>,

    /// Print the report as JSON lines on stdout
    #[arg(long)]
    json: bool,

    /// Hide the progress bar
    #[arg(long)]
    no_progress: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // Logs go to stderr so JSON on stdout stays clean
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!("Running on {}", ToolLocator::system_info());

    let mut config = match args.config.clone().or_else(Config::default_path) {
        Some(path) => Config::from_file(&path).await?,
        None => Config::default(),
    };
    if let Some(output) = args.output {
        config.output_dir = output;
    }
    if let Some(work_dir) = args.work_dir {
        config.work_dir = work_dir;
    }
    if let Some(ffmpeg) = args.ffmpeg {
        config.ffmpeg_path = Some(ffmpeg);
    }
    config.json_output |= args.json;
    config.show_progress &= !args.no_progress;
    config.validate()?;

    let options = BatchOptions {
        level: config.parse_level(&args.level)?,
        quality: args.quality,
        max_dimension: args.max_dimension,
        upscale_factor: args.upscale,
    };

    let files = collect_inputs(&args.inputs)?;
    info!("Found {} media files", files.len());

    let needs_ffmpeg = files
        .iter()
        .any(|f| FileManager::is_video(std::path::Path::new(&f.original_name)));
    let encoder = match FfmpegEncoder::locate(&config) {
        Ok(encoder) => encoder,
        Err(e) if needs_ffmpeg => return Err(e.into()),
        Err(e) => {
            debug!("{}; no videos in this batch", e);
            FfmpegEncoder::new(ToolLocator::executable_name("ffmpeg"))
        }
    };

    let json_output = config.json_output;
    let optimizer = BatchOptimizer::new(config, Arc::new(encoder));
    let request = BatchRequest { files, options };

    let outcome = match optimizer.run(&request).await {
        Ok(outcome) => outcome,
        Err(e) => {
            if json_output {
                JsonMessage::error(e.to_string()).emit();
            }
            return Err(e.into());
        }
    };

    if json_output {
        JsonMessage::complete(&outcome.results, outcome.stats).emit();
    } else {
        for result in &outcome.results {
            match result {
                JobResult::Success(_) => info!("{}", result.summary()),
                JobResult::Failure { .. } => warn!("{}", result.summary()),
            }
        }
    }

    Ok(())
}

/// Expand inputs into uploaded files, walking directories
fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<UploadedFile>> {
    let mut files = Vec::new();
    for input in inputs {
        let paths = if input.is_dir() {
            FileManager::find_media_files(input)
        } else if input.is_file() {
            vec![input.clone()]
        } else {
            return Err(anyhow::anyhow!("Input does not exist: {}", input.display()));
        };

        for path in paths {
            let size = std::fs::metadata(&path)?.len();
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            files.push(UploadedFile::new(path, name, size));
        }
    }
    Ok(files)
}
