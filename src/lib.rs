//! # Media Compressor Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Architettura dei moduli:
//! - `settings`: Livelli di compressione e risoluzione dei parametri dei codec
//! - `config`: Configurazione runtime e opzioni di batch
//! - `error`: Tassonomia degli errori
//! - `file_manager`: Routing per estensione, sanitizzazione nomi, dimensioni
//! - `job`: File caricati, job e risultati per-file
//! - `image_processor`: Compressione immagini statiche (WebP/PNG)
//! - `upscale` / `resize`: Upscaling, longest-edge cap, unsharp mask
//! - `gif_processor`: Ricompressione GIF statiche e animate
//! - `video_processor`: Transcodifica video verso MP4 via ffmpeg
//! - `optimizer`: Orchestratore del batch
//! - `progress` / `json_output`: Statistiche, progress bar e report JSON
//!
//! ## Utilizzo:
//! ```ignore
//! use media_compressor::{BatchOptimizer, BatchOptions, BatchRequest, Config, FfmpegEncoder};
//!
//! let config = Config::default();
//! let encoder = Arc::new(FfmpegEncoder::locate(&config)?);
//! let optimizer = BatchOptimizer::new(config, encoder);
//! let outcome = optimizer.run(&BatchRequest { files, options: BatchOptions::default() }).await?;
//! ```

pub mod config;
pub mod error;
pub mod file_manager;
pub mod gif_processor;
pub mod image_processor;
pub mod job;
pub mod json_output;
pub mod optimizer;
pub mod platform;
pub mod progress;
pub mod resize;
pub mod settings;
pub mod upscale;
pub mod utils;
pub mod video_processor;

pub use config::{BatchOptions, Config};
pub use error::CompressError;
pub use job::{CompressedFile, JobResult, UploadedFile};
pub use optimizer::{BatchOptimizer, BatchOutcome, BatchRequest};
pub use progress::BatchStats;
pub use settings::{resolve, CompressionLevel, CompressionSettings};
pub use video_processor::{FfmpegEncoder, VideoEncoder};
