//! # Optimizer Module
//!
//! Separa le responsabilità in sottomoduli:
//! - `batch_optimizer`: Orchestratore del batch
//! - `task_optimizer`: Worker per singoli file
//! - `path_resolver`: Logica di calcolo path centralizzata

pub mod batch_optimizer;
pub mod path_resolver;
pub mod task_optimizer;

pub use batch_optimizer::{BatchOptimizer, BatchOutcome, BatchRequest};
pub use path_resolver::PathResolver;
pub use task_optimizer::TaskOptimizer;
