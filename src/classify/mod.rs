//! Company classification
//!
//! Two independent mechanisms:
//! - `rules`: category label from population-median thresholds (persisted)
//! - `partition`: cluster index from an offline-fitted model (reported only)

pub mod features;
pub mod partition;
pub mod rules;
pub mod service;

pub use partition::PartitionState;
pub use service::{ClassificationService, ReclassifySummary};

use std::path::PathBuf;

use crate::error::PersistenceError;

#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("partition model artifact not found: {0}")]
    ArtifactNotFound(PathBuf),

    #[error("partition model artifact {path} is corrupt: {reason}")]
    ArtifactCorrupt { path: PathBuf, reason: String },

    #[error("{0}")]
    InputError(String),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
