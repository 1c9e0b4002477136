//! Partition Model - standardization + nearest centroid
//!
//! Loads a model fitted offline. Only loading and prediction live here.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::features::{AttributeVector, FEATURE_COUNT, FEATURE_LAYOUT};
use super::ClassifyError;

/// Assigns an attribute vector to a partition index.
pub trait Partitioner: Send + Sync {
    fn predict(&self, vector: &AttributeVector) -> usize;

    fn partition_count(&self) -> usize;
}

/// Partition model availability, decided once at startup.
pub enum PartitionState {
    /// No model configured; clusters are not reported.
    Disabled,
    Loaded(Arc<dyn Partitioner>),
    /// Configured but failed to load. Every classification call reports it.
    Unavailable(ClassifyError),
}

impl PartitionState {
    /// Load the artifact at `path`, or `Disabled` when no path is configured.
    pub fn from_path(path: Option<&Path>) -> Self {
        match path {
            None => PartitionState::Disabled,
            Some(path) => match PartitionModel::load(path) {
                Ok(model) => PartitionState::Loaded(Arc::new(model)),
                Err(e) => PartitionState::Unavailable(e),
            },
        }
    }
}

/// On-disk artifact layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionArtifact {
    /// Attribute names in training order
    pub features: Vec<String>,
    /// Per-feature standardization mean
    pub mean: Vec<f64>,
    /// Per-feature standardization scale (standard deviation, 1.0 for constant features)
    pub scale: Vec<f64>,
    /// Centroids in standardized space
    pub centroids: Vec<Vec<f64>>,
}

#[derive(Debug, Clone)]
pub struct PartitionModel {
    mean: [f64; FEATURE_COUNT],
    scale: [f64; FEATURE_COUNT],
    centroids: Vec<[f64; FEATURE_COUNT]>,
}

impl PartitionModel {
    /// Load and validate an artifact.
    pub fn load(path: &Path) -> Result<Self, ClassifyError> {
        if !path.exists() {
            return Err(ClassifyError::ArtifactNotFound(path.to_path_buf()));
        }

        let corrupt = |reason: String| ClassifyError::ArtifactCorrupt {
            path: path.to_path_buf(),
            reason,
        };

        let bytes = fs::read(path).map_err(|e| corrupt(e.to_string()))?;
        let artifact: PartitionArtifact = serde_json::from_slice(&bytes)
            .map_err(|e| corrupt(e.to_string()))?;

        Self::from_artifact(artifact).map_err(corrupt)
    }

    /// Validate an artifact against the current attribute layout.
    pub fn from_artifact(artifact: PartitionArtifact) -> Result<Self, String> {
        if artifact.features.len() != FEATURE_COUNT
            || artifact.features.iter().zip(FEATURE_LAYOUT).any(|(a, b)| a != b)
        {
            return Err(format!(
                "feature layout mismatch: expected {:?}, got {:?}",
                FEATURE_LAYOUT, artifact.features
            ));
        }

        let mean = to_row(&artifact.mean, "mean")?;
        let mut scale = to_row(&artifact.scale, "scale")?;
        for s in scale.iter_mut().filter(|s| **s == 0.0) {
            *s = 1.0;
        }

        if artifact.centroids.is_empty() {
            return Err("no centroids".to_string());
        }
        let centroids = artifact.centroids
            .iter()
            .enumerate()
            .map(|(i, c)| to_row(c, &format!("centroid {}", i)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { mean, scale, centroids })
    }

    fn standardize(&self, vector: &AttributeVector) -> [f64; FEATURE_COUNT] {
        let mut out = [0.0; FEATURE_COUNT];
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = (vector.get(i) - self.mean[i]) / self.scale[i];
        }
        out
    }
}

impl Partitioner for PartitionModel {
    /// Index of the nearest centroid; the lowest index wins ties.
    fn predict(&self, vector: &AttributeVector) -> usize {
        let point = self.standardize(vector);

        let mut best = 0;
        let mut best_distance = f64::INFINITY;
        for (index, centroid) in self.centroids.iter().enumerate() {
            let distance: f64 = point.iter()
                .zip(centroid)
                .map(|(a, b)| (a - b).powi(2))
                .sum();
            if distance < best_distance {
                best = index;
                best_distance = distance;
            }
        }
        best
    }

    fn partition_count(&self) -> usize {
        self.centroids.len()
    }
}

fn to_row(values: &[f64], name: &str) -> Result<[f64; FEATURE_COUNT], String> {
    if values.len() != FEATURE_COUNT {
        return Err(format!("{} has {} values, expected {}", name, values.len(), FEATURE_COUNT));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(format!("{} contains non-finite values", name));
    }

    let mut row = [0.0; FEATURE_COUNT];
    row.copy_from_slice(values);
    Ok(row)
}
