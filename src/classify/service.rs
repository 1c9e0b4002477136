//! Classification service
//!
//! Builds the population from the durable store, applies the rule engine,
//! persists the category and reports the cluster from the partition model.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use super::features::AttributeVector;
use super::partition::PartitionState;
use super::rules::{classify, compute_thresholds, Category, ThresholdSet};
use super::ClassifyError;
use crate::models::AttributeMap;
use crate::store::DurableStore;

/// Result of classifying one company
#[derive(Debug, Clone)]
pub struct Classification {
    pub category: Category,
    pub cluster: Option<usize>,
    /// Set when a partition model is configured but could not be loaded.
    pub cluster_error: Option<String>,
    /// Set when the category could not be persisted.
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReclassifySummary {
    pub classified: usize,
    pub failed: usize,
    /// Companies without any usable numeric attribute.
    pub skipped: usize,
    pub categories: BTreeMap<Category, usize>,
    pub thresholds: ThresholdSet,
}

pub struct ClassificationService {
    store: Arc<dyn DurableStore>,
    partitioner: PartitionState,
}

impl ClassificationService {
    pub fn new(store: Arc<dyn DurableStore>, partitioner: PartitionState) -> Self {
        Self { store, partitioner }
    }

    pub fn has_partitioner(&self) -> bool {
        matches!(self.partitioner, PartitionState::Loaded(_))
    }

    /// Classify `ticker` with `data` against the current stored population.
    ///
    /// `data` replaces whatever the store holds for `ticker` when building
    /// the population, so a record classified right after its write is
    /// counted exactly once.
    pub async fn classify_record(&self, ticker: &str, data: &AttributeMap) -> Result<Classification, ClassifyError> {
        let vector = AttributeVector::from_attributes(data);
        if vector.is_blank() {
            return Err(ClassifyError::InputError(format!("no numeric attributes for {}", ticker)));
        }

        let records = self.store.list_all().await?;
        let mut population: Vec<(String, AttributeVector)> = records
            .into_iter()
            .filter(|r| r.ticker != ticker)
            .map(|r| {
                let v = AttributeVector::from_attributes(&r.data);
                (r.ticker, v)
            })
            .filter(|(_, v)| !v.is_blank())
            .collect();
        population.push((ticker.to_string(), vector));
        population.sort_by(|a, b| a.0.cmp(&b.0));

        let vectors: Vec<AttributeVector> = population.into_iter().map(|(_, v)| v).collect();
        let thresholds = compute_thresholds(&vectors)?;
        let category = classify(data, &thresholds);

        let warning = match self.store.update_category(ticker, category.as_str()).await {
            Ok(true) => None,
            Ok(false) => Some(format!("no stored record for {} to attach category to", ticker)),
            Err(e) => {
                tracing::warn!("Failed to persist category for {}: {}", ticker, e);
                Some(e.to_string())
            }
        };

        let (cluster, cluster_error) = match &self.partitioner {
            PartitionState::Disabled => (None, None),
            PartitionState::Loaded(model) => (Some(model.predict(&vector)), None),
            PartitionState::Unavailable(e) => {
                tracing::warn!("No cluster for {}: {}", ticker, e);
                (None, Some(e.to_string()))
            }
        };

        tracing::debug!(
            "Classified {} as {} (cluster {:?}, population {})",
            ticker, category, cluster, vectors.len()
        );

        Ok(Classification { category, cluster, cluster_error, warning })
    }

    /// Recompute thresholds once and persist a category for every stored company.
    pub async fn reclassify_all(&self) -> Result<ReclassifySummary, ClassifyError> {
        let records = self.store.list_all().await?;
        let total = records.len();

        let usable: Vec<_> = records
            .into_iter()
            .map(|r| {
                let v = AttributeVector::from_attributes(&r.data);
                (r, v)
            })
            .filter(|(_, v)| !v.is_blank())
            .collect();

        if usable.is_empty() {
            return Err(ClassifyError::InputError("no companies to classify".to_string()));
        }

        let vectors: Vec<AttributeVector> = usable.iter().map(|(_, v)| *v).collect();
        let thresholds = compute_thresholds(&vectors)?;

        let mut classified = 0;
        let mut failed = 0;
        let mut categories = BTreeMap::new();

        for (record, _) in &usable {
            let category = classify(&record.data, &thresholds);
            match self.store.update_category(&record.ticker, category.as_str()).await {
                Ok(_) => {
                    classified += 1;
                    *categories.entry(category).or_insert(0) += 1;
                }
                Err(e) => {
                    tracing::warn!("Failed to persist category for {}: {}", record.ticker, e);
                    failed += 1;
                }
            }
        }

        tracing::info!("Reclassified {} companies ({} failed)", classified, failed);

        Ok(ReclassifySummary {
            classified,
            failed,
            skipped: total - usable.len(),
            categories,
            thresholds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::partition::{PartitionModel, Partitioner};
    use crate::store::memory::MemoryStore;
    use serde_json::json;

    struct FixedPartition(usize);

    impl Partitioner for FixedPartition {
        fn predict(&self, _vector: &AttributeVector) -> usize {
            self.0
        }

        fn partition_count(&self) -> usize {
            self.0 + 1
        }
    }

    fn company(cap: f64, beta: f64) -> AttributeMap {
        json!({"MarketCapitalization": cap.to_string(), "Beta": beta.to_string()})
            .as_object()
            .cloned()
            .unwrap_or_default()
    }

    async fn seeded_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        let retention = chrono::Duration::days(90);
        for (ticker, cap, beta) in [("AAA", 10.0, 0.9), ("BBB", 20.0, 1.0), ("CCC", 30.0, 1.1)] {
            store.upsert(ticker, &company(cap, beta), None, retention).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_classify_record_against_population() {
        let store = seeded_store().await;
        let service = ClassificationService::new(store.clone(), PartitionState::Disabled);

        let data = company(1000.0, 0.5);
        store.upsert("BIG", &data, None, chrono::Duration::days(90)).await.unwrap();

        let result = service.classify_record("BIG", &data).await.unwrap();
        assert_eq!(result.category, Category::BlueChip);
        assert_eq!(result.cluster, None);
        assert!(result.warning.is_none());

        let stored = store.get("BIG").await.unwrap().unwrap();
        assert_eq!(stored.category.as_deref(), Some("Blue Chip"));
    }

    #[tokio::test]
    async fn test_classify_record_uses_fresh_data_over_stored() {
        let store = seeded_store().await;
        let service = ClassificationService::new(store.clone(), PartitionState::Disabled);

        // Stored copy of CCC is stale; the fresh one makes it a blue chip
        let fresh = company(1000.0, 0.5);
        let result = service.classify_record("CCC", &fresh).await.unwrap();
        assert_eq!(result.category, Category::BlueChip);
    }

    #[tokio::test]
    async fn test_classify_record_reports_cluster() {
        let store = seeded_store().await;
        let service = ClassificationService::new(store, PartitionState::Loaded(Arc::new(FixedPartition(3))));
        assert!(service.has_partitioner());

        let result = service.classify_record("NEW", &company(5.0, 2.0)).await.unwrap();
        assert_eq!(result.category, Category::HighVolatility);
        assert_eq!(result.cluster, Some(3));
        // NEW was never stored
        assert!(result.warning.is_some());
    }

    #[tokio::test]
    async fn test_missing_model_is_reported_per_call() {
        let store = seeded_store().await;
        let dir = tempfile::tempdir().unwrap();
        let load_error = PartitionModel::load(&dir.path().join("cluster_model.json")).unwrap_err();
        let service = ClassificationService::new(store.clone(), PartitionState::Unavailable(load_error));
        assert!(!service.has_partitioner());

        for _ in 0..2 {
            let result = service.classify_record("CCC", &company(30.0, 1.1)).await.unwrap();
            assert_eq!(result.cluster, None);
            let error = result.cluster_error.unwrap();
            assert!(error.contains("not found"), "unexpected error: {}", error);
        }

        // The rule-based category is still persisted
        let stored = store.get("CCC").await.unwrap().unwrap();
        assert!(stored.category.is_some());
    }

    #[tokio::test]
    async fn test_blank_record_is_rejected() {
        let store = seeded_store().await;
        let service = ClassificationService::new(store, PartitionState::Disabled);
        let data = json!({"Name": "Shell"}).as_object().cloned().unwrap_or_default();

        let result = service.classify_record("SHL", &data).await;
        assert!(matches!(result, Err(ClassifyError::InputError(_))));
    }

    #[tokio::test]
    async fn test_reclassify_all() {
        let store = seeded_store().await;
        let retention = chrono::Duration::days(90);
        store.upsert("BIG", &company(1000.0, 0.5), None, retention).await.unwrap();
        store.upsert("NIL", &AttributeMap::new(), None, retention).await.unwrap();
        let service = ClassificationService::new(store.clone(), PartitionState::Disabled);

        let summary = service.reclassify_all().await.unwrap();
        assert_eq!(summary.classified, 4);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.thresholds.market_cap, 25.0);
        assert_eq!(summary.categories.get(&Category::BlueChip), Some(&1));
        assert_eq!(summary.categories.values().sum::<usize>(), 4);

        let big = store.get("BIG").await.unwrap().unwrap();
        assert_eq!(big.category.as_deref(), Some("Blue Chip"));
        assert!(store.get("NIL").await.unwrap().unwrap().category.is_none());
    }

    #[tokio::test]
    async fn test_reclassify_empty_store() {
        let service = ClassificationService::new(Arc::new(MemoryStore::new()), PartitionState::Disabled);
        assert!(matches!(service.reclassify_all().await, Err(ClassifyError::InputError(_))));
    }
}
