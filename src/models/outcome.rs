//! Per-ticker batch outcomes

use std::collections::BTreeMap;

use serde::Serialize;

use super::AttributeMap;
use crate::upstream::FetchError;

/// Response of a batch fetch, keyed by normalized ticker.
pub type BatchResponse = BTreeMap<String, TickerOutcome>;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TickerOutcome {
    /// Served from the volatile cache; no upstream call was made.
    Cached { data: AttributeMap },

    /// Freshly fetched and written through.
    Fetched {
        data: AttributeMap,
        category: Option<String>,
        cluster: Option<usize>,
        /// Set when no partition model is available for this call.
        cluster_error: Option<String>,
        classification_error: Option<String>,
        warnings: Vec<String>,
    },

    /// Upstream lookup failed for this ticker only.
    Error { error: ErrorDescriptor },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDescriptor {
    pub kind: &'static str,
    pub status: u16,
    pub message: String,
}

impl From<&FetchError> for ErrorDescriptor {
    fn from(err: &FetchError) -> Self {
        Self {
            kind: err.kind(),
            status: err.status_code(),
            message: err.to_string(),
        }
    }
}

impl TickerOutcome {
    pub fn is_error(&self) -> bool {
        matches!(self, TickerOutcome::Error { .. })
    }
}
