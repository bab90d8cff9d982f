use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::criteria::LoadCriteria;
use crate::pricing::formula::{
    formula_rate, DISTANCE_TOLERANCE_MILES, HISTORICAL_MARKUP, WEIGHT_TOLERANCE_POUNDS,
};

/// Upper bound on the historical aggregate query; the source system enforces
/// the same limit server-side.
pub const HISTORY_QUERY_TIMEOUT: Duration = Duration::from_secs(90);

/// Lane match for the historical tier: exact localities (case-insensitive)
/// with inclusive distance/weight windows around the request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateQuery {
    pub shipper_city: String,
    pub consignee_city: String,
    pub min_distance: u32,
    pub max_distance: u32,
    pub min_weight: u32,
    pub max_weight: u32,
}

impl RateQuery {
    pub fn for_criteria(criteria: &LoadCriteria) -> Self {
        Self {
            shipper_city: criteria.shipper_city.clone(),
            consignee_city: criteria.consignee_city.clone(),
            min_distance: criteria.bill_distance.saturating_sub(DISTANCE_TOLERANCE_MILES),
            max_distance: criteria.bill_distance.saturating_add(DISTANCE_TOLERANCE_MILES),
            min_weight: criteria.weight.saturating_sub(WEIGHT_TOLERANCE_POUNDS),
            max_weight: criteria.weight.saturating_add(WEIGHT_TOLERANCE_POUNDS),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RateStoreError {
    #[error("historical rate query timed out")]
    Timeout,
    #[error("historical rate query failed: {0}")]
    Query(String),
}

/// Read-aggregate-only access to the historical rate store.
#[async_trait]
pub trait HistoricalRateStore: Send + Sync {
    /// Mean rate over prior loads matching the query; `Ok(None)` when no
    /// prior load falls inside the tolerance windows.
    async fn average_rate(&self, query: &RateQuery) -> Result<Option<f64>, RateStoreError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provenance {
    HistoricalMatch,
    FormulaFallback,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RateResult {
    pub amount: f64,
    pub provenance: Provenance,
    /// The store failure that forced the formula tier, when there was one.
    pub store_error: Option<RateStoreError>,
}

impl RateResult {
    /// Two-decimal rounding happens here and nowhere else; internal
    /// comparisons always see the unrounded amount.
    pub fn display_amount(&self) -> String {
        format!("${:.2}", self.amount)
    }
}

/// Two-tier rate estimation: historical lane average with markup, or the
/// deterministic formula when the store has no match or cannot answer.
pub struct RateEstimator {
    store: Arc<dyn HistoricalRateStore>,
    query_timeout: Duration,
}

impl RateEstimator {
    pub fn new(store: Arc<dyn HistoricalRateStore>) -> Self {
        Self { store, query_timeout: HISTORY_QUERY_TIMEOUT }
    }

    pub fn with_query_timeout(store: Arc<dyn HistoricalRateStore>, timeout: Duration) -> Self {
        Self { store, query_timeout: timeout }
    }

    /// Always produces a displayable result; store timeouts and query
    /// failures price identically to an empty match set.
    pub async fn estimate(&self, criteria: &LoadCriteria) -> RateResult {
        let query = RateQuery::for_criteria(criteria);

        let looked_up =
            match tokio::time::timeout(self.query_timeout, self.store.average_rate(&query)).await {
                Ok(result) => result,
                Err(_) => Err(RateStoreError::Timeout),
            };

        match looked_up {
            Ok(Some(mean)) => RateResult {
                amount: mean * HISTORICAL_MARKUP,
                provenance: Provenance::HistoricalMatch,
                store_error: None,
            },
            Ok(None) => RateResult {
                amount: formula_rate(criteria),
                provenance: Provenance::FormulaFallback,
                store_error: None,
            },
            Err(error) => RateResult {
                amount: formula_rate(criteria),
                provenance: Provenance::FormulaFallback,
                store_error: Some(error),
            },
        }
    }
}
