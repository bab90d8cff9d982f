pub mod estimator;
pub mod formula;

pub use estimator::{
    HistoricalRateStore, Provenance, RateEstimator, RateQuery, RateResult, RateStoreError,
    HISTORY_QUERY_TIMEOUT,
};
pub use formula::{
    equipment_multiplier, formula_rate, BASE_RATE_PER_MILE, DISTANCE_SURCHARGE_PER_MILE,
    DISTANCE_TOLERANCE_MILES, DRIVER_ASSISTANCE_SURCHARGE, HAZMAT_SURCHARGE, HISTORICAL_MARKUP,
    MINIMUM_BASE_RATE, TOLLS_SURCHARGE, WEIGHT_TOLERANCE_POUNDS,
};
