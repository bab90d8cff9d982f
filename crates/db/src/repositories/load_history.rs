use async_trait::async_trait;
use chrono::{DateTime, Utc};

use haulbot_core::{HistoricalRateStore, RateQuery, RateStoreError};

use super::RepositoryError;
use crate::DbPool;

/// One prior load as recorded by operations exports.
#[derive(Clone, Debug, PartialEq)]
pub struct HistoricalLoad {
    pub shipper_city: String,
    pub consignee_city: String,
    pub bill_distance: f64,
    pub weight: f64,
    pub rate: f64,
    pub equipment_code: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

pub struct SqlLoadHistoryRepository {
    pool: DbPool,
}

impl SqlLoadHistoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, load: &HistoricalLoad) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO load_history (
                shipper_city, consignee_city, bill_distance, weight, rate,
                equipment_code, recorded_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&load.shipper_city)
        .bind(&load.consignee_city)
        .bind(load.bill_distance)
        .bind(load.weight)
        .bind(load.rate)
        .bind(load.equipment_code.as_deref())
        .bind(load.recorded_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl HistoricalRateStore for SqlLoadHistoryRepository {
    /// Lane aggregate: exact localities compared case-insensitively,
    /// inclusive windows on distance and weight. Database failures surface
    /// as `RateStoreError::Query`; the estimator treats them as "fall back".
    async fn average_rate(&self, query: &RateQuery) -> Result<Option<f64>, RateStoreError> {
        let row: (Option<f64>, i64) = sqlx::query_as(
            r#"
            SELECT AVG(rate), COUNT(*)
            FROM load_history
            WHERE UPPER(shipper_city) = UPPER(?)
              AND UPPER(consignee_city) = UPPER(?)
              AND bill_distance BETWEEN ? AND ?
              AND weight BETWEEN ? AND ?
            "#,
        )
        .bind(&query.shipper_city)
        .bind(&query.consignee_city)
        .bind(f64::from(query.min_distance))
        .bind(f64::from(query.max_distance))
        .bind(f64::from(query.min_weight))
        .bind(f64::from(query.max_weight))
        .fetch_one(&self.pool)
        .await
        .map_err(|error| RateStoreError::Query(error.to_string()))?;

        match row {
            (Some(average), count) if count > 0 => Ok(Some(average)),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use haulbot_core::{HistoricalRateStore, RateQuery};

    use super::{HistoricalLoad, SqlLoadHistoryRepository};
    use crate::{connect_with_settings, migrations, DbPool};

    async fn setup_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:?cache=shared", 1, 5)
            .await
            .expect("test pool should connect");
        migrations::run_pending(&pool).await.expect("migrations should apply");
        pool
    }

    fn load(shipper: &str, consignee: &str, distance: f64, weight: f64, rate: f64) -> HistoricalLoad {
        HistoricalLoad {
            shipper_city: shipper.to_string(),
            consignee_city: consignee.to_string(),
            bill_distance: distance,
            weight,
            rate,
            equipment_code: Some("V".to_string()),
            recorded_at: parse_ts("2026-05-12T08:00:00Z"),
        }
    }

    fn parse_ts(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .map(|timestamp| timestamp.with_timezone(&Utc))
            .expect("fixture timestamp should parse")
    }

    /// Tests share one in-memory database (`cache=shared`), so every test
    /// works a lane of its own.
    fn lane_query(shipper: &str, consignee: &str) -> RateQuery {
        RateQuery {
            shipper_city: shipper.to_string(),
            consignee_city: consignee.to_string(),
            min_distance: 840,
            max_distance: 960,
            min_weight: 36_500,
            max_weight: 43_500,
        }
    }

    #[tokio::test]
    async fn averages_loads_inside_the_tolerance_windows() {
        let pool = setup_pool().await;
        let repo = SqlLoadHistoryRepository::new(pool.clone());

        for rate in [1_000.0, 1_100.0, 1_200.0] {
            repo.insert(&load("Springfield", "Tulsa", 910.0, 40_500.0, rate))
                .await
                .expect("insert should succeed");
        }
        // Same lane but outside the distance window; must not skew the mean.
        repo.insert(&load("Springfield", "Tulsa", 1_200.0, 40_500.0, 9_999.0))
            .await
            .expect("insert should succeed");
        // Different lane entirely.
        repo.insert(&load("Springfield", "Omaha", 910.0, 40_500.0, 9_999.0))
            .await
            .expect("insert should succeed");

        let average = repo
            .average_rate(&lane_query("SPRINGFIELD", "TULSA"))
            .await
            .expect("aggregate should succeed")
            .expect("matches should exist");

        assert!((average - 1_100.0).abs() < 1e-9, "unexpected mean {average}");
        pool.close().await;
    }

    #[tokio::test]
    async fn locality_match_is_case_insensitive() {
        let pool = setup_pool().await;
        let repo = SqlLoadHistoryRepository::new(pool.clone());

        repo.insert(&load("boise", "reno", 900.0, 40_000.0, 1_500.0))
            .await
            .expect("insert should succeed");

        let average = repo
            .average_rate(&lane_query("BOISE", "RENO"))
            .await
            .expect("aggregate should succeed");

        assert_eq!(average, Some(1_500.0));
        pool.close().await;
    }

    #[tokio::test]
    async fn tolerance_window_bounds_are_inclusive() {
        let pool = setup_pool().await;
        let repo = SqlLoadHistoryRepository::new(pool.clone());

        repo.insert(&load("Fargo", "Duluth", 960.0, 43_500.0, 2_000.0))
            .await
            .expect("insert should succeed");

        let average = repo
            .average_rate(&lane_query("FARGO", "DULUTH"))
            .await
            .expect("aggregate should succeed");

        assert_eq!(average, Some(2_000.0));
        pool.close().await;
    }

    #[tokio::test]
    async fn empty_match_set_is_none_not_an_error() {
        let pool = setup_pool().await;
        let repo = SqlLoadHistoryRepository::new(pool.clone());

        let average = repo
            .average_rate(&lane_query("NOWHERE", "NOPLACE"))
            .await
            .expect("aggregate should succeed");

        assert_eq!(average, None);
        pool.close().await;
    }
}
