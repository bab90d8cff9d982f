use chrono::{DateTime, Utc};

use crate::repositories::{HistoricalLoad, RepositoryError, SqlLoadHistoryRepository};
use crate::DbPool;

struct SeedLane {
    shipper_city: &'static str,
    consignee_city: &'static str,
    bill_distance: f64,
    weight: f64,
    rate: f64,
    equipment_code: &'static str,
    recorded_at: &'static str,
}

/// Development and test seeds: a dense Chicago-Dallas lane plus a few
/// one-off lanes so both estimator tiers are reachable out of the box.
const SEED_LANES: &[SeedLane] = &[
    SeedLane {
        shipper_city: "CHICAGO",
        consignee_city: "DALLAS",
        bill_distance: 905.0,
        weight: 40_500.0,
        rate: 1_000.0,
        equipment_code: "V",
        recorded_at: "2026-03-02T14:30:00Z",
    },
    SeedLane {
        shipper_city: "CHICAGO",
        consignee_city: "DALLAS",
        bill_distance: 920.0,
        weight: 39_000.0,
        rate: 1_100.0,
        equipment_code: "V",
        recorded_at: "2026-03-09T09:05:00Z",
    },
    SeedLane {
        shipper_city: "CHICAGO",
        consignee_city: "DALLAS",
        bill_distance: 895.0,
        weight: 41_200.0,
        rate: 1_200.0,
        equipment_code: "R",
        recorded_at: "2026-03-21T17:45:00Z",
    },
    SeedLane {
        shipper_city: "LAREDO",
        consignee_city: "ATLANTA",
        bill_distance: 1_180.0,
        weight: 33_000.0,
        rate: 2_350.0,
        equipment_code: "R",
        recorded_at: "2026-04-01T11:00:00Z",
    },
    SeedLane {
        shipper_city: "DENVER",
        consignee_city: "PHOENIX",
        bill_distance: 820.0,
        weight: 18_000.0,
        rate: 1_650.0,
        equipment_code: "F",
        recorded_at: "2026-04-14T08:20:00Z",
    },
];

/// Seeds the load-history table; returns the number of rows inserted.
pub async fn seed_load_history(pool: &DbPool) -> Result<usize, RepositoryError> {
    let repository = SqlLoadHistoryRepository::new(pool.clone());

    for lane in SEED_LANES {
        repository
            .insert(&HistoricalLoad {
                shipper_city: lane.shipper_city.to_string(),
                consignee_city: lane.consignee_city.to_string(),
                bill_distance: lane.bill_distance,
                weight: lane.weight,
                rate: lane.rate,
                equipment_code: Some(lane.equipment_code.to_string()),
                recorded_at: parse_seed_timestamp(lane.recorded_at)?,
            })
            .await?;
    }

    Ok(SEED_LANES.len())
}

fn parse_seed_timestamp(value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("invalid seed timestamp `{value}`: {error}")))
}
