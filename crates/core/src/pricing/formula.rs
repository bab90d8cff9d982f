use crate::domain::criteria::{EquipmentType, LoadCriteria};

/// Fixed pricing constants. These are part of the product contract and are
/// reproduced exactly for parity testing; none of them is configurable at
/// runtime.
pub const DISTANCE_TOLERANCE_MILES: u32 = 60;
pub const WEIGHT_TOLERANCE_POUNDS: u32 = 3_500;
pub const HISTORICAL_MARKUP: f64 = 1.06;
pub const BASE_RATE_PER_MILE: f64 = 1.45;
pub const MINIMUM_BASE_RATE: f64 = 350.0;
pub const DISTANCE_SURCHARGE_PER_MILE: f64 = 0.50;
pub const DRIVER_ASSISTANCE_SURCHARGE: f64 = 100.0;
pub const HAZMAT_SURCHARGE: f64 = 200.0;
pub const TOLLS_SURCHARGE: f64 = 50.0;

pub fn equipment_multiplier(equipment: EquipmentType) -> f64 {
    match equipment {
        EquipmentType::Van | EquipmentType::PowerOnly => 1.0,
        EquipmentType::FlatbedOversize | EquipmentType::Flatbed => 0.8,
        EquipmentType::Reefer => 1.2,
        EquipmentType::VanMoffett => 1.7,
        EquipmentType::ReeferMoffett => 2.2,
        EquipmentType::FlatbedMoffett => 1.5,
    }
}

/// Deterministic fallback price.
///
/// The minimum applies to the mileage base before any surcharge; surcharges
/// are independent of each other and purely additive. All arithmetic stays
/// unrounded; rounding happens at display time.
pub fn formula_rate(criteria: &LoadCriteria) -> f64 {
    let distance = f64::from(criteria.bill_distance);

    let mut base = distance * BASE_RATE_PER_MILE * equipment_multiplier(criteria.equipment);
    if base < MINIMUM_BASE_RATE {
        base = MINIMUM_BASE_RATE;
    }

    let mut total = base + distance * DISTANCE_SURCHARGE_PER_MILE;
    if criteria.driver_assistance {
        total += DRIVER_ASSISTANCE_SURCHARGE;
    }
    if criteria.hazmat {
        total += HAZMAT_SURCHARGE;
    }
    if criteria.tolls {
        total += TOLLS_SURCHARGE;
    }
    total
}
