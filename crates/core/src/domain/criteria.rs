use serde::{Deserialize, Serialize};

/// Trailer equipment codes as they appear on rate confirmations.
///
/// Codes the extractor cannot resolve price at the van rate, so `Van` is the
/// seeded default.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EquipmentType {
    #[default]
    Van,
    PowerOnly,
    FlatbedOversize,
    Reefer,
    VanMoffett,
    ReeferMoffett,
    Flatbed,
    FlatbedMoffett,
}

impl EquipmentType {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Van => "V",
            Self::PowerOnly => "PO",
            Self::FlatbedOversize => "FO",
            Self::Reefer => "R",
            Self::VanMoffett => "VM",
            Self::ReeferMoffett => "RM",
            Self::Flatbed => "F",
            Self::FlatbedMoffett => "FM",
        }
    }

    pub fn parse_code(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "V" => Some(Self::Van),
            "PO" => Some(Self::PowerOnly),
            "FO" => Some(Self::FlatbedOversize),
            "R" => Some(Self::Reefer),
            "VM" => Some(Self::VanMoffett),
            "RM" => Some(Self::ReeferMoffett),
            "F" => Some(Self::Flatbed),
            "FM" => Some(Self::FlatbedMoffett),
            _ => None,
        }
    }
}

/// Criteria field names as shown to the user when something is missing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CriteriaField {
    ShipperCity,
    ConsigneeCity,
    BillDistance,
    Weight,
    EquipmentType,
    Hazmat,
    DriverAssistance,
    ExtraStops,
    Tolls,
}

impl CriteriaField {
    pub fn label(&self) -> &'static str {
        match self {
            Self::ShipperCity => "shipper city",
            Self::ConsigneeCity => "consignee city",
            Self::BillDistance => "distance in miles",
            Self::Weight => "weight in pounds",
            Self::EquipmentType => "equipment type",
            Self::Hazmat => "hazmat (yes/no)",
            Self::DriverAssistance => "driver assistance (yes/no)",
            Self::ExtraStops => "number of extra stops",
            Self::Tolls => "tolls (yes/no)",
        }
    }
}

pub fn field_labels(fields: &[CriteriaField]) -> String {
    fields.iter().map(CriteriaField::label).collect::<Vec<_>>().join(", ")
}

/// Load criteria accumulated across dialog turns.
///
/// The four lane/quantity fields have no sensible default and stay `None`
/// until a turn provides them. Equipment, the yes/no flags, and the stop
/// count are pre-seeded before pattern matching runs, so "not mentioned" and
/// "explicitly no" read the same.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialCriteria {
    pub shipper_city: Option<String>,
    pub consignee_city: Option<String>,
    pub bill_distance: Option<u32>,
    pub weight: Option<u32>,
    pub equipment: EquipmentType,
    pub hazmat: bool,
    pub driver_assistance: bool,
    pub extra_stops: u32,
    pub tolls: bool,
}

impl PartialCriteria {
    pub fn missing_fields(&self) -> Vec<CriteriaField> {
        let mut missing = Vec::new();
        if self.shipper_city.as_deref().map_or(true, |city| city.trim().is_empty()) {
            missing.push(CriteriaField::ShipperCity);
        }
        if self.consignee_city.as_deref().map_or(true, |city| city.trim().is_empty()) {
            missing.push(CriteriaField::ConsigneeCity);
        }
        if self.bill_distance.is_none() {
            missing.push(CriteriaField::BillDistance);
        }
        if self.weight.is_none() {
            missing.push(CriteriaField::Weight);
        }
        missing
    }

    /// Every field present and non-empty, or the list of fields that block
    /// estimation.
    pub fn into_complete(self) -> Result<LoadCriteria, Vec<CriteriaField>> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(missing);
        }

        Ok(LoadCriteria {
            shipper_city: self.shipper_city.unwrap_or_default(),
            consignee_city: self.consignee_city.unwrap_or_default(),
            bill_distance: self.bill_distance.unwrap_or_default(),
            weight: self.weight.unwrap_or_default(),
            equipment: self.equipment,
            hazmat: self.hazmat,
            driver_assistance: self.driver_assistance,
            extra_stops: self.extra_stops,
            tolls: self.tolls,
        })
    }
}

/// Fully-specified load criteria, the only form the rate estimator accepts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadCriteria {
    pub shipper_city: String,
    pub consignee_city: String,
    /// Billable distance in miles.
    pub bill_distance: u32,
    /// Load weight in pounds.
    pub weight: u32,
    pub equipment: EquipmentType,
    pub hazmat: bool,
    pub driver_assistance: bool,
    pub extra_stops: u32,
    pub tolls: bool,
}
