use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FuelType {
    Gasoline95E5,
    Gasoline95E10,
    Gasoline95E5Premium,
    Gasoline98E5,
    Gasoline98E10,
    DieselA,
    DieselB,
    DieselPremium,
    Bioethanol,
    Biodiesel,
    Lpg,
    Cng,
    Lng,
    Hydrogen,
}

impl FuelType {
    pub const COUNT: usize = 14;

    pub const ALL: [FuelType; FuelType::COUNT] = [
        FuelType::Gasoline95E5,
        FuelType::Gasoline95E10,
        FuelType::Gasoline95E5Premium,
        FuelType::Gasoline98E5,
        FuelType::Gasoline98E10,
        FuelType::DieselA,
        FuelType::DieselB,
        FuelType::DieselPremium,
        FuelType::Bioethanol,
        FuelType::Biodiesel,
        FuelType::Lpg,
        FuelType::Cng,
        FuelType::Lng,
        FuelType::Hydrogen,
    ];

    pub fn column(self) -> &'static str {
        match self {
            FuelType::Gasoline95E5 => "gasoline_95E5",
            FuelType::Gasoline95E10 => "gasoline_95E10",
            FuelType::Gasoline95E5Premium => "gasoline_95E5_premium",
            FuelType::Gasoline98E5 => "gasoline_98E5",
            FuelType::Gasoline98E10 => "gasoline_98E10",
            FuelType::DieselA => "diesel_A",
            FuelType::DieselB => "diesel_B",
            FuelType::DieselPremium => "diesel_premium",
            FuelType::Bioethanol => "bioetanol",
            FuelType::Biodiesel => "biodiesel",
            FuelType::Lpg => "lpg",
            FuelType::Cng => "cng",
            FuelType::Lng => "lng",
            FuelType::Hydrogen => "hydrogen",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// One optional published price per fuel type, kept as the API text
/// (decimal comma included).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuelPrices([Option<String>; FuelType::COUNT]);

impl FuelPrices {
    pub fn get(&self, fuel: FuelType) -> Option<&str> {
        self.0[fuel.index()].as_deref()
    }

    pub fn set(&mut self, fuel: FuelType, value: Option<String>) {
        self.0[fuel.index()] = value;
    }

    pub fn available(&self) -> usize {
        self.0.iter().filter(|p| p.is_some()).count()
    }
}

/// A fuel station's observation for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationPriceRecord {
    pub date: NaiveDate,

    pub station_id: Option<String>,
    pub municipality_id: Option<String>,
    pub province_id: Option<String>,
    pub region_id: Option<String>,

    pub municipality: Option<String>,
    pub province: Option<String>,
    pub town: Option<String>,
    pub address: Option<String>,
    pub zip_code: Option<String>,
    pub longitude: Option<String>,
    pub latitude: Option<String>,

    pub name: Option<String>,
    pub schedule: Option<String>,
    pub restriction: Option<String>,
    pub road_side: Option<String>,
    pub sender: Option<String>,

    pub prices: FuelPrices,
    pub perc_bioetanol: Option<String>,
    pub perc_methyl_ester: Option<String>,
}

impl StationPriceRecord {
    /// Text columns in warehouse order; `date` is stored separately.
    pub const TEXT_COLUMNS: [&'static str; 32] = [
        "station_id",
        "municipality_id",
        "province_id",
        "region_id",
        "municipality",
        "province",
        "town",
        "address",
        "zip_code",
        "longitude",
        "latitude",
        "name",
        "schedule",
        "restriction",
        "road_side",
        "sender",
        "gasoline_95E5",
        "gasoline_95E10",
        "gasoline_95E5_premium",
        "gasoline_98E5",
        "gasoline_98E10",
        "diesel_A",
        "diesel_B",
        "diesel_premium",
        "bioetanol",
        "biodiesel",
        "lpg",
        "cng",
        "lng",
        "hydrogen",
        "perc_bioetanol",
        "perc_methyl_ester",
    ];

    /// Build a record from values already keyed by canonical column.
    /// Columns absent from `fields` are left missing.
    pub fn from_canonical(date: NaiveDate, mut fields: HashMap<&str, Option<String>>) -> Self {
        let mut take = |column: &str| fields.remove(column).flatten();

        let mut prices = FuelPrices::default();
        for fuel in FuelType::ALL {
            prices.set(fuel, take(fuel.column()));
        }

        Self {
            date,
            station_id: take("station_id"),
            municipality_id: take("municipality_id"),
            province_id: take("province_id"),
            region_id: take("region_id"),
            municipality: take("municipality"),
            province: take("province"),
            town: take("town"),
            address: take("address"),
            zip_code: take("zip_code"),
            longitude: take("longitude"),
            latitude: take("latitude"),
            name: take("name"),
            schedule: take("schedule"),
            restriction: take("restriction"),
            road_side: take("road_side"),
            sender: take("sender"),
            prices,
            perc_bioetanol: take("perc_bioetanol"),
            perc_methyl_ester: take("perc_methyl_ester"),
        }
    }

    /// Values aligned with [`Self::TEXT_COLUMNS`].
    pub fn text_values(&self) -> Vec<Option<&str>> {
        let mut values = vec![
            self.station_id.as_deref(),
            self.municipality_id.as_deref(),
            self.province_id.as_deref(),
            self.region_id.as_deref(),
            self.municipality.as_deref(),
            self.province.as_deref(),
            self.town.as_deref(),
            self.address.as_deref(),
            self.zip_code.as_deref(),
            self.longitude.as_deref(),
            self.latitude.as_deref(),
            self.name.as_deref(),
            self.schedule.as_deref(),
            self.restriction.as_deref(),
            self.road_side.as_deref(),
            self.sender.as_deref(),
        ];
        values.extend(FuelType::ALL.iter().map(|fuel| self.prices.get(*fuel)));
        values.push(self.perc_bioetanol.as_deref());
        values.push(self.perc_methyl_ester.as_deref());
        values
    }
}

/// Row of the regions, provinces or municipalities listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceRecord {
    pub id: Option<String>,
    pub parent_id: Option<String>,
    pub name: Option<String>,
}

impl ReferenceRecord {
    /// Values aligned with `TableKind::text_columns` of the owning table.
    pub fn text_values(&self, has_parent: bool) -> Vec<Option<&str>> {
        let mut values = vec![self.id.as_deref()];
        if has_parent {
            values.push(self.parent_id.as_deref());
        }
        values.push(self.name.as_deref());
        values
    }
}

/// Canonical rows of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanonicalRows {
    Prices(Vec<StationPriceRecord>),
    Reference(Vec<ReferenceRecord>),
}

impl CanonicalRows {
    pub fn len(&self) -> usize {
        match self {
            CanonicalRows::Prices(rows) => rows.len(),
            CanonicalRows::Reference(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
