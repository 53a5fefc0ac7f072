use crate::error::{IngestError, Result};
use crate::models::{StationPriceRecord, WriteDisposition};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Raw API field name → canonical column name for the daily price listing.
const PRICE_COLUMNS: &[(&str, &str)] = &[
    ("IDEESS", "station_id"),
    ("IDMunicipio", "municipality_id"),
    ("IDProvincia", "province_id"),
    ("IDCCAA", "region_id"),
    ("Municipio", "municipality"),
    ("Provincia", "province"),
    ("Localidad", "town"),
    ("Dirección", "address"),
    ("C.P.", "zip_code"),
    ("Longitud (WGS84)", "longitude"),
    ("Latitud", "latitude"),
    ("Rótulo", "name"),
    ("Horario", "schedule"),
    ("Tipo Venta", "restriction"),
    ("Margen", "road_side"),
    ("Remisión", "sender"),
    ("Precio Gasolina 95 E5", "gasoline_95E5"),
    ("Precio Gasolina 95 E10", "gasoline_95E10"),
    ("Precio Gasolina 95 E5 Premium", "gasoline_95E5_premium"),
    ("Precio Gasolina 98 E5", "gasoline_98E5"),
    ("Precio Gasolina 98 E10", "gasoline_98E10"),
    ("Precio Gasoleo A", "diesel_A"),
    ("Precio Gasoleo B", "diesel_B"),
    ("Precio Gasoleo Premium", "diesel_premium"),
    ("Precio Bioetanol", "bioetanol"),
    ("Precio Biodiesel", "biodiesel"),
    ("Precio Gases licuados del petróleo", "lpg"),
    ("Precio Gas Natural Comprimido", "cng"),
    ("Precio Gas Natural Licuado", "lng"),
    ("Precio Hidrogeno", "hydrogen"),
    ("% BioEtanol", "perc_bioetanol"),
    ("% Éster metílico", "perc_methyl_ester"),
];

const REGION_COLUMNS: &[(&str, &str)] = &[("IDCCAA", "id"), ("CCAA", "name")];

// The upstream listing really spells it "IDPovincia".
const PROVINCE_COLUMNS: &[(&str, &str)] = &[
    ("IDPovincia", "id"),
    ("IDCCAA", "region_id"),
    ("Provincia", "name"),
];

const MUNICIPALITY_COLUMNS: &[(&str, &str)] = &[
    ("IDMunicipio", "id"),
    ("IDProvincia", "province_id"),
    ("Municipio", "name"),
];

/// Static description of one ingestible table.
#[derive(Debug)]
pub struct TableConfig {
    /// Path segment of the remote endpoint.
    pub endpoint: &'static str,
    /// Ordered (raw name, canonical name) pairs.
    pub columns: &'static [(&'static str, &'static str)],
    /// Warehouse table the rows land in.
    pub table_name: &'static str,
    pub disposition: WriteDisposition,
}

static GAS_PRICES: TableConfig = TableConfig {
    endpoint: "EstacionesTerrestresHist",
    columns: PRICE_COLUMNS,
    table_name: "raw_gas_prices",
    disposition: WriteDisposition::Append,
};

static REGIONS: TableConfig = TableConfig {
    endpoint: "ComunidadesAutonomas",
    columns: REGION_COLUMNS,
    table_name: "raw_regions",
    disposition: WriteDisposition::Replace,
};

static PROVINCES: TableConfig = TableConfig {
    endpoint: "Provincias",
    columns: PROVINCE_COLUMNS,
    table_name: "raw_provinces",
    disposition: WriteDisposition::Replace,
};

static MUNICIPALITIES: TableConfig = TableConfig {
    endpoint: "Municipios",
    columns: MUNICIPALITY_COLUMNS,
    table_name: "raw_municipalities",
    disposition: WriteDisposition::Replace,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TableKind {
    GasPrices,
    Regions,
    Provinces,
    Municipalities,
}

impl TableKind {
    pub const ALL: [TableKind; 4] = [
        TableKind::GasPrices,
        TableKind::Regions,
        TableKind::Provinces,
        TableKind::Municipalities,
    ];

    pub fn config(self) -> &'static TableConfig {
        match self {
            TableKind::GasPrices => &GAS_PRICES,
            TableKind::Regions => &REGIONS,
            TableKind::Provinces => &PROVINCES,
            TableKind::Municipalities => &MUNICIPALITIES,
        }
    }

    pub fn is_reference(self) -> bool {
        !matches!(self, TableKind::GasPrices)
    }

    pub fn table_name(self) -> &'static str {
        self.config().table_name
    }

    pub fn disposition(self) -> WriteDisposition {
        self.config().disposition
    }

    /// Canonical column of a reference table that points at its parent, if any.
    pub fn parent_column(self) -> Option<&'static str> {
        match self {
            TableKind::Provinces => Some("region_id"),
            TableKind::Municipalities => Some("province_id"),
            TableKind::GasPrices | TableKind::Regions => None,
        }
    }

    /// Canonical text columns in warehouse order. The fact table additionally
    /// carries a `date` column.
    pub fn text_columns(self) -> Vec<&'static str> {
        match self {
            TableKind::GasPrices => StationPriceRecord::TEXT_COLUMNS.to_vec(),
            reference => {
                let mut columns = vec!["id"];
                columns.extend(reference.parent_column());
                columns.push("name");
                columns
            }
        }
    }

    fn snake_name(self) -> &'static str {
        match self {
            TableKind::GasPrices => "gas_prices",
            TableKind::Regions => "regions",
            TableKind::Provinces => "provinces",
            TableKind::Municipalities => "municipalities",
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.snake_name())
    }
}

impl FromStr for TableKind {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "gasprices" => Ok(TableKind::GasPrices),
            "regions" => Ok(TableKind::Regions),
            "provinces" => Ok(TableKind::Provinces),
            "municipalities" => Ok(TableKind::Municipalities),
            _ => Err(IngestError::Validation(format!(
                "Unsupported table '{}'. Expected one of: GasPrices, Regions, Provinces, Municipalities",
                s
            ))),
        }
    }
}

/// Check the static table registry once at startup.
pub fn validate_registry() -> Result<()> {
    for kind in TableKind::ALL {
        let config = kind.config();
        let mut raw_seen = HashSet::new();
        let mut canonical_seen = HashSet::new();

        for (raw, canonical) in config.columns {
            if raw.trim().is_empty() || canonical.trim().is_empty() {
                return Err(IngestError::Validation(format!(
                    "Empty column name in {} mapping",
                    kind
                )));
            }
            if !raw_seen.insert(*raw) || !canonical_seen.insert(*canonical) {
                return Err(IngestError::Validation(format!(
                    "Duplicate column '{}' -> '{}' in {} mapping",
                    raw, canonical, kind
                )));
            }
        }

        let expected: HashSet<&str> = kind.text_columns().into_iter().collect();
        if expected != canonical_seen {
            return Err(IngestError::Validation(format!(
                "Column mapping for {} does not cover its canonical columns",
                kind
            )));
        }

        if kind.is_reference() != (config.disposition == WriteDisposition::Replace) {
            return Err(IngestError::Validation(format!(
                "Unexpected write disposition {:?} for {}",
                config.disposition, kind
            )));
        }
    }

    Ok(())
}
