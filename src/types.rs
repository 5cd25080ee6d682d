use geo::MultiPolygon;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical form of the subzone join key.
///
/// Both the census CSV and the boundary file go through the same
/// constructors, so a key typed as a number on one side and as text on the
/// other still compares equal after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SubzoneKey(String);

impl SubzoneKey {
    /// Normalize a text cell. Returns `None` for an empty cell.
    ///
    /// Text is kept verbatim, except for plain decimals. A decimal whose
    /// fraction is all zeros (`"2.0"`) is reduced to its integer part, and
    /// any other decimal is read as a number (`"2.50"` becomes `"2.5"`)
    /// unless its integer part is zero-padded.
    pub fn from_text(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            return None;
        }
        if let Some((int, frac)) = raw.split_once('.') {
            let digits = int.strip_prefix('-').unwrap_or(int);
            let is_decimal = !digits.is_empty()
                && !frac.is_empty()
                && digits.bytes().all(|b| b.is_ascii_digit())
                && frac.bytes().all(|b| b.is_ascii_digit());
            if is_decimal {
                if frac.bytes().all(|b| b == b'0') {
                    return Some(Self(int.to_string()));
                }
                if digits == "0" || !digits.starts_with('0') {
                    if let Ok(value) = raw.parse::<f64>() {
                        return Self::from_number(value);
                    }
                }
            }
        }
        Some(Self(raw.to_string()))
    }

    /// Normalize a numeric key. Integral values render without a fraction.
    pub fn from_number(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        if value.fract() == 0.0 && value.abs() < 1e15 {
            return Some(Self(format!("{}", value as i64)));
        }
        Some(Self(value.to_string()))
    }

    /// Normalize a GeoJSON property value. Only strings and numbers are keys.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) => Self::from_text(s),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Self(i.to_string()))
                } else if let Some(u) = n.as_u64() {
                    Some(Self(u.to_string()))
                } else {
                    n.as_f64().and_then(Self::from_number)
                }
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubzoneKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

/// Numeric census columns that can be summed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    #[serde(rename = "Subzone Total")]
    SubzoneTotal,
    #[serde(rename = "Total Males")]
    TotalMales,
    #[serde(rename = "Total Females")]
    TotalFemales,
    #[serde(rename = "Total Chinese")]
    TotalChinese,
    #[serde(rename = "Total Malays")]
    TotalMalays,
    #[serde(rename = "Total Indians")]
    TotalIndians,
    #[serde(rename = "Total Others")]
    TotalOthers,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::SubzoneTotal,
        Field::TotalMales,
        Field::TotalFemales,
        Field::TotalChinese,
        Field::TotalMalays,
        Field::TotalIndians,
        Field::TotalOthers,
    ];

    /// Header of the column in the census CSV.
    pub fn column(self) -> &'static str {
        match self {
            Field::SubzoneTotal => "Subzone Total",
            Field::TotalMales => "Total Males",
            Field::TotalFemales => "Total Females",
            Field::TotalChinese => "Total Chinese",
            Field::TotalMalays => "Total Malays",
            Field::TotalIndians => "Total Indians",
            Field::TotalOthers => "Total Others",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// One row of the census CSV. Empty cells are `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopulationRecord {
    pub subzone: SubzoneKey,
    pub region: Option<String>,
    pub planning_area: Option<String>,
    pub subzone_total: Option<f64>,
    pub total_males: Option<f64>,
    pub total_females: Option<f64>,
    pub total_chinese: Option<f64>,
    pub total_malays: Option<f64>,
    pub total_indians: Option<f64>,
    pub total_others: Option<f64>,
}

impl PopulationRecord {
    pub fn value(&self, field: Field) -> Option<f64> {
        match field {
            Field::SubzoneTotal => self.subzone_total,
            Field::TotalMales => self.total_males,
            Field::TotalFemales => self.total_females,
            Field::TotalChinese => self.total_chinese,
            Field::TotalMalays => self.total_malays,
            Field::TotalIndians => self.total_indians,
            Field::TotalOthers => self.total_others,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BoundaryRecord {
    pub subzone: SubzoneKey,
    pub geometry: MultiPolygon<f64>,
}

/// A boundary with its census row attached, if one matched.
#[derive(Debug, Clone)]
pub struct JoinedRecord {
    pub subzone: SubzoneKey,
    pub geometry: MultiPolygon<f64>,
    pub population: Option<PopulationRecord>,
}

impl JoinedRecord {
    pub fn region(&self) -> Option<&str> {
        self.population.as_ref()?.region.as_deref()
    }

    pub fn planning_area(&self) -> Option<&str> {
        self.population.as_ref()?.planning_area.as_deref()
    }

    pub fn value(&self, field: Field) -> Option<f64> {
        self.population.as_ref()?.value(field)
    }

    pub fn subzone_total(&self) -> Option<f64> {
        self.value(Field::SubzoneTotal)
    }
}

/// The region picked in the dashboard selector.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RegionSelection {
    All,
    Region(String),
}

impl RegionSelection {
    pub const ALL_LABEL: &'static str = "All";

    /// Maps a missing or empty parameter to [`RegionSelection::All`].
    pub fn from_param(param: Option<&str>) -> Self {
        match param {
            None => RegionSelection::All,
            Some(s) => s.parse().unwrap_or(RegionSelection::All),
        }
    }
}

impl FromStr for RegionSelection {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s.eq_ignore_ascii_case(Self::ALL_LABEL) {
            Ok(RegionSelection::All)
        } else {
            Ok(RegionSelection::Region(s.to_string()))
        }
    }
}

impl fmt::Display for RegionSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionSelection::All => f.write_str(Self::ALL_LABEL),
            RegionSelection::Region(name) => f.write_str(name),
        }
    }
}
