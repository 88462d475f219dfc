use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Field – the columns we know how to decode
// ---------------------------------------------------------------------------

/// A natality column the loader can decode into a [`BirthRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    MotherAge,
    Education,
    BmiCategory,
    GestationWeeks,
    DeliveryRoute,
    Induction,
    BirthOrder,
    PrenatalCareMonth,
    Birthweight,
}

/// How the raw bytes of a field are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    Text,
}

impl Field {
    pub const ALL: [Field; 9] = [
        Field::MotherAge,
        Field::Education,
        Field::BmiCategory,
        Field::GestationWeeks,
        Field::DeliveryRoute,
        Field::Induction,
        Field::BirthOrder,
        Field::PrenatalCareMonth,
        Field::Birthweight,
    ];

    /// Column name used in CSV / Parquet extracts and config files.
    pub fn name(self) -> &'static str {
        match self {
            Field::MotherAge => "mother_age",
            Field::Education => "education",
            Field::BmiCategory => "bmi_category",
            Field::GestationWeeks => "gestation_weeks",
            Field::DeliveryRoute => "delivery_route",
            Field::Induction => "induction",
            Field::BirthOrder => "birth_order",
            Field::PrenatalCareMonth => "prenatal_care_month",
            Field::Birthweight => "birthweight",
        }
    }

    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.name() == name)
    }

    pub fn kind(self) -> FieldKind {
        match self {
            Field::Induction => FieldKind::Text,
            _ => FieldKind::Integer,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// FieldValue – a single decoded cell
// ---------------------------------------------------------------------------

/// One decoded cell. `Null` is the missing-data sentinel: blank, truncated
/// and unparseable input all end up here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Integer(i64),
    Text(String),
    Null,
}

impl FieldKind {
    /// Decode raw text for this kind. Never fails; bad input becomes `Null`.
    pub fn parse(self, raw: &str) -> FieldValue {
        let raw = raw.trim();
        if raw.is_empty() {
            return FieldValue::Null;
        }
        match self {
            FieldKind::Integer => raw
                .parse::<i64>()
                .map(FieldValue::Integer)
                .unwrap_or(FieldValue::Null),
            FieldKind::Text => FieldValue::Text(raw.to_string()),
        }
    }
}

impl FieldValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(i) => write!(f, "{i}"),
            FieldValue::Text(s) => write!(f, "{s}"),
            FieldValue::Null => write!(f, "<null>"),
        }
    }
}

// ---------------------------------------------------------------------------
// Coded attributes
// ---------------------------------------------------------------------------

/// Final route and method of delivery (`ME_ROUT`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeliveryRoute {
    Spontaneous,
    Forceps,
    Vacuum,
    Cesarean,
    Unknown,
}

impl DeliveryRoute {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(DeliveryRoute::Spontaneous),
            2 => Some(DeliveryRoute::Forceps),
            3 => Some(DeliveryRoute::Vacuum),
            4 => Some(DeliveryRoute::Cesarean),
            9 => Some(DeliveryRoute::Unknown),
            _ => None,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            DeliveryRoute::Spontaneous => 1,
            DeliveryRoute::Forceps => 2,
            DeliveryRoute::Vacuum => 3,
            DeliveryRoute::Cesarean => 4,
            DeliveryRoute::Unknown => 9,
        }
    }

    /// Forceps and vacuum collapse into one operative-vaginal family.
    pub fn family(self) -> Option<RouteFamily> {
        match self {
            DeliveryRoute::Spontaneous => Some(RouteFamily::Spontaneous),
            DeliveryRoute::Forceps | DeliveryRoute::Vacuum => Some(RouteFamily::Operative),
            DeliveryRoute::Cesarean => Some(RouteFamily::Cesarean),
            DeliveryRoute::Unknown => None,
        }
    }
}

/// Induction of labor flag (`LD_INDL`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Induction {
    Induced,
    NotInduced,
    Unknown,
}

impl Induction {
    pub fn from_flag(flag: &str) -> Option<Self> {
        match flag {
            "Y" | "y" => Some(Induction::Induced),
            "N" | "n" => Some(Induction::NotInduced),
            "U" | "u" => Some(Induction::Unknown),
            _ => None,
        }
    }

    pub fn flag(self) -> &'static str {
        match self {
            Induction::Induced => "Y",
            Induction::NotInduced => "N",
            Induction::Unknown => "U",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RouteFamily {
    Spontaneous,
    Operative,
    Cesarean,
}

// ---------------------------------------------------------------------------
// DeliveryCategory – derived per record
// ---------------------------------------------------------------------------

/// Route family × induction. Declaration order is display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DeliveryCategory {
    SpontaneousNotInduced,
    SpontaneousInduced,
    OperativeNotInduced,
    OperativeInduced,
    CesareanNotInduced,
    CesareanInduced,
}

impl DeliveryCategory {
    pub const ALL: [DeliveryCategory; 6] = [
        DeliveryCategory::SpontaneousNotInduced,
        DeliveryCategory::SpontaneousInduced,
        DeliveryCategory::OperativeNotInduced,
        DeliveryCategory::OperativeInduced,
        DeliveryCategory::CesareanNotInduced,
        DeliveryCategory::CesareanInduced,
    ];

    /// `None` when either the route or the induction status is unknown.
    pub fn classify(route: DeliveryRoute, induction: Induction) -> Option<Self> {
        let induced = match induction {
            Induction::Induced => true,
            Induction::NotInduced => false,
            Induction::Unknown => return None,
        };
        let category = match (route.family()?, induced) {
            (RouteFamily::Spontaneous, false) => DeliveryCategory::SpontaneousNotInduced,
            (RouteFamily::Spontaneous, true) => DeliveryCategory::SpontaneousInduced,
            (RouteFamily::Operative, false) => DeliveryCategory::OperativeNotInduced,
            (RouteFamily::Operative, true) => DeliveryCategory::OperativeInduced,
            (RouteFamily::Cesarean, false) => DeliveryCategory::CesareanNotInduced,
            (RouteFamily::Cesarean, true) => DeliveryCategory::CesareanInduced,
        };
        Some(category)
    }

    /// Position in [`DeliveryCategory::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn family(self) -> RouteFamily {
        match self {
            DeliveryCategory::SpontaneousNotInduced | DeliveryCategory::SpontaneousInduced => {
                RouteFamily::Spontaneous
            }
            DeliveryCategory::OperativeNotInduced | DeliveryCategory::OperativeInduced => {
                RouteFamily::Operative
            }
            DeliveryCategory::CesareanNotInduced | DeliveryCategory::CesareanInduced => {
                RouteFamily::Cesarean
            }
        }
    }

    pub fn is_induced(self) -> bool {
        matches!(
            self,
            DeliveryCategory::SpontaneousInduced
                | DeliveryCategory::OperativeInduced
                | DeliveryCategory::CesareanInduced
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            DeliveryCategory::SpontaneousNotInduced => "Vaginal Non-Operative-No Induction",
            DeliveryCategory::SpontaneousInduced => "Vaginal Non-Operative-Induced",
            DeliveryCategory::OperativeNotInduced => "Vaginal Operative-No Induction",
            DeliveryCategory::OperativeInduced => "Vaginal Operative-Induced",
            DeliveryCategory::CesareanNotInduced => "C-Section-No Induction",
            DeliveryCategory::CesareanInduced => "C-Section-Induced",
        }
    }
}

impl fmt::Display for DeliveryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Human label for a recoded BMI category (`BMI_R`).
pub fn bmi_label(code: u8) -> &'static str {
    match code {
        1 => "Underweight",
        2 => "Normal",
        3 => "Overweight",
        4 => "Obesity I",
        5 => "Obesity II",
        6 => "Extreme Obesity III",
        9 => "Unknown",
        _ => "Invalid",
    }
}

pub const BMI_CODES: [u8; 7] = [1, 2, 3, 4, 5, 6, 9];

/// Human label for mother's education (`MEDUC`).
pub fn education_label(code: u8) -> &'static str {
    match code {
        1 => "8th grade or less",
        2 => "9th-12th grade, no diploma",
        3 => "High school / GED",
        4 => "Some college",
        5 => "Associate degree",
        6 => "Bachelor's degree",
        7 => "Master's degree",
        8 => "Doctorate / professional",
        9 => "Unknown",
        _ => "Invalid",
    }
}

pub const EDUCATION_CODES: [u8; 9] = [1, 2, 3, 4, 5, 6, 7, 8, 9];

// ---------------------------------------------------------------------------
// BirthRecord – one row of the extract
// ---------------------------------------------------------------------------

/// One birth event. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BirthRecord {
    pub mother_age: Option<u8>,
    pub education: Option<u8>,
    pub bmi_category: Option<u8>,
    pub gestation_weeks: Option<u8>,
    pub delivery_route: Option<DeliveryRoute>,
    pub induction: Option<Induction>,
    pub birth_order: Option<u8>,
    pub prenatal_care_month: Option<u8>,
    pub birthweight: Option<u16>,
}

impl BirthRecord {
    /// Store a decoded cell. Values out of range for the field become `None`.
    pub fn assign(&mut self, field: Field, value: &FieldValue) {
        let small = || value.as_i64().and_then(|i| u8::try_from(i).ok());
        match field {
            Field::MotherAge => self.mother_age = small(),
            Field::Education => self.education = small(),
            Field::BmiCategory => self.bmi_category = small(),
            Field::GestationWeeks => self.gestation_weeks = small(),
            Field::DeliveryRoute => {
                self.delivery_route = value.as_i64().and_then(DeliveryRoute::from_code)
            }
            Field::Induction => self.induction = value.as_str().and_then(Induction::from_flag),
            Field::BirthOrder => self.birth_order = small(),
            Field::PrenatalCareMonth => self.prenatal_care_month = small(),
            Field::Birthweight => {
                self.birthweight = value.as_i64().and_then(|i| u16::try_from(i).ok())
            }
        }
    }

    pub fn get(&self, field: Field) -> FieldValue {
        let int = |v: Option<i64>| v.map(FieldValue::Integer).unwrap_or(FieldValue::Null);
        match field {
            Field::MotherAge => int(self.mother_age.map(i64::from)),
            Field::Education => int(self.education.map(i64::from)),
            Field::BmiCategory => int(self.bmi_category.map(i64::from)),
            Field::GestationWeeks => int(self.gestation_weeks.map(i64::from)),
            Field::DeliveryRoute => int(self.delivery_route.map(DeliveryRoute::code)),
            Field::Induction => self
                .induction
                .map(|i| FieldValue::Text(i.flag().to_string()))
                .unwrap_or(FieldValue::Null),
            Field::BirthOrder => int(self.birth_order.map(i64::from)),
            Field::PrenatalCareMonth => int(self.prenatal_care_month.map(i64::from)),
            Field::Birthweight => int(self.birthweight.map(i64::from)),
        }
    }

    /// Derived delivery category; `None` if route or induction is unknown or missing.
    pub fn delivery_category(&self) -> Option<DeliveryCategory> {
        DeliveryCategory::classify(self.delivery_route?, self.induction?)
    }
}

// ---------------------------------------------------------------------------
// NatalityDataset – the complete loaded extract
// ---------------------------------------------------------------------------

/// Counters gathered while loading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Number of input rows seen (blank lines excluded).
    pub rows: usize,
    /// Per field: rows in which the field decoded to `None`.
    pub nulls: BTreeMap<Field, usize>,
}

impl LoadStats {
    pub fn observe(&mut self, record: &BirthRecord, fields: impl IntoIterator<Item = Field>) {
        self.rows += 1;
        for field in fields {
            if record.get(field).is_null() {
                *self.nulls.entry(field).or_default() += 1;
            }
        }
    }

    pub fn null_count(&self, field: Field) -> usize {
        self.nulls.get(&field).copied().unwrap_or(0)
    }
}

/// The full parsed dataset.
#[derive(Debug, Clone, Default)]
pub struct NatalityDataset {
    pub records: Vec<BirthRecord>,
    pub stats: LoadStats,
}

impl NatalityDataset {
    pub fn from_records(records: Vec<BirthRecord>) -> Self {
        let mut stats = LoadStats::default();
        for record in &records {
            stats.observe(record, Field::ALL);
        }
        NatalityDataset { records, stats }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operative_routes_share_a_family() {
        assert_eq!(
            DeliveryCategory::classify(DeliveryRoute::Forceps, Induction::Induced),
            Some(DeliveryCategory::OperativeInduced)
        );
        assert_eq!(
            DeliveryCategory::classify(DeliveryRoute::Vacuum, Induction::Induced),
            Some(DeliveryCategory::OperativeInduced)
        );
    }

    #[test]
    fn test_unknown_route_or_induction_has_no_category() {
        assert_eq!(
            DeliveryCategory::classify(DeliveryRoute::Unknown, Induction::NotInduced),
            None
        );
        assert_eq!(
            DeliveryCategory::classify(DeliveryRoute::Cesarean, Induction::Unknown),
            None
        );
        let record = BirthRecord {
            delivery_route: Some(DeliveryRoute::Cesarean),
            ..Default::default()
        };
        assert_eq!(record.delivery_category(), None);
    }

    #[test]
    fn test_category_index_matches_display_order() {
        for (i, cat) in DeliveryCategory::ALL.iter().enumerate() {
            assert_eq!(cat.index(), i);
        }
        assert!(DeliveryCategory::CesareanInduced.is_induced());
        assert_eq!(DeliveryCategory::CesareanInduced.family(), RouteFamily::Cesarean);
    }

    #[test]
    fn test_assign_out_of_range_becomes_none() {
        let mut record = BirthRecord::default();
        record.assign(Field::MotherAge, &FieldValue::Integer(300));
        record.assign(Field::DeliveryRoute, &FieldValue::Integer(7));
        record.assign(Field::Induction, &FieldValue::Text("X".into()));
        assert_eq!(record, BirthRecord::default());

        record.assign(Field::Birthweight, &FieldValue::Integer(3405));
        assert_eq!(record.get(Field::Birthweight), FieldValue::Integer(3405));
    }

    #[test]
    fn test_integer_parse_tolerates_padding_and_garbage() {
        assert_eq!(FieldKind::Integer.parse(" 07"), FieldValue::Integer(7));
        assert_eq!(FieldKind::Integer.parse("  "), FieldValue::Null);
        assert_eq!(FieldKind::Integer.parse("4x"), FieldValue::Null);
        assert_eq!(FieldKind::Text.parse("Y "), FieldValue::Text("Y".into()));
    }

    #[test]
    fn test_dataset_counts_nulls_per_field() {
        let ds = NatalityDataset::from_records(vec![
            BirthRecord {
                mother_age: Some(30),
                ..Default::default()
            },
            BirthRecord::default(),
        ]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.stats.null_count(Field::MotherAge), 1);
        assert_eq!(ds.stats.null_count(Field::Education), 2);
    }
}
