use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::model::{BMI_CODES, BirthRecord, EDUCATION_CODES, bmi_label, education_label};
use crate::error::FilterError;

// ---------------------------------------------------------------------------
// Interval – inclusive integer range used for ages and weeks
// ---------------------------------------------------------------------------

/// Inclusive `min..=max` range, written `MIN-MAX` on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub min: u8,
    pub max: u8,
}

impl Interval {
    pub fn new(min: u8, max: u8) -> Result<Self, FilterError> {
        if min > max {
            return Err(FilterError::Inverted { min, max });
        }
        Ok(Interval { min, max })
    }

    pub fn contains(&self, value: u8) -> bool {
        (self.min..=self.max).contains(&value)
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> {
        self.min..=self.max
    }

    pub fn len(&self) -> usize {
        if self.min > self.max {
            0
        } else {
            usize::from(self.max - self.min) + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

impl FromStr for Interval {
    type Err = FilterError;

    /// Accepts `39-42` or a single value `39`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || FilterError::Malformed(s.to_string());
        let parse = |t: &str| t.trim().parse::<u8>().map_err(|_| malformed());
        match s.split_once('-') {
            Some((lo, hi)) => Interval::new(parse(lo)?, parse(hi)?),
            None => {
                let v = parse(s)?;
                Interval::new(v, v)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// RecordFilter – categorical predicates over birth records
// ---------------------------------------------------------------------------

/// Demographic and clinical predicates.
///
/// A code set that is `None` places no constraint on its field. `Some` of an
/// empty set selects nothing. A record whose value is missing fails every
/// predicate that is active for that field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<Interval>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bmi: Option<BTreeSet<u8>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub education: Option<BTreeSet<u8>>,

    #[serde(default = "default_weeks")]
    pub weeks: Interval,
}

fn default_weeks() -> Interval {
    Interval { min: 34, max: 42 }
}

impl Default for RecordFilter {
    /// Mothers aged 39-42 with normal BMI and a master's degree or higher,
    /// delivering at 34-42 weeks.
    fn default() -> Self {
        RecordFilter {
            age: Some(Interval { min: 39, max: 42 }),
            bmi: Some(BTreeSet::from([2])),
            education: Some(BTreeSet::from([7, 8])),
            weeks: default_weeks(),
        }
    }
}

fn code_matches(codes: &Option<BTreeSet<u8>>, value: Option<u8>) -> bool {
    match codes {
        None => true,
        Some(set) => value.is_some_and(|v| set.contains(&v)),
    }
}

impl RecordFilter {
    /// A filter with no demographic constraint over the given weeks.
    pub fn weeks_only(weeks: Interval) -> Self {
        RecordFilter {
            age: None,
            bmi: None,
            education: None,
            weeks,
        }
    }

    pub fn validate(&self) -> Result<(), FilterError> {
        for range in self.age.iter().chain(std::iter::once(&self.weeks)) {
            if range.min > range.max {
                return Err(FilterError::Inverted {
                    min: range.min,
                    max: range.max,
                });
            }
        }
        if let Some(code) = self.bmi.iter().flatten().find(|c| !BMI_CODES.contains(*c)) {
            return Err(FilterError::UnknownCode {
                field: "BMI",
                code: *code,
            });
        }
        if let Some(code) = self
            .education
            .iter()
            .flatten()
            .find(|c| !EDUCATION_CODES.contains(*c))
        {
            return Err(FilterError::UnknownCode {
                field: "education",
                code: *code,
            });
        }
        Ok(())
    }

    pub fn matches(&self, record: &BirthRecord) -> bool {
        let week_ok = record
            .gestation_weeks
            .is_some_and(|w| self.weeks.contains(w));
        let age_ok = match &self.age {
            None => true,
            Some(range) => record.mother_age.is_some_and(|a| range.contains(a)),
        };
        week_ok
            && age_ok
            && code_matches(&self.bmi, record.bmi_category)
            && code_matches(&self.education, record.education)
    }

    /// Short description used in chart titles and console output,
    /// e.g. `Mothers 39-42, BMI Normal, Master's degree / Doctorate / professional`.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        match &self.age {
            Some(range) => parts.push(format!("Mothers {range}")),
            None => parts.push("All mothers".to_string()),
        }
        if let Some(codes) = &self.bmi {
            let labels: Vec<&str> = codes.iter().map(|c| bmi_label(*c)).collect();
            parts.push(format!("BMI {}", labels.join(" / ")));
        }
        if let Some(codes) = &self.education {
            let labels: Vec<&str> = codes.iter().map(|c| education_label(*c)).collect();
            parts.push(labels.join(" / "));
        }
        parts.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(age: u8, bmi: u8, edu: u8, week: u8) -> BirthRecord {
        BirthRecord {
            mother_age: Some(age),
            bmi_category: Some(bmi),
            education: Some(edu),
            gestation_weeks: Some(week),
            ..Default::default()
        }
    }

    #[test]
    fn test_interval_parsing() {
        assert_eq!("39-42".parse::<Interval>(), Ok(Interval { min: 39, max: 42 }));
        assert_eq!(" 40 ".parse::<Interval>(), Ok(Interval { min: 40, max: 40 }));
        assert_eq!(
            "42-39".parse::<Interval>(),
            Err(FilterError::Inverted { min: 42, max: 39 })
        );
        assert!(matches!("a-b".parse::<Interval>(), Err(FilterError::Malformed(_))));
        assert_eq!(Interval { min: 34, max: 42 }.len(), 9);
        assert_eq!(Interval { min: 34, max: 42 }.to_string(), "34-42");
    }

    #[test]
    fn test_default_filter_bounds_are_inclusive() {
        let f = RecordFilter::default();
        assert!(f.matches(&record(39, 2, 7, 34)));
        assert!(f.matches(&record(42, 2, 8, 42)));
        assert!(!f.matches(&record(38, 2, 7, 39)));
        assert!(!f.matches(&record(43, 2, 7, 39)));
        assert!(!f.matches(&record(40, 3, 7, 39)));
        assert!(!f.matches(&record(40, 2, 6, 39)));
        assert!(!f.matches(&record(40, 2, 7, 33)));
        assert!(!f.matches(&record(40, 2, 7, 43)));
    }

    #[test]
    fn test_missing_values_fail_active_predicates_only() {
        let f = RecordFilter::default();
        let mut r = record(40, 2, 7, 39);
        r.bmi_category = None;
        assert!(!f.matches(&r));

        let open = RecordFilter::weeks_only(Interval { min: 34, max: 42 });
        assert!(open.matches(&r));
        r.gestation_weeks = None;
        assert!(!open.matches(&r));
    }

    #[test]
    fn test_empty_selection_selects_nothing() {
        let f = RecordFilter {
            bmi: Some(BTreeSet::new()),
            ..RecordFilter::weeks_only(Interval { min: 20, max: 45 })
        };
        assert!(!f.matches(&record(30, 2, 5, 39)));
    }

    #[test]
    fn test_validate_reports_unknown_codes() {
        let mut f = RecordFilter::default();
        assert_eq!(f.validate(), Ok(()));
        f.bmi = Some(BTreeSet::from([7]));
        assert_eq!(
            f.validate(),
            Err(FilterError::UnknownCode { field: "BMI", code: 7 })
        );
        f.bmi = None;
        f.weeks = Interval { min: 42, max: 34 };
        assert!(matches!(f.validate(), Err(FilterError::Inverted { .. })));
    }

    #[test]
    fn test_describe_default_filter() {
        assert_eq!(
            RecordFilter::default().describe(),
            "Mothers 39-42, BMI Normal, Master's degree / Doctorate / professional"
        );
    }
}
