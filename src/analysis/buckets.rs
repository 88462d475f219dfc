use std::collections::{BTreeMap, BTreeSet};

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use super::tabulate::CategoryCounts;
use crate::data::filter::Interval;
use crate::data::model::{BMI_CODES, BirthRecord, EDUCATION_CODES, NatalityDataset};
use crate::error::FilterError;

/// Dimensions to slice the export by. Every combination of one age range,
/// one BMI code and one education code becomes a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketSpec {
    #[serde(default = "default_age_ranges")]
    pub age_ranges: Vec<Interval>,

    #[serde(default = "default_bmi")]
    pub bmi: Vec<u8>,

    #[serde(default = "default_education")]
    pub education: Vec<u8>,
}

fn default_age_ranges() -> Vec<Interval> {
    [(15, 19), (20, 24), (25, 29), (30, 34), (35, 38), (39, 42), (43, 50)]
        .into_iter()
        .map(|(min, max)| Interval { min, max })
        .collect()
}

fn default_bmi() -> Vec<u8> {
    BMI_CODES.iter().copied().filter(|c| *c != 9).collect()
}

fn default_education() -> Vec<u8> {
    EDUCATION_CODES.iter().copied().filter(|c| *c != 9).collect()
}

impl Default for BucketSpec {
    fn default() -> Self {
        BucketSpec {
            age_ranges: default_age_ranges(),
            bmi: default_bmi(),
            education: default_education(),
        }
    }
}

/// First value that appears twice in `values`.
fn first_repeat<T: Ord + Copy>(values: &[T]) -> Option<T> {
    let mut seen = BTreeSet::new();
    values.iter().copied().find(|v| !seen.insert(*v))
}

impl BucketSpec {
    pub fn bucket_count(&self) -> usize {
        self.age_ranges.len() * self.bmi.len() * self.education.len()
    }

    /// Rejects inverted ranges, unknown codes and repeated entries. A repeated
    /// entry would map two buckets onto one output cell.
    pub fn validate(&self) -> Result<(), FilterError> {
        if let Some(range) = self.age_ranges.iter().find(|r| r.min > r.max) {
            return Err(FilterError::Inverted {
                min: range.min,
                max: range.max,
            });
        }
        if let Some(&code) = self.bmi.iter().find(|c| !BMI_CODES.contains(*c)) {
            return Err(FilterError::UnknownCode { field: "BMI", code });
        }
        if let Some(&code) = self.education.iter().find(|c| !EDUCATION_CODES.contains(*c)) {
            return Err(FilterError::UnknownCode {
                field: "education",
                code,
            });
        }

        if let Some(range) = first_repeat(&self.age_ranges) {
            return Err(FilterError::Duplicate {
                field: "age range",
                value: range.to_string(),
            });
        }
        if let Some(code) = first_repeat(&self.bmi) {
            return Err(FilterError::Duplicate {
                field: "BMI code",
                value: code.to_string(),
            });
        }
        if let Some(code) = first_repeat(&self.education) {
            return Err(FilterError::Duplicate {
                field: "education code",
                value: code.to_string(),
            });
        }
        Ok(())
    }
}

/// week → category counts
pub type WeekCounts = BTreeMap<u8, CategoryCounts>;

type ByBmi = BTreeMap<u8, BTreeMap<u8, WeekCounts>>;

/// age range → BMI code → education code → week → category counts.
///
/// Age ranges are ordered numerically and only become `"min-max"` strings
/// when serialized; the other map keys are written as strings by JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketTable {
    tree: BTreeMap<Interval, ByBmi>,
    /// Records in a bucket whose route or induction is unknown.
    pub unclassified: u64,
}

impl Serialize for BucketTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.tree.len()))?;
        for (age, by_bmi) in &self.tree {
            map.serialize_entry(&age.to_string(), by_bmi)?;
        }
        map.end()
    }
}

impl BucketTable {
    pub fn get(&self, age: Interval, bmi: u8, education: u8) -> Option<&WeekCounts> {
        self.tree.get(&age)?.get(&bmi)?.get(&education)
    }

    /// Age ranges in output order.
    pub fn age_ranges(&self) -> impl Iterator<Item = Interval> + '_ {
        self.tree.keys().copied()
    }

    /// Sum of all counts in all buckets.
    pub fn total(&self) -> u64 {
        self.tree
            .values()
            .flat_map(BTreeMap::values)
            .flat_map(BTreeMap::values)
            .flat_map(BTreeMap::values)
            .map(CategoryCounts::total)
            .sum()
    }
}

enum Slot {
    Counted,
    Unclassified,
    Outside,
}

/// Slice the records over `weeks` by every bucket combination.
///
/// All buckets and weeks are present in the result, zero-filled when empty.
/// Overlapping age ranges count a record once per matching range. `spec` is
/// expected to have passed [`BucketSpec::validate`].
pub fn tabulate_buckets(
    dataset: &NatalityDataset,
    spec: &BucketSpec,
    weeks: Interval,
) -> BucketTable {
    let mut table = BucketTable::default();
    for age in &spec.age_ranges {
        let by_bmi = table.tree.entry(*age).or_default();
        for &bmi in &spec.bmi {
            let by_edu = by_bmi.entry(bmi).or_default();
            for &edu in &spec.education {
                by_edu.entry(edu).or_insert_with(|| {
                    weeks.iter().map(|w| (w, CategoryCounts::default())).collect()
                });
            }
        }
    }

    let mut counted = 0u64;
    for record in &dataset.records {
        match add_record(&mut table, spec, weeks, record) {
            Slot::Counted => counted += 1,
            Slot::Unclassified => table.unclassified += 1,
            Slot::Outside => {}
        }
    }

    log::info!(
        "Sliced {counted} births into {} buckets over weeks {weeks}",
        spec.bucket_count()
    );
    if table.unclassified > 0 {
        log::warn!(
            "{} bucketed records lack delivery route or induction data and were excluded",
            table.unclassified
        );
    }
    table
}

fn add_record(
    table: &mut BucketTable,
    spec: &BucketSpec,
    weeks: Interval,
    record: &BirthRecord,
) -> Slot {
    let (Some(week), Some(age), Some(bmi), Some(edu)) = (
        record.gestation_weeks,
        record.mother_age,
        record.bmi_category,
        record.education,
    ) else {
        return Slot::Outside;
    };
    let in_bucket = weeks.contains(week)
        && spec.bmi.contains(&bmi)
        && spec.education.contains(&edu)
        && spec.age_ranges.iter().any(|r| r.contains(age));
    if !in_bucket {
        return Slot::Outside;
    }
    let Some(category) = record.delivery_category() else {
        return Slot::Unclassified;
    };

    // one cell per distinct range, even if the spec repeats a range
    for (_, by_bmi) in table.tree.iter_mut().filter(|(r, _)| r.contains(age)) {
        let counts = by_bmi
            .get_mut(&bmi)
            .and_then(|m| m.get_mut(&edu))
            .and_then(|m| m.get_mut(&week));
        if let Some(counts) = counts {
            counts.add(category);
        }
    }
    Slot::Counted
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::analysis::tabulate::tabulate;
    use crate::data::filter::RecordFilter;
    use crate::data::model::{DeliveryCategory, DeliveryRoute, Induction};

    fn birth(age: u8, bmi: u8, edu: u8, week: u8, route: u8, induced: &str) -> BirthRecord {
        BirthRecord {
            mother_age: Some(age),
            bmi_category: Some(bmi),
            education: Some(edu),
            gestation_weeks: Some(week),
            delivery_route: DeliveryRoute::from_code(i64::from(route)),
            induction: Induction::from_flag(induced),
            ..Default::default()
        }
    }

    fn dataset() -> NatalityDataset {
        NatalityDataset::from_records(vec![
            birth(40, 2, 7, 39, 1, "N"),
            birth(41, 2, 7, 39, 4, "Y"),
            birth(22, 1, 3, 40, 1, "N"),
            birth(22, 1, 3, 40, 9, "N"),
            birth(40, 2, 8, 36, 2, "Y"),
            birth(60, 2, 7, 39, 1, "N"),
        ])
    }

    #[test]
    fn test_every_bucket_and_week_is_present() {
        let spec = BucketSpec::default();
        let weeks = Interval { min: 34, max: 42 };
        let table = tabulate_buckets(&dataset(), &spec, weeks);

        let empty = table
            .get(Interval { min: 15, max: 19 }, 6, 1)
            .expect("bucket exists");
        assert_eq!(empty.len(), weeks.len());
        assert!(empty.values().all(|c| c.total() == 0));
    }

    #[test]
    fn test_bucket_counts() {
        let spec = BucketSpec::default();
        let table = tabulate_buckets(&dataset(), &spec, Interval { min: 34, max: 42 });

        let older = table.get(Interval { min: 39, max: 42 }, 2, 7).unwrap();
        assert_eq!(older[&39].get(DeliveryCategory::SpontaneousNotInduced), 1);
        assert_eq!(older[&39].get(DeliveryCategory::CesareanInduced), 1);

        let younger = table.get(Interval { min: 20, max: 24 }, 1, 3).unwrap();
        assert_eq!(younger[&40].total(), 1);

        // age 60 falls in no range, route 9 has no category
        assert_eq!(table.total(), 4);
        assert_eq!(table.unclassified, 1);
    }

    #[test]
    fn test_bucket_matches_equivalent_filter() {
        let spec = BucketSpec::default();
        let weeks = Interval { min: 34, max: 42 };
        let ds = dataset();
        let buckets = tabulate_buckets(&ds, &spec, weeks);

        let filter = RecordFilter {
            age: Some(Interval { min: 39, max: 42 }),
            bmi: Some(BTreeSet::from([2])),
            education: Some(BTreeSet::from([7])),
            weeks,
        };
        let table = tabulate(&ds, &filter);
        let bucket = buckets.get(Interval { min: 39, max: 42 }, 2, 7).unwrap();
        for row in &table.rows {
            assert_eq!(bucket[&row.week], row.counts);
        }
    }

    #[test]
    fn test_validate_rejects_unknown_codes() {
        assert_eq!(BucketSpec::default().validate(), Ok(()));
        let spec = BucketSpec {
            education: vec![7, 12],
            ..BucketSpec::default()
        };
        assert_eq!(
            spec.validate(),
            Err(FilterError::UnknownCode {
                field: "education",
                code: 12
            })
        );
    }

    #[test]
    fn test_export_json_shape() {
        let spec = BucketSpec {
            age_ranges: vec![Interval { min: 39, max: 42 }],
            bmi: vec![2],
            education: vec![7],
        };
        let table = tabulate_buckets(&dataset(), &spec, Interval { min: 39, max: 39 });
        let json = serde_json::to_value(&table).unwrap();
        assert_eq!(json["39-42"]["2"]["7"]["39"]["C-Section-Induced"], 1);
        assert_eq!(json["39-42"]["2"]["7"]["39"]["Vaginal Operative-Induced"], 0);
    }

    #[test]
    fn test_validate_rejects_repeated_entries() {
        let older = Interval { min: 39, max: 42 };
        let spec = BucketSpec {
            age_ranges: vec![older, older],
            bmi: vec![2],
            education: vec![7],
        };
        assert_eq!(
            spec.validate(),
            Err(FilterError::Duplicate {
                field: "age range",
                value: "39-42".to_string()
            })
        );

        let spec = BucketSpec {
            bmi: vec![2, 3, 2],
            ..BucketSpec::default()
        };
        assert!(matches!(
            spec.validate(),
            Err(FilterError::Duplicate { field: "BMI code", .. })
        ));
    }

    #[test]
    fn test_repeated_age_range_counts_each_birth_once() {
        let older = Interval { min: 39, max: 42 };
        let spec = BucketSpec {
            age_ranges: vec![older, older],
            bmi: vec![2],
            education: vec![7],
        };
        let ds = NatalityDataset::from_records(vec![birth(40, 2, 7, 39, 1, "N")]);
        let table = tabulate_buckets(&ds, &spec, Interval { min: 39, max: 39 });

        assert_eq!(table.total(), 1);
        assert_eq!(table.get(older, 2, 7).unwrap()[&39].total(), 1);
    }

    #[test]
    fn test_age_ranges_are_ordered_numerically() {
        let spec = BucketSpec {
            age_ranges: vec![
                Interval { min: 43, max: 50 },
                Interval { min: 5, max: 9 },
                Interval { min: 10, max: 14 },
            ],
            bmi: vec![2],
            education: vec![7],
        };
        let table = tabulate_buckets(&dataset(), &spec, Interval { min: 39, max: 39 });

        let order: Vec<String> = table.age_ranges().map(|r| r.to_string()).collect();
        assert_eq!(order, ["5-9", "10-14", "43-50"]);

        let json = serde_json::to_string(&table).unwrap();
        let first = json.find("\"5-9\"").unwrap();
        let second = json.find("\"10-14\"").unwrap();
        let third = json.find("\"43-50\"").unwrap();
        assert!(first < second && second < third);
    }

    #[test]
    fn test_unknown_delivery_is_tallied_not_counted() {
        let ds = NatalityDataset::from_records(vec![
            birth(40, 2, 7, 39, 9, "N"),
            birth(40, 2, 7, 39, 1, "U"),
            birth(40, 2, 7, 30, 9, "N"),
        ]);
        let table = tabulate_buckets(&ds, &BucketSpec::default(), Interval { min: 34, max: 42 });

        assert_eq!(table.total(), 0);
        // week 30 is outside the range, so only two are tallied
        assert_eq!(table.unclassified, 2);
    }
}
