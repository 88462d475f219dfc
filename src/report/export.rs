use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::analysis::{CategoryCounts, WeeklyTable};
use crate::data::filter::RecordFilter;

/// JSON shape of a weekly table, with percentages precomputed.
#[derive(Debug, Serialize)]
pub struct WeeklyExport<'a> {
    pub filter: &'a RecordFilter,
    pub population: u64,
    pub unclassified: u64,
    pub weeks: Vec<WeekExport>,
}

#[derive(Debug, Serialize)]
pub struct WeekExport {
    pub week: u8,
    pub births: u64,
    pub percent_of_population: f64,
    pub counts: CategoryCounts,
    pub percentages: BTreeMap<&'static str, f64>,
}

impl<'a> WeeklyExport<'a> {
    pub fn new(table: &WeeklyTable, filter: &'a RecordFilter) -> Self {
        let weeks = table
            .rows
            .iter()
            .map(|row| WeekExport {
                week: row.week,
                births: row.births(),
                percent_of_population: table.week_percent(row),
                counts: row.counts,
                percentages: row
                    .counts
                    .iter()
                    .map(|(category, count)| (category.label(), table.percent(count)))
                    .collect(),
            })
            .collect();

        WeeklyExport {
            filter,
            population: table.population,
            unclassified: table.unclassified,
            weeks,
        }
    }
}

/// Pretty-print any serializable value to `path`.
pub fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).context("serializing JSON")?;
    writer.write_all(b"\n")?;
    writer.flush().with_context(|| format!("writing {}", path.display()))?;
    log::info!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tabulate::tabulate_records;
    use crate::analysis::{BucketSpec, tabulate_buckets};
    use crate::data::filter::Interval;
    use crate::data::model::{BirthRecord, DeliveryRoute, Induction, NatalityDataset};

    fn records() -> Vec<BirthRecord> {
        vec![
            BirthRecord {
                mother_age: Some(40),
                bmi_category: Some(2),
                education: Some(8),
                gestation_weeks: Some(40),
                delivery_route: Some(DeliveryRoute::Spontaneous),
                induction: Some(Induction::Induced),
                ..Default::default()
            },
            BirthRecord {
                mother_age: Some(39),
                bmi_category: Some(2),
                education: Some(7),
                gestation_weeks: Some(40),
                delivery_route: Some(DeliveryRoute::Cesarean),
                induction: Some(Induction::NotInduced),
                ..Default::default()
            },
        ]
    }

    #[test]
    fn test_weekly_export_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weekly.json");
        let filter = RecordFilter::default();
        let table = tabulate_records(&records(), &filter);

        write_json(&WeeklyExport::new(&table, &filter), &path).unwrap();
        let doc: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();

        assert_eq!(doc["population"], 2);
        assert_eq!(doc["filter"]["age"]["min"], 39);
        assert_eq!(doc["weeks"].as_array().unwrap().len(), 9);
        let week40 = &doc["weeks"][6];
        assert_eq!(week40["week"], 40);
        assert_eq!(week40["births"], 2);
        assert_eq!(week40["percent_of_population"], 100.0);
        assert_eq!(week40["counts"]["Vaginal Non-Operative-Induced"], 1);
        assert_eq!(week40["percentages"]["C-Section-No Induction"], 50.0);
    }

    #[test]
    fn test_bucket_export_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("buckets.json");
        let ds = NatalityDataset::from_records(records());
        let table = tabulate_buckets(&ds, &BucketSpec::default(), Interval { min: 34, max: 42 });

        write_json(&table, &path).unwrap();
        let doc: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(doc["39-42"]["2"]["8"]["40"]["Vaginal Non-Operative-Induced"], 1);
        assert_eq!(doc["39-42"]["2"]["7"]["40"]["C-Section-No Induction"], 1);
        assert_eq!(doc["15-19"]["1"]["1"]["34"]["C-Section-Induced"], 0);
    }

    #[test]
    fn test_write_json_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.json");
        assert!(write_json(&1u8, &path).is_err());
    }
}
