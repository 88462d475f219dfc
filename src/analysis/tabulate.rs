use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::data::filter::{Interval, RecordFilter};
use crate::data::model::{BirthRecord, DeliveryCategory, NatalityDataset};

// ---------------------------------------------------------------------------
// CategoryCounts – six counters in display order
// ---------------------------------------------------------------------------

/// Record counts per [`DeliveryCategory`]. Serializes as `label → count`
/// in display order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryCounts([u64; 6]);

impl CategoryCounts {
    pub fn get(&self, category: DeliveryCategory) -> u64 {
        self.0[category.index()]
    }

    pub fn add(&mut self, category: DeliveryCategory) {
        self.0[category.index()] += 1;
    }

    pub fn total(&self) -> u64 {
        self.0.iter().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DeliveryCategory, u64)> + '_ {
        DeliveryCategory::ALL.into_iter().map(|c| (c, self.get(c)))
    }
}

impl Serialize for CategoryCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(DeliveryCategory::ALL.len()))?;
        for (category, count) in self.iter() {
            map.serialize_entry(category.label(), &count)?;
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
// WeeklyTable – per-week delivery counts for one filtered population
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekRow {
    pub week: u8,
    pub counts: CategoryCounts,
}

impl WeekRow {
    /// Births in this week; always the sum of the six category counts.
    pub fn births(&self) -> u64 {
        self.counts.total()
    }
}

/// Delivery-category counts for every week of the filter's range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklyTable {
    pub weeks: Interval,
    /// Records that passed the filter and have a delivery category.
    pub population: u64,
    /// Records that passed the filter but lack route or induction data.
    pub unclassified: u64,
    /// One row per week in `weeks`, ascending, including empty weeks.
    pub rows: Vec<WeekRow>,
}

impl WeeklyTable {
    pub fn empty(weeks: Interval) -> Self {
        WeeklyTable {
            weeks,
            population: 0,
            unclassified: 0,
            rows: weeks
                .iter()
                .map(|week| WeekRow {
                    week,
                    counts: CategoryCounts::default(),
                })
                .collect(),
        }
    }

    /// Count one record. Records outside the week range or without a
    /// delivery category are not added to the population.
    pub fn add(&mut self, record: &BirthRecord) {
        let Some(week) = record.gestation_weeks.filter(|w| self.weeks.contains(*w)) else {
            return;
        };
        let Some(category) = record.delivery_category() else {
            self.unclassified += 1;
            return;
        };
        let slot = usize::from(week - self.weeks.min);
        self.rows[slot].counts.add(category);
        self.population += 1;
    }

    pub fn row(&self, week: u8) -> Option<&WeekRow> {
        if !self.weeks.contains(week) {
            return None;
        }
        self.rows.get(usize::from(week - self.weeks.min))
    }

    /// `count` as a percentage of the population; 0 when the population is empty.
    pub fn percent(&self, count: u64) -> f64 {
        if self.population == 0 {
            0.0
        } else {
            count as f64 / self.population as f64 * 100.0
        }
    }

    pub fn week_percent(&self, row: &WeekRow) -> f64 {
        self.percent(row.births())
    }

    pub fn category_percent(&self, row: &WeekRow, category: DeliveryCategory) -> f64 {
        self.percent(row.counts.get(category))
    }

    /// Tallest week bar, in percent of population.
    pub fn max_week_percent(&self) -> f64 {
        self.rows
            .iter()
            .map(|r| self.week_percent(r))
            .fold(0.0, f64::max)
    }
}

/// Tabulate every record that passes `filter`.
pub fn tabulate(dataset: &NatalityDataset, filter: &RecordFilter) -> WeeklyTable {
    tabulate_records(&dataset.records, filter)
}

pub fn tabulate_records<'a, I>(records: I, filter: &RecordFilter) -> WeeklyTable
where
    I: IntoIterator<Item = &'a BirthRecord>,
{
    let mut table = WeeklyTable::empty(filter.weeks);
    for record in records.into_iter().filter(|r| filter.matches(r)) {
        table.add(record);
    }

    log::info!(
        "Tabulated {} births over weeks {} ({})",
        table.population,
        table.weeks,
        filter.describe()
    );
    if table.unclassified > 0 {
        log::warn!(
            "{} filtered records lack delivery route or induction data and were excluded",
            table.unclassified
        );
    }
    table
}
