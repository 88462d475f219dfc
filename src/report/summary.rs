use crate::analysis::WeeklyTable;
use crate::data::filter::RecordFilter;

/// Format an integer with thousands separators: `1234567` → `1,234,567`.
pub fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Weekly delivery statistics as printed to the console.
pub fn render_summary(table: &WeeklyTable, filter: &RecordFilter) -> String {
    let mut out = String::new();

    out.push_str(&filter.describe());
    out.push('\n');
    out.push_str(&format!(
        "\nTotal population ({}+ weeks): {}\n",
        table.weeks.min,
        thousands(table.population)
    ));
    if table.unclassified > 0 {
        out.push_str(&format!(
            "Excluded (unknown route or induction): {}\n",
            thousands(table.unclassified)
        ));
    }

    out.push_str("\nWeekly Delivery Statistics:\n");
    for row in &table.rows {
        out.push_str(&format!(
            "\nWeek {} (Births: {}, {:.1}% of population)\n",
            row.week,
            row.births(),
            table.week_percent(row)
        ));
        for (category, count) in row.counts.iter() {
            out.push_str(&format!(
                "  {}: {} ({:.1}% of population)\n",
                category.label(),
                count,
                table.percent(count)
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tabulate::tabulate_records;
    use crate::data::model::{BirthRecord, DeliveryRoute, Induction};

    #[test]
    fn test_thousands() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(1000), "1,000");
        assert_eq!(thousands(3_596_017), "3,596,017");
    }

    #[test]
    fn test_summary_lists_every_week_and_category() {
        let record = BirthRecord {
            mother_age: Some(40),
            bmi_category: Some(2),
            education: Some(7),
            gestation_weeks: Some(39),
            delivery_route: Some(DeliveryRoute::Cesarean),
            induction: Some(Induction::NotInduced),
            ..Default::default()
        };
        let filter = RecordFilter::default();
        let table = tabulate_records(&[record], &filter);
        let text = render_summary(&table, &filter);

        assert!(text.contains("Total population (34+ weeks): 1"));
        assert!(text.contains("Week 39 (Births: 1, 100.0% of population)"));
        assert!(text.contains("  C-Section-No Induction: 1 (100.0% of population)"));
        assert!(text.contains("Week 41 (Births: 0, 0.0% of population)"));
        assert_eq!(text.matches("Week ").count(), 9);
        assert_eq!(text.matches("% of population)").count(), 9 * 7);
    }
}
