use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::model::{BirthRecord, Field, FieldKind, FieldValue};
use crate::error::LayoutError;

// ---------------------------------------------------------------------------
// Column layout of a fixed-width extract
// ---------------------------------------------------------------------------

/// One column: 0-based, half-open byte range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub field: Field,
    pub start: usize,
    pub end: usize,
}

impl FieldSpec {
    pub const fn new(field: Field, start: usize, end: usize) -> Self {
        FieldSpec { field, start, end }
    }

    pub fn width(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn kind(&self) -> FieldKind {
        self.field.kind()
    }
}

/// Ordered list of columns to decode from each line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub fields: Vec<FieldSpec>,
}

/// Longest line a layout may address. Public-use natality records are well
/// under 2 KiB.
pub const MAX_LINE_WIDTH: usize = 64 * 1024;

/// Fields without which no delivery category can be computed.
const REQUIRED: [Field; 3] = [Field::GestationWeeks, Field::DeliveryRoute, Field::Induction];

impl Default for Layout {
    fn default() -> Self {
        Layout::natality_2023()
    }
}

impl Layout {
    /// US natality public-use file, 2023 record layout.
    pub fn natality_2023() -> Self {
        Layout {
            fields: vec![
                FieldSpec::new(Field::MotherAge, 74, 76),
                FieldSpec::new(Field::Education, 123, 124),
                FieldSpec::new(Field::BmiCategory, 286, 287),
                FieldSpec::new(Field::GestationWeeks, 489, 491),
                FieldSpec::new(Field::DeliveryRoute, 401, 402),
                FieldSpec::new(Field::Induction, 382, 383),
                FieldSpec::new(Field::BirthOrder, 178, 179),
                FieldSpec::new(Field::PrenatalCareMonth, 223, 225),
                FieldSpec::new(Field::Birthweight, 503, 507),
            ],
        }
    }

    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.fields.is_empty() {
            return Err(LayoutError::Empty);
        }
        let mut seen = BTreeSet::new();
        for spec in &self.fields {
            if spec.start >= spec.end {
                return Err(LayoutError::EmptyRange {
                    field: spec.field.name(),
                    start: spec.start,
                    end: spec.end,
                });
            }
            if spec.end > MAX_LINE_WIDTH {
                return Err(LayoutError::TooWide {
                    field: spec.field.name(),
                    end: spec.end,
                    max: MAX_LINE_WIDTH,
                });
            }
            if !seen.insert(spec.field) {
                return Err(LayoutError::Duplicate(spec.field.name()));
            }
        }
        if let Some(missing) = REQUIRED.iter().find(|f| !seen.contains(*f)) {
            return Err(LayoutError::MissingField(missing.name()));
        }
        Ok(())
    }

    pub fn field_names(&self) -> impl Iterator<Item = Field> + '_ {
        self.fields.iter().map(|s| s.field)
    }

    /// Shortest line that holds every field.
    pub fn record_width(&self) -> usize {
        self.fields.iter().map(|s| s.end).max().unwrap_or(0)
    }

    /// Decode one line. Truncated, blank or unparseable fields become `None`.
    pub fn decode(&self, line: &[u8]) -> BirthRecord {
        let mut record = BirthRecord::default();
        for spec in &self.fields {
            let value = line
                .get(spec.start..spec.end)
                .and_then(|bytes| std::str::from_utf8(bytes).ok())
                .map(|raw| spec.kind().parse(raw))
                .unwrap_or(FieldValue::Null);
            record.assign(spec.field, &value);
        }
        record
    }

    /// Render a record as one fixed-width line (without terminator).
    /// Integers are zero-padded, text is left-aligned, nulls are blank.
    pub fn encode(&self, record: &BirthRecord) -> String {
        let mut line = vec![b' '; self.record_width()];
        for spec in &self.fields {
            let width = spec.width();
            let text = match record.get(spec.field) {
                FieldValue::Integer(i) => format!("{i:0width$}"),
                FieldValue::Text(s) => format!("{s:<width$}"),
                FieldValue::Null => continue,
            };
            let bytes = text.as_bytes();
            let n = bytes.len().min(width);
            line[spec.start..spec.start + n].copy_from_slice(&bytes[..n]);
        }
        String::from_utf8_lossy(&line).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{DeliveryRoute, Induction};

    fn line_with(fields: &[(usize, &str)], width: usize) -> Vec<u8> {
        let mut line = vec![b' '; width];
        for (start, text) in fields {
            line[*start..*start + text.len()].copy_from_slice(text.as_bytes());
        }
        line
    }

    #[test]
    fn test_default_layout_is_valid() {
        let layout = Layout::natality_2023();
        assert_eq!(layout.validate(), Ok(()));
        assert_eq!(layout.record_width(), 507);
    }

    #[test]
    fn test_decode_reads_known_offsets() {
        let layout = Layout::natality_2023();
        let line = line_with(
            &[(74, "40"), (123, "7"), (286, "2"), (489, "39"), (401, "4"), (382, "Y")],
            600,
        );
        let record = layout.decode(&line);
        assert_eq!(record.mother_age, Some(40));
        assert_eq!(record.education, Some(7));
        assert_eq!(record.bmi_category, Some(2));
        assert_eq!(record.gestation_weeks, Some(39));
        assert_eq!(record.delivery_route, Some(DeliveryRoute::Cesarean));
        assert_eq!(record.induction, Some(Induction::Induced));
        assert_eq!(record.birthweight, None);
    }

    #[test]
    fn test_truncated_line_yields_nulls() {
        let layout = Layout::natality_2023();
        let line = line_with(&[(74, "33")], 200);
        let record = layout.decode(&line);
        assert_eq!(record.mother_age, Some(33));
        assert_eq!(record.gestation_weeks, None);
        assert_eq!(record.induction, None);
    }

    #[test]
    fn test_encode_then_decode_preserves_record() {
        let layout = Layout::natality_2023();
        let record = BirthRecord {
            mother_age: Some(41),
            education: Some(8),
            bmi_category: Some(2),
            gestation_weeks: Some(38),
            delivery_route: Some(DeliveryRoute::Vacuum),
            induction: Some(Induction::NotInduced),
            birth_order: None,
            prenatal_care_month: Some(3),
            birthweight: Some(3120),
        };
        let line = layout.encode(&record);
        assert_eq!(line.len(), layout.record_width());
        assert_eq!(&line[223..225], "03");
        assert_eq!(layout.decode(line.as_bytes()), record);
    }

    #[test]
    fn test_validate_rejects_bad_layouts() {
        assert_eq!(Layout { fields: vec![] }.validate(), Err(LayoutError::Empty));

        let mut layout = Layout::natality_2023();
        layout.fields[0].end = layout.fields[0].start;
        assert!(matches!(layout.validate(), Err(LayoutError::EmptyRange { .. })));

        let mut layout = Layout::natality_2023();
        layout.fields[0].end = i64::MAX as usize;
        assert_eq!(
            layout.validate(),
            Err(LayoutError::TooWide {
                field: "mother_age",
                end: i64::MAX as usize,
                max: MAX_LINE_WIDTH,
            })
        );

        let mut layout = Layout::natality_2023();
        layout.fields.push(FieldSpec::new(Field::MotherAge, 0, 2));
        assert_eq!(layout.validate(), Err(LayoutError::Duplicate("mother_age")));

        let mut layout = Layout::natality_2023();
        layout.fields.retain(|s| s.field != Field::Induction);
        assert_eq!(layout.validate(), Err(LayoutError::MissingField("induction")));
    }
}
