use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, ArrayRef, Int32Array, Int64Array, LargeStringArray, StringArray};
use arrow::datatypes::{DataType, Field as ArrowField, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use super::layout::Layout;
use super::model::{BirthRecord, Field, FieldKind, FieldValue, LoadStats, NatalityDataset};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Supported on-disk representations of a natality extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    FixedWidth,
    Csv,
    Parquet,
}

impl SourceFormat {
    /// Dispatch by extension; anything unrecognised is treated as fixed-width
    /// (the public-use files ship as `.txt` or with no extension at all).
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match ext.as_str() {
            "parquet" | "pq" => SourceFormat::Parquet,
            "csv" => SourceFormat::Csv,
            _ => SourceFormat::FixedWidth,
        }
    }
}

/// Load a natality dataset from a file. `layout` only applies to fixed-width input.
pub fn load_file(path: &Path, layout: &Layout) -> Result<NatalityDataset> {
    let format = SourceFormat::from_path(path);
    log::info!("Loading {} as {format:?}", path.display());

    let dataset = match format {
        SourceFormat::FixedWidth => load_fixed_width(path, layout),
        SourceFormat::Csv => load_csv(path),
        SourceFormat::Parquet => load_parquet(path),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    log_load_stats(&dataset);
    Ok(dataset)
}

/// Write a dataset as a CSV or Parquet extract, chosen by the output extension.
pub fn save_file(dataset: &NatalityDataset, path: &Path) -> Result<()> {
    let written = match SourceFormat::from_path(path) {
        SourceFormat::Parquet => save_parquet(dataset, path),
        SourceFormat::Csv => save_csv(dataset, path),
        SourceFormat::FixedWidth => bail!(
            "Unsupported output extension for {}: use .parquet or .csv",
            path.display()
        ),
    };
    written.with_context(|| format!("writing {}", path.display()))?;

    log::info!("Wrote {} records to {}", dataset.len(), path.display());
    Ok(())
}

fn log_load_stats(dataset: &NatalityDataset) {
    let stats = &dataset.stats;
    log::info!("Loaded {} records", dataset.len());
    for (field, nulls) in &stats.nulls {
        log::debug!("{field}: {nulls} null values");
        if stats.rows > 0 && *nulls * 2 > stats.rows {
            log::warn!(
                "{field} is missing in {nulls} of {} rows; check the column layout",
                stats.rows
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Fixed-width loader
// ---------------------------------------------------------------------------

/// Fixed-width layout: one record per line, fields located purely by byte offset.
fn load_fixed_width(path: &Path, layout: &Layout) -> Result<NatalityDataset> {
    let file = File::open(path).context("opening fixed-width file")?;
    read_fixed_width(BufReader::new(file), layout)
}

/// Parse fixed-width records from any buffered reader.
///
/// Lines are handled as raw bytes so stray non-UTF-8 bytes outside the
/// decoded columns do not affect the result. Blank lines are skipped.
/// The layout is validated before the first read.
pub fn read_fixed_width<R: BufRead>(mut reader: R, layout: &Layout) -> Result<NatalityDataset> {
    layout.validate().context("invalid column layout")?;

    let mut records = Vec::new();
    let mut stats = LoadStats::default();
    let mut line = Vec::with_capacity(layout.record_width() + 2);

    loop {
        line.clear();
        let n = reader
            .read_until(b'\n', &mut line)
            .with_context(|| format!("reading line {}", stats.rows + 1))?;
        if n == 0 {
            break;
        }
        while matches!(line.last(), Some(b'\n' | b'\r')) {
            line.pop();
        }
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        let record = layout.decode(&line);
        stats.observe(&record, layout.field_names());
        records.push(record);
    }

    Ok(NatalityDataset { records, stats })
}

// ---------------------------------------------------------------------------
// CSV extract
// ---------------------------------------------------------------------------

/// CSV layout: header row of field names (see [`Field::name`]); empty cells are null.
/// Unknown columns are ignored, absent fields stay null.
fn load_csv(path: &Path) -> Result<NatalityDataset> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let columns: Vec<Option<Field>> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| Field::from_name(h.trim()))
        .collect();

    if !columns.iter().any(Option::is_some) {
        bail!("CSV header names none of the natality fields");
    }
    let present: Vec<Field> = columns.iter().flatten().copied().collect();

    let mut records = Vec::new();
    let mut stats = LoadStats::default();

    for (row_no, result) in reader.records().enumerate() {
        let row = result.with_context(|| format!("CSV row {row_no}"))?;
        let mut record = BirthRecord::default();
        for (value, column) in row.iter().zip(&columns) {
            if let Some(field) = column {
                record.assign(*field, &field.kind().parse(value));
            }
        }
        stats.observe(&record, present.iter().copied());
        records.push(record);
    }

    Ok(NatalityDataset { records, stats })
}

fn save_csv(dataset: &NatalityDataset, path: &Path) -> Result<()> {
    let file = File::create(path).context("creating CSV file")?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(file));
    writer
        .write_record(Field::ALL.iter().map(|f| f.name()))
        .context("writing CSV header")?;

    for record in &dataset.records {
        let row = Field::ALL.map(|field| match record.get(field) {
            FieldValue::Null => String::new(),
            value => value.to_string(),
        });
        writer.write_record(&row).context("writing CSV row")?;
    }
    writer.flush().context("flushing CSV file")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Parquet extract
// ---------------------------------------------------------------------------

fn arrow_type(kind: FieldKind) -> DataType {
    match kind {
        FieldKind::Integer => DataType::Int64,
        FieldKind::Text => DataType::Utf8,
    }
}

fn extract_schema() -> Arc<Schema> {
    Arc::new(Schema::new(
        Field::ALL
            .iter()
            .map(|f| ArrowField::new(f.name(), arrow_type(f.kind()), true))
            .collect::<Vec<_>>(),
    ))
}

/// Write one nullable column per field: Int64 for coded fields, Utf8 for flags.
fn save_parquet(dataset: &NatalityDataset, path: &Path) -> Result<()> {
    let schema = extract_schema();

    let columns: Vec<ArrayRef> = Field::ALL
        .iter()
        .map(|&field| -> ArrayRef {
            let values = dataset.records.iter().map(|r| r.get(field));
            match field.kind() {
                FieldKind::Integer => {
                    Arc::new(values.map(|v| v.as_i64()).collect::<Int64Array>())
                }
                FieldKind::Text => Arc::new(
                    values
                        .map(|v| v.as_str().map(str::to_string))
                        .collect::<StringArray>(),
                ),
            }
        })
        .collect();

    let batch =
        RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;
    if log::log_enabled!(log::Level::Debug) {
        let head = batch.slice(0, batch.num_rows().min(5));
        if let Ok(table) = pretty_format_batches(&[head]) {
            log::debug!("First rows written to {}:\n{table}", path.display());
        }
    }

    let file = File::create(path).context("creating parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating writer")?;
    writer.write(&batch).context("writing record batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

/// Load a Parquet extract. Columns are matched by field name; Int32/Int64 and
/// Utf8/LargeUtf8 are accepted, anything else is reported.
fn load_parquet(path: &Path) -> Result<NatalityDataset> {
    let file = File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut records = Vec::new();
    let mut stats = LoadStats::default();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        let columns: Vec<(Field, &ArrayRef)> = Field::ALL
            .iter()
            .filter_map(|&f| schema.index_of(f.name()).ok().map(|i| (f, batch.column(i))))
            .collect();
        if columns.is_empty() {
            bail!("Parquet file has none of the natality fields");
        }

        for row in 0..batch.num_rows() {
            let mut record = BirthRecord::default();
            for (field, col) in &columns {
                let value = extract_value(col, row)
                    .with_context(|| format!("Row {row}: failed to read '{field}'"))?;
                record.assign(*field, &value);
            }
            stats.observe(&record, columns.iter().map(|(f, _)| *f));
            records.push(record);
        }
    }

    Ok(NatalityDataset { records, stats })
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_value(col: &ArrayRef, row: usize) -> Result<FieldValue> {
    if col.is_null(row) {
        return Ok(FieldValue::Null);
    }
    let value = match col.data_type() {
        DataType::Int64 => {
            let arr = col
                .as_any()
                .downcast_ref::<Int64Array>()
                .context("expected Int64Array")?;
            FieldValue::Integer(arr.value(row))
        }
        DataType::Int32 => {
            let arr = col
                .as_any()
                .downcast_ref::<Int32Array>()
                .context("expected Int32Array")?;
            FieldValue::Integer(i64::from(arr.value(row)))
        }
        DataType::Utf8 => {
            let arr = col
                .as_any()
                .downcast_ref::<StringArray>()
                .context("expected StringArray")?;
            FieldValue::Text(arr.value(row).to_string())
        }
        DataType::LargeUtf8 => {
            let arr = col
                .as_any()
                .downcast_ref::<LargeStringArray>()
                .context("expected LargeStringArray")?;
            FieldValue::Text(arr.value(row).to_string())
        }
        other => bail!("unsupported column type {other:?}"),
    };
    Ok(value)
}
