use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Int64Type};
use arrow::record_batch::RecordBatch;
use chrono::{Datelike, NaiveDate};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use super::error::{IssueKind, LoadError, ValidationIssue};
use super::model::{BikeDataset, DayOfWeek, DayType, Record, RushHour, Season, Weather};

/// Columns every input file must provide. Anything else is ignored.
pub const REQUIRED_COLUMNS: [&str; 10] = [
    "season",
    "hr",
    "weathersit",
    "holiday",
    "workingday",
    "casual",
    "registered",
    "cnt",
    "weekday",
    "dteday",
];

/// Issues logged one by one before switching to a summary line.
const LOGGED_ISSUES: usize = 10;

/// Outcome of a successful load: the dataset plus every row-level problem.
#[derive(Debug, Clone)]
pub struct Loaded {
    pub dataset: BikeDataset,
    pub issues: Vec<ValidationIssue>,
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a bike-sharing dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, one observation per line
/// * `.json`    – `[{ "dteday": "2011-01-01", "hr": 0, ... }, ...]`
/// * `.parquet` – integer columns of any width, `dteday` as text or Date32
///
/// A missing required column is fatal ([`LoadError::MissingColumns`]).
/// Bad rows are dropped and reported in [`Loaded::issues`].
pub fn load_file(path: &Path) -> Result<Loaded> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let loaded = match ext.as_str() {
        "csv" => load_csv(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => Err(LoadError::UnsupportedExtension(other.to_string()).into()),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    log::info!(
        "Loaded {} records from {} ({} rejected)",
        loaded.dataset.len(),
        path.display(),
        loaded.issues.iter().filter(|i| i.is_rejection()).count()
    );
    Ok(loaded)
}

/// Names from [`REQUIRED_COLUMNS`] absent from `present`, in declaration order.
pub fn missing_columns<'a, I>(present: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let present: BTreeSet<&str> = present.into_iter().map(str::trim).collect();
    REQUIRED_COLUMNS
        .iter()
        .filter(|c| !present.contains(*c))
        .map(|c| c.to_string())
        .collect()
}

fn require_columns<'a, I>(present: I) -> Result<(), LoadError>
where
    I: IntoIterator<Item = &'a str>,
{
    let missing = missing_columns(present);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(LoadError::MissingColumns(missing))
    }
}

// ---------------------------------------------------------------------------
// Raw rows and validation
// ---------------------------------------------------------------------------

/// One row exactly as stored in the file, before recoding.
#[derive(Debug, Clone, Deserialize)]
struct RawRecord {
    dteday: String,
    hr: i64,
    season: i64,
    weathersit: i64,
    holiday: i64,
    workingday: i64,
    weekday: i64,
    casual: i64,
    registered: i64,
    cnt: i64,
}

/// Collects validated records and the issues found along the way.
#[derive(Default)]
struct RecordSink {
    records: Vec<Record>,
    issues: Vec<ValidationIssue>,
}

impl RecordSink {
    fn push(&mut self, row: usize, raw: RawRecord) {
        match validate(&raw) {
            Ok((record, warning)) => {
                if let Some(kind) = warning {
                    self.issues.push(ValidationIssue { row, kind });
                }
                self.records.push(record);
            }
            Err(kind) => self.issues.push(ValidationIssue { row, kind }),
        }
    }

    fn reject(&mut self, row: usize, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            row,
            kind: IssueKind::Malformed(message.into()),
        });
    }

    fn finish(self) -> Loaded {
        for issue in self.issues.iter().take(LOGGED_ISSUES) {
            log::warn!("{issue}");
        }
        if self.issues.len() > LOGGED_ISSUES {
            log::warn!(
                "... and {} more validation issue(s)",
                self.issues.len() - LOGGED_ISSUES
            );
        }
        Loaded {
            dataset: BikeDataset::from_records(self.records),
            issues: self.issues,
        }
    }
}

fn flag(column: &'static str, value: i64) -> Result<bool, IssueKind> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(IssueKind::InvalidFlag { column, value }),
    }
}

fn count(column: &'static str, value: i64) -> Result<u32, IssueKind> {
    if value < 0 {
        return Err(IssueKind::NegativeCount { column, value });
    }
    u32::try_from(value).map_err(|_| IssueKind::Malformed(format!("{column} {value} is too large")))
}

/// Recode and check one raw row. The optional second value is a
/// non-fatal warning for a row that is kept.
fn validate(raw: &RawRecord) -> Result<(Record, Option<IssueKind>), IssueKind> {
    let date = NaiveDate::parse_from_str(raw.dteday.trim(), "%Y-%m-%d")
        .map_err(|_| IssueKind::InvalidDate(raw.dteday.clone()))?;

    let hour = u8::try_from(raw.hr)
        .ok()
        .filter(|h| *h <= 23)
        .ok_or(IssueKind::HourOutOfRange(raw.hr))?;
    let season = Season::from_code(raw.season).ok_or(IssueKind::UnknownSeason(raw.season))?;
    let weather =
        Weather::from_code(raw.weathersit).ok_or(IssueKind::UnknownWeather(raw.weathersit))?;
    let weekday =
        DayOfWeek::from_code(raw.weekday).ok_or(IssueKind::UnknownWeekday(raw.weekday))?;
    let holiday = flag("holiday", raw.holiday)?;
    let working = flag("workingday", raw.workingday)?;

    let casual = count("casual", raw.casual)?;
    let registered = count("registered", raw.registered)?;
    let cnt = count("cnt", raw.cnt)?;
    if u64::from(casual) + u64::from(registered) != u64::from(cnt) {
        return Err(IssueKind::CountMismatch {
            casual: raw.casual,
            registered: raw.registered,
            cnt: raw.cnt,
        });
    }

    let calendar = DayOfWeek::of_date(date);
    let warning = (calendar != weekday).then(|| IssueKind::WeekdayMismatch {
        column: raw.weekday,
        calendar: calendar.code(),
    });

    let record = Record {
        date,
        hour,
        season,
        weather,
        holiday,
        day_type: DayType::from_flag(working),
        weekday,
        casual,
        registered,
        cnt,
        month: date.month(),
        rush_hour: RushHour::from_hour(hour),
    };
    Ok((record, warning))
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, extra columns ignored.
/// Headers and cells are trimmed, so `dteday, season, hr` is accepted.
fn load_csv(path: &Path) -> Result<Loaded> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .context("opening CSV")?;
    let headers = reader.headers().context("reading CSV headers")?.clone();
    require_columns(headers.iter())?;

    let mut sink = RecordSink::default();
    for (row_no, result) in reader.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                sink.reject(row_no, format!("unreadable CSV row: {e}"));
                continue;
            }
        };
        match record.deserialize::<RawRecord>(Some(&headers)) {
            Ok(raw) => sink.push(row_no, raw),
            Err(e) => sink.reject(row_no, e.to_string()),
        }
    }
    Ok(sink.finish())
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "dteday": "2011-01-01", "hr": 0, "season": 1, "weathersit": 1,
///     "holiday": 0, "workingday": 0, "weekday": 6,
///     "casual": 3, "registered": 13, "cnt": 16 },
///   ...
/// ]
/// ```
///
/// Column names come from the first record, so an empty array carries no
/// schema and fails the required-column check.
fn load_json(path: &Path) -> Result<Loaded> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;
    let rows = root.as_array().ok_or(LoadError::NotARecordArray)?;

    match rows.first() {
        Some(first) => {
            let obj = first.as_object().ok_or(LoadError::NotARecordArray)?;
            require_columns(obj.keys().map(String::as_str))?;
        }
        None => require_columns(std::iter::empty::<&str>())?,
    }

    let mut sink = RecordSink::default();
    for (row_no, value) in rows.iter().enumerate() {
        match RawRecord::deserialize(value) {
            Ok(raw) => sink.push(row_no, raw),
            Err(e) => sink.reject(row_no, e.to_string()),
        }
    }
    Ok(sink.finish())
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file. Integer columns may be any signed or unsigned
/// width; `dteday` may be Utf8, LargeUtf8 or Date32.
fn load_parquet(path: &Path) -> Result<Loaded> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    require_columns(builder.schema().fields().iter().map(|f| f.name().as_str()))?;
    let reader = builder.build().context("building parquet reader")?;

    let mut sink = RecordSink::default();
    let mut row_offset = 0;

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let dates = cast(column(&batch, "dteday")?, &DataType::Utf8).context("casting dteday to text")?;
        let dates = dates.as_string_opt::<i32>().context("dteday is not text")?;

        let int_names = &REQUIRED_COLUMNS[..9];
        let mut ints = Vec::with_capacity(int_names.len());
        for name in int_names {
            let array = cast(column(&batch, name)?, &DataType::Int64)
                .with_context(|| format!("casting '{name}' to Int64"))?;
            ints.push(array);
        }
        let ints = ints
            .iter()
            .zip(int_names)
            .map(|(a, name)| {
                a.as_primitive_opt::<Int64Type>()
                    .with_context(|| format!("'{name}' is not an integer column"))
            })
            .collect::<Result<Vec<_>>>()?;

        for row in 0..batch.num_rows() {
            let row_no = row_offset + row;
            if dates.is_null(row) {
                sink.reject(row_no, "null in column 'dteday'");
                continue;
            }
            if let Some(name) = int_names
                .iter()
                .zip(&ints)
                .find(|(_, a)| a.is_null(row))
                .map(|(name, _)| name)
            {
                sink.reject(row_no, format!("null in column '{name}'"));
                continue;
            }
            // Same order as REQUIRED_COLUMNS.
            let v = |i: usize| ints[i].value(row);
            let raw = RawRecord {
                season: v(0),
                hr: v(1),
                weathersit: v(2),
                holiday: v(3),
                workingday: v(4),
                casual: v(5),
                registered: v(6),
                cnt: v(7),
                weekday: v(8),
                dteday: dates.value(row).to_string(),
            };
            sink.push(row_no, raw);
        }
        row_offset += batch.num_rows();
    }

    Ok(sink.finish())
}

fn column<'b>(batch: &'b RecordBatch, name: &str) -> Result<&'b ArrayRef> {
    batch
        .column_by_name(name)
        .with_context(|| format!("column '{name}' missing from record batch"))
}
