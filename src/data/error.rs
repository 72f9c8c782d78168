use std::fmt;

use thiserror::Error;

/// Fatal problems with an input file as a whole.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoadError {
    #[error("dataset is missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("unsupported file extension: .{0}")]
    UnsupportedExtension(String),

    #[error("expected a top-level JSON array of records")]
    NotARecordArray,
}

/// A categorical label that could not be parsed from user input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown {kind} '{input}'")]
pub struct ParseLabelError {
    pub kind: &'static str,
    pub input: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("hour {0} is outside 0..=23")]
    HourOutOfRange(u8),
}

/// A single row that was rejected (or flagged) while loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Zero-based data row number (header excluded).
    pub row: usize,
    pub kind: IssueKind,
}

impl ValidationIssue {
    /// Whether the offending row was dropped from the dataset.
    pub fn is_rejection(&self) -> bool {
        !matches!(self.kind, IssueKind::WeekdayMismatch { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueKind {
    UnknownSeason(i64),
    UnknownWeather(i64),
    UnknownWeekday(i64),
    HourOutOfRange(i64),
    InvalidFlag { column: &'static str, value: i64 },
    NegativeCount { column: &'static str, value: i64 },
    CountMismatch { casual: i64, registered: i64, cnt: i64 },
    InvalidDate(String),
    Malformed(String),
    /// `weekday` disagrees with the calendar; the row is kept.
    WeekdayMismatch { column: i64, calendar: u8 },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}: ", self.row)?;
        match &self.kind {
            IssueKind::UnknownSeason(c) => write!(f, "unrecognized season code {c}"),
            IssueKind::UnknownWeather(c) => write!(f, "unrecognized weathersit code {c}"),
            IssueKind::UnknownWeekday(c) => write!(f, "unrecognized weekday code {c}"),
            IssueKind::HourOutOfRange(h) => write!(f, "hour {h} is outside 0..=23"),
            IssueKind::InvalidFlag { column, value } => {
                write!(f, "{column} must be 0 or 1, got {value}")
            }
            IssueKind::NegativeCount { column, value } => {
                write!(f, "{column} must not be negative, got {value}")
            }
            IssueKind::CountMismatch {
                casual,
                registered,
                cnt,
            } => write!(f, "cnt {cnt} != casual {casual} + registered {registered}"),
            IssueKind::InvalidDate(d) => write!(f, "unparsable dteday '{d}'"),
            IssueKind::Malformed(msg) => write!(f, "{msg}"),
            IssueKind::WeekdayMismatch { column, calendar } => write!(
                f,
                "weekday {column} disagrees with calendar weekday {calendar} (kept)"
            ),
        }
    }
}
