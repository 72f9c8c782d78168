use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::ParseLabelError;

// ---------------------------------------------------------------------------
// Categorical dimensions
// ---------------------------------------------------------------------------

/// Meteorological season as coded in the `season` column (1..=4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
}

impl Season {
    pub const ALL: [Season; 4] = [Season::Spring, Season::Summer, Season::Fall, Season::Winter];

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Season::Spring),
            2 => Some(Season::Summer),
            3 => Some(Season::Fall),
            4 => Some(Season::Winter),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8 + 1
    }

    pub fn label(self) -> &'static str {
        match self {
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Fall => "Fall",
            Season::Winter => "Winter",
        }
    }
}

/// Weather situation as coded in the `weathersit` column (1..=4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weather {
    Clear,
    Mist,
    LightRain,
    HeavyRain,
}

impl Weather {
    pub const ALL: [Weather; 4] = [Weather::Clear, Weather::Mist, Weather::LightRain, Weather::HeavyRain];

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Weather::Clear),
            2 => Some(Weather::Mist),
            3 => Some(Weather::LightRain),
            4 => Some(Weather::HeavyRain),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8 + 1
    }

    pub fn label(self) -> &'static str {
        match self {
            Weather::Clear => "Clear/Partly cloudy",
            Weather::Mist => "Mist/Cloudy",
            Weather::LightRain => "Light rain/snow",
            Weather::HeavyRain => "Heavy rain/Storm",
        }
    }
}

/// Day of the week.
///
/// Numbering is fixed at **0 = Sunday .. 6 = Saturday**, the encoding of the
/// `weekday` column and of [`chrono::Weekday::num_days_from_sunday`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Sunday,
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
    ];

    pub fn from_code(code: i64) -> Option<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Calendar weekday of a date under the same numbering.
    pub fn of_date(date: NaiveDate) -> Self {
        use chrono::Datelike;
        Self::ALL[date.weekday().num_days_from_sunday() as usize]
    }

    pub fn label(self) -> &'static str {
        match self {
            DayOfWeek::Sunday => "Sunday",
            DayOfWeek::Monday => "Monday",
            DayOfWeek::Tuesday => "Tuesday",
            DayOfWeek::Wednesday => "Wednesday",
            DayOfWeek::Thursday => "Thursday",
            DayOfWeek::Friday => "Friday",
            DayOfWeek::Saturday => "Saturday",
        }
    }
}

/// Working-day classification derived from the `workingday` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayType {
    /// `workingday == 0`: weekend or public holiday.
    Off,
    /// `workingday == 1`.
    Working,
}

impl DayType {
    pub fn from_flag(flag: bool) -> Self {
        if flag {
            DayType::Working
        } else {
            DayType::Off
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DayType::Off => "Weekend/Holiday",
            DayType::Working => "Working day",
        }
    }
}

/// Hours 7..=19 are "busy", everything else is "quiet".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RushHour {
    Quiet,
    Busy,
}

impl RushHour {
    pub fn from_hour(hour: u8) -> Self {
        if (7..=19).contains(&hour) {
            RushHour::Busy
        } else {
            RushHour::Quiet
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RushHour::Quiet => "quiet",
            RushHour::Busy => "busy",
        }
    }
}

macro_rules! label_impls {
    ($ty:ty, $kind:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $ty {
            type Err = ParseLabelError;

            /// Accepts the label, the lowercase variant name, or the numeric code.
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = normalize(s);
                <$ty>::ALL
                    .iter()
                    .copied()
                    .find(|v| {
                        normalize(v.label()) == wanted
                            || normalize(&format!("{v:?}")) == wanted
                            || v.code().to_string() == wanted
                    })
                    .ok_or_else(|| ParseLabelError {
                        kind: $kind,
                        input: s.to_string(),
                    })
            }
        }
    };
}

label_impls!(Season, "season");
label_impls!(Weather, "weather");
label_impls!(DayOfWeek, "day");

impl fmt::Display for DayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DayType {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "working" | "workingday" | "1" => Ok(DayType::Working),
            "off" | "weekend" | "holiday" | "weekendholiday" | "0" => Ok(DayType::Off),
            _ => Err(ParseLabelError {
                kind: "day type",
                input: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for RushHour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

// ---------------------------------------------------------------------------
// Record – one validated row of the source table
// ---------------------------------------------------------------------------

/// One hourly observation. Invariant: `cnt == casual + registered`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub date: NaiveDate,
    pub hour: u8,
    pub season: Season,
    pub weather: Weather,
    pub holiday: bool,
    pub day_type: DayType,
    pub weekday: DayOfWeek,
    pub casual: u32,
    pub registered: u32,
    pub cnt: u32,
    /// Derived from `date`, 1..=12.
    pub month: u32,
    /// Derived from `hour`.
    pub rush_hour: RushHour,
}

// ---------------------------------------------------------------------------
// BikeDataset – the complete loaded dataset
// ---------------------------------------------------------------------------

/// Sorted unique values of every filterable dimension.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DimensionValues {
    pub seasons: BTreeSet<Season>,
    pub hours: BTreeSet<u8>,
    pub weather: BTreeSet<Weather>,
    pub days: BTreeSet<DayOfWeek>,
    pub day_types: BTreeSet<DayType>,
}

/// Read-only dataset handle. Built once by the loader and passed around
/// explicitly; nothing mutates it after construction.
#[derive(Debug, Clone, Default)]
pub struct BikeDataset {
    records: Vec<Record>,
    unique_values: DimensionValues,
}

impl BikeDataset {
    /// Build dimension indices from validated records.
    pub fn from_records(records: Vec<Record>) -> Self {
        let mut unique_values = DimensionValues::default();
        for r in &records {
            unique_values.seasons.insert(r.season);
            unique_values.hours.insert(r.hour);
            unique_values.weather.insert(r.weather);
            unique_values.days.insert(r.weekday);
            unique_values.day_types.insert(r.day_type);
        }
        BikeDataset {
            records,
            unique_values,
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn unique_values(&self) -> &DimensionValues {
        &self.unique_values
    }

    /// Sum of `cnt` over every record.
    pub fn total_count(&self) -> u64 {
        self.records.iter().map(|r| u64::from(r.cnt)).sum()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
