use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};

use super::model::{DayOfWeek, DayType, Record, RushHour, Season, Weather};

// ---------------------------------------------------------------------------
// Grouping dimensions and keys
// ---------------------------------------------------------------------------

/// A categorical field records can be grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Season,
    Hour,
    Weather,
    Weekday,
    DayType,
    Month,
    Date,
    RushHour,
    Holiday,
}

impl Dimension {
    pub fn key_of(self, r: &Record) -> KeyValue {
        match self {
            Dimension::Season => KeyValue::Season(r.season),
            Dimension::Hour => KeyValue::Hour(r.hour),
            Dimension::Weather => KeyValue::Weather(r.weather),
            Dimension::Weekday => KeyValue::Weekday(r.weekday),
            Dimension::DayType => KeyValue::DayType(r.day_type),
            Dimension::Month => KeyValue::Month(r.month),
            Dimension::Date => KeyValue::Date(r.date),
            Dimension::RushHour => KeyValue::RushHour(r.rush_hour),
            Dimension::Holiday => KeyValue::Holiday(r.holiday),
        }
    }

    /// Column heading for tables and chart axes.
    pub fn label(self) -> &'static str {
        match self {
            Dimension::Season => "season",
            Dimension::Hour => "hour",
            Dimension::Weather => "weather",
            Dimension::Weekday => "weekday",
            Dimension::DayType => "day type",
            Dimension::Month => "month",
            Dimension::Date => "date",
            Dimension::RushHour => "rush hour",
            Dimension::Holiday => "holiday",
        }
    }
}

/// The value of one [`Dimension`] for a record.
///
/// Ordering follows the natural order of the underlying value (season code,
/// hour, calendar date, ...), which gives results their ascending key order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyValue {
    Season(Season),
    Hour(u8),
    Weather(Weather),
    Weekday(DayOfWeek),
    DayType(DayType),
    Month(u32),
    Date(NaiveDate),
    RushHour(RushHour),
    Holiday(bool),
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Season(s) => write!(f, "{s}"),
            KeyValue::Hour(h) => write!(f, "{h}"),
            KeyValue::Weather(w) => write!(f, "{w}"),
            KeyValue::Weekday(d) => write!(f, "{d}"),
            KeyValue::DayType(t) => write!(f, "{t}"),
            KeyValue::Month(m) => write!(f, "{m}"),
            KeyValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            KeyValue::RushHour(r) => write!(f, "{r}"),
            KeyValue::Holiday(true) => f.write_str("holiday"),
            KeyValue::Holiday(false) => f.write_str("regular day"),
        }
    }
}

impl Serialize for KeyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            KeyValue::Hour(h) => serializer.serialize_u8(*h),
            KeyValue::Month(m) => serializer.serialize_u32(*m),
            other => serializer.collect_str(other),
        }
    }
}

/// Single or composite grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    One(Dimension),
    Two(Dimension, Dimension),
}

impl GroupBy {
    pub fn key_of(self, r: &Record) -> GroupKey {
        match self {
            GroupBy::One(d) => GroupKey {
                first: d.key_of(r),
                second: None,
            },
            GroupBy::Two(a, b) => GroupKey {
                first: a.key_of(r),
                second: Some(b.key_of(r)),
            },
        }
    }

    pub fn dimensions(self) -> Vec<Dimension> {
        match self {
            GroupBy::One(d) => vec![d],
            GroupBy::Two(a, b) => vec![a, b],
        }
    }
}

/// One group's key; `second` is set only for composite groupings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct GroupKey {
    pub first: KeyValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub second: Option<KeyValue>,
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.second {
            Some(second) => write!(f, "{} / {second}", self.first),
            None => write!(f, "{}", self.first),
        }
    }
}

// ---------------------------------------------------------------------------
// Metrics and reductions
// ---------------------------------------------------------------------------

/// Which rental count is aggregated. `Total` is the `cnt` column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    #[default]
    Total,
    Casual,
    Registered,
}

impl Metric {
    pub fn value_of(self, r: &Record) -> u32 {
        match self {
            Metric::Total => r.cnt,
            Metric::Casual => r.casual,
            Metric::Registered => r.registered,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Metric::Total => "cnt",
            Metric::Casual => "casual",
            Metric::Registered => "registered",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reduction {
    Sum,
    Mean,
}

impl Reduction {
    pub fn label(self) -> &'static str {
        match self {
            Reduction::Sum => "sum",
            Reduction::Mean => "mean",
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregation results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    pub key: GroupKey,
    /// Exact sum of the metric over the group.
    pub sum: u64,
    /// Number of records in the group.
    pub count: usize,
    /// `sum` or `sum / count`, depending on the reduction.
    pub value: f64,
}

/// Groups in ascending key order. Empty when the input was empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationResult {
    pub group_by: GroupBy,
    pub metric: Metric,
    pub reduction: Reduction,
    pub rows: Vec<AggregateRow>,
}

/// One pie slice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Share {
    pub key: GroupKey,
    pub sum: u64,
    /// Fraction of the overall total in `0.0..=1.0`; zero when the total is zero.
    pub fraction: f64,
}

impl AggregationResult {
    /// Sum of the metric over every group.
    pub fn total(&self) -> u64 {
        self.rows.iter().map(|r| r.sum).sum()
    }

    pub fn shares(&self) -> Vec<Share> {
        let total = self.total();
        self.rows
            .iter()
            .map(|r| Share {
                key: r.key,
                sum: r.sum,
                fraction: if total == 0 {
                    0.0
                } else {
                    r.sum as f64 / total as f64
                },
            })
            .collect()
    }

    pub fn get(&self, key: &GroupKey) -> Option<&AggregateRow> {
        self.rows
            .binary_search_by(|r| r.key.cmp(key))
            .ok()
            .map(|i| &self.rows[i])
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Group `records` and reduce `metric` per group.
pub fn aggregate<'a, I>(
    records: I,
    group_by: GroupBy,
    metric: Metric,
    reduction: Reduction,
) -> AggregationResult
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut groups: BTreeMap<GroupKey, (u64, usize)> = BTreeMap::new();
    for r in records {
        let slot = groups.entry(group_by.key_of(r)).or_default();
        slot.0 += u64::from(metric.value_of(r));
        slot.1 += 1;
    }

    let rows = groups
        .into_iter()
        .map(|(key, (sum, count))| AggregateRow {
            key,
            sum,
            count,
            value: match reduction {
                Reduction::Sum => sum as f64,
                Reduction::Mean => sum as f64 / count as f64,
            },
        })
        .collect();

    AggregationResult {
        group_by,
        metric,
        reduction,
        rows,
    }
}

// ---------------------------------------------------------------------------
// Box-plot statistics
// ---------------------------------------------------------------------------

/// Five-number summary of one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxSummary {
    pub key: KeyValue,
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

/// Per-group min, quartiles and max of `metric`, ascending by key.
/// Quartiles use linear interpolation between order statistics.
pub fn box_summary<'a, I>(records: I, dimension: Dimension, metric: Metric) -> Vec<BoxSummary>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut groups: BTreeMap<KeyValue, Vec<u32>> = BTreeMap::new();
    for r in records {
        groups
            .entry(dimension.key_of(r))
            .or_default()
            .push(metric.value_of(r));
    }

    groups
        .into_iter()
        .map(|(key, mut values)| {
            values.sort_unstable();
            BoxSummary {
                key,
                count: values.len(),
                min: quantile(&values, 0.0),
                q1: quantile(&values, 0.25),
                median: quantile(&values, 0.5),
                q3: quantile(&values, 0.75),
                max: quantile(&values, 1.0),
            }
        })
        .collect()
}

/// `sorted` must be non-empty and ascending.
fn quantile(sorted: &[u32], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let a = f64::from(sorted[lo]);
    let b = f64::from(sorted[hi]);
    a + (b - a) * (pos - lo as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(month: u32, weather: Weather, hour: u8, cnt: u32) -> Record {
        let date = NaiveDate::from_ymd_opt(2012, month, 1).unwrap();
        Record {
            date,
            hour,
            season: Season::Spring,
            weather,
            holiday: false,
            day_type: DayType::Working,
            weekday: DayOfWeek::of_date(date),
            casual: cnt / 2,
            registered: cnt - cnt / 2,
            cnt,
            month,
            rush_hour: RushHour::from_hour(hour),
        }
    }

    #[test]
    fn sum_and_mean_per_group() {
        let records = vec![
            record(1, Weather::Clear, 8, 10),
            record(1, Weather::Clear, 9, 30),
            record(2, Weather::Mist, 8, 5),
        ];
        let sums = aggregate(&records, GroupBy::One(Dimension::Month), Metric::Total, Reduction::Sum);
        assert_eq!(sums.len(), 2);
        assert_eq!(sums.rows[0].key.first, KeyValue::Month(1));
        assert_eq!(sums.rows[0].sum, 40);
        assert_eq!(sums.total(), 45);

        let means = aggregate(&records, GroupBy::One(Dimension::Hour), Metric::Total, Reduction::Mean);
        let eight = means
            .get(&GroupKey {
                first: KeyValue::Hour(8),
                second: None,
            })
            .unwrap();
        assert_eq!(eight.count, 2);
        assert!((eight.value - 7.5).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_input_gives_empty_result() {
        let none: Vec<Record> = Vec::new();
        let result = aggregate(&none, GroupBy::One(Dimension::Season), Metric::Total, Reduction::Mean);
        assert!(result.is_empty());
        assert_eq!(result.total(), 0);
        assert!(result.shares().is_empty());
        assert!(box_summary(&none, Dimension::DayType, Metric::Total).is_empty());
    }

    #[test]
    fn composite_keys_keep_both_parts_in_order() {
        let records = vec![
            record(3, Weather::Mist, 8, 1),
            record(1, Weather::LightRain, 8, 2),
            record(1, Weather::Clear, 8, 4),
        ];
        let result = aggregate(
            &records,
            GroupBy::Two(Dimension::Month, Dimension::Weather),
            Metric::Total,
            Reduction::Sum,
        );
        let keys: Vec<_> = result.rows.iter().map(|r| (r.key.first, r.key.second)).collect();
        assert_eq!(
            keys,
            vec![
                (KeyValue::Month(1), Some(KeyValue::Weather(Weather::Clear))),
                (KeyValue::Month(1), Some(KeyValue::Weather(Weather::LightRain))),
                (KeyValue::Month(3), Some(KeyValue::Weather(Weather::Mist))),
            ]
        );
    }

    #[test]
    fn metric_selects_column() {
        let records = vec![record(1, Weather::Clear, 8, 11)];
        let casual = aggregate(&records, GroupBy::One(Dimension::Month), Metric::Casual, Reduction::Sum);
        let registered =
            aggregate(&records, GroupBy::One(Dimension::Month), Metric::Registered, Reduction::Sum);
        assert_eq!(casual.total(), 5);
        assert_eq!(registered.total(), 6);
    }

    #[test]
    fn shares_sum_to_one() {
        let records = vec![
            record(1, Weather::Clear, 8, 30),
            record(1, Weather::Clear, 2, 10),
        ];
        let shares = aggregate(&records, GroupBy::One(Dimension::RushHour), Metric::Total, Reduction::Sum)
            .shares();
        assert_eq!(shares.len(), 2);
        assert_eq!(shares[0].key.first, KeyValue::RushHour(RushHour::Quiet));
        assert!((shares[0].fraction - 0.25).abs() < 1e-12);
        assert!((shares.iter().map(|s| s.fraction).sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn zero_total_shares_are_zero() {
        let records = vec![record(1, Weather::Clear, 8, 0)];
        let shares = aggregate(&records, GroupBy::One(Dimension::Month), Metric::Total, Reduction::Sum)
            .shares();
        assert_eq!(shares[0].fraction, 0.0);
    }

    #[test]
    fn box_summary_interpolates_quartiles() {
        let records: Vec<Record> = [1, 2, 3, 4, 5]
            .into_iter()
            .map(|c| record(1, Weather::Clear, 8, c))
            .collect();
        let boxes = box_summary(&records, Dimension::DayType, Metric::Total);
        assert_eq!(boxes.len(), 1);
        let b = &boxes[0];
        assert_eq!((b.min, b.q1, b.median, b.q3, b.max), (1.0, 2.0, 3.0, 4.0, 5.0));

        let even: Vec<Record> = [10, 20, 30, 40]
            .into_iter()
            .map(|c| record(1, Weather::Clear, 8, c))
            .collect();
        let b = &box_summary(&even, Dimension::DayType, Metric::Total)[0];
        assert!((b.q1 - 17.5).abs() < 1e-12);
        assert!((b.median - 25.0).abs() < 1e-12);
    }

    #[test]
    fn key_values_render_labels() {
        assert_eq!(KeyValue::Season(Season::Fall).to_string(), "Fall");
        assert_eq!(KeyValue::Holiday(true).to_string(), "holiday");
        let key = GroupKey {
            first: KeyValue::Month(4),
            second: Some(KeyValue::Weather(Weather::Mist)),
        };
        assert_eq!(key.to_string(), "4 / Mist/Cloudy");
        assert_eq!(serde_json::to_value(key.first).unwrap(), serde_json::json!(4));
    }
}
