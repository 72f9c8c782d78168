use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::error::FilterError;
use super::model::{BikeDataset, DayOfWeek, DayType, Record, Season, Weather};

// ---------------------------------------------------------------------------
// Filter predicate: which values are accepted per dimension
// ---------------------------------------------------------------------------

/// Accepted values per dimension.
///
/// An empty set means "no constraint" for that dimension, never "exclude
/// everything". `day_type: None` likewise accepts both working and off days.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterSpec {
    pub seasons: BTreeSet<Season>,
    pub hours: BTreeSet<u8>,
    pub weather: BTreeSet<Weather>,
    /// Applied as a second pass, only when non-empty.
    pub days: BTreeSet<DayOfWeek>,
    pub day_type: Option<DayType>,
}

impl FilterSpec {
    /// Reject selections that can never match a valid record.
    pub fn validate(&self) -> Result<(), FilterError> {
        match self.hours.iter().find(|h| **h > 23) {
            Some(h) => Err(FilterError::HourOutOfRange(*h)),
            None => Ok(()),
        }
    }

    /// True when no dimension carries a constraint.
    pub fn is_unconstrained(&self) -> bool {
        self.seasons.is_empty()
            && self.hours.is_empty()
            && self.weather.is_empty()
            && self.days.is_empty()
            && self.day_type.is_none()
    }

    /// Primary predicate: season, hour, weather and day type.
    pub fn matches(&self, record: &Record) -> bool {
        accepts(&self.seasons, &record.season)
            && accepts(&self.hours, &record.hour)
            && accepts(&self.weather, &record.weather)
            && self.day_type.map_or(true, |t| t == record.day_type)
    }

    /// Secondary day-of-week predicate.
    pub fn matches_day(&self, record: &Record) -> bool {
        accepts(&self.days, &record.weekday)
    }

    /// Union each dimension with `other`; `other.day_type` wins when set.
    pub fn merge(&mut self, other: FilterSpec) {
        self.seasons.extend(other.seasons);
        self.hours.extend(other.hours);
        self.weather.extend(other.weather);
        self.days.extend(other.days);
        if other.day_type.is_some() {
            self.day_type = other.day_type;
        }
    }
}

fn accepts<T: Ord>(selected: &BTreeSet<T>, value: &T) -> bool {
    selected.is_empty() || selected.contains(value)
}

/// Return indices (ascending) of records that pass all active filters.
///
/// The day-of-week set is applied as a separate pass over the survivors of
/// the primary predicate, and only when it is non-empty.
pub fn filtered_indices(dataset: &BikeDataset, spec: &FilterSpec) -> Vec<usize> {
    let records = dataset.records();
    let mut indices: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| spec.matches(r))
        .map(|(i, _)| i)
        .collect();

    if !spec.days.is_empty() {
        indices.retain(|&i| spec.matches_day(&records[i]));
    }

    log::debug!("filter kept {} of {} records", indices.len(), records.len());
    indices
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::data::model::RushHour;

    fn record(season: Season, hour: u8, weekday: DayOfWeek, working: bool) -> Record {
        let date = NaiveDate::from_ymd_opt(2011, 3, 6).unwrap();
        Record {
            date,
            hour,
            season,
            weather: Weather::Clear,
            holiday: false,
            day_type: DayType::from_flag(working),
            weekday,
            casual: 1,
            registered: 1,
            cnt: 2,
            month: 3,
            rush_hour: RushHour::from_hour(hour),
        }
    }

    fn dataset() -> BikeDataset {
        BikeDataset::from_records(vec![
            record(Season::Spring, 8, DayOfWeek::Monday, true),
            record(Season::Summer, 8, DayOfWeek::Saturday, false),
            record(Season::Spring, 17, DayOfWeek::Sunday, false),
            record(Season::Winter, 3, DayOfWeek::Friday, true),
        ])
    }

    #[test]
    fn empty_spec_keeps_everything() {
        let ds = dataset();
        let spec = FilterSpec::default();
        assert!(spec.is_unconstrained());
        assert_eq!(filtered_indices(&ds, &spec), vec![0, 1, 2, 3]);
    }

    #[test]
    fn dimensions_combine_as_conjunction() {
        let ds = dataset();
        let spec = FilterSpec {
            seasons: [Season::Spring].into(),
            hours: [8, 17].into(),
            ..Default::default()
        };
        assert_eq!(filtered_indices(&ds, &spec), vec![0, 2]);

        let spec = FilterSpec {
            seasons: [Season::Spring].into(),
            day_type: Some(DayType::Off),
            ..Default::default()
        };
        assert_eq!(filtered_indices(&ds, &spec), vec![2]);
    }

    #[test]
    fn day_pass_uses_weekday_not_working_flag() {
        let ds = dataset();
        let spec = FilterSpec {
            days: [DayOfWeek::Saturday, DayOfWeek::Friday].into(),
            ..Default::default()
        };
        assert_eq!(filtered_indices(&ds, &spec), vec![1, 3]);
    }

    #[test]
    fn filtering_is_idempotent() {
        let ds = dataset();
        let spec = FilterSpec {
            hours: [8].into(),
            ..Default::default()
        };
        let once = filtered_indices(&ds, &spec);
        let subset = BikeDataset::from_records(
            once.iter().map(|&i| ds.records()[i].clone()).collect(),
        );
        let twice = filtered_indices(&subset, &spec);
        assert_eq!(twice.len(), once.len());
        assert_eq!(filtered_indices(&ds, &spec), once);
    }

    #[test]
    fn validate_rejects_impossible_hours() {
        let spec = FilterSpec {
            hours: [5, 24].into(),
            ..Default::default()
        };
        assert_eq!(spec.validate(), Err(FilterError::HourOutOfRange(24)));
        assert!(FilterSpec::default().validate().is_ok());
    }

    #[test]
    fn merge_unions_selections() {
        let mut base = FilterSpec {
            seasons: [Season::Fall].into(),
            ..Default::default()
        };
        base.merge(FilterSpec {
            seasons: [Season::Winter].into(),
            day_type: Some(DayType::Working),
            ..Default::default()
        });
        assert_eq!(base.seasons, BTreeSet::from([Season::Fall, Season::Winter]));
        assert_eq!(base.day_type, Some(DayType::Working));
    }

    #[test]
    fn spec_deserializes_from_json() {
        let spec: FilterSpec =
            serde_json::from_str(r#"{"seasons": ["spring"], "days": ["sunday"], "day_type": "off"}"#)
                .unwrap();
        assert_eq!(spec.seasons, BTreeSet::from([Season::Spring]));
        assert_eq!(spec.days, BTreeSet::from([DayOfWeek::Sunday]));
        assert_eq!(spec.day_type, Some(DayType::Off));
        assert!(spec.hours.is_empty());
    }
}
