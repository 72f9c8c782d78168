use crate::data::filter::{filtered_indices, FilterSpec};
use crate::data::model::{BikeDataset, DayOfWeek, DayType, Record, Season, Weather};

// ---------------------------------------------------------------------------
// Dashboard state
// ---------------------------------------------------------------------------

/// The full dashboard state, independent of rendering.
///
/// Owns the dataset; every filter change re-runs the filter over all records.
#[derive(Debug, Clone)]
pub struct DashboardState {
    dataset: BikeDataset,

    /// Per-dimension filter selections.
    filters: FilterSpec,

    /// Indices of records passing the current filters (cached).
    visible_indices: Vec<usize>,
}

impl DashboardState {
    /// Take ownership of a loaded dataset with no filters applied.
    pub fn new(dataset: BikeDataset) -> Self {
        let visible_indices = (0..dataset.len()).collect();
        Self {
            dataset,
            filters: FilterSpec::default(),
            visible_indices,
        }
    }

    pub fn dataset(&self) -> &BikeDataset {
        &self.dataset
    }

    pub fn filters(&self) -> &FilterSpec {
        &self.filters
    }

    pub fn visible_indices(&self) -> &[usize] {
        &self.visible_indices
    }

    /// Records passing the current filters, in dataset order.
    pub fn visible_records(&self) -> impl Iterator<Item = &Record> + '_ {
        let records = self.dataset.records();
        self.visible_indices.iter().map(move |&i| &records[i])
    }

    /// Replace the whole selection.
    pub fn set_filters(&mut self, filters: FilterSpec) {
        self.filters = filters;
        self.refilter();
    }

    /// Drop every constraint.
    pub fn clear_filters(&mut self) {
        self.set_filters(FilterSpec::default());
    }

    /// Recompute `visible_indices` after a filter change.
    fn refilter(&mut self) {
        self.visible_indices = filtered_indices(&self.dataset, &self.filters);
    }

    pub fn toggle_season(&mut self, season: Season) {
        toggle(&mut self.filters.seasons, season);
        self.refilter();
    }

    pub fn toggle_hour(&mut self, hour: u8) {
        toggle(&mut self.filters.hours, hour);
        self.refilter();
    }

    pub fn toggle_weather(&mut self, weather: Weather) {
        toggle(&mut self.filters.weather, weather);
        self.refilter();
    }

    pub fn toggle_day(&mut self, day: DayOfWeek) {
        toggle(&mut self.filters.days, day);
        self.refilter();
    }

    pub fn set_day_type(&mut self, day_type: Option<DayType>) {
        self.filters.day_type = day_type;
        self.refilter();
    }
}

fn toggle<T: Ord>(set: &mut std::collections::BTreeSet<T>, value: T) {
    if !set.remove(&value) {
        set.insert(value);
    }
}
