//! Chart-ready summaries for the presentation layer.
//!
//! Each [`ChartSpec`] bundles what a chart widget needs: kind, titles, the
//! summary table and a colour per series. Rendering is left to the consumer.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::color::color_map;
use crate::data::aggregate::{
    aggregate, box_summary, AggregationResult, BoxSummary, Dimension, GroupBy, Metric, Reduction,
    Share,
};
use crate::data::filter::FilterSpec;
use crate::data::model::{DimensionValues, Record};
use crate::state::DashboardState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
    Box,
    Pie,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "table", rename_all = "snake_case")]
pub enum ChartData {
    Groups(AggregationResult),
    Boxes(Vec<BoxSummary>),
    Shares(Vec<Share>),
}

impl ChartData {
    pub fn is_empty(&self) -> bool {
        match self {
            ChartData::Groups(g) => g.is_empty(),
            ChartData::Boxes(b) => b.is_empty(),
            ChartData::Shares(s) => s.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub id: &'static str,
    pub kind: ChartKind,
    pub title: &'static str,
    pub x_label: &'static str,
    pub y_label: &'static str,
    /// Series label → `#rrggbb`. Empty for single-series charts.
    pub colors: BTreeMap<String, String>,
    pub data: ChartData,
}

/// Everything the presentation layer draws for one filter selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub total_records: usize,
    pub visible_records: usize,
    pub filters: FilterSpec,
    /// Values present in the dataset, for building filter controls.
    pub available: DimensionValues,
    pub charts: Vec<ChartSpec>,
    /// Leading records of the filtered view, in dataset order. Empty unless
    /// requested through [`Dashboard::with_rows`].
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<Record>,
}

impl Dashboard {
    pub fn chart(&self, id: &str) -> Option<&ChartSpec> {
        self.charts.iter().find(|c| c.id == id)
    }

    /// Attach up to `limit` records of the filtered view.
    pub fn with_rows(mut self, state: &DashboardState, limit: usize) -> Self {
        self.rows = state.visible_records().take(limit).cloned().collect();
        self
    }
}

/// Build every dashboard chart from the current state.
///
/// All charts summarise the filtered view except the day-type box plot,
/// which always compares working days and off days over the full dataset.
pub fn build_dashboard(state: &DashboardState) -> Dashboard {
    let sum = |group_by| aggregate(state.visible_records(), group_by, Metric::Total, Reduction::Sum);

    let by_season = sum(GroupBy::One(Dimension::Season));
    let by_hour = aggregate(
        state.visible_records(),
        GroupBy::One(Dimension::Hour),
        Metric::Total,
        Reduction::Mean,
    );
    let boxes = box_summary(state.dataset().records(), Dimension::DayType, Metric::Total);
    let by_weather = sum(GroupBy::One(Dimension::Weather));
    let by_rush_hour = sum(GroupBy::One(Dimension::RushHour));
    let daily_by_season = sum(GroupBy::Two(Dimension::Season, Dimension::Date));
    let monthly_by_weather = sum(GroupBy::Two(Dimension::Month, Dimension::Weather));

    let charts = vec![
        ChartSpec {
            id: "season_totals",
            kind: ChartKind::Bar,
            title: "Rentals by season",
            x_label: "Season",
            y_label: "Rentals",
            colors: series_colors(&by_season, Dimension::Season),
            data: ChartData::Groups(by_season),
        },
        ChartSpec {
            id: "hourly_mean",
            kind: ChartKind::Line,
            title: "Average rentals by hour",
            x_label: "Hour",
            y_label: "Average rentals",
            colors: BTreeMap::new(),
            data: ChartData::Groups(by_hour),
        },
        ChartSpec {
            id: "day_type_box",
            kind: ChartKind::Box,
            title: "Rentals on working days vs. weekends/holidays",
            x_label: "Day type",
            y_label: "Rentals",
            colors: color_map(boxes.iter().map(|b| b.key.to_string())),
            data: ChartData::Boxes(boxes),
        },
        ChartSpec {
            id: "weather_totals",
            kind: ChartKind::Bar,
            title: "Rentals by weather condition",
            x_label: "Weather",
            y_label: "Rentals",
            colors: series_colors(&by_weather, Dimension::Weather),
            data: ChartData::Groups(by_weather),
        },
        ChartSpec {
            id: "rush_hour_share",
            kind: ChartKind::Pie,
            title: "Share of rentals in busy vs. quiet hours",
            x_label: "Rush hour",
            y_label: "Share",
            colors: series_colors(&by_rush_hour, Dimension::RushHour),
            data: ChartData::Shares(by_rush_hour.shares()),
        },
        ChartSpec {
            id: "daily_by_season",
            kind: ChartKind::Line,
            title: "Daily rentals per season",
            x_label: "Date",
            y_label: "Rentals",
            colors: series_colors(&daily_by_season, Dimension::Season),
            data: ChartData::Groups(daily_by_season),
        },
        ChartSpec {
            id: "monthly_by_weather",
            kind: ChartKind::Bar,
            title: "Monthly rentals by weather condition",
            x_label: "Month",
            y_label: "Rentals",
            colors: series_colors(&monthly_by_weather, Dimension::Weather),
            data: ChartData::Groups(monthly_by_weather),
        },
    ];

    Dashboard {
        total_records: state.dataset().len(),
        visible_records: state.visible_indices().len(),
        filters: state.filters().clone(),
        available: state.dataset().unique_values().clone(),
        charts,
        rows: Vec::new(),
    }
}

/// Colours for the key component that belongs to `series`.
fn series_colors(result: &AggregationResult, series: Dimension) -> BTreeMap<String, String> {
    let Some(pos) = result.group_by.dimensions().iter().position(|d| *d == series) else {
        return BTreeMap::new();
    };
    color_map(result.rows.iter().filter_map(|r| {
        let component = if pos == 0 { Some(r.key.first) } else { r.key.second };
        component.map(|k| k.to_string())
    }))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::NaiveDate;

    use super::*;
    use crate::data::model::{BikeDataset, DayOfWeek, DayType, Record, RushHour, Season, Weather};

    fn state() -> DashboardState {
        let mk = |day: u32, hour: u8, season, weather, working, cnt| {
            let date = NaiveDate::from_ymd_opt(2011, 6, day).unwrap();
            Record {
                date,
                hour,
                season,
                weather,
                holiday: false,
                day_type: DayType::from_flag(working),
                weekday: DayOfWeek::of_date(date),
                casual: 0,
                registered: cnt,
                cnt,
                month: 6,
                rush_hour: RushHour::from_hour(hour),
            }
        };
        DashboardState::new(BikeDataset::from_records(vec![
            mk(1, 8, Season::Summer, Weather::Clear, true, 100),
            mk(1, 22, Season::Summer, Weather::Mist, true, 20),
            mk(4, 12, Season::Fall, Weather::Clear, false, 60),
        ]))
    }

    #[test]
    fn dashboard_has_every_chart() {
        let dash = build_dashboard(&state());
        let ids: Vec<_> = dash.charts.iter().map(|c| c.id).collect();
        assert_eq!(
            ids,
            vec![
                "season_totals",
                "hourly_mean",
                "day_type_box",
                "weather_totals",
                "rush_hour_share",
                "daily_by_season",
                "monthly_by_weather"
            ]
        );
        assert_eq!(dash.total_records, 3);
        assert_eq!(dash.visible_records, 3);
        assert_eq!(dash.available.seasons, BTreeSet::from([Season::Summer, Season::Fall]));
        assert_eq!(dash.available.hours, BTreeSet::from([8, 12, 22]));

        let season = dash.chart("season_totals").unwrap();
        assert_eq!(season.colors.len(), 2);
        match &season.data {
            ChartData::Groups(g) => assert_eq!(g.total(), 180),
            other => panic!("unexpected data {other:?}"),
        }
    }

    #[test]
    fn empty_selection_yields_empty_charts_but_full_box_plot() {
        let mut state = state();
        state.toggle_weather(Weather::HeavyRain);
        let dash = build_dashboard(&state);
        assert_eq!(dash.visible_records, 0);
        for chart in &dash.charts {
            if chart.id == "day_type_box" {
                assert!(!chart.data.is_empty());
            } else {
                assert!(chart.data.is_empty(), "{} should be empty", chart.id);
            }
        }
    }

    #[test]
    fn rows_follow_the_filtered_view() {
        let mut state = state();
        let dash = build_dashboard(&state);
        assert!(dash.rows.is_empty());
        let json = serde_json::to_value(&dash).unwrap();
        assert!(json.get("rows").is_none());

        state.toggle_season(Season::Summer);
        let dash = build_dashboard(&state).with_rows(&state, 1);
        assert_eq!(dash.rows.len(), 1);
        assert_eq!(dash.rows[0].hour, 8);

        let dash = build_dashboard(&state).with_rows(&state, 10);
        let hours: Vec<_> = dash.rows.iter().map(|r| r.hour).collect();
        assert_eq!(hours, vec![8, 22]);
        let json = serde_json::to_value(&dash).unwrap();
        assert_eq!(json["rows"][1]["cnt"], 20);
    }

    #[test]
    fn composite_chart_colours_follow_series_dimension() {
        let dash = build_dashboard(&state());
        let monthly = dash.chart("monthly_by_weather").unwrap();
        let labels: Vec<_> = monthly.colors.keys().cloned().collect();
        assert_eq!(labels, vec!["Clear/Partly cloudy", "Mist/Cloudy"]);
    }
}
