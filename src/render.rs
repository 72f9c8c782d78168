use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, StringArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;

use crate::charts::{ChartData, ChartSpec, Dashboard};
use crate::data::aggregate::Reduction;
use crate::data::filter::FilterSpec;
use crate::data::model::Record;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// One pretty-printed table per chart.
    #[default]
    Table,
    /// The whole dashboard as JSON.
    Json,
}

pub fn render(dashboard: &Dashboard, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Table => render_tables(dashboard),
        OutputFormat::Json => {
            serde_json::to_string_pretty(dashboard).context("serializing dashboard")
        }
    }
}

// ---------------------------------------------------------------------------
// Text tables
// ---------------------------------------------------------------------------

fn render_tables(dashboard: &Dashboard) -> Result<String> {
    let mut out = String::new();
    writeln!(
        out,
        "Showing {} of {} records ({})",
        dashboard.visible_records,
        dashboard.total_records,
        describe_filters(&dashboard.filters)
    )?;

    for chart in &dashboard.charts {
        let batch = chart_batch(chart)
            .with_context(|| format!("building table for chart '{}'", chart.id))?;
        let table = pretty_format_batches(&[batch])
            .with_context(|| format!("formatting chart '{}'", chart.id))?;
        writeln!(out, "\n{} [{:?}]", chart.title, chart.kind)?;
        writeln!(out, "{table}")?;
    }

    if !dashboard.rows.is_empty() {
        let table = pretty_format_batches(&[records_batch(&dashboard.rows)?])
            .context("formatting filtered records")?;
        writeln!(
            out,
            "\nFiltered records (first {} of {})",
            dashboard.rows.len(),
            dashboard.visible_records
        )?;
        writeln!(out, "{table}")?;
    }
    Ok(out)
}

/// Human-readable summary of the active filters.
pub fn describe_filters(spec: &FilterSpec) -> String {
    fn list<T: ToString>(values: impl IntoIterator<Item = T>) -> Option<String> {
        let parts: Vec<String> = values.into_iter().map(|v| v.to_string()).collect();
        (!parts.is_empty()).then(|| parts.join(", "))
    }

    let parts: Vec<String> = [
        ("seasons", list(&spec.seasons)),
        ("hours", list(&spec.hours)),
        ("weather", list(&spec.weather)),
        ("days", list(&spec.days)),
        ("day type", spec.day_type.map(|t| t.to_string())),
    ]
    .into_iter()
    .filter_map(|(name, values)| values.map(|v| format!("{name}: {v}")))
    .collect();

    if parts.is_empty() {
        "no filters".to_string()
    } else {
        parts.join("; ")
    }
}

/// Lay a chart's summary out as an Arrow record batch.
pub fn chart_batch(chart: &ChartSpec) -> Result<RecordBatch> {
    let mut fields = Vec::new();
    let mut columns: Vec<ArrayRef> = Vec::new();
    let mut push = |name: &str, data_type: DataType, array: ArrayRef| {
        fields.push(Field::new(name, data_type, false));
        columns.push(array);
    };

    match &chart.data {
        ChartData::Groups(result) => {
            let dims = result.group_by.dimensions();
            push(
                dims[0].label(),
                DataType::Utf8,
                strings(result.rows.iter().map(|r| r.key.first.to_string())),
            );
            if let Some(second) = dims.get(1) {
                push(
                    second.label(),
                    DataType::Utf8,
                    strings(result.rows.iter().map(|r| {
                        r.key.second.map(|k| k.to_string()).unwrap_or_default()
                    })),
                );
            }
            push(
                "records",
                DataType::UInt64,
                uints(result.rows.iter().map(|r| r.count as u64)),
            );
            push(
                result.metric.label(),
                DataType::UInt64,
                uints(result.rows.iter().map(|r| r.sum)),
            );
            if result.reduction == Reduction::Mean {
                let name = format!("{} {}", result.reduction.label(), result.metric.label());
                push(name.as_str(), DataType::Float64, floats(result.rows.iter().map(|r| r.value)));
            }
        }
        ChartData::Boxes(boxes) => {
            push(
                chart.x_label,
                DataType::Utf8,
                strings(boxes.iter().map(|b| b.key.to_string())),
            );
            push(
                "records",
                DataType::UInt64,
                uints(boxes.iter().map(|b| b.count as u64)),
            );
            push("min", DataType::Float64, floats(boxes.iter().map(|b| b.min)));
            push("q1", DataType::Float64, floats(boxes.iter().map(|b| b.q1)));
            push("median", DataType::Float64, floats(boxes.iter().map(|b| b.median)));
            push("q3", DataType::Float64, floats(boxes.iter().map(|b| b.q3)));
            push("max", DataType::Float64, floats(boxes.iter().map(|b| b.max)));
        }
        ChartData::Shares(shares) => {
            push(
                chart.x_label,
                DataType::Utf8,
                strings(shares.iter().map(|s| s.key.to_string())),
            );
            push("cnt", DataType::UInt64, uints(shares.iter().map(|s| s.sum)));
            push(
                "share",
                DataType::Float64,
                floats(shares.iter().map(|s| s.fraction)),
            );
        }
    }

    let schema = Arc::new(Schema::new(fields));
    RecordBatch::try_new(schema, columns).context("assembling record batch")
}

/// Lay records out with the source column names.
pub fn records_batch(records: &[Record]) -> Result<RecordBatch> {
    let text = |f: fn(&Record) -> String| strings(records.iter().map(f));
    let num = |f: fn(&Record) -> u64| uints(records.iter().map(f));
    let columns: Vec<(&str, ArrayRef)> = vec![
        ("dteday", text(|r| r.date.to_string())),
        ("hr", num(|r| u64::from(r.hour))),
        ("season", text(|r| r.season.to_string())),
        ("weathersit", text(|r| r.weather.to_string())),
        ("weekday", text(|r| r.weekday.to_string())),
        ("day type", text(|r| r.day_type.to_string())),
        ("holiday", text(|r| r.holiday.to_string())),
        ("casual", num(|r| u64::from(r.casual))),
        ("registered", num(|r| u64::from(r.registered))),
        ("cnt", num(|r| u64::from(r.cnt))),
    ];
    let schema = Arc::new(Schema::new(
        columns
            .iter()
            .map(|(name, array)| Field::new(*name, array.data_type().clone(), false))
            .collect::<Vec<_>>(),
    ));
    RecordBatch::try_new(schema, columns.into_iter().map(|(_, a)| a).collect())
        .context("assembling records batch")
}

fn strings(values: impl Iterator<Item = String>) -> ArrayRef {
    Arc::new(StringArray::from_iter_values(values))
}

fn uints(values: impl Iterator<Item = u64>) -> ArrayRef {
    Arc::new(UInt64Array::from_iter_values(values))
}

fn floats(values: impl Iterator<Item = f64>) -> ArrayRef {
    Arc::new(Float64Array::from_iter_values(values))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::NaiveDate;

    use super::*;
    use crate::charts::ChartKind;
    use crate::data::aggregate::{AggregationResult, Dimension, GroupBy, Metric};
    use crate::data::model::{DayOfWeek, DayType, RushHour, Season, Weather};

    fn empty_chart() -> ChartSpec {
        ChartSpec {
            id: "season_totals",
            kind: ChartKind::Bar,
            title: "Rentals by season",
            x_label: "Season",
            y_label: "Rentals",
            colors: BTreeMap::new(),
            data: ChartData::Groups(AggregationResult {
                group_by: GroupBy::Two(Dimension::Month, Dimension::Weather),
                metric: Metric::Total,
                reduction: Reduction::Mean,
                rows: Vec::new(),
            }),
        }
    }

    #[test]
    fn empty_chart_still_has_columns() {
        let batch = chart_batch(&empty_chart()).unwrap();
        assert_eq!(batch.num_rows(), 0);
        let names: Vec<_> = batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();
        assert_eq!(names, vec!["month", "weather", "records", "cnt", "mean cnt"]);
    }

    #[test]
    fn filters_are_described() {
        assert_eq!(describe_filters(&FilterSpec::default()), "no filters");
        let spec = FilterSpec {
            seasons: [Season::Spring, Season::Winter].into(),
            hours: [7, 8].into(),
            day_type: Some(DayType::Working),
            ..Default::default()
        };
        assert_eq!(
            describe_filters(&spec),
            "seasons: Spring, Winter; hours: 7, 8; day type: Working day"
        );
    }

    #[test]
    fn table_output_mentions_every_chart() {
        let dashboard = Dashboard {
            total_records: 0,
            visible_records: 0,
            filters: FilterSpec::default(),
            available: Default::default(),
            charts: vec![empty_chart()],
            rows: Vec::new(),
        };
        let text = render(&dashboard, OutputFormat::Table).unwrap();
        assert!(text.starts_with("Showing 0 of 0 records (no filters)"));
        assert!(text.contains("Rentals by season"));
        assert!(text.contains("mean cnt"));

        let json: serde_json::Value =
            serde_json::from_str(&render(&dashboard, OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(json["charts"][0]["data"]["type"], "groups");
        assert!(!text.contains("Filtered records"));
    }

    #[test]
    fn requested_rows_are_tabulated() {
        let date = NaiveDate::from_ymd_opt(2011, 1, 1).unwrap();
        let record = Record {
            date,
            hour: 0,
            season: Season::Spring,
            weather: Weather::Clear,
            holiday: false,
            day_type: DayType::Off,
            weekday: DayOfWeek::of_date(date),
            casual: 3,
            registered: 13,
            cnt: 16,
            month: 1,
            rush_hour: RushHour::from_hour(0),
        };
        let batch = records_batch(std::slice::from_ref(&record)).unwrap();
        assert_eq!(batch.num_rows(), 1);
        assert_eq!(batch.num_columns(), 10);

        let dashboard = Dashboard {
            total_records: 5,
            visible_records: 3,
            filters: FilterSpec::default(),
            available: Default::default(),
            charts: Vec::new(),
            rows: vec![record],
        };
        let text = render(&dashboard, OutputFormat::Table).unwrap();
        assert!(text.contains("Filtered records (first 1 of 3)"));
        assert!(text.contains("2011-01-01"));
        assert!(text.contains("registered"));
    }
}
