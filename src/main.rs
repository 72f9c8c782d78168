use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use bike_dash::charts::build_dashboard;
use bike_dash::data::filter::FilterSpec;
use bike_dash::data::loader::load_file;
use bike_dash::data::model::{DayOfWeek, DayType, Season, Weather};
use bike_dash::render::{render, OutputFormat};
use bike_dash::state::DashboardState;

/// Summarise bike-sharing rentals by season, hour, weather and day.
#[derive(Debug, Parser)]
#[command(name = "bike-dash", version, about, long_about = None)]
struct Cli {
    /// Dataset to load (.csv, .json or .parquet)
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// JSON file with a saved filter selection; merged with the flags below
    #[arg(long, value_name = "JSON")]
    filters: Option<PathBuf>,

    /// Keep only these seasons (name or code 1-4); repeatable
    #[arg(long = "season", value_name = "SEASON")]
    seasons: Vec<Season>,

    /// Keep only these hours (0-23); repeatable
    #[arg(long = "hour", value_name = "HOUR", value_parser = clap::value_parser!(u8).range(0..=23))]
    hours: Vec<u8>,

    /// Keep only these weather conditions (name or code 1-4); repeatable
    #[arg(long = "weather", value_name = "WEATHER")]
    weather: Vec<Weather>,

    /// Keep only these days of the week (name, or 0 = Sunday .. 6 = Saturday); repeatable
    #[arg(long = "day", value_name = "DAY")]
    days: Vec<DayOfWeek>,

    /// Keep only working days or only weekends/holidays
    #[arg(long, value_name = "working|off")]
    day_type: Option<DayType>,

    /// Also list up to N of the matching records
    #[arg(long, value_name = "N", default_value_t = 0)]
    show_rows: usize,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

impl Cli {
    fn filter_spec(&self) -> Result<FilterSpec> {
        let mut spec = match &self.filters {
            Some(path) => read_filter_file(path)?,
            None => FilterSpec::default(),
        };
        spec.merge(FilterSpec {
            seasons: self.seasons.iter().copied().collect(),
            hours: self.hours.iter().copied().collect(),
            weather: self.weather.iter().copied().collect(),
            days: self.days.iter().copied().collect(),
            day_type: self.day_type,
        });
        spec.validate()?;
        Ok(spec)
    }
}

fn read_filter_file(path: &Path) -> Result<FilterSpec> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading filter file {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing filter file {}", path.display()))
}

fn run(cli: &Cli) -> Result<()> {
    let filters = cli.filter_spec()?;
    let loaded = load_file(&cli.input)?;
    if !loaded.issues.is_empty() {
        log::warn!(
            "{} row(s) of {} had validation issues",
            loaded.issues.len(),
            cli.input.display()
        );
    }

    let mut state = DashboardState::new(loaded.dataset);
    state.set_filters(filters);
    log::info!(
        "{} of {} records match the selection",
        state.visible_indices().len(),
        state.dataset().len()
    );

    let dashboard = build_dashboard(&state).with_rows(&state, cli.show_rows);
    print!("{}", render(&dashboard, cli.format)?);
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
