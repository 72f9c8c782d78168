use std::sync::Arc;

use arrow::array::{ArrayRef, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Datelike, NaiveDate};
use parquet::arrow::ArrowWriter;
use serde::Serialize;

/// One hourly row in the column layout of the public bike-sharing dataset.
#[derive(Debug, Clone, Serialize)]
struct SampleRow {
    instant: i64,
    dteday: String,
    season: i64,
    mnth: i64,
    hr: i64,
    holiday: i64,
    weekday: i64,
    workingday: i64,
    weathersit: i64,
    casual: i64,
    registered: i64,
    cnt: i64,
}

const HOLIDAYS: [(u32, u32); 6] = [(1, 17), (5, 30), (7, 4), (9, 5), (11, 24), (12, 26)];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// Season code by astronomical boundaries, as in the source dataset
/// (1 starts at the winter solstice).
fn season_of(date: NaiveDate) -> i64 {
    match (date.month(), date.day()) {
        (m, d) if (m, d) >= (12, 21) || (m, d) < (3, 21) => 1,
        (m, d) if (m, d) < (6, 21) => 2,
        (m, d) if (m, d) < (9, 23) => 3,
        _ => 4,
    }
}

/// Commuters peak at 8 and 17-18 on working days; leisure riders at midday.
fn hourly_profile(hour: u32, working: bool) -> (f64, f64) {
    let h = hour as f64;
    let bump = |centre: f64, width: f64| (-(h - centre).powi(2) / (2.0 * width * width)).exp();
    if working {
        let registered = 20.0 + 380.0 * bump(8.0, 1.0) + 420.0 * bump(17.5, 1.3) + 80.0 * bump(12.5, 2.0);
        let casual = 5.0 + 40.0 * bump(14.0, 3.0);
        (casual, registered)
    } else {
        let registered = 10.0 + 180.0 * bump(13.0, 3.5);
        let casual = 5.0 + 160.0 * bump(14.0, 3.0);
        (casual, registered)
    }
}

fn main() {
    let mut rng = SimpleRng::new(42);
    let mut rows = Vec::new();

    let start = NaiveDate::from_ymd_opt(2011, 1, 1).expect("valid start date");
    for date in start.iter_days().take_while(|d| d.year() == 2011) {
        let weekday = i64::from(date.weekday().num_days_from_sunday());
        let holiday = HOLIDAYS.contains(&(date.month(), date.day()));
        let working = (1..=5).contains(&weekday) && !holiday;
        let season = season_of(date);

        // Weather drifts through the day rather than jumping every hour.
        let mut weather: i64 = 1;
        for hour in 0..24u32 {
            let roll = rng.next_f64();
            weather = match roll {
                r if r < 0.70 => weather,
                r if r < 0.85 => 1,
                r if r < 0.95 => 2,
                r if r < 0.995 => 3,
                _ => 4,
            };
            let weather_factor = [1.0, 0.8, 0.45, 0.1][(weather - 1) as usize];
            let season_factor = [0.55, 1.0, 1.15, 0.9][(season - 1) as usize];

            let (casual_base, registered_base) = hourly_profile(hour, working);
            let noisy = |base: f64, rng: &mut SimpleRng| -> i64 {
                let v = base * weather_factor * season_factor;
                rng.gauss(v, v * 0.15).round().max(0.0) as i64
            };
            let casual = noisy(casual_base, &mut rng);
            let registered = noisy(registered_base, &mut rng);

            rows.push(SampleRow {
                instant: rows.len() as i64 + 1,
                dteday: date.format("%Y-%m-%d").to_string(),
                season,
                mnth: i64::from(date.month()),
                hr: i64::from(hour),
                holiday: i64::from(holiday),
                weekday,
                workingday: i64::from(working),
                weathersit: weather,
                casual,
                registered,
                cnt: casual + registered,
            });
        }
    }

    // ---- CSV ----
    let csv_path = "sample_bikes.csv";
    let mut writer = csv::Writer::from_path(csv_path).expect("Failed to create CSV file");
    for row in &rows {
        writer.serialize(row).expect("Failed to write CSV row");
    }
    writer.flush().expect("Failed to flush CSV writer");

    // ---- Parquet ----
    let ints = |f: fn(&SampleRow) -> i64| -> ArrayRef {
        Arc::new(Int64Array::from_iter_values(rows.iter().map(f)))
    };
    let schema = Arc::new(Schema::new(vec![
        Field::new("dteday", DataType::Utf8, false),
        Field::new("season", DataType::Int64, false),
        Field::new("hr", DataType::Int64, false),
        Field::new("holiday", DataType::Int64, false),
        Field::new("weekday", DataType::Int64, false),
        Field::new("workingday", DataType::Int64, false),
        Field::new("weathersit", DataType::Int64, false),
        Field::new("casual", DataType::Int64, false),
        Field::new("registered", DataType::Int64, false),
        Field::new("cnt", DataType::Int64, false),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.dteday.as_str()))),
            ints(|r| r.season),
            ints(|r| r.hr),
            ints(|r| r.holiday),
            ints(|r| r.weekday),
            ints(|r| r.workingday),
            ints(|r| r.weathersit),
            ints(|r| r.casual),
            ints(|r| r.registered),
            ints(|r| r.cnt),
        ],
    )
    .expect("Failed to create RecordBatch");

    let parquet_path = "sample_bikes.parquet";
    let file = std::fs::File::create(parquet_path).expect("Failed to create output file");
    let mut writer = ArrowWriter::try_new(file, schema, None).expect("Failed to create writer");
    writer.write(&batch).expect("Failed to write batch");
    writer.close().expect("Failed to close writer");

    println!(
        "Wrote {} hourly records to {csv_path} and {parquet_path}",
        rows.len()
    );
}
