//! # Energy Forecaster
//!
//! A library for turning uploaded monthly utility records into a clean,
//! gap-free monthly series, forecasting future consumption and converting it
//! to expected bills.
//!
//! ## Core Concepts
//!
//! - **Canonical month**: every record is keyed by the first day of its month
//! - **Cleaning**: month normalization, numeric coercion, reindexing onto a
//!   complete monthly calendar and linear gap-filling
//! - **Trailing rate**: average bill per kWh over the last three months, used to
//!   price forecast consumption
//! - **Model selection**: a seasonal ARIMA model with a 12-month period,
//!   degrading to a linear trend when the history cannot support it
//! - **Model store**: persisted dataset, model and metadata with a single writer
//!   and a model cache keyed by a hash of the dataset
//!
//! ## Example
//!
//! ```rust,ignore
//! use energy_forecaster::*;
//!
//! let csv = "Month,Consumption_KWh,Bill_Amount\nJan-24,320,48\nMar-24,300,45\n";
//! let result = process_usage_csv(csv.as_bytes(), 6).unwrap();
//!
//! for point in &result.forecast {
//!     println!("{} {:.1} kWh -> {:.2}", format_month(point.month), point.consumption, point.bill);
//! }
//! ```
//!
//! With the `server` feature the same operations are exposed over HTTP by the
//! `energy-server` binary.

pub mod confidence;
pub mod config;
pub mod engine;
pub mod error;
pub mod ingestion;
pub mod insights;
pub mod model;
pub mod rates;
pub mod sarima;
pub mod schema;
pub mod service;
pub mod store;
pub mod trend;
pub mod utils;

#[cfg(feature = "server")]
pub mod server;

pub use confidence::{compute_confidence, Confidence};
pub use config::{ServerConfig, StoreConfig};
pub use engine::{clean_dataset, fill_gaps, restore_series, to_raw_table};
pub use error::{EnergyForecastError, Result};
pub use ingestion::{read_csv_table, write_csv_table, RawTable};
pub use model::{forecast_consumption, train_model, TrainedModel};
pub use rates::{compute_avg_rate, estimate_bill};
pub use schema::*;
pub use service::ForecastService;
pub use store::ModelStore;
pub use utils::*;

use chrono::NaiveDate;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataOrigin {
    /// Present in the uploaded table
    Observed,
    /// Filled in by gap-filling between observed months
    Interpolated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsagePoint {
    pub consumption: f64,
    pub bill_amount: f64,
    pub origin: DataOrigin,
}

/// A cleaned dataset keyed by canonical month.
pub type UsageSeries = BTreeMap<NaiveDate, UsagePoint>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub month: NaiveDate,
    pub consumption: f64,
    pub bill: f64,
}

/// Everything one pass of the pipeline produces.
#[derive(Debug, Clone)]
pub struct UsageForecast {
    pub series: UsageSeries,
    pub model: TrainedModel,
    pub metadata: ModelMetadata,
    pub forecast: Vec<ForecastPoint>,
}

/// Clean → train → forecast entirely in memory, with no persistence.
pub struct EnergyForecastPipeline;

impl EnergyForecastPipeline {
    pub fn process(table: &RawTable, horizon: usize) -> Result<UsageForecast> {
        info!(
            "Processing usage table with {} rows, horizon {} months",
            table.len(),
            horizon
        );

        let series = clean_dataset(table)?;
        let (model, metadata) = train_model(&series);
        let consumption = forecast_consumption(&series, &model, horizon)?;

        let forecast = match series.keys().next_back() {
            Some(&last) => future_months(last, horizon)
                .into_iter()
                .zip(consumption)
                .map(|(month, value)| ForecastPoint {
                    month,
                    consumption: value,
                    bill: estimate_bill(value, metadata.avg_rate_per_kwh),
                })
                .collect(),
            None => Vec::new(),
        };

        debug!(
            "Pipeline used {} model and produced {} forecast months",
            model.kind(),
            forecast.len()
        );

        Ok(UsageForecast {
            series,
            model,
            metadata,
            forecast,
        })
    }
}

pub fn process_usage_table(table: &RawTable, horizon: usize) -> Result<UsageForecast> {
    EnergyForecastPipeline::process(table, horizon)
}

pub fn process_usage_csv<R: Read>(reader: R, horizon: usize) -> Result<UsageForecast> {
    let table = read_csv_table(reader)?;
    EnergyForecastPipeline::process(&table, horizon)
}
