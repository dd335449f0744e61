//! The operations behind each HTTP route, independent of any web framework.

use crate::confidence::compute_confidence;
use crate::config::StoreConfig;
use crate::engine::clean_dataset;
use crate::error::{EnergyForecastError, Result};
use crate::ingestion::read_csv_table;
use crate::insights::summarize;
use crate::model::forecast_consumption;
use crate::rates::estimate_bill;
use crate::schema::{
    ForecastResponse, InsightsResponse, PredictionResponse, SeriesRow, UploadResponse, UsageRow,
};
use crate::store::ModelStore;
use crate::utils::{format_month, future_months, months_between, parse_month, round_to};
use crate::UsageSeries;
use log::info;

pub const DEFAULT_FORECAST_HORIZON: usize = 6;

pub struct ForecastService {
    store: ModelStore,
    forecast_horizon: usize,
}

impl ForecastService {
    pub fn new(store: ModelStore, forecast_horizon: usize) -> Self {
        Self {
            store,
            forecast_horizon: forecast_horizon.max(1),
        }
    }

    /// Opens a store at `config` with the default six-month horizon.
    pub fn open(config: StoreConfig) -> Result<Self> {
        Ok(Self::new(ModelStore::open(config)?, DEFAULT_FORECAST_HORIZON))
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    pub fn forecast_horizon(&self) -> usize {
        self.forecast_horizon
    }

    /// Archives, cleans and stores an uploaded CSV, then retrains.
    ///
    /// Any parsing or validation failure leaves the stored dataset as it was.
    pub fn upload(&self, file_name: &str, bytes: &[u8]) -> Result<UploadResponse> {
        self.store.archive_upload(file_name, bytes)?;

        let table = read_csv_table(bytes)?;
        let cleaned = clean_dataset(&table)?;
        let (_, metadata) = self.store.replace_dataset(&cleaned)?;

        info!("Upload {} accepted with {} months", file_name, cleaned.len());

        Ok(UploadResponse {
            message: "Upload successful".to_string(),
            rows: usage_rows(&cleaned),
            status: "success".to_string(),
            metadata,
        })
    }

    /// History plus the configured number of forecast months.
    pub fn forecast(&self) -> Result<ForecastResponse> {
        self.forecast_months(self.forecast_horizon)
    }

    pub fn forecast_months(&self, horizon: usize) -> Result<ForecastResponse> {
        let (series, model, metadata) = self.store.trained_snapshot()?;
        let Some(last_month) = series.keys().next_back().copied() else {
            return Ok(ForecastResponse::default());
        };

        let consumption = forecast_consumption(&series, &model, horizon)?;

        let forecast = future_months(last_month, horizon)
            .into_iter()
            .zip(consumption)
            .map(|(month, value)| SeriesRow {
                month: format_month(month),
                consumption: round_to(value, 2),
                bill: round_to(estimate_bill(value, metadata.avg_rate_per_kwh), 2),
            })
            .collect();

        let actual = series
            .iter()
            .map(|(month, point)| SeriesRow {
                month: format_month(*month),
                consumption: point.consumption,
                bill: point.bill_amount,
            })
            .collect();

        Ok(ForecastResponse { actual, forecast })
    }

    /// Predicts consumption and bill for a single month.
    ///
    /// Months before the last observed month return the recorded value (or
    /// the last one when the month is not on record) with distance 0. The
    /// last observed month itself is treated as 0 months ahead and receives
    /// the one-step forecast.
    pub fn predict(&self, month: Option<&str>) -> Result<PredictionResponse> {
        let raw = month.ok_or(EnergyForecastError::MonthRequired)?;
        let target = parse_month(raw)?;

        let (series, model, metadata) = self.store.trained_snapshot()?;
        let Some((&last_month, last_point)) = series.iter().next_back() else {
            return Err(EnergyForecastError::NoData);
        };

        let distance = months_between(last_month, target);
        let (consumption, months_ahead) = if distance < 0 {
            let recorded = series.get(&target).unwrap_or(last_point);
            (recorded.consumption, 0)
        } else {
            let steps = distance as usize + 1;
            let forecast = forecast_consumption(&series, &model, steps)?;
            let value = forecast.last().copied().unwrap_or(last_point.consumption);
            (value, distance as u32)
        };

        Ok(PredictionResponse {
            month: raw.to_string(),
            predicted_consumption: round_to(consumption, 2),
            predicted_bill: round_to(estimate_bill(consumption, metadata.avg_rate_per_kwh), 2),
            confidence: compute_confidence(months_ahead),
            model_used: model.model_name().to_string(),
        })
    }

    pub fn insights(&self) -> Result<InsightsResponse> {
        let series = self.store.load_dataset()?;
        Ok(match summarize(&series) {
            Some(report) => InsightsResponse::Report(report),
            None => InsightsResponse::Empty {
                message: EnergyForecastError::NoData.to_string(),
            },
        })
    }

    pub fn history(&self) -> Result<Vec<UsageRow>> {
        Ok(usage_rows(&self.store.load_dataset()?))
    }
}

fn usage_rows(series: &UsageSeries) -> Vec<UsageRow> {
    series
        .iter()
        .map(|(month, point)| UsageRow {
            month: format_month(*month),
            consumption_kwh: point.consumption,
            bill_amount: point.bill_amount,
        })
        .collect()
}
