//! Seasonal ARIMA(1,1,1)(1,1,1)_12 backed by `anofox_forecast`.
//!
//! The persisted form keeps only the training series. The estimator is
//! deterministic, so forecasting refits on that series and gets the same
//! coefficients the trainer accepted.

use anofox_forecast::core::TimeSeries;
use anofox_forecast::error::ForecastError;
use anofox_forecast::models::arima::SARIMA;
use anofox_forecast::models::Forecaster;
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::utils::add_months;

pub const SEASONAL_PERIOD: usize = 12;

/// Observations consumed by the lag-1 and lag-12 differences.
pub const DIFFERENCING_LAG: usize = SEASONAL_PERIOD + 1;

/// Fewest observations handed to the estimator: at least one value must
/// survive both differences. Longer series are accepted or rejected by the
/// estimator itself.
pub const MIN_OBSERVATIONS: usize = DIFFERENCING_LAG + 1;

/// Why a seasonal fit was rejected. The trainer answers every variant with the
/// linear fallback.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FitFailure {
    #[error("insufficient data: {observations} observations, need at least {required}")]
    InsufficientData {
        observations: usize,
        required: usize,
    },

    #[error("estimator rejected the series: {0}")]
    Estimator(String),

    #[error("fitted model produced non-finite values")]
    NonFinite,
}

impl From<ForecastError> for FitFailure {
    fn from(err: ForecastError) -> Self {
        match err {
            ForecastError::InsufficientData { needed, got } => FitFailure::InsufficientData {
                observations: got,
                required: needed,
            },
            other => FitFailure::Estimator(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalModel {
    /// Sum of squared in-sample residuals at the accepted fit.
    pub css: f64,
    /// Training series the model is refitted on.
    pub history: Vec<f64>,
}

/// Monthly UTC timestamps for `len` observations. Only the spacing matters to
/// the estimator.
fn monthly_timestamps(len: usize) -> Vec<chrono::DateTime<Utc>> {
    let epoch = NaiveDate::default();
    (0..len)
        .map(|i| Utc.from_utc_datetime(&add_months(epoch, i as i32).and_time(NaiveTime::MIN)))
        .collect()
}

fn estimate(y: &[f64]) -> Result<SARIMA, FitFailure> {
    let series = TimeSeries::univariate(monthly_timestamps(y.len()), y.to_vec())?;
    let mut model = SARIMA::new(1, 1, 1, 1, 1, 1, SEASONAL_PERIOD);
    model.fit(&series)?;
    Ok(model)
}

fn predict(model: &SARIMA, horizon: usize) -> Result<Vec<f64>, FitFailure> {
    let forecast = model.predict(horizon)?;
    let values = forecast.primary().to_vec();
    if values.iter().any(|v| !v.is_finite()) {
        return Err(FitFailure::NonFinite);
    }
    Ok(values)
}

/// Fits the seasonal model to a monthly series.
pub fn fit_seasonal(y: &[f64]) -> Result<SeasonalModel, FitFailure> {
    if y.len() < MIN_OBSERVATIONS {
        return Err(FitFailure::InsufficientData {
            observations: y.len(),
            required: MIN_OBSERVATIONS,
        });
    }
    if y.iter().any(|v| !v.is_finite()) {
        return Err(FitFailure::NonFinite);
    }

    let model = estimate(y)?;
    // A fit that cannot produce a finite first season is no better than none.
    predict(&model, SEASONAL_PERIOD)?;

    let css = model
        .residuals()
        .map(|r| r.iter().filter(|e| e.is_finite()).map(|e| e * e).sum::<f64>())
        .unwrap_or(0.0);
    debug!("Seasonal fit on {} months: css={:.4}", y.len(), css);

    Ok(SeasonalModel {
        css,
        history: y.to_vec(),
    })
}

impl SeasonalModel {
    /// Forecast of the next `horizon` levels after the history.
    pub fn forecast(&self, horizon: usize) -> Result<Vec<f64>, FitFailure> {
        if horizon == 0 {
            return Ok(Vec::new());
        }
        let model = estimate(&self.history)?;
        predict(&model, horizon)
    }
}
