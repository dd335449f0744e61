use crate::error::{EnergyForecastError, Result};
use crate::rates::compute_avg_rate;
use crate::sarima::{fit_seasonal, SeasonalModel};
use crate::schema::ModelMetadata;
use crate::trend::LinearTrend;
use crate::UsageSeries;
use chrono::Utc;
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// The live forecasting model. Persisted as JSON tagged by `model_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model_type", rename_all = "snake_case")]
pub enum TrainedModel {
    /// Trained on an empty dataset.
    None,
    Sarima(SeasonalModel),
    Linear(LinearTrend),
}

impl TrainedModel {
    pub fn kind(&self) -> &'static str {
        match self {
            TrainedModel::None => "none",
            TrainedModel::Sarima(_) => "sarima",
            TrainedModel::Linear(_) => "linear",
        }
    }

    /// Label reported to API callers alongside predictions.
    pub fn model_name(&self) -> &'static str {
        match self {
            TrainedModel::None => "Last Known Value + Rate per kWh Estimation",
            TrainedModel::Sarima(_) => "SARIMA(1,1,1)(1,1,1,12) + Rate per kWh Estimation",
            TrainedModel::Linear(_) => "Linear Trend + Rate per kWh Estimation",
        }
    }
}

/// Fits the best available model to the consumption series.
///
/// The seasonal model is tried first; any fit failure falls back to a linear
/// trend. Series shorter than [`crate::sarima::MIN_OBSERVATIONS`] months
/// never reach the seasonal estimator. An empty series yields
/// [`TrainedModel::None`] with a zero rate.
pub fn train_model(series: &UsageSeries) -> (TrainedModel, ModelMetadata) {
    let trained_at = Some(Utc::now().naive_utc());

    if series.is_empty() {
        info!("Training on empty dataset; no model fitted");
        return (
            TrainedModel::None,
            ModelMetadata {
                avg_rate_per_kwh: 0.0,
                last_training_date: trained_at,
            },
        );
    }

    let avg_rate = compute_avg_rate(series);
    let consumption: Vec<f64> = series.values().map(|p| p.consumption).collect();

    let model = match fit_seasonal(&consumption) {
        Ok(seasonal) => TrainedModel::Sarima(seasonal),
        Err(failure) => {
            warn!("Seasonal fit failed ({}); using linear trend", failure);
            TrainedModel::Linear(LinearTrend::fit(&consumption))
        }
    };

    info!(
        "Trained {} model on {} months (avg rate {:.4})",
        model.kind(),
        consumption.len(),
        avg_rate
    );

    (
        model,
        ModelMetadata {
            avg_rate_per_kwh: avg_rate,
            last_training_date: trained_at,
        },
    )
}

/// Forecasts `horizon` months of consumption following the last month of
/// `series`.
pub fn forecast_consumption(
    series: &UsageSeries,
    model: &TrainedModel,
    horizon: usize,
) -> Result<Vec<f64>> {
    if horizon == 0 {
        return Err(EnergyForecastError::InvalidHorizon(horizon));
    }

    let Some(last) = series.values().next_back() else {
        return Ok(vec![0.0; horizon]);
    };

    let values = match model {
        TrainedModel::Sarima(seasonal) => seasonal.forecast(horizon)?,
        TrainedModel::Linear(trend) => trend.forecast(horizon),
        TrainedModel::None => vec![last.consumption; horizon],
    };

    Ok(values)
}
