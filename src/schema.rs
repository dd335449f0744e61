use crate::confidence::Confidence;
use chrono::NaiveDateTime;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

pub const MONTH_COLUMN: &str = "Month";
pub const CONSUMPTION_COLUMN: &str = "Consumption_KWh";
pub const BILL_COLUMN: &str = "Bill_Amount";

/// Columns every upload must carry (case-exact).
pub const REQUIRED_COLUMNS: [&str; 3] = [MONTH_COLUMN, CONSUMPTION_COLUMN, BILL_COLUMN];

/// Sidecar persisted next to the trained model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct ModelMetadata {
    #[schemars(description = "Trailing average cost per kWh over the last three months")]
    pub avg_rate_per_kwh: f64,

    #[schemars(description = "UTC timestamp of the last training run, absent if never trained")]
    pub last_training_date: Option<NaiveDateTime>,
}

/// A cleaned row as returned by `/upload` and `/history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UsageRow {
    #[serde(rename = "Month")]
    #[schemars(description = "Month formatted as abbreviated month and two-digit year, e.g. Jan-24")]
    pub month: String,

    #[serde(rename = "Consumption_KWh")]
    pub consumption_kwh: f64,

    #[serde(rename = "Bill_Amount")]
    pub bill_amount: f64,
}

/// A historical or forecast point as returned by `/forecast`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SeriesRow {
    pub month: String,
    pub consumption: f64,
    pub bill: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UploadResponse {
    pub message: String,
    pub rows: Vec<UsageRow>,
    pub status: String,
    pub metadata: ModelMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct ForecastResponse {
    pub actual: Vec<SeriesRow>,
    pub forecast: Vec<SeriesRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct PredictRequest {
    /// `None` only when the key is absent. Non-string values are kept as
    /// their JSON text so `202401` is parsed like `"202401"`; `null` becomes
    /// an empty string and fails month parsing.
    #[serde(default, deserialize_with = "month_as_text")]
    #[schemars(
        with = "Option<String>",
        description = "Target month in any accepted month format (e.g. Jan-25, 2025-01)"
    )]
    pub month: Option<String>,
}

fn month_as_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(Some(match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(text) => text,
        other => other.to_string(),
    }))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PredictionResponse {
    #[schemars(description = "The month exactly as the caller sent it")]
    pub month: String,
    pub predicted_consumption: f64,
    pub predicted_bill: f64,
    pub confidence: Confidence,
    pub model_used: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct InsightsReport {
    pub average_consumption: f64,
    pub peak_month: String,
    pub peak_value: f64,
    pub lowest_month: String,
    pub lowest_value: f64,
    pub total_bill: f64,
    pub avg_rate_per_kwh: f64,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum InsightsResponse {
    Report(InsightsReport),
    Empty { message: String },
}

pub fn generate_json_schema<T: JsonSchema>() -> schemars::schema::RootSchema {
    schemars::schema_for!(T)
}

pub fn schema_as_json<T: JsonSchema>() -> Result<String, serde_json::Error> {
    let schema = generate_json_schema::<T>();
    serde_json::to_string_pretty(&schema)
}
