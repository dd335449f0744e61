use crate::error::EnergyForecastError;
use crate::schema::{
    ForecastResponse, InsightsResponse, PredictRequest, PredictionResponse, UploadResponse,
    UsageRow,
};
use crate::service::ForecastService;
use axum::{
    body::Bytes,
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorBody {
                message: msg.into(),
                status: None,
            },
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorBody {
                message: msg.into(),
                status: None,
            },
        }
    }

    /// Upload errors also carry `"status": "error"`.
    fn for_upload(mut self) -> Self {
        self.body.status = Some("error".to_string());
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<EnergyForecastError> for ApiError {
    fn from(err: EnergyForecastError) -> Self {
        if err.is_client_error() {
            tracing::debug!("Rejected request: {}", err);
            Self::bad_request(err.to_string())
        } else {
            tracing::error!("Internal error: {:?}", err);
            Self::internal(err.to_string())
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ForecastService>,
}

pub fn router(service: Arc<ForecastService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/upload", post(upload))
        .route("/forecast", get(forecast))
        .route("/predict", post(predict))
        .route("/insights", get(insights))
        .route("/history", get(history))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { service })
}

/// Runs a service call on the blocking pool; fitting and file access are synchronous.
async fn run_blocking<T, F>(state: &AppState, call: F) -> Result<T, ApiError>
where
    F: FnOnce(&ForecastService) -> crate::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let service = state.service.clone();
    tokio::task::spawn_blocking(move || call(&service))
        .await
        .map_err(|e| ApiError::internal(format!("Worker failed: {e}")))?
        .map_err(ApiError::from)
}

async fn upload(
    State(state): State<AppState>,
    multipart: Option<Multipart>,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut upload: Option<(String, Bytes)> = None;

    if let Some(mut multipart) = multipart {
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(e.to_string()).for_upload())?
        {
            if field.name() != Some("file") {
                continue;
            }
            let file_name = field.file_name().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(e.to_string()).for_upload())?;
            upload = Some((file_name, bytes));
            break;
        }
    }

    let Some((file_name, bytes)) = upload else {
        return Err(ApiError::bad_request("No file uploaded").for_upload());
    };
    if file_name.is_empty() {
        return Err(ApiError::bad_request("No file selected").for_upload());
    }

    run_blocking(&state, move |service| service.upload(&file_name, &bytes))
        .await
        .map(Json)
        .map_err(ApiError::for_upload)
}

async fn forecast(State(state): State<AppState>) -> Result<Json<ForecastResponse>, ApiError> {
    run_blocking(&state, |service| service.forecast())
        .await
        .map(Json)
}

async fn predict(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<PredictionResponse>, ApiError> {
    // Malformed or non-JSON bodies are treated as an empty request. A present
    // `month` of any JSON type is stringified and parsed.
    let request: PredictRequest = serde_json::from_slice(&body).unwrap_or_default();
    run_blocking(&state, move |service| service.predict(request.month.as_deref()))
        .await
        .map(Json)
}

async fn insights(State(state): State<AppState>) -> Result<Json<InsightsResponse>, ApiError> {
    run_blocking(&state, |service| service.insights())
        .await
        .map(Json)
}

async fn history(State(state): State<AppState>) -> Result<Json<Vec<UsageRow>>, ApiError> {
    run_blocking(&state, |service| service.history())
        .await
        .map(Json)
}
