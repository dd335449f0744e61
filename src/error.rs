use crate::sarima::FitFailure;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnergyForecastError {
    #[error("Unrecognized month format: {0}")]
    InvalidMonthFormat(String),

    #[error("Missing columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Duplicate month in upload: {0}")]
    DuplicateMonth(String),

    #[error("Month is required")]
    MonthRequired,

    #[error("No data available")]
    NoData,

    #[error("Invalid forecast horizon {0}: must be at least 1 month")]
    InvalidHorizon(usize),

    #[error("Seasonal model error: {0}")]
    ModelError(#[from] FitFailure),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl EnergyForecastError {
    /// True for errors caused by the caller's input rather than the store.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidMonthFormat(_)
                | Self::MissingColumns(_)
                | Self::DuplicateMonth(_)
                | Self::MonthRequired
                | Self::NoData
                | Self::InvalidHorizon(_)
                | Self::CsvError(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, EnergyForecastError>;
