use thiserror::Error;

/// Failures at the edges of the dashboard: reading exports, writing reports
/// and loading configuration. The filtering core itself never fails.
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config error: {0}")]
    Config(#[from] ::config::ConfigError),
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },
    #[error("missing column `{column}` in input file")]
    MissingColumn { column: String },
}

impl DashboardError {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    pub fn missing_column(column: impl Into<String>) -> Self {
        Self::MissingColumn {
            column: column.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;
