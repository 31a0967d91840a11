use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// 文档抽取失败 - 不创建单据, 用户可重试
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("extraction service not configured")]
    NotConfigured,

    #[error("extraction request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("extraction service returned status {0}")]
    Status(u16),

    #[error("extraction service returned no data")]
    EmptyResponse,

    #[error("extraction payload is not valid JSON: {0}")]
    MalformedPayload(String),

    #[error("extraction payload has no products")]
    MissingProducts,

    #[error("file too large: {size} bytes (max {max})")]
    FileTooLarge { size: usize, max: usize },

    #[error("physical count sheet unreadable: {0}")]
    InvalidSheet(String),
}

/// 存储操作失败 - 内存状态已乐观更新, 仅需通知用户
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store operation timed out")]
    Timeout,
}

/// 应用错误
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("{0} not found")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("export error: {0}")]
    Export(String),
}

impl From<csv::Error> for AppError {
    fn from(e: csv::Error) -> Self {
        AppError::Export(e.to_string())
    }
}

/// 错误响应体
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub code: &'static str,
    pub message: String,
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Extraction(ExtractionError::FileTooLarge { .. }) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "FILE_TOO_LARGE")
            }
            AppError::Extraction(ExtractionError::InvalidSheet(_)) => {
                (StatusCode::BAD_REQUEST, "INVALID_SHEET")
            }
            AppError::Extraction(_) => (StatusCode::BAD_GATEWAY, "EXTRACTION_ERROR"),
            AppError::Persistence(_) => (StatusCode::SERVICE_UNAVAILABLE, "PERSISTENCE_ERROR"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIGURATION_ERROR"),
            AppError::Export(_) => (StatusCode::UNPROCESSABLE_ENTITY, "EXPORT_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::warn!("Request rejected: {}", self);
        }
        let body = ErrorResponse {
            success: false,
            code,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
