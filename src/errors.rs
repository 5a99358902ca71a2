use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Request-level failure taxonomy. Policy rejections are expected results
/// and carry a stable machine-readable `code`; database failures are fatal
/// for the request.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("{message}")]
    Validation { code: &'static str, message: String },

    #[error("{message}")]
    Entitlement {
        code: &'static str,
        message: String,
        remaining_minutes: Option<i64>,
    },

    #[error("{message}")]
    Conflict {
        code: &'static str,
        message: String,
        booking_id: Option<String>,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{message}")]
    InvalidState { code: &'static str, message: String },

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,
}

impl AppError {
    pub fn validation(code: &'static str, message: impl Into<String>) -> Self {
        AppError::Validation {
            code,
            message: message.into(),
        }
    }

    pub fn entitlement(code: &'static str, message: impl Into<String>) -> Self {
        AppError::Entitlement {
            code,
            message: message.into(),
            remaining_minutes: None,
        }
    }

    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        AppError::Conflict {
            code,
            message: message.into(),
            booking_id: None,
        }
    }

    pub fn invalid_state(code: &'static str, message: impl Into<String>) -> Self {
        AppError::InvalidState {
            code,
            message: message.into(),
        }
    }

    fn code(&self) -> &str {
        match self {
            AppError::Database(_) => "database_error",
            AppError::Internal(_) => "internal_error",
            AppError::Validation { code, .. } => code,
            AppError::Entitlement { code, .. } => code,
            AppError::Conflict { code, .. } => code,
            AppError::NotFound(_) => "not_found",
            AppError::InvalidState { code, .. } => code,
            AppError::Unauthorized => "unauthorized",
            AppError::Forbidden => "forbidden",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            // Daily-limit rejections are a quota problem, not a permission
            // problem; the rest of the entitlement family is 403.
            AppError::Entitlement { code, .. } => {
                if *code == "daily_limit_exceeded" {
                    StatusCode::BAD_REQUEST
                } else {
                    StatusCode::FORBIDDEN
                }
            }
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidState { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        // Query-layer failures are rusqlite errors wrapped with context;
        // surface them as generic internal failures.
        AppError::Internal(format!("{e:#}"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Don't leak driver-level detail to callers.
        let message = match &self {
            AppError::Database(e) => {
                tracing::error!("database error: {e}");
                "internal error".to_string()
            }
            AppError::Internal(e) => {
                tracing::error!("internal error: {e}");
                "internal error".to_string()
            }
            other => other.to_string(),
        };

        let mut body = serde_json::json!({
            "code": self.code(),
            "message": message,
        });
        if let AppError::Entitlement {
            remaining_minutes: Some(remaining),
            ..
        } = &self
        {
            body["remaining_minutes"] = serde_json::json!(remaining);
        }
        if let AppError::Conflict {
            booking_id: Some(id),
            ..
        } = &self
        {
            body["booking_id"] = serde_json::json!(id);
        }

        (status, axum::Json(serde_json::json!({ "error": body }))).into_response()
    }
}
