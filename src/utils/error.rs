use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Unauthorized(String),
    Forbidden(String),
    /// Saldo insuficiente. `status` distingue geração (402) de débito explícito (400).
    InsufficientCredits { credits: i64, status: StatusCode },
    InvalidRequest(String),
    NotFound(String),
    PaymentProvider(String),
    Generation { status: StatusCode, message: String },
    DatabaseError(String),
    Internal(String),
}

impl AppError {
    pub fn insufficient_credits(credits: i64) -> Self {
        AppError::InsufficientCredits {
            credits,
            status: StatusCode::BAD_REQUEST,
        }
    }

    pub fn payment_required(credits: i64) -> Self {
        AppError::InsufficientCredits {
            credits,
            status: StatusCode::PAYMENT_REQUIRED,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Unauthorized(msg) => write!(f, "{}", msg),
            AppError::Forbidden(msg) => write!(f, "{}", msg),
            AppError::InsufficientCredits { .. } => write!(f, "Insufficient credits"),
            AppError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::PaymentProvider(msg) => write!(f, "Payment provider error: {}", msg),
            AppError::Generation { message, .. } => write!(f, "{}", message),
            AppError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<mongodb::error::Error> for AppError {
    fn from(e: mongodb::error::Error) -> Self {
        AppError::DatabaseError(e.to_string())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::InsufficientCredits { status, .. } => *status,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PaymentProvider(_) => StatusCode::BAD_GATEWAY,
            AppError::Generation { status, .. } => *status,
            AppError::DatabaseError(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        crate::api::metrics::increment_error_count();

        // Detalhes de banco/infra ficam só no log
        let message = match self {
            AppError::DatabaseError(_) | AppError::Internal(_) => {
                log::error!("❌ {}", self);
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };

        let mut body = serde_json::json!({
            "success": false,
            "error": message,
        });
        if let AppError::InsufficientCredits { credits, .. } = self {
            body["credits"] = serde_json::json!(credits);
        }

        HttpResponse::build(self.status_code()).json(body)
    }
}
