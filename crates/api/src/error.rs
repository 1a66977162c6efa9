//! HTTP error responses.
//!
//! Repository errors funnel through the shared [`AppError`] taxonomy to pick
//! a status and stable error code, then render as the `{ "error", "message" }`
//! JSON shape every endpoint uses. Database errors are logged here and never
//! leak their details to the client.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use bolso_core::billing::BillingError;
use bolso_db::repositories::{InvoiceError, TransactionError};
use bolso_shared::AppError;

/// An error ready to be rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(AppError);

impl ApiError {
    /// Wraps a shared application error.
    #[must_use]
    pub const fn new(error: AppError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        // 5xx details stay in the logs.
        let message = if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
            "An internal error occurred".to_string()
        } else {
            self.0.to_string()
        };

        (
            status,
            Json(json!({
                "error": self.0.error_code(),
                "message": message,
            })),
        )
            .into_response()
    }
}

impl From<AppError> for ApiError {
    fn from(error: AppError) -> Self {
        Self(error)
    }
}

impl From<TransactionError> for ApiError {
    fn from(error: TransactionError) -> Self {
        let app = match error {
            TransactionError::NotFound(id) => AppError::NotFound(format!("transaction {id}")),
            TransactionError::InvalidAmount | TransactionError::EmptyDescription => {
                AppError::Validation(error.to_string())
            }
            TransactionError::SettlementManaged => AppError::Immutable(error.to_string()),
            TransactionError::Series(e) => AppError::Validation(e.to_string()),
            TransactionError::Invoice(e) => return Self::from(e),
            TransactionError::Database(e) => database_error(e.to_string()),
        };
        Self(app)
    }
}

impl From<InvoiceError> for ApiError {
    fn from(error: InvoiceError) -> Self {
        let app = match error {
            InvoiceError::NotFound(id) => AppError::NotFound(format!("invoice {id}")),
            InvoiceError::CardNotFound(id) => AppError::NotFound(format!("credit card {id}")),
            InvoiceError::AccountNotFound(id) => AppError::NotFound(format!("account {id}")),
            InvoiceError::DuplicatePeriod { .. } => AppError::Conflict(error.to_string()),
            InvoiceError::Billing(e) => match e {
                BillingError::NonPositiveAmount
                | BillingError::ExceedsRemaining { .. }
                | BillingError::InvalidPeriod { .. } => AppError::Validation(e.to_string()),
            },
            InvoiceError::Database(e) => database_error(e.to_string()),
        };
        Self(app)
    }
}

/// Postgres reports lock and serialization casualties between two writers
/// with these phrases. They are retryable conflicts, not server faults, so
/// they answer 409 instead of 500.
fn database_error(message: String) -> AppError {
    if message.contains("could not serialize access") || message.contains("deadlock detected") {
        AppError::Conflict("concurrent modification; retry the request".to_string())
    } else {
        AppError::Database(message)
    }
}
