//! Credit-card invoice routes.
//!
//! Invoices are normally opened lazily by the first purchase of a billing
//! period; the POST endpoint exists for opening one ahead of time. Payments
//! go through the dedicated pay endpoint, never through transaction edits.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::error::ApiError;
use crate::routes::transactions::{TransactionResponse, parse_amount};
use crate::{AppState, middleware::AuthUser};
use bolso_db::entities::{invoices, sea_orm_active_enums};
use bolso_db::repositories::{
    CreateInvoiceInput, InvoiceFilter, InvoiceRepository, PayInvoiceInput,
};
use bolso_shared::AppError;

/// Creates the invoice routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/invoices", get(list_invoices).post(create_invoice))
        .route(
            "/invoices/{invoice_id}",
            get(get_invoice).delete(delete_invoice),
        )
        .route("/invoices/{invoice_id}/pay", post(pay_invoice))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for listing invoices.
#[derive(Debug, Deserialize)]
pub struct ListInvoicesQuery {
    /// Filter by card.
    pub card_id: Option<Uuid>,
    /// Filter by status (`open`, `closed`, `paid`, `overdue`).
    pub status: Option<String>,
}

/// Request body for explicitly creating an invoice.
#[derive(Debug, Deserialize)]
pub struct CreateInvoiceRequest {
    /// Card the invoice belongs to.
    pub card_id: Uuid,
    /// Billing month (1-12).
    pub month: u32,
    /// Billing year.
    pub year: i32,
    /// Paying account override.
    pub account_id: Option<Uuid>,
}

/// Request body for paying an invoice.
#[derive(Debug, Deserialize)]
pub struct PayInvoiceRequest {
    /// Amount as a decimal string; may be a partial payment.
    pub amount: String,
    /// Date the money leaves the account (YYYY-MM-DD).
    pub settlement_date: NaiveDate,
    /// Account the payment is debited from.
    pub account_id: Uuid,
    /// Optional category for the settlement transaction.
    pub category_id: Option<Uuid>,
}

/// Response for an invoice.
#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    /// Invoice ID.
    pub id: Uuid,
    /// Card ID.
    pub card_id: Uuid,
    /// Billing month.
    pub month: i16,
    /// Billing year.
    pub year: i32,
    /// Closing date.
    pub closing_date: String,
    /// Due date.
    pub due_date: String,
    /// Total of linked purchases.
    pub total: String,
    /// Cumulative amount paid.
    pub amount_paid: String,
    /// Status.
    pub status: String,
    /// Paying account.
    pub account_id: Option<Uuid>,
    /// Companion/latest settlement transaction.
    pub settlement_transaction_id: Option<Uuid>,
    /// Created at timestamp.
    pub created_at: String,
    /// Updated at timestamp.
    pub updated_at: String,
}

impl From<invoices::Model> for InvoiceResponse {
    fn from(model: invoices::Model) -> Self {
        Self {
            id: model.id,
            card_id: model.card_id,
            month: model.reference_month,
            year: model.reference_year,
            closing_date: model.closing_date.to_string(),
            due_date: model.due_date.to_string(),
            total: model.total.to_string(),
            amount_paid: model.amount_paid.to_string(),
            status: status_to_string(&model.status),
            account_id: model.account_id,
            settlement_transaction_id: model.settlement_transaction_id,
            created_at: model.created_at.to_rfc3339(),
            updated_at: model.updated_at.to_rfc3339(),
        }
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/invoices` - List invoices across the user's cards.
async fn list_invoices(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListInvoicesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let status = match &query.status {
        Some(status) => Some(
            parse_status(status)
                .ok_or_else(|| AppError::Validation(format!("unknown status '{status}'")))?,
        ),
        None => None,
    };

    let repo = InvoiceRepository::new((*state.db).clone());
    let rows = repo
        .list(
            auth.user_id(),
            InvoiceFilter {
                card_id: query.card_id,
                status,
            },
        )
        .await?;

    let items: Vec<InvoiceResponse> = rows.into_iter().map(Into::into).collect();
    Ok(Json(json!({ "invoices": items })))
}

/// POST `/invoices` - Open an invoice for a card and billing period.
async fn create_invoice(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateInvoiceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = InvoiceRepository::new((*state.db).clone());
    let invoice = repo
        .create(
            auth.user_id(),
            CreateInvoiceInput {
                card_id: payload.card_id,
                month: payload.month,
                year: payload.year,
                account_id: payload.account_id,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(InvoiceResponse::from(invoice))))
}

/// GET `/invoices/{invoice_id}` - Get an invoice with its purchases.
async fn get_invoice(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(invoice_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = InvoiceRepository::new((*state.db).clone());
    let detail = repo.get(auth.user_id(), invoice_id).await?;

    let purchases: Vec<TransactionResponse> =
        detail.purchases.into_iter().map(Into::into).collect();
    Ok(Json(json!({
        "invoice": InvoiceResponse::from(detail.invoice),
        "purchases": purchases,
    })))
}

/// DELETE `/invoices/{invoice_id}` - Delete an invoice and its transactions.
async fn delete_invoice(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(invoice_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = InvoiceRepository::new((*state.db).clone());
    repo.delete(auth.user_id(), invoice_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST `/invoices/{invoice_id}/pay` - Pay an invoice, partially or in full.
async fn pay_invoice(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(invoice_id): Path<Uuid>,
    Json(payload): Json<PayInvoiceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let amount = parse_amount(&payload.amount)?;

    let repo = InvoiceRepository::new((*state.db).clone());
    let outcome = repo
        .pay(
            auth.user_id(),
            invoice_id,
            PayInvoiceInput {
                amount,
                settlement_date: payload.settlement_date,
                account_id: payload.account_id,
                category_id: payload.category_id,
            },
        )
        .await?;

    Ok(Json(json!({
        "invoice": InvoiceResponse::from(outcome.invoice),
        "settlement": TransactionResponse::from(outcome.settlement),
        "remaining": outcome.remaining.to_string(),
    })))
}

// ============================================================================
// Helpers
// ============================================================================

fn parse_status(value: &str) -> Option<sea_orm_active_enums::InvoiceStatus> {
    match value {
        "open" => Some(sea_orm_active_enums::InvoiceStatus::Open),
        "closed" => Some(sea_orm_active_enums::InvoiceStatus::Closed),
        "paid" => Some(sea_orm_active_enums::InvoiceStatus::Paid),
        "overdue" => Some(sea_orm_active_enums::InvoiceStatus::Overdue),
        _ => None,
    }
}

fn status_to_string(status: &sea_orm_active_enums::InvoiceStatus) -> String {
    match status {
        sea_orm_active_enums::InvoiceStatus::Open => "open",
        sea_orm_active_enums::InvoiceStatus::Closed => "closed",
        sea_orm_active_enums::InvoiceStatus::Paid => "paid",
        sea_orm_active_enums::InvoiceStatus::Overdue => "overdue",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("open", true)]
    #[case("closed", true)]
    #[case("paid", true)]
    #[case("overdue", true)]
    #[case("OPEN", false)]
    #[case("settled", false)]
    fn test_parse_status(#[case] input: &str, #[case] valid: bool) {
        assert_eq!(parse_status(input).is_some(), valid);
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            sea_orm_active_enums::InvoiceStatus::Open,
            sea_orm_active_enums::InvoiceStatus::Closed,
            sea_orm_active_enums::InvoiceStatus::Paid,
            sea_orm_active_enums::InvoiceStatus::Overdue,
        ] {
            let as_string = status_to_string(&status);
            assert_eq!(parse_status(&as_string), Some(status));
        }
    }
}
