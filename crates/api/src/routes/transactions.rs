//! Transaction management routes.
//!
//! A created transaction is an intent: installment and recurring intents
//! expand into multiple rows, which is why the create and update endpoints
//! respond with a list. Series-wide edits are addressed with the `scope`
//! query parameter (`this`, `all`, `future`, `past`).

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ApiError;
use crate::{AppState, middleware::AuthUser};
use bolso_core::ledger::TransactionKind;
use bolso_core::series::{Recurrence, SeriesScope};
use bolso_db::entities::{sea_orm_active_enums, transactions};
use bolso_db::repositories::{
    CreateTransactionInput, TransactionFilter, TransactionRepository, UpdateTransactionInput,
};
use bolso_shared::AppError;

/// Creates the transaction routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/transactions", get(list_transactions).post(create_transaction))
        .route(
            "/transactions/{transaction_id}",
            get(get_transaction)
                .patch(update_transaction)
                .delete(delete_transaction),
        )
        .route(
            "/transactions/{transaction_id}/toggle-paid",
            post(toggle_paid),
        )
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for listing transactions.
#[derive(Debug, Deserialize)]
pub struct ListTransactionsQuery {
    /// Filter by kind (`income`, `expense`, `transfer`).
    pub kind: Option<String>,
    /// Filter by settled state.
    pub paid: Option<bool>,
    /// Filter by accrual date range start (YYYY-MM-DD).
    pub from: Option<NaiveDate>,
    /// Filter by accrual date range end (YYYY-MM-DD).
    pub to: Option<NaiveDate>,
    /// Filter by account.
    pub account_id: Option<Uuid>,
    /// Filter by category.
    pub category_id: Option<Uuid>,
}

/// Query parameter selecting which series members an edit applies to.
#[derive(Debug, Default, Deserialize)]
pub struct ScopeQuery {
    /// Series slice selector; defaults to the single transaction.
    #[serde(default)]
    pub scope: SeriesScope,
}

/// Request body for creating a transaction intent.
#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    /// Description.
    pub description: String,
    /// Amount as a decimal string (strictly positive).
    pub amount: String,
    /// Kind (`income`, `expense`, `transfer`).
    pub kind: String,
    /// Accrual date (YYYY-MM-DD).
    pub accrual_date: NaiveDate,
    /// Settlement date, if known.
    pub settlement_date: Option<NaiveDate>,
    /// Whether the first occurrence is already settled.
    #[serde(default)]
    pub paid: bool,
    /// Free-form notes.
    pub notes: Option<String>,
    /// Account the money moves through.
    pub account_id: Option<Uuid>,
    /// Category.
    pub category_id: Option<Uuid>,
    /// Credit card; the purchase lands on the matching invoice.
    pub card_id: Option<Uuid>,
    /// Split into this many installments.
    pub installments: Option<u32>,
    /// Repeat monthly.
    #[serde(default)]
    pub recurring: bool,
    /// Number of recurring occurrences (default 12).
    pub occurrences: Option<u32>,
}

/// Request body for updating a transaction.
#[derive(Debug, Deserialize)]
pub struct UpdateTransactionRequest {
    /// Description.
    pub description: Option<String>,
    /// Amount as a decimal string.
    pub amount: Option<String>,
    /// Kind.
    pub kind: Option<String>,
    /// Accrual date.
    pub accrual_date: Option<NaiveDate>,
    /// Settlement date; explicit `null` clears it.
    #[serde(default, deserialize_with = "double_option")]
    pub settlement_date: Option<Option<NaiveDate>>,
    /// Paid flag.
    pub paid: Option<bool>,
    /// Notes; explicit `null` clears them.
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
    /// Account; explicit `null` detaches it.
    #[serde(default, deserialize_with = "double_option")]
    pub account_id: Option<Option<Uuid>>,
    /// Category; explicit `null` detaches it.
    #[serde(default, deserialize_with = "double_option")]
    pub category_id: Option<Option<Uuid>>,
}

/// Response for a transaction.
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    /// Transaction ID.
    pub id: Uuid,
    /// Description.
    pub description: String,
    /// Amount.
    pub amount: String,
    /// Kind.
    pub kind: String,
    /// Origin (`manual`, `card_purchase`, `invoice_settlement`).
    pub origin: String,
    /// Accrual date.
    pub accrual_date: String,
    /// Settlement date.
    pub settlement_date: Option<String>,
    /// Settled state.
    pub paid: bool,
    /// Notes.
    pub notes: Option<String>,
    /// Account ID.
    pub account_id: Option<Uuid>,
    /// Category ID.
    pub category_id: Option<Uuid>,
    /// Invoice ID, for card purchases and settlements.
    pub invoice_id: Option<Uuid>,
    /// Series ID, for recurring occurrences.
    pub series_id: Option<Uuid>,
    /// 1-based ordinal within the series.
    pub series_ordinal: Option<i32>,
    /// Installment number.
    pub installment_number: Option<i32>,
    /// Installment total.
    pub installment_total: Option<i32>,
    /// Created at timestamp.
    pub created_at: String,
    /// Updated at timestamp.
    pub updated_at: String,
}

impl From<transactions::Model> for TransactionResponse {
    fn from(model: transactions::Model) -> Self {
        Self {
            id: model.id,
            description: model.description,
            amount: model.amount.to_string(),
            kind: kind_to_string(&model.kind),
            origin: origin_to_string(&model.origin),
            accrual_date: model.accrual_date.to_string(),
            settlement_date: model.settlement_date.map(|d| d.to_string()),
            paid: model.paid,
            notes: model.notes,
            account_id: model.account_id,
            category_id: model.category_id,
            invoice_id: model.invoice_id,
            series_id: model.series_id,
            series_ordinal: model.series_ordinal,
            installment_number: model.installment_number,
            installment_total: model.installment_total,
            created_at: model.created_at.to_rfc3339(),
            updated_at: model.updated_at.to_rfc3339(),
        }
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/transactions` - List the user's transactions with filters.
async fn list_transactions(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListTransactionsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(kind) = &query.kind {
        if parse_kind(kind).is_none() {
            return Err(AppError::Validation(format!("unknown kind '{kind}'")).into());
        }
    }

    let repo = TransactionRepository::new((*state.db).clone());
    let filter = TransactionFilter {
        kind: query.kind.as_deref().and_then(parse_kind),
        paid: query.paid,
        date_from: query.from,
        date_to: query.to,
        account_id: query.account_id,
        category_id: query.category_id,
    };

    let rows = repo.list(auth.user_id(), filter).await?;
    let items: Vec<TransactionResponse> = rows.into_iter().map(Into::into).collect();
    Ok(Json(json!({ "transactions": items })))
}

/// POST `/transactions` - Create a transaction intent.
async fn create_transaction(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateTransactionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = parse_kind(&payload.kind)
        .ok_or_else(|| AppError::Validation(format!("unknown kind '{}'", payload.kind)))?;
    let amount = parse_amount(&payload.amount)?;
    let recurrence = match payload.installments {
        Some(total) if total > 1 => Recurrence::Installments { total },
        _ if payload.recurring => Recurrence::Recurring {
            occurrences: payload.occurrences,
        },
        _ => Recurrence::Single,
    };

    let repo = TransactionRepository::new((*state.db).clone());
    let rows = repo
        .create(CreateTransactionInput {
            user_id: auth.user_id(),
            description: payload.description,
            amount,
            kind,
            accrual_date: payload.accrual_date,
            settlement_date: payload.settlement_date,
            paid: payload.paid,
            notes: payload.notes,
            account_id: payload.account_id,
            category_id: payload.category_id,
            card_id: payload.card_id,
            recurrence,
        })
        .await?;

    let items: Vec<TransactionResponse> = rows.into_iter().map(Into::into).collect();
    Ok((StatusCode::CREATED, Json(json!({ "transactions": items }))))
}

/// GET `/transactions/{transaction_id}` - Get one transaction.
async fn get_transaction(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(transaction_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = TransactionRepository::new((*state.db).clone());
    let row = repo.get(auth.user_id(), transaction_id).await?;
    Ok(Json(TransactionResponse::from(row)))
}

/// PATCH `/transactions/{transaction_id}` - Update a transaction or a slice
/// of its series.
async fn update_transaction(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(transaction_id): Path<Uuid>,
    Query(scope): Query<ScopeQuery>,
    Json(payload): Json<UpdateTransactionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = match &payload.kind {
        Some(kind) => Some(
            parse_kind(kind)
                .ok_or_else(|| AppError::Validation(format!("unknown kind '{kind}'")))?,
        ),
        None => None,
    };
    let amount = payload.amount.as_deref().map(parse_amount).transpose()?;

    let repo = TransactionRepository::new((*state.db).clone());
    let rows = repo
        .update(
            auth.user_id(),
            transaction_id,
            scope.scope,
            UpdateTransactionInput {
                description: payload.description,
                amount,
                kind,
                accrual_date: payload.accrual_date,
                settlement_date: payload.settlement_date,
                paid: payload.paid,
                notes: payload.notes,
                account_id: payload.account_id,
                category_id: payload.category_id,
            },
        )
        .await?;

    let items: Vec<TransactionResponse> = rows.into_iter().map(Into::into).collect();
    Ok(Json(json!({ "transactions": items })))
}

/// DELETE `/transactions/{transaction_id}` - Delete a transaction or a slice
/// of its series.
async fn delete_transaction(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(transaction_id): Path<Uuid>,
    Query(scope): Query<ScopeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = TransactionRepository::new((*state.db).clone());
    let deleted = repo
        .delete(auth.user_id(), transaction_id, scope.scope)
        .await?;
    Ok(Json(json!({ "deleted": deleted })))
}

/// POST `/transactions/{transaction_id}/toggle-paid` - Flip the paid flag.
async fn toggle_paid(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(transaction_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = TransactionRepository::new((*state.db).clone());
    let row = repo.toggle_paid(auth.user_id(), transaction_id).await?;
    Ok(Json(TransactionResponse::from(row)))
}

// ============================================================================
// Helpers
// ============================================================================

/// Distinguishes an absent field (leave unchanged) from an explicit `null`
/// (clear the value): absent hits `#[serde(default)]`, present values land
/// here and become `Some(inner)`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(deserializer).map(Some)
}

fn parse_kind(value: &str) -> Option<TransactionKind> {
    match value {
        "income" => Some(TransactionKind::Income),
        "expense" => Some(TransactionKind::Expense),
        "transfer" => Some(TransactionKind::Transfer),
        _ => None,
    }
}

fn kind_to_string(kind: &sea_orm_active_enums::TransactionKind) -> String {
    match kind {
        sea_orm_active_enums::TransactionKind::Income => "income",
        sea_orm_active_enums::TransactionKind::Expense => "expense",
        sea_orm_active_enums::TransactionKind::Transfer => "transfer",
    }
    .to_string()
}

fn origin_to_string(origin: &sea_orm_active_enums::TransactionOrigin) -> String {
    match origin {
        sea_orm_active_enums::TransactionOrigin::Manual => "manual",
        sea_orm_active_enums::TransactionOrigin::CardPurchase => "card_purchase",
        sea_orm_active_enums::TransactionOrigin::InvoiceSettlement => "invoice_settlement",
    }
    .to_string()
}

pub(crate) fn parse_amount(value: &str) -> Result<Decimal, ApiError> {
    match Decimal::from_str(value) {
        Ok(amount) if amount > Decimal::ZERO => Ok(amount),
        Ok(_) => Err(AppError::Validation("Amount must be positive".to_string()).into()),
        Err(_) => Err(AppError::Validation("Invalid amount format".to_string()).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("income", Some(TransactionKind::Income))]
    #[case("expense", Some(TransactionKind::Expense))]
    #[case("transfer", Some(TransactionKind::Transfer))]
    #[case("INCOME", None)]
    #[case("", None)]
    fn test_parse_kind(#[case] input: &str, #[case] expected: Option<TransactionKind>) {
        assert_eq!(parse_kind(input), expected);
    }

    #[test]
    fn test_parse_amount_rejects_non_positive() {
        assert!(parse_amount("10.50").is_ok());
        assert!(parse_amount("0").is_err());
        assert!(parse_amount("-5").is_err());
        assert!(parse_amount("abc").is_err());
    }

    #[test]
    fn test_scope_query_defaults_to_this() {
        let query: ScopeQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.scope, SeriesScope::This);
    }

    #[test]
    fn test_create_request_minimal_body() {
        let payload: CreateTransactionRequest = serde_json::from_value(json!({
            "description": "Groceries",
            "amount": "82.40",
            "kind": "expense",
            "accrual_date": "2026-03-10"
        }))
        .unwrap();
        assert!(!payload.paid);
        assert!(!payload.recurring);
        assert_eq!(payload.installments, None);
    }
}
