use axum::extract::{Json, State};
use axum::http::StatusCode;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::{AppError, AppResult};
use crate::models::{NewTransaction, Transaction};
use crate::routes::service_requests::owned_service_request;
use crate::schema::transactions;
use crate::state::AppState;

/// Charge categories offered on the selection screen. Placeholder for a
/// future payment-gateway integration; no amounts are computed.
pub const CHARGE_TYPES: &[&str] = &["basic-legal", "estimated", "gov-fees"];

pub const TRANSACTION_PAID: &str = "paid";

#[derive(Deserialize)]
pub struct RecordPaymentPayload {
    pub service_request_id: Uuid,
    pub charge_type: String,
    /// The consent checkbox on the charge screen; "Pay Now" is disabled
    /// until it is ticked, and the server enforces the same rule.
    pub consent_accepted: bool,
}

#[derive(Serialize)]
pub struct TransactionResponse {
    pub id: Uuid,
    pub service_request_id: Uuid,
    pub charge_type: String,
    pub status: String,
    pub created_at: String,
}

impl From<Transaction> for TransactionResponse {
    fn from(tx: Transaction) -> Self {
        Self {
            id: tx.id,
            service_request_id: tx.service_request_id,
            charge_type: tx.charge_type,
            status: tx.status,
            created_at: tx.created_at.and_utc().to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct TransactionDetailResponse {
    pub transaction: TransactionResponse,
}

/// Simulated payment completion terminating the charge flow. Records a paid
/// transaction for the request and returns it for dashboard display.
pub async fn record_payment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<RecordPaymentPayload>,
) -> AppResult<(StatusCode, Json<TransactionDetailResponse>)> {
    let charge_type = payload.charge_type.trim().to_string();
    if !CHARGE_TYPES.contains(&charge_type.as_str()) {
        return Err(AppError::validation(format!(
            "unknown charge type '{charge_type}'"
        )));
    }
    if !payload.consent_accepted {
        return Err(AppError::validation(
            "terms must be accepted before payment",
        ));
    }

    let mut conn = state.db()?;
    owned_service_request(&mut conn, user.user_id, payload.service_request_id)?;

    let new_transaction = NewTransaction {
        id: Uuid::new_v4(),
        user_id: user.user_id,
        service_request_id: payload.service_request_id,
        charge_type,
        status: TRANSACTION_PAID.to_string(),
    };
    diesel::insert_into(transactions::table)
        .values(&new_transaction)
        .execute(&mut conn)?;

    let transaction: Transaction = transactions::table
        .find(new_transaction.id)
        .first(&mut conn)?;

    info!(
        transaction_id = %transaction.id,
        service_request_id = %transaction.service_request_id,
        charge_type = %transaction.charge_type,
        "recorded simulated payment"
    );

    Ok((
        StatusCode::CREATED,
        Json(TransactionDetailResponse {
            transaction: transaction.into(),
        }),
    ))
}

pub async fn list_transactions(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<TransactionResponse>>> {
    let mut conn = state.db()?;

    let rows: Vec<Transaction> = transactions::table
        .filter(transactions::user_id.eq(user.user_id))
        .order(transactions::created_at.desc())
        .load(&mut conn)?;

    Ok(Json(
        rows.into_iter().map(TransactionResponse::from).collect(),
    ))
}
