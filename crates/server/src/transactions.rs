//! Transactions API endpoints

use api_types::transaction::{
    HistoryQuery, TopUpCreated, TopUpNew, TransactionKind as ApiKind, TransactionListResponse,
    TransactionStatus as ApiStatus, TransactionView, TransferCreated, TransferNew,
};
use axum::{
    Extension, Json,
    extract::{Query, State},
};
use engine::{Money, Recipient, TopUpCmd, TransferCmd};

use crate::{
    ServerError,
    server::{AuthenticatedAccount, ServerState},
};

const DEFAULT_HISTORY_LIMIT: u64 = 20;

fn map_kind(kind: engine::TransactionKind) -> ApiKind {
    match kind {
        engine::TransactionKind::Transfer => ApiKind::Transfer,
        engine::TransactionKind::TopUp => ApiKind::Topup,
    }
}

fn map_status(status: engine::TransactionStatus) -> ApiStatus {
    match status {
        engine::TransactionStatus::Pending => ApiStatus::Pending,
        engine::TransactionStatus::Completed => ApiStatus::Completed,
        engine::TransactionStatus::Failed => ApiStatus::Failed,
    }
}

pub async fn transfer(
    Extension(AuthenticatedAccount(account_id)): Extension<AuthenticatedAccount>,
    State(state): State<ServerState>,
    Json(payload): Json<TransferNew>,
) -> Result<Json<TransferCreated>, ServerError> {
    let mut cmd = TransferCmd::new(
        account_id,
        Recipient::Phone(payload.receiver_phone),
        Money::new(payload.amount_minor),
        payload.pin,
    );
    if let Some(description) = payload.description {
        cmd = cmd.description(description);
    }
    if let Some(reference) = payload.reference_number {
        cmd = cmd.reference(reference);
    }

    let receipt = state.engine.transfer(cmd).await?;
    let record = receipt.record;

    Ok(Json(TransferCreated {
        transaction_id: record.id,
        reference_number: record.reference_number.to_string(),
        amount_minor: record.amount.minor(),
        fee_minor: record.fee.minor(),
        status: map_status(record.status),
        new_balance_minor: receipt.sender_balance.minor(),
        receiver_name: receipt.receiver.full_name,
        receiver_phone: receipt.receiver.phone,
        replayed: receipt.replayed,
    }))
}

pub async fn topup(
    Extension(AuthenticatedAccount(account_id)): Extension<AuthenticatedAccount>,
    State(state): State<ServerState>,
    Json(payload): Json<TopUpNew>,
) -> Result<Json<TopUpCreated>, ServerError> {
    let mut cmd = TopUpCmd::new(
        account_id,
        Money::new(payload.amount_minor),
        payload.payment_method_id,
    );
    if let Some(description) = payload.description {
        cmd = cmd.description(description);
    }
    if let Some(reference) = payload.reference_number {
        cmd = cmd.reference(reference);
    }

    let receipt = state.engine.topup(cmd).await?;
    let record = receipt.record;

    Ok(Json(TopUpCreated {
        transaction_id: record.id,
        reference_number: record.reference_number.to_string(),
        amount_minor: record.amount.minor(),
        fee_minor: record.fee.minor(),
        status: map_status(record.status),
        new_balance_minor: receipt.balance.minor(),
        replayed: receipt.replayed,
    }))
}

pub async fn history(
    Extension(AuthenticatedAccount(account_id)): Extension<AuthenticatedAccount>,
    State(state): State<ServerState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<TransactionListResponse>, ServerError> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let (entries, next_cursor) = state
        .engine
        .list_by_account_page(account_id, limit, query.cursor.as_deref())
        .await?;

    let transactions = entries
        .into_iter()
        .map(|entry| {
            let record = entry.record;
            TransactionView {
                id: record.id,
                kind: map_kind(record.kind),
                reference_number: record.reference_number.to_string(),
                sender_id: record.sender_id,
                receiver_id: record.receiver_id,
                amount_minor: record.amount.minor(),
                fee_minor: record.fee.minor(),
                effect_minor: entry.effect.minor(),
                description: record.description,
                status: map_status(record.status),
                created_at: record.created_at,
                completed_at: record.completed_at,
                payment_method_id: record.payment_method_id,
            }
        })
        .collect();

    Ok(Json(TransactionListResponse {
        transactions,
        next_cursor,
    }))
}
