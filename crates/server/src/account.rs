//! Account API endpoints

use api_types::account::AccountView;
use axum::{Extension, Json, extract::State};

use crate::{ServerError, server::{AuthenticatedAccount, ServerState}};

pub async fn get(
    Extension(AuthenticatedAccount(account_id)): Extension<AuthenticatedAccount>,
    State(state): State<ServerState>,
) -> Result<Json<AccountView>, ServerError> {
    let account = state.engine.account(account_id).await?;

    Ok(Json(AccountView {
        id: account.id,
        full_name: account.full_name,
        phone: account.phone,
        email: account.email,
        balance_minor: account.balance.minor(),
        created_at: account.created_at,
    }))
}
