use axum::{
    Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};

use std::sync::Arc;

use crate::{AuthError, AuthKeys, ServerError, account, transactions};
use engine::Engine;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub keys: Arc<AuthKeys>,
}

/// The account a request was authenticated as.
#[derive(Clone, Copy, Debug)]
pub struct AuthenticatedAccount(pub i64);

async fn auth(
    auth_header: Option<TypedHeader<Authorization<Bearer>>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let Some(auth_header) = auth_header else {
        return Err(AuthError::Missing.into());
    };
    let account_id = state.keys.verify(auth_header.token())?;

    request
        .extensions_mut()
        .insert(AuthenticatedAccount(account_id));
    Ok(next.run(request).await)
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/transactions/transfer", post(transactions::transfer))
        .route("/transactions/topup", post(transactions::topup))
        .route("/transactions/history", get(transactions::history))
        .route("/account", get(account::get))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .with_state(state)
}

pub async fn run_with_listener(
    engine: Engine,
    keys: AuthKeys,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        engine: Arc::new(engine),
        keys: Arc::new(keys),
    };

    axum::serve(listener, router(state)).await
}
