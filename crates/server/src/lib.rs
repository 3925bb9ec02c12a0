use api_types::ErrorBody;
use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

pub use auth::{AuthError, AuthKeys, Claims};
pub use server::{ServerState, router, run_with_listener};

mod account;
mod auth;
mod server;
mod transactions;

#[derive(Debug)]
pub enum ServerError {
    Engine(EngineError),
    Auth(AuthError),
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::SelfTransfer
        | EngineError::InvalidReference(_)
        | EngineError::InvalidCursor(_) => StatusCode::BAD_REQUEST,
        EngineError::InvalidCredential => StatusCode::UNAUTHORIZED,
        EngineError::AccountNotFound(_)
        | EngineError::ReceiverNotFound(_)
        | EngineError::UnknownPaymentMethod(_) => StatusCode::NOT_FOUND,
        EngineError::DuplicateReference(_) | EngineError::ExistingKey(_) => StatusCode::CONFLICT,
        EngineError::InsufficientFunds(_)
        | EngineError::AmountOutOfRange(_)
        | EngineError::InvalidAmount(_) => StatusCode::UNPROCESSABLE_ENTITY,
        EngineError::StoreTimeout(_) | EngineError::StoreUnavailable(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        EngineError::Credential(_) | EngineError::Database(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        EngineError::Credential(detail) => {
            tracing::error!("credential failure: {detail}");
            "internal server error".to_string()
        }
        EngineError::StoreTimeout(detail) | EngineError::StoreUnavailable(detail) => {
            tracing::error!("store failure: {detail}");
            "service temporarily unavailable".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error, retryable) = match self {
            ServerError::Engine(err) => {
                let retryable = err.is_retryable();
                (
                    status_for_engine_error(&err),
                    message_for_engine_error(err),
                    retryable,
                )
            }
            ServerError::Auth(AuthError::Signing(detail)) => {
                tracing::error!("token signing failed: {detail}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                    false,
                )
            }
            ServerError::Auth(err) => (StatusCode::UNAUTHORIZED, err.to_string(), false),
        };

        (status, Json(ErrorBody { error, retryable })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl From<AuthError> for ServerError {
    fn from(value: AuthError) -> Self {
        Self::Auth(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: EngineError) -> StatusCode {
        ServerError::from(err).into_response().status()
    }

    #[test]
    fn validation_errors_map_to_4xx() {
        assert_eq!(status_of(EngineError::SelfTransfer), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(EngineError::InvalidCredential),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(EngineError::InsufficientFunds("x".to_string())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(EngineError::AmountOutOfRange("x".to_string())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn missing_things_map_to_404() {
        assert_eq!(
            status_of(EngineError::ReceiverNotFound("x".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(EngineError::UnknownPaymentMethod("x".to_string())),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn duplicate_reference_maps_to_409() {
        assert_eq!(
            status_of(EngineError::DuplicateReference("TRX1".to_string())),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn store_failures_map_to_503() {
        assert_eq!(
            status_of(EngineError::StoreTimeout("slow".to_string())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(EngineError::StoreUnavailable("down".to_string())),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn auth_errors_map_to_401() {
        let res = ServerError::from(AuthError::Expired).into_response();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn internal_failures_map_to_500() {
        assert_eq!(
            status_of(EngineError::Credential("bad cost".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(EngineError::Database(sea_orm::DbErr::Custom("x".to_string()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
