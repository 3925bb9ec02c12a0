//! The module contains the error the engine can throw.
//!
//! Validation errors ([`SelfTransfer`], [`InvalidCredential`],
//! [`AmountOutOfRange`], [`UnknownPaymentMethod`], ...) are raised before any
//! balance is touched. Store errors ([`StoreTimeout`], [`StoreUnavailable`])
//! are raised while a movement is in flight; the surrounding database
//! transaction is rolled back so nothing of the movement is visible.
//!
//!  [`SelfTransfer`]: EngineError::SelfTransfer
//!  [`InvalidCredential`]: EngineError::InvalidCredential
//!  [`AmountOutOfRange`]: EngineError::AmountOutOfRange
//!  [`UnknownPaymentMethod`]: EngineError::UnknownPaymentMethod
//!  [`StoreTimeout`]: EngineError::StoreTimeout
//!  [`StoreUnavailable`]: EngineError::StoreUnavailable
use sea_orm::{ConnAcquireErr, DbErr, RuntimeErr, SqlErr};
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Cannot transfer to the same account")]
    SelfTransfer,
    #[error("Invalid PIN")]
    InvalidCredential,
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error("Receiver not found: {0}")]
    ReceiverNotFound(String),
    #[error("Account not found: {0}")]
    AccountNotFound(String),
    #[error("Amount out of range: {0}")]
    AmountOutOfRange(String),
    #[error("Unknown payment method: {0}")]
    UnknownPaymentMethod(String),
    #[error("Store timeout: {0}")]
    StoreTimeout(String),
    #[error("Duplicate reference number: {0}")]
    DuplicateReference(String),
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid reference number: {0}")]
    InvalidReference(String),
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),
    #[error("Credential hashing failed: {0}")]
    Credential(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error(transparent)]
    Database(DbErr),
}

impl EngineError {
    /// Whether the caller may retry the same request unchanged.
    ///
    /// Only infrastructure failures qualify; every other kind needs a
    /// corrected request.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreTimeout(_) | Self::StoreUnavailable(_))
    }

    /// Returns `true` when the underlying store rejected a write because of a
    /// unique constraint.
    pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
        matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
    }
}

impl From<DbErr> for EngineError {
    fn from(err: DbErr) -> Self {
        match err {
            DbErr::ConnectionAcquire(ConnAcquireErr::Timeout) => {
                Self::StoreTimeout("timed out acquiring a database connection".to_string())
            }
            DbErr::ConnectionAcquire(ConnAcquireErr::ConnectionClosed) => {
                Self::StoreUnavailable("database connection closed".to_string())
            }
            DbErr::Conn(RuntimeErr::SqlxError(inner)) => Self::StoreUnavailable(inner.to_string()),
            DbErr::Conn(RuntimeErr::Internal(inner)) => Self::StoreUnavailable(inner),
            other => Self::Database(other),
        }
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::SelfTransfer, Self::SelfTransfer) => true,
            (Self::InvalidCredential, Self::InvalidCredential) => true,
            (Self::InsufficientFunds(a), Self::InsufficientFunds(b)) => a == b,
            (Self::ReceiverNotFound(a), Self::ReceiverNotFound(b)) => a == b,
            (Self::AccountNotFound(a), Self::AccountNotFound(b)) => a == b,
            (Self::AmountOutOfRange(a), Self::AmountOutOfRange(b)) => a == b,
            (Self::UnknownPaymentMethod(a), Self::UnknownPaymentMethod(b)) => a == b,
            (Self::StoreTimeout(a), Self::StoreTimeout(b)) => a == b,
            (Self::DuplicateReference(a), Self::DuplicateReference(b)) => a == b,
            (Self::StoreUnavailable(a), Self::StoreUnavailable(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidReference(a), Self::InvalidReference(b)) => a == b,
            (Self::InvalidCursor(a), Self::InvalidCursor(b)) => a == b,
            (Self::Credential(a), Self::Credential(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_store_failures_are_retryable() {
        assert!(EngineError::StoreTimeout("slow".to_string()).is_retryable());
        assert!(EngineError::StoreUnavailable("down".to_string()).is_retryable());

        assert!(!EngineError::SelfTransfer.is_retryable());
        assert!(!EngineError::InvalidCredential.is_retryable());
        assert!(!EngineError::InsufficientFunds("x".to_string()).is_retryable());
        assert!(!EngineError::DuplicateReference("x".to_string()).is_retryable());
        assert!(!EngineError::Database(DbErr::Custom("x".to_string())).is_retryable());
    }

    #[test]
    fn acquire_timeout_maps_to_store_timeout() {
        let err = EngineError::from(DbErr::ConnectionAcquire(ConnAcquireErr::Timeout));
        assert!(matches!(err, EngineError::StoreTimeout(_)));
    }

    #[test]
    fn connection_closed_maps_to_store_unavailable() {
        let err = EngineError::from(DbErr::ConnectionAcquire(ConnAcquireErr::ConnectionClosed));
        assert!(matches!(err, EngineError::StoreUnavailable(_)));
    }

    #[test]
    fn query_errors_stay_database_errors() {
        let err = EngineError::from(DbErr::RecordNotFound("accounts".to_string()));
        assert_eq!(
            err,
            EngineError::Database(DbErr::RecordNotFound("accounts".to_string()))
        );
    }
}
