//! PIN proofs and their verification.
//!
//! A proof is a bcrypt hash of the PIN. Hashing and checking are CPU bound
//! and run on the blocking pool.

use async_trait::async_trait;
use sea_orm::{DatabaseConnection, EntityTrait};

use crate::{EngineError, ResultEngine, accounts};

const PIN_LEN: usize = 6;

/// bcrypt cost used for new proofs unless the builder overrides it.
pub const DEFAULT_PIN_HASH_COST: u32 = bcrypt::DEFAULT_COST;

/// Cheapest cost bcrypt accepts.
// Mirrors bcrypt's private `MIN_COST`.
pub const MIN_PIN_HASH_COST: u32 = 4;

/// Checks a PIN candidate against an account's stored proof.
#[async_trait]
pub trait CredentialVerifier: Send + Sync + std::fmt::Debug {
    /// Returns `Ok(false)` on mismatch and `AccountNotFound` for an unknown
    /// account.
    async fn verify_pin(&self, account_id: i64, candidate: &str) -> ResultEngine<bool>;
}

/// Verifies against the `accounts.pin_hash` column.
#[derive(Clone, Debug)]
pub struct StoredPinVerifier {
    database: DatabaseConnection,
}

impl StoredPinVerifier {
    pub fn new(database: DatabaseConnection) -> Self {
        Self { database }
    }
}

#[async_trait]
impl CredentialVerifier for StoredPinVerifier {
    async fn verify_pin(&self, account_id: i64, candidate: &str) -> ResultEngine<bool> {
        let account = accounts::Entity::find_by_id(account_id)
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::AccountNotFound(account_id.to_string()))?;

        let candidate = candidate.to_string();
        tokio::task::spawn_blocking(move || verify_pin_hash(&account.pin_hash, &candidate))
            .await
            .map_err(|err| EngineError::Credential(err.to_string()))
    }
}

/// Rejects anything but exactly six ASCII digits.
pub fn validate_pin(pin: &str) -> ResultEngine<()> {
    if pin.len() != PIN_LEN || !pin.chars().all(|c| c.is_ascii_digit()) {
        return Err(EngineError::InvalidCredential);
    }
    Ok(())
}

pub fn hash_pin(pin: &str, cost: u32) -> ResultEngine<String> {
    bcrypt::hash(pin, cost).map_err(|err| EngineError::Credential(err.to_string()))
}

/// A malformed proof never verifies.
pub fn verify_pin_hash(stored: &str, candidate: &str) -> bool {
    bcrypt::verify(candidate, stored).unwrap_or(false)
}

pub(crate) async fn hash_pin_blocking(pin: String, cost: u32) -> ResultEngine<String> {
    tokio::task::spawn_blocking(move || hash_pin(&pin, cost))
        .await
        .map_err(|err| EngineError::Credential(err.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let stored = hash_pin("123456", MIN_PIN_HASH_COST).unwrap();
        assert!(verify_pin_hash(&stored, "123456"));
        assert!(!verify_pin_hash(&stored, "654321"));
    }

    #[test]
    fn proof_does_not_contain_the_pin() {
        let stored = hash_pin("123456", MIN_PIN_HASH_COST).unwrap();
        assert!(!stored.contains("123456"));
        assert!(stored.starts_with("$2"));
    }

    #[test]
    fn same_pin_gets_different_salt() {
        assert_ne!(
            hash_pin("123456", MIN_PIN_HASH_COST).unwrap(),
            hash_pin("123456", MIN_PIN_HASH_COST).unwrap()
        );
    }

    #[test]
    fn out_of_range_cost_is_an_error() {
        assert!(matches!(
            hash_pin("123456", 99),
            Err(EngineError::Credential(_))
        ));
    }

    #[test]
    fn malformed_proof_never_verifies() {
        assert!(!verify_pin_hash("", "123456"));
        assert!(!verify_pin_hash("nodollar", "123456"));
        assert!(!verify_pin_hash("zz$abcd", "123456"));
    }

    #[test]
    fn pin_must_be_six_digits() {
        assert!(validate_pin("123456").is_ok());
        assert_eq!(validate_pin("12345"), Err(EngineError::InvalidCredential));
        assert_eq!(validate_pin("12345a"), Err(EngineError::InvalidCredential));
        assert_eq!(validate_pin("1234567"), Err(EngineError::InvalidCredential));
    }
}
