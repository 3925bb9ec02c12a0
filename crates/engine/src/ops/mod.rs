use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};

use crate::{
    Clock, CredentialVerifier, DEFAULT_PIN_HASH_COST, EngineError, FeePolicy, ReferenceGenerator,
    ResultEngine, StoredPinVerifier, SystemClock,
};

mod accounts;
mod history;
mod ledger;
mod payment_methods;
mod topup;
mod transfer;

pub use history::{HistoryEntry, MAX_HISTORY_LIMIT};
pub use topup::TopUpReceipt;
pub use transfer::{Counterparty, TransferReceipt};

/// Upper bound for one store operation, from `BEGIN` to `COMMIT`.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

type TxFuture<'a, T> = Pin<Box<dyn Future<Output = ResultEngine<T>> + Send + 'a>>;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    clock: Arc<dyn Clock>,
    credentials: Arc<dyn CredentialVerifier>,
    fees: FeePolicy,
    references: ReferenceGenerator,
    store_timeout: Duration,
    pin_hash_cost: u32,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Run `f` inside a DB transaction, committing on success and rolling
    /// back on error.
    ///
    /// The whole unit is bounded by the store timeout. When it expires the
    /// transaction is dropped unfinished, which rolls it back.
    async fn with_tx<T, F>(&self, f: F) -> ResultEngine<T>
    where
        T: Send,
        F: for<'a> FnOnce(&'a Engine, &'a DatabaseTransaction) -> TxFuture<'a, T> + Send,
    {
        let work = async {
            let db_tx = self.database.begin().await?;
            let value = f(self, &db_tx).await?;
            db_tx.commit().await?;
            Ok(value)
        };
        with_deadline(self.store_timeout, work).await
    }
}

/// Awaits `work` for at most `budget`.
async fn with_deadline<T>(
    budget: Duration,
    work: impl Future<Output = ResultEngine<T>>,
) -> ResultEngine<T> {
    match tokio::time::timeout(budget, work).await {
        Ok(result) => result,
        Err(_) => Err(EngineError::StoreTimeout(format!(
            "store operation exceeded {} ms",
            budget.as_millis()
        ))),
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    clock: Option<Arc<dyn Clock>>,
    credentials: Option<Arc<dyn CredentialVerifier>>,
    fees: FeePolicy,
    references: ReferenceGenerator,
    store_timeout: Option<Duration>,
    pin_hash_cost: Option<u32>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> EngineBuilder {
        self.clock = Some(clock);
        self
    }

    /// Replace the PIN verifier. Defaults to the proof stored with the
    /// account.
    pub fn credentials(mut self, credentials: Arc<dyn CredentialVerifier>) -> EngineBuilder {
        self.credentials = Some(credentials);
        self
    }

    pub fn fee_policy(mut self, fees: FeePolicy) -> EngineBuilder {
        self.fees = fees;
        self
    }

    pub fn references(mut self, references: ReferenceGenerator) -> EngineBuilder {
        self.references = references;
        self
    }

    pub fn store_timeout(mut self, timeout: Duration) -> EngineBuilder {
        self.store_timeout = Some(timeout);
        self
    }

    /// bcrypt cost for PIN proofs written by `open_account`.
    pub fn pin_hash_cost(mut self, cost: u32) -> EngineBuilder {
        self.pin_hash_cost = Some(cost);
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        let credentials = self
            .credentials
            .unwrap_or_else(|| Arc::new(StoredPinVerifier::new(self.database.clone())));
        Ok(Engine {
            database: self.database,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            credentials,
            fees: self.fees,
            references: self.references,
            store_timeout: self.store_timeout.unwrap_or(DEFAULT_STORE_TIMEOUT),
            pin_hash_cost: self.pin_hash_cost.unwrap_or(DEFAULT_PIN_HASH_COST),
        })
    }
}
