//! Wallet ledger engine.
//!
//! Accounts hold a balance in integer minor units. Money moves either
//! between two accounts (transfer) or into one account from a payment method
//! (top-up). Every movement changes the balances and appends its journal
//! record inside one database transaction.

pub use accounts::Account;
pub use clock::{Clock, FixedClock, SystemClock};
pub use commands::{NewAccount, NewPaymentMethod, Recipient, TopUpCmd, TransferCmd};
pub use credentials::{
    CredentialVerifier, DEFAULT_PIN_HASH_COST, MIN_PIN_HASH_COST, StoredPinVerifier, hash_pin,
    verify_pin_hash,
};
pub use error::EngineError;
pub use fees::{FeeOperation, FeePolicy, FeeRate};
pub use money::Money;
pub use ops::{
    Counterparty, DEFAULT_STORE_TIMEOUT, Engine, EngineBuilder, HistoryEntry, MAX_HISTORY_LIMIT,
    TopUpReceipt, TransferReceipt,
};
pub use payment_methods::PaymentMethod;
pub use reference::{REFERENCE_PREFIX, ReferenceGenerator, ReferenceNumber};
pub use transactions::{TransactionKind, TransactionRecord, TransactionStatus};

mod accounts;
mod clock;
mod commands;
mod credentials;
mod error;
mod fees;
mod money;
mod ops;
mod payment_methods;
mod reference;
mod transactions;
mod util;

pub type ResultEngine<T> = Result<T, EngineError>;
