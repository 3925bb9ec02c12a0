//! Request and response bodies of the wallet HTTP API.
//!
//! Amounts are integer minor units (cents) on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of every non-2xx response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    /// Whether the same request may be sent again unchanged.
    pub retryable: bool,
}

pub mod account {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountView {
        pub id: i64,
        pub full_name: String,
        pub phone: String,
        pub email: Option<String>,
        pub balance_minor: i64,
        pub created_at: DateTime<Utc>,
    }
}

pub mod transaction {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionKind {
        Transfer,
        Topup,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionStatus {
        Pending,
        Completed,
        Failed,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransferNew {
        /// Phone number of the receiving account.
        pub receiver_phone: String,
        /// Must be > 0. The sender is charged this plus the fee.
        pub amount_minor: i64,
        pub description: Option<String>,
        pub pin: String,
        /// Optional reference number for safely retrying the same request.
        pub reference_number: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransferCreated {
        pub transaction_id: i64,
        pub reference_number: String,
        pub amount_minor: i64,
        pub fee_minor: i64,
        pub status: TransactionStatus,
        pub new_balance_minor: i64,
        pub receiver_name: String,
        pub receiver_phone: String,
        /// `true` when this answers a retry of an already committed request.
        pub replayed: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TopUpNew {
        pub amount_minor: i64,
        pub payment_method_id: i64,
        pub description: Option<String>,
        /// Optional reference number for safely retrying the same request.
        pub reference_number: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TopUpCreated {
        pub transaction_id: i64,
        pub reference_number: String,
        pub amount_minor: i64,
        pub fee_minor: i64,
        pub status: TransactionStatus,
        pub new_balance_minor: i64,
        pub replayed: bool,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct HistoryQuery {
        pub limit: Option<u64>,
        /// Opaque pagination cursor, from `next_cursor`.
        ///
        /// Newest → older pagination.
        pub cursor: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: i64,
        pub kind: TransactionKind,
        pub reference_number: String,
        pub sender_id: Option<i64>,
        pub receiver_id: Option<i64>,
        pub amount_minor: i64,
        pub fee_minor: i64,
        /// Signed balance effect on the authenticated account.
        pub effect_minor: i64,
        pub description: Option<String>,
        pub status: TransactionStatus,
        pub created_at: DateTime<Utc>,
        pub completed_at: Option<DateTime<Utc>>,
        pub payment_method_id: Option<i64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionListResponse {
        pub transactions: Vec<TransactionView>,
        /// Opaque cursor for fetching the next page (older items).
        pub next_cursor: Option<String>,
    }
}
