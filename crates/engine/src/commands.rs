//! Command structs for engine operations.
//!
//! These types group parameters for write operations (transfer, top-up,
//! account and payment method creation), keeping call sites readable and
//! avoiding long argument lists.

use crate::{FeeRate, Money};

/// How the receiver of a transfer is named.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Recipient {
    Id(i64),
    Phone(String),
}

/// Move `amount` from `sender_id` to a recipient.
#[derive(Clone, Debug)]
pub struct TransferCmd {
    pub sender_id: i64,
    pub recipient: Recipient,
    pub amount: Money,
    pub pin: String,
    pub description: Option<String>,
    /// Client-chosen idempotency key. Generated when absent.
    pub reference: Option<String>,
}

impl TransferCmd {
    #[must_use]
    pub fn new(
        sender_id: i64,
        recipient: Recipient,
        amount: Money,
        pin: impl Into<String>,
    ) -> Self {
        Self {
            sender_id,
            recipient,
            amount,
            pin: pin.into(),
            description: None,
            reference: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

/// Credit `amount` to `account_id` through a payment method.
#[derive(Clone, Debug)]
pub struct TopUpCmd {
    pub account_id: i64,
    pub amount: Money,
    pub payment_method_id: i64,
    pub description: Option<String>,
    pub reference: Option<String>,
}

impl TopUpCmd {
    #[must_use]
    pub fn new(account_id: i64, amount: Money, payment_method_id: i64) -> Self {
        Self {
            account_id,
            amount,
            payment_method_id,
            description: None,
            reference: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

#[derive(Clone, Debug)]
pub struct NewAccount {
    pub full_name: String,
    pub phone: String,
    pub email: Option<String>,
    pub pin: String,
    pub opening_balance: Money,
}

impl NewAccount {
    #[must_use]
    pub fn new(full_name: impl Into<String>, phone: impl Into<String>, pin: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            phone: phone.into(),
            email: None,
            pin: pin.into(),
            opening_balance: Money::ZERO,
        }
    }

    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub fn opening_balance(mut self, balance: Money) -> Self {
        self.opening_balance = balance;
        self
    }
}

#[derive(Clone, Debug)]
pub struct NewPaymentMethod {
    pub name: String,
    pub min_amount: Money,
    pub max_amount: Money,
    pub fee_rate: FeeRate,
}

impl NewPaymentMethod {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        min_amount: Money,
        max_amount: Money,
        fee_rate: FeeRate,
    ) -> Self {
        Self {
            name: name.into(),
            min_amount,
            max_amount,
            fee_rate,
        }
    }
}
