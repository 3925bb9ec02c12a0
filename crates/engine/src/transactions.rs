//! Transaction journal records.
//!
//! A `TransactionRecord` is written once, in the same database transaction
//! that moves the balances, and is never updated afterwards.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{EngineError, Money, ReferenceNumber};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Transfer,
    TopUp,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transfer => "transfer",
            Self::TopUp => "topup",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "transfer" => Ok(Self::Transfer),
            "topup" => Ok(Self::TopUp),
            other => Err(EngineError::Database(DbErr::Type(format!(
                "invalid transaction kind: {other}"
            )))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl TryFrom<&str> for TransactionStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(EngineError::Database(DbErr::Type(format!(
                "invalid transaction status: {other}"
            )))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Assigned by the store on insert.
    pub id: i64,
    /// Absent for top-ups.
    pub sender_id: Option<i64>,
    pub receiver_id: Option<i64>,
    /// Account that requested the movement.
    pub initiated_by: i64,
    pub kind: TransactionKind,
    pub amount: Money,
    pub fee: Money,
    pub description: Option<String>,
    pub reference_number: ReferenceNumber,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Set for top-ups only.
    pub payment_method_id: Option<i64>,
}

impl TransactionRecord {
    /// What the sender is charged: `amount + fee` for transfers, nothing for
    /// top-ups.
    #[must_use]
    pub fn debit(&self) -> Money {
        match self.kind {
            TransactionKind::Transfer => self.amount + self.fee,
            TransactionKind::TopUp => Money::ZERO,
        }
    }

    /// Balance effect of this record on `account_id`.
    #[must_use]
    pub fn effect_on(&self, account_id: i64) -> Money {
        let mut effect = Money::ZERO;
        if self.sender_id == Some(account_id) {
            effect = effect - self.debit();
        }
        if self.receiver_id == Some(account_id) {
            effect = effect + self.amount;
        }
        effect
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub sender_id: Option<i64>,
    pub receiver_id: Option<i64>,
    pub initiated_by: i64,
    pub kind: String,
    pub amount_minor: i64,
    pub fee_minor: i64,
    pub description: Option<String>,
    #[sea_orm(unique)]
    pub reference_number: String,
    pub status: String,
    pub created_at: DateTimeUtc,
    pub completed_at: Option<DateTimeUtc>,
    pub payment_method_id: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&TransactionRecord> for ActiveModel {
    fn from(record: &TransactionRecord) -> Self {
        Self {
            id: ActiveValue::NotSet,
            sender_id: ActiveValue::Set(record.sender_id),
            receiver_id: ActiveValue::Set(record.receiver_id),
            initiated_by: ActiveValue::Set(record.initiated_by),
            kind: ActiveValue::Set(record.kind.as_str().to_string()),
            amount_minor: ActiveValue::Set(record.amount.minor()),
            fee_minor: ActiveValue::Set(record.fee.minor()),
            description: ActiveValue::Set(record.description.clone()),
            reference_number: ActiveValue::Set(record.reference_number.as_str().to_string()),
            status: ActiveValue::Set(record.status.as_str().to_string()),
            created_at: ActiveValue::Set(record.created_at),
            completed_at: ActiveValue::Set(record.completed_at),
            payment_method_id: ActiveValue::Set(record.payment_method_id),
        }
    }
}

impl TryFrom<Model> for TransactionRecord {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            sender_id: model.sender_id,
            receiver_id: model.receiver_id,
            initiated_by: model.initiated_by,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            amount: Money::new(model.amount_minor),
            fee: Money::new(model.fee_minor),
            description: model.description,
            reference_number: ReferenceNumber::from_stored(model.reference_number),
            status: TransactionStatus::try_from(model.status.as_str())?,
            created_at: model.created_at,
            completed_at: model.completed_at,
            payment_method_id: model.payment_method_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer(sender: i64, receiver: i64) -> TransactionRecord {
        TransactionRecord {
            id: 1,
            sender_id: Some(sender),
            receiver_id: Some(receiver),
            initiated_by: sender,
            kind: TransactionKind::Transfer,
            amount: Money::new(5_000),
            fee: Money::new(50),
            description: None,
            reference_number: ReferenceNumber::from_stored("TRX0000000000000001".to_string()),
            status: TransactionStatus::Completed,
            created_at: Utc::now(),
            completed_at: Some(Utc::now()),
            payment_method_id: None,
        }
    }

    #[test]
    fn transfer_effect_is_signed_per_side() {
        let record = transfer(1, 2);
        assert_eq!(record.effect_on(1), Money::new(-5_050));
        assert_eq!(record.effect_on(2), Money::new(5_000));
        assert_eq!(record.effect_on(3), Money::ZERO);
    }

    #[test]
    fn topup_credits_full_amount() {
        let record = TransactionRecord {
            sender_id: None,
            kind: TransactionKind::TopUp,
            fee: Money::new(40),
            payment_method_id: Some(1),
            ..transfer(1, 2)
        };
        assert_eq!(record.effect_on(2), Money::new(5_000));
        assert_eq!(record.debit(), Money::ZERO);
    }

    #[test]
    fn kinds_round_trip_through_storage_names() {
        for kind in [TransactionKind::Transfer, TransactionKind::TopUp] {
            assert_eq!(TransactionKind::try_from(kind.as_str()).unwrap(), kind);
        }
        assert!(TransactionStatus::try_from("settled").is_err());
    }
}
