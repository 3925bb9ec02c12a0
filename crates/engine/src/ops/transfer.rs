use sea_orm::EntityTrait;
use serde::{Deserialize, Serialize};

use crate::{
    EngineError, FeeOperation, Money, Recipient, ResultEngine, TransactionKind, TransactionRecord,
    TransactionStatus, TransferCmd, accounts,
    util::{ensure_positive, normalize_optional_text, parse_client_reference},
};

use super::{
    Engine,
    accounts::{find_active_account, find_active_by_phone, require_active_account},
    ledger::Committed,
};

/// The other side of a transfer, as shown to the sender.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counterparty {
    pub id: i64,
    pub full_name: String,
    pub phone: String,
}

impl From<accounts::Model> for Counterparty {
    fn from(model: accounts::Model) -> Self {
        Self {
            id: model.id,
            full_name: model.full_name,
            phone: model.phone,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub record: TransactionRecord,
    /// Sender balance after the transfer. For a replay, the current balance.
    pub sender_balance: Money,
    pub receiver: Counterparty,
    /// `true` when the reference matched an already committed transfer.
    pub replayed: bool,
}

impl Engine {
    /// Moves `cmd.amount` from the sender to the recipient.
    ///
    /// The sender is charged `amount + fee`; the recipient receives `amount`.
    /// Every validation runs before the store is written. The debit, the
    /// credit and the journal row are committed together or not at all.
    pub async fn transfer(&self, cmd: TransferCmd) -> ResultEngine<TransferReceipt> {
        ensure_positive(cmd.amount)?;
        let client_reference = parse_client_reference(cmd.reference.as_deref())?;
        let description = normalize_optional_text(cmd.description.as_deref());

        if cmd.recipient == Recipient::Id(cmd.sender_id) {
            tracing::debug!(sender_id = cmd.sender_id, "self transfer rejected");
            return Err(EngineError::SelfTransfer);
        }
        // A retry is answered from the journal, whatever the receiver's
        // state is now.
        if let Some(reference) = &client_reference
            && let Some(existing) = self.find_by_reference(reference).await?
        {
            return self.replay_transfer(&cmd, existing).await;
        }

        let receiver = self.resolve_recipient(&cmd.recipient).await?;
        if receiver.id == cmd.sender_id {
            tracing::debug!(sender_id = cmd.sender_id, "self transfer rejected");
            return Err(EngineError::SelfTransfer);
        }

        self.check_pin(&cmd).await?;

        let fee = self.fees.compute_fee(cmd.amount, FeeOperation::Transfer);
        cmd.amount
            .checked_add(fee)
            .ok_or_else(|| EngineError::InvalidAmount("amount too large".to_string()))?;

        let now = self.clock.now();
        let sender_id = cmd.sender_id;
        let receiver_id = receiver.id;
        let amount = cmd.amount;

        let committed = self
            .commit_movement(
                client_reference,
                |reference_number| TransactionRecord {
                    id: 0,
                    sender_id: Some(sender_id),
                    receiver_id: Some(receiver_id),
                    initiated_by: sender_id,
                    kind: TransactionKind::Transfer,
                    amount,
                    fee,
                    description: description.clone(),
                    reference_number,
                    status: TransactionStatus::Completed,
                    created_at: now,
                    completed_at: Some(now),
                    payment_method_id: None,
                },
                |existing| {
                    existing.kind == TransactionKind::Transfer
                        && existing.initiated_by == sender_id
                        && existing.receiver_id == Some(receiver_id)
                        && existing.amount == amount
                },
            )
            .await?;

        match committed {
            Committed::New(applied) => {
                tracing::info!(
                    reference = %applied.record.reference_number,
                    sender_id,
                    receiver_id,
                    amount = %amount,
                    fee = %fee,
                    "transfer committed"
                );
                Ok(TransferReceipt {
                    sender_balance: applied.sender_balance.unwrap_or_default(),
                    record: applied.record,
                    receiver: Counterparty::from(receiver),
                    replayed: false,
                })
            }
            Committed::Replayed(record) => {
                let sender = require_active_account(&self.database, sender_id).await?;
                Ok(TransferReceipt {
                    record,
                    sender_balance: Money::new(sender.balance_minor),
                    receiver: Counterparty::from(receiver),
                    replayed: true,
                })
            }
        }
    }

    async fn check_pin(&self, cmd: &TransferCmd) -> ResultEngine<()> {
        if !self.credentials.verify_pin(cmd.sender_id, &cmd.pin).await? {
            tracing::debug!(sender_id = cmd.sender_id, "transfer rejected: invalid pin");
            return Err(EngineError::InvalidCredential);
        }
        Ok(())
    }

    /// Answers a transfer whose reference is already in the journal.
    async fn replay_transfer(
        &self,
        cmd: &TransferCmd,
        existing: TransactionRecord,
    ) -> ResultEngine<TransferReceipt> {
        self.check_pin(cmd).await?;

        let receiver = match existing.receiver_id {
            Some(id) => accounts::Entity::find_by_id(id).one(&self.database).await?,
            None => None,
        };
        let same_recipient = receiver.as_ref().is_some_and(|receiver| match &cmd.recipient {
            Recipient::Id(id) => receiver.id == *id,
            Recipient::Phone(phone) => receiver.phone == phone.trim(),
        });

        let reference = existing.reference_number.clone();
        let Some(receiver) = receiver.filter(|_| {
            same_recipient
                && existing.kind == TransactionKind::Transfer
                && existing.initiated_by == cmd.sender_id
                && existing.amount == cmd.amount
        }) else {
            tracing::warn!(%reference, "reference number reused by a different request");
            return Err(EngineError::DuplicateReference(reference.to_string()));
        };

        tracing::warn!(%reference, transaction_id = existing.id, "replaying committed transfer");
        let sender = require_active_account(&self.database, cmd.sender_id).await?;
        Ok(TransferReceipt {
            record: existing,
            sender_balance: Money::new(sender.balance_minor),
            receiver: Counterparty::from(receiver),
            replayed: true,
        })
    }

    async fn resolve_recipient(&self, recipient: &Recipient) -> ResultEngine<accounts::Model> {
        let found = match recipient {
            Recipient::Id(id) => find_active_account(&self.database, *id).await?,
            Recipient::Phone(phone) => find_active_by_phone(&self.database, phone.trim()).await?,
        };
        found.ok_or_else(|| {
            let label = match recipient {
                Recipient::Id(id) => id.to_string(),
                Recipient::Phone(phone) => phone.trim().to_string(),
            };
            tracing::debug!(recipient = %label, "transfer rejected: unknown receiver");
            EngineError::ReceiverNotFound(label)
        })
    }
}
