use serde::{Deserialize, Serialize};

use crate::{
    EngineError, FeeOperation, Money, ResultEngine, TopUpCmd, TransactionKind, TransactionRecord,
    TransactionStatus,
    util::{ensure_positive, normalize_optional_text, parse_client_reference},
};

use super::{Engine, accounts::require_active_account, ledger::Committed};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopUpReceipt {
    pub record: TransactionRecord,
    /// Account balance after the credit. For a replay, the current balance.
    pub balance: Money,
    pub replayed: bool,
}

impl Engine {
    /// Credits `cmd.amount` to an account through a payment method.
    ///
    /// The fee is computed from the method rate and recorded on the journal
    /// row; the account is credited the full amount.
    pub async fn topup(&self, cmd: TopUpCmd) -> ResultEngine<TopUpReceipt> {
        ensure_positive(cmd.amount)?;
        let client_reference = parse_client_reference(cmd.reference.as_deref())?;
        let description = normalize_optional_text(cmd.description.as_deref());

        let method = self.payment_method(cmd.payment_method_id).await?;
        if !method.is_active {
            tracing::debug!(payment_method_id = method.id, "top-up rejected: method inactive");
            return Err(EngineError::UnknownPaymentMethod(method.id.to_string()));
        }
        if let Err(err) = method.check_amount(cmd.amount) {
            tracing::debug!(payment_method_id = method.id, amount = %cmd.amount, "top-up rejected: out of range");
            return Err(err);
        }
        require_active_account(&self.database, cmd.account_id).await?;

        let fee = self.fees.compute_fee(cmd.amount, FeeOperation::TopUp(&method));
        let now = self.clock.now();
        let account_id = cmd.account_id;
        let amount = cmd.amount;
        let method_id = method.id;

        let committed = self
            .commit_movement(
                client_reference,
                |reference_number| TransactionRecord {
                    id: 0,
                    sender_id: None,
                    receiver_id: Some(account_id),
                    initiated_by: account_id,
                    kind: TransactionKind::TopUp,
                    amount,
                    fee,
                    description: description.clone(),
                    reference_number,
                    status: TransactionStatus::Completed,
                    created_at: now,
                    completed_at: Some(now),
                    payment_method_id: Some(method_id),
                },
                |existing| {
                    existing.kind == TransactionKind::TopUp
                        && existing.initiated_by == account_id
                        && existing.payment_method_id == Some(method_id)
                        && existing.amount == amount
                },
            )
            .await?;

        match committed {
            Committed::New(applied) => {
                tracing::info!(
                    reference = %applied.record.reference_number,
                    account_id,
                    payment_method_id = method_id,
                    amount = %amount,
                    fee = %fee,
                    "top-up committed"
                );
                Ok(TopUpReceipt {
                    record: applied.record,
                    balance: applied.receiver_balance,
                    replayed: false,
                })
            }
            Committed::Replayed(record) => {
                let account = require_active_account(&self.database, account_id).await?;
                Ok(TopUpReceipt {
                    record,
                    balance: Money::new(account.balance_minor),
                    replayed: true,
                })
            }
        }
    }
}
