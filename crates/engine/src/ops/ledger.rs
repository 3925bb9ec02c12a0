//! The atomic store primitive shared by transfers and top-ups.
//!
//! A movement is one journal row plus the balance changes it describes. All
//! of it runs inside a single database transaction:
//!
//! 1. the journal row is inserted first, so a reused reference number fails
//!    before any balance is touched;
//! 2. balances are changed in increasing account id order;
//! 3. a debit is a conditional `UPDATE ... WHERE balance_minor >= debit`, so
//!    the sufficiency check and the write are one statement.

use sea_orm::{
    DatabaseTransaction, QueryFilter,
    prelude::*,
    sea_query::Expr,
};

use crate::{
    EngineError, Money, ReferenceNumber, ResultEngine, TransactionKind, TransactionRecord,
    accounts, transactions,
};

use super::Engine;

/// Attempts at drawing a fresh generated reference after a collision.
const MAX_REFERENCE_ATTEMPTS: usize = 3;

/// A committed movement.
#[derive(Debug)]
pub(super) struct Applied {
    pub record: TransactionRecord,
    pub sender_balance: Option<Money>,
    pub receiver_balance: Money,
}

pub(super) enum Committed {
    New(Applied),
    /// A request with the same reference was already committed.
    Replayed(TransactionRecord),
}

impl Engine {
    /// Commits the movement built by `build` under a reference number.
    ///
    /// With a client reference, an existing journal row that `same_request`
    /// accepts is replayed instead of applied again. Without one, a colliding
    /// generated reference is replaced by a fresh one.
    pub(super) async fn commit_movement<B, M>(
        &self,
        client_reference: Option<ReferenceNumber>,
        build: B,
        same_request: M,
    ) -> ResultEngine<Committed>
    where
        B: Fn(ReferenceNumber) -> TransactionRecord,
        M: Fn(&TransactionRecord) -> bool,
    {
        if let Some(reference) = &client_reference
            && let Some(existing) = self.replayable(reference, &same_request).await?
        {
            return Ok(Committed::Replayed(existing));
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            let reference = client_reference
                .clone()
                .unwrap_or_else(|| self.references.next_reference());
            let record = build(reference.clone());

            let result = self
                .with_tx(move |engine, db_tx| {
                    Box::pin(async move { engine.apply_movement(db_tx, &record).await })
                })
                .await;

            match result {
                Ok(applied) => return Ok(Committed::New(applied)),
                Err(EngineError::DuplicateReference(_)) => {
                    if let Some(reference) = &client_reference {
                        // A concurrent request with the same reference won.
                        return match self.replayable(reference, &same_request).await? {
                            Some(existing) => Ok(Committed::Replayed(existing)),
                            None => Err(EngineError::DuplicateReference(reference.to_string())),
                        };
                    }
                    if attempt >= MAX_REFERENCE_ATTEMPTS {
                        tracing::warn!(%reference, attempt, "generated reference collided, giving up");
                        return Err(EngineError::DuplicateReference(reference.to_string()));
                    }
                    tracing::warn!(%reference, attempt, "generated reference collided, retrying");
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Looks `reference` up and decides whether it may be replayed.
    async fn replayable<M>(
        &self,
        reference: &ReferenceNumber,
        same_request: &M,
    ) -> ResultEngine<Option<TransactionRecord>>
    where
        M: Fn(&TransactionRecord) -> bool,
    {
        let Some(existing) = self.find_by_reference(reference).await? else {
            return Ok(None);
        };
        if same_request(&existing) {
            tracing::warn!(%reference, transaction_id = existing.id, "replaying committed movement");
            Ok(Some(existing))
        } else {
            tracing::warn!(%reference, "reference number reused by a different request");
            Err(EngineError::DuplicateReference(reference.to_string()))
        }
    }

    pub(super) async fn find_by_reference(
        &self,
        reference: &ReferenceNumber,
    ) -> ResultEngine<Option<TransactionRecord>> {
        transactions::Entity::find()
            .filter(transactions::Column::ReferenceNumber.eq(reference.as_str()))
            .one(&self.database)
            .await?
            .map(TransactionRecord::try_from)
            .transpose()
    }

    /// Appends `record` to the journal and applies its balance changes.
    async fn apply_movement(
        &self,
        db_tx: &DatabaseTransaction,
        record: &TransactionRecord,
    ) -> ResultEngine<Applied> {
        let stored = transactions::ActiveModel::from(record)
            .insert(db_tx)
            .await
            .map_err(|err| {
                if EngineError::is_unique_violation(&err) {
                    EngineError::DuplicateReference(record.reference_number.to_string())
                } else {
                    err.into()
                }
            })?;
        let stored = TransactionRecord::try_from(stored)?;

        let receiver_id = stored.receiver_id.ok_or_else(|| {
            EngineError::AccountNotFound("movement without a receiver".to_string())
        })?;

        let mut steps: Vec<(i64, Money)> = Vec::with_capacity(2);
        if let Some(sender_id) = stored.sender_id {
            steps.push((sender_id, -stored.debit()));
        }
        steps.push((receiver_id, stored.amount));
        steps.sort_by_key(|(account_id, _)| *account_id);

        let now = stored.completed_at.unwrap_or(stored.created_at);
        for (account_id, delta) in steps {
            if delta.is_negative() {
                debit(db_tx, account_id, -delta, now).await?;
            } else {
                credit(db_tx, account_id, delta, now, stored.kind).await?;
            }
        }

        let sender_balance = match stored.sender_id {
            Some(sender_id) => Some(balance_of(db_tx, sender_id).await?),
            None => None,
        };
        let receiver_balance = balance_of(db_tx, receiver_id).await?;

        Ok(Applied {
            record: stored,
            sender_balance,
            receiver_balance,
        })
    }
}

async fn debit(
    db_tx: &DatabaseTransaction,
    account_id: i64,
    amount: Money,
    now: DateTimeUtc,
) -> ResultEngine<()> {
    let result = accounts::Entity::update_many()
        .col_expr(
            accounts::Column::BalanceMinor,
            Expr::col(accounts::Column::BalanceMinor).sub(amount.minor()),
        )
        .col_expr(accounts::Column::UpdatedAt, Expr::value(now))
        .filter(accounts::Column::Id.eq(account_id))
        .filter(accounts::Column::IsActive.eq(true))
        .filter(accounts::Column::BalanceMinor.gte(amount.minor()))
        .exec(db_tx)
        .await?;
    if result.rows_affected == 1 {
        return Ok(());
    }

    let account = accounts::Entity::find_by_id(account_id)
        .filter(accounts::Column::IsActive.eq(true))
        .one(db_tx)
        .await?
        .ok_or_else(|| EngineError::AccountNotFound(account_id.to_string()))?;
    Err(EngineError::InsufficientFunds(format!(
        "balance {} is below {amount}",
        Money::new(account.balance_minor)
    )))
}

async fn credit(
    db_tx: &DatabaseTransaction,
    account_id: i64,
    amount: Money,
    now: DateTimeUtc,
    kind: TransactionKind,
) -> ResultEngine<()> {
    let result = accounts::Entity::update_many()
        .col_expr(
            accounts::Column::BalanceMinor,
            Expr::col(accounts::Column::BalanceMinor).add(amount.minor()),
        )
        .col_expr(accounts::Column::UpdatedAt, Expr::value(now))
        .filter(accounts::Column::Id.eq(account_id))
        .filter(accounts::Column::IsActive.eq(true))
        .exec(db_tx)
        .await?;
    if result.rows_affected == 1 {
        return Ok(());
    }
    Err(match kind {
        TransactionKind::Transfer => EngineError::ReceiverNotFound(account_id.to_string()),
        TransactionKind::TopUp => EngineError::AccountNotFound(account_id.to_string()),
    })
}

async fn balance_of(db_tx: &DatabaseTransaction, account_id: i64) -> ResultEngine<Money> {
    accounts::Entity::find_by_id(account_id)
        .one(db_tx)
        .await?
        .map(|account| Money::new(account.balance_minor))
        .ok_or_else(|| EngineError::AccountNotFound(account_id.to_string()))
}
