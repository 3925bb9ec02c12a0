use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, prelude::*};

use crate::{
    Account, EngineError, NewAccount, ResultEngine, accounts,
    credentials::{hash_pin_blocking, validate_pin},
    util::{normalize_optional_text, normalize_required},
};

use super::Engine;

impl Engine {
    /// Opens a new account.
    ///
    /// The phone number is the account's public handle and must be unique.
    pub async fn open_account(&self, cmd: NewAccount) -> ResultEngine<Account> {
        let full_name = normalize_required(&cmd.full_name, "full name")?;
        let phone = normalize_required(&cmd.phone, "phone")?;
        let email = normalize_optional_text(cmd.email.as_deref());
        validate_pin(&cmd.pin)?;
        if cmd.opening_balance.is_negative() {
            return Err(EngineError::InvalidAmount(
                "opening balance must be >= 0".to_string(),
            ));
        }
        let pin_hash = hash_pin_blocking(cmd.pin.clone(), self.pin_hash_cost).await?;
        let now = self.clock.now();

        self.with_tx(move |_engine, db_tx| {
            Box::pin(async move {
                let existing = accounts::Entity::find()
                    .filter(accounts::Column::Phone.eq(phone.clone()))
                    .one(db_tx)
                    .await?;
                if existing.is_some() {
                    return Err(EngineError::ExistingKey(phone));
                }

                let model = accounts::ActiveModel {
                    id: ActiveValue::NotSet,
                    full_name: ActiveValue::Set(full_name),
                    phone: ActiveValue::Set(phone.clone()),
                    email: ActiveValue::Set(email),
                    pin_hash: ActiveValue::Set(pin_hash),
                    balance_minor: ActiveValue::Set(cmd.opening_balance.minor()),
                    is_active: ActiveValue::Set(true),
                    created_at: ActiveValue::Set(now),
                    updated_at: ActiveValue::Set(now),
                }
                .insert(db_tx)
                .await
                .map_err(|err| {
                    if EngineError::is_unique_violation(&err) {
                        EngineError::ExistingKey(phone.clone())
                    } else {
                        err.into()
                    }
                })?;

                tracing::info!(account_id = model.id, "account opened");
                Ok(Account::from(model))
            })
        })
        .await
    }

    /// Returns an active account by id.
    pub async fn account(&self, id: i64) -> ResultEngine<Account> {
        require_active_account(&self.database, id)
            .await
            .map(Account::from)
    }

    /// Returns an active account by phone number.
    pub async fn account_by_phone(&self, phone: &str) -> ResultEngine<Account> {
        find_active_by_phone(&self.database, phone.trim())
            .await?
            .map(Account::from)
            .ok_or_else(|| EngineError::AccountNotFound(phone.trim().to_string()))
    }
}

pub(super) async fn find_active_account<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> ResultEngine<Option<accounts::Model>> {
    Ok(accounts::Entity::find_by_id(id)
        .filter(accounts::Column::IsActive.eq(true))
        .one(db)
        .await?)
}

pub(super) async fn require_active_account<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> ResultEngine<accounts::Model> {
    find_active_account(db, id)
        .await?
        .ok_or_else(|| EngineError::AccountNotFound(id.to_string()))
}

pub(super) async fn find_active_by_phone<C: ConnectionTrait>(
    db: &C,
    phone: &str,
) -> ResultEngine<Option<accounts::Model>> {
    Ok(accounts::Entity::find()
        .filter(accounts::Column::Phone.eq(phone.to_string()))
        .filter(accounts::Column::IsActive.eq(true))
        .one(db)
        .await?)
}
