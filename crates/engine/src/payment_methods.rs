//! Payment methods: the external rails a top-up can come from.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{EngineError, FeeRate, Money, ResultEngine};

/// A payment rail descriptor.
///
/// A top-up through this method must be within `[min_amount, max_amount]`
/// and is charged `fee_rate` of the amount.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: i64,
    pub name: String,
    pub min_amount: Money,
    pub max_amount: Money,
    pub fee_rate: FeeRate,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl PaymentMethod {
    /// Checks `amount` against the method bounds, both inclusive.
    pub fn check_amount(&self, amount: Money) -> ResultEngine<()> {
        if amount < self.min_amount || amount > self.max_amount {
            return Err(EngineError::AmountOutOfRange(format!(
                "{amount} is outside [{}, {}] for {}",
                self.min_amount, self.max_amount, self.name
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "payment_methods")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub min_amount_minor: i64,
    pub max_amount_minor: i64,
    pub fee_bps: i64,
    pub is_active: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&PaymentMethod> for ActiveModel {
    fn from(value: &PaymentMethod) -> Self {
        Self {
            id: ActiveValue::NotSet,
            name: ActiveValue::Set(value.name.clone()),
            min_amount_minor: ActiveValue::Set(value.min_amount.minor()),
            max_amount_minor: ActiveValue::Set(value.max_amount.minor()),
            fee_bps: ActiveValue::Set(value.fee_rate.basis_points()),
            is_active: ActiveValue::Set(value.is_active),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl From<Model> for PaymentMethod {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            min_amount: Money::new(model.min_amount_minor),
            max_amount: Money::new(model.max_amount_minor),
            fee_rate: FeeRate::from_basis_points(model.fee_bps),
            is_active: model.is_active,
            created_at: model.created_at,
        }
    }
}
