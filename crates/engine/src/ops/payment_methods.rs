use sea_orm::{ActiveValue, ConnectionTrait, QueryOrder, prelude::*};

use crate::{
    EngineError, NewPaymentMethod, PaymentMethod, ResultEngine, payment_methods,
    util::normalize_required,
};

use super::Engine;

impl Engine {
    /// Registers a payment method, active from the start.
    pub async fn new_payment_method(&self, cmd: NewPaymentMethod) -> ResultEngine<PaymentMethod> {
        let name = normalize_required(&cmd.name, "payment method name")?;
        if !cmd.min_amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "minimum amount must be > 0".to_string(),
            ));
        }
        if cmd.min_amount > cmd.max_amount {
            return Err(EngineError::InvalidAmount(
                "minimum amount exceeds maximum amount".to_string(),
            ));
        }
        if cmd.fee_rate.basis_points() < 0 {
            return Err(EngineError::InvalidAmount(
                "fee rate must not be negative".to_string(),
            ));
        }

        let method = PaymentMethod {
            id: 0,
            name,
            min_amount: cmd.min_amount,
            max_amount: cmd.max_amount,
            fee_rate: cmd.fee_rate,
            is_active: true,
            created_at: self.clock.now(),
        };
        let model = payment_methods::ActiveModel::from(&method)
            .insert(&self.database)
            .await?;
        tracing::info!(payment_method_id = model.id, name = %model.name, "payment method registered");
        Ok(PaymentMethod::from(model))
    }

    /// Returns a payment method whether active or not.
    pub async fn payment_method(&self, id: i64) -> ResultEngine<PaymentMethod> {
        require_payment_method(&self.database, id)
            .await
            .map(PaymentMethod::from)
    }

    /// Lists every registered payment method, oldest first.
    pub async fn payment_methods(&self) -> ResultEngine<Vec<PaymentMethod>> {
        let models = payment_methods::Entity::find()
            .order_by_asc(payment_methods::Column::Id)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(PaymentMethod::from).collect())
    }

    pub async fn set_payment_method_active(
        &self,
        id: i64,
        active: bool,
    ) -> ResultEngine<PaymentMethod> {
        let model = require_payment_method(&self.database, id).await?;
        let mut active_model: payment_methods::ActiveModel = model.into();
        active_model.is_active = ActiveValue::Set(active);
        let model = active_model.update(&self.database).await?;
        tracing::info!(payment_method_id = id, active, "payment method availability changed");
        Ok(PaymentMethod::from(model))
    }
}

async fn require_payment_method<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> ResultEngine<payment_methods::Model> {
    payment_methods::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| EngineError::UnknownPaymentMethod(id.to_string()))
}
