use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sea_orm::{Condition, QueryFilter, QueryOrder, QuerySelect, prelude::*};

use crate::{EngineError, Money, ResultEngine, TransactionRecord, transactions};

use super::Engine;

/// Largest page `list_by_account_page` returns.
pub const MAX_HISTORY_LIMIT: u64 = 100;

/// A journal record seen from one account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub record: TransactionRecord,
    /// Signed balance effect on the queried account.
    pub effect: Money,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct HistoryCursor {
    created_at: DateTime<Utc>,
    transaction_id: i64,
}

impl HistoryCursor {
    fn encode(&self) -> ResultEngine<String> {
        let bytes = serde_json::to_vec(self)
            .map_err(|_| EngineError::InvalidCursor("invalid history cursor".to_string()))?;
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    fn decode(input: &str) -> ResultEngine<Self> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(input.as_bytes())
            .map_err(|_| EngineError::InvalidCursor("invalid history cursor".to_string()))?;
        serde_json::from_slice::<Self>(&bytes)
            .map_err(|_| EngineError::InvalidCursor("invalid history cursor".to_string()))
    }
}

impl Engine {
    /// Lists the most recent journal records where `account_id` is sender or
    /// receiver, newest first.
    pub async fn list_by_account(
        &self,
        account_id: i64,
        limit: u64,
    ) -> ResultEngine<Vec<TransactionRecord>> {
        let (items, _next) = self.list_by_account_page(account_id, limit, None).await?;
        Ok(items.into_iter().map(|entry| entry.record).collect())
    }

    /// Lists journal records for `account_id` with cursor-based pagination.
    ///
    /// Pagination is newest → older by `(created_at DESC, id DESC)`. `limit`
    /// is capped at [`MAX_HISTORY_LIMIT`].
    pub async fn list_by_account_page(
        &self,
        account_id: i64,
        limit: u64,
        cursor: Option<&str>,
    ) -> ResultEngine<(Vec<HistoryEntry>, Option<String>)> {
        let limit = limit.min(MAX_HISTORY_LIMIT);
        if limit == 0 {
            return Ok((Vec::new(), None));
        }

        let mut query = transactions::Entity::find()
            .filter(
                Condition::any()
                    .add(transactions::Column::SenderId.eq(account_id))
                    .add(transactions::Column::ReceiverId.eq(account_id)),
            )
            .order_by_desc(transactions::Column::CreatedAt)
            .order_by_desc(transactions::Column::Id)
            .limit(limit.saturating_add(1));

        if let Some(cursor) = cursor {
            let cursor = HistoryCursor::decode(cursor)?;
            query = query.filter(
                Condition::any()
                    .add(transactions::Column::CreatedAt.lt(cursor.created_at))
                    .add(
                        Condition::all()
                            .add(transactions::Column::CreatedAt.eq(cursor.created_at))
                            .add(transactions::Column::Id.lt(cursor.transaction_id)),
                    ),
            );
        }

        let rows = query.all(&self.database).await?;
        let has_more = rows.len() > limit as usize;

        let mut out = Vec::with_capacity(rows.len().min(limit as usize));
        for model in rows.into_iter().take(limit as usize) {
            let record = TransactionRecord::try_from(model)?;
            out.push(HistoryEntry {
                effect: record.effect_on(account_id),
                record,
            });
        }

        let next_cursor = if has_more {
            out.last()
                .map(|entry| HistoryCursor {
                    created_at: entry.record.created_at,
                    transaction_id: entry.record.id,
                })
                .map(|c| c.encode())
                .transpose()?
        } else {
            None
        };

        Ok((out, next_cursor))
    }
}
