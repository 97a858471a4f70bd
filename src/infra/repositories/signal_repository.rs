//! Persisted signal history.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use super::asset_repository::find_asset;
use super::entities::signal::{self, ActiveModel, Entity as SignalEntity};
use crate::domain::{NewSignal, SignalRecord};
use crate::errors::AppResult;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait SignalRepository: Send + Sync {
    /// Signals for `symbol` computed at or after `since`, newest first.
    /// Returns one page and the total count.
    async fn history(
        &self,
        symbol: &str,
        since: DateTime<Utc>,
        page: u64,
        per_page: u64,
    ) -> AppResult<(Vec<SignalRecord>, u64)>;
}

pub struct SignalStore {
    db: DatabaseConnection,
}

impl SignalStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

pub(crate) async fn insert_signal<C: ConnectionTrait>(
    conn: &C,
    symbol: &str,
    new: NewSignal,
) -> AppResult<SignalRecord> {
    let now = Utc::now();
    let active_model = ActiveModel {
        id: Set(Uuid::new_v4()),
        asset_id: Set(new.asset_id),
        timeframe: Set(new.timeframe),
        as_of: Set(new.as_of),
        rsi: Set(new.rsi),
        ema_fast: Set(new.ema_fast),
        ema_slow: Set(new.ema_slow),
        macd: Set(new.macd),
        macd_signal: Set(new.macd_signal),
        bb_upper: Set(new.bb_upper),
        bb_middle: Set(new.bb_middle),
        bb_lower: Set(new.bb_lower),
        decision: Set(new.decision.as_str().to_string()),
        confidence: Set(new.confidence),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let model = active_model.insert(conn).await?;
    Ok(model.into_record(symbol))
}

#[async_trait]
impl SignalRepository for SignalStore {
    async fn history(
        &self,
        symbol: &str,
        since: DateTime<Utc>,
        page: u64,
        per_page: u64,
    ) -> AppResult<(Vec<SignalRecord>, u64)> {
        let Some(asset) = find_asset(&self.db, symbol).await? else {
            return Ok((Vec::new(), 0));
        };

        let paginator = SignalEntity::find()
            .filter(signal::Column::AssetId.eq(asset.id))
            .filter(signal::Column::AsOf.gte(since))
            .order_by_desc(signal::Column::AsOf)
            .paginate(&self.db, per_page.max(1));

        let total = paginator.num_items().await?;
        let models = paginator.fetch_page(page.saturating_sub(1)).await?;

        let records = models
            .into_iter()
            .map(|m| m.into_record(&asset.symbol))
            .collect();

        Ok((records, total))
    }
}
