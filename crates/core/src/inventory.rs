//! Fridge inventory: resolves an expiry for each new item and keeps it in the store.

use crate::models::ResolvedExpiry;
use crate::resolver::{ExpiryResolver, ResolveError};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;
use storage::models::{Item, NewItem};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub item: Item,
    pub expiry: ResolvedExpiry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    Consumed,
    NotFound,
}

#[derive(Clone)]
pub struct Inventory {
    pool: SqlitePool,
    resolver: Arc<ExpiryResolver>,
}

impl Inventory {
    pub fn new(pool: SqlitePool, resolver: Arc<ExpiryResolver>) -> Self {
        Self { pool, resolver }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn resolver(&self) -> &ExpiryResolver {
        &self.resolver
    }

    /// Resolves the expiry date and stores a new active item.
    ///
    /// Nothing is written when the caller's input is rejected.
    pub async fn register(
        &self,
        name: &str,
        user_id: &str,
        manual_date: Option<&str>,
        image: Option<&Path>,
    ) -> Result<Registration, InventoryError> {
        let expiry = self.resolver.resolve(manual_date, image).await?;
        let new_item = NewItem {
            name: name.to_string(),
            user_id: user_id.to_string(),
            expiry_date: expiry.date,
            added_at: Utc::now(),
        };
        let item = storage::insert_item(&self.pool, &new_item).await?;
        info!(id = item.id, source = ?expiry.source, "item registered");
        Ok(Registration { item, expiry })
    }

    pub async fn list_active(&self, user_id: Option<&str>) -> Result<Vec<Item>, InventoryError> {
        Ok(storage::list_active(&self.pool, user_id).await?)
    }

    pub async fn consume(&self, id: i64) -> Result<ConsumeOutcome, InventoryError> {
        if storage::mark_consumed(&self.pool, id).await? {
            Ok(ConsumeOutcome::Consumed)
        } else {
            Ok(ConsumeOutcome::NotFound)
        }
    }
}

/// Days until the item expires; negative once it has.
pub fn days_left(item: &Item, today: NaiveDate) -> Option<i64> {
    item.expiry_date.map(|d| (d - today).num_days())
}
