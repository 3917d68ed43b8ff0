pub mod memory;
pub mod rest;
pub mod types;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use types::{ActivityPoint, DashboardStats, Item, ItemQuery, NewSource, RowId, Source};

/// Remote tables backing the dashboard: `items` (the ingestion queue) and `sources`.
#[async_trait]
pub trait AdminStore: Send + Sync {
    /// All sources, ordered by name.
    async fn list_sources(&self) -> Result<Vec<Source>>;

    /// Newest items first, with the owning source's name joined in.
    async fn list_items(&self, query: &ItemQuery) -> Result<Vec<Item>>;

    async fn dashboard_stats(&self) -> Result<DashboardStats>;

    /// Status and creation time of the newest `limit` items.
    async fn recent_activity(&self, limit: u32) -> Result<Vec<ActivityPoint>>;

    /// Put an item back in the queue: PENDING, no error, zero retries.
    async fn retry_item(&self, id: &RowId) -> Result<()>;

    async fn delete_item(&self, id: &RowId) -> Result<()>;

    async fn add_source(&self, source: &NewSource) -> Result<()>;

    async fn set_source_active(&self, id: &RowId, active: bool) -> Result<()>;

    async fn delete_source(&self, id: &RowId) -> Result<()>;

    async fn mark_source_checked(&self, id: &RowId, at: DateTime<Utc>) -> Result<()>;
}
