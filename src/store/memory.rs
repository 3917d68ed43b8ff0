use super::types::*;
use super::AdminStore;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::{Mutex, MutexGuard};

/// In-process store with the same semantics as the hosted tables.
/// Backs `--demo` mode and the test suite.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    items: Vec<Item>,
    sources: Vec<Source>,
    next_id: u64,
}

impl Tables {
    fn next_id(&mut self) -> RowId {
        self.next_id += 1;
        RowId::int(self.next_id as i64)
    }

    fn source_name(&self, id: Option<&RowId>) -> Option<String> {
        id.and_then(|id| self.sources.iter().find(|s| &s.id == id))
            .map(|s| s.name.clone())
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>> {
        self.inner
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))
    }

    /// Insert a queue item as the workflow engine would. Returns its id.
    pub fn push_item(
        &self,
        source_id: Option<&RowId>,
        title: &str,
        status: ItemStatus,
        created_at: DateTime<Utc>,
        error_message: Option<&str>,
    ) -> Result<RowId> {
        let mut t = self.tables()?;
        let id = t.next_id();
        t.items.push(Item {
            id: id.clone(),
            source_id: source_id.cloned(),
            source_name: None,
            title_original: Some(title.to_string()),
            original_url: Some(format!("https://example.invalid/articles/{}", id)),
            status,
            created_at: Some(created_at),
            error_message: error_message.map(str::to_string),
            retry_count: if error_message.is_some() { 1 } else { 0 },
            extra: serde_json::Map::new(),
        });
        Ok(id)
    }

    /// Fetch a single item by id (joined like `list_items`).
    pub fn item(&self, id: &RowId) -> Result<Option<Item>> {
        let t = self.tables()?;
        Ok(t.items.iter().find(|i| &i.id == id).map(|i| {
            let mut item = i.clone();
            item.source_name = t.source_name(item.source_id.as_ref());
            item
        }))
    }

    pub fn source_by_name(&self, name: &str) -> Result<Option<Source>> {
        let t = self.tables()?;
        Ok(t.sources.iter().find(|s| s.name == name).cloned())
    }

    /// Sample data for demo mode.
    pub fn seeded() -> Result<Self> {
        let store = Self::new();
        let now = Utc::now();
        let cities = [
            ("Warszawa News", "warszawa", true),
            ("Kraków Daily", "krakow", true),
            ("Łódź Express", "lodz", false),
        ];
        let mut source_ids = Vec::new();
        {
            let mut t = store.tables()?;
            for (name, slug, active) in cities {
                let id = t.next_id();
                t.sources.push(Source {
                    id: id.clone(),
                    name: name.to_string(),
                    city_slug: Some(slug.to_string()),
                    rss_url: Some(format!("https://{}.example.invalid/feed", slug)),
                    wp_api_endpoint: Some(format!("https://wp.{}.example.invalid/wp-json/wp/v2", slug)),
                    wp_username: Some("editor".to_string()),
                    wp_app_password: Some("xxxx xxxx xxxx".to_string()),
                    is_active: active,
                    last_checked_at: None,
                });
                source_ids.push(id);
            }
        }

        let samples: [(&str, ItemStatus, Option<&str>); 9] = [
            ("Tram line 4 closed for repairs", ItemStatus::Pending, None),
            ("City council approves budget", ItemStatus::Published, None),
            ("New bridge opens to traffic", ItemStatus::Published, None),
            ("Heatwave warning for the weekend", ItemStatus::FailedAi, Some("model returned empty completion")),
            ("Marathon route announced", ItemStatus::FailedWp, Some("WordPress returned 401 Unauthorized")),
            ("Library extends opening hours", ItemStatus::Processing, None),
            ("Museum night tickets sold out", ItemStatus::FailedCrawl, Some("timeout fetching article body")),
            ("Airport expansion debate", ItemStatus::SkippedDuplicate, None),
            ("Stadium renovation delayed", ItemStatus::Error, Some("unexpected null in payload")),
        ];
        for (i, (title, status, error)) in samples.into_iter().enumerate() {
            let source = &source_ids[i % source_ids.len()];
            let created = now - Duration::minutes(17 * i as i64);
            store.push_item(Some(source), title, status, created, error)?;
        }
        Ok(store)
    }
}

#[async_trait]
impl AdminStore for MemoryStore {
    async fn list_sources(&self) -> Result<Vec<Source>> {
        let t = self.tables()?;
        let mut sources = t.sources.clone();
        sources.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(sources)
    }

    async fn list_items(&self, query: &ItemQuery) -> Result<Vec<Item>> {
        let t = self.tables()?;
        let mut items: Vec<Item> = t
            .items
            .iter()
            .filter(|i| query.statuses.is_empty() || query.statuses.contains(&i.status))
            .filter(|i| query.source_id.is_none() || i.source_id == query.source_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        items.truncate(query.limit as usize);
        for item in &mut items {
            item.source_name = t.source_name(item.source_id.as_ref());
        }
        Ok(items)
    }

    async fn dashboard_stats(&self) -> Result<DashboardStats> {
        let t = self.tables()?;
        let mut stats = DashboardStats::default();
        for item in &t.items {
            match item.status {
                ItemStatus::Published => stats.published += 1,
                ItemStatus::Pending => stats.pending += 1,
                s if s.is_failure() => stats.failed += 1,
                _ => {}
            }
        }
        stats.active_sources = t.sources.iter().filter(|s| s.is_active).count() as u64;
        Ok(stats)
    }

    async fn recent_activity(&self, limit: u32) -> Result<Vec<ActivityPoint>> {
        let t = self.tables()?;
        let mut points: Vec<ActivityPoint> = t
            .items
            .iter()
            .map(|i| ActivityPoint { status: i.status, created_at: i.created_at })
            .collect();
        points.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        points.truncate(limit as usize);
        Ok(points)
    }

    async fn retry_item(&self, id: &RowId) -> Result<()> {
        let mut t = self.tables()?;
        // Like a PATCH with an eq filter: no matching row is not an error.
        if let Some(item) = t.items.iter_mut().find(|i| &i.id == id) {
            item.status = ItemStatus::Pending;
            item.error_message = None;
            item.retry_count = 0;
        }
        Ok(())
    }

    async fn delete_item(&self, id: &RowId) -> Result<()> {
        self.tables()?.items.retain(|i| &i.id != id);
        Ok(())
    }

    async fn add_source(&self, source: &NewSource) -> Result<()> {
        let mut t = self.tables()?;
        if t.sources.iter().any(|s| s.city_slug.as_deref() == Some(source.city_slug.as_str())) {
            anyhow::bail!("duplicate key value violates unique constraint \"sources_city_slug_key\"");
        }
        let id = t.next_id();
        t.sources.push(Source {
            id,
            name: source.name.clone(),
            city_slug: Some(source.city_slug.clone()),
            rss_url: Some(source.rss_url.clone()),
            wp_api_endpoint: Some(source.wp_api_endpoint.clone()),
            wp_username: Some(source.wp_username.clone()),
            wp_app_password: Some(source.wp_app_password.clone()),
            is_active: true,
            last_checked_at: None,
        });
        Ok(())
    }

    async fn set_source_active(&self, id: &RowId, active: bool) -> Result<()> {
        let mut t = self.tables()?;
        if let Some(source) = t.sources.iter_mut().find(|s| &s.id == id) {
            source.is_active = active;
        }
        Ok(())
    }

    async fn delete_source(&self, id: &RowId) -> Result<()> {
        let mut t = self.tables()?;
        if t.items.iter().any(|i| i.source_id.as_ref() == Some(id)) {
            anyhow::bail!("update or delete on table \"sources\" violates foreign key constraint on table \"items\"");
        }
        t.sources.retain(|s| &s.id != id);
        Ok(())
    }

    async fn mark_source_checked(&self, id: &RowId, at: DateTime<Utc>) -> Result<()> {
        let mut t = self.tables()?;
        if let Some(source) = t.sources.iter_mut().find(|s| &s.id == id) {
            source.last_checked_at = Some(at);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_seeded_store_has_every_kind_of_row() {
        let store = MemoryStore::seeded().unwrap();
        let stats = store.dashboard_stats().await.unwrap();
        assert_eq!(stats.published, 2);
        assert_eq!(stats.failed, 3);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.active_sources, 2);
    }

    #[tokio::test]
    async fn test_list_items_filters_and_joins() {
        let store = MemoryStore::seeded().unwrap();
        let query = ItemQuery {
            limit: 50,
            statuses: vec![ItemStatus::FailedWp, ItemStatus::FailedAi],
            source_id: None,
        };
        let items = store.list_items(&query).await.unwrap();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.source_name.is_some()));
        assert!(items[0].created_at >= items[1].created_at);

        let all = ItemQuery { limit: 3, statuses: vec![], source_id: None };
        assert_eq!(store.list_items(&all).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_delete_source_with_items_is_rejected() {
        let store = MemoryStore::seeded().unwrap();
        let source = store.source_by_name("Warszawa News").unwrap().unwrap();
        assert!(store.delete_source(&source.id).await.is_err());
    }

    #[tokio::test]
    async fn test_duplicate_slug_is_rejected() {
        let store = MemoryStore::seeded().unwrap();
        let dup = NewSource {
            name: "Warsaw again".into(),
            city_slug: "warszawa".into(),
            rss_url: "https://a.example/feed".into(),
            wp_api_endpoint: "https://a.example/wp-json".into(),
            wp_username: String::new(),
            wp_app_password: String::new(),
        };
        assert!(store.add_source(&dup).await.is_err());
    }

    #[tokio::test]
    async fn test_retry_is_idempotent() {
        let store = MemoryStore::new();
        let id = store
            .push_item(None, "Bridge closed", ItemStatus::FailedWp, Utc::now(), Some("401"))
            .unwrap();
        for _ in 0..2 {
            store.retry_item(&id).await.unwrap();
            let item = store.item(&id).unwrap().unwrap();
            assert_eq!(item.status, ItemStatus::Pending);
            assert_eq!(item.error_message, None);
            assert_eq!(item.retry_count, 0);
        }
        assert_eq!(store.dashboard_stats().await.unwrap().pending, 1);
    }
}
