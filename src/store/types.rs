use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Lifecycle status of a queue item, as written by the workflow engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    Pending,
    Processing,
    Published,
    FailedCrawl,
    FailedAi,
    FailedWp,
    FailedSanity,
    SkippedDuplicate,
    Error,
    #[serde(other)]
    Unknown,
}

impl ItemStatus {
    /// Known statuses in display order.
    pub const ALL: [ItemStatus; 9] = [
        ItemStatus::Pending,
        ItemStatus::Processing,
        ItemStatus::Published,
        ItemStatus::FailedCrawl,
        ItemStatus::FailedAi,
        ItemStatus::FailedWp,
        ItemStatus::FailedSanity,
        ItemStatus::SkippedDuplicate,
        ItemStatus::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Pending => "PENDING",
            ItemStatus::Processing => "PROCESSING",
            ItemStatus::Published => "PUBLISHED",
            ItemStatus::FailedCrawl => "FAILED_CRAWL",
            ItemStatus::FailedAi => "FAILED_AI",
            ItemStatus::FailedWp => "FAILED_WP",
            ItemStatus::FailedSanity => "FAILED_SANITY",
            ItemStatus::SkippedDuplicate => "SKIPPED_DUPLICATE",
            ItemStatus::Error => "ERROR",
            ItemStatus::Unknown => "UNKNOWN",
        }
    }

    /// Exact (case-sensitive) lookup among the known statuses.
    pub fn from_name(name: &str) -> Option<ItemStatus> {
        Self::ALL.into_iter().find(|s| s.as_str() == name)
    }

    /// Same set the dashboard counts with `status ilike %FAILED%`.
    pub fn is_failure(&self) -> bool {
        self.as_str().contains("FAILED")
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ItemStatus::FailedCrawl
                | ItemStatus::FailedAi
                | ItemStatus::FailedWp
                | ItemStatus::FailedSanity
                | ItemStatus::Error
        )
    }

    fn display_rank(&self) -> usize {
        Self::ALL.iter().position(|s| s == self).unwrap_or(Self::ALL.len())
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Primary key of a row. The store may hand out integers or UUID/text keys;
/// the JSON kind is kept so ids go back out exactly as they came in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId {
    raw: String,
    numeric: bool,
}

impl RowId {
    /// A text key.
    pub fn new(id: impl Into<String>) -> Self {
        Self { raw: id.into(), numeric: false }
    }

    /// An integer key.
    pub fn int(id: i64) -> Self {
        Self { raw: id.to_string(), numeric: true }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// JSON value for payloads: integer keys as numbers, text keys as strings.
    pub fn to_json(&self) -> serde_json::Value {
        if self.numeric {
            if let Ok(n) = self.raw.parse::<i64>() {
                return serde_json::Value::from(n);
            }
            if let Ok(n) = self.raw.parse::<u64>() {
                return serde_json::Value::from(n);
            }
        }
        serde_json::Value::String(self.raw.clone())
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for RowId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(s) => Ok(RowId::new(s)),
            serde_json::Value::Number(n) if n.is_i64() || n.is_u64() => {
                Ok(RowId { raw: n.to_string(), numeric: true })
            }
            other => Err(serde::de::Error::custom(format!("invalid row id: {}", other))),
        }
    }
}

impl Serialize for RowId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Accepts RFC 3339 timestamps and naive ones (`timestamp without time zone`), read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    let raw = raw.replace(' ', "T");
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn de_timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

fn de_null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Deserialize)]
struct SourceName {
    name: Option<String>,
}

fn de_joined_source<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    // A dangling foreign key comes back as null.
    let joined: Option<SourceName> = Option::deserialize(deserializer)?;
    Ok(joined.and_then(|s| s.name))
}

/// A queue item. Columns not modelled here are kept in `extra` for the inspector.
#[derive(Debug, Clone, Deserialize)]
pub struct Item {
    pub id: RowId,
    #[serde(default)]
    pub source_id: Option<RowId>,
    #[serde(default, rename = "sources", deserialize_with = "de_joined_source")]
    pub source_name: Option<String>,
    #[serde(default)]
    pub title_original: Option<String>,
    #[serde(default)]
    pub original_url: Option<String>,
    pub status: ItemStatus,
    #[serde(default, deserialize_with = "de_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default, deserialize_with = "de_null_default")]
    pub retry_count: u32,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Item {
    /// Full row as JSON, with the joined source flattened to `source_name`.
    pub fn details(&self) -> serde_json::Value {
        let mut row = self.extra.clone();
        row.insert("id".into(), self.id.to_json());
        row.insert("source_id".into(), self.source_id.as_ref().map(RowId::to_json).into());
        row.insert("source_name".into(), self.source_name.clone().into());
        row.insert("title_original".into(), self.title_original.clone().into());
        row.insert("original_url".into(), self.original_url.clone().into());
        row.insert("status".into(), self.status.as_str().into());
        row.insert("created_at".into(), self.created_at.map(|t| t.to_rfc3339()).into());
        row.insert("error_message".into(), self.error_message.clone().into());
        row.insert("retry_count".into(), self.retry_count.into());
        serde_json::Value::Object(row)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Source {
    pub id: RowId,
    pub name: String,
    #[serde(default)]
    pub city_slug: Option<String>,
    #[serde(default)]
    pub rss_url: Option<String>,
    #[serde(default)]
    pub wp_api_endpoint: Option<String>,
    #[serde(default)]
    pub wp_username: Option<String>,
    #[serde(default)]
    pub wp_app_password: Option<String>,
    #[serde(default = "default_active", deserialize_with = "de_active")]
    pub is_active: bool,
    #[serde(default, deserialize_with = "de_timestamp")]
    pub last_checked_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

/// Missing and null both mean active, matching the column default.
fn de_active<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or_else(default_active))
}

/// Insert payload for a new source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewSource {
    pub name: String,
    pub city_slug: String,
    pub rss_url: String,
    pub wp_api_endpoint: String,
    pub wp_username: String,
    pub wp_app_password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemQuery {
    pub limit: u32,
    /// Empty means every status.
    pub statuses: Vec<ItemStatus>,
    pub source_id: Option<RowId>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardStats {
    pub published: u64,
    pub failed: u64,
    pub pending: u64,
    pub active_sources: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActivityPoint {
    pub status: ItemStatus,
    #[serde(default, deserialize_with = "de_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Count per status, most frequent first.
pub fn status_distribution(points: &[ActivityPoint]) -> Vec<(ItemStatus, u64)> {
    let mut counts: Vec<(ItemStatus, u64)> = Vec::new();
    for p in points {
        match counts.iter_mut().find(|(s, _)| *s == p.status) {
            Some((_, n)) => *n += 1,
            None => counts.push((p.status, 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.display_rank().cmp(&b.0.display_rank())));
    counts
}
