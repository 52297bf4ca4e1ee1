//! Shortcut catalog: discovery, categorization, and cached metadata.
//!
//! Discovery enumerates shortcuts through the external `shortcuts list`
//! boundary once per cache TTL. Listings and composed per-shortcut info
//! live in independent TTL buckets so a fresh listing never implies
//! fresh detail, and vice versa.

pub mod cache;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::CacheConfig;
use crate::engine::backend::ShortcutsBackend;
use crate::error::Result;
use crate::guard::is_system_name;

pub use cache::{CacheStats, TtlCache};

/// Category keyword sets, checked in priority order; first match wins.
const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "communication",
        &["message", "mail", "email", "sms", "call", "phone", "chat"],
    ),
    (
        "media",
        &["photo", "video", "music", "audio", "image", "camera", "play"],
    ),
    (
        "productivity",
        &["note", "task", "todo", "reminder", "calendar", "event", "timer"],
    ),
    (
        "system",
        &["system", "setting", "wifi", "bluetooth", "battery", "volume"],
    ),
];

/// Fallback category when no keyword set matches.
const DEFAULT_CATEGORY: &str = "utilities";

/// Assign a deterministic category from the shortcut name.
pub fn categorize(name: &str) -> &'static str {
    let lower = name.to_lowercase();
    for (category, keywords) in CATEGORY_KEYWORDS {
        if keywords.iter().any(|kw| lower.contains(kw)) {
            return category;
        }
    }
    DEFAULT_CATEGORY
}

/// One discovered shortcut.
///
/// Immutable once returned within a cache window; the next discovery
/// cycle supersedes it rather than mutating it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortcutDescriptor {
    pub name: String,
    pub category: String,
    pub discovered_at: DateTime<Utc>,
}

/// Composed descriptor plus best-effort detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortcutInfo {
    #[serde(flatten)]
    pub descriptor: ShortcutDescriptor,
    pub is_system: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Listing filter. The cache key is composed deterministically from
/// these fields so semantically identical queries share an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogFilter {
    pub category: Option<String>,
    pub search: Option<String>,
    pub limit: Option<usize>,
}

impl CatalogFilter {
    pub fn cache_key(&self) -> String {
        format!(
            "list:{}:{}:{}",
            self.category.as_deref().unwrap_or("*"),
            self.search.as_deref().map(str::to_lowercase).unwrap_or_default(),
            self.limit.map(|l| l.to_string()).unwrap_or_else(|| "*".into()),
        )
    }

    fn matches(&self, descriptor: &ShortcutDescriptor) -> bool {
        if let Some(ref category) = self.category {
            if descriptor.category != *category {
                return false;
            }
        }
        if let Some(ref search) = self.search {
            if !descriptor
                .name
                .to_lowercase()
                .contains(&search.to_lowercase())
            {
                return false;
            }
        }
        true
    }
}

/// Catalog of available shortcuts, cache-first over the backend.
pub struct ShortcutsCatalog {
    backend: Arc<dyn ShortcutsBackend>,
    list_cache: TtlCache<Vec<ShortcutDescriptor>>,
    info_cache: TtlCache<ShortcutInfo>,
    list_ttl: Duration,
    info_ttl: Duration,
}

impl ShortcutsCatalog {
    pub fn new(backend: Arc<dyn ShortcutsBackend>, config: &CacheConfig) -> Self {
        Self {
            backend,
            list_cache: TtlCache::new(),
            info_cache: TtlCache::new(),
            list_ttl: Duration::from_millis(config.list_ttl_ms),
            info_ttl: Duration::from_millis(config.info_ttl_ms),
        }
    }

    /// List shortcuts matching `filter`, serving from cache when fresh.
    pub async fn list(&self, filter: &CatalogFilter) -> Result<Vec<ShortcutDescriptor>> {
        let key = filter.cache_key();
        if let Some(cached) = self.list_cache.get(&key) {
            return Ok(cached);
        }

        let names = self.backend.list_names().await?;
        debug!(count = names.len(), "discovered shortcuts");

        let discovered_at = Utc::now();
        let mut descriptors: Vec<ShortcutDescriptor> = names
            .into_iter()
            .map(|name| ShortcutDescriptor {
                category: categorize(&name).to_string(),
                name,
                discovered_at,
            })
            .filter(|d| filter.matches(d))
            .collect();

        if let Some(limit) = filter.limit {
            descriptors.truncate(limit);
        }

        self.list_cache.set(&key, descriptors.clone(), self.list_ttl);
        Ok(descriptors)
    }

    /// Whether a shortcut with exactly this name exists (cache-first).
    pub async fn exists(&self, name: &str) -> Result<bool> {
        let all = self.list(&CatalogFilter::default()).await?;
        Ok(all.iter().any(|d| d.name == name))
    }

    /// Compose the cached list entry with a best-effort detail fetch.
    pub async fn get_info(&self, name: &str) -> Result<Option<ShortcutInfo>> {
        let key = format!("info:{}", name);
        if let Some(cached) = self.info_cache.get(&key) {
            return Ok(Some(cached));
        }

        let all = self.list(&CatalogFilter::default()).await?;
        let Some(descriptor) = all.iter().find(|d| d.name == name).cloned() else {
            return Ok(None);
        };

        let detail = self.backend.view(name).await?;
        let (action_count, size_bytes) = parse_detail(detail.as_deref());

        let info = ShortcutInfo {
            is_system: is_system_name(&descriptor.name),
            descriptor,
            action_count,
            size_bytes,
            detail,
        };

        self.info_cache.set(&key, info.clone(), self.info_ttl);
        Ok(Some(info))
    }

    /// Drop all cached listings and info.
    pub fn invalidate(&self) {
        self.list_cache.invalidate_all();
        self.info_cache.invalidate_all();
    }

    /// Combined cache statistics (listings, info).
    pub fn cache_stats(&self) -> (CacheStats, CacheStats) {
        (self.list_cache.stats(), self.info_cache.stats())
    }
}

/// Pull action count and size out of detail text when it happens to be
/// structured. Free-text detail yields neither.
fn parse_detail(detail: Option<&str>) -> (Option<u64>, Option<u64>) {
    let Some(detail) = detail else {
        return (None, None);
    };
    let Ok(value) = serde_json::from_str::<Value>(detail) else {
        return (None, None);
    };
    let action_count = value
        .get("actionCount")
        .or_else(|| value.get("action_count"))
        .and_then(Value::as_u64);
    let size_bytes = value
        .get("size")
        .or_else(|| value.get("size_bytes"))
        .and_then(Value::as_u64);
    (action_count, size_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingBackend {
        names: Vec<String>,
        list_calls: AtomicUsize,
        detail: Option<String>,
    }

    impl CountingBackend {
        fn new(names: &[&str]) -> Self {
            Self {
                names: names.iter().map(|s| s.to_string()).collect(),
                list_calls: AtomicUsize::new(0),
                detail: None,
            }
        }
    }

    #[async_trait]
    impl ShortcutsBackend for CountingBackend {
        async fn list_names(&self) -> Result<Vec<String>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.names.clone())
        }

        async fn view(&self, _name: &str) -> Result<Option<String>> {
            Ok(self.detail.clone())
        }

        async fn run(
            &self,
            _name: &str,
            _input: Option<&str>,
        ) -> Result<crate::engine::backend::RunOutput> {
            unimplemented!("not used in catalog tests")
        }
    }

    fn catalog_with(backend: CountingBackend) -> (ShortcutsCatalog, Arc<CountingBackend>) {
        let backend = Arc::new(backend);
        let catalog = ShortcutsCatalog::new(backend.clone(), &CacheConfig::default());
        (catalog, backend)
    }

    #[test]
    fn test_categorize_priority_order() {
        // "message" (communication) wins over "photo" (media) because
        // communication is checked first
        assert_eq!(categorize("Message Photo Backup"), "communication");
        assert_eq!(categorize("Play Morning Music"), "media");
        assert_eq!(categorize("Daily Reminder"), "productivity");
        assert_eq!(categorize("Toggle WiFi"), "system");
        assert_eq!(categorize("Weather Report"), "utilities");
    }

    #[test]
    fn test_cache_key_is_deterministic() {
        let a = CatalogFilter {
            category: Some("media".into()),
            search: Some("Music".into()),
            limit: Some(5),
        };
        let b = CatalogFilter {
            category: Some("media".into()),
            search: Some("music".into()),
            limit: Some(5),
        };
        assert_eq!(a.cache_key(), b.cache_key());
        assert_ne!(a.cache_key(), CatalogFilter::default().cache_key());
    }

    #[tokio::test]
    async fn test_list_is_cache_first() {
        let (catalog, backend) =
            catalog_with(CountingBackend::new(&["Weather Report", "Play Music"]));

        let first = catalog.list(&CatalogFilter::default()).await.unwrap();
        assert_eq!(first.len(), 2);
        let _second = catalog.list(&CatalogFilter::default()).await.unwrap();
        assert_eq!(backend.list_calls.load(Ordering::SeqCst), 1);

        catalog.invalidate();
        let _third = catalog.list(&CatalogFilter::default()).await.unwrap();
        assert_eq!(backend.list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_filtering_and_limit() {
        let (catalog, _) = catalog_with(CountingBackend::new(&[
            "Send Message",
            "Play Music",
            "Music Timer",
            "Weather Report",
        ]));

        let media = catalog
            .list(&CatalogFilter {
                category: Some("media".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(media.len(), 2);

        let limited = catalog
            .list(&CatalogFilter {
                search: Some("music".into()),
                limit: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_exists_is_case_sensitive() {
        let (catalog, _) = catalog_with(CountingBackend::new(&["Weather Report"]));
        assert!(catalog.exists("Weather Report").await.unwrap());
        assert!(!catalog.exists("weather report").await.unwrap());
        assert!(!catalog.exists("Unknown").await.unwrap());
    }

    #[tokio::test]
    async fn test_get_info_composes_detail() {
        let mut backend = CountingBackend::new(&["System Cleaner"]);
        backend.detail = Some(r#"{"actionCount": 7, "size": 2048}"#.to_string());
        let (catalog, _) = catalog_with(backend);

        let info = catalog.get_info("System Cleaner").await.unwrap().unwrap();
        assert_eq!(info.action_count, Some(7));
        assert_eq!(info.size_bytes, Some(2048));
        assert!(info.is_system);
    }

    #[tokio::test]
    async fn test_get_info_absent_shortcut() {
        let (catalog, _) = catalog_with(CountingBackend::new(&["Weather Report"]));
        assert!(catalog.get_info("Nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_info_free_text_detail() {
        let mut backend = CountingBackend::new(&["Weather Report"]);
        backend.detail = Some("A shortcut that reports the weather".to_string());
        let (catalog, _) = catalog_with(backend);

        let info = catalog.get_info("Weather Report").await.unwrap().unwrap();
        assert_eq!(info.action_count, None);
        assert!(info.detail.unwrap().contains("weather"));
    }
}
