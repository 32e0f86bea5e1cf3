//! Marketplace skill index: local search over the synced catalog.
//!
//! `search` never touches the network; it scans the `marketplace_index`
//! tree. `sync_from_marketplace` fetches the remote export and
//! wholesale-replaces the tree.

use crate::shared::{MarketplaceSkill, TrustLevel};
use crate::store::Store;
use std::sync::Arc;
use std::time::Duration;

/// Searchable marketplace catalog; consulted read-only by the registry and
/// the discovery agent.
#[async_trait::async_trait]
pub trait SkillIndex: Send + Sync {
    async fn search(
        &self,
        keyword: &str,
        limit: usize,
        trust_level: Option<TrustLevel>,
        life_sciences_relevant: Option<bool>,
    ) -> Result<Vec<MarketplaceSkill>, Box<dyn std::error::Error + Send + Sync>>;

    /// Replaces the local index from the remote marketplace; returns the
    /// number of entries now indexed.
    async fn sync_from_marketplace(
        &self,
    ) -> Result<usize, Box<dyn std::error::Error + Send + Sync>>;
}

/// Store-backed index with an optional remote export endpoint.
pub struct MarketplaceIndex {
    store: Arc<Store>,
    client: reqwest::Client,
    base_url: Option<String>,
}

impl MarketplaceIndex {
    pub fn new(store: Arc<Store>, base_url: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            store,
            client,
            base_url,
        }
    }

    fn matches(entry: &MarketplaceSkill, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        entry.name.to_lowercase().contains(needle)
            || entry.description.to_lowercase().contains(needle)
            || entry.tags.iter().any(|t| t.to_lowercase().contains(needle))
    }
}

#[async_trait::async_trait]
impl SkillIndex for MarketplaceIndex {
    async fn search(
        &self,
        keyword: &str,
        limit: usize,
        trust_level: Option<TrustLevel>,
        life_sciences_relevant: Option<bool>,
    ) -> Result<Vec<MarketplaceSkill>, Box<dyn std::error::Error + Send + Sync>> {
        let needle = keyword.trim().to_lowercase();
        let mut hits: Vec<MarketplaceSkill> = self
            .store
            .marketplace_entries()?
            .into_iter()
            .filter(|e| Self::matches(e, &needle))
            .filter(|e| trust_level.map_or(true, |t| e.trust_level == t))
            .filter(|e| life_sciences_relevant.map_or(true, |ls| e.life_sciences_relevant == ls))
            .collect();
        hits.truncate(limit);
        Ok(hits)
    }

    async fn sync_from_marketplace(
        &self,
    ) -> Result<usize, Box<dyn std::error::Error + Send + Sync>> {
        let base = self
            .base_url
            .as_deref()
            .ok_or("marketplace URL not configured")?;
        let url = format!("{}/skills/export", base.trim_end_matches('/'));
        let res = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| format!("marketplace sync request failed: {}", e))?;
        if !res.status().is_success() {
            return Err(format!("marketplace sync error {}", res.status()).into());
        }
        let entries: Vec<MarketplaceSkill> = res
            .json()
            .await
            .map_err(|e| format!("marketplace export parse failed: {}", e))?;
        let count = self.store.replace_marketplace(&entries)?;
        tracing::info!(target: "axon::index", count, "marketplace index replaced");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, name: &str, tags: &[&str], trust: TrustLevel, ls: bool) -> MarketplaceSkill {
        MarketplaceSkill {
            id: id.into(),
            name: name.into(),
            description: format!("{} marketplace skill", name),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            trust_level: trust,
            permissions: vec![],
            data_access: "read-only".into(),
            life_sciences_relevant: ls,
            install_count: 0,
        }
    }

    fn seeded_index() -> (tempfile::TempDir, MarketplaceIndex) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path().join("db")).unwrap());
        store
            .replace_marketplace(&[
                entry("mp-1", "Formulary Watch", &["pharma"], TrustLevel::Verified, true),
                entry("mp-2", "Invoice Sync", &["finance"], TrustLevel::Community, false),
                entry("mp-3", "Trial Tracker", &["clinical", "pharma"], TrustLevel::Core, true),
            ])
            .unwrap();
        (dir, MarketplaceIndex::new(store, None))
    }

    #[tokio::test]
    async fn search_matches_name_description_and_tags() {
        let (_dir, index) = seeded_index();
        let hits = index.search("pharma", 20, None, None).await.unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn search_applies_filters_and_limit() {
        let (_dir, index) = seeded_index();
        let hits = index
            .search("", 20, None, Some(true))
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);

        let hits = index
            .search("", 20, Some(TrustLevel::Core), Some(true))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "mp-3");

        let hits = index.search("", 1, None, None).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn sync_without_url_is_an_error() {
        let (_dir, index) = seeded_index();
        assert!(index.sync_from_marketplace().await.is_err());
    }
}
