//! In-memory page store for testing.
//!
//! Provides [`MemoryPageStore`] for unit testing without a database.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;

use crate::error::{StoreError, StoreErrorKind};
use crate::page::{Page, SearchMatch};
use crate::search::Needle;
use crate::store::PageStore;

const BACKEND: &str = "Memory";

/// Mock page store for testing.
///
/// Pages are ordered by an insertion sequence so "newest first" is exact
/// even when timestamps collide. Upserts can be made to fail on demand.
///
/// # Example
///
/// ```ignore
/// use web2050_store::{MemoryPageStore, PageStore};
///
/// let store = MemoryPageStore::new().with_page("a.com/index.html", "<p>hi</p>");
/// let page = store.get("a.com/index.html").await?;
/// ```
#[derive(Debug, Default)]
pub struct MemoryPageStore {
    pages: RwLock<HashMap<String, (u64, Page)>>,
    sequence: AtomicU64,
    fail_upserts: AtomicBool,
    upserts: AtomicUsize,
}

impl MemoryPageStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a page.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_page(self, key: impl Into<String>, content: impl Into<String>) -> Self {
        self.insert(key.into(), content.into());
        self
    }

    /// Make every subsequent `upsert` fail with [`StoreErrorKind::Unavailable`].
    pub fn fail_upserts(&self, fail: bool) {
        self.fail_upserts.store(fail, Ordering::SeqCst);
    }

    /// Number of `upsert` calls attempted.
    #[must_use]
    pub fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    /// Number of stored pages.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.read().unwrap().len()
    }

    /// Whether the store holds no pages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&self, key: String, content: String) -> Page {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let page = Page {
            key: key.clone(),
            content,
            created_at: Utc::now(),
        };
        self.pages
            .write()
            .unwrap()
            .insert(key, (seq, page.clone()));
        page
    }

    /// Pages sorted by insertion sequence, oldest first.
    fn ordered(&self) -> Vec<Page> {
        let pages = self.pages.read().unwrap();
        let mut entries: Vec<&(u64, Page)> = pages.values().collect();
        entries.sort_by_key(|(seq, _)| *seq);
        entries.into_iter().map(|(_, page)| page.clone()).collect()
    }
}

#[async_trait]
impl PageStore for MemoryPageStore {
    async fn get(&self, key: &str) -> Result<Option<Page>, StoreError> {
        Ok(self
            .pages
            .read()
            .unwrap()
            .get(key)
            .map(|(_, page)| page.clone()))
    }

    async fn upsert(&self, key: &str, content: &str) -> Result<Page, StoreError> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        if self.fail_upserts.load(Ordering::SeqCst) {
            return Err(StoreError::new(StoreErrorKind::Unavailable)
                .with_backend(BACKEND)
                .with_key(key));
        }
        Ok(self.insert(key.to_owned(), content.to_owned()))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.pages.write().unwrap().remove(key);
        Ok(())
    }

    async fn search_by_substring(&self, query: &str) -> Result<Vec<SearchMatch>, StoreError> {
        let needle = Needle::new(query);
        Ok(self
            .ordered()
            .iter()
            .rev()
            .filter_map(|page| needle.match_page(&page.key, &page.content))
            .collect())
    }

    async fn list_group(&self, group: &str) -> Result<Vec<Page>, StoreError> {
        let prefix = format!("{group}/");
        Ok(self
            .ordered()
            .into_iter()
            .filter(|page| page.key.starts_with(&prefix))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_search_orders_newest_first() {
        let store = MemoryPageStore::new()
            .with_page("a.com/index.html", "first")
            .with_page("b.com/index.html", "second")
            .with_page("c.com/index.html", "third");

        let paths: Vec<String> = store
            .search_by_substring("")
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.path)
            .collect();

        assert_eq!(
            paths,
            vec!["c.com/index.html", "b.com/index.html", "a.com/index.html"]
        );
    }

    #[tokio::test]
    async fn test_upsert_moves_page_to_front() {
        let store = MemoryPageStore::new()
            .with_page("a.com/index.html", "first")
            .with_page("b.com/index.html", "second");
        store.upsert("a.com/index.html", "again").await.unwrap();

        let results = store.search_by_substring("").await.unwrap();
        assert_eq!(results[0].path, "a.com/index.html");
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_failing_upserts() {
        let store = MemoryPageStore::new();
        store.fail_upserts(true);

        let err = store.upsert("a.com/index.html", "x").await.unwrap_err();

        assert_eq!(err.kind, StoreErrorKind::Unavailable);
        assert_eq!(store.upsert_count(), 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_list_group_oldest_first() {
        let store = MemoryPageStore::new()
            .with_page("a.com/about/index.html", "about")
            .with_page("b.com/index.html", "b")
            .with_page("a.com/index.html", "root");

        let keys: Vec<String> = store
            .list_group("a.com")
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.key)
            .collect();

        assert_eq!(keys, vec!["a.com/about/index.html", "a.com/index.html"]);
    }
}
