//! Page store trait.
//!
//! # Key Convention
//!
//! All key parameters are **canonical keys** produced by path normalization:
//! - `"example.com/index.html"` - group root page
//! - `"example.com/blog/index.html"` - extensionless path resolved to a leaf
//! - `"example.com/style.css"` - concrete asset
//!
//! The first segment of a key is its group. Stores never normalize keys themselves.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::page::{Page, SearchMatch};

/// Durable key-value store of generated pages.
///
/// Implementations serialize concurrent writes to the same key with
/// last-write-wins semantics.
#[async_trait]
pub trait PageStore: Send + Sync {
    /// Fetch a page by canonical key.
    async fn get(&self, key: &str) -> Result<Option<Page>, StoreError>;

    /// Insert or overwrite a page, stamping it with the current time.
    async fn upsert(&self, key: &str, content: &str) -> Result<Page, StoreError>;

    /// Remove a page. Deleting an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Case-insensitive substring search over keys and content.
    ///
    /// Results are ordered newest-created first. An empty query returns every
    /// key in the same order.
    async fn search_by_substring(&self, query: &str) -> Result<Vec<SearchMatch>, StoreError>;

    /// All pages under `group` (keys starting with `"{group}/"`), oldest first.
    async fn list_group(&self, group: &str) -> Result<Vec<Page>, StoreError>;
}
