//! Generation context: previously stored pages of a group.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::page::Page;
use crate::store::PageStore;

/// A prior page offered to the generator as context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Asset {
    /// Canonical key.
    pub path: String,
    /// Stored content.
    pub content: String,
}

/// Ordered list of context assets.
///
/// `Display` renders the prompt form: each asset as its path followed by a
/// fenced block, assets separated by a blank line.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AssetList(Vec<Asset>);

impl AssetList {
    #[must_use]
    pub fn new(assets: Vec<Asset>) -> Self {
        Self(assets)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Asset> {
        self.0.iter()
    }
}

impl From<Vec<Page>> for AssetList {
    fn from(pages: Vec<Page>) -> Self {
        Self(
            pages
                .into_iter()
                .map(|page| Asset {
                    path: page.key,
                    content: page.content,
                })
                .collect(),
        )
    }
}

impl fmt::Display for AssetList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, asset) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("\n\n")?;
            }
            write!(f, "{}\n```\n{}\n```", asset.path, asset.content)?;
        }
        Ok(())
    }
}

/// Supplies prior content under a group for use as generation context.
///
/// Never fails: an unavailable source yields an empty list.
#[async_trait]
pub trait AssetContextProvider: Send + Sync {
    async fn fetch(&self, group: &str) -> AssetList;
}

/// [`AssetContextProvider`] reading a group's pages from a [`PageStore`].
pub struct StoreAssetProvider {
    store: Arc<dyn PageStore>,
}

impl StoreAssetProvider {
    #[must_use]
    pub fn new(store: Arc<dyn PageStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl AssetContextProvider for StoreAssetProvider {
    async fn fetch(&self, group: &str) -> AssetList {
        match self.store.list_group(group).await {
            Ok(pages) => AssetList::from(pages),
            Err(e) => {
                tracing::warn!(group = %group, error = %e, "Failed to load generation context");
                AssetList::default()
            }
        }
    }
}
