//! Page persistence for web2050.
//!
//! This crate provides the [`PageStore`] trait for the durable store of
//! generated pages, decoupling the generation pipeline from the database:
//!
//! - [`SqlitePageStore`] persists pages with `sqlx` on SQLite
//! - [`MemoryPageStore`] keeps pages in memory for tests (behind the `mock` feature)
//!
//! It also provides the generation context types: [`AssetList`] and the
//! [`AssetContextProvider`] trait, with [`StoreAssetProvider`] reading a
//! group's pages back out of a store.
//!
//! # Example
//!
//! ```ignore
//! use web2050_store::{PageStore, SqlitePageStore};
//!
//! let store = SqlitePageStore::connect("sqlite://pages.db?mode=rwc", 4).await?;
//! store.upsert("example.com/index.html", "<html>...</html>").await?;
//! let page = store.get("example.com/index.html").await?;
//! ```

mod assets;
mod error;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod page;
mod search;
mod sqlite;
mod store;

pub use assets::{Asset, AssetContextProvider, AssetList, StoreAssetProvider};
pub use error::{StoreError, StoreErrorKind};
#[cfg(any(test, feature = "mock"))]
pub use mock::MemoryPageStore;
pub use page::{Page, SearchMatch};
pub use sqlite::SqlitePageStore;
pub use store::PageStore;
