//! Stored page types.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A generated page persisted under its canonical key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// Canonical key (e.g., "example.com/index.html").
    pub key: String,
    /// Page body exactly as extracted from the generator.
    pub content: String,
    /// Creation time of the latest successful generation.
    pub created_at: DateTime<Utc>,
}

/// One search result.
///
/// `snippet` is `None` when the key itself matched (or the query was empty)
/// and `Some` when only the content matched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SearchMatch {
    /// Canonical key of the matching page.
    pub path: String,
    /// Content excerpt around the first occurrence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}
