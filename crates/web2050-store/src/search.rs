//! Case-insensitive substring matching and snippet extraction.
//!
//! Matching folds each character independently to its first lowercase
//! mapping, so character positions in the folded text line up with the
//! original. That keeps snippet boundaries exact for any input.

use crate::page::SearchMatch;

/// Characters of context kept on each side of a content match.
const SNIPPET_RADIUS: usize = 40;

fn fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// A pre-folded search query.
pub(crate) struct Needle(Vec<char>);

impl Needle {
    pub(crate) fn new(query: &str) -> Self {
        Self(query.chars().map(fold).collect())
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Character index of the first occurrence in `haystack`.
    fn find(&self, haystack: &[char]) -> Option<usize> {
        if self.0.is_empty() {
            return Some(0);
        }
        haystack
            .windows(self.0.len())
            .position(|window| window.iter().zip(&self.0).all(|(&h, &n)| fold(h) == n))
    }

    pub(crate) fn matches(&self, text: &str) -> bool {
        let chars: Vec<char> = text.chars().collect();
        self.find(&chars).is_some()
    }

    /// Up to [`SNIPPET_RADIUS`] characters either side of the first match,
    /// with newlines flattened to spaces.
    pub(crate) fn snippet(&self, content: &str) -> Option<String> {
        let chars: Vec<char> = content.chars().collect();
        let index = self.find(&chars)?;
        let start = index.saturating_sub(SNIPPET_RADIUS);
        let end = (index + self.0.len() + SNIPPET_RADIUS).min(chars.len());
        Some(
            chars[start..end]
                .iter()
                .map(|&c| if c == '\n' { ' ' } else { c })
                .collect(),
        )
    }

    /// Classify a page against this query.
    pub(crate) fn match_page(&self, path: &str, content: &str) -> Option<SearchMatch> {
        if self.is_empty() || self.matches(path) {
            return Some(SearchMatch {
                path: path.to_owned(),
                snippet: None,
            });
        }
        self.snippet(content).map(|snippet| SearchMatch {
            path: path.to_owned(),
            snippet: Some(snippet),
        })
    }
}
