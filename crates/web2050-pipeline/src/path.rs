//! Request path normalization.
//!
//! Maps a raw requested path to the canonical key a page is stored under
//! and to the group key (first segment) that scopes generation.
//!
//! Rules, in order:
//! 1. `.map` requests are rejected.
//! 2. A bare group (`example.com`) or an extensionless path
//!    (`example.com/blog`) resolves to `.../index.html`.
//! 3. Keys longer than [`MAX_KEY_LENGTH`] characters are rejected.
//! 4. The first segment must be non-empty.

/// Longest canonical key accepted, in characters.
pub const MAX_KEY_LENGTH: usize = 72;

/// Leaf appended to bare groups and extensionless paths.
const INDEX_FILE: &str = "index.html";

/// Why a raw path cannot be normalized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("empty path")]
    Empty,
    #[error("source maps are not served")]
    BadExtension,
    #[error("canonical key is {len} characters (max {MAX_KEY_LENGTH})")]
    TooLong { len: usize },
    #[error("path has an empty first segment")]
    InvalidGroup,
    #[error("path contains a '.' or '..' segment")]
    DotSegment,
}

impl PathError {
    /// HTTP status for this rejection.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Empty => 404,
            Self::TooLong { .. } => 414,
            Self::BadExtension | Self::InvalidGroup | Self::DotSegment => 400,
        }
    }
}

/// A normalized request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagePath {
    key: String,
    group_len: usize,
}

impl PagePath {
    /// Normalize a raw request path (no query string).
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let rest = raw.strip_prefix('/').unwrap_or(raw);
        if rest.is_empty() {
            return Err(PathError::Empty);
        }

        let mut parts = rest.split('/');
        let group = parts.next().unwrap_or_default();
        if group.is_empty() {
            return Err(PathError::InvalidGroup);
        }

        let segments: Vec<&str> = std::iter::once(group)
            .chain(parts.filter(|s| !s.is_empty()))
            .collect();
        if segments.iter().any(|s| matches!(*s, "." | "..")) {
            return Err(PathError::DotSegment);
        }

        let leaf = segments.last().copied().unwrap_or_default();
        let ext = extension(leaf);
        if ext == Some(".map") {
            return Err(PathError::BadExtension);
        }

        let mut key = segments.join("/");
        if segments.len() == 1 || ext.is_none() {
            key.push('/');
            key.push_str(INDEX_FILE);
        }

        let len = key.chars().count();
        if len > MAX_KEY_LENGTH {
            return Err(PathError::TooLong { len });
        }

        Ok(Self {
            key,
            group_len: group.len(),
        })
    }

    /// Canonical storage key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Group key: the first segment of the canonical key.
    #[must_use]
    pub fn group(&self) -> &str {
        &self.key[..self.group_len]
    }

    #[must_use]
    pub fn into_key(self) -> String {
        self.key
    }
}

/// Extension of a file name, from its last `.` unless that `.` leads the name.
fn extension(name: &str) -> Option<&str> {
    match name.rfind('.') {
        Some(0) | None => None,
        Some(i) => Some(&name[i..]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn key(raw: &str) -> String {
        PagePath::parse(raw).unwrap().into_key()
    }

    #[test]
    fn test_bare_group_gets_index() {
        assert_eq!(key("example.com"), "example.com/index.html");
        assert_eq!(key("/example.com"), "example.com/index.html");
        assert_eq!(key("example.com/"), "example.com/index.html");
    }

    #[test]
    fn test_extensionless_path_gets_index() {
        assert_eq!(key("example.com/blog"), "example.com/blog/index.html");
        assert_eq!(key("example.com/blog/"), "example.com/blog/index.html");
    }

    #[test]
    fn test_path_with_extension_kept() {
        assert_eq!(key("example.com/style.css"), "example.com/style.css");
        assert_eq!(key("example.com/a/b/app.js"), "example.com/a/b/app.js");
    }

    #[test]
    fn test_dotfile_has_no_extension() {
        assert_eq!(key("example.com/.env"), "example.com/.env/index.html");
    }

    #[test]
    fn test_empty_segments_collapsed() {
        assert_eq!(key("example.com//a///b.js"), "example.com/a/b.js");
    }

    #[test]
    fn test_group_is_first_segment() {
        let path = PagePath::parse("news.example.com/world/today").unwrap();
        assert_eq!(path.group(), "news.example.com");
        assert_eq!(path.key(), "news.example.com/world/today/index.html");
    }

    #[test]
    fn test_empty_path() {
        assert_eq!(PagePath::parse(""), Err(PathError::Empty));
        assert_eq!(PagePath::parse("/"), Err(PathError::Empty));
    }

    #[test]
    fn test_empty_group() {
        assert_eq!(PagePath::parse("//example.com"), Err(PathError::InvalidGroup));
    }

    #[test]
    fn test_source_map_rejected() {
        assert_eq!(
            PagePath::parse("example.com/app.js.map"),
            Err(PathError::BadExtension)
        );
        assert_eq!(PagePath::parse("bundle.map"), Err(PathError::BadExtension));
    }

    #[test]
    fn test_dot_segments_rejected() {
        assert_eq!(
            PagePath::parse("example.com/../etc/passwd"),
            Err(PathError::DotSegment)
        );
        assert_eq!(PagePath::parse("./x.html"), Err(PathError::DotSegment));
    }

    #[test]
    fn test_length_boundary() {
        // "a.com/" is 6 characters, ".html" is 5
        let at_limit = format!("a.com/{}.html", "x".repeat(MAX_KEY_LENGTH - 11));
        assert_eq!(at_limit.chars().count(), MAX_KEY_LENGTH);
        assert_eq!(key(&at_limit), at_limit);

        let over = format!("a.com/{}.html", "x".repeat(MAX_KEY_LENGTH - 10));
        assert_eq!(
            PagePath::parse(&over),
            Err(PathError::TooLong {
                len: MAX_KEY_LENGTH + 1
            })
        );
    }

    #[test]
    fn test_length_counts_appended_index() {
        // 62 characters raw + "/index.html" = 73
        let raw = format!("a.com/{}", "x".repeat(56));
        assert!(matches!(
            PagePath::parse(&raw),
            Err(PathError::TooLong { len: 73 })
        ));
    }

    #[test]
    fn test_length_counts_characters() {
        let raw = format!("a.com/{}.html", "é".repeat(MAX_KEY_LENGTH - 11));
        assert!(PagePath::parse(&raw).is_ok());
    }

    #[test]
    fn test_normalization_is_idempotent() {
        for raw in [
            "example.com",
            "/example.com/",
            "example.com/blog",
            "example.com//a//b.js",
            "example.com/.env",
            "example.com/file.",
            "x.y.z/deep/path/name.tar.gz",
        ] {
            let once = key(raw);
            assert_eq!(key(&once), once, "not idempotent for {raw}");
        }
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(PathError::Empty.status_code(), 404);
        assert_eq!(PathError::BadExtension.status_code(), 400);
        assert_eq!(PathError::TooLong { len: 80 }.status_code(), 414);
        assert_eq!(PathError::InvalidGroup.status_code(), 400);
    }
}
