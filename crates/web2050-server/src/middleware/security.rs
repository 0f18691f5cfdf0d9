//! Security headers middleware.
//!
//! Sets on every response, generated pages included:
//! - Content-Security-Policy
//! - X-Content-Type-Options
//! - X-Frame-Options

use axum::http::HeaderValue;
use axum::http::header::HeaderName;
use tower_http::set_header::SetResponseHeaderLayer;

/// Content-Security-Policy header value. Inline scripts and styles are
/// allowed, as are images from any origin.
const CSP: &str = "default-src 'self'; \
                   script-src 'self' 'unsafe-inline'; \
                   style-src 'self' 'unsafe-inline'; \
                   img-src *; \
                   font-src 'self'; \
                   object-src 'none'; \
                   base-uri 'self'; \
                   frame-ancestors 'none'";

const HEADERS: [(&str, &str); 3] = [
    ("content-security-policy", CSP),
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
];

type HeaderLayer = SetResponseHeaderLayer<HeaderValue>;

/// Layer stack setting every security header.
pub(crate) type SecurityHeaders = (HeaderLayer, HeaderLayer, HeaderLayer);

pub(crate) fn security_headers() -> SecurityHeaders {
    let [csp, nosniff, frame] = HEADERS.map(|(name, value)| {
        SetResponseHeaderLayer::overriding(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        )
    });
    (csp, nosniff, frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csp_value() {
        assert!(CSP.contains("default-src 'self'"));
        assert!(CSP.contains("script-src 'self' 'unsafe-inline'"));
        assert!(CSP.contains("img-src *"));
        assert!(CSP.contains("object-src 'none'"));
        assert!(CSP.contains("frame-ancestors 'none'"));
    }

    #[test]
    fn test_header_names_are_lowercase() {
        for (name, _) in HEADERS {
            assert_eq!(name, name.to_ascii_lowercase());
        }
    }
}
