//! Index page: every stored page, newest first, with optional search.

use std::fmt::Write as _;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::Html;
use html_escape::{encode_double_quoted_attribute, encode_text};
use serde::Deserialize;
use web2050_store::SearchMatch;

use crate::state::AppState;

/// Query string for GET /.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct IndexQuery {
    q: Option<String>,
}

const HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8"/>
  <meta name="viewport" content="width=device-width,initial-scale=1.0"/>
  <title>web2050</title>
  <style>
    body { font-family: system-ui, sans-serif; background: #030712; color: #f3f4f6; max-width: 42rem; margin: 2rem auto; padding: 0 1rem; }
    h1 { color: #3b82f6; text-align: center; }
    header p { color: #9ca3af; }
    form { display: flex; margin: 1.5rem 0; }
    input { flex: 1; padding: .75rem; border: 1px solid #374151; background: #1f2937; color: #fff; border-radius: .5rem 0 0 .5rem; }
    button { padding: .75rem; background: #3b82f6; color: #fff; border: 0; border-radius: 0 .5rem .5rem 0; }
    ul { list-style: none; padding: 0; }
    li { margin: .5rem 0; }
    a { color: #93c5fd; }
    pre { background: #1f2937; padding: .5rem; border-radius: .375rem; white-space: pre-wrap; overflow-wrap: break-word; }
  </style>
</head>
<body>
<main>
"#;

const FILTER_SCRIPT: &str = r##"<script>
document.getElementById("search-input").addEventListener("input", (event) => {
  const q = event.target.value.toLowerCase();
  document.querySelectorAll("#list li").forEach((item) => {
    const path = item.firstElementChild.getAttribute("href").slice(1).toLowerCase();
    item.style.display = path.includes(q) ? "" : "none";
  });
});
</script>
"##;

/// Handle GET /.
pub(crate) async fn get_index(
    Query(query): Query<IndexQuery>,
    State(state): State<Arc<AppState>>,
) -> Html<String> {
    let q = query.q.unwrap_or_default();
    let results = match state.store.search_by_substring(&q).await {
        Ok(results) => results,
        Err(e) => {
            tracing::error!(query = %q, error = %e, "Search failed");
            Vec::new()
        }
    };
    Html(render_index(&q, &results))
}

fn render_index(query: &str, results: &[SearchMatch]) -> String {
    let mut html = String::from(HEAD);
    let _ = write!(
        html,
        r#"<header>
  <h1>web2050 Index</h1>
  <p>Append any URL minus the protocol to the end of this address and watch it get generated in real time.</p>
  <p>Every generated page, newest first. <span id="counter">{count}</span> pages have been generated so far.</p>
</header>
<form method="get">
  <input type="text" name="q" id="search-input" value="{value}" placeholder="Search by term or path..."/>
  <button type="submit">Search by content</button>
</form>
<ul id="list">
"#,
        count = results.len(),
        value = encode_double_quoted_attribute(query),
    );

    for result in results {
        let href = encode_double_quoted_attribute(&result.path);
        let label = encode_text(&result.path);
        match &result.snippet {
            Some(snippet) => {
                let _ = writeln!(
                    html,
                    r#"<li><a href="/{href}">{label}</a><pre><code>{}</code></pre></li>"#,
                    encode_text(snippet)
                );
            }
            None => {
                let _ = writeln!(html, r#"<li><a href="/{href}">{label}</a></li>"#);
            }
        }
    }

    html.push_str("</ul>\n</main>\n");
    html.push_str(FILTER_SCRIPT);
    html.push_str("</body>\n</html>\n");
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_lists_paths() {
        let html = render_index(
            "",
            &[
                SearchMatch {
                    path: "b.com/index.html".to_owned(),
                    snippet: None,
                },
                SearchMatch {
                    path: "a.com/index.html".to_owned(),
                    snippet: None,
                },
            ],
        );

        assert!(html.contains(r#"<li><a href="/b.com/index.html">b.com/index.html</a></li>"#));
        assert!(html.contains(r#"<span id="counter">2</span>"#));
        assert!(html.find("b.com").unwrap() < html.find("a.com").unwrap());
    }

    #[test]
    fn test_render_escapes_snippet_and_query() {
        let html = render_index(
            "\"><script>",
            &[SearchMatch {
                path: "a.com/index.html".to_owned(),
                snippet: Some("<b>bold</b> & more".to_owned()),
            }],
        );

        assert!(html.contains("<pre><code>&lt;b&gt;bold&lt;/b&gt; &amp; more</code></pre>"));
        assert!(html.contains(r#"value="&quot;"#));
        assert!(!html.contains("<script>\""));
    }
}
