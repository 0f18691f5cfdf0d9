//! Chat messages for a page generation request.

use web2050_store::AssetList;

/// Built-in system prompt. `{tag}` is replaced with the output tag.
const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a web server on the internet of the year 2050. Every request names a \
file on some website. Reply with the complete contents of that file exactly as \
the server would send it: a full HTML document for pages, plain CSS for \
stylesheets, JavaScript for scripts, and so on.

Wrap the file contents in <{tag}> and </{tag}>. Anything outside those markers \
is discarded, so you may think before answering. Never put explanations inside \
the markers. Link freely to other pages of the same site using absolute paths \
that start with /{group}/. Keep the look and content consistent with the files \
of the site that already exist.";

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

/// Build the system and user messages for generating `key`.
#[must_use]
pub fn build_messages(
    key: &str,
    context: &AssetList,
    output_tag: &str,
    system_prompt: Option<&str>,
) -> Vec<ChatMessage> {
    let group = key.split('/').next().unwrap_or(key);
    let system = system_prompt
        .unwrap_or(DEFAULT_SYSTEM_PROMPT)
        .replace("{tag}", output_tag)
        .replace("{group}", group);

    let user = if context.is_empty() {
        format!("Requested file: /{key}")
    } else {
        format!("Existing files of this site:\n\n{context}\n\nRequested file: /{key}")
    };

    vec![
        ChatMessage {
            role: "system",
            content: system,
        },
        ChatMessage {
            role: "user",
            content: user,
        },
    ]
}
