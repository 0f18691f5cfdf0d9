//! Incremental extraction of a designated tag region from streamed text.
//!
//! The model wraps the artifact in `<_out>...</_out>` and may emit other
//! text (reasoning, commentary, `<think>` blocks) around it. [`TagExtractor`]
//! is fed arbitrary chunks and returns only the text inside the designated
//! region, with the designated markers themselves removed.
//!
//! A marker is the text between a `<` and the next `>`. Its name is the
//! first whitespace-delimited token after an optional leading `/`. A marker
//! seen while no region is open opens one, and only same-name markers change
//! its nesting depth. Inside the designated region, every other marker is
//! passed through verbatim. No HTML parsing is attempted.

/// A `<...>` marker split into its name and direction.
struct Marker<'a> {
    name: &'a str,
    closing: bool,
}

impl<'a> Marker<'a> {
    fn parse(inner: &'a str) -> Self {
        let (closing, rest) = match inner.strip_prefix('/') {
            Some(rest) => (true, rest),
            None => (false, inner),
        };
        Self {
            name: rest.split_whitespace().next().unwrap_or(""),
            closing,
        }
    }
}

/// Resumable extractor for one generation stream.
///
/// Concatenating the results of [`feed`](Self::feed) is independent of how
/// the input is split into chunks.
#[derive(Debug)]
pub struct TagExtractor {
    tag: String,
    buffer: String,
    depth: usize,
    open: Option<String>,
}

impl TagExtractor {
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            buffer: String::new(),
            depth: 0,
            open: None,
        }
    }

    /// Whether the extractor is inside the designated region.
    #[must_use]
    pub fn is_emitting(&self) -> bool {
        self.depth > 0 && self.open.as_deref() == Some(self.tag.as_str())
    }

    /// Feed the next chunk and return the designated-region text it completes.
    pub fn feed(&mut self, chunk: &str) -> String {
        self.buffer.push_str(chunk);
        let mut output = String::new();

        loop {
            let Some(start) = self.buffer.find('<') else {
                if self.is_emitting() {
                    output.push_str(&self.buffer);
                    self.buffer.clear();
                }
                break;
            };
            // Incomplete marker: keep everything from here for the next chunk.
            let Some(offset) = self.buffer[start..].find('>') else {
                break;
            };
            let end = start + offset;

            let marker = Marker::parse(&self.buffer[start + 1..end]);
            if self.is_emitting() {
                output.push_str(&self.buffer[..start]);
                if marker.name != self.tag {
                    output.push_str(&self.buffer[start..=end]);
                }
            }
            let (name, closing) = (marker.name.to_owned(), marker.closing);
            self.transition(&name, closing);
            self.buffer.drain(..=end);
        }

        output
    }

    fn transition(&mut self, name: &str, closing: bool) {
        let same = self.open.as_deref() == Some(name);
        if closing {
            if self.depth > 0 && same {
                self.depth -= 1;
                if self.depth == 0 {
                    self.open = None;
                }
            }
        } else if self.depth == 0 {
            self.open = Some(name.to_owned());
            self.depth = 1;
        } else if same {
            self.depth += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TAG: &str = "_out";

    fn extract(chunks: &[&str]) -> String {
        let mut extractor = TagExtractor::new(TAG);
        chunks.iter().map(|c| extractor.feed(c)).collect()
    }

    #[test]
    fn test_single_chunk() {
        assert_eq!(extract(&["<_out>hello</_out>"]), "hello");
    }

    #[test]
    fn test_text_outside_region_dropped() {
        assert_eq!(
            extract(&["Sure! Here you go:\n<_out>body</_out>\nHope that helps."]),
            "body"
        );
    }

    #[test]
    fn test_think_block_discarded() {
        assert_eq!(
            extract(&["<think>plan <_out> here</think><_out><!DOCTYPE html><p>hi</p></_out>"]),
            "<!DOCTYPE html><p>hi</p>"
        );
    }

    #[test]
    fn test_inner_markers_pass_through() {
        assert_eq!(
            extract(&["<_out><div class=\"a\"><br><img src=x></div></_out>"]),
            "<div class=\"a\"><br><img src=x></div>"
        );
    }

    #[test]
    fn test_nested_designated_markers_stripped() {
        assert_eq!(extract(&["<_out>a<_out>b</_out>c</_out>"]), "abc");
    }

    #[test]
    fn test_marker_with_attributes_matches_by_name() {
        assert_eq!(extract(&["<_out lang=\"html\">x</_out >"]), "x");
    }

    #[test]
    fn test_content_after_close_dropped() {
        assert_eq!(extract(&["<_out>one</_out>tail<b>two</b>"]), "one");
    }

    #[test]
    fn test_later_region_reopens() {
        assert_eq!(extract(&["<_out>one</_out> and <_out>two</_out>"]), "onetwo");
    }

    #[test]
    fn test_unterminated_region_streams_content() {
        assert_eq!(extract(&["<_out>partial ", "content"]), "partial content");
    }

    #[test]
    fn test_marker_split_across_chunks() {
        assert_eq!(extract(&["<_o", "ut>he", "llo</", "_out", ">"]), "hello");
    }

    #[test]
    fn test_text_before_pending_marker_held() {
        let mut extractor = TagExtractor::new(TAG);
        assert_eq!(extractor.feed("<_out>ab"), "ab");
        assert_eq!(extractor.feed("c<sp"), "");
        assert_eq!(extractor.feed("an>d"), "c<span>d");
    }

    #[test]
    fn test_no_region_emits_nothing() {
        assert_eq!(extract(&["just <b>chatter</b> with no output"]), "");
    }

    #[test]
    fn test_is_emitting_tracks_region() {
        let mut extractor = TagExtractor::new(TAG);
        assert!(!extractor.is_emitting());
        extractor.feed("<_out>x");
        assert!(extractor.is_emitting());
        extractor.feed("</_out>");
        assert!(!extractor.is_emitting());
    }

    #[test]
    fn test_custom_tag() {
        let mut extractor = TagExtractor::new("page");
        assert_eq!(extractor.feed("<_out>no</_out><page>yes</page>"), "yes");
    }

    #[test]
    fn test_every_split_point_gives_same_output() {
        let input = "intro <think>x<y>z</think> <_out><html><a href=\"/\">é</a>\
                     <_out>in</_out></html></_out> outro <b>bold</b>";
        let expected = extract(&[input]);
        assert_eq!(expected, "<html><a href=\"/\">é</a>in</html>");

        for (split, _) in input.char_indices().skip(1) {
            let (head, tail) = input.split_at(split);
            assert_eq!(extract(&[head, tail]), expected, "split at {split}");
        }

        let chars: Vec<String> = input.chars().map(String::from).collect();
        let refs: Vec<&str> = chars.iter().map(String::as_str).collect();
        assert_eq!(extract(&refs), expected);
    }
}
