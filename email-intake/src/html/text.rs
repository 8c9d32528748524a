//! HTML to plain text conversion for email bodies.

use std::panic::{self, AssertUnwindSafe};

use scraper::{Html, Node};
use tracing::{debug, warn};

/// Maximum number of characters kept from an email body.
pub const BODY_TEXT_LIMIT: usize = 4000;

/// Elements whose text is not rendered content.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style"];

/// Characters that end a line: `\n`, `\r`, vertical tab, form feed, the
/// information separators, NEL, and the Unicode line/paragraph separators.
fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\u{0B}' | '\u{0C}' | '\u{1C}' | '\u{1D}' | '\u{1E}' | '\u{85}'
            | '\u{2028}' | '\u{2029}'
    )
}

/// Convert an HTML email body to plain text.
///
/// Text nodes are joined by newlines, every line is trimmed, empty lines are
/// dropped, and the result is cut to [`BODY_TEXT_LIMIT`] characters. If the
/// parser blows up, the raw input is cut to the same limit instead.
pub fn html_to_text(html: Option<&str>) -> String {
    match html {
        None | Some("") => String::new(),
        Some(html) => text_or_fallback(html, extract_text),
    }
}

fn text_or_fallback<F>(html: &str, extract: F) -> String
where
    F: FnOnce(&str) -> String,
{
    match panic::catch_unwind(AssertUnwindSafe(|| extract(html))) {
        Ok(text) => {
            let text = truncate_chars(&text, BODY_TEXT_LIMIT);
            debug!(
                html_length = html.len(),
                text_length = text.len(),
                "html_to_text_complete"
            );
            text
        }
        Err(_) => {
            warn!(html_length = html.len(), "html_to_text_failed_using_raw");
            truncate_chars(html, BODY_TEXT_LIMIT)
        }
    }
}

/// Collect visible text nodes, one per line, then normalise the lines.
fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let chunks: Vec<&str> = document
        .tree
        .root()
        .descendants()
        .filter_map(|node| match node.value() {
            Node::Text(text) => {
                let hidden = node
                    .parent()
                    .and_then(|parent| parent.value().as_element())
                    .is_some_and(|element| SKIPPED_ELEMENTS.contains(&element.name()));
                (!hidden).then_some(&**text)
            }
            _ => None,
        })
        .collect();

    chunks
        .join("\n")
        .split(is_line_break)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Keep the first `limit` characters (not bytes) of `text`.
fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_or_empty_input() {
        assert_eq!(html_to_text(None), "");
        assert_eq!(html_to_text(Some("")), "");
    }

    #[test]
    fn test_inline_and_block_content() {
        assert_eq!(html_to_text(Some("<p>Hello <b>World</b></p>")), "Hello\nWorld");
    }

    #[test]
    fn test_whitespace_lines_are_dropped() {
        let html = r#"
            <html>
                <body>
                    <div>   First line   </div>

                    <table><tr><td>Cell</td></tr></table>
                    <p>
                        Last line
                    </p>
                </body>
            </html>
        "#;

        assert_eq!(html_to_text(Some(html)), "First line\nCell\nLast line");
    }

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(html_to_text(Some("  just text\n\n more  ")), "just text\nmore");
    }

    #[test]
    fn test_entities_are_decoded() {
        assert_eq!(html_to_text(Some("<p>Fish &amp; Chips&nbsp;</p>")), "Fish & Chips");
    }

    #[test]
    fn test_script_and_style_are_skipped() {
        let html = "<style>p { color: red; }</style><p>Visible</p><script>var x = 1;</script>";
        assert_eq!(html_to_text(Some(html)), "Visible");
    }

    #[test]
    fn test_non_ascii_is_kept() {
        assert_eq!(html_to_text(Some("<p>Grüße</p><p>日本語</p>")), "Grüße\n日本語");
    }

    #[test]
    fn test_truncates_to_limit() {
        let html = format!("<p>{}</p>", "a".repeat(5000));
        let text = html_to_text(Some(&html));
        assert_eq!(text.chars().count(), BODY_TEXT_LIMIT);
    }

    #[test]
    fn test_truncation_counts_characters_not_bytes() {
        let html = format!("<p>{}</p>", "é".repeat(4100));
        let text = html_to_text(Some(&html));
        assert_eq!(text.chars().count(), BODY_TEXT_LIMIT);
        assert_eq!(text.len(), BODY_TEXT_LIMIT * 2);
    }

    #[test]
    fn test_short_text_is_not_truncated() {
        assert_eq!(truncate_chars("abc", 4000), "abc");
        assert_eq!(truncate_chars("abcdef", 3), "abc");
    }

    #[test]
    fn test_unicode_line_breaks_split_lines() {
        assert_eq!(
            html_to_text(Some("<p>a\u{2028}b\u{000C}c</p>")),
            "a\nb\nc"
        );
        assert_eq!(
            html_to_text(Some("<p>one\r\ntwo\rthree\u{0B}four\u{85}five\u{2029}six\u{1E}seven</p>")),
            "one\ntwo\nthree\nfour\nfive\nsix\nseven"
        );
    }

    #[test]
    fn test_failed_extraction_falls_back_to_raw() {
        let html = format!("<p>{}</p>", "b".repeat(5000));
        let text = text_or_fallback(&html, |_| panic!("parser exploded"));
        assert_eq!(text.chars().count(), BODY_TEXT_LIMIT);
        assert!(text.starts_with("<p>bbb"));
    }
}
