//! Text helpers for feed entry content.

use scraper::Html;

/// Visible text of an HTML fragment with whitespace collapsed. Script and
/// style bodies are dropped; entities are decoded by the parser.
pub fn extract_text_from_html(html: &str) -> String {
    let fragment = Html::parse_fragment(html);

    let mut raw = String::with_capacity(html.len());
    for node in fragment.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|element| matches!(element.name(), "script" | "style"))
        });
        if !hidden {
            raw.push_str(text);
            // Keep words in adjacent elements apart.
            raw.push(' ');
        }
    }

    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First `max_chars` characters of `text`. Counts chars, never splits one.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text.to_string(),
    }
}

/// Plain-text excerpt of an entry summary, at most `max_chars` long.
pub fn excerpt(summary: &str, max_chars: usize) -> String {
    truncate_chars(&extract_text_from_html(summary), max_chars)
}
