use std::sync::LazyLock;

use scraper::{Html, Selector};

/// Elements that never carry page content.
static NON_CONTENT: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("script, style, nav, header, footer, aside, form, iframe, noscript")
        .expect("static non-content selector")
});

/// Turn fetched markup into a single line of readable text.
pub fn html_to_text(html: &str) -> String {
    let mut document = Html::parse_document(html);
    let unwanted: Vec<_> = document.select(&NON_CONTENT).map(|el| el.id()).collect();
    for id in unwanted {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }

    let stripped = document.html();
    let rendered = html2text::from_read(stripped.as_bytes(), 200).unwrap_or_else(|_| {
        document.root_element().text().collect::<Vec<_>>().join(" ")
    });
    collapse_whitespace(&rendered)
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cap text at `max_chars` characters (not bytes).
pub fn truncate_chars(text: String, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text,
    }
}
