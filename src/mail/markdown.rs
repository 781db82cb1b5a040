//! Markdown bodies and their plain-text fallback.

use once_cell::sync::Lazy;
use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag};
use regex::{Captures, Regex};

static STYLE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<style\b.*?</style>").expect("valid style regex"));
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag regex"));
static ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|amp|lt|gt|quot|apos|nbsp);").expect("valid entity regex")
});

/// Convert GitHub-flavoured Markdown to HTML.
///
/// Raw HTML in the source is dropped, and links or images pointing at
/// script, file or non-image data URLs lose their target.
pub fn to_html(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_FOOTNOTES;

    let events = Parser::new_ext(markdown, options).filter_map(|event| match event {
        Event::Html(_) | Event::InlineHtml(_) => None,
        Event::Start(Tag::Link { link_type, dest_url, title, id }) => Some(Event::Start(Tag::Link {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        })),
        Event::Start(Tag::Image { link_type, dest_url, title, id }) => Some(Event::Start(Tag::Image {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        })),
        other => Some(other),
    });

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, events);
    out
}

fn safe_url(url: CowStr<'_>) -> CowStr<'_> {
    if is_unsafe_url(&url) {
        CowStr::Borrowed("")
    } else {
        url
    }
}

fn is_unsafe_url(url: &str) -> bool {
    let url = url.trim_start().to_ascii_lowercase();
    if url.starts_with("data:") {
        return !["data:image/png", "data:image/gif", "data:image/jpeg", "data:image/webp"]
            .iter()
            .any(|allowed| url.starts_with(allowed));
    }
    ["javascript:", "vbscript:", "file:"]
        .iter()
        .any(|scheme| url.starts_with(scheme))
}

/// Plain text from an HTML body: styles removed, tags stripped, entities
/// decoded.
pub fn to_text(html: &str) -> String {
    let without_styles = STYLE_BLOCK.replace_all(html, "");
    let stripped = TAG.replace_all(&without_styles, "");
    ENTITY
        .replace_all(&stripped, |caps: &Captures<'_>| decode_entity(&caps[1], &caps[0]))
        .trim()
        .to_string()
}

fn decode_entity(name: &str, original: &str) -> String {
    let decoded = match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let number = name.trim_start_matches('#');
            let code = match number.strip_prefix(|c| c == 'x' || c == 'X') {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => number.parse().ok(),
            };
            code.and_then(char::from_u32)
        }
    };
    decoded.map_or_else(|| original.to_string(), String::from)
}
