//! HTML serialization of documents.
//!
//! Paragraphs render as `<p>` elements. A parameter tag renders as
//!
//! ```text
//! <span data-parameter-tag="KEY" key="KEY" value="VALUE">"KEY":"VALUE"</span>
//! ```
//!
//! and any `span[data-parameter-tag]` parses back into a tag, whatever its
//! inner text says.

use super::document::{Atom, Document, Inline, ParameterTag};
use regex::Regex;
use std::sync::LazyLock;

/// Attribute that marks a parameter tag element.
pub const TAG_MARKER_ATTR: &str = "data-parameter-tag";

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
        .expect("attribute pattern is valid")
});

const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "h1", "h2", "h3", "h4", "h5", "h6", "li", "blockquote", "pre",
];

// Content of these is never text
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_attr(text: &str) -> String {
    escape_text(text).replace('"', "&quot;")
}

/// Render one tag as an HTML element.
pub fn render_tag(tag: &ParameterTag) -> String {
    let key = escape_attr(&tag.key);
    format!(
        r#"<span {TAG_MARKER_ATTR}="{key}" key="{key}" value="{}">{}</span>"#,
        escape_attr(&tag.value),
        escape_text(&tag.label()),
    )
}

/// Render a document as HTML.
pub fn to_html(doc: &Document) -> String {
    let mut html = String::new();
    for paragraph in doc.paragraphs() {
        html.push_str("<p>");
        for inline in paragraph {
            match inline {
                Inline::Text(text) => html.push_str(&escape_text(&text)),
                Inline::Tag(tag) => html.push_str(&render_tag(&tag)),
            }
        }
        html.push_str("</p>");
    }
    html
}

/// Decode the character references found in HTML text.
pub fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let decoded = after.find(';').and_then(|semi| {
            let name = &after[..semi];
            let c = match name {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => {
                    if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                        u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
                    } else if let Some(dec) = name.strip_prefix('#') {
                        dec.parse::<u32>().ok().and_then(char::from_u32)
                    } else {
                        None
                    }
                }
            };
            c.map(|c| (c, semi))
        });

        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &after[semi + 1..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// A start or end tag.
#[derive(Debug)]
struct Element {
    name: String,
    closing: bool,
    self_closing: bool,
    attrs: Vec<(String, String)>,
}

impl Element {
    fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let (closing, raw) = match raw.strip_prefix('/') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        let (self_closing, raw) = match raw.strip_suffix('/') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };

        let name_end = raw.find(char::is_whitespace).unwrap_or(raw.len());
        let name = raw[..name_end].to_ascii_lowercase();
        let attrs = ATTRIBUTE
            .captures_iter(&raw[name_end..])
            .map(|caps| {
                let attr_name = caps[1].to_ascii_lowercase();
                let value = caps
                    .get(2)
                    .or_else(|| caps.get(3))
                    .or_else(|| caps.get(4))
                    .map(|m| decode_entities(m.as_str()))
                    .unwrap_or_default();
                (attr_name, value)
            })
            .collect();

        Self {
            name,
            closing,
            self_closing,
            attrs,
        }
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    fn is_block(&self) -> bool {
        BLOCK_ELEMENTS.contains(&self.name.as_str())
    }
}

/// Parse HTML into a document. Markup other than blocks, line breaks and
/// parameter tags is dropped, keeping its text.
pub fn from_html(html: &str) -> Document {
    let mut doc = Document::new();
    let mut rest = html;
    // Depth of nested spans inside a parameter tag being skipped
    let mut inside_tag: Option<usize> = None;
    let mut seen_block = false;
    let mut at_block_start = false;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix('<') {
            let Some(end) = after.find('>') else {
                push_text(&mut doc, &decode_entities(rest));
                break;
            };
            let raw = &after[..end];
            rest = &after[end + 1..];

            if raw.starts_with('!') {
                // Comment or doctype
                continue;
            }
            let element = Element::parse(raw);

            if let Some(depth) = inside_tag {
                if element.name == "span" && !element.self_closing {
                    inside_tag = match (element.closing, depth) {
                        (true, 0) => None,
                        (true, d) => Some(d - 1),
                        (false, d) => Some(d + 1),
                    };
                }
                continue;
            }

            if RAW_TEXT_ELEMENTS.contains(&element.name.as_str())
                && !element.closing
                && !element.self_closing
            {
                let close = format!("</{}", element.name);
                rest = match rest.to_ascii_lowercase().find(&close) {
                    Some(at) => rest[at..].find('>').map_or("", |end| &rest[at + end + 1..]),
                    None => "",
                };
                continue;
            }

            if element.closing {
                if element.is_block() {
                    at_block_start = false;
                }
                continue;
            }

            if element.is_block() {
                if seen_block && !at_block_start {
                    doc.push(Atom::Break);
                }
                seen_block = true;
                at_block_start = true;
            } else if element.name == "br" {
                doc.push(Atom::Break);
                at_block_start = false;
            } else if element.name == "span" {
                if let Some(marker) = element.attr(TAG_MARKER_ATTR) {
                    let key = element.attr("key").unwrap_or(marker);
                    let value = element.attr("value").unwrap_or_default();
                    doc.push(Atom::Tag(ParameterTag::new(key, value)));
                    at_block_start = false;
                    if !element.self_closing {
                        inside_tag = Some(0);
                    }
                }
            }
        } else {
            let end = rest.find('<').unwrap_or(rest.len());
            if inside_tag.is_none() && push_text(&mut doc, &decode_entities(&rest[..end])) > 0 {
                at_block_start = false;
            }
            rest = &rest[end..];
        }
    }

    doc
}

fn push_text(doc: &mut Document, text: &str) -> usize {
    let mut pushed = 0;
    for c in text.chars().filter(|c| *c != '\n' && *c != '\r') {
        doc.push(Atom::Char(c));
        pushed += 1;
    }
    pushed
}
