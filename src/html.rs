//! Text helpers over description fragments parsed by `scraper` (html5ever).

use scraper::{ElementRef, Node, Selector};
use thiserror::Error;

const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "footer",
    "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "ol", "p", "pre", "section",
    "table", "td", "th", "tr", "ul",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HtmlError {
    #[error("invalid selector '{selector}': {reason}")]
    Selector { selector: String, reason: String },
}

pub fn selector(css: &str) -> Result<Selector, HtmlError> {
    Selector::parse(css).map_err(|err| HtmlError::Selector {
        selector: css.to_string(),
        reason: format!("{err:?}"),
    })
}

pub fn is_block(name: &str) -> bool {
    BLOCK_ELEMENTS.contains(&name)
}

/// Text of an element with block boundaries turned into spaces and
/// whitespace collapsed.
pub fn text_of(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(element, &mut raw);
    normalize_whitespace(&raw)
}

/// Text of the siblings after `element`, stopping at the first block element.
pub fn inline_text_after(element: ElementRef<'_>) -> String {
    element
        .next_siblings()
        .map_while(|node| match node.value() {
            Node::Text(text) => Some(normalize_whitespace(text)),
            Node::Element(el) if is_block(el.name()) => None,
            Node::Element(_) => Some(ElementRef::wrap(node).map(text_of).unwrap_or_default()),
            _ => Some(String::new()),
        })
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    let block = is_block(element.value().name());
    if block {
        out.push(' ');
    }
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    collect_text(child, out);
                }
            }
            _ => {}
        }
    }
    if block {
        out.push(' ');
    }
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
