use feed_rs::model::Entry;
use feed_rs::parser;
use scraper::{ElementRef, Html};

use crate::error::FeedParseError;
use crate::html::{inline_text_after, selector, text_of, HtmlError};
use crate::models::{DEADLINE_SENTINEL, EMPTY_DESCRIPTION};

const DEADLINE_MARKER: &str = "Deadline:";
const MARKER_SELECTOR: &str = "strong, b, em, i";

/// An item as it sits in the feed, before its description is picked apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawItem {
    pub title: String,
    pub link: String,
    pub description: String,
}

/// What we pull out of an item's HTML description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDescription {
    pub description: String,
    pub deadline: String,
    pub discussion_link: String,
}

/// Parses an RSS document into its items.
/// A channel carrying a single item yields a one-element list.
pub fn parse_feed(xml: &[u8]) -> Result<Vec<RawItem>, FeedParseError> {
    let feed = parser::parse(xml)?;
    Ok(feed.entries.into_iter().map(raw_item_from_entry).collect())
}

fn raw_item_from_entry(entry: Entry) -> RawItem {
    let title = entry
        .title
        .map(|t| t.content.trim().to_string())
        .unwrap_or_else(|| "Untitled".to_string());

    let link = entry
        .links
        .first()
        .map(|l| l.href.trim().to_string())
        .unwrap_or_default();

    let description = entry
        .summary
        .map(|s| s.content)
        .or_else(|| entry.content.and_then(|c| c.body))
        .unwrap_or_default();

    RawItem {
        title,
        link,
        description,
    }
}

/// Extracts the deadline and discussion link from a description fragment and
/// returns the remaining text with the deadline marker removed.
pub fn parse_description(html: &str) -> Result<ParsedDescription, HtmlError> {
    let mut document = Html::parse_fragment(html);
    let root = document.root_element().id();

    let marker = document
        .select(&selector(MARKER_SELECTOR)?)
        .find(|el| text_of(*el) == DEADLINE_MARKER)
        .map(|marker| {
            let value = match marker.parent().and_then(ElementRef::wrap) {
                Some(parent) if parent.id() != root => text_of(parent)
                    .replacen(DEADLINE_MARKER, "", 1)
                    .trim()
                    .to_string(),
                _ => inline_text_after(marker),
            };
            (marker.id(), value)
        });

    let deadline = match marker {
        Some((id, value)) => {
            if let Some(mut node) = document.tree.get_mut(id) {
                node.detach();
            }
            if value.is_empty() {
                DEADLINE_SENTINEL.to_string()
            } else {
                value
            }
        }
        None => DEADLINE_SENTINEL.to_string(),
    };

    let discussion_link = document
        .select(&selector("a")?)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(|href| href.trim().to_string())
        .unwrap_or_default();

    let text = text_of(document.root_element());
    let description = if text.is_empty() {
        EMPTY_DESCRIPTION.to_string()
    } else {
        text
    };

    Ok(ParsedDescription {
        description,
        deadline,
        discussion_link,
    })
}
