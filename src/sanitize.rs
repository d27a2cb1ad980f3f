//! Content sanitizer for post bodies.
//!
//! Turns the content subtree of a post into plain text: quoted replies are
//! skipped, emoji images become their unicode character, the remaining text
//! fragments are joined with single spaces and HTML entities are decoded.

use scraper::node::Element;
use scraper::{ElementRef, Node};

use crate::util::join_fragments;

/// Flatten a content subtree into normalized text.
///
/// Quote blocks are skipped at any nesting depth. Every `img` is replaced by
/// the emoji its alt-text names, or by nothing when the alias is unknown.
pub fn sanitize_content(content: ElementRef<'_>) -> String {
    let mut fragments: Vec<&str> = Vec::new();
    let mut stack: Vec<_> = content.children().rev().collect();

    while let Some(node) = stack.pop() {
        match node.value() {
            Node::Text(text) => fragments.push(&**text),
            Node::Element(element) => {
                if is_quote(element) {
                    continue;
                }
                if element.name() == "img" {
                    let replacement = element
                        .attr("alt")
                        .and_then(emoji_for_alias)
                        .unwrap_or("");
                    fragments.push(replacement);
                    continue;
                }
                stack.extend(node.children().rev());
            }
            _ => {}
        }
    }

    let text = join_fragments(fragments);
    html_escape::decode_html_entities(&text).into_owned()
}

/// Resolve an emoji alias such as `smile` or `:thumbsup:` to its character.
pub fn emoji_for_alias(alias: &str) -> Option<&'static str> {
    let alias = alias.trim().trim_matches(':').to_lowercase();
    if alias.is_empty() {
        return None;
    }
    emojis::get_by_shortcode(&alias).map(|emoji| emoji.as_str())
}

/// A `blockquote`, or any element with a class mentioning "quote".
fn is_quote(element: &Element) -> bool {
    element.name() == "blockquote" || element.classes().any(|class| class.contains("quote"))
}
