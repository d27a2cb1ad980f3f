//! Parser module for forum thread pages.
//!
//! This module turns the raw HTML of one thread page into an ordered list of
//! posts. Extraction is tolerant: a missing fragment degrades one field to its
//! default instead of dropping the post or the page.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

pub use crate::post::Post;
use crate::sanitize::sanitize_content;
use crate::util::{first_integer, join_fragments};

const POST_ID_PREFIX: &str = "pb";
const LIKES_ID_PREFIX: &str = "lpt";
const SHARES_ID_PREFIX: &str = "shb";
const REPLY_MARKER: &str = "post=";

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

static POST_LISTING: LazyLock<Selector> = LazyLock::new(|| selector(r#"table[summary="posts"]"#));
static POST_CELL: LazyLock<Selector> = LazyLock::new(|| selector(r#"td[id^="pb"]"#));
static META_CELL: LazyLock<Selector> = LazyLock::new(|| selector("td.bold.l.pu"));
static AUTHOR: LazyLock<Selector> = LazyLock::new(|| selector("a.user"));
static TIMESTAMP: LazyLock<Selector> = LazyLock::new(|| selector("span.s"));
static CONTENT: LazyLock<Selector> = LazyLock::new(|| selector("div.narrow"));
static COUNTER: LazyLock<Selector> = LazyLock::new(|| selector("b[id]"));
static PERMALINK: LazyLock<Selector> = LazyLock::new(|| selector(r#"a[href*="/post/"]"#));
static BOLD: LazyLock<Selector> = LazyLock::new(|| selector("b"));
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| selector("a[href]"));

static PERMALINK_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/post/(\d+)").expect("valid permalink regex"));

/// Parse one thread page into its posts, in document order.
///
/// # Arguments
///
/// * `html` - The raw HTML of the page
///
/// # Returns
///
/// The posts found on the page. A page without a post listing yields an empty vector.
pub fn parse_document(html: &str) -> Vec<Post> {
    let document = Html::parse_document(html);

    let Some(listing) = document.select(&POST_LISTING).next() else {
        debug!("No post listing found on page");
        return Vec::new();
    };

    let posts: Vec<Post> = listing.select(&POST_CELL).filter_map(parse_post).collect();
    debug!(count = posts.len(), "Parsed posts from page");
    posts
}

/// Whether the page carries a post listing at all.
pub fn has_post_listing(html: &str) -> bool {
    Html::parse_document(html).select(&POST_LISTING).next().is_some()
}

/// Find the highest page number linked from a thread page.
///
/// Page links end with the thread's path, optionally followed by `/<index>`
/// where the page number is `index + 1`. Absolute and relative links both count.
///
/// # Arguments
///
/// * `html` - The raw HTML of any page of the thread
/// * `thread_url` - The URL of the thread's first page
///
/// # Returns
///
/// The highest page number seen, never less than 1.
pub fn detect_total_pages(html: &str, thread_url: &str) -> u32 {
    let tail = thread_path(thread_url);
    if tail.is_empty() {
        return 1;
    }
    let Ok(page_link) = Regex::new(&format!(r"{}(?:/(\d+))?$", regex::escape(&tail))) else {
        return 1;
    };

    let document = Html::parse_document(html);
    document
        .select(&ANCHOR)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| page_link.captures(href))
        .map(|caps| match caps.get(1) {
            Some(index) => index.as_str().parse::<u32>().map_or(1, |i| i.saturating_add(1)),
            None => 1,
        })
        .max()
        .unwrap_or(1)
}

fn thread_path(thread_url: &str) -> String {
    match Url::parse(thread_url) {
        Ok(url) => url.path().trim_end_matches('/').to_string(),
        Err(_) => thread_url.trim_end_matches('/').to_string(),
    }
}

fn parse_post(cell: ElementRef<'_>) -> Option<Post> {
    let id = post_id(cell)?;

    let content = cell.select(&CONTENT).next().unwrap_or(cell);
    let mut post = Post::new(id, sanitize_content(content));

    if let Some(meta) = metadata_cell(cell) {
        if let Some(username) = first_text(meta, &AUTHOR) {
            post.set_username(username);
        }
        if let Some(timestamp) = first_text(meta, &TIMESTAMP) {
            post.set_timestamp(timestamp);
        }
    }

    post.set_likes(counter(cell, LIKES_ID_PREFIX, id));
    post.set_shares(counter(cell, SHARES_ID_PREFIX, id));
    post.set_reply_to(reply_target(content));

    Some(post)
}

fn post_id(cell: ElementRef<'_>) -> Option<u64> {
    let raw = cell.value().id()?;
    let parsed = raw
        .strip_prefix(POST_ID_PREFIX)
        .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|digits| digits.parse::<u64>().ok())
        .filter(|&id| id > 0);

    if parsed.is_none() {
        debug!(id = raw, "Skipping post container with unexpected identifier");
    }
    parsed
}

/// The metadata cell lives in the row right before the row holding the post.
fn metadata_cell(cell: ElementRef<'_>) -> Option<ElementRef<'_>> {
    let row = cell
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "tr")?;
    let meta_row = row
        .prev_siblings()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "tr")?;
    meta_row.select(&META_CELL).next()
}

fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    let text = join_fragments(scope.select(selector).next()?.text());
    (!text.is_empty()).then_some(text)
}

fn counter(cell: ElementRef<'_>, prefix: &str, id: u64) -> u32 {
    let wanted = format!("{prefix}{id}");
    cell.select(&COUNTER)
        .find(|b| b.value().id() == Some(wanted.as_str()))
        .and_then(|b| first_integer(&join_fragments(b.text())))
        .unwrap_or(0)
}

/// First permalink to another post wins, then the first bold `post=<N>` marker.
fn reply_target(content: ElementRef<'_>) -> Option<u64> {
    content
        .select(&PERMALINK)
        .filter_map(|a| a.value().attr("href"))
        .find_map(|href| PERMALINK_ID.captures(href)?[1].parse().ok())
        .or_else(|| {
            content.select(&BOLD).find_map(|b| {
                let text = join_fragments(b.text());
                if text.to_lowercase().starts_with(REPLY_MARKER) {
                    first_integer(&text)
                } else {
                    None
                }
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post::UNKNOWN_FIELD;

    fn page(rows: &str) -> String {
        format!("<html><body><table summary=\"posts\">{rows}</table></body></html>")
    }

    fn meta_row(id: u64, user: &str) -> String {
        format!(
            "<tr><td class=\"bold l pu\"><a name=\"{id}\"></a>\
             <a href=\"/{user}\" class=\"user\">{user}</a>: \
             <span class=\"s\"><b>9:38pm</b> On <b>Aug 10</b></span></td></tr>"
        )
    }

    fn body_row(id: u64, body: &str, likes: &str, shares: &str) -> String {
        format!(
            "<tr><td id=\"pb{id}\" class=\"l w pd\"><div class=\"narrow\">{body}</div>\
             <p class=\"s\"><b id=\"lpt{id}\">{likes}</b> <b id=\"shb{id}\">{shares}</b></p></td></tr>"
        )
    }

    #[test]
    fn test_parse_full_post() {
        let html = page(&format!(
            "{}{}",
            meta_row(101, "seun"),
            body_row(101, "Welcome to the thread", "12 Likes", "3 Shares")
        ));

        let posts = parse_document(&html);
        assert_eq!(posts.len(), 1);

        let post = &posts[0];
        assert_eq!(post.id(), 101);
        assert_eq!(post.username(), "seun");
        assert_eq!(post.timestamp(), "9:38pm On Aug 10");
        assert_eq!(post.content(), "Welcome to the thread");
        assert_eq!(post.likes(), 12);
        assert_eq!(post.shares(), 3);
        assert_eq!(post.reply_to(), None);
    }

    #[test]
    fn test_missing_listing_yields_no_posts() {
        let html = "<html><body><table><tr><td id=\"pb5\">orphan</td></tr></table></body></html>";
        assert!(parse_document(html).is_empty());
        assert!(!has_post_listing(html));
        assert!(has_post_listing(&page("")));
    }

    #[test]
    fn test_posts_keep_document_order() {
        let html = page(&format!(
            "{}{}{}{}",
            meta_row(7, "a"),
            body_row(7, "first", "", ""),
            meta_row(3, "b"),
            body_row(3, "second", "", "")
        ));
        let ids: Vec<u64> = parse_document(&html).iter().map(Post::id).collect();
        assert_eq!(ids, vec![7, 3]);
    }

    #[test]
    fn test_unexpected_identifier_is_skipped() {
        let html = page(
            "<tr><td id=\"pbx12\"><div class=\"narrow\">bad</div></td></tr>\
             <tr><td id=\"pb\"><div class=\"narrow\">empty</div></td></tr>\
             <tr><td id=\"pb0\"><div class=\"narrow\">zero</div></td></tr>\
             <tr><td id=\"pb9\"><div class=\"narrow\">good</div></td></tr>",
        );
        let posts = parse_document(&html);
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].id(), 9);
    }

    #[test]
    fn test_missing_metadata_defaults_independently() {
        let no_meta = page(&body_row(1, "text", "", ""));
        let post = &parse_document(&no_meta)[0];
        assert_eq!(post.username(), UNKNOWN_FIELD);
        assert_eq!(post.timestamp(), UNKNOWN_FIELD);

        let only_user = page(&format!(
            "<tr><td class=\"bold l pu\"><a class=\"user\" href=\"/tobi\">tobi</a></td></tr>{}",
            body_row(2, "text", "", "")
        ));
        let post = &parse_document(&only_user)[0];
        assert_eq!(post.username(), "tobi");
        assert_eq!(post.timestamp(), UNKNOWN_FIELD);
    }

    #[test]
    fn test_missing_counters_default_to_zero() {
        let html = page(&format!(
            "{}<tr><td id=\"pb55\"><div class=\"narrow\">no reactions</div></td></tr>",
            meta_row(55, "ada")
        ));
        let post = &parse_document(&html)[0];
        assert_eq!(post.likes(), 0);
        assert_eq!(post.shares(), 0);
    }

    #[test]
    fn test_counter_without_digits_is_zero() {
        let html = page(&body_row(8, "x", "Like", "2 Shares"));
        let post = &parse_document(&html)[0];
        assert_eq!(post.likes(), 0);
        assert_eq!(post.shares(), 2);
    }

    #[test]
    fn test_counters_belong_to_their_post() {
        let html = page("<tr><td id=\"pb4\"><div class=\"narrow\">x</div><b id=\"lpt99\">50 Likes</b></td></tr>");
        assert_eq!(parse_document(&html)[0].likes(), 0);
    }

    #[test]
    fn test_reply_target_from_permalink_inside_quote() {
        let body = "<blockquote><a href=\"/post/130885241\">ada</a>: old message</blockquote>\
                    My reply <a href=\"/post/130885999\">other</a>";
        let html = page(&format!("{}{}", meta_row(2, "tobi"), body_row(2, body, "", "")));
        let post = &parse_document(&html)[0];

        assert_eq!(post.reply_to(), Some(130885241));
        assert_eq!(post.content(), "My reply other");
    }

    #[test]
    fn test_reply_target_from_bold_marker() {
        let body = "<b>Post=4821</b> I agree with you";
        let html = page(&body_row(5, body, "", ""));
        assert_eq!(parse_document(&html)[0].reply_to(), Some(4821));
    }

    #[test]
    fn test_bold_marker_after_other_bold_text() {
        let body = "<b>Hey</b> see this <b>post=5</b> for context";
        let html = page(&body_row(8, body, "", ""));
        let post = &parse_document(&html)[0];

        assert_eq!(post.reply_to(), Some(5));
        assert_eq!(post.content(), "Hey see this post=5 for context");
    }

    #[test]
    fn test_permalink_beats_earlier_bold_marker() {
        let body = "<b>post=5</b> and <a href=\"/post/9\">this one</a>";
        let html = page(&body_row(9, body, "", ""));
        assert_eq!(parse_document(&html)[0].reply_to(), Some(9));
    }

    #[test]
    fn test_no_reply_target() {
        let body = "<b>Important</b> news <a href=\"/seun\">seun</a>";
        let html = page(&body_row(6, body, "", ""));
        assert_eq!(parse_document(&html)[0].reply_to(), None);
    }

    #[test]
    fn test_content_falls_back_to_post_container() {
        let html = page("<tr><td id=\"pb77\">bare text</td></tr>");
        assert_eq!(parse_document(&html)[0].content(), "bare text");
    }

    #[test]
    fn test_detect_total_pages() {
        let thread = "https://www.nairaland.com/8156758/bbnaija-2024-live-updates-thread";
        let html = "<html><body>\
            <a href=\"/8156758/bbnaija-2024-live-updates-thread\">(1)</a>\
            <a href=\"/8156758/bbnaija-2024-live-updates-thread/1\">(2)</a>\
            <a href=\"https://www.nairaland.com/8156758/bbnaija-2024-live-updates-thread/41\">(42)</a>\
            <a href=\"/8156758/bbnaija-2024-live-updates-thread/500#12\">anchor</a>\
            <a href=\"/other/thread/900\">elsewhere</a>\
            </body></html>";
        assert_eq!(detect_total_pages(html, thread), 42);
    }

    #[test]
    fn test_detect_total_pages_defaults_to_one() {
        let thread = "https://www.nairaland.com/8156758/bbnaija-2024-live-updates-thread";
        assert_eq!(detect_total_pages("<html><body>no links</body></html>", thread), 1);
        assert_eq!(detect_total_pages("<a href=\"/x/1\">x</a>", "https://www.nairaland.com/"), 1);
    }
}
