use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("valid digits regex"));

/// Parse the first run of ASCII digits found in `text`.
///
/// Returns `None` when there are no digits or the run does not fit in `T`.
pub fn first_integer<T: FromStr>(text: &str) -> Option<T> {
    DIGITS.find(text).and_then(|m| m.as_str().parse().ok())
}

/// Trim every fragment, drop the empty ones and join the rest with single spaces.
pub fn join_fragments<'a, I>(fragments: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out = String::new();
    for fragment in fragments {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(fragment);
    }
    out
}
