//! Post module for forum thread records.
//!
//! This module contains the Post struct, one message extracted from a page
//! of a thread, together with its reply target and reaction counters.

use std::fmt::Display;

use serde::Serialize;

/// Placeholder used for metadata fields that could not be resolved.
pub const UNKNOWN_FIELD: &str = "N/A";

/// Represents a post parsed from a thread page.
///
/// Username and timestamp are kept as the display strings found on the page,
/// content is already sanitized to plain text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Post {
    id: u64,
    reply_to: Option<u64>,
    username: String,
    timestamp: String,
    content: String,
    likes: u32,
    shares: u32,
}

impl Display for Post {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Post:\nID: {}\nReply To: {:?}\nUsername: {}\nTimestamp: {}\nLikes: {}\nShares: {}\nContent:\n{}",
            self.id, self.reply_to, self.username, self.timestamp, self.likes, self.shares, self.content
        )
    }
}

impl Post {
    /// Create a new top-level post with placeholder metadata and zero counters.
    pub fn new(id: u64, content: String) -> Self {
        Post {
            id,
            reply_to: None,
            username: UNKNOWN_FIELD.to_string(),
            timestamp: UNKNOWN_FIELD.to_string(),
            content,
            likes: 0,
            shares: 0,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn reply_to(&self) -> Option<u64> {
        self.reply_to
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn likes(&self) -> u32 {
        self.likes
    }

    pub fn shares(&self) -> u32 {
        self.shares
    }

    pub fn is_reply(&self) -> bool {
        self.reply_to.is_some()
    }

    /// True when the content is empty once surrounding whitespace is trimmed.
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }

    pub fn set_reply_to(&mut self, reply_to: Option<u64>) {
        self.reply_to = reply_to;
    }

    pub fn set_username(&mut self, username: String) {
        self.username = username;
    }

    pub fn set_timestamp(&mut self, timestamp: String) {
        self.timestamp = timestamp;
    }

    pub fn set_content(&mut self, content: String) {
        self.content = content;
    }

    pub fn set_likes(&mut self, likes: u32) {
        self.likes = likes;
    }

    pub fn set_shares(&mut self, shares: u32) {
        self.shares = shares;
    }

    /// Builder-style variant of [`Post::set_reply_to`].
    pub fn with_reply_to(mut self, reply_to: Option<u64>) -> Self {
        self.reply_to = reply_to;
        self
    }
}
