//! # forum-thread-lib-rs
//!
//! A Rust library for extracting the posts of a paginated forum thread and rebuilding
//! its reply hierarchy as an indented reading view.
//!
//! ## Overview
//!
//! Each page of a thread is parsed on its own into typed posts. The posts of all pages are
//! aggregated and deduplicated, then arranged into a reply tree that is flattened back into a
//! depth-ordered sequence, one row per post, with indentation proportional to reply depth.
//!
//! ## Features
//!
//! - **Page Parsing**: Extract post ID, author, timestamp, content, likes, shares and reply target
//! - **Content Sanitizing**: Drop quoted replies, turn emoji images into characters, normalize text
//! - **Feed Aggregation**: Parse pages in parallel and keep the first copy of every post
//! - **Threading System**: Rebuild the reply tree without recursion and flatten it for reading
//! - **Network Fetching**: Paced retrieval of every page of a thread
//! - **Export**: Write the reading view as CSV
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use forum_thread_lib_rs::{feed::Feed, threading::Hierarchy};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Parse saved pages of a thread
//!     let pages = vec![std::fs::read_to_string("page1.html")?, std::fs::read_to_string("page2.html")?];
//!     let feed = Feed::from_pages(&pages);
//!
//!     // Rebuild the reply hierarchy
//!     let mut hierarchy = Hierarchy::from(&feed);
//!     hierarchy.retain_non_empty();
//!     for node in hierarchy.nodes() {
//!         println!("{}", node.indented_comment());
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod export;
pub mod feed;
pub mod network;
pub mod parser;
pub mod post;
pub mod sanitize;
pub mod threading;
pub mod util;
