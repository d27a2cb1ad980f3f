//! Feed module for aggregating posts across the pages of a thread.
//!
//! Pages are parsed independently and in parallel, then concatenated in page
//! order and deduplicated by post ID, keeping the first occurrence.

use indexmap::map::Entry;
use indexmap::IndexMap;
use rayon::prelude::*;
use tracing::debug;

use crate::parser;
use crate::post::Post;

/// The deduplicated collection of posts of a thread, in scrape order.
#[derive(Clone, Debug, Default)]
pub struct Feed {
    posts: IndexMap<u64, Post>,
    duplicates_dropped: usize,
}

impl Feed {
    /// Parse every page and aggregate the results.
    ///
    /// Parsing runs on the rayon pool; page order is preserved in the result.
    pub fn from_pages<S>(pages: &[S]) -> Feed
    where
        S: AsRef<str> + Sync,
    {
        let per_page: Vec<Vec<Post>> = pages
            .par_iter()
            .map(|page| parser::parse_document(page.as_ref()))
            .collect();

        debug!(pages = per_page.len(), "Parsed thread pages");
        Self::from_posts(per_page.into_iter().flatten())
    }

    /// Aggregate already parsed posts. The first post seen for an ID wins.
    pub fn from_posts<I>(posts: I) -> Feed
    where
        I: IntoIterator<Item = Post>,
    {
        let mut unique: IndexMap<u64, Post> = IndexMap::new();
        let mut duplicates_dropped = 0;

        for post in posts {
            match unique.entry(post.id()) {
                Entry::Occupied(_) => duplicates_dropped += 1,
                Entry::Vacant(slot) => {
                    slot.insert(post);
                }
            }
        }

        if duplicates_dropped > 0 {
            debug!(duplicates_dropped, "Dropped re-scraped posts");
        }

        Feed {
            posts: unique,
            duplicates_dropped,
        }
    }

    pub fn posts(&self) -> impl Iterator<Item = &Post> {
        self.posts.values()
    }

    pub fn get(&self, id: u64) -> Option<&Post> {
        self.posts.get(&id)
    }

    pub fn duplicates_dropped(&self) -> usize {
        self.duplicates_dropped
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

impl std::fmt::Display for Feed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Feed with {} posts:", self.posts.len())?;
        for (i, post) in self.posts.values().enumerate() {
            writeln!(f, "--- Post {} ---", i + 1)?;
            writeln!(f, "{post}")?;
            writeln!(f)?;
        }
        Ok(())
    }
}
