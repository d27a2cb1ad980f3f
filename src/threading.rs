//! Threading module for rebuilding the reply hierarchy of a thread.
//!
//! Posts are arranged into a reply tree and flattened back into a pre-order
//! sequence where every node carries its depth ("tier"), ready for a linear
//! reading view. Posts that cannot be placed are reported rather than fatal.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::feed::Feed;
use crate::post::Post;

/// Indentation emitted once per tier in front of a node's content.
pub const INDENT_UNIT: &str = "\u{00A0}\u{00A0}\u{00A0}\u{00A0}";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HierarchyError {
    #[error("reply cycle detected between posts {post_ids:?}")]
    ReplyCycle { post_ids: Vec<u64> },
}

/// A post placed in the reply tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HierarchyNode {
    /// The post at this node
    pub post: Post,
    /// Depth in the conversation (0 = top-level)
    pub tier: usize,
}

impl HierarchyNode {
    pub fn new(post: Post, tier: usize) -> Self {
        Self { post, tier }
    }

    /// Content prefixed with one [`INDENT_UNIT`] per tier.
    ///
    /// Built on demand; a long reply chain would otherwise hold a quadratic
    /// amount of indentation.
    pub fn indented_comment(&self) -> String {
        let content = self.post.content();
        let mut out = String::with_capacity(INDENT_UNIT.len() * self.tier + content.len());
        for _ in 0..self.tier {
            out.push_str(INDENT_UNIT);
        }
        out.push_str(content);
        out
    }
}

/// Why a post was left out of the hierarchy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExclusionReason {
    /// An ancestor of the post was never scraped.
    DanglingParent { missing_ancestor: u64 },
    /// The post's parent chain loops. `anchor` is the smallest post id on the
    /// loop and identifies it among [`Hierarchy::cycles`].
    ReplyCycle { anchor: u64 },
}

/// A post left out of the hierarchy because it cannot be reached from a top-level post.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Exclusion {
    pub post_id: u64,
    pub reason: ExclusionReason,
}

impl Exclusion {
    /// The unscraped ancestor, for posts excluded on a dangling parent.
    pub fn missing_ancestor(&self) -> Option<u64> {
        match self.reason {
            ExclusionReason::DanglingParent { missing_ancestor } => Some(missing_ancestor),
            ExclusionReason::ReplyCycle { .. } => None,
        }
    }
}

/// The flattened reply tree of a thread.
#[derive(Clone, Debug, Default)]
pub struct Hierarchy {
    nodes: Vec<HierarchyNode>,
    excluded: Vec<Exclusion>,
    cycles: Vec<Vec<u64>>,
}

/// Build the pre-order reading view of a deduplicated post collection.
///
/// Children keep the order in which they appear in `posts`. Posts that cannot
/// be reached from a top-level post, because an ancestor is missing from the
/// collection or because their parent chain loops, are dropped together with
/// their replies and reported in [`Hierarchy::excluded`].
pub fn build_hierarchy<'a, I>(posts: I) -> Hierarchy
where
    I: IntoIterator<Item = &'a Post>,
{
    let mut arena: Vec<&Post> = Vec::new();
    let mut index: HashMap<u64, usize> = HashMap::new();
    for post in posts {
        if let std::collections::hash_map::Entry::Vacant(slot) = index.entry(post.id()) {
            slot.insert(arena.len());
            arena.push(post);
        }
    }

    // None is the root sentinel.
    let mut children: HashMap<Option<u64>, Vec<usize>> = HashMap::new();
    for (i, post) in arena.iter().enumerate() {
        children.entry(post.reply_to()).or_default().push(i);
    }

    let mut nodes = Vec::with_capacity(arena.len());
    let mut visited = vec![false; arena.len()];
    let mut stack: Vec<(usize, usize)> = children
        .get(&None)
        .map(|roots| roots.iter().rev().map(|&i| (i, 0)).collect())
        .unwrap_or_default();

    while let Some((i, tier)) = stack.pop() {
        if std::mem::replace(&mut visited[i], true) {
            continue;
        }
        let post = arena[i];
        nodes.push(HierarchyNode::new(post.clone(), tier));

        if let Some(replies) = children.get(&Some(post.id())) {
            stack.extend(replies.iter().rev().map(|&child| (child, tier + 1)));
        }
    }

    let (excluded, cycles) = classify_unreached(&arena, &index, &visited);
    debug!(
        nodes = nodes.len(),
        excluded = excluded.len(),
        cycles = cycles.len(),
        "Built reply hierarchy"
    );

    Hierarchy {
        nodes,
        excluded,
        cycles,
    }
}

/// Walk the parent chain of every post the traversal never reached.
///
/// A chain ends either at a parent missing from the collection, or loops.
/// Returns the exclusions in input order and every loop found, as sorted ids.
fn classify_unreached(
    arena: &[&Post],
    index: &HashMap<u64, usize>,
    visited: &[bool],
) -> (Vec<Exclusion>, Vec<Vec<u64>>) {
    let mut resolved: HashMap<usize, ExclusionReason> = HashMap::new();
    let mut excluded = Vec::new();
    let mut cycles = Vec::new();

    for start in (0..arena.len()).filter(|&i| !visited[i]) {
        let mut chain = vec![start];
        let mut on_chain = HashSet::from([start]);
        let mut current = start;

        let reason = loop {
            if let Some(reason) = resolved.get(&current) {
                break Some(reason.clone());
            }
            let Some(parent_id) = arena[current].reply_to() else {
                break None;
            };
            let Some(&parent) = index.get(&parent_id) else {
                break Some(ExclusionReason::DanglingParent {
                    missing_ancestor: parent_id,
                });
            };
            if visited[parent] {
                break None;
            }
            if !on_chain.insert(parent) {
                let position = chain.iter().position(|&i| i == parent).unwrap_or(0);
                let mut cycle: Vec<u64> =
                    chain[position..].iter().map(|&i| arena[i].id()).collect();
                cycle.sort_unstable();
                let anchor = cycle[0];
                debug!(post_ids = ?cycle, "Found reply cycle");
                cycles.push(cycle);
                break Some(ExclusionReason::ReplyCycle { anchor });
            }
            chain.push(parent);
            current = parent;
        };

        if let Some(reason) = reason {
            for &i in &chain {
                resolved.insert(i, reason.clone());
            }
            debug!(
                post_id = arena[start].id(),
                reason = ?reason,
                "Excluding unreachable post"
            );
            excluded.push(Exclusion {
                post_id: arena[start].id(),
                reason,
            });
        }
    }

    (excluded, cycles)
}

impl Hierarchy {
    pub fn nodes(&self) -> &[HierarchyNode] {
        &self.nodes
    }

    pub fn excluded(&self) -> &[Exclusion] {
        &self.excluded
    }

    /// Reply loops found while building, each as the sorted ids of the posts on it.
    pub fn cycles(&self) -> &[Vec<u64>] {
        &self.cycles
    }

    /// Check that the reply relation of the source posts was acyclic.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::ReplyCycle`] for the first loop found.
    pub fn check_integrity(&self) -> Result<(), HierarchyError> {
        match self.cycles.first() {
            Some(post_ids) => Err(HierarchyError::ReplyCycle {
                post_ids: post_ids.clone(),
            }),
            None => Ok(()),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of top-level conversations.
    pub fn root_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.tier == 0).count()
    }

    /// Drop nodes whose content is blank. Returns how many were removed.
    pub fn retain_non_empty(&mut self) -> usize {
        let before = self.nodes.len();
        self.nodes.retain(|node| !node.post.is_blank());
        before - self.nodes.len()
    }
}

impl From<&Feed> for Hierarchy {
    fn from(feed: &Feed) -> Self {
        build_hierarchy(feed.posts())
    }
}

impl std::fmt::Display for Hierarchy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Reading view with {} posts in {} conversations:",
            self.len(),
            self.root_count()
        )?;

        for node in &self.nodes {
            let indent = "  ".repeat(node.tier);
            writeln!(
                f,
                "{indent}#{} {} ({})",
                node.post.id(),
                node.post.username(),
                node.post.timestamp()
            )?;
            writeln!(f, "{indent}{}", node.post.content())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(id: u64, parent: Option<u64>, text: &str) -> Post {
        Post::new(id, text.to_string()).with_reply_to(parent)
    }

    fn order(hierarchy: &Hierarchy) -> Vec<(u64, usize)> {
        hierarchy
            .nodes()
            .iter()
            .map(|node| (node.post.id(), node.tier))
            .collect()
    }

    #[test]
    fn test_simple_reply_tree() {
        let posts = vec![
            post(1, None, "Hi"),
            post(2, Some(1), "Hello"),
            post(3, None, "Bye"),
        ];

        let hierarchy = build_hierarchy(&posts);

        assert_eq!(order(&hierarchy), vec![(1, 0), (2, 1), (3, 0)]);
        assert_eq!(hierarchy.root_count(), 2);
        assert!(hierarchy.excluded().is_empty());
    }

    #[test]
    fn test_depth_and_sibling_order() {
        let posts = vec![
            post(1, None, "root"),
            post(2, Some(1), "first reply"),
            post(3, Some(2), "nested"),
            post(4, Some(1), "second reply"),
            post(5, Some(3), "deeper"),
            post(6, None, "another root"),
            post(7, Some(1), "third reply"),
        ];

        let hierarchy = build_hierarchy(&posts);

        assert_eq!(
            order(&hierarchy),
            vec![(1, 0), (2, 1), (3, 2), (5, 3), (4, 1), (7, 1), (6, 0)]
        );
    }

    #[test]
    fn test_dangling_parent_excludes_subtree() {
        let posts = vec![
            post(10, None, "kept"),
            post(11, Some(999), "parent never scraped"),
            post(12, Some(11), "reply to excluded"),
            post(13, Some(12), "deeper still"),
            post(14, Some(10), "kept reply"),
        ];

        let hierarchy = build_hierarchy(&posts);

        assert_eq!(order(&hierarchy), vec![(10, 0), (14, 1)]);
        let excluded: Vec<(u64, Option<u64>)> = hierarchy
            .excluded()
            .iter()
            .map(|e| (e.post_id, e.missing_ancestor()))
            .collect();
        assert_eq!(excluded, vec![(11, Some(999)), (12, Some(999)), (13, Some(999))]);
        assert!(hierarchy.cycles().is_empty());
        assert!(hierarchy.check_integrity().is_ok());
    }

    #[test]
    fn test_indentation_formula() {
        let posts = vec![
            post(1, None, "a"),
            post(2, Some(1), "b"),
            post(3, Some(2), "  c"),
        ];

        let hierarchy = build_hierarchy(&posts);

        for node in hierarchy.nodes() {
            let expected = format!("{}{}", INDENT_UNIT.repeat(node.tier), node.post.content());
            assert_eq!(node.indented_comment(), expected);
        }
        assert_eq!(
            hierarchy.nodes()[2].indented_comment(),
            "\u{00A0}".repeat(8) + "  c"
        );
    }

    #[test]
    fn test_build_is_deterministic() {
        let posts: Vec<Post> = (1..=200)
            .map(|id| post(id, (id > 1).then(|| (id * 7) % (id - 1) + 1), "x"))
            .collect();

        let first = build_hierarchy(&posts);
        let second = build_hierarchy(&posts);

        assert_eq!(first.nodes(), second.nodes());
        assert_eq!(first.len(), posts.len());
    }

    #[test]
    fn test_retain_non_empty() {
        let posts = vec![
            post(1, None, "content"),
            post(2, Some(1), "   "),
            post(3, Some(2), "reply to blank"),
        ];

        let mut hierarchy = build_hierarchy(&posts);
        let removed = hierarchy.retain_non_empty();

        assert_eq!(removed, 1);
        assert_eq!(order(&hierarchy), vec![(1, 0), (3, 2)]);
    }

    #[test]
    fn test_self_reply_is_excluded_as_cycle() {
        let posts = vec![post(1, None, "root"), post(2, Some(2), "loop")];

        let hierarchy = build_hierarchy(&posts);

        assert_eq!(order(&hierarchy), vec![(1, 0)]);
        assert_eq!(
            hierarchy.excluded(),
            &[Exclusion {
                post_id: 2,
                reason: ExclusionReason::ReplyCycle { anchor: 2 },
            }]
        );
        assert_eq!(hierarchy.excluded()[0].missing_ancestor(), None);
        assert_eq!(
            hierarchy.check_integrity(),
            Err(HierarchyError::ReplyCycle { post_ids: vec![2] })
        );
    }

    #[test]
    fn test_reply_cycle_keeps_rest_of_thread() {
        let posts = vec![
            post(1, None, "root"),
            post(2, Some(4), "a"),
            post(3, Some(2), "b"),
            post(4, Some(3), "c"),
            post(5, Some(4), "hanging off the loop"),
            post(6, Some(1), "kept reply"),
            post(7, Some(404), "dangling"),
        ];

        let hierarchy = build_hierarchy(&posts);

        assert_eq!(order(&hierarchy), vec![(1, 0), (6, 1)]);
        assert_eq!(hierarchy.cycles(), &[vec![2, 3, 4]]);
        let excluded: Vec<(u64, ExclusionReason)> = hierarchy
            .excluded()
            .iter()
            .map(|e| (e.post_id, e.reason.clone()))
            .collect();
        let looped = ExclusionReason::ReplyCycle { anchor: 2 };
        assert_eq!(
            excluded,
            vec![
                (2, looped.clone()),
                (3, looped.clone()),
                (4, looped.clone()),
                (5, looped),
                (7, ExclusionReason::DanglingParent { missing_ancestor: 404 }),
            ]
        );

        let err = hierarchy.check_integrity().unwrap_err();
        assert_eq!(err, HierarchyError::ReplyCycle { post_ids: vec![2, 3, 4] });
        assert!(err.to_string().contains("reply cycle"));
    }

    #[test]
    fn test_long_reply_chain_does_not_overflow() {
        let depth = 100_000;
        let posts: Vec<Post> = (1..=depth)
            .map(|id| post(id, (id > 1).then_some(id - 1), "r"))
            .collect();

        let hierarchy = build_hierarchy(&posts);

        assert_eq!(hierarchy.len(), depth as usize);
        assert!(hierarchy
            .nodes()
            .iter()
            .enumerate()
            .all(|(i, node)| node.tier == i));
        let deepest = hierarchy.nodes().last().unwrap();
        assert_eq!(deepest.tier, depth as usize - 1);
        assert_eq!(
            deepest.indented_comment().len(),
            INDENT_UNIT.len() * (depth as usize - 1) + 1
        );
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let posts = vec![post(1, None, "first"), post(1, None, "second")];

        let hierarchy = build_hierarchy(&posts);

        assert_eq!(hierarchy.len(), 1);
        assert_eq!(hierarchy.nodes()[0].post.content(), "first");
    }

    #[test]
    fn test_from_feed_and_display() {
        let feed = Feed::from_posts(vec![post(1, None, "Hi"), post(2, Some(1), "Hello")]);

        let hierarchy = Hierarchy::from(&feed);
        let shown = hierarchy.to_string();

        assert!(shown.starts_with("Reading view with 2 posts in 1 conversations:"));
        assert!(shown.contains("  #2 N/A (N/A)\n  Hello"));
    }
}
