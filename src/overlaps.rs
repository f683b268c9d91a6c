//! Overlap resolution and display grouping of prefix records.
use crate::{Category, PrefixInfo};
use itertools::Itertools;
use serde::Serialize;
use std::cmp::Ordering;

/// Return the prefix with the shortest mask among `candidates`.
///
/// Ties on mask length go to the first candidate in input order. Returns `None` for an empty
/// input.
///
/// # Examples
/// ```
/// use irr_explorer::find_least_specific_prefix;
/// assert_eq!(find_least_specific_prefix(&[]), None);
/// ```
pub fn find_least_specific_prefix(candidates: &[PrefixInfo]) -> Option<String> {
    candidates
        .iter()
        .min_by_key(|info| info.prefix_len())
        .map(|info| info.prefix.to_string())
}

/// Severity rank of a category, higher is more severe.
pub fn severity(category: Category) -> u8 {
    match category {
        Category::Success => 0,
        Category::Info => 1,
        Category::Warning => 2,
        Category::Danger => 3,
        Category::Error => 4,
    }
}

/// Display order of prefix records:
/// 1. shorter mask before longer mask
/// 2. more severe category before less severe on the same mask length
/// 3. then ascending prefix sort key
fn display_order(a: &PrefixInfo, b: &PrefixInfo) -> Ordering {
    a.prefix_len()
        .cmp(&b.prefix_len())
        .then(severity(b.category_overall).cmp(&severity(a.category_overall)))
        .then(a.prefix_sort_key.cmp(&b.prefix_sort_key))
}

/// One record in a display tree, with the records it covers nested below it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelNode {
    pub info: PrefixInfo,
    pub children: Vec<PanelNode>,
}

impl PanelNode {
    /// Number of records in this subtree, this node included.
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(PanelNode::len).sum::<usize>()
    }

    fn collect_depth_first<'a>(&'a self, depth: usize, out: &mut Vec<(usize, &'a PrefixInfo)>) {
        out.push((depth, &self.info));
        for child in &self.children {
            child.collect_depth_first(depth + 1, out);
        }
    }
}

/// A cluster of records rooted at a record no other record contains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelGroup {
    pub root: PanelNode,
}

impl PanelGroup {
    pub fn len(&self) -> usize {
        self.root.len()
    }

    /// Records of the cluster in depth-first order, paired with their nesting depth.
    pub fn flatten(&self) -> Vec<(usize, &PrefixInfo)> {
        let mut out = vec![];
        self.root.collect_depth_first(0, &mut out);
        out
    }
}

fn build_node(
    idx: usize,
    slots: &mut [Option<PrefixInfo>],
    children: &[Vec<usize>],
) -> Option<PanelNode> {
    let info = slots[idx].take()?;
    let nested = children[idx]
        .iter()
        .filter_map(|&child| build_node(child, slots, children))
        .collect();
    Some(PanelNode {
        info,
        children: nested,
    })
}

/// Sort records for display and group them into containment trees.
///
/// Each record is nested under the most specific previously placed record whose network contains
/// it. Records without such a predecessor start a new group. Groups come out ordered by their
/// root, and children within a group keep the sort order.
pub fn sort_and_group_panels(records: Vec<PrefixInfo>) -> Vec<PanelGroup> {
    let sorted: Vec<PrefixInfo> = records.into_iter().sorted_by(display_order).collect();

    let mut roots = vec![];
    let mut children: Vec<Vec<usize>> = vec![vec![]; sorted.len()];
    for (idx, info) in sorted.iter().enumerate() {
        // equal networks nest under the latest placed one
        let parent = sorted[..idx]
            .iter()
            .enumerate()
            .filter(|(_, placed)| placed.prefix.contains(&info.prefix))
            .max_by_key(|(j, placed)| (placed.prefix_len(), *j))
            .map(|(j, _)| j);
        match parent {
            Some(p) => children[p].push(idx),
            None => roots.push(idx),
        }
    }

    let mut slots: Vec<Option<PrefixInfo>> = sorted.into_iter().map(Some).collect();
    roots
        .into_iter()
        .filter_map(|root| build_node(root, &mut slots, &children))
        .map(|root| PanelGroup { root })
        .collect()
}
