//! Depth-indexed history of emitted subtrees and templates.
//!
//! Each depth keeps two bounded rings: recently emitted subtrees and the
//! templates derived from them. `search` probes nearby depths for the
//! back-reference with the largest net byte savings; the driver then emits a
//! reference plus the cut substitutions instead of the full subtree.

use crate::template::{compute_template, Template};
use crate::tree::NodeRef;

/// Ring capacity per depth.
pub const WIDTH: usize = 64;
/// Depth reach of the template search; the tree search reaches one less.
pub const DEPTH_RANGE: i64 = 2;

/// Largest cut position a subtree reference can carry: one byte per cut,
/// terminated by `0xFF`.
const MAX_WIRE_CUT_NUM: u32 = 0xFE;

const TEMPLATE_DELTAS: [i64; 5] = [0, -1, 1, -2, 2];
const TREE_DELTAS: [i64; 3] = [0, -1, 1];

/// Bounded FIFO; pushing at capacity drops the oldest entry.
#[derive(Debug)]
pub struct RingBuffer<T> {
    items: std::collections::VecDeque<T>,
}

impl<T> Default for RingBuffer<T> {
    fn default() -> Self {
        Self {
            items: std::collections::VecDeque::with_capacity(WIDTH),
        }
    }
}

impl<T> RingBuffer<T> {
    pub fn push(&mut self, item: T) {
        if self.items.len() == WIDTH {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    /// Iterates newest first, yielding each entry with its reverse index
    /// (0 = most recently pushed).
    pub fn iter_newest_first(&self) -> impl Iterator<Item = (u8, &T)> {
        self.items
            .iter()
            .rev()
            .enumerate()
            .map(|(i, item)| (i as u8, item))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Default)]
struct DepthEntry {
    trees: RingBuffer<NodeRef>,
    templates: RingBuffer<Template>,
}

/// How a cache candidate will be emitted.
#[derive(Debug)]
pub enum MatchKind {
    /// Reference to a prior subtree; carries the freshly computed template
    /// so the driver can push it when the node ends.
    Tree { template: Template },
    /// Reference to a prior template.
    Template,
}

/// The best back-reference found for a query subtree.
#[derive(Debug)]
pub struct CacheMatch {
    pub kind: MatchKind,
    /// Depth offset of the referenced ring relative to the query depth.
    pub delta: i64,
    /// Reverse index within that ring (0 = newest).
    pub reverse_index: u8,
    /// Estimated bytes saved.
    pub benefit: i64,
    /// Substitutions to emit after the reference, in cut order.
    pub cuts: Vec<crate::template::Cut>,
}

#[derive(Debug, Default)]
pub struct DepthCache {
    entries: Vec<DepthEntry>,
}

impl DepthCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Finds the highest-benefit back-reference for `query` at `depth`, or
    /// none when no candidate beats direct encoding. Ties between the two
    /// sub-searches go to the template match.
    pub fn search(&self, depth: u32, query: &NodeRef) -> Option<CacheMatch> {
        let template_match = self.template_search(depth, query);
        let tree_match = self.tree_search(depth, query);
        match (template_match, tree_match) {
            (Some(t), Some(s)) if s.benefit > t.benefit => Some(s),
            (Some(t), _) => Some(t),
            (None, s) => s,
        }
    }

    fn template_search(&self, depth: u32, query: &NodeRef) -> Option<CacheMatch> {
        let mut best: Option<CacheMatch> = None;
        for delta in TEMPLATE_DELTAS {
            let Some(entry) = self.probe(depth, delta) else {
                continue;
            };
            for (reverse_index, template) in entry.templates.iter_newest_first() {
                let benefit = template.benefit();
                if benefit <= 0 || !beats(&best, benefit) {
                    continue;
                }
                if let Some(cuts) = template.matches(query) {
                    best = Some(CacheMatch {
                        kind: MatchKind::Template,
                        delta,
                        reverse_index,
                        benefit,
                        cuts,
                    });
                }
            }
        }
        best
    }

    fn tree_search(&self, depth: u32, query: &NodeRef) -> Option<CacheMatch> {
        let mut best: Option<CacheMatch> = None;
        for delta in TREE_DELTAS {
            let Some(entry) = self.probe(depth, delta) else {
                continue;
            };
            for (reverse_index, prior) in entry.trees.iter_newest_first() {
                if !prior.same_type(query) {
                    continue;
                }
                let template = compute_template(prior, query);
                // One byte for the reference, one per cut on the wire.
                let benefit =
                    i64::from(template.step_count) - i64::from(template.cut_count) - 1;
                if benefit <= 0 || !beats(&best, benefit) {
                    continue;
                }
                if template.cuts.iter().any(|c| c.num > MAX_WIRE_CUT_NUM) {
                    continue;
                }
                let cuts = template.cuts.clone();
                best = Some(CacheMatch {
                    kind: MatchKind::Tree { template },
                    delta,
                    reverse_index,
                    benefit,
                    cuts,
                });
            }
        }
        best
    }

    fn probe(&self, depth: u32, delta: i64) -> Option<&DepthEntry> {
        let probed = i64::from(depth) + delta;
        if probed < 0 || probed >= self.entries.len() as i64 {
            return None;
        }
        Some(&self.entries[probed as usize])
    }

    pub fn push_tree(&mut self, depth: u32, node: NodeRef) {
        self.entry_mut(depth).trees.push(node);
    }

    pub fn push_template(&mut self, depth: u32, template: Template) {
        self.entry_mut(depth).templates.push(template);
    }

    fn entry_mut(&mut self, depth: u32) -> &mut DepthEntry {
        let depth = depth as usize;
        if depth >= self.entries.len() {
            self.entries.resize_with(depth + 1, DepthEntry::default);
        }
        &mut self.entries[depth]
    }
}

/// True when `benefit` improves on the best candidate so far. Equal benefit
/// keeps the earlier find (nearer depth, newer entry).
fn beats(best: &Option<CacheMatch>, benefit: i64) -> bool {
    best.as_ref().map_or(true, |b| benefit > b.benefit)
}
