//! In-order tree traversal with visitor callbacks.
//!
//! The walker numbers nodes with its own monotone counter (distinct from the
//! pre-order numbering in [`crate::lift::depth_first_number`]) and lets the
//! `begin` callback prune a subtree or reroute the descent through an
//! explicit child list. Rerouting is how the compression driver descends
//! into reference substitutions instead of the natural children.

use crate::errors::PackResult;
use crate::tree::{ChildSlot, NodeRef};

/// Traversal metadata handed to every callback.
#[derive(Debug, Clone)]
pub struct WalkAttrs {
    /// Walker-local monotone visit number.
    pub number: u32,
    /// Depth below the walk root; the root is 0.
    pub depth: u32,
    /// Edge name; the root is `<root>`, array children carry their index.
    pub name: String,
}

/// What to do with a node's subtree after `begin`.
pub enum Descend {
    /// Visit the node's natural children in declared branch order.
    Children,
    /// Skip the subtree entirely; `end` is not emitted.
    Prune,
    /// Visit exactly these child slots instead of the natural children.
    Reroute(Vec<(String, ChildSlot)>),
}

#[allow(unused_variables)]
pub trait Visitor {
    fn begin(&mut self, node: &NodeRef, attrs: &WalkAttrs) -> PackResult<Descend> {
        Ok(Descend::Children)
    }

    fn end(&mut self, node: &NodeRef, attrs: &WalkAttrs) -> PackResult<()> {
        Ok(())
    }

    fn empty_array(&mut self, name: &str, parent: &WalkAttrs) -> PackResult<()> {
        Ok(())
    }
}

/// Walks `root`, emitting `begin`/`end` per node and `empty_array` per empty
/// array branch.
pub fn walk<V: Visitor>(root: &NodeRef, visitor: &mut V) -> PackResult<()> {
    let mut counter = 0;
    walk_node(root, "<root>".to_string(), 0, &mut counter, visitor)
}

fn walk_node<V: Visitor>(
    node: &NodeRef,
    name: String,
    depth: u32,
    counter: &mut u32,
    visitor: &mut V,
) -> PackResult<()> {
    let attrs = WalkAttrs {
        number: *counter,
        depth,
        name,
    };
    *counter += 1;

    let slots: Vec<(String, ChildSlot)> = match visitor.begin(node, &attrs)? {
        Descend::Prune => return Ok(()),
        Descend::Children => natural_children(node),
        Descend::Reroute(overrides) => overrides,
    };

    for (slot_name, slot) in slots {
        match slot {
            ChildSlot::Null => {}
            ChildSlot::Node(child) => {
                walk_node(&child, slot_name, depth + 1, counter, visitor)?;
            }
            ChildSlot::Array(items) => {
                if items.is_empty() {
                    visitor.empty_array(&slot_name, &attrs)?;
                    continue;
                }
                for (i, child) in items.iter().enumerate() {
                    walk_node(
                        child,
                        format!("{slot_name}[{i}]"),
                        depth + 1,
                        counter,
                        visitor,
                    )?;
                }
            }
        }
    }

    visitor.end(node, &attrs)
}

fn natural_children(node: &NodeRef) -> Vec<(String, ChildSlot)> {
    node.ty
        .branches
        .iter()
        .filter_map(|descr| {
            node.children
                .get(descr.name)
                .map(|slot| (descr.name.to_string(), slot.clone()))
        })
        .collect()
}
