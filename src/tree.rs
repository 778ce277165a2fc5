//! The lifted tree model.
//!
//! Children are owned by their parent through shared handles; the parent
//! edge is a non-owning back-reference written exactly once, when the parent
//! is constructed. Walk attributes (`number`, `depth`) are assigned after
//! construction by [`crate::lift::depth_first_number`], so they live in
//! interior-mutable cells.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use crate::schema::NodeType;
use crate::value::FieldValue;

/// Shared handle to a lifted node. Compression runs are single-threaded per
/// document, so plain reference counting suffices.
pub type NodeRef = Rc<Node>;

/// One child relation of a node: a single child, an explicit null (optional
/// branches only), or an ordered child array.
#[derive(Debug, Clone)]
pub enum ChildSlot {
    Null,
    Node(NodeRef),
    Array(Vec<NodeRef>),
}

impl ChildSlot {
    pub fn is_null(&self) -> bool {
        matches!(self, ChildSlot::Null)
    }
}

/// Non-owning back-reference from a child to its parent.
#[derive(Debug, Clone)]
pub struct ParentEdge {
    pub parent: Weak<Node>,
    /// Declared branch name this child hangs off.
    pub branch: &'static str,
    /// Display name; array children carry their index, e.g. `body[2]`.
    pub display: String,
}

const UNNUMBERED: u32 = u32::MAX;

/// Walk-assigned metadata: pre-order number and depth below the root.
#[derive(Debug)]
pub struct Attrs {
    number: Cell<u32>,
    depth: Cell<u32>,
}

impl Default for Attrs {
    fn default() -> Self {
        Self {
            number: Cell::new(UNNUMBERED),
            depth: Cell::new(0),
        }
    }
}

impl Attrs {
    pub fn number(&self) -> u32 {
        self.number.get()
    }

    pub fn depth(&self) -> u32 {
        self.depth.get()
    }

    pub fn is_numbered(&self) -> bool {
        self.number.get() != UNNUMBERED
    }

    pub fn set(&self, number: u32, depth: u32) {
        self.number.set(number);
        self.depth.set(depth);
    }
}

/// A typed, schema-validated node.
#[derive(Debug)]
pub struct Node {
    pub ty: Rc<NodeType>,
    /// Non-deleted field name -> value. Key-sorted, which is the iteration
    /// order the template matcher requires.
    pub fields: BTreeMap<&'static str, FieldValue>,
    /// Non-deleted branch name -> child slot.
    pub children: BTreeMap<&'static str, ChildSlot>,
    parent: RefCell<Option<ParentEdge>>,
    pub attrs: Attrs,
}

impl Node {
    /// Constructs a node and wires each child's parent edge.
    pub fn new(
        ty: Rc<NodeType>,
        fields: BTreeMap<&'static str, FieldValue>,
        children: BTreeMap<&'static str, ChildSlot>,
    ) -> NodeRef {
        let node = Rc::new(Node {
            ty,
            fields,
            children,
            parent: RefCell::new(None),
            attrs: Attrs::default(),
        });
        for (name, slot) in &node.children {
            match slot {
                ChildSlot::Null => {}
                ChildSlot::Node(child) => {
                    child.set_parent(ParentEdge {
                        parent: Rc::downgrade(&node),
                        branch: name,
                        display: (*name).to_string(),
                    });
                }
                ChildSlot::Array(items) => {
                    for (i, child) in items.iter().enumerate() {
                        child.set_parent(ParentEdge {
                            parent: Rc::downgrade(&node),
                            branch: name,
                            display: format!("{name}[{i}]"),
                        });
                    }
                }
            }
        }
        node
    }

    fn set_parent(&self, edge: ParentEdge) {
        let mut slot = self.parent.borrow_mut();
        debug_assert!(slot.is_none(), "parent edge written twice");
        *slot = Some(edge);
    }

    /// Upgrades the parent edge, if the parent is still alive.
    pub fn parent(&self) -> Option<NodeRef> {
        self.parent
            .borrow()
            .as_ref()
            .and_then(|edge| edge.parent.upgrade())
    }

    /// The display name of the edge to the parent, or `<root>`.
    pub fn display_name(&self) -> String {
        match self.parent.borrow().as_ref() {
            Some(edge) => edge.display.clone(),
            None => "<root>".to_string(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.ty.name
    }

    pub fn child(&self, name: &str) -> Option<&ChildSlot> {
        self.children.get(name)
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// True when both nodes carry the same registered type.
    pub fn same_type(&self, other: &Node) -> bool {
        self.ty.code == other.ty.code
    }
}
