//! Node-type descriptors and the schema registry.
//!
//! Every lifted node is typed against a registered [`NodeType`]: an ordered
//! list of field descriptors (scalar attributes) and branch descriptors
//! (child or child-array relations). Wire codes are assigned in registration
//! order starting at [`FIRST_NODE_TYPE_CODE`]; the codes below that are
//! reserved for the reference forms of the byte stream.

use std::collections::HashMap;
use std::rc::Rc;

/// Wire code of a subtree back-reference.
pub const SUBTREE_REF_CODE: u32 = 0;
/// Wire code of a template back-reference.
pub const TEMPLATE_REF_CODE: u32 = 1;
/// Wire code of a raw single-character identifier.
pub const RAW_IDENT_TYPE_CODE: u32 = 2;
/// First code available to registered node types.
pub const FIRST_NODE_TYPE_CODE: u32 = 3;

/// The sloppy fallback type name.
pub const UNKNOWN_TYPE_NAME: &str = "Unknown";

/// Describes one scalar attribute of a node type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescr {
    pub name: &'static str,
    pub array: bool,
    pub optional: bool,
    /// Deleted descriptors are stripped from raw input and never emitted.
    pub deleted: bool,
}

/// Describes one child (or child-array) relation of a node type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BranchDescr {
    pub name: &'static str,
    pub array: bool,
    pub optional: bool,
    pub deleted: bool,
}

/// Declares a required scalar field.
pub const fn field(name: &'static str) -> FieldDescr {
    FieldDescr {
        name,
        array: false,
        optional: false,
        deleted: false,
    }
}

/// Declares a required single-child branch.
pub const fn branch(name: &'static str) -> BranchDescr {
    BranchDescr {
        name,
        array: false,
        optional: false,
        deleted: false,
    }
}

impl FieldDescr {
    pub const fn array(mut self) -> Self {
        self.array = true;
        self
    }

    pub const fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub const fn deleted(mut self) -> Self {
        self.deleted = true;
        self
    }
}

impl BranchDescr {
    pub const fn array(mut self) -> Self {
        self.array = true;
        self
    }

    pub const fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub const fn deleted(mut self) -> Self {
        self.deleted = true;
        self
    }
}

/// A registered node type: name, short display alias, and the ordered
/// descriptor lists that drive lifting and direct encoding.
#[derive(Debug)]
pub struct NodeType {
    /// Wire code, unique per registry, `>= FIRST_NODE_TYPE_CODE`.
    pub code: u32,
    pub name: &'static str,
    pub alias: &'static str,
    pub fields: Vec<FieldDescr>,
    pub branches: Vec<BranchDescr>,
}

impl NodeType {
    /// Looks up a field descriptor by name.
    pub fn field(&self, name: &str) -> Option<&FieldDescr> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Looks up a branch descriptor by name.
    pub fn branch(&self, name: &str) -> Option<&BranchDescr> {
        self.branches.iter().find(|b| b.name == name)
    }
}

impl PartialEq for NodeType {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
    }
}

impl Eq for NodeType {}

/// Ordered collection of node types with name lookup.
///
/// Use [`crate::schema_std::build_default_schema_registry`] for the built-in
/// ECMAScript table.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    types: Vec<Rc<NodeType>>,
    by_name: HashMap<&'static str, usize>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a node type, assigning the next wire code.
    ///
    /// Registration order is wire-stable: re-ordering entries changes every
    /// emitted stream.
    pub fn register(
        &mut self,
        name: &'static str,
        alias: &'static str,
        fields: &[FieldDescr],
        branches: &[BranchDescr],
    ) -> Rc<NodeType> {
        assert!(
            !self.by_name.contains_key(name),
            "node type '{name}' registered twice"
        );
        let ty = Rc::new(NodeType {
            code: FIRST_NODE_TYPE_CODE + self.types.len() as u32,
            name,
            alias,
            fields: fields.to_vec(),
            branches: branches.to_vec(),
        });
        self.by_name.insert(name, self.types.len());
        self.types.push(Rc::clone(&ty));
        ty
    }

    /// Looks up a node type by name.
    pub fn lookup(&self, name: &str) -> Option<&Rc<NodeType>> {
        self.by_name.get(name).map(|&i| &self.types[i])
    }

    /// Returns the sloppy fallback type.
    ///
    /// Every usable registry registers `Unknown`; a registry without it is a
    /// construction bug.
    pub fn unknown(&self) -> &Rc<NodeType> {
        self.lookup(UNKNOWN_TYPE_NAME)
            .expect("registry must register the Unknown fallback type")
    }

    /// All registered types in registration (wire-code) order.
    pub fn types(&self) -> &[Rc<NodeType>] {
        &self.types
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
