//! Lifting raw parser output: schema validation, the sloppy fallback, and
//! the pre-order numbering invariants.

use astpack::lift::{depth_first_number, Lifter};
use astpack::schema_std::build_default_schema_registry;
use astpack::tree::{ChildSlot, NodeRef};
use astpack::walk::{walk, Descend, Visitor, WalkAttrs};
use astpack::{PackError, PackResult};
use serde_json::json;

fn registry() -> astpack::schema::SchemaRegistry {
    build_default_schema_registry()
}

#[test]
fn strict_lift_of_a_small_program() {
    let registry = registry();
    let root = Lifter::new(&registry)
        .lift_must(&json!({
            "type": "Program",
            "sourceType": "script",
            "body": [
                {
                    "type": "VariableDeclaration",
                    "kind": "let",
                    "declarations": [{
                        "type": "VariableDeclarator",
                        "id": {"type": "Identifier", "name": "x"},
                        "init": {"type": "Literal", "value": 1, "raw": "1"},
                    }],
                },
            ],
        }))
        .unwrap();

    assert_eq!(root.type_name(), "Program");
    let Some(ChildSlot::Array(body)) = root.child("body") else {
        panic!("body should be a child array");
    };
    assert_eq!(body.len(), 1);
    assert_eq!(body[0].type_name(), "VariableDeclaration");
    assert_eq!(
        body[0].field("kind").and_then(|v| v.as_str()),
        Some("let")
    );
}

#[test]
fn unknown_type_is_fatal_under_strict_lift() {
    let registry = registry();
    let err = Lifter::new(&registry)
        .lift_must(&json!({"type": "ImportDeclaration"}))
        .unwrap_err();
    assert!(matches!(err, PackError::UnknownType { type_name } if type_name == "ImportDeclaration"));
}

#[test]
fn sloppy_lift_substitutes_the_unknown_type() {
    let registry = registry();
    let root = Lifter::new(&registry)
        .lift_sloppy(&json!({"type": "ImportDeclaration", "anything": 1}))
        .unwrap();
    assert_eq!(root.type_name(), "Unknown");
    assert!(root.fields.is_empty());
    assert!(root.children.is_empty());
}

#[test]
fn missing_required_field_is_fatal() {
    let registry = registry();
    let err = Lifter::new(&registry)
        .lift_must(&json!({"type": "Identifier"}))
        .unwrap_err();
    assert!(matches!(
        err,
        PackError::MissingField { type_name: "Identifier", name: "name" }
    ));
}

#[test]
fn missing_required_branch_is_fatal() {
    let registry = registry();
    let err = Lifter::new(&registry)
        .lift_must(&json!({"type": "ThrowStatement"}))
        .unwrap_err();
    assert!(matches!(
        err,
        PackError::MissingBranch { type_name: "ThrowStatement", name: "argument" }
    ));
}

#[test]
fn absent_optional_branch_lifts_to_null() {
    let registry = registry();
    let root = Lifter::new(&registry)
        .lift_must(&json!({"type": "ReturnStatement"}))
        .unwrap();
    assert!(matches!(root.child("argument"), Some(ChildSlot::Null)));
}

#[test]
fn undeclared_property_is_rejected() {
    let registry = registry();
    let err = Lifter::new(&registry)
        .lift_must(&json!({"type": "Identifier", "name": "x", "sparkle": true}))
        .unwrap_err();
    assert!(matches!(
        err,
        PackError::UnknownProperty { type_name: "Identifier", name } if name == "sparkle"
    ));
}

#[test]
fn range_and_loc_are_tolerated() {
    let registry = registry();
    let root = Lifter::new(&registry)
        .lift_must(&json!({
            "type": "Identifier",
            "name": "x",
            "range": [0, 1],
            "loc": {"start": {"line": 1, "column": 0}, "end": {"line": 1, "column": 1}},
        }))
        .unwrap();
    assert_eq!(root.field("name").and_then(|v| v.as_str()), Some("x"));
}

#[test]
fn array_shape_disagreements_are_fatal() {
    let registry = registry();
    let lifter = Lifter::new(&registry);

    let err = lifter
        .lift_must(&json!({
            "type": "BlockStatement",
            "body": {"type": "EmptyStatement"},
        }))
        .unwrap_err();
    assert!(matches!(err, PackError::ArrayShapeMismatch { .. }));

    let err = lifter
        .lift_must(&json!({
            "type": "ThrowStatement",
            "argument": [{"type": "Identifier", "name": "e"}],
        }))
        .unwrap_err();
    assert!(matches!(err, PackError::ArrayShapeMismatch { .. }));
}

#[test]
fn absent_array_element_is_fatal() {
    let registry = registry();
    let err = Lifter::new(&registry)
        .lift_must(&json!({
            "type": "BlockStatement",
            "body": [null],
        }))
        .unwrap_err();
    assert!(matches!(
        err,
        PackError::ArrayShapeMismatch { type_name: "BlockStatement", name: "body" }
    ));
}

#[test]
fn deleted_descriptors_are_stripped() {
    let registry = registry();
    let root = Lifter::new(&registry)
        .lift_must(&json!({
            "type": "Literal",
            "value": "ok",
            "raw": "\"ok\"",
            "regex": {"pattern": "x", "flags": ""},
        }))
        .unwrap();
    assert!(root.field("value").is_some());
    assert!(root.field("raw").is_none());
    assert!(root.field("regex").is_none());
}

// ============================================================================
// Numbering invariants
// ============================================================================

#[derive(Default)]
struct NodeCollector {
    nodes: Vec<NodeRef>,
}

impl Visitor for NodeCollector {
    fn begin(&mut self, node: &NodeRef, _attrs: &WalkAttrs) -> PackResult<Descend> {
        self.nodes.push(node.clone());
        Ok(Descend::Children)
    }
}

fn parent_chain_len(node: &NodeRef) -> u32 {
    let mut len = 0;
    let mut current = node.clone();
    while let Some(parent) = current.parent() {
        len += 1;
        current = parent;
    }
    len
}

#[test]
fn numbering_is_a_preorder_bijection_and_depth_matches_parents() {
    let registry = registry();
    let root = Lifter::new(&registry)
        .lift_must(&json!({
            "type": "Program",
            "sourceType": "script",
            "body": [
                {
                    "type": "IfStatement",
                    "test": {"type": "Identifier", "name": "flag"},
                    "consequent": {
                        "type": "BlockStatement",
                        "body": [{
                            "type": "ReturnStatement",
                            "argument": {"type": "Literal", "value": 1, "raw": "1"},
                        }],
                    },
                },
                {"type": "EmptyStatement"},
            ],
        }))
        .unwrap();
    depth_first_number(&root);

    let mut collector = NodeCollector::default();
    walk(&root, &mut collector).unwrap();
    let nodes = collector.nodes;

    // Pre-order walk sees exactly the numbers 0..N in order.
    let numbers: Vec<u32> = nodes.iter().map(|n| n.attrs.number()).collect();
    let expected: Vec<u32> = (0..nodes.len() as u32).collect();
    assert_eq!(numbers, expected);

    for node in &nodes {
        assert_eq!(node.attrs.depth(), parent_chain_len(node));
    }
    assert_eq!(root.attrs.depth(), 0);
}
