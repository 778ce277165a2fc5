//! Lifting raw parser output into typed nodes.
//!
//! The external parser hands over untyped property bags (JSON objects with
//! at least a `type` string). [`lift_must`] promotes them into schema-typed
//! nodes and verifies every raw property against the declared descriptors;
//! [`lift_sloppy`] substitutes the `Unknown` type where no schema matches
//! and skips verification.

use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

use crate::errors::{PackError, PackResult};
use crate::schema::{NodeType, SchemaRegistry};
use crate::tree::{ChildSlot, Node, NodeRef};
use crate::value::FieldValue;

/// Raw properties tolerated on every node besides the declared descriptors.
const INFORMATIONAL_PROPS: [&str; 3] = ["type", "range", "loc"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LiftMode {
    Strict,
    Sloppy,
}

/// Lifts raw nodes against a schema registry.
pub struct Lifter<'a> {
    registry: &'a SchemaRegistry,
}

impl<'a> Lifter<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self { registry }
    }

    /// Strict lift: the raw type must be registered, and every raw property
    /// must verify against the declared descriptors.
    pub fn lift_must(&self, raw: &JsonValue) -> PackResult<NodeRef> {
        self.lift_node(raw, LiftMode::Strict)
    }

    /// Tolerant lift: unregistered types become `Unknown` and no property
    /// verification runs. Declared shapes are still enforced.
    pub fn lift_sloppy(&self, raw: &JsonValue) -> PackResult<NodeRef> {
        self.lift_node(raw, LiftMode::Sloppy)
    }

    fn lift_node(&self, raw: &JsonValue, mode: LiftMode) -> PackResult<NodeRef> {
        let obj = raw.as_object().ok_or_else(|| PackError::UnknownType {
            type_name: format!("<non-object: {}>", raw),
        })?;
        let type_name = obj
            .get("type")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| PackError::UnknownType {
                type_name: "<untyped>".to_string(),
            })?;

        let ty = match self.registry.lookup(type_name) {
            Some(ty) => ty.clone(),
            None if mode == LiftMode::Sloppy => self.registry.unknown().clone(),
            None => {
                return Err(PackError::UnknownType {
                    type_name: type_name.to_string(),
                })
            }
        };

        let mut fields = BTreeMap::new();
        for descr in &ty.fields {
            if descr.deleted {
                continue;
            }
            match obj.get(descr.name) {
                Some(value) => {
                    fields.insert(descr.name, FieldValue::from_json(value));
                }
                None if descr.optional => {}
                None => {
                    return Err(PackError::MissingField {
                        type_name: ty.name,
                        name: descr.name,
                    })
                }
            }
        }

        let mut children = BTreeMap::new();
        for descr in &ty.branches {
            if descr.deleted {
                continue;
            }
            let slot = match obj.get(descr.name) {
                None | Some(JsonValue::Null) => {
                    if !descr.optional {
                        return Err(PackError::MissingBranch {
                            type_name: ty.name,
                            name: descr.name,
                        });
                    }
                    ChildSlot::Null
                }
                Some(JsonValue::Array(items)) => {
                    if !descr.array {
                        return Err(PackError::ArrayShapeMismatch {
                            type_name: ty.name,
                            name: descr.name,
                        });
                    }
                    let mut lifted = Vec::with_capacity(items.len());
                    for item in items {
                        // An absent element inside a child array is fatal.
                        if !item.is_object() {
                            return Err(PackError::ArrayShapeMismatch {
                                type_name: ty.name,
                                name: descr.name,
                            });
                        }
                        lifted.push(self.lift_node(item, mode)?);
                    }
                    ChildSlot::Array(lifted)
                }
                Some(child @ JsonValue::Object(_)) => {
                    if descr.array {
                        return Err(PackError::ArrayShapeMismatch {
                            type_name: ty.name,
                            name: descr.name,
                        });
                    }
                    ChildSlot::Node(self.lift_node(child, mode)?)
                }
                Some(_) => {
                    return Err(PackError::ArrayShapeMismatch {
                        type_name: ty.name,
                        name: descr.name,
                    })
                }
            };
            children.insert(descr.name, slot);
        }

        if mode == LiftMode::Strict && ty.name != crate::schema::UNKNOWN_TYPE_NAME {
            verify(&ty, obj)?;
        }

        Ok(Node::new(ty, fields, children))
    }
}

/// Rejects raw properties that are neither informational nor declared, and
/// field values whose array shape disagrees with the descriptor.
fn verify(ty: &NodeType, obj: &serde_json::Map<String, JsonValue>) -> PackResult<()> {
    for (name, value) in obj {
        if INFORMATIONAL_PROPS.contains(&name.as_str()) {
            continue;
        }
        if let Some(descr) = ty.field(name) {
            if !descr.deleted && value.is_array() != descr.array {
                return Err(PackError::ArrayShapeMismatch {
                    type_name: ty.name,
                    name: descr.name,
                });
            }
            continue;
        }
        if ty.branch(name).is_some() {
            continue;
        }
        return Err(PackError::UnknownProperty {
            type_name: ty.name,
            name: name.clone(),
        });
    }
    Ok(())
}

/// Assigns pre-order numbers starting at 0 and depths matching the parent
/// chain. Children are visited in declared branch order, array branches in
/// index order.
pub fn depth_first_number(root: &NodeRef) {
    fn visit(node: &NodeRef, depth: u32, counter: &mut u32) {
        node.attrs.set(*counter, depth);
        *counter += 1;
        for descr in &node.ty.branches {
            match node.children.get(descr.name) {
                Some(ChildSlot::Node(child)) => visit(child, depth + 1, counter),
                Some(ChildSlot::Array(items)) => {
                    for child in items {
                        visit(child, depth + 1, counter);
                    }
                }
                Some(ChildSlot::Null) | None => {}
            }
        }
    }

    let mut counter = 0;
    visit(root, 0, &mut counter);
}
