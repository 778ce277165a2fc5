//! Template matching: computing where two same-rooted subtrees diverge.
//!
//! A template is an origin subtree plus the ordered list of cut points at
//! which a query subtree departed from it. Matching positions are steps;
//! diverging positions are cuts, each carrying the substitution payload a
//! reference needs to rebuild the query from the origin.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use crate::tree::{ChildSlot, NodeRef};
use crate::value::FieldValue;

/// Why a cut was taken at a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutReason {
    NodeType,
    FieldNames,
    /// Field value divergence at sorted field index `0` with name `1`.
    Value(usize, &'static str),
    ChildNames,
    ChildArrayLength,
    NullQueryChild,
    NotNullQueryChild,
}

impl fmt::Display for CutReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CutReason::NodeType => write!(f, "node_type"),
            CutReason::FieldNames => write!(f, "field_names"),
            CutReason::Value(i, name) => write!(f, "value:{i}:{name}"),
            CutReason::ChildNames => write!(f, "child_names"),
            CutReason::ChildArrayLength => write!(f, "child_array_length"),
            CutReason::NullQueryChild => write!(f, "null_query_child"),
            CutReason::NotNullQueryChild => write!(f, "notnull_query_child"),
        }
    }
}

/// The payload replacing the origin's content at a cut position.
#[derive(Debug, Clone)]
pub enum Subst {
    /// A single replacement field value. A null query child is carried as
    /// `Value(FieldValue::Null)`.
    Value(FieldValue),
    /// A whole replacement field map (field-name sets differ).
    ValueMap(BTreeMap<&'static str, FieldValue>),
    /// A single replacement child node.
    Node(NodeRef),
    /// A replacement child array.
    NodeArray(Vec<NodeRef>),
}

/// One divergence point: position within the template walk, reason,
/// descriptor involved, and the substitution payload.
#[derive(Debug, Clone)]
pub struct Cut {
    pub num: u32,
    pub reason: CutReason,
    pub descr: &'static str,
    pub subst: Subst,
}

/// An origin subtree with the divergence accounting of one comparison.
#[derive(Debug, Clone)]
pub struct Template {
    pub tree: NodeRef,
    pub step_count: u32,
    pub cut_count: u32,
    pub cuts: Vec<Cut>,
}

impl Template {
    /// Estimated bytes saved by referencing this template.
    pub fn benefit(&self) -> i64 {
        i64::from(self.step_count) - 1
    }

    /// Re-runs the comparison against `query`; the template matches only
    /// when the divergence structure is position-identical, in which case
    /// the fresh cuts (carrying `query`'s substitutions) are returned.
    pub fn matches(&self, query: &NodeRef) -> Option<Vec<Cut>> {
        let probe = compute_template(&self.tree, query);
        let structurally_equal = probe.step_count == self.step_count
            && probe.cut_count == self.cut_count
            && probe.cuts.len() == self.cuts.len()
            && probe
                .cuts
                .iter()
                .zip(&self.cuts)
                .all(|(a, b)| a.num == b.num);
        structurally_equal.then_some(probe.cuts)
    }
}

struct Matcher {
    queue: VecDeque<(NodeRef, NodeRef)>,
    number: u32,
    step_count: u32,
    cut_count: u32,
    cuts: Vec<Cut>,
}

impl Matcher {
    fn step(&mut self) {
        self.step_count += 1;
        self.number += 1;
    }

    fn cut(&mut self, reason: CutReason, descr: &'static str, subst: Subst) {
        self.cuts.push(Cut {
            num: self.number,
            reason,
            descr,
            subst,
        });
        self.cut_count += 1;
        self.number += 1;
    }

    fn match_nodes(&mut self, origin: &NodeRef, query: &NodeRef) {
        if !origin.same_type(query) {
            self.cut(
                CutReason::NodeType,
                query.ty.name,
                Subst::Node(query.clone()),
            );
            return;
        }
        self.step();

        // Field maps are key-sorted, so name-set comparison is direct.
        if !origin.fields.keys().eq(query.fields.keys()) {
            self.cut(
                CutReason::FieldNames,
                query.ty.name,
                Subst::ValueMap(query.fields.clone()),
            );
            return;
        }
        for (i, (&name, origin_value)) in origin.fields.iter().enumerate() {
            let query_value = &query.fields[name];
            if origin_value != query_value {
                // Diverging values do not end the node comparison.
                self.cut(
                    CutReason::Value(i, name),
                    name,
                    Subst::Value(query_value.clone()),
                );
            }
        }

        if !origin.children.keys().eq(query.children.keys()) {
            self.cut(
                CutReason::ChildNames,
                query.ty.name,
                Subst::Node(query.clone()),
            );
            return;
        }
        self.step();

        for (&name, origin_slot) in &origin.children {
            let query_slot = &query.children[name];
            match (origin_slot, query_slot) {
                (ChildSlot::Array(a), ChildSlot::Array(b)) => {
                    if a.len() == b.len() {
                        self.step();
                        for (oc, qc) in a.iter().zip(b) {
                            self.queue.push_back((oc.clone(), qc.clone()));
                        }
                    } else {
                        self.cut(
                            CutReason::ChildArrayLength,
                            name,
                            Subst::NodeArray(b.clone()),
                        );
                    }
                }
                (ChildSlot::Null, ChildSlot::Null) => self.step(),
                (ChildSlot::Null, ChildSlot::Node(qc)) => {
                    self.cut(CutReason::NotNullQueryChild, name, Subst::Node(qc.clone()));
                }
                (ChildSlot::Node(_), ChildSlot::Null) => {
                    self.cut(
                        CutReason::NullQueryChild,
                        name,
                        Subst::Value(FieldValue::Null),
                    );
                }
                (ChildSlot::Node(oc), ChildSlot::Node(qc)) => {
                    self.step();
                    self.queue.push_back((oc.clone(), qc.clone()));
                }
                // Equal types share branch declarations, so slot shapes
                // cannot mix array and non-array.
                _ => unreachable!("child slots of equal node types share shape"),
            }
        }
    }
}

/// Computes the divergence template between `origin` and `query`,
/// breadth-first.
pub fn compute_template(origin: &NodeRef, query: &NodeRef) -> Template {
    let mut matcher = Matcher {
        queue: VecDeque::new(),
        number: 0,
        step_count: 0,
        cut_count: 0,
        cuts: Vec::new(),
    };
    matcher.queue.push_back((origin.clone(), query.clone()));
    while let Some((o, q)) = matcher.queue.pop_front() {
        matcher.match_nodes(&o, &q);
    }
    Template {
        tree: origin.clone(),
        step_count: matcher.step_count,
        cut_count: matcher.cut_count,
        cuts: matcher.cuts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lift::Lifter;
    use crate::schema_std::build_default_schema_registry;
    use serde_json::json;

    fn lift(raw: serde_json::Value) -> NodeRef {
        let registry = build_default_schema_registry();
        Lifter::new(&registry).lift_must(&raw).unwrap()
    }

    fn binary(op: &str) -> serde_json::Value {
        json!({
            "type": "BinaryExpression",
            "operator": op,
            "left": {"type": "Identifier", "name": "a"},
            "right": {"type": "Identifier", "name": "b"},
        })
    }

    #[test]
    fn identical_trees_have_no_cuts() {
        let a = lift(binary("+"));
        let b = lift(binary("+"));
        let template = compute_template(&a, &b);

        assert_eq!(template.cut_count, 0);
        assert!(template.cuts.is_empty());
        assert!(template.step_count >= 1);
        assert_eq!(template.benefit(), i64::from(template.step_count) - 1);
    }

    #[test]
    fn operator_divergence_is_a_single_value_cut() {
        let a = lift(binary("+"));
        let b = lift(binary("-"));
        let template = compute_template(&a, &b);

        assert_eq!(template.cut_count, 1);
        assert_eq!(template.cuts.len(), 1);
        let cut = &template.cuts[0];
        assert_eq!(cut.reason, CutReason::Value(0, "operator"));
        assert!(
            matches!(&cut.subst, Subst::Value(FieldValue::Str(s)) if s == "-")
        );
    }

    #[test]
    fn cuts_arrive_in_strictly_increasing_positions() {
        let a = lift(binary("+"));
        let b = lift(json!({
            "type": "BinaryExpression",
            "operator": "-",
            "left": {"type": "Identifier", "name": "a"},
            "right": {"type": "Literal", "value": 1, "raw": "1"},
        }));
        let template = compute_template(&a, &b);

        assert_eq!(template.cut_count, 2);
        for pair in template.cuts.windows(2) {
            assert!(pair[0].num < pair[1].num);
        }
    }

    #[test]
    fn type_divergence_substitutes_the_query_node() {
        let a = lift(json!({"type": "Identifier", "name": "x"}));
        let b = lift(json!({"type": "ThisExpression"}));
        let template = compute_template(&a, &b);

        assert_eq!(template.step_count, 0);
        assert_eq!(template.cut_count, 1);
        assert_eq!(template.cuts[0].reason, CutReason::NodeType);
        assert!(matches!(&template.cuts[0].subst, Subst::Node(n) if n.type_name() == "ThisExpression"));
    }

    #[test]
    fn array_length_divergence_substitutes_the_whole_array() {
        let a = lift(json!({
            "type": "BlockStatement",
            "body": [{"type": "EmptyStatement"}],
        }));
        let b = lift(json!({
            "type": "BlockStatement",
            "body": [{"type": "EmptyStatement"}, {"type": "EmptyStatement"}],
        }));
        let template = compute_template(&a, &b);

        assert_eq!(template.cut_count, 1);
        assert_eq!(template.cuts[0].reason, CutReason::ChildArrayLength);
        assert!(matches!(&template.cuts[0].subst, Subst::NodeArray(items) if items.len() == 2));
    }

    #[test]
    fn null_against_present_child_cuts_both_ways() {
        let with_arg = lift(json!({
            "type": "ReturnStatement",
            "argument": {"type": "Identifier", "name": "xs"},
        }));
        let without_arg = lift(json!({"type": "ReturnStatement"}));

        let dropped = compute_template(&with_arg, &without_arg);
        assert_eq!(dropped.cuts.len(), 1);
        assert_eq!(dropped.cuts[0].reason, CutReason::NullQueryChild);
        assert!(matches!(
            &dropped.cuts[0].subst,
            Subst::Value(FieldValue::Null)
        ));

        let added = compute_template(&without_arg, &with_arg);
        assert_eq!(added.cuts.len(), 1);
        assert_eq!(added.cuts[0].reason, CutReason::NotNullQueryChild);
        assert!(matches!(&added.cuts[0].subst, Subst::Node(_)));
    }

    #[test]
    fn template_matches_its_own_origin() {
        let a = lift(binary("+"));
        let b = lift(binary("+"));
        let template = compute_template(&a, &b);

        let cuts = template.matches(&template.tree).expect("self match");
        assert!(cuts.is_empty());
    }

    #[test]
    fn template_matches_structurally_identical_divergence() {
        let plus_a = lift(binary("+"));
        let minus = lift(binary("-"));
        let template = compute_template(&plus_a, &minus);

        // Same divergence shape, different substitute value.
        let star = lift(binary("*"));
        let cuts = template.matches(&star).expect("same cut structure");
        assert_eq!(cuts.len(), 1);
        assert!(matches!(&cuts[0].subst, Subst::Value(FieldValue::Str(s)) if s == "*"));

        // A structurally different query does not match.
        let other = lift(json!({
            "type": "BinaryExpression",
            "operator": "+",
            "left": {"type": "Literal", "value": 1, "raw": "1"},
            "right": {"type": "Identifier", "name": "b"},
        }));
        assert!(template.matches(&other).is_none());
    }
}
