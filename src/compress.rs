//! The compression driver.
//!
//! Two passes over the lifted tree. The first collects string frequencies so
//! the table can hand the cheapest ids to the most common strings. The
//! second walks the tree in serialization order: each subtree either finds a
//! profitable back-reference in the depth cache (emitting a reference plus
//! cut substitutions, then rerouting the walker into the substitute
//! subtrees) or is emitted directly. Every finished subtree is pushed onto
//! the cache at its depth, so references always point at older, already
//! emitted material.

use crate::cache::{CacheMatch, DepthCache, MatchKind};
use crate::encode::{ByteWriter, NULL_TAG, SHORT_ARR_TAG};
use crate::errors::PackResult;
use crate::strings::StringTable;
use crate::template::{Subst, Template};
use crate::tree::{ChildSlot, NodeRef};
use crate::value::FieldValue;
use crate::walk::{walk, Descend, Visitor, WalkAttrs};

/// Emission counters reported alongside the byte stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct CompressStats {
    pub nodes: u32,
    pub direct: u32,
    pub subtree_refs: u32,
    pub template_refs: u32,
}

// ============================================================================
// Pass 1 - string collection
// ============================================================================

struct CollectVisitor<'a> {
    table: &'a mut StringTable,
}

impl Visitor for CollectVisitor<'_> {
    fn begin(&mut self, node: &NodeRef, _attrs: &WalkAttrs) -> PackResult<Descend> {
        let is_identifier = node.ty.name == "Identifier";
        for descr in &node.ty.fields {
            let Some(value) = node.field(descr.name) else {
                continue;
            };
            match value {
                // Identifier names may be inlined by the encoder; the table
                // only wants the ones that cannot be.
                FieldValue::Str(s) if is_identifier && descr.name == "name" => {
                    self.table.add_identifier(s);
                }
                other => self.table.add_value_recursive(other),
            }
        }
        Ok(Descend::Children)
    }
}

/// First pass: record the frequency of every string the encoder will need.
pub fn collect_strings(root: &NodeRef, table: &mut StringTable) -> PackResult<()> {
    let mut collector = CollectVisitor { table };
    walk(root, &mut collector)
}

// ============================================================================
// Pass 2 - compression
// ============================================================================

struct CompressVisitor<'a> {
    table: &'a StringTable,
    writer: ByteWriter,
    cache: DepthCache,
    /// One entry per open node: the freshly computed template of a tree
    /// match, pushed onto the cache when the node ends.
    pending: Vec<Option<Template>>,
    stats: CompressStats,
}

impl<'a> CompressVisitor<'a> {
    fn new(table: &'a StringTable, writer: ByteWriter) -> Self {
        Self {
            table,
            writer,
            cache: DepthCache::new(),
            pending: Vec::new(),
            stats: CompressStats::default(),
        }
    }

    fn emit_reference(&mut self, found: CacheMatch) -> PackResult<Descend> {
        let CacheMatch {
            kind,
            delta,
            reverse_index,
            cuts,
            ..
        } = found;

        let pending = match kind {
            MatchKind::Template => {
                self.stats.template_refs += 1;
                self.writer.write_template_ref(delta, reverse_index)?;
                None
            }
            MatchKind::Tree { template } => {
                self.stats.subtree_refs += 1;
                let cut_nums: Vec<u32> = cuts.iter().map(|c| c.num).collect();
                self.writer
                    .write_subtree_ref(delta, reverse_index, &cut_nums)?;
                Some(template)
            }
        };

        // Scalar substitutions ride directly behind the reference; subtree
        // substitutions are walked in place of the natural children.
        let mut overrides = Vec::new();
        for cut in &cuts {
            match &cut.subst {
                Subst::Value(value) => self.writer.write_value(value, self.table)?,
                Subst::ValueMap(fields) => {
                    self.writer.write_var_uint(fields.len() as u64)?;
                    for (name, value) in fields {
                        self.writer.write_var_uint(name.len() as u64)?;
                        self.writer.write_bytes(name.as_bytes());
                        self.writer.write_value(value, self.table)?;
                    }
                }
                Subst::Node(child) => {
                    overrides.push((cut.descr.to_string(), ChildSlot::Node(child.clone())));
                }
                Subst::NodeArray(items) => {
                    self.writer.write_array_header(items.len())?;
                    if !items.is_empty() {
                        overrides.push((cut.descr.to_string(), ChildSlot::Array(items.clone())));
                    }
                }
            }
        }

        self.pending.push(pending);
        Ok(Descend::Reroute(overrides))
    }

    fn emit_direct(&mut self, node: &NodeRef) -> PackResult<Descend> {
        self.stats.direct += 1;
        self.writer.write_direct_node(node, self.table)?;
        // Frame the child structure: non-empty arrays announce their length
        // up front, null optional branches hold their place with a null.
        for descr in &node.ty.branches {
            match node.children.get(descr.name) {
                Some(ChildSlot::Array(items)) if !items.is_empty() => {
                    self.writer.write_array_header(items.len())?;
                }
                Some(ChildSlot::Null) => self.writer.write_u8(NULL_TAG),
                _ => {}
            }
        }
        self.pending.push(None);
        Ok(Descend::Children)
    }
}

impl Visitor for CompressVisitor<'_> {
    fn begin(&mut self, node: &NodeRef, attrs: &WalkAttrs) -> PackResult<Descend> {
        self.stats.nodes += 1;
        let found = if attrs.depth > 0 {
            self.cache.search(attrs.depth, node)
        } else {
            None
        };
        match found {
            Some(m) => self.emit_reference(m),
            None => self.emit_direct(node),
        }
    }

    fn end(&mut self, node: &NodeRef, attrs: &WalkAttrs) -> PackResult<()> {
        let pending = self.pending.pop().expect("begin/end pairing");
        self.cache.push_tree(attrs.depth, node.clone());
        if let Some(template) = pending {
            self.cache.push_template(attrs.depth, template);
        }
        Ok(())
    }

    fn empty_array(&mut self, _name: &str, _parent: &WalkAttrs) -> PackResult<()> {
        self.writer.write_u8(SHORT_ARR_TAG);
        Ok(())
    }
}

// ============================================================================
// Entry points
// ============================================================================

/// Compresses a lifted tree into the framed byte stream: string table first,
/// then one top-level node encoding.
pub fn compress(root: &NodeRef) -> PackResult<Vec<u8>> {
    compress_with_stats(root).map(|(bytes, _)| bytes)
}

/// Like [`compress`], also reporting emission counters.
pub fn compress_with_stats(root: &NodeRef) -> PackResult<(Vec<u8>, CompressStats)> {
    let mut table = StringTable::new();
    collect_strings(root, &mut table)?;
    table.finalize();

    let mut writer = ByteWriter::new();
    writer.write_string_table(&table)?;

    let mut driver = CompressVisitor::new(&table, writer);
    walk(root, &mut driver)?;
    Ok((driver.writer.into_bytes(), driver.stats))
}
