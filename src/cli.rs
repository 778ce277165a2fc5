//! Command-line surface.
//!
//! The binary consumes an ESTree JSON document (the external parser's
//! output) and offers diagnostic views of the tree plus the compressed
//! stream. Every mode flag has a `--no-` counterpart; the last occurrence
//! wins, and at least one mode must remain enabled.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::process;

use clap::Parser;

use crate::compress::compress_with_stats;
use crate::errors::{print_error, PackError, PackResult};
use crate::lift::{depth_first_number, Lifter};
use crate::schema_std::build_default_schema_registry;
use crate::tree::NodeRef;
use crate::value::FieldValue;
use crate::walk::{walk, Descend, Visitor, WalkAttrs};

// ============================================================================
// CLI ARGUMENTS
// ============================================================================

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "astpack",
    version,
    about = "Structural compressor for JavaScript syntax trees."
)]
pub struct PackArgs {
    /// ESTree JSON document produced by the external parser.
    #[arg(required = true)]
    pub file: PathBuf,

    /// Print the leaf tokens (identifiers and literals) in source order.
    #[arg(long)]
    pub tokens: bool,
    #[arg(long = "no-tokens", overrides_with = "tokens")]
    pub no_tokens: bool,

    /// Pretty-print the raw JSON syntax tree.
    #[arg(long)]
    pub ast: bool,
    #[arg(long = "no-ast", overrides_with = "ast")]
    pub no_ast: bool,

    /// Lift strictly and print the typed tree.
    #[arg(long)]
    pub lifted: bool,
    #[arg(long = "no-lifted", overrides_with = "lifted")]
    pub no_lifted: bool,

    /// Print node counts grouped by node type, descending.
    #[arg(long = "type-sorted")]
    pub type_sorted: bool,
    #[arg(long = "no-type-sorted", overrides_with = "type_sorted")]
    pub no_type_sorted: bool,

    /// Compress and write the byte stream next to the input.
    #[arg(long)]
    pub compress: bool,
    #[arg(long = "no-compress", overrides_with = "compress")]
    pub no_compress: bool,
}

// ============================================================================
// MAIN ENTRY POINT
// ============================================================================

/// The main entry point for the CLI.
pub fn run() {
    let args = PackArgs::parse();
    if let Err(error) = dispatch(&args) {
        print_error(error);
        process::exit(1);
    }
}

fn dispatch(args: &PackArgs) -> PackResult<()> {
    let tokens = args.tokens && !args.no_tokens;
    let ast = args.ast && !args.no_ast;
    let lifted = args.lifted && !args.no_lifted;
    let type_sorted = args.type_sorted && !args.no_type_sorted;
    let compress = args.compress && !args.no_compress;
    if !(tokens || ast || lifted || type_sorted || compress) {
        return Err(PackError::NoMode);
    }

    let path = args.file.display().to_string();
    let text = fs::read_to_string(&args.file).map_err(|source| PackError::Io {
        path: path.clone(),
        source,
    })?;
    let raw: serde_json::Value =
        serde_json::from_str(&text).map_err(|source| PackError::Json {
            path: path.clone(),
            source,
        })?;

    let registry = build_default_schema_registry();
    let lifter = Lifter::new(&registry);

    if ast {
        println!("{:#}", raw);
    }

    // The diagnostic views tolerate unknown node types; lifting for
    // compression is strict.
    if tokens || type_sorted {
        let root = lifter.lift_sloppy(&raw)?;
        if tokens {
            print_tokens(&root)?;
        }
        if type_sorted {
            print_type_sorted(&root)?;
        }
    }

    if lifted || compress {
        let root = lifter.lift_must(&raw)?;
        depth_first_number(&root);
        if lifted {
            print_lifted(&root)?;
        }
        if compress {
            let (bytes, stats) = compress_with_stats(&root)?;
            let out = args.file.with_extension("astp");
            fs::write(&out, &bytes).map_err(|source| PackError::Io {
                path: out.display().to_string(),
                source,
            })?;
            println!("{} -> {}", path, out.display());
            println!(
                "  nodes: {} ({} direct, {} subtree refs, {} template refs)",
                stats.nodes, stats.direct, stats.subtree_refs, stats.template_refs
            );
            println!("  bytes: {} -> {}", text.len(), bytes.len());
        }
    }

    Ok(())
}

// ============================================================================
// OUTPUT FUNCTIONS
// ============================================================================

fn render_value(value: &FieldValue) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "?".to_string())
}

struct TokenPrinter;

impl Visitor for TokenPrinter {
    fn begin(&mut self, node: &NodeRef, _attrs: &WalkAttrs) -> PackResult<Descend> {
        match node.type_name() {
            "Identifier" => {
                if let Some(name) = node.field("name").and_then(FieldValue::as_str) {
                    println!("{name}");
                }
            }
            "Literal" => {
                if let Some(value) = node.field("value") {
                    println!("{}", render_value(value));
                }
            }
            _ => {}
        }
        Ok(Descend::Children)
    }
}

fn print_tokens(root: &NodeRef) -> PackResult<()> {
    walk(root, &mut TokenPrinter)
}

struct LiftedPrinter;

impl Visitor for LiftedPrinter {
    fn begin(&mut self, node: &NodeRef, attrs: &WalkAttrs) -> PackResult<Descend> {
        let indent = "  ".repeat(attrs.depth as usize);
        let mut line = format!(
            "{indent}{}: {} #{}",
            attrs.name,
            node.ty.alias,
            node.attrs.number()
        );
        for descr in &node.ty.fields {
            if let Some(value) = node.field(descr.name) {
                line.push_str(&format!(" {}={}", descr.name, render_value(value)));
            }
        }
        println!("{line}");
        Ok(Descend::Children)
    }

    fn empty_array(&mut self, name: &str, parent: &WalkAttrs) -> PackResult<()> {
        let indent = "  ".repeat(parent.depth as usize + 1);
        println!("{indent}{name}: []");
        Ok(())
    }
}

fn print_lifted(root: &NodeRef) -> PackResult<()> {
    walk(root, &mut LiftedPrinter)
}

#[derive(Default)]
struct TypeCounter {
    counts: HashMap<&'static str, u32>,
}

impl Visitor for TypeCounter {
    fn begin(&mut self, node: &NodeRef, _attrs: &WalkAttrs) -> PackResult<Descend> {
        *self.counts.entry(node.type_name()).or_default() += 1;
        Ok(Descend::Children)
    }
}

fn print_type_sorted(root: &NodeRef) -> PackResult<()> {
    let mut counter = TypeCounter::default();
    walk(root, &mut counter)?;
    let mut counts: Vec<_> = counter.counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    for (name, count) in counts {
        println!("{count:>6}  {name}");
    }
    Ok(())
}
