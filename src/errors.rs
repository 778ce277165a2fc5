//! Unified error handling for the astpack pipeline.
//!
//! Every failure mode of the lift, string-table, and encoding stages is a
//! variant of [`PackError`]. All errors are fatal to the current run: the
//! caller discards any partially written output and reports the diagnostic.
//! Internal invariants (cache indices, numbering monotonicity) are asserted,
//! not surfaced as data errors.

use miette::Diagnostic;
use thiserror::Error;

pub type PackResult<T> = Result<T, PackError>;

/// Unified error type for all astpack failure modes.
#[derive(Debug, Error, Diagnostic)]
pub enum PackError {
    // Lift errors - raw input does not fit the schema
    #[error("unknown node type '{type_name}'")]
    #[diagnostic(code(astpack::lift::unknown_type))]
    UnknownType { type_name: String },

    #[error("node type '{type_name}' is missing required field '{name}'")]
    #[diagnostic(code(astpack::lift::missing_field))]
    MissingField {
        type_name: &'static str,
        name: &'static str,
    },

    #[error("node type '{type_name}' is missing required branch '{name}'")]
    #[diagnostic(code(astpack::lift::missing_branch))]
    MissingBranch {
        type_name: &'static str,
        name: &'static str,
    },

    #[error("property '{name}' is not declared on node type '{type_name}'")]
    #[diagnostic(
        code(astpack::lift::unknown_property),
        help("only 'type', 'range', 'loc', and declared fields or branches are accepted")
    )]
    UnknownProperty {
        type_name: &'static str,
        name: String,
    },

    #[error("property '{name}' on node type '{type_name}' disagrees with its declared array shape")]
    #[diagnostic(code(astpack::lift::array_shape_mismatch))]
    ArrayShapeMismatch {
        type_name: &'static str,
        name: &'static str,
    },

    // String table errors
    #[error("string '{value}' has no assigned table rank")]
    #[diagnostic(
        code(astpack::strings::unknown_string),
        help("every string must be collected before the table is finalized")
    )]
    UnknownString { value: String },

    // Encoder errors
    #[error("{what} has no byte encoding")]
    #[diagnostic(code(astpack::encode::unsupported_value))]
    UnsupportedValue { what: String },

    #[error("varuint value {value} exceeds 32 bits")]
    #[diagnostic(code(astpack::encode::varuint_overflow))]
    VarUintOverflow { value: u64 },

    #[error("reference parameter {what} = {value} is out of range")]
    #[diagnostic(code(astpack::encode::ref_out_of_range))]
    RefOutOfRange { what: &'static str, value: i64 },

    // CLI-surface errors
    #[error("failed to read '{path}'")]
    #[diagnostic(code(astpack::cli::io))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{path}' is not a JSON syntax-tree document")]
    #[diagnostic(code(astpack::cli::json))]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no output mode selected")]
    #[diagnostic(
        code(astpack::cli::no_mode),
        help("pass --tokens, --ast, --lifted, --type-sorted, or --compress")
    )]
    NoMode,
}

/// Prints a PackError with full miette diagnostics.
///
/// Use this for user-facing error display in CLI contexts.
pub fn print_error(error: PackError) {
    let report = miette::Report::new(error);
    eprintln!("{report:?}");
}
