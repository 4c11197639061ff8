//! jq-style query engine over the normalized snapshot.
//!
//! Supported: paths (`.a.b`, `."k"`, `.["k"]`, `.[n]`, `.[a:b]`, `.[]`, `..`), `?`, `|`,
//! `,`, `//`, `and`/`or`, comparisons, arithmetic (`+ - * / %`, unary `-`),
//! `if`/`elif`/`else`/`end`, array and object construction, string interpolation, and
//! the common builtins (`select`, `map`, `to_entries`, `join`, `split`, `test`, ...).
//! Variables, `reduce`, `def` and assignment are not supported.

mod eval;
mod lexer;
mod parser;

pub use parser::{parse, Ast};

use serde_json::Value;
use state_error::StateResult;

/// Run `expr` against `root` and concatenate every output.
///
/// A leading `.` is implied. Strings are written raw, other values as compact JSON,
/// with no separator between outputs. An evaluation error discards partial output.
pub fn run(root: &Value, expr: &str) -> StateResult<String> {
    let trimmed = expr.trim();
    let source = if trimmed.starts_with('.') {
        trimmed.to_string()
    } else {
        format!(".{}", trimmed)
    };
    let ast = parse(&source)?;
    let outputs = eval::collect(&ast, root)?;
    log::debug!("query {:?} produced {} value(s)", source, outputs.len());
    Ok(outputs.iter().map(eval::to_text).collect())
}
