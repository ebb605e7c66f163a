//! ES3/ES5 emitter for bound compilation units.
//!
//! The emitter walks each unit's declaration tree in source order and
//! prints JavaScript, asking the symbol graph how each name must be
//! qualified and which declarations survived binding. Several units may be
//! appended to one [`EmitSession`] when the options request a single
//! output file.
//!
//! Per unit the session moves through `Idle -> Prologue -> BodyWalk ->
//! Closed`. An [`EmitError`] aborts only the unit being written: its text,
//! mapping frames and diagnostics are rolled back.
//!
//! Logging: each unit opens an `emit_unit` span. Aborted units are `warn!`,
//! name qualification is `trace!`.

pub mod context;
pub mod errors;
pub mod helpers;
pub mod mapping;
mod printer;
pub mod session;
pub mod source_map;
pub mod writer;

pub use context::{EmitContext, EmitState, PrologueState};
pub use errors::EmitError;
pub use mapping::{MappingFrame, SourceMapBuilder};
pub use session::{EmitOutput, EmitSession};
pub use source_map::{SourceMapGenerator, decode_mappings};
pub use writer::SourceWriter;

use tspull_binder::SymbolGraph;
use tspull_common::CompilerOptions;
use tspull_decl::{DeclLookup, UnitId};

/// `a/b.ts` -> `a/b.js`. Declaration files have no output of their own and
/// map to `None`.
pub fn output_file_name(path: &str) -> Option<String> {
    if path.ends_with(".d.ts") {
        return None;
    }
    let stem = path.strip_suffix(".ts").unwrap_or(path);
    Some(format!("{stem}.js"))
}

/// Emit a single unit into its own output.
pub fn emit_unit(
    options: &CompilerOptions,
    graph: &SymbolGraph,
    units: &dyn DeclLookup,
    unit: UnitId,
    source_text: &str,
) -> Result<EmitOutput, EmitError> {
    let path = units.unit_path(unit).ok_or(EmitError::UnknownUnit(unit))?;
    let file_name = output_file_name(path).unwrap_or_else(|| format!("{path}.js"));
    let mut session = EmitSession::new(options.clone(), file_name);
    session.emit_unit(graph, units, unit, source_text)?;
    session.finish()
}
