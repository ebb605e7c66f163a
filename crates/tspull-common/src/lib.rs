//! Common types and utilities for the tspull compiler core.
//!
//! This crate provides foundational types used across all tspull crates:
//! - Source spans (`TextSpan`)
//! - Position/line-map types for line/column source locations
//! - The diagnostic catalog, diagnostic values and the sink interface
//! - Compiler options (`CompilerOptions`, `ScriptTarget`, `ModuleKind`)

// Span - Source location tracking (byte offsets)
pub mod span;
pub use span::TextSpan;

// Position/line map types for line/column source locations
pub mod position;
pub use position::{LineAndCharacter, LineMap};

// Diagnostics - catalog, values and the sink used by binder and emitter
pub mod diagnostics;
pub use diagnostics::{
    Diagnostic, DiagnosticBag, DiagnosticCategory, DiagnosticEvent, DiagnosticSink,
    diagnostic_codes,
};

// Compiler options shared by the binder, emitter and driver
pub mod options;
pub use options::{CompilerOptions, ModuleKind, NewLineKind, ScriptTarget};
