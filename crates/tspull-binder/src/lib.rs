//! Pull-style symbol binder.
//!
//! A [`Binder`] walks one unit's declaration tree and links every
//! declaration into the session-wide [`SymbolGraph`]. Declarations with the
//! same name merge into one symbol where the language allows it (modules,
//! overloads, a module with a preceding function or class); everywhere else a
//! redeclaration is reported and bound to an isolated symbol so later
//! binding never cascades.
//!
//! Logging: the unit pass opens a `bind_unit` span; merges, replacements and
//! duplicates are `debug!` events, per-declaration progress is `trace!`.

pub mod errors;
pub mod graph;
pub mod resolve;
pub mod signatures;
pub mod state;
mod state_binding;
mod state_class_binding;
mod state_import_export;
mod state_module_binding;
mod state_node_binding;
pub mod symbols;

pub use errors::BindError;
pub use graph::{RemovalStats, SymbolGraph};
pub use resolve::{ValueHit, resolve_value};
pub use signatures::{Signature, SignatureArena, SignatureId, SignatureKind};
pub use state::{BindContext, BindOutcome, Binder};
pub use state_binding::{Redeclaration, RedeclarationFacts};
pub use state_import_export::{resolve_alias, resolve_unit_aliases};
pub use state_module_binding::dynamic_module_name;
pub use symbols::{AliasSlots, KindMask, MemberTable, Symbol, SymbolArena, SymbolFlags, SymbolId, SymbolKind};
