//! Internal binder failures.
//!
//! These are consistency failures, not user errors: user errors become
//! diagnostics and binding continues. A `BindError` aborts the current unit.

use thiserror::Error;
use tspull_decl::{DeclId, UnitId};

use crate::symbols::SymbolId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BindError {
    #[error("unit {0:?} is not registered")]
    UnknownUnit(UnitId),

    #[error("declaration {decl:?} does not exist in unit {unit:?}")]
    MissingDeclaration { unit: UnitId, decl: DeclId },

    #[error("parent of '{name}' could not be bound")]
    UnboundParent { name: String },

    #[error("'{name}' has no value side to hold its members")]
    MissingInstance { name: String },

    #[error("symbol {0:?} was destroyed while still referenced")]
    DanglingSymbol(SymbolId),
}
