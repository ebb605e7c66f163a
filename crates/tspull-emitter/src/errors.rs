//! Internal emitter failures.
//!
//! Like `BindError`, these are consistency failures and never user errors.
//! An `EmitError` aborts the unit being emitted; the session rolls its
//! output back to where the unit started.

use thiserror::Error;
use tspull_decl::{DeclId, UnitId};

use crate::context::EmitState;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EmitError {
    #[error("unit {0:?} is not registered")]
    UnknownUnit(UnitId),

    #[error("declaration {decl:?} does not exist in unit {unit:?}")]
    MissingDeclaration { unit: UnitId, decl: DeclId },

    #[error("invalid emitter transition from {from:?} to {to:?}")]
    InvalidTransition { from: EmitState, to: EmitState },

    #[error("mapping end without a matching start")]
    MappingUnderflow,

    #[error("{open} mapping frame(s) left open")]
    UnbalancedMapping { open: usize },

    #[error("scope pop without a matching push")]
    ScopeUnderflow,

    #[error("closing scope of {expected:?} but {found:?} is innermost")]
    ScopeMismatch { expected: DeclId, found: DeclId },

    #[error("{open} emit scope(s) left open")]
    UnbalancedScopes { open: usize },
}
