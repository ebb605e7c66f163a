//! Declaration trees.
//!
//! The parser hands the binder one [`DeclTree`] per compilation unit. A tree
//! is an arena of [`Declaration`] nodes addressed by [`DeclId`]; parent links
//! are set at construction and never change for the lifetime of a unit
//! version. An edit discards and rebuilds the whole tree.

pub mod builder;
pub mod code;
pub mod flags;
pub mod tree;

pub use builder::DeclTreeBuilder;
pub use code::{AliasTarget, BodyItem, Code, Fragment};
pub use flags::{DeclFlags, DeclKind};
pub use tree::{DeclId, DeclLookup, DeclRef, DeclTree, Declaration, UnitId, UnitSet};
