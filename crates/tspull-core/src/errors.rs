//! Registry failures reported to the caller.
//!
//! User errors in the sources never surface here; they are diagnostics.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no unit is registered under '{0}'")]
    UnknownUnit(String),

    #[error("a unit is already registered under '{0}'")]
    DuplicateUnit(String),

    #[error("unit '{0}' is being bound and cannot be changed")]
    UnitBusy(String),
}
