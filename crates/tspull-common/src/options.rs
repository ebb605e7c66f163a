//! Resolved compiler options.
//!
//! The driver parses the JSON configuration (see `tspull_core::config`) and
//! hands the binder and emitter this resolved, typed form.

use serde::{Deserialize, Serialize};

/// ECMAScript target. Only accessor legality depends on it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ScriptTarget {
    ES3,
    #[default]
    ES5,
}

impl ScriptTarget {
    pub const fn supports_accessors(self) -> bool {
        matches!(self, ScriptTarget::ES5)
    }
}

/// Module wrapping convention for file-level external modules.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModuleKind {
    #[default]
    CommonJS,
    AMD,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NewLineKind {
    #[default]
    LineFeed,
    CarriageReturnLineFeed,
}

impl NewLineKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            NewLineKind::LineFeed => "\n",
            NewLineKind::CarriageReturnLineFeed => "\r\n",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerOptions {
    pub target: ScriptTarget,
    pub module: ModuleKind,
    pub remove_comments: bool,
    /// Accepted for configuration compatibility. Declaration files come
    /// from a separate pipeline.
    pub declaration: bool,
    pub source_map: bool,
    /// When set, every unit is concatenated into this one output.
    pub out_file: Option<String>,
    pub emit_bom: bool,
    pub new_line: NewLineKind,
}

impl CompilerOptions {
    /// One output file per unit.
    pub fn output_many(&self) -> bool {
        self.out_file.is_none()
    }
}
