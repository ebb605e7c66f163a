//! Code payloads carried by declarations.
//!
//! Expressions and statements are opaque to the binder: they travel as a
//! list of fragments that the emitter prints verbatim, except for the
//! pieces whose output depends on binding (name references, `this`,
//! `super(...)` calls and embedded declarations).

use serde::{Deserialize, Serialize};
use tspull_common::TextSpan;

use crate::tree::DeclId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fragment {
    /// Literal target text.
    Text(String),
    /// An identifier resolved through scope lookup at emit time.
    Ref { name: String, span: TextSpan },
    This,
    /// `super(args)` inside a derived class constructor.
    SuperCall(Code),
    /// An embedded declaration (function expression, catch or with block).
    Decl(DeclId),
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Code {
    pub fragments: Vec<Fragment>,
}

impl Code {
    pub fn new() -> Self {
        Self::default()
    }

    /// Code consisting of a single literal.
    pub fn lit(text: impl Into<String>) -> Self {
        Self::new().text(text)
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.fragments.push(Fragment::Text(text.into()));
        self
    }

    pub fn reference(mut self, name: impl Into<String>, span: TextSpan) -> Self {
        self.fragments.push(Fragment::Ref {
            name: name.into(),
            span,
        });
        self
    }

    pub fn this(mut self) -> Self {
        self.fragments.push(Fragment::This);
        self
    }

    pub fn super_call(mut self, args: Code) -> Self {
        self.fragments.push(Fragment::SuperCall(args));
        self
    }

    pub fn decl(mut self, id: DeclId) -> Self {
        self.fragments.push(Fragment::Decl(id));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Fragment> {
        self.fragments.iter()
    }

    /// True if `this` appears in this code, not counting embedded declarations.
    pub fn mentions_this(&self) -> bool {
        self.fragments.iter().any(|f| match f {
            Fragment::This => true,
            // super(...) lowers to `_super.call(this, ...)`
            Fragment::SuperCall(_) => true,
            _ => false,
        })
    }

    pub fn starts_with_super_call(&self) -> bool {
        matches!(self.fragments.first(), Some(Fragment::SuperCall(_)))
    }

    /// Embedded declarations, in order.
    pub fn embedded(&self) -> impl Iterator<Item = DeclId> + '_ {
        self.fragments.iter().filter_map(|f| match f {
            Fragment::Decl(id) => Some(*id),
            _ => None,
        })
    }

    /// The integer value of a code that is a single numeric literal.
    pub fn as_integer(&self) -> Option<i64> {
        match self.fragments.as_slice() {
            [Fragment::Text(text)] => text.trim().parse().ok(),
            _ => None,
        }
    }
}

/// One entry in a statement list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyItem {
    Decl(DeclId),
    Stmt { code: Code, span: TextSpan },
}

/// Target of an import alias.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AliasTarget {
    /// `import a = M.N.C;`
    Entity(Vec<String>),
    /// `import a = require("m");`
    ExternalModule(String),
}

impl AliasTarget {
    pub fn display(&self) -> String {
        match self {
            AliasTarget::Entity(path) => path.join("."),
            AliasTarget::ExternalModule(name) => format!("require(\"{name}\")"),
        }
    }
}
