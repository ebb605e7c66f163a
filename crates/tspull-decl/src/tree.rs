//! Declaration arena.

use serde::{Deserialize, Serialize};
use tspull_common::TextSpan;

use crate::code::{AliasTarget, BodyItem, Code};
use crate::flags::{DeclFlags, DeclKind};

/// Index of a declaration inside one unit's tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeclId(pub u32);

impl DeclId {
    pub const NONE: DeclId = DeclId(u32::MAX);

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == u32::MAX
    }

    #[inline]
    pub const fn is_some(self) -> bool {
        self.0 != u32::MAX
    }
}

/// Identity of a compilation unit inside a registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub u32);

/// A declaration addressed across units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeclRef {
    pub unit: UnitId,
    pub decl: DeclId,
}

impl DeclRef {
    pub const fn new(unit: UnitId, decl: DeclId) -> Self {
        Self { unit, decl }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    pub kind: DeclKind,
    /// Empty for anonymous declarations.
    pub name: String,
    pub flags: DeclFlags,
    pub parent: DeclId,
    pub span: TextSpan,
    /// Where diagnostics about this declaration point. Defaults to `span`.
    pub name_span: TextSpan,
    pub children: Vec<DeclId>,
    /// Statement list, for declarations that have a body.
    pub body: Option<Vec<BodyItem>>,
    pub initializer: Option<Code>,
    pub type_annotation: Option<String>,
    /// Type parameter constraint.
    pub constraint: Option<String>,
    /// Class heritage expression.
    pub extends: Option<Code>,
    pub alias: Option<AliasTarget>,
    /// Companion implicit variable of an initialized module, enum or class.
    pub value_decl: DeclId,
    /// For an implicit variable, the declaration it stands in for.
    pub value_of: DeclId,
    pub comments: Vec<String>,
}

impl Declaration {
    pub fn new(kind: DeclKind, name: impl Into<String>, flags: DeclFlags, span: TextSpan) -> Self {
        Self {
            kind,
            name: name.into(),
            flags,
            parent: DeclId::NONE,
            span,
            name_span: span,
            children: Vec::new(),
            body: None,
            initializer: None,
            type_annotation: None,
            constraint: None,
            extends: None,
            alias: None,
            value_decl: DeclId::NONE,
            value_of: DeclId::NONE,
            comments: Vec::new(),
        }
    }

    #[inline]
    pub fn has_flag(&self, flag: DeclFlags) -> bool {
        self.flags.contains(flag)
    }

    pub fn is_exported(&self) -> bool {
        self.flags.contains(DeclFlags::EXPORTED)
    }

    pub fn is_ambient(&self) -> bool {
        self.flags.contains(DeclFlags::AMBIENT)
    }

    pub fn is_static(&self) -> bool {
        self.flags.contains(DeclFlags::STATIC)
    }

    pub fn is_arrow(&self) -> bool {
        self.flags.contains(DeclFlags::ARROW_FUNCTION)
    }

    /// A function-like declaration with a body.
    pub fn is_definition(&self) -> bool {
        self.kind.is_function_like() && self.body.is_some()
    }
}

/// One unit's declaration arena. Index 0 is always the Script root.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclTree {
    pub(crate) decls: Vec<Declaration>,
}

impl DeclTree {
    pub fn root(&self) -> DeclId {
        DeclId(0)
    }

    pub fn get(&self, id: DeclId) -> Option<&Declaration> {
        if id.is_none() {
            None
        } else {
            self.decls.get(id.0 as usize)
        }
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DeclId, &Declaration)> {
        self.decls
            .iter()
            .enumerate()
            .map(|(i, d)| (DeclId(i as u32), d))
    }

    pub fn kind(&self, id: DeclId) -> Option<DeclKind> {
        self.get(id).map(|d| d.kind)
    }

    pub fn parent(&self, id: DeclId) -> Option<DeclId> {
        self.get(id).map(|d| d.parent).filter(|p| p.is_some())
    }

    /// Ancestors of `id`, nearest first, excluding `id` itself.
    pub fn ancestors(&self, id: DeclId) -> impl Iterator<Item = DeclId> + '_ {
        std::iter::successors(self.parent(id), move |&p| self.parent(p))
    }

    pub fn children_of_kind(&self, id: DeclId, kind: DeclKind) -> impl Iterator<Item = DeclId> + '_ {
        self.get(id)
            .map(|d| d.children.as_slice())
            .unwrap_or(&[])
            .iter()
            .copied()
            .filter(move |&c| self.kind(c) == Some(kind))
    }

    pub fn parameters(&self, id: DeclId) -> impl Iterator<Item = DeclId> + '_ {
        self.children_of_kind(id, DeclKind::Parameter)
    }

    pub fn type_parameters(&self, id: DeclId) -> impl Iterator<Item = DeclId> + '_ {
        self.children_of_kind(id, DeclKind::TypeParameter)
    }

    /// Dotted name through the enclosing named declarations, e.g. `A.B.x`.
    pub fn qualified_name(&self, id: DeclId) -> String {
        let mut parts: Vec<&str> = Vec::new();
        let mut cur = Some(id);
        while let Some(c) = cur {
            let Some(decl) = self.get(c) else { break };
            if decl.kind == DeclKind::Script {
                break;
            }
            if !decl.name.is_empty() {
                parts.push(decl.name.as_str());
            }
            cur = self.parent(c);
        }
        parts.reverse();
        parts.join(".")
    }

    /// The declaration that owns `this` for code nested in `id`, and whether
    /// an arrow function lies between them.
    pub fn this_scope(&self, id: DeclId) -> (DeclId, bool) {
        let mut crossed_arrow = false;
        let mut cur = Some(id);
        while let Some(c) = cur {
            let Some(decl) = self.get(c) else { break };
            if decl.kind == DeclKind::FunctionExpression && decl.is_arrow() {
                crossed_arrow = true;
            } else if decl.kind.is_this_scope() {
                return (c, crossed_arrow);
            }
            cur = self.parent(c);
        }
        (self.root(), crossed_arrow)
    }
}

/// Access to the declaration trees of every unit in a session.
pub trait DeclLookup {
    fn tree(&self, unit: UnitId) -> Option<&DeclTree>;

    fn unit_path(&self, unit: UnitId) -> Option<&str>;

    /// Position of the unit in registration order, for textual ordering
    /// across files.
    fn unit_order(&self, unit: UnitId) -> u32 {
        unit.0
    }

    fn decl(&self, r: DeclRef) -> Option<&Declaration> {
        self.tree(r.unit)?.get(r.decl)
    }
}

/// A plain list of `(path, tree)` pairs, indexed by `UnitId`.
#[derive(Clone, Debug, Default)]
pub struct UnitSet {
    units: Vec<(String, DeclTree)>,
}

impl UnitSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: impl Into<String>, tree: DeclTree) -> UnitId {
        let id = UnitId(self.units.len() as u32);
        self.units.push((path.into(), tree));
        id
    }

    pub fn replace(&mut self, unit: UnitId, tree: DeclTree) {
        if let Some(slot) = self.units.get_mut(unit.0 as usize) {
            slot.1 = tree;
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = UnitId> {
        (0..self.units.len() as u32).map(UnitId)
    }
}

impl DeclLookup for UnitSet {
    fn tree(&self, unit: UnitId) -> Option<&DeclTree> {
        self.units.get(unit.0 as usize).map(|(_, t)| t)
    }

    fn unit_path(&self, unit: UnitId) -> Option<&str> {
        self.units.get(unit.0 as usize).map(|(p, _)| p.as_str())
    }
}
