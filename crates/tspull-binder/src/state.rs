//! Binder state: one pass over one unit's declaration tree.
//!
//! Binding is pull-based. `bind_declaration` is idempotent and binds a
//! declaration's parent first when it needs the parent's symbol, so any
//! declaration can be bound in isolation. `bind_unit` walks the whole tree
//! top-down and then runs the per-unit checks that need a complete pass.

use rustc_hash::FxHashMap;
use tracing::{Level, debug, span};
use tspull_common::{DiagnosticEvent, DiagnosticSink, diagnostic_codes};
use tspull_decl::{DeclFlags, DeclId, DeclKind, DeclLookup, DeclRef, DeclTree, Declaration, UnitId};

use crate::errors::BindError;
use crate::graph::SymbolGraph;
use crate::symbols::{KindMask, SymbolFlags, SymbolId, SymbolKind};

/// Session-scoped binder caches. Lives as long as the session and is passed
/// into every pass.
#[derive(Clone, Debug, Default)]
pub struct BindContext {
    /// Unconstrained type parameters reused by name within one
    /// class/interface/object-type scope.
    pub(crate) type_parameter_cache: FxHashMap<String, SymbolId>,
    passes: u64,
}

impl BindContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of completed unit passes.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub(crate) fn reset_type_parameter_cache(&mut self) {
        self.type_parameter_cache.clear();
    }
}

/// Where a declaration's symbol is registered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ParentScope {
    /// The global (script-level) cache.
    Global,
    /// Member or enclosed table of a symbol.
    Symbol(SymbolId),
    /// Local scope of a function-like or catch declaration.
    Locals(DeclRef),
}

/// Result of a unit pass.
#[derive(Clone, Debug, Default)]
pub struct BindOutcome {
    pub diagnostics: Vec<DiagnosticEvent>,
    pub declarations_bound: usize,
}

pub struct Binder<'a> {
    pub(crate) graph: &'a mut SymbolGraph,
    pub(crate) units: &'a dyn DeclLookup,
    pub(crate) ctx: &'a mut BindContext,
    pub(crate) unit: UnitId,
    pub(crate) tree: &'a DeclTree,
    pub(crate) path: &'a str,
    pub(crate) diagnostics: Vec<DiagnosticEvent>,
    /// Function/method/constructor symbols touched by this pass.
    pub(crate) callables: Vec<SymbolId>,
    pub(crate) bound_count: usize,
}

impl<'a> Binder<'a> {
    pub fn new(
        graph: &'a mut SymbolGraph,
        units: &'a dyn DeclLookup,
        ctx: &'a mut BindContext,
        unit: UnitId,
    ) -> Result<Self, BindError> {
        let tree = units.tree(unit).ok_or(BindError::UnknownUnit(unit))?;
        let path = units.unit_path(unit).unwrap_or("");
        Ok(Self {
            graph,
            units,
            ctx,
            unit,
            tree,
            path,
            diagnostics: Vec::new(),
            callables: Vec::new(),
            bound_count: 0,
        })
    }

    /// Bind every declaration in the unit, then run whole-unit checks.
    pub fn bind_unit(mut self) -> Result<BindOutcome, BindError> {
        let _span = span!(Level::DEBUG, "bind_unit", path = self.path, unit = self.unit.0).entered();
        self.ctx.reset_type_parameter_cache();

        let root = self.tree.root();
        self.bind_all(root)?;
        self.check_implementations();

        self.ctx.passes += 1;
        debug!(
            declarations = self.bound_count,
            diagnostics = self.diagnostics.len(),
            "unit bound"
        );
        Ok(BindOutcome {
            diagnostics: self.diagnostics,
            declarations_bound: self.bound_count,
        })
    }

    pub(crate) fn bind_all(&mut self, id: DeclId) -> Result<(), BindError> {
        self.bind_declaration(id)?;
        let decl = self.decl(id)?;
        for &child in &decl.children {
            self.bind_all(child)?;
        }
        Ok(())
    }

    // =========================================================================
    // Helpers shared by the kind-specific binders
    // =========================================================================

    #[inline]
    pub(crate) fn dref(&self, id: DeclId) -> DeclRef {
        DeclRef::new(self.unit, id)
    }

    pub(crate) fn decl(&self, id: DeclId) -> Result<&'a Declaration, BindError> {
        let tree: &'a DeclTree = self.tree;
        tree.get(id).ok_or(BindError::MissingDeclaration {
            unit: self.unit,
            decl: id,
        })
    }

    pub(crate) fn parent_kind(&self, id: DeclId) -> Option<DeclKind> {
        self.tree.parent(id).and_then(|p| self.tree.kind(p))
    }

    /// Symbol of a declaration in this unit, binding it on demand.
    pub(crate) fn ensure_bound_symbol(&mut self, id: DeclId) -> Result<SymbolId, BindError> {
        if let Some(sym) = self.graph.symbol_of(self.dref(id)) {
            return Ok(sym);
        }
        self.bind_declaration(id)?;
        self.graph
            .symbol_of(self.dref(id))
            .ok_or_else(|| BindError::UnboundParent {
                name: self.tree.qualified_name(id),
            })
    }

    /// Resolve the scope a declaration registers into. Value declarations
    /// inside a module go to the module's instance symbol; static class
    /// members go to the constructor.
    pub(crate) fn get_parent(&mut self, id: DeclId) -> Result<ParentScope, BindError> {
        let decl = self.decl(id)?;
        let value_side = match decl.kind {
            DeclKind::Variable | DeclKind::Function => true,
            DeclKind::Property
            | DeclKind::Method
            | DeclKind::GetAccessor
            | DeclKind::SetAccessor => decl.is_static(),
            _ => false,
        };

        let tree = self.tree;
        let mut parent_id = decl.parent;
        loop {
            let Some(parent) = tree.get(parent_id) else {
                return Ok(ParentScope::Global);
            };
            match parent.kind {
                DeclKind::Script => return Ok(ParentScope::Global),
                DeclKind::WithBlock => parent_id = parent.parent,
                DeclKind::CatchBlock => {
                    // only the exception variable is scoped to the clause
                    let is_exception_var = parent
                        .children
                        .iter()
                        .find(|&&c| tree.kind(c) == Some(DeclKind::Variable))
                        == Some(&id);
                    if is_exception_var {
                        return Ok(ParentScope::Locals(self.dref(parent_id)));
                    }
                    parent_id = parent.parent;
                }
                kind if kind.is_function_like() || kind.is_signature_like() => {
                    return Ok(ParentScope::Locals(self.dref(parent_id)));
                }
                DeclKind::Container => {
                    let container = self.ensure_bound_symbol(parent_id)?;
                    if !value_side {
                        return Ok(ParentScope::Symbol(container));
                    }
                    let instance = self
                        .graph
                        .symbol(container)
                        .map(|s| s.instance_symbol)
                        .unwrap_or(SymbolId::NONE);
                    if instance.is_none() {
                        return Err(BindError::MissingInstance {
                            name: parent.name.clone(),
                        });
                    }
                    return Ok(ParentScope::Symbol(instance));
                }
                DeclKind::Class if value_side => {
                    let class = self.ensure_bound_symbol(parent_id)?;
                    let ctor = self.class_constructor(parent_id, class)?;
                    return Ok(ParentScope::Symbol(ctor));
                }
                _ => return Ok(ParentScope::Symbol(self.ensure_bound_symbol(parent_id)?)),
            }
        }
    }

    /// The constructor symbol of a class, binding its value side if needed.
    pub(crate) fn class_constructor(&mut self, class_id: DeclId, class: SymbolId) -> Result<SymbolId, BindError> {
        let existing = self.graph.symbol(class).map(|s| s.constructor).unwrap_or(SymbolId::NONE);
        if existing.is_some() {
            return Ok(existing);
        }
        let value_decl = self.decl(class_id)?.value_decl;
        if value_decl.is_some() {
            self.bind_declaration(value_decl)?;
        }
        let ctor = self.graph.symbol(class).map(|s| s.constructor).unwrap_or(SymbolId::NONE);
        if ctor.is_none() {
            return Err(BindError::MissingInstance {
                name: self.tree.qualified_name(class_id),
            });
        }
        Ok(ctor)
    }

    /// Tables searched for an existing same-named symbol.
    pub(crate) fn find_in_parent(&self, scope: ParentScope, name: &str, mask: KindMask, exported: bool) -> Option<SymbolId> {
        match scope {
            ParentScope::Global => self.graph.find_global(name, mask),
            ParentScope::Symbol(parent) => {
                if exported || self.is_member_scope(parent) {
                    self.graph.find_member(parent, name, mask)
                } else {
                    self.graph.find_enclosed(parent, name, mask)
                }
            }
            ParentScope::Locals(scope) => self.graph.find_local(scope, name, mask),
        }
    }

    /// Same-named symbol in the table the declaration did *not* search,
    /// used for the all-or-none export check.
    pub(crate) fn find_export_mismatch(&self, scope: ParentScope, name: &str, mask: KindMask, exported: bool) -> Option<SymbolId> {
        match scope {
            ParentScope::Symbol(parent) if !self.is_member_scope(parent) => {
                if exported {
                    self.graph.find_enclosed(parent, name, mask)
                } else {
                    self.graph.find_member(parent, name, mask)
                }
            }
            _ => None,
        }
    }

    /// Class-like symbols keep every member in `members`.
    fn is_member_scope(&self, parent: SymbolId) -> bool {
        matches!(
            self.graph.kind_of(parent),
            Some(
                SymbolKind::Class
                    | SymbolKind::Interface
                    | SymbolKind::TypeLiteral
                    | SymbolKind::Enum
                    | SymbolKind::ConstructorMethod
            )
        )
    }

    pub(crate) fn register(&mut self, scope: ParentScope, symbol: SymbolId, exported: bool) {
        match scope {
            ParentScope::Global => self.graph.add_global(symbol),
            ParentScope::Symbol(parent) => {
                if exported || self.is_member_scope(parent) {
                    self.graph.add_member(parent, symbol);
                } else {
                    self.graph.add_enclosed(parent, symbol);
                }
            }
            ParentScope::Locals(scope) => self.graph.add_local(scope, symbol),
        }
    }

    /// Create a symbol and register it, or create an isolated one for a
    /// rejected redeclaration.
    pub(crate) fn new_symbol(&mut self, name: &str, kind: SymbolKind, scope: Option<(ParentScope, bool)>) -> SymbolId {
        let symbol = self.graph.create_symbol(name, kind);
        match scope {
            Some((scope, exported)) => self.register(scope, symbol, exported),
            None => {
                if let Some(sym) = self.graph.symbol_mut(symbol) {
                    sym.flags |= SymbolFlags::ISOLATED;
                }
            }
        }
        symbol
    }

    pub(crate) fn link(&mut self, id: DeclId, symbol: SymbolId) -> Result<(), BindError> {
        let flags = self.decl(id)?.flags;
        self.graph.link_decl(self.dref(id), symbol, flags);
        Ok(())
    }

    pub(crate) fn is_isolated(&self, symbol: SymbolId) -> bool {
        self.graph.symbol(symbol).is_some_and(|s| s.is_isolated())
    }

    /// True if any declaration of `symbol` has `flag`.
    pub(crate) fn any_decl_has(&self, symbol: SymbolId, flag: DeclFlags) -> bool {
        self.graph.symbol(symbol).is_some_and(|s| {
            s.declarations
                .iter()
                .any(|d| self.units.decl(*d).is_some_and(|decl| decl.flags.contains(flag)))
        })
    }

    /// True if every declaration of `symbol` has `flag`.
    pub(crate) fn all_decls_have(&self, symbol: SymbolId, flag: DeclFlags) -> bool {
        self.graph.symbol(symbol).is_some_and(|s| {
            !s.declarations.is_empty()
                && s.declarations
                    .iter()
                    .all(|d| self.units.decl(*d).is_some_and(|decl| decl.flags.contains(flag)))
        })
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    pub(crate) fn report(&mut self, id: DeclId, code: u32, args: &[&str]) {
        let span = self.tree.get(id).map(|d| d.name_span).unwrap_or_default();
        self.diagnostics.add_diagnostic(self.path, span.start, span.len(), code, args);
    }

    /// Report against a declaration that may live in another unit.
    pub(crate) fn report_at(&mut self, decl: DeclRef, code: u32, args: &[&str]) {
        let units = self.units;
        let span = units.decl(decl).map(|d| d.name_span).unwrap_or_default();
        let file = units.unit_path(decl.unit).unwrap_or(self.path);
        self.diagnostics.add_diagnostic(file, span.start, span.len(), code, args);
    }

    pub(crate) fn report_duplicate(&mut self, id: DeclId) {
        let name = self.tree.get(id).map(|d| d.name.clone()).unwrap_or_default();
        debug!(name = %name, unit = self.unit.0, "duplicate identifier");
        self.report(id, diagnostic_codes::DUPLICATE_IDENTIFIER, &[&name]);
    }
}
