//! Import aliases: `import a = M.N;` and `import a = require("m");`.
//!
//! Binding only creates the alias symbol. Its value/type/container slots are
//! filled later by [`resolve_alias`], once every unit the target may live in
//! has been bound.

use tracing::{debug, trace};
use tspull_common::{DiagnosticEvent, DiagnosticSink, diagnostic_codes};
use tspull_decl::{AliasTarget, DeclId, DeclKind, DeclLookup, DeclRef, DeclTree, UnitId};

use crate::errors::BindError;
use crate::graph::SymbolGraph;
use crate::state::Binder;
use crate::state_module_binding::dynamic_module_name;
use crate::symbols::{AliasSlots, KindMask, SymbolId, SymbolKind};

impl<'a> Binder<'a> {
    pub(crate) fn bind_import_declaration(&mut self, id: DeclId) -> Result<(), BindError> {
        let decl = self.decl(id)?;
        let scope = self.get_parent(id)?;
        let exported = decl.is_exported();
        let symbol = if self.find_in_parent(scope, &decl.name, KindMask::all(), exported).is_some() {
            self.report_duplicate(id);
            self.new_symbol(&decl.name, SymbolKind::TypeAlias, None)
        } else {
            self.new_symbol(&decl.name, SymbolKind::TypeAlias, Some((scope, exported)))
        };
        self.link(id, symbol)?;
        if let Some(sym) = self.graph.symbol_mut(symbol) {
            sym.alias = Some(AliasSlots::default());
        }
        Ok(())
    }
}

/// Fill the slots of the alias declared by `alias`. Already resolved aliases
/// are returned as they are.
pub fn resolve_alias(graph: &mut SymbolGraph, units: &dyn DeclLookup, alias: DeclRef) -> Option<AliasSlots> {
    let symbol = graph.symbol_of(alias)?;
    if let Some(slots) = graph.symbol(symbol)?.alias
        && slots.resolved
    {
        return Some(slots);
    }
    let decl = units.decl(alias)?;
    let tree = units.tree(alias.unit)?;

    let mut slots = match decl.alias.as_ref()? {
        AliasTarget::ExternalModule(name) => {
            let module = graph.find_global(&dynamic_module_name(name), KindMask::DYNAMIC_MODULE);
            let mut slots = AliasSlots::default();
            if let Some(module) = module {
                slots.container = module;
                slots.value = module;
            }
            slots
        }
        AliasTarget::Entity(path) => resolve_entity(graph, tree, alias, path),
    };
    slots.resolved = slots.container.is_some() || slots.type_symbol.is_some() || slots.value.is_some();
    trace!(alias = %decl.name, resolved = slots.resolved, "resolved alias");

    if let Some(sym) = graph.symbol_mut(symbol) {
        sym.alias = Some(slots);
    }
    Some(slots)
}

/// Resolve every alias declared in `unit`. An external module that cannot be
/// found is reported; unresolved entity names are left for the checker.
pub fn resolve_unit_aliases(graph: &mut SymbolGraph, units: &dyn DeclLookup, unit: UnitId) -> Vec<DiagnosticEvent> {
    let Some(tree) = units.tree(unit) else {
        return Vec::new();
    };
    let path = units.unit_path(unit).unwrap_or("");
    let mut diagnostics: Vec<DiagnosticEvent> = Vec::new();

    for (id, decl) in tree.iter().filter(|(_, d)| d.kind == DeclKind::TypeAlias) {
        let slots = resolve_alias(graph, units, DeclRef::new(unit, id));
        if let Some(AliasTarget::ExternalModule(name)) = decl.alias.as_ref()
            && !slots.is_some_and(|s| s.resolved)
        {
            debug!(module = %name, path, "external module not found");
            diagnostics.add_diagnostic(
                path,
                decl.name_span.start,
                decl.name_span.len(),
                diagnostic_codes::CANNOT_FIND_EXTERNAL_MODULE,
                &[name.as_str()],
            );
        }
    }
    diagnostics
}

fn resolve_entity(graph: &SymbolGraph, tree: &DeclTree, alias: DeclRef, path: &[String]) -> AliasSlots {
    let mut slots = AliasSlots::default();
    let Some((last, init)) = path.split_last() else {
        return slots;
    };

    let Some((first, rest)) = init.split_first() else {
        slots.container = lexical_lookup(graph, tree, alias, last, KindMask::SOME_CONTAINER, false);
        slots.type_symbol = lexical_lookup(graph, tree, alias, last, KindMask::SOME_NAMED_TYPE, false);
        slots.value = lexical_lookup(graph, tree, alias, last, KindMask::SOME_VALUE, true);
        return slots;
    };

    let mut scope = lexical_lookup(graph, tree, alias, first, KindMask::SOME_CONTAINER, false);
    for segment in rest {
        if scope.is_none() {
            return slots;
        }
        scope = graph
            .find_member(scope, segment, KindMask::SOME_CONTAINER)
            .unwrap_or(SymbolId::NONE);
    }
    if scope.is_none() {
        return slots;
    }

    slots.container = graph
        .find_member(scope, last, KindMask::SOME_CONTAINER)
        .unwrap_or(SymbolId::NONE);
    slots.type_symbol = graph
        .find_member(scope, last, KindMask::SOME_NAMED_TYPE)
        .unwrap_or(SymbolId::NONE);
    slots.value = graph
        .find_member(value_scope(graph, scope), last, KindMask::SOME_VALUE)
        .unwrap_or(SymbolId::NONE);
    slots
}

/// Values of a module live on its instance symbol.
fn value_scope(graph: &SymbolGraph, container: SymbolId) -> SymbolId {
    match graph.symbol(container) {
        Some(sym) if sym.kind == SymbolKind::Container && sym.instance_symbol.is_some() => sym.instance_symbol,
        _ => container,
    }
}

/// Search the modules enclosing `from`, innermost first, then the global
/// cache.
fn lexical_lookup(
    graph: &SymbolGraph,
    tree: &DeclTree,
    from: DeclRef,
    name: &str,
    mask: KindMask,
    value: bool,
) -> SymbolId {
    for ancestor in tree.ancestors(from.decl) {
        if !matches!(tree.kind(ancestor), Some(DeclKind::Container | DeclKind::DynamicModule)) {
            continue;
        }
        let Some(container) = graph.symbol_of(DeclRef::new(from.unit, ancestor)) else {
            continue;
        };
        let scope = if value { value_scope(graph, container) } else { container };
        let hit = graph
            .find_member(scope, name, mask)
            .or_else(|| graph.find_enclosed(scope, name, mask));
        if let Some(hit) = hit
            && graph.symbol_of(from) != Some(hit)
        {
            return hit;
        }
    }
    graph
        .find_global(name, mask)
        .filter(|&hit| graph.symbol_of(from) != Some(hit))
        .unwrap_or(SymbolId::NONE)
}
