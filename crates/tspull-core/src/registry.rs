//! Compilation-unit registry.
//!
//! The registry owns every unit's source and declaration tree, the shared
//! symbol graph and the session binder caches. Units are bound lazily: the
//! first query that needs symbols binds every unit that is not yet bound,
//! in registration order, and then resolves aliases across the program.
//!
//! Replacing or removing a unit pulls its declarations out of the graph
//! first. Symbols only that unit declared are destroyed, merged symbols
//! keep the declarations of the other units. Units whose binding leaned
//! on the outgoing declarations (duplicates it rejected, symbols it
//! created, failed merges, reported diagnostics) are unbound as well and
//! rebound on the next query.

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, info, instrument, warn};
use tspull_binder::{BindContext, Binder, KindMask, RemovalStats, SymbolGraph, SymbolId, resolve_unit_aliases};
use tspull_common::{CompilerOptions, DiagnosticBag, DiagnosticEvent, diagnostic_codes};
use tspull_decl::{DeclLookup, DeclTree, DeclTreeBuilder, UnitId};
use tspull_emitter::{EmitOutput, EmitSession, output_file_name};

use crate::errors::RegistryError;

/// Source text plus the declaration tree parsed from it.
#[derive(Clone, Debug, Default)]
pub struct UnitSource {
    text: String,
    tree: DeclTree,
}

impl UnitSource {
    pub fn new(text: impl Into<String>, tree: DeclTree) -> Self {
        Self {
            text: text.into(),
            tree,
        }
    }

    /// Take the builder's source text along with the finished tree.
    pub fn from_builder(builder: DeclTreeBuilder) -> Self {
        let text = builder.source().to_string();
        Self {
            text,
            tree: builder.finish(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tree(&self) -> &DeclTree {
        &self.tree
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnitState {
    Unbound,
    /// A pass over the unit has started and not yet finished.
    Binding,
    Bound,
    /// The last pass hit an internal error.
    Failed,
}

#[derive(Clone, Debug)]
struct UnitEntry {
    path: String,
    source: UnitSource,
    /// Bumped by every update.
    version: u32,
    state: UnitState,
    bind_diagnostics: Vec<DiagnosticEvent>,
    alias_diagnostics: Vec<DiagnosticEvent>,
}

/// Registered units, addressable by path or by `UnitId`.
///
/// Ids are never reused; a removed unit leaves an empty slot. Registration
/// order is the textual order across files.
#[derive(Clone, Debug, Default)]
pub struct UnitTable {
    entries: Vec<Option<UnitEntry>>,
    by_path: IndexMap<String, UnitId>,
}

impl UnitTable {
    pub fn id_of(&self, path: &str) -> Option<UnitId> {
        self.by_path.get(path).copied()
    }

    /// Live units in registration order.
    pub fn ids(&self) -> impl Iterator<Item = UnitId> + '_ {
        self.by_path.values().copied()
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }

    pub fn source(&self, unit: UnitId) -> Option<&UnitSource> {
        self.entry(unit).map(|e| &e.source)
    }

    pub fn state(&self, unit: UnitId) -> Option<UnitState> {
        self.entry(unit).map(|e| e.state)
    }

    pub fn version(&self, unit: UnitId) -> Option<u32> {
        self.entry(unit).map(|e| e.version)
    }

    fn entry(&self, unit: UnitId) -> Option<&UnitEntry> {
        self.entries.get(unit.0 as usize)?.as_ref()
    }

    fn entry_mut(&mut self, unit: UnitId) -> Option<&mut UnitEntry> {
        self.entries.get_mut(unit.0 as usize)?.as_mut()
    }

    fn insert(&mut self, path: &str, source: UnitSource) -> UnitId {
        let id = UnitId(self.entries.len() as u32);
        self.entries.push(Some(UnitEntry {
            path: path.to_string(),
            source,
            version: 1,
            state: UnitState::Unbound,
            bind_diagnostics: Vec::new(),
            alias_diagnostics: Vec::new(),
        }));
        self.by_path.insert(path.to_string(), id);
        id
    }

    fn take(&mut self, unit: UnitId) -> Option<UnitEntry> {
        let entry = self.entries.get_mut(unit.0 as usize)?.take()?;
        self.by_path.shift_remove(&entry.path);
        Some(entry)
    }
}

impl DeclLookup for UnitTable {
    fn tree(&self, unit: UnitId) -> Option<&DeclTree> {
        self.entry(unit).map(|e| &e.source.tree)
    }

    fn unit_path(&self, unit: UnitId) -> Option<&str> {
        self.entry(unit).map(|e| e.path.as_str())
    }

    fn unit_order(&self, unit: UnitId) -> u32 {
        self.entry(unit)
            .and_then(|e| self.by_path.get_index_of(&e.path))
            .map_or(unit.0, |index| index as u32)
    }
}

pub struct Registry {
    options: CompilerOptions,
    units: UnitTable,
    graph: SymbolGraph,
    ctx: BindContext,
    aliases_stale: bool,
}

impl Registry {
    pub fn new(options: CompilerOptions) -> Self {
        Self {
            options,
            units: UnitTable::default(),
            graph: SymbolGraph::new(),
            ctx: BindContext::new(),
            aliases_stale: false,
        }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn units(&self) -> &UnitTable {
        &self.units
    }

    /// The symbol graph as of the last bind. Call [`Registry::bind_all`]
    /// first to see pending changes.
    pub fn graph(&self) -> &SymbolGraph {
        &self.graph
    }

    pub fn unit_state(&self, path: &str) -> Option<UnitState> {
        self.units.state(self.units.id_of(path)?)
    }

    pub fn unit_version(&self, path: &str) -> Option<u32> {
        self.units.version(self.units.id_of(path)?)
    }

    #[instrument(level = "debug", skip(self, source))]
    pub fn add_unit(&mut self, path: &str, source: UnitSource) -> Result<UnitId, RegistryError> {
        if self.units.id_of(path).is_some() {
            return Err(RegistryError::DuplicateUnit(path.to_string()));
        }
        let id = self.units.insert(path, source);
        self.aliases_stale = true;
        debug!(unit = id.0, "unit registered");
        Ok(id)
    }

    /// Replace a unit's source. The old declarations leave the graph now;
    /// the new tree is bound on the next query.
    #[instrument(level = "debug", skip(self, source))]
    pub fn update_unit(&mut self, path: &str, source: UnitSource) -> Result<RemovalStats, RegistryError> {
        let id = self.idle_unit(path)?;
        let dependents = self.dependents_of(id);
        let stats = self.graph.remove_unit(id, &self.units);
        if let Some(entry) = self.units.entry_mut(id) {
            entry.source = source;
            entry.version += 1;
            entry.state = UnitState::Unbound;
            entry.bind_diagnostics.clear();
            entry.alias_diagnostics.clear();
        }
        self.unbind(dependents);
        self.invalidate_aliases();
        Ok(stats)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn remove_unit(&mut self, path: &str) -> Result<RemovalStats, RegistryError> {
        let id = self.idle_unit(path)?;
        let dependents = self.dependents_of(id);
        let stats = self.graph.remove_unit(id, &self.units);
        self.units.take(id);
        self.unbind(dependents);
        self.invalidate_aliases();
        Ok(stats)
    }

    /// Bound units that must be rebound once `unit` leaves the graph:
    /// every unit with binder diagnostics (a rejected duplicate may now
    /// win), plus, transitively, units declaring symbols that an affected
    /// unit created or failed to merge into.
    fn dependents_of(&self, unit: UnitId) -> Vec<UnitId> {
        let mut found: IndexSet<UnitId> = self
            .units
            .ids()
            .filter(|&id| id != unit)
            .filter(|&id| self.units.entry(id).is_some_and(|e| !e.bind_diagnostics.is_empty()))
            .collect();
        let mut pending: Vec<UnitId> = found.iter().copied().collect();
        pending.push(unit);
        while let Some(next) = pending.pop() {
            for other in self.graph.units_depending_on(next) {
                if other != unit && found.insert(other) {
                    pending.push(other);
                }
            }
        }
        found
            .into_iter()
            .filter(|&id| matches!(self.units.state(id), Some(UnitState::Bound | UnitState::Failed)))
            .collect()
    }

    fn unbind(&mut self, units: Vec<UnitId>) {
        for id in units {
            let stats = self.graph.remove_unit(id, &self.units);
            if let Some(entry) = self.units.entry_mut(id) {
                entry.state = UnitState::Unbound;
                entry.bind_diagnostics.clear();
                entry.alias_diagnostics.clear();
            }
            debug!(
                unit = id.0,
                declarations = stats.declarations_removed,
                "dependent unit scheduled for rebinding"
            );
        }
    }

    fn idle_unit(&self, path: &str) -> Result<UnitId, RegistryError> {
        let id = self
            .units
            .id_of(path)
            .ok_or_else(|| RegistryError::UnknownUnit(path.to_string()))?;
        if self.units.state(id) == Some(UnitState::Binding) {
            return Err(RegistryError::UnitBusy(path.to_string()));
        }
        Ok(id)
    }

    /// Aliases in the remaining units may point at symbols that changed or
    /// may now resolve; resolve them all again.
    fn invalidate_aliases(&mut self) {
        for (_, symbol) in self.graph.symbols.iter_mut() {
            if let Some(slots) = symbol.alias.as_mut() {
                *slots = Default::default();
            }
        }
        self.aliases_stale = true;
    }

    /// Bind every unit that is not bound yet, then re-resolve aliases if
    /// anything changed. Returns the number of units bound.
    pub fn bind_all(&mut self) -> usize {
        let pending: Vec<UnitId> = self
            .units
            .ids()
            .filter(|&id| self.units.state(id) == Some(UnitState::Unbound))
            .collect();
        for &id in &pending {
            self.bind_unit(id);
        }
        if !pending.is_empty() || self.aliases_stale {
            self.resolve_aliases();
        }
        pending.len()
    }

    fn bind_unit(&mut self, id: UnitId) {
        let Some(entry) = self.units.entry_mut(id) else {
            return;
        };
        entry.state = UnitState::Binding;
        let path = entry.path.clone();

        let result =
            Binder::new(&mut self.graph, &self.units, &mut self.ctx, id).and_then(Binder::bind_unit);
        let (state, diagnostics) = match result {
            Ok(outcome) => (UnitState::Bound, outcome.diagnostics),
            Err(err) => {
                warn!(path = %path, error = %err, "binding aborted");
                let event = DiagnosticEvent {
                    file: path,
                    start: 0,
                    length: 0,
                    code: diagnostic_codes::INTERNAL_ERROR_WHILE_BINDING_0,
                    args: vec![err.to_string()],
                };
                (UnitState::Failed, vec![event])
            }
        };
        if let Some(entry) = self.units.entry_mut(id) {
            entry.state = state;
            entry.bind_diagnostics = diagnostics;
        }
    }

    fn resolve_aliases(&mut self) {
        let bound: Vec<UnitId> = self
            .units
            .ids()
            .filter(|&id| self.units.state(id) == Some(UnitState::Bound))
            .collect();
        for id in bound {
            let diagnostics = resolve_unit_aliases(&mut self.graph, &self.units, id);
            if let Some(entry) = self.units.entry_mut(id) {
                entry.alias_diagnostics = diagnostics;
            }
        }
        self.aliases_stale = false;
    }

    /// Look a script-level name up across the program, preferring a symbol
    /// declared in `from_unit_path`.
    pub fn find_top_level_symbol(
        &mut self,
        name: &str,
        mask: KindMask,
        from_unit_path: Option<&str>,
    ) -> Option<SymbolId> {
        self.bind_all();
        let from_unit = from_unit_path.and_then(|p| self.units.id_of(p));
        self.graph.find_top_level(name, mask, from_unit)
    }

    /// Binder and alias diagnostics of one unit.
    pub fn unit_diagnostics(&mut self, path: &str) -> Result<Vec<DiagnosticEvent>, RegistryError> {
        let id = self
            .units
            .id_of(path)
            .ok_or_else(|| RegistryError::UnknownUnit(path.to_string()))?;
        self.bind_all();
        Ok(self
            .units
            .entry(id)
            .map(|e| {
                e.bind_diagnostics
                    .iter()
                    .chain(&e.alias_diagnostics)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Every unit's diagnostics, in registration order.
    pub fn diagnostics(&mut self) -> DiagnosticBag {
        self.bind_all();
        let mut bag = DiagnosticBag::new();
        for id in self.units.ids() {
            if let Some(entry) = self.units.entry(id) {
                bag.extend(entry.bind_diagnostics.iter().cloned());
                bag.extend(entry.alias_diagnostics.iter().cloned());
            }
        }
        bag
    }

    /// Emit one unit into its own output. An internal emitter failure is
    /// reported as a diagnostic on an empty output.
    pub fn emit_unit(&mut self, path: &str) -> Result<EmitOutput, RegistryError> {
        let id = self
            .units
            .id_of(path)
            .ok_or_else(|| RegistryError::UnknownUnit(path.to_string()))?;
        self.bind_all();
        let file_name = output_file_name(path).unwrap_or_else(|| format!("{path}.js"));
        let mut session = EmitSession::new(self.options.clone(), file_name);
        let mut failures = Vec::new();
        self.emit_into(&mut session, id, &mut failures);
        Ok(self.finish_session(session, failures))
    }

    pub(crate) fn emit_into(&self, session: &mut EmitSession, id: UnitId, failures: &mut Vec<DiagnosticEvent>) {
        let text = self.units.source(id).map_or("", UnitSource::text);
        if let Err(err) = session.emit_unit(&self.graph, &self.units, id, text) {
            let path = self.units.unit_path(id).unwrap_or_default().to_string();
            failures.push(emit_failure(path, &err));
        }
    }

    pub(crate) fn finish_session(&self, session: EmitSession, mut failures: Vec<DiagnosticEvent>) -> EmitOutput {
        let file_name = session.file_name().to_string();
        let mut output = match session.finish() {
            Ok(output) => output,
            Err(err) => {
                failures.push(emit_failure(file_name.clone(), &err));
                EmitOutput {
                    file_name,
                    ..EmitOutput::default()
                }
            }
        };
        output.diagnostics.extend(failures);
        info!(
            file = %output.file_name,
            bytes = output.text.len(),
            diagnostics = output.diagnostics.len(),
            "output emitted"
        );
        output
    }
}

fn emit_failure(file: String, err: &dyn std::error::Error) -> DiagnosticEvent {
    DiagnosticEvent {
        file,
        start: 0,
        length: 0,
        code: diagnostic_codes::INTERNAL_ERROR_WHILE_EMITTING_0,
        args: vec![err.to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tspull_decl::{DeclFlags, DeclKind};

    fn source(name: &str) -> UnitSource {
        let mut b = DeclTreeBuilder::with_source(format!("var {name};"));
        let span = b.locate(&format!("var {name};"));
        b.leaf(DeclKind::Variable, name, DeclFlags::empty(), span);
        UnitSource::from_builder(b)
    }

    #[test]
    fn test_unit_mid_bind_rejects_changes() {
        let mut registry = Registry::new(CompilerOptions::default());
        let id = registry.add_unit("a.ts", source("a")).expect("fresh path");
        if let Some(entry) = registry.units.entry_mut(id) {
            entry.state = UnitState::Binding;
        }

        assert_eq!(
            registry.update_unit("a.ts", source("b")),
            Err(RegistryError::UnitBusy("a.ts".to_string()))
        );
        assert_eq!(
            registry.remove_unit("a.ts"),
            Err(RegistryError::UnitBusy("a.ts".to_string()))
        );
        assert_eq!(registry.units.source(id).map(UnitSource::text), Some("var a;"));
    }

    #[test]
    fn test_unit_order_follows_registration_after_removal() {
        let mut registry = Registry::new(CompilerOptions::default());
        let a = registry.add_unit("a.ts", source("a")).expect("fresh path");
        let b = registry.add_unit("b.ts", source("b")).expect("fresh path");
        let c = registry.add_unit("c.ts", source("c")).expect("fresh path");
        registry.remove_unit("b.ts").expect("registered");

        assert_eq!(registry.units.unit_order(a), 0);
        assert_eq!(registry.units.unit_order(c), 1);
        assert!(registry.units.tree(b).is_none());
        assert_eq!(registry.units.ids().collect::<Vec<_>>(), vec![a, c]);
    }
}
