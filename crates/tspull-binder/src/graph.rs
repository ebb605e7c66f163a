//! The session-wide symbol graph.
//!
//! Ownership edges: declaration -> symbol (`decl_symbols`), symbol ->
//! members/enclosed tables, symbol -> enclosing container. Global
//! (script-level) symbols are additionally indexed in the global cache.
//! Function-like declarations own a local scope table.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};
use tspull_decl::{DeclFlags, DeclLookup, DeclRef, UnitId};

use crate::signatures::{Signature, SignatureArena, SignatureId};
use crate::symbols::{KindMask, MemberTable, Symbol, SymbolArena, SymbolFlags, SymbolId, SymbolKind};

/// What a unit removal discarded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RemovalStats {
    pub declarations_removed: usize,
    pub symbols_destroyed: usize,
}

pub fn decl_symbol_flags(flags: DeclFlags) -> SymbolFlags {
    let mut out = SymbolFlags::empty();
    if flags.contains(DeclFlags::EXPORTED) {
        out |= SymbolFlags::EXPORTED;
    }
    if flags.contains(DeclFlags::AMBIENT) {
        out |= SymbolFlags::AMBIENT;
    }
    if flags.contains(DeclFlags::STATIC) {
        out |= SymbolFlags::STATIC;
    }
    if flags.contains(DeclFlags::PRIVATE) {
        out |= SymbolFlags::PRIVATE;
    }
    if flags.contains(DeclFlags::OPTIONAL) {
        out |= SymbolFlags::OPTIONAL;
    }
    if flags.contains(DeclFlags::IMPLICIT_VARIABLE) {
        out |= SymbolFlags::IMPLICIT;
    }
    out
}

#[derive(Clone, Debug, Default)]
pub struct SymbolGraph {
    pub symbols: SymbolArena,
    pub signatures: SignatureArena,
    globals: MemberTable,
    decl_symbols: FxHashMap<DeclRef, SymbolId>,
    locals: FxHashMap<DeclRef, MemberTable>,
    bound: FxHashSet<DeclRef>,
    /// First enum declaration -> unit whose pass reported the rule.
    enum_rule_reported: FxHashMap<DeclRef, UnitId>,
}

impl SymbolGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn symbol(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(id)
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> Option<&mut Symbol> {
        self.symbols.get_mut(id)
    }

    pub fn signature(&self, id: SignatureId) -> Option<&Signature> {
        self.signatures.get(id)
    }

    pub fn kind_of(&self, id: SymbolId) -> Option<SymbolKind> {
        self.symbols.get(id).map(|s| s.kind)
    }

    pub fn symbol_of(&self, decl: DeclRef) -> Option<SymbolId> {
        self.decl_symbols.get(&decl).copied()
    }

    pub fn is_bound(&self, decl: DeclRef) -> bool {
        self.bound.contains(&decl)
    }

    /// Returns false if the declaration was already bound.
    pub fn mark_bound(&mut self, decl: DeclRef) -> bool {
        self.bound.insert(decl)
    }

    pub fn globals(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.globals.iter()
    }

    pub fn locals_of(&self, scope: DeclRef) -> Option<&MemberTable> {
        self.locals.get(&scope)
    }

    pub(crate) fn enum_rule_reported(&self, decl: DeclRef) -> bool {
        self.enum_rule_reported.contains_key(&decl)
    }

    pub(crate) fn mark_enum_rule_reported(&mut self, decl: DeclRef, reporter: UnitId) {
        self.enum_rule_reported.insert(decl, reporter);
    }

    // =========================================================================
    // Creation and linking
    // =========================================================================

    pub fn create_symbol(&mut self, name: &str, kind: SymbolKind) -> SymbolId {
        let id = self.symbols.alloc(Symbol::new(name, kind));
        trace!(name, ?kind, id = id.0, "created symbol");
        id
    }

    /// Record `decl` as a declaration of `symbol` and map it back.
    pub fn link_decl(&mut self, decl: DeclRef, symbol: SymbolId, flags: DeclFlags) {
        self.decl_symbols.insert(decl, symbol);
        self.attach_decl(symbol, decl, flags);
    }

    /// Record a declaration on a symbol without claiming the reverse mapping.
    pub fn attach_decl(&mut self, symbol: SymbolId, decl: DeclRef, flags: DeclFlags) {
        if let Some(sym) = self.symbols.get_mut(symbol) {
            if !sym.declarations.contains(&decl) {
                sym.declarations.push(decl);
            }
            sym.flags |= decl_symbol_flags(flags);
        }
    }

    pub fn add_signature(&mut self, signature: Signature) -> SignatureId {
        self.signatures.alloc(signature)
    }

    pub fn add_member(&mut self, parent: SymbolId, symbol: SymbolId) {
        let Some(name) = self.symbols.get(symbol).map(|s| s.name.clone()) else {
            return;
        };
        if let Some(p) = self.symbols.get_mut(parent) {
            p.members.insert(&name, symbol);
        }
        if let Some(s) = self.symbols.get_mut(symbol) {
            s.container = parent;
        }
    }

    pub fn add_enclosed(&mut self, parent: SymbolId, symbol: SymbolId) {
        let Some(name) = self.symbols.get(symbol).map(|s| s.name.clone()) else {
            return;
        };
        if let Some(p) = self.symbols.get_mut(parent) {
            p.enclosed.insert(&name, symbol);
        }
        if let Some(s) = self.symbols.get_mut(symbol) {
            s.container = parent;
        }
    }

    pub fn add_local(&mut self, scope: DeclRef, symbol: SymbolId) {
        let Some(name) = self.symbols.get(symbol).map(|s| s.name.clone()) else {
            return;
        };
        self.locals.entry(scope).or_default().insert(&name, symbol);
    }

    pub fn add_global(&mut self, symbol: SymbolId) {
        let Some(name) = self.symbols.get(symbol).map(|s| s.name.clone()) else {
            return;
        };
        self.globals.insert(&name, symbol);
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    fn first_match(&self, candidates: &[SymbolId], mask: KindMask) -> Option<SymbolId> {
        candidates
            .iter()
            .copied()
            .find(|&id| self.symbols.get(id).is_some_and(|s| s.matches(mask)))
    }

    pub fn find_member(&self, parent: SymbolId, name: &str, mask: KindMask) -> Option<SymbolId> {
        let parent = self.symbols.get(parent)?;
        self.first_match(parent.members.get(name), mask)
    }

    pub fn find_enclosed(&self, parent: SymbolId, name: &str, mask: KindMask) -> Option<SymbolId> {
        let parent = self.symbols.get(parent)?;
        self.first_match(parent.enclosed.get(name), mask)
    }

    pub fn find_local(&self, scope: DeclRef, name: &str, mask: KindMask) -> Option<SymbolId> {
        let table = self.locals.get(&scope)?;
        self.first_match(table.get(name), mask)
    }

    pub fn find_global(&self, name: &str, mask: KindMask) -> Option<SymbolId> {
        self.first_match(self.globals.get(name), mask)
    }

    /// Global lookup that prefers a symbol declared in `from_unit`.
    pub fn find_top_level(&self, name: &str, mask: KindMask, from_unit: Option<UnitId>) -> Option<SymbolId> {
        let candidates = self.globals.get(name);
        if let Some(unit) = from_unit {
            let local = candidates.iter().copied().find(|&id| {
                self.symbols.get(id).is_some_and(|s| {
                    s.matches(mask) && s.declarations.iter().any(|d| d.unit == unit)
                })
            });
            if local.is_some() {
                return local;
            }
        }
        self.first_match(candidates, mask)
    }

    // =========================================================================
    // Replacement and removal
    // =========================================================================

    /// Move everything `old` owns to a fresh symbol of `kind`, drop its
    /// synthesized signatures, and rewrite every reference to it.
    pub fn replace_symbol(&mut self, old: SymbolId, kind: SymbolKind) -> Option<SymbolId> {
        let mut symbol = self.symbols.get(old)?.clone();
        let synthesized: Vec<SignatureId> = symbol
            .construct_signatures
            .iter()
            .copied()
            .filter(|&s| self.signatures.get(s).is_some_and(|sig| sig.synthesized))
            .collect();
        symbol.construct_signatures.retain(|s| !synthesized.contains(s));
        for sig in synthesized {
            self.signatures.free(sig);
        }
        symbol.kind = kind;
        symbol.flags.remove(SymbolFlags::SYNTHESIZED);

        let new = self.symbols.alloc(symbol);
        self.rewrite_references(old, new);
        self.symbols.free(old);
        debug!(old = old.0, new = new.0, ?kind, "replaced symbol");
        Some(new)
    }

    fn rewrite_references(&mut self, old: SymbolId, new: SymbolId) {
        let swap = |slot: &mut SymbolId| {
            if *slot == old {
                *slot = new;
            }
        };
        for (_, sym) in self.symbols.iter_mut() {
            swap(&mut sym.container);
            swap(&mut sym.type_symbol);
            swap(&mut sym.instance_symbol);
            swap(&mut sym.constructor);
            sym.type_parameters.iter_mut().for_each(swap);
            if let Some(alias) = sym.alias.as_mut() {
                swap(&mut alias.value);
                swap(&mut alias.type_symbol);
                swap(&mut alias.container);
            }
            sym.members.replace(old, new);
            sym.enclosed.replace(old, new);
        }
        self.globals.replace(old, new);
        for table in self.locals.values_mut() {
            table.replace(old, new);
        }
        for target in self.decl_symbols.values_mut() {
            swap(target);
        }
        let owned: Vec<SignatureId> = self
            .signatures
            .iter()
            .filter(|(_, s)| s.owner == old)
            .map(|(id, _)| id)
            .collect();
        for id in owned {
            if let Some(sig) = self.signatures.get_mut(id) {
                sig.owner = new;
            }
        }
    }

    /// Other units whose binding leaned on `unit`: they declare a symbol
    /// that `unit` created, or one carrying a failed cross-file merge.
    pub fn units_depending_on(&self, unit: UnitId) -> Vec<UnitId> {
        let mut found = Vec::new();
        for (_, sym) in self.symbols.iter() {
            let created = sym.declarations.first().is_some_and(|d| d.unit == unit);
            let shared = sym.declarations.iter().any(|d| d.unit == unit);
            if !created && !(shared && sym.has_flag(SymbolFlags::MERGE_ERROR)) {
                continue;
            }
            for d in &sym.declarations {
                if d.unit != unit && !found.contains(&d.unit) {
                    found.push(d.unit);
                }
            }
        }
        found
    }

    /// Discard every declaration contributed by `unit`. Symbols left with no
    /// declaration are destroyed; survivors re-aggregate their flags from
    /// the remaining declarations.
    pub fn remove_unit(&mut self, unit: UnitId, lookup: &dyn DeclLookup) -> RemovalStats {
        let mut stats = RemovalStats::default();
        let mut touched = Vec::new();
        for (id, sym) in self.symbols.iter_mut() {
            let before = sym.declarations.len();
            sym.declarations.retain(|d| d.unit != unit);
            if sym.declarations.len() != before {
                stats.declarations_removed += before - sym.declarations.len();
                touched.push(id);
            }
        }

        let doomed: Vec<(SignatureId, SymbolId)> = self
            .signatures
            .iter()
            .filter(|(_, s)| s.decl.unit == unit)
            .map(|(id, s)| (id, s.owner))
            .collect();
        for (sig, owner) in doomed {
            if let Some(sym) = self.symbols.get_mut(owner) {
                sym.call_signatures.retain(|s| *s != sig);
                sym.construct_signatures.retain(|s| *s != sig);
                sym.index_signatures.retain(|s| *s != sig);
                if sym.getter == Some(sig) {
                    sym.getter = None;
                }
                if sym.setter == Some(sig) {
                    sym.setter = None;
                }
            }
            self.signatures.free(sig);
        }

        self.decl_symbols.retain(|r, _| r.unit != unit);
        self.locals.retain(|r, _| r.unit != unit);
        self.bound.retain(|r| r.unit != unit);
        self.enum_rule_reported
            .retain(|first, reporter| first.unit != unit && *reporter != unit);

        for id in touched {
            let empty = self
                .symbols
                .get(id)
                .is_some_and(|s| s.declarations.is_empty());
            if empty {
                self.destroy_symbol(id);
                stats.symbols_destroyed += 1;
            } else {
                self.refresh_flags(id, lookup);
            }
        }
        debug!(
            unit = unit.0,
            declarations = stats.declarations_removed,
            destroyed = stats.symbols_destroyed,
            "removed unit from symbol graph"
        );
        stats
    }

    fn destroy_symbol(&mut self, id: SymbolId) {
        let Some(sym) = self.symbols.free(id) else {
            return;
        };
        trace!(name = %sym.name, id = id.0, "destroying symbol");
        if let Some(container) = self.symbols.get_mut(sym.container) {
            container.members.remove(&sym.name, id);
            container.enclosed.remove(&sym.name, id);
        }
        self.globals.remove(&sym.name, id);
        for table in self.locals.values_mut() {
            table.remove(&sym.name, id);
        }
        let clear = |slot: &mut SymbolId| {
            if *slot == id {
                *slot = SymbolId::NONE;
            }
        };
        for (_, other) in self.symbols.iter_mut() {
            clear(&mut other.container);
            clear(&mut other.type_symbol);
            clear(&mut other.instance_symbol);
            clear(&mut other.constructor);
            other.type_parameters.retain(|t| *t != id);
            if let Some(alias) = other.alias.as_mut()
                && (alias.value == id || alias.type_symbol == id || alias.container == id)
            {
                *alias = Default::default();
            }
        }
        for sig in sym.all_signatures() {
            self.signatures.free(sig);
        }
        self.decl_symbols.retain(|_, s| *s != id);
    }

    fn refresh_flags(&mut self, id: SymbolId, lookup: &dyn DeclLookup) {
        let Some(sym) = self.symbols.get(id) else {
            return;
        };
        let mut flags = sym.flags & (SymbolFlags::SYNTHESIZED | SymbolFlags::ISOLATED);
        for decl in &sym.declarations {
            if let Some(d) = lookup.decl(*decl) {
                flags |= decl_symbol_flags(d.flags);
            }
        }
        if let Some(sym) = self.symbols.get_mut(id) {
            sym.flags = flags;
        }
    }
}
