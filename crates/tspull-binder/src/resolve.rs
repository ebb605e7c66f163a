//! Scope resolution of value names, as the emitter needs it.
//!
//! The emitter never asks *what* a name means, only *how to spell it* in the
//! output: bare, through `this`, or qualified by the enclosing module, enum,
//! class or `exports`.

use tracing::trace;
use tspull_decl::{DeclFlags, DeclId, DeclKind, DeclLookup, DeclRef, DeclTree};

use crate::graph::SymbolGraph;
use crate::symbols::{KindMask, SymbolId, SymbolKind};

/// Where a name was found, from the emitter's point of view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValueHit {
    /// Function or closure scope, or not found at all.
    Bare,
    /// Instance member of the enclosing class.
    InstanceMember,
    /// Exported member of a module, enum or static class side; the payload
    /// is the qualifying name.
    Qualified(String),
    /// Exported member of an external module.
    Exported,
}

const MEMBER_KINDS: KindMask = KindMask::PROPERTY.union(KindMask::METHOD).union(KindMask::ACCESSOR);

/// Resolve `name` as referenced from code owned by `from`.
pub fn resolve_value(graph: &SymbolGraph, units: &dyn DeclLookup, from: DeclRef, name: &str) -> ValueHit {
    let Some(tree) = units.tree(from.unit) else {
        return ValueHit::Bare;
    };
    let hit = Walk {
        graph,
        units,
        tree,
        from,
        name,
    }
    .run(from.decl);
    trace!(name, ?hit, "resolved value name");
    hit
}

struct Walk<'a> {
    graph: &'a SymbolGraph,
    units: &'a dyn DeclLookup,
    tree: &'a DeclTree,
    from: DeclRef,
    name: &'a str,
}

/// The class member whose code is being resolved.
#[derive(Clone, Copy)]
struct MemberContext {
    is_static: bool,
    /// A non-arrow function lies between the member and the reference.
    rebinds_this: bool,
}

impl Walk<'_> {
    fn dref(&self, id: DeclId) -> DeclRef {
        DeclRef::new(self.from.unit, id)
    }

    fn run(&self, from: DeclId) -> ValueHit {
        let mut member: Option<MemberContext> = None;
        let mut crossed_function = false;

        for id in std::iter::once(from).chain(self.tree.ancestors(from)) {
            let Some(decl) = self.tree.get(id) else {
                break;
            };
            match decl.kind {
                kind if kind.is_function_like() || kind == DeclKind::CatchBlock => {
                    if self.graph.find_local(self.dref(id), self.name, KindMask::SOME_VALUE).is_some() {
                        return ValueHit::Bare;
                    }
                    match kind {
                        DeclKind::Method
                        | DeclKind::Constructor
                        | DeclKind::GetAccessor
                        | DeclKind::SetAccessor => {
                            if member.is_none() {
                                member = Some(MemberContext {
                                    is_static: decl.is_static(),
                                    rebinds_this: crossed_function,
                                });
                            }
                        }
                        DeclKind::Function | DeclKind::FunctionExpression if !decl.is_arrow() => {
                            crossed_function = true;
                        }
                        _ => {}
                    }
                }
                DeclKind::Property => {
                    if member.is_none() {
                        member = Some(MemberContext {
                            is_static: decl.is_static(),
                            rebinds_this: crossed_function,
                        });
                    }
                }
                DeclKind::WithBlock => return ValueHit::Bare,
                DeclKind::Class => {
                    if let Some(ctx) = member.take()
                        && !ctx.rebinds_this
                        && let Some(hit) = self.class_member(id, ctx.is_static)
                    {
                        return hit;
                    }
                    crossed_function = true;
                }
                DeclKind::Container => {
                    if let Some(hit) = self.container_member(id) {
                        return hit;
                    }
                }
                DeclKind::Enum => {
                    if let Some(sym) = self.graph.symbol_of(self.dref(id))
                        && self.graph.find_member(sym, self.name, KindMask::ENUM_MEMBER).is_some()
                    {
                        return ValueHit::Qualified(decl.name.clone());
                    }
                }
                DeclKind::DynamicModule => {
                    if let Some(hit) = self.dynamic_module_member(id) {
                        return hit;
                    }
                }
                DeclKind::Script => return ValueHit::Bare,
                _ => {}
            }
        }
        ValueHit::Bare
    }

    fn class_member(&self, class_id: DeclId, is_static: bool) -> Option<ValueHit> {
        let class = self.graph.symbol_of(self.dref(class_id))?;
        if is_static {
            let ctor = self.graph.symbol(class)?.constructor;
            self.graph.find_member(ctor, self.name, MEMBER_KINDS)?;
            let name = self.tree.get(class_id)?.name.clone();
            Some(ValueHit::Qualified(name))
        } else {
            self.graph.find_member(class, self.name, MEMBER_KINDS)?;
            Some(ValueHit::InstanceMember)
        }
    }

    fn container_member(&self, id: DeclId) -> Option<ValueHit> {
        let container = self.graph.symbol_of(self.dref(id))?;
        let instance = self.graph.symbol(container)?.instance_symbol;
        if instance.is_none() {
            return None;
        }
        if let Some(hit) = self.graph.find_member(instance, self.name, KindMask::SOME_VALUE) {
            if self.has_local_binding(hit, id) {
                return Some(ValueHit::Bare);
            }
            let name = self.tree.get(id)?.name.clone();
            return Some(ValueHit::Qualified(name));
        }
        self.graph
            .find_enclosed(instance, self.name, KindMask::SOME_VALUE)
            .map(|_| ValueHit::Bare)
    }

    fn dynamic_module_member(&self, id: DeclId) -> Option<ValueHit> {
        let module = self.graph.symbol_of(self.dref(id))?;
        if let Some(hit) = self.graph.find_member(module, self.name, KindMask::SOME_VALUE) {
            if self.has_local_binding(hit, id) {
                return Some(ValueHit::Bare);
            }
            return Some(ValueHit::Exported);
        }
        self.graph
            .find_enclosed(module, self.name, KindMask::SOME_VALUE)
            .map(|_| ValueHit::Bare)
    }

    /// Exported functions, classes, modules and enums also exist as a local
    /// inside the closure of the declaration that introduced them.
    fn has_local_binding(&self, symbol: SymbolId, scope: DeclId) -> bool {
        let Some(sym) = self.graph.symbol(symbol) else {
            return false;
        };
        if sym.kind == SymbolKind::Variable
            && !sym.declarations.iter().any(|r| {
                self.units
                    .decl(*r)
                    .is_some_and(|d| d.has_flag(DeclFlags::IMPLICIT_VARIABLE))
            })
        {
            return false;
        }
        sym.declarations.iter().any(|r| {
            r.unit == self.from.unit
                && self.units.decl(*r).is_some_and(|d| {
                    d.parent == scope
                        && (d.kind == DeclKind::Function || d.has_flag(DeclFlags::IMPLICIT_VARIABLE))
                })
        })
    }
}
