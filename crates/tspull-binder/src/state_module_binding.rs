//! Module, enum and dynamic module binding.

use tracing::debug;
use tspull_common::diagnostic_codes;
use tspull_decl::{DeclId, DeclKind, DeclRef};

use crate::errors::BindError;
use crate::state::{Binder, ParentScope};
use crate::symbols::{KindMask, SymbolId, SymbolKind};

/// Symbol name of a dynamic module. Quoted so it never collides with an
/// identifier-named container in the global cache; `./a.ts`, `a` and
/// `"a"` all name the same module.
pub fn dynamic_module_name(name: &str) -> String {
    let name = name.trim_matches('"');
    let name = name.strip_prefix("./").unwrap_or(name);
    let name = name
        .strip_suffix(".d.ts")
        .or_else(|| name.strip_suffix(".ts"))
        .unwrap_or(name);
    format!("\"{name}\"")
}

impl<'a> Binder<'a> {
    pub(crate) fn bind_module_declaration(&mut self, id: DeclId) -> Result<(), BindError> {
        let decl = self.decl(id)?;
        let kind = match decl.kind {
            DeclKind::Enum => SymbolKind::Enum,
            DeclKind::DynamicModule => SymbolKind::DynamicModule,
            _ => SymbolKind::Container,
        };
        let name = if kind == SymbolKind::DynamicModule {
            dynamic_module_name(&decl.name)
        } else {
            decl.name.clone()
        };

        if kind == SymbolKind::DynamicModule && self.parent_kind(id) != Some(DeclKind::Script) {
            self.report(
                id,
                diagnostic_codes::AMBIENT_EXTERNAL_MODULE_DECLARATION_CANNOT_BE_NESTED_IN_OTHER_MODULES,
                &[],
            );
        }

        let scope = self.get_parent(id)?;
        let exported = decl.is_exported();
        let mut existing = self.find_in_parent(scope, &name, KindMask::SOME_CONTAINER, exported);
        let mut isolated = false;

        if let Some(prev) = existing
            && self.graph.kind_of(prev) != Some(kind)
        {
            self.report_duplicate(id);
            existing = None;
            isolated = true;
        }

        if existing.is_none()
            && !isolated
            && let Some(other) = self.find_export_mismatch(scope, &name, KindMask::SOME_CONTAINER, exported)
            && self.graph.kind_of(other) == Some(kind)
        {
            self.report(
                id,
                diagnostic_codes::ALL_DECLARATIONS_OF_MERGED_DECLARATION_MUST_BE_EXPORTED_OR_NOT_EXPORTED,
                &[&decl.name],
            );
        }

        let symbol = match existing {
            Some(symbol) => {
                debug!(name = %name, symbol = symbol.0, "merging module declaration");
                symbol
            }
            None => {
                let register = (!isolated).then_some((scope, exported));
                self.new_symbol(&name, kind, register)
            }
        };
        self.link(id, symbol)?;

        if kind == SymbolKind::Enum {
            self.check_enum_initializers(symbol);
        }
        if decl.value_decl.is_some() {
            self.bind_declaration(decl.value_decl)?;
        }
        Ok(())
    }

    /// When an enum has several declarations, the textually first one must
    /// initialize its first member.
    fn check_enum_initializers(&mut self, symbol: SymbolId) {
        let Some(sym) = self.graph.symbol(symbol) else {
            return;
        };
        let enum_decls: Vec<DeclRef> = sym
            .declarations
            .iter()
            .copied()
            .filter(|d| self.units.decl(*d).is_some_and(|decl| decl.kind == DeclKind::Enum))
            .collect();
        if enum_decls.len() < 2 {
            return;
        }
        let units = self.units;
        let Some(first) = enum_decls.iter().copied().min_by_key(|d| {
            let start = units.decl(*d).map(|decl| decl.span.start).unwrap_or(u32::MAX);
            (units.unit_order(d.unit), start)
        }) else {
            return;
        };
        if self.graph.enum_rule_reported(first) {
            return;
        }
        let Some(first_tree) = units.tree(first.unit) else {
            return;
        };
        let Some(first_member) = first_tree
            .children_of_kind(first.decl, DeclKind::EnumMember)
            .next()
        else {
            return;
        };
        let has_initializer = first_tree
            .get(first_member)
            .is_some_and(|m| m.initializer.is_some());
        if !has_initializer {
            self.graph.mark_enum_rule_reported(first, self.unit);
            self.report_at(
                first,
                diagnostic_codes::ENUMS_WITH_MULTIPLE_DECLARATIONS_MUST_PROVIDE_AN_INITIALIZER_FOR_THE_FIRST_ENUM_ELEMENT,
                &[],
            );
        }
    }

    pub(crate) fn bind_enum_member(&mut self, id: DeclId) -> Result<(), BindError> {
        let decl = self.decl(id)?;
        let scope = self.get_parent(id)?;
        let existing = self.find_in_parent(scope, &decl.name, KindMask::all(), true);
        let symbol = if existing.is_some() {
            self.report_duplicate(id);
            self.new_symbol(&decl.name, SymbolKind::EnumMember, None)
        } else {
            self.new_symbol(&decl.name, SymbolKind::EnumMember, Some((scope, true)))
        };
        if let ParentScope::Symbol(parent) = scope
            && let Some(sym) = self.graph.symbol_mut(symbol)
        {
            sym.type_symbol = parent;
        }
        self.link(id, symbol)
    }
}
