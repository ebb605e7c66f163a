//! Variable, function, parameter and type parameter binding.

use smallvec::SmallVec;
use tracing::debug;
use tspull_common::diagnostic_codes;
use tspull_decl::{DeclFlags, DeclId, DeclKind};

use crate::errors::BindError;
use crate::signatures::{Signature, SignatureId, SignatureKind};
use crate::state::{Binder, ParentScope};
use crate::symbols::{KindMask, SymbolFlags, SymbolId, SymbolKind};

/// How a new variable declaration relates to a previous same-named value
/// symbol in the same lookup scope.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RedeclarationFacts {
    pub is_implicit: bool,
    pub is_module_value: bool,
    pub is_enum_value: bool,
    pub is_class_ctor_var: bool,
    pub prev_is_enum: bool,
    pub prev_is_class_ctor_var: bool,
    pub prev_is_module_value: bool,
    pub prev_is_implicit: bool,
    pub prev_is_function: bool,
    pub prev_is_function_like: bool,
    pub ambient_or_prev_ambient: bool,
    pub share_parent: bool,
    pub prev_is_param: bool,
    pub same_file: bool,
}

/// What to do with a variable redeclaration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Redeclaration {
    /// Share the previous symbol.
    Merge,
    /// Share the previous symbol, but the merge spans files with a
    /// non-ambient function or class.
    MergeAcrossFiles,
    /// Reject: duplicate identifier.
    Duplicate,
}

impl RedeclarationFacts {
    /// The implicit-variable redeclaration matrix.
    pub fn decide(&self) -> Redeclaration {
        let acceptable = self.prev_is_param
            || (self.is_implicit
                && ((!self.is_enum_value && !self.is_class_ctor_var && self.prev_is_function)
                    || ((self.is_module_value || self.is_enum_value)
                        && (self.prev_is_module_value || self.prev_is_enum))
                    || (self.is_class_ctor_var
                        && self.prev_is_module_value
                        && self.ambient_or_prev_ambient)
                    || (self.is_module_value && self.prev_is_class_ctor_var)));

        if !acceptable || self.prev_is_param {
            let conflicting = !self.prev_is_param
                && (self.is_implicit || self.prev_is_implicit || self.prev_is_function_like);
            if conflicting || !self.share_parent {
                return Redeclaration::Duplicate;
            }
            // two explicit vars, or a var redeclaring a parameter
            return Redeclaration::Merge;
        }

        if (self.prev_is_class_ctor_var || self.prev_is_function)
            && !self.ambient_or_prev_ambient
            && !self.same_file
        {
            return Redeclaration::MergeAcrossFiles;
        }
        Redeclaration::Merge
    }
}

impl<'a> Binder<'a> {
    // =========================================================================
    // Variables
    // =========================================================================

    pub(crate) fn bind_variable_declaration(&mut self, id: DeclId) -> Result<(), BindError> {
        let decl = self.decl(id)?;

        // the owner was already rejected as a duplicate
        if decl.value_of.is_some()
            && let Some(owner) = self.graph.symbol_of(self.dref(decl.value_of))
            && self.is_isolated(owner)
        {
            let kind = if decl.has_flag(DeclFlags::CLASS_CONSTRUCTOR_VARIABLE) {
                SymbolKind::ConstructorMethod
            } else {
                SymbolKind::Variable
            };
            let symbol = self.new_symbol(&decl.name, kind, None);
            self.link(id, symbol)?;
            return self.link_value_side(id, symbol, true);
        }

        let scope = self.get_parent(id)?;
        let exported = decl.is_exported();
        let existing = self.find_in_parent(scope, &decl.name, KindMask::SOME_VALUE, exported);

        let mut symbol = None;
        if let Some(prev) = existing {
            let facts = self.redeclaration_facts(id, prev)?;
            match facts.decide() {
                Redeclaration::Duplicate => self.report_duplicate(id),
                Redeclaration::Merge => symbol = Some(prev),
                Redeclaration::MergeAcrossFiles => {
                    let prev_file = self
                        .graph
                        .symbol(prev)
                        .and_then(|s| s.declarations.first())
                        .and_then(|d| self.units.unit_path(d.unit))
                        .unwrap_or("")
                        .to_string();
                    self.report(
                        id,
                        diagnostic_codes::MODULE_CANNOT_MERGE_WITH_PREVIOUS_DECLARATION_IN_A_DIFFERENT_FILE,
                        &[&decl.name, &decl.name, &prev_file],
                    );
                    if let Some(sym) = self.graph.symbol_mut(prev) {
                        sym.flags |= SymbolFlags::MERGE_ERROR;
                    }
                    symbol = Some(prev);
                }
            }
            if symbol.is_some() && !(facts.is_module_value && facts.prev_is_module_value) {
                self.check_exports_match(id, prev);
            }
        } else if !decl.has_flag(DeclFlags::IMPLICIT_VARIABLE)
            && let Some(other) = self.find_export_mismatch(scope, &decl.name, KindMask::SOME_VALUE, exported)
            && !self.is_isolated(other)
        {
            self.report(
                id,
                diagnostic_codes::ALL_DECLARATIONS_OF_MERGED_DECLARATION_MUST_BE_EXPORTED_OR_NOT_EXPORTED,
                &[&decl.name],
            );
        }

        let is_class_ctor_var = decl.has_flag(DeclFlags::CLASS_CONSTRUCTOR_VARIABLE);
        let created = symbol.is_none();
        let symbol = match symbol {
            Some(symbol) => symbol,
            None => {
                let kind = if is_class_ctor_var {
                    SymbolKind::ConstructorMethod
                } else {
                    SymbolKind::Variable
                };
                let register = existing.is_none().then_some((scope, exported));
                let symbol = self.new_symbol(&decl.name, kind, register);
                if is_class_ctor_var && let Some(sym) = self.graph.symbol_mut(symbol) {
                    sym.flags |= SymbolFlags::SYNTHESIZED;
                }
                symbol
            }
        };
        self.link(id, symbol)?;

        if decl.value_of.is_some() {
            self.link_value_side(id, symbol, created)?;
        }
        Ok(())
    }

    fn redeclaration_facts(&self, id: DeclId, prev: SymbolId) -> Result<RedeclarationFacts, BindError> {
        let decl = self.decl(id)?;
        let prev_sym = self
            .graph
            .symbol(prev)
            .ok_or(BindError::DanglingSymbol(prev))?;
        let prev_decl_ref = prev_sym.declarations.first().copied();
        let prev_decl = prev_decl_ref.and_then(|r| self.units.decl(r));

        let prev_parent_kind = prev_decl_ref.and_then(|r| {
            let tree = self.units.tree(r.unit)?;
            tree.parent(r.decl).and_then(|p| tree.kind(p))
        });
        let both_global = prev_parent_kind == Some(DeclKind::Script) && self.parent_kind(id) == Some(DeclKind::Script);
        let same_parent = prev_decl_ref.is_some_and(|r| r.unit == self.unit)
            && prev_decl.is_some_and(|p| p.parent == decl.parent);
        let share_parent = both_global || same_parent;

        let is_function = |k: DeclKind| k == DeclKind::Function;
        let prev_is_function = prev_sym.declarations.iter().any(|r| {
            self.units.decl(*r).is_some_and(|d| is_function(d.kind))
        });

        Ok(RedeclarationFacts {
            is_implicit: decl.has_flag(DeclFlags::IMPLICIT_VARIABLE),
            is_module_value: decl.has_flag(DeclFlags::INITIALIZED_MODULE),
            is_enum_value: decl.has_flag(DeclFlags::INITIALIZED_ENUM),
            is_class_ctor_var: decl.has_flag(DeclFlags::CLASS_CONSTRUCTOR_VARIABLE),
            prev_is_enum: self.any_decl_has(prev, DeclFlags::INITIALIZED_ENUM),
            prev_is_class_ctor_var: self.any_decl_has(prev, DeclFlags::CLASS_CONSTRUCTOR_VARIABLE),
            prev_is_module_value: self.all_decls_have(prev, DeclFlags::INITIALIZED_MODULE),
            prev_is_implicit: self.any_decl_has(prev, DeclFlags::IMPLICIT_VARIABLE),
            prev_is_function,
            prev_is_function_like: prev_sym.kind.is_function_like() && !prev_sym.has_flag(SymbolFlags::SYNTHESIZED),
            ambient_or_prev_ambient: decl.is_ambient() || self.all_decls_have(prev, DeclFlags::AMBIENT),
            share_parent,
            prev_is_param: share_parent && prev_sym.kind == SymbolKind::Parameter && decl.kind == DeclKind::Variable,
            same_file: prev_decl_ref.is_some_and(|r| r.unit == self.unit),
        })
    }

    /// Every declaration of a merged symbol must agree on export.
    fn check_exports_match(&mut self, id: DeclId, prev: SymbolId) {
        let Ok(decl) = self.decl(id) else {
            return;
        };
        let prev_exported = self
            .graph
            .symbol(prev)
            .and_then(|s| s.declarations.first().copied())
            .and_then(|r| self.units.decl(r))
            .map(|d| d.is_exported());
        if prev_exported.is_some_and(|p| p != decl.is_exported()) {
            self.report(
                id,
                diagnostic_codes::ALL_DECLARATIONS_OF_MERGED_DECLARATION_MUST_BE_EXPORTED_OR_NOT_EXPORTED,
                &[&decl.name],
            );
        }
    }

    /// Connect an implicit variable to the module, enum or class it stands
    /// for.
    fn link_value_side(&mut self, id: DeclId, symbol: SymbolId, created: bool) -> Result<(), BindError> {
        let decl = self.decl(id)?;
        let Some(owner) = self.graph.symbol_of(self.dref(decl.value_of)) else {
            return Ok(());
        };

        if decl.has_flag(DeclFlags::CLASS_CONSTRUCTOR_VARIABLE) {
            if let Some(class) = self.graph.symbol_mut(owner)
                && class.constructor.is_none()
            {
                class.constructor = symbol;
            }
            if let Some(sym) = self.graph.symbol_mut(symbol)
                && sym.type_symbol.is_none()
            {
                sym.type_symbol = owner;
            }
            if created {
                // default constructor, replaced by a declared one
                let signature = Signature {
                    kind: SignatureKind::Construct,
                    decl: self.dref(id),
                    owner: symbol,
                    parameters: Vec::new(),
                    parameter_types: Vec::new(),
                    return_type: Some(decl.name.clone()),
                    type_parameters: Vec::new(),
                    is_definition: true,
                    has_var_args: false,
                    synthesized: true,
                };
                let sig = self.graph.add_signature(signature);
                if let Some(sym) = self.graph.symbol_mut(symbol) {
                    sym.construct_signatures.push(sig);
                }
            }
        } else {
            if let Some(container) = self.graph.symbol_mut(owner)
                && container.instance_symbol.is_none()
            {
                container.instance_symbol = symbol;
            }
            if let Some(sym) = self.graph.symbol_mut(symbol)
                && sym.type_symbol.is_none()
            {
                sym.type_symbol = owner;
            }
        }
        Ok(())
    }

    // =========================================================================
    // Functions
    // =========================================================================

    pub(crate) fn bind_function_declaration(&mut self, id: DeclId) -> Result<(), BindError> {
        let decl = self.decl(id)?;
        let scope = self.get_parent(id)?;
        let exported = decl.is_exported();
        let existing = self.find_in_parent(scope, &decl.name, KindMask::SOME_VALUE, exported);

        let symbol = match existing {
            Some(prev)
                if self.graph.kind_of(prev) == Some(SymbolKind::Function)
                    && !(decl.is_definition() && self.has_definition(prev, SignatureKind::Call)) =>
            {
                self.check_exports_match(id, prev);
                prev
            }
            Some(_) => {
                self.report_duplicate(id);
                self.new_symbol(&decl.name, SymbolKind::Function, None)
            }
            None => self.new_symbol(&decl.name, SymbolKind::Function, Some((scope, exported))),
        };
        self.link(id, symbol)?;
        self.bind_call_signature(id, symbol, SignatureKind::Call, true)?;
        self.callables.push(symbol);
        Ok(())
    }

    /// Function expressions are never registered in their parent. A named
    /// one is visible inside its own body.
    pub(crate) fn bind_function_expression(&mut self, id: DeclId) -> Result<(), BindError> {
        let decl = self.decl(id)?;
        let symbol = self.graph.create_symbol(&decl.name, SymbolKind::Function);
        if !decl.name.is_empty() {
            self.graph.add_local(self.dref(id), symbol);
        }
        self.link(id, symbol)?;
        self.bind_call_signature(id, symbol, SignatureKind::Call, true)?;
        Ok(())
    }

    /// Build the signature a function-like declaration contributes and
    /// attach it to `owner`.
    pub(crate) fn bind_call_signature(
        &mut self,
        id: DeclId,
        owner: SymbolId,
        kind: SignatureKind,
        with_type_parameters: bool,
    ) -> Result<SignatureId, BindError> {
        let signature = self.build_signature(id, owner, kind, with_type_parameters)?;

        // identical overloads are reported, but still recorded
        if !signature.is_definition
            && kind != SignatureKind::Index
            && let Some(sym) = self.graph.symbol(owner)
        {
            let list = match kind {
                SignatureKind::Call => &sym.call_signatures,
                SignatureKind::Construct => &sym.construct_signatures,
                SignatureKind::Index => &sym.index_signatures,
            };
            let duplicate = list
                .iter()
                .filter_map(|s| self.graph.signature(*s))
                .any(|s| !s.is_definition && !s.synthesized && s.same_shape(&signature));
            if duplicate {
                let name = self.decl(id)?.name.as_str();
                self.report(id, diagnostic_codes::DUPLICATE_OVERLOAD_SIGNATURE, &[name]);
            }
        }

        let sig = self.graph.add_signature(signature);
        if let Some(sym) = self.graph.symbol_mut(owner) {
            match kind {
                SignatureKind::Call => sym.call_signatures.push(sig),
                SignatureKind::Construct => sym.construct_signatures.push(sig),
                SignatureKind::Index => sym.index_signatures.push(sig),
            }
        }
        Ok(sig)
    }

    /// Bind the type parameters and parameters of `id` and describe the
    /// resulting signature, without attaching it anywhere.
    pub(crate) fn build_signature(
        &mut self,
        id: DeclId,
        owner: SymbolId,
        kind: SignatureKind,
        with_type_parameters: bool,
    ) -> Result<Signature, BindError> {
        let decl = self.decl(id)?;
        let type_parameters = if with_type_parameters {
            self.bind_type_parameters(id, true)?
        } else {
            Vec::new()
        };
        let (parameters, parameter_types, has_var_args) = self.bind_parameters(id)?;

        let return_type = match kind {
            SignatureKind::Construct if decl.kind == DeclKind::Constructor => self
                .tree
                .parent(id)
                .and_then(|p| self.tree.get(p))
                .map(|class| class.name.clone()),
            _ => decl.type_annotation.clone(),
        };
        Ok(Signature {
            kind,
            decl: self.dref(id),
            owner,
            parameters,
            parameter_types,
            return_type,
            type_parameters,
            is_definition: decl.is_definition(),
            has_var_args,
            synthesized: false,
        })
    }

    // =========================================================================
    // Parameters
    // =========================================================================

    /// Bind the parameters of a function-like or signature declaration into
    /// its local scope.
    pub(crate) fn bind_parameters(&mut self, owner: DeclId) -> Result<(Vec<SymbolId>, Vec<String>, bool), BindError> {
        let params: SmallVec<[DeclId; 4]> = self.tree.parameters(owner).collect();
        let scope = self.dref(owner);
        let mut symbols = Vec::with_capacity(params.len());
        let mut types = Vec::with_capacity(params.len());
        let mut has_var_args = false;

        for (index, &param) in params.iter().enumerate() {
            self.graph.mark_bound(self.dref(param));
            let decl = self.decl(param)?;
            let is_rest = decl.has_flag(DeclFlags::REST);
            if is_rest && index + 1 != params.len() {
                self.report(param, diagnostic_codes::A_REST_PARAMETER_MUST_BE_LAST_IN_A_PARAMETER_LIST, &[]);
            }
            has_var_args |= is_rest && index + 1 == params.len();

            let symbol = if self.graph.find_local(scope, &decl.name, KindMask::PARAMETER).is_some() {
                self.report_duplicate(param);
                self.new_symbol(&decl.name, SymbolKind::Parameter, None)
            } else {
                self.new_symbol(&decl.name, SymbolKind::Parameter, Some((ParentScope::Locals(scope), false)))
            };
            self.link(param, symbol)?;
            if (decl.initializer.is_some() || is_rest)
                && let Some(sym) = self.graph.symbol_mut(symbol)
            {
                sym.flags |= SymbolFlags::OPTIONAL;
            }
            symbols.push(symbol);
            types.push(decl.type_annotation.clone().unwrap_or_else(|| "any".to_string()));
        }
        Ok((symbols, types, has_var_args))
    }

    // =========================================================================
    // Type parameters
    // =========================================================================

    /// Bind the type parameters declared on `owner`. With `use_cache`,
    /// unconstrained type parameters are shared by name until the cache is
    /// reset at the next class/interface/object-type scope.
    pub(crate) fn bind_type_parameters(&mut self, owner: DeclId, use_cache: bool) -> Result<Vec<SymbolId>, BindError> {
        let type_params: SmallVec<[DeclId; 2]> = self.tree.type_parameters(owner).collect();
        let mut bound: Vec<SymbolId> = Vec::with_capacity(type_params.len());
        let mut seen: SmallVec<[&str; 2]> = SmallVec::new();

        for tp in type_params {
            self.graph.mark_bound(self.dref(tp));
            let decl = self.decl(tp)?;
            let name = decl.name.as_str();

            let symbol = if seen.contains(&name) {
                self.report_duplicate(tp);
                self.new_symbol(name, SymbolKind::TypeParameter, None)
            } else {
                let cached = if use_cache && decl.constraint.is_none() {
                    self.ctx
                        .type_parameter_cache
                        .get(name)
                        .copied()
                        .filter(|&s| self.graph.kind_of(s) == Some(SymbolKind::TypeParameter))
                } else {
                    None
                };
                match cached {
                    Some(symbol) => {
                        debug!(name, symbol = symbol.0, "reusing cached type parameter");
                        symbol
                    }
                    None => {
                        let symbol = self.graph.create_symbol(name, SymbolKind::TypeParameter);
                        if use_cache && decl.constraint.is_none() {
                            self.ctx.type_parameter_cache.insert(name.to_string(), symbol);
                        }
                        symbol
                    }
                }
            };
            seen.push(name);
            self.link(tp, symbol)?;
            bound.push(symbol);
        }
        Ok(bound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn implicit() -> RedeclarationFacts {
        RedeclarationFacts {
            is_implicit: true,
            share_parent: true,
            same_file: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_two_explicit_vars_merge() {
        let facts = RedeclarationFacts {
            share_parent: true,
            same_file: true,
            ..Default::default()
        };
        assert_eq!(facts.decide(), Redeclaration::Merge);
    }

    #[test]
    fn test_explicit_vars_in_different_parents_are_duplicates() {
        let facts = RedeclarationFacts::default();
        assert_eq!(facts.decide(), Redeclaration::Duplicate);
    }

    #[test]
    fn test_var_after_parameter_merges() {
        let facts = RedeclarationFacts {
            share_parent: true,
            prev_is_param: true,
            same_file: true,
            ..Default::default()
        };
        assert_eq!(facts.decide(), Redeclaration::Merge);
    }

    #[test]
    fn test_module_value_after_function_merges() {
        let facts = RedeclarationFacts {
            is_module_value: true,
            prev_is_function: true,
            prev_is_function_like: true,
            ..implicit()
        };
        assert_eq!(facts.decide(), Redeclaration::Merge);
    }

    #[test]
    fn test_enum_value_after_function_is_duplicate() {
        let facts = RedeclarationFacts {
            is_enum_value: true,
            prev_is_function: true,
            prev_is_function_like: true,
            ..implicit()
        };
        assert_eq!(facts.decide(), Redeclaration::Duplicate);
    }

    #[test]
    fn test_class_after_non_ambient_module_is_duplicate() {
        let facts = RedeclarationFacts {
            is_class_ctor_var: true,
            prev_is_module_value: true,
            prev_is_implicit: true,
            ..implicit()
        };
        assert_eq!(facts.decide(), Redeclaration::Duplicate);

        let ambient = RedeclarationFacts {
            ambient_or_prev_ambient: true,
            ..facts
        };
        assert_eq!(ambient.decide(), Redeclaration::Merge);
    }

    #[test]
    fn test_module_after_class_in_other_file_flags_merge() {
        let facts = RedeclarationFacts {
            is_module_value: true,
            prev_is_class_ctor_var: true,
            prev_is_implicit: true,
            prev_is_function_like: false,
            same_file: false,
            ..implicit()
        };
        assert_eq!(facts.decide(), Redeclaration::MergeAcrossFiles);
    }

    #[test]
    fn test_explicit_var_after_implicit_module_value_is_duplicate() {
        let facts = RedeclarationFacts {
            prev_is_module_value: true,
            prev_is_implicit: true,
            share_parent: true,
            same_file: true,
            ..Default::default()
        };
        assert_eq!(facts.decide(), Redeclaration::Duplicate);
    }

    #[test]
    fn test_var_after_function_is_duplicate() {
        let facts = RedeclarationFacts {
            prev_is_function: true,
            prev_is_function_like: true,
            share_parent: true,
            same_file: true,
            ..Default::default()
        };
        assert_eq!(facts.decide(), Redeclaration::Duplicate);
    }
}
