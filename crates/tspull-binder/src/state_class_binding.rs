//! Classes, interfaces, object types and their members.

use smallvec::SmallVec;
use tracing::debug;
use tspull_common::diagnostic_codes;
use tspull_decl::{DeclFlags, DeclId, DeclKind};

use crate::errors::BindError;
use crate::signatures::SignatureKind;
use crate::state::{Binder, ParentScope};
use crate::symbols::{KindMask, SymbolFlags, SymbolId, SymbolKind};

impl<'a> Binder<'a> {
    // =========================================================================
    // Named types
    // =========================================================================

    pub(crate) fn bind_class_declaration(&mut self, id: DeclId) -> Result<(), BindError> {
        let symbol = self.bind_named_type(id, SymbolKind::Class)?;
        let decl = self.decl(id)?;
        if decl.value_decl.is_some() {
            self.bind_declaration(decl.value_decl)?;
        }
        debug!(name = %decl.name, symbol = symbol.0, "bound class");
        Ok(())
    }

    pub(crate) fn bind_interface_declaration(&mut self, id: DeclId) -> Result<(), BindError> {
        self.bind_named_type(id, SymbolKind::Interface)?;
        Ok(())
    }

    /// Classes and interfaces never merge with another named type.
    fn bind_named_type(&mut self, id: DeclId, kind: SymbolKind) -> Result<SymbolId, BindError> {
        let decl = self.decl(id)?;
        let scope = self.get_parent(id)?;
        let exported = decl.is_exported();
        let existing = self.find_in_parent(scope, &decl.name, KindMask::SOME_NAMED_TYPE, exported);

        let symbol = if existing.is_some() {
            self.report_duplicate(id);
            self.new_symbol(&decl.name, kind, None)
        } else {
            if let Some(other) = self.find_export_mismatch(scope, &decl.name, KindMask::SOME_NAMED_TYPE, exported)
                && !self.is_isolated(other)
            {
                self.report(
                    id,
                    diagnostic_codes::ALL_DECLARATIONS_OF_MERGED_DECLARATION_MUST_BE_EXPORTED_OR_NOT_EXPORTED,
                    &[&decl.name],
                );
            }
            self.new_symbol(&decl.name, kind, Some((scope, exported)))
        };
        self.link(id, symbol)?;

        self.ctx.reset_type_parameter_cache();
        let type_parameters = self.bind_type_parameters(id, false)?;
        if let Some(sym) = self.graph.symbol_mut(symbol) {
            sym.type_parameters = type_parameters;
        }
        Ok(symbol)
    }

    /// Anonymous `{ ... }` types get a type literal that is never
    /// registered by name.
    pub(crate) fn bind_object_type(&mut self, id: DeclId) -> Result<(), BindError> {
        let symbol = self.graph.create_symbol("", SymbolKind::TypeLiteral);
        self.link(id, symbol)?;
        self.ctx.reset_type_parameter_cache();
        Ok(())
    }

    /// `(x: T) => U` and `new (x: T) => U` types.
    pub(crate) fn bind_function_type(&mut self, id: DeclId) -> Result<(), BindError> {
        let decl = self.decl(id)?;
        let symbol = self.graph.create_symbol("", SymbolKind::TypeLiteral);
        self.link(id, symbol)?;
        let kind = if decl.kind == DeclKind::ConstructorType {
            SignatureKind::Construct
        } else {
            SignatureKind::Call
        };
        self.bind_call_signature(id, symbol, kind, true)?;
        Ok(())
    }

    /// Call, construct and index signatures of an interface or object type.
    pub(crate) fn bind_signature_member(&mut self, id: DeclId) -> Result<(), BindError> {
        let decl = self.decl(id)?;
        let Some(parent) = self.tree.parent(id) else {
            return Ok(());
        };
        let owner = self.ensure_bound_symbol(parent)?;
        let kind = match decl.kind {
            DeclKind::ConstructSignature => SignatureKind::Construct,
            DeclKind::IndexSignature => SignatureKind::Index,
            _ => SignatureKind::Call,
        };

        if kind == SignatureKind::Index {
            let key_type = self
                .tree
                .parameters(id)
                .next()
                .and_then(|p| self.tree.get(p))
                .and_then(|p| p.type_annotation.as_deref());
            let code = match key_type {
                Some("string") => Some(diagnostic_codes::DUPLICATE_STRING_INDEX_SIGNATURE),
                Some("number") => Some(diagnostic_codes::DUPLICATE_NUMBER_INDEX_SIGNATURE),
                _ => None,
            };
            if let Some(code) = code
                && self.has_index_signature(owner, key_type.unwrap_or_default())
            {
                self.report(id, code, &[]);
            }
        }
        self.bind_call_signature(id, owner, kind, kind != SignatureKind::Index)?;
        Ok(())
    }

    fn has_index_signature(&self, owner: SymbolId, key_type: &str) -> bool {
        let Some(sym) = self.graph.symbol(owner) else {
            return false;
        };
        sym.index_signatures
            .iter()
            .filter_map(|s| self.graph.signature(*s))
            .any(|s| s.parameter_types.first().is_some_and(|t| t == key_type))
    }

    // =========================================================================
    // Members
    // =========================================================================

    pub(crate) fn bind_property_declaration(&mut self, id: DeclId) -> Result<(), BindError> {
        let decl = self.decl(id)?;
        let scope = self.get_parent(id)?;
        let symbol = if self.find_in_parent(scope, &decl.name, KindMask::all(), true).is_some() {
            self.report_duplicate(id);
            self.new_symbol(&decl.name, SymbolKind::Property, None)
        } else {
            self.new_symbol(&decl.name, SymbolKind::Property, Some((scope, true)))
        };
        self.link(id, symbol)
    }

    pub(crate) fn bind_method_declaration(&mut self, id: DeclId) -> Result<(), BindError> {
        let decl = self.decl(id)?;
        let scope = self.get_parent(id)?;
        let existing = self.find_in_parent(scope, &decl.name, KindMask::all(), true);

        let symbol = match existing {
            Some(prev)
                if self.graph.kind_of(prev) == Some(SymbolKind::Method)
                    && !(decl.is_definition() && self.has_definition(prev, SignatureKind::Call)) =>
            {
                prev
            }
            Some(_) => {
                self.report_duplicate(id);
                self.new_symbol(&decl.name, SymbolKind::Method, None)
            }
            None => self.new_symbol(&decl.name, SymbolKind::Method, Some((scope, true))),
        };
        self.link(id, symbol)?;
        self.bind_call_signature(id, symbol, SignatureKind::Call, true)?;
        self.callables.push(symbol);
        Ok(())
    }

    /// A declared constructor replaces the synthesized default one.
    pub(crate) fn bind_constructor_declaration(&mut self, id: DeclId) -> Result<(), BindError> {
        let decl = self.decl(id)?;
        let Some(class_id) = self.tree.parent(id) else {
            return Err(BindError::UnboundParent {
                name: "constructor".to_string(),
            });
        };
        let class = self.ensure_bound_symbol(class_id)?;
        let ctor = self.class_constructor(class_id, class)?;

        let replaceable = self.graph.symbol(ctor).is_some_and(|s| {
            s.has_flag(SymbolFlags::SYNTHESIZED) || s.kind != SymbolKind::ConstructorMethod
        });
        let symbol = if replaceable {
            self.graph
                .replace_symbol(ctor, SymbolKind::ConstructorMethod)
                .ok_or(BindError::DanglingSymbol(ctor))?
        } else if decl.is_definition() && self.has_definition(ctor, SignatureKind::Construct) {
            self.report(id, diagnostic_codes::MULTIPLE_CONSTRUCTOR_IMPLEMENTATIONS_ARE_NOT_ALLOWED, &[]);
            let name = self.decl(class_id)?.name.as_str();
            self.new_symbol(name, SymbolKind::ConstructorMethod, None)
        } else {
            ctor
        };
        self.link(id, symbol)?;
        self.bind_call_signature(id, symbol, SignatureKind::Construct, true)?;
        self.callables.push(symbol);

        self.bind_parameter_properties(id, class)
    }

    /// `constructor(public x: T)` also declares `x` on the class.
    fn bind_parameter_properties(&mut self, ctor: DeclId, class: SymbolId) -> Result<(), BindError> {
        let params: SmallVec<[DeclId; 4]> = self.tree.parameters(ctor).collect();
        for param in params {
            let decl = self.decl(param)?;
            if !decl.has_flag(DeclFlags::PROPERTY_PARAMETER) {
                continue;
            }
            let scope = ParentScope::Symbol(class);
            let symbol = if self.find_in_parent(scope, &decl.name, KindMask::all(), true).is_some() {
                self.report_duplicate(param);
                self.new_symbol(&decl.name, SymbolKind::Property, None)
            } else {
                self.new_symbol(&decl.name, SymbolKind::Property, Some((scope, true)))
            };
            self.graph.attach_decl(symbol, self.dref(param), decl.flags);
        }
        Ok(())
    }

    /// Getters and setters of one name pair into a single Accessor symbol.
    pub(crate) fn bind_accessor_declaration(&mut self, id: DeclId) -> Result<(), BindError> {
        let decl = self.decl(id)?;
        let is_getter = decl.kind == DeclKind::GetAccessor;

        let type_params: SmallVec<[DeclId; 2]> = self.tree.type_parameters(id).collect();
        for tp in type_params {
            self.report(tp, diagnostic_codes::ACCESSORS_CANNOT_HAVE_TYPE_PARAMETERS, &[]);
        }

        let scope = self.get_parent(id)?;
        let existing = self.find_in_parent(scope, &decl.name, KindMask::all(), true);
        let symbol = match existing {
            Some(prev) if self.graph.kind_of(prev) == Some(SymbolKind::Accessor) => {
                let taken = self
                    .graph
                    .symbol(prev)
                    .is_some_and(|s| if is_getter { s.getter.is_some() } else { s.setter.is_some() });
                if taken {
                    let code = if is_getter {
                        diagnostic_codes::GETTER_ALREADY_DECLARED
                    } else {
                        diagnostic_codes::SETTER_ALREADY_DECLARED
                    };
                    self.report(id, code, &[]);
                    self.new_symbol(&decl.name, SymbolKind::Accessor, None)
                } else {
                    prev
                }
            }
            Some(_) => {
                self.report_duplicate(id);
                self.new_symbol(&decl.name, SymbolKind::Accessor, None)
            }
            None => self.new_symbol(&decl.name, SymbolKind::Accessor, Some((scope, true))),
        };
        self.link(id, symbol)?;

        let signature = self.build_signature(id, symbol, SignatureKind::Call, false)?;
        let sig = self.graph.add_signature(signature);
        if let Some(sym) = self.graph.symbol_mut(symbol) {
            if is_getter {
                sym.getter = Some(sig);
            } else {
                sym.setter = Some(sig);
            }
        }
        Ok(())
    }
}
