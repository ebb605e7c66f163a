//! Declaration dispatch and whole-unit checks.

use tracing::trace;
use tspull_common::diagnostic_codes;
use tspull_decl::{DeclId, DeclKind};

use crate::errors::BindError;
use crate::signatures::SignatureKind;
use crate::state::Binder;
use crate::symbols::{SymbolFlags, SymbolKind};

impl<'a> Binder<'a> {
    /// Bind one declaration. Idempotent: a declaration already bound (or
    /// being bound further up the stack) is skipped.
    pub fn bind_declaration(&mut self, id: DeclId) -> Result<(), BindError> {
        let decl = self.decl(id)?;
        if !self.graph.mark_bound(self.dref(id)) {
            return Ok(());
        }
        self.bound_count += 1;
        trace!(kind = ?decl.kind, name = %decl.name, decl = id.0, "bind declaration");

        match decl.kind {
            DeclKind::Script | DeclKind::CatchBlock | DeclKind::WithBlock => Ok(()),
            DeclKind::Container | DeclKind::Enum | DeclKind::DynamicModule => {
                self.bind_module_declaration(id)
            }
            DeclKind::EnumMember => self.bind_enum_member(id),
            DeclKind::Class => self.bind_class_declaration(id),
            DeclKind::Interface => self.bind_interface_declaration(id),
            DeclKind::ObjectType => self.bind_object_type(id),
            DeclKind::FunctionType | DeclKind::ConstructorType => self.bind_function_type(id),
            DeclKind::Function => self.bind_function_declaration(id),
            DeclKind::FunctionExpression => self.bind_function_expression(id),
            DeclKind::Variable => self.bind_variable_declaration(id),
            DeclKind::Property => self.bind_property_declaration(id),
            DeclKind::Method => self.bind_method_declaration(id),
            DeclKind::Constructor => self.bind_constructor_declaration(id),
            DeclKind::GetAccessor | DeclKind::SetAccessor => self.bind_accessor_declaration(id),
            DeclKind::CallSignature | DeclKind::ConstructSignature | DeclKind::IndexSignature => {
                self.bind_signature_member(id)
            }
            DeclKind::TypeAlias => self.bind_import_declaration(id),
            // parameters and type parameters are bound with their owner
            DeclKind::Parameter | DeclKind::TypeParameter => {
                if decl.parent.is_some() {
                    let parent_ref = self.dref(decl.parent);
                    if !self.graph.is_bound(parent_ref) {
                        self.bind_declaration(decl.parent)?;
                    }
                }
                Ok(())
            }
        }
    }

    /// Overload sets declared in this unit need one implementation unless
    /// they are ambient or live in a type.
    pub(crate) fn check_implementations(&mut self) {
        let mut seen = Vec::new();
        let callables = std::mem::take(&mut self.callables);
        for symbol in callables {
            if seen.contains(&symbol) {
                continue;
            }
            seen.push(symbol);
            let Some(sym) = self.graph.symbol(symbol) else {
                continue;
            };
            if sym.has_flag(SymbolFlags::SYNTHESIZED) {
                continue;
            }
            let kind = sym.kind;
            let unit = self.unit;

            let mut last_overload = None;
            let mut has_definition = false;
            for decl_ref in sym.declarations.iter().filter(|d| d.unit == unit) {
                let Some(decl) = self.tree.get(decl_ref.decl) else {
                    continue;
                };
                let is_callable = matches!(
                    decl.kind,
                    DeclKind::Function | DeclKind::Method | DeclKind::Constructor
                );
                if !is_callable {
                    continue;
                }
                if decl.is_definition() {
                    has_definition = true;
                } else if !decl.is_ambient()
                    && !matches!(
                        self.parent_kind(decl_ref.decl),
                        Some(DeclKind::Interface | DeclKind::ObjectType)
                    )
                {
                    last_overload = Some(decl_ref.decl);
                }
            }
            if has_definition {
                continue;
            }
            if let Some(decl) = last_overload {
                let code = if kind == SymbolKind::ConstructorMethod {
                    diagnostic_codes::CONSTRUCTOR_IMPLEMENTATION_EXPECTED
                } else {
                    diagnostic_codes::FUNCTION_IMPLEMENTATION_EXPECTED
                };
                self.report(decl, code, &[]);
            }
        }
    }

    /// True if the symbol already owns a definition signature of `kind`.
    pub(crate) fn has_definition(&self, symbol: crate::symbols::SymbolId, kind: SignatureKind) -> bool {
        let Some(sym) = self.graph.symbol(symbol) else {
            return false;
        };
        let list = match kind {
            SignatureKind::Call => &sym.call_signatures,
            SignatureKind::Construct => &sym.construct_signatures,
            SignatureKind::Index => &sym.index_signatures,
        };
        list.iter()
            .filter_map(|s| self.graph.signature(*s))
            .any(|s| s.is_definition)
    }
}
