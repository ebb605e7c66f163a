//! Statement lists, variables, imports and code fragments.

use tspull_common::TextSpan;
use tspull_decl::{AliasTarget, BodyItem, Code, DeclId, DeclKind, Fragment};

use super::Printer;
use crate::errors::EmitError;
use crate::helpers::SUPER_PARAM;

impl<'s, 'a> Printer<'s, 'a> {
    /// Emit every item of `owner`'s statement list, one per line.
    pub(crate) fn emit_body(&mut self, owner: DeclId) -> Result<(), EmitError> {
        let decl = self.decl(owner)?;
        let Some(body) = decl.body.as_ref() else {
            return Ok(());
        };
        self.emit_body_items(owner, body)
    }

    pub(crate) fn emit_body_items(&mut self, owner: DeclId, items: &'a [BodyItem]) -> Result<(), EmitError> {
        for item in items {
            match item {
                BodyItem::Stmt { code, span } => self.emit_statement(owner, code, *span)?,
                BodyItem::Decl(id) => self.emit_declaration(*id)?,
            }
        }
        Ok(())
    }

    pub(crate) fn emit_statement(&mut self, owner: DeclId, code: &'a Code, span: TextSpan) -> Result<(), EmitError> {
        self.out.writer.ensure_line_start();
        self.start_mapping(span, None);
        self.emit_code(owner, code)?;
        self.end_mapping()?;
        self.write_line();
        Ok(())
    }

    /// Emit one statement-level declaration, if it produces output.
    pub(crate) fn emit_declaration(&mut self, id: DeclId) -> Result<(), EmitError> {
        if !self.should_emit(id) {
            return Ok(());
        }
        let decl = self.decl(id)?;
        self.out.writer.ensure_line_start();
        self.emit_comments(id)?;

        self.start_mapping(decl.span, Some(&decl.name));
        match decl.kind {
            DeclKind::Container => self.emit_module(id)?,
            DeclKind::Enum => self.emit_enum(id)?,
            DeclKind::Class => self.emit_class(id)?,
            DeclKind::Function => self.emit_function_declaration(id)?,
            DeclKind::Variable => self.emit_variable(id)?,
            DeclKind::TypeAlias => self.emit_import(id)?,
            _ => {}
        }
        self.end_mapping()?;
        self.out.writer.ensure_line_start();
        Ok(())
    }

    /// `M` for an exported member of module `M`, `exports` for an exported
    /// member of an external module.
    pub(crate) fn export_qualifier(&self, id: DeclId) -> Option<String> {
        let decl = self.tree.get(id)?;
        if !decl.is_exported() {
            return None;
        }
        let parent = self.parent_of(id)?;
        match parent.kind {
            DeclKind::Container => Some(parent.name.clone()),
            DeclKind::DynamicModule => Some("exports".to_string()),
            _ => None,
        }
    }

    /// `M.f = f;` after an exported function, class, module or enum.
    pub(crate) fn emit_export_assignment(&mut self, id: DeclId) -> Result<(), EmitError> {
        let Some(qualifier) = self.export_qualifier(id) else {
            return Ok(());
        };
        let name = &self.decl(id)?.name;
        self.out.writer.ensure_line_start();
        self.write(&format!("{qualifier}.{name} = {name};"));
        self.write_line();
        Ok(())
    }

    fn emit_variable(&mut self, id: DeclId) -> Result<(), EmitError> {
        let decl = self.decl(id)?;
        match (self.export_qualifier(id), decl.initializer.as_ref()) {
            (Some(qualifier), Some(init)) => {
                self.write(&format!("{qualifier}.{} = ", decl.name));
                self.emit_code(id, init)?;
                self.write(";");
            }
            // an exported variable without initializer exists only as a property
            (Some(_), None) => return Ok(()),
            (None, Some(init)) => {
                self.out.ctx.declare(&decl.name);
                self.write(&format!("var {} = ", decl.name));
                self.emit_code(id, init)?;
                self.write(";");
            }
            (None, None) => {
                self.out.ctx.declare(&decl.name);
                self.write(&format!("var {};", decl.name));
            }
        }
        self.write_line();
        Ok(())
    }

    /// Whether an import alias denotes something with a runtime value.
    pub(crate) fn alias_has_value(&self, id: DeclId) -> bool {
        let Some(decl) = self.tree.get(id) else {
            return false;
        };
        if matches!(decl.alias, Some(AliasTarget::ExternalModule(_))) {
            return true;
        }
        let Some(slots) = self
            .graph
            .symbol_of(self.dref(id))
            .and_then(|s| self.graph.symbol(s))
            .and_then(|s| s.alias)
        else {
            return false;
        };
        if slots.value.is_some() {
            return true;
        }
        self.graph
            .symbol(slots.container)
            .is_some_and(|c| c.instance_symbol.is_some())
    }

    fn emit_import(&mut self, id: DeclId) -> Result<(), EmitError> {
        let decl = self.decl(id)?;
        let Some(target) = decl.alias.as_ref() else {
            return Ok(());
        };
        let qualifier = self.export_qualifier(id);
        match target {
            AliasTarget::ExternalModule(module) => {
                // AMD imports become parameters of the define callback
                if self.in_amd_module() {
                    return Ok(());
                }
                self.out.ctx.declare(&decl.name);
                self.write(&format!("var {} = require(\"{module}\");", decl.name));
                if let Some(qualifier) = qualifier {
                    self.write_line();
                    self.write(&format!("{qualifier}.{0} = {0};", decl.name));
                }
            }
            AliasTarget::Entity(path) => {
                match qualifier {
                    Some(qualifier) => self.write(&format!("{qualifier}.{} = ", decl.name)),
                    None => {
                        self.out.ctx.declare(&decl.name);
                        self.write(&format!("var {} = ", decl.name));
                    }
                }
                if let Some((first, rest)) = path.split_first() {
                    self.emit_reference(id, first, decl.name_span)?;
                    for segment in rest {
                        self.write(".");
                        self.write(segment);
                    }
                }
                self.write(";");
            }
        }
        self.write_line();
        Ok(())
    }

    // =========================================================================
    // Code fragments
    // =========================================================================

    /// Print a code payload owned by `owner`.
    pub(crate) fn emit_code(&mut self, owner: DeclId, code: &'a Code) -> Result<(), EmitError> {
        for fragment in code.iter() {
            match fragment {
                Fragment::Text(text) => self.write(text),
                Fragment::Ref { name, span } => self.emit_reference(owner, name, *span)?,
                Fragment::This => {
                    let this = self.this_text(owner);
                    self.write(this);
                }
                Fragment::SuperCall(args) => {
                    let this = self.this_text(owner);
                    self.write(&format!("{SUPER_PARAM}.call({this}"));
                    if !args.is_empty() {
                        self.write(", ");
                        self.emit_code(owner, args)?;
                    }
                    self.write(")");
                }
                Fragment::Decl(id) => self.emit_embedded(*id)?,
            }
        }
        Ok(())
    }

    fn emit_embedded(&mut self, id: DeclId) -> Result<(), EmitError> {
        if !self.should_emit(id) {
            return Ok(());
        }
        let decl = self.decl(id)?;
        match decl.kind {
            DeclKind::FunctionExpression => self.emit_function_expression(id),
            DeclKind::CatchBlock => self.emit_catch_block(id),
            DeclKind::WithBlock => self.emit_with_block(id),
            _ => Ok(()),
        }
    }

    fn emit_catch_block(&mut self, id: DeclId) -> Result<(), EmitError> {
        let tree = self.tree;
        let variable = tree
            .children_of_kind(id, DeclKind::Variable)
            .next()
            .and_then(|v| tree.get(v))
            .map(|v| v.name.as_str())
            .unwrap_or("e");
        self.write(&format!("catch ({variable}) "));
        self.open_block();
        self.out.ctx.push_scope(id);
        self.emit_body(id)?;
        self.out.ctx.pop_scope(id)?;
        self.close_block();
        Ok(())
    }

    fn emit_with_block(&mut self, id: DeclId) -> Result<(), EmitError> {
        let decl = self.decl(id)?;
        self.write("with (");
        if let Some(object) = decl.initializer.as_ref() {
            self.emit_code(id, object)?;
        }
        self.write(") ");
        self.open_block();
        self.out.ctx.push_scope(id);
        self.emit_body(id)?;
        self.out.ctx.pop_scope(id)?;
        self.close_block();
        Ok(())
    }
}
