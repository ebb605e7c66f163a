//! Functions: declarations, expressions, parameter lowering and `this`
//! capture.

use tspull_decl::{DeclFlags, DeclId};

use super::Printer;
use crate::errors::EmitError;
use crate::helpers::{REST_INDEX, THIS_CAPTURE};

impl<'s, 'a> Printer<'s, 'a> {
    pub(crate) fn emit_function_declaration(&mut self, id: DeclId) -> Result<(), EmitError> {
        let decl = self.decl(id)?;
        self.out.ctx.declare(&decl.name);
        self.write(&format!("function {}", decl.name));
        self.emit_parameter_list(id)?;
        self.write(" ");
        self.emit_function_body(id)?;
        self.write_line();
        self.emit_export_assignment(id)
    }

    /// Arrow functions lower to plain function expressions; the arrow's
    /// `this` reads the enclosing `_this`.
    pub(crate) fn emit_function_expression(&mut self, id: DeclId) -> Result<(), EmitError> {
        let decl = self.decl(id)?;
        if decl.name.is_empty() || decl.is_arrow() {
            self.write("function ");
        } else {
            self.write(&format!("function {}", decl.name));
        }
        self.emit_parameter_list(id)?;
        self.write(" ");
        self.emit_function_body(id)
    }

    /// `(a, b)`, leaving out a rest parameter.
    pub(crate) fn emit_parameter_list(&mut self, id: DeclId) -> Result<(), EmitError> {
        let tree = self.tree;
        let names: Vec<&str> = tree
            .parameters(id)
            .filter_map(|p| tree.get(p))
            .filter(|p| !p.has_flag(DeclFlags::REST))
            .map(|p| p.name.as_str())
            .collect();
        self.write("(");
        self.write(&names.join(", "));
        self.write(")");
        Ok(())
    }

    /// `{ prologue; body }` of a function-like declaration.
    pub(crate) fn emit_function_body(&mut self, id: DeclId) -> Result<(), EmitError> {
        self.open_block();
        self.out.ctx.push_scope(id);
        self.emit_function_prologue(id)?;
        self.emit_body(id)?;
        self.out.ctx.pop_scope(id)?;
        self.close_block();
        Ok(())
    }

    /// `this` capture, default-parameter guards and rest collection.
    pub(crate) fn emit_function_prologue(&mut self, id: DeclId) -> Result<(), EmitError> {
        self.emit_this_capture(id);
        self.emit_default_parameters(id)?;
        self.emit_rest_parameter(id)
    }

    /// `var _this = this;` for a declaration whose arrow functions use
    /// `this`.
    pub(crate) fn emit_this_capture(&mut self, id: DeclId) {
        if self
            .tree
            .get(id)
            .is_some_and(|d| d.has_flag(DeclFlags::MUST_CAPTURE_THIS))
        {
            self.write(&format!("var {THIS_CAPTURE} = this;"));
            self.write_line();
        }
    }

    fn emit_default_parameters(&mut self, id: DeclId) -> Result<(), EmitError> {
        let tree = self.tree;
        for param in tree.parameters(id) {
            let decl = self.decl(param)?;
            let Some(init) = decl.initializer.as_ref() else {
                continue;
            };
            if decl.has_flag(DeclFlags::REST) {
                continue;
            }
            self.write(&format!("if (typeof {0} === \"undefined\") {{ {0} = ", decl.name));
            self.emit_code(param, init)?;
            self.write("; }");
            self.write_line();
        }
        Ok(())
    }

    fn emit_rest_parameter(&mut self, id: DeclId) -> Result<(), EmitError> {
        let tree = self.tree;
        let Some((index, rest)) = tree
            .parameters(id)
            .enumerate()
            .find(|(_, p)| tree.get(*p).is_some_and(|d| d.has_flag(DeclFlags::REST)))
        else {
            return Ok(());
        };
        let name = &self.decl(rest)?.name;
        self.write(&format!("var {name} = [];"));
        self.write_line();
        self.write(&format!(
            "for (var {REST_INDEX} = 0; {REST_INDEX} < (arguments.length - {index}); {REST_INDEX}++) "
        ));
        self.open_block();
        self.write(&format!("{name}[{REST_INDEX}] = arguments[{REST_INDEX} + {index}];"));
        self.write_line();
        self.close_block();
        self.write_line();
        Ok(())
    }
}
