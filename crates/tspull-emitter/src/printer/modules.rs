//! Module closures, enums and file-level external modules.

use tspull_common::ModuleKind;
use tspull_decl::{AliasTarget, DeclId, DeclKind};

use super::Printer;
use crate::errors::EmitError;

impl<'s, 'a> Printer<'s, 'a> {
    /// ```text
    /// var M;
    /// (function (M) {
    ///     ...
    /// })(M || (M = {}));
    /// ```
    pub(crate) fn emit_module(&mut self, id: DeclId) -> Result<(), EmitError> {
        self.emit_closure_open(id)?;
        self.out.ctx.push_scope(id);
        self.emit_this_capture(id);
        self.emit_body(id)?;
        self.out.ctx.pop_scope(id)?;
        self.emit_closure_close(id)
    }

    /// Enum members with reverse mapping. A member without initializer
    /// continues from the previous member.
    pub(crate) fn emit_enum(&mut self, id: DeclId) -> Result<(), EmitError> {
        let decl = self.decl(id)?;
        let tree = self.tree;
        self.emit_closure_open(id)?;
        self.out.ctx.push_scope(id);

        // (next integer value, previous member name)
        let mut next: Option<i64> = Some(0);
        let mut previous: Option<&str> = None;
        for member_id in tree.children_of_kind(id, DeclKind::EnumMember) {
            let member = self.decl(member_id)?;
            if !self.should_emit(member_id) {
                continue;
            }
            self.start_mapping(member.span, Some(&member.name));
            self.write(&format!("{0}[{0}[\"{1}\"] = ", decl.name, member.name));
            match member.initializer.as_ref() {
                Some(init) => {
                    self.emit_code(member_id, init)?;
                    next = init.as_integer().and_then(|v| v.checked_add(1));
                }
                None => match (next, previous) {
                    (Some(value), _) => {
                        self.write(&value.to_string());
                        next = value.checked_add(1);
                    }
                    (None, Some(prev)) => {
                        self.write(&format!("{}[\"{prev}\"] + 1", decl.name));
                    }
                    (None, None) => self.write("0"),
                },
            }
            self.write(&format!("] = \"{}\";", member.name));
            self.end_mapping()?;
            self.write_line();
            previous = Some(member.name.as_str());
        }

        self.out.ctx.pop_scope(id)?;
        self.emit_closure_close(id)
    }

    /// `var M;` (once per statement list) and the closure header.
    fn emit_closure_open(&mut self, id: DeclId) -> Result<(), EmitError> {
        let name = &self.decl(id)?.name;
        if self.out.ctx.declare(name) {
            self.write(&format!("var {name};"));
            self.write_line();
        }
        self.write(&format!("(function ({name}) "));
        self.open_block();
        Ok(())
    }

    /// `})(M || (M = {}));`, assigning through the parent when exported.
    fn emit_closure_close(&mut self, id: DeclId) -> Result<(), EmitError> {
        let name = &self.decl(id)?.name;
        self.close_block();
        match self.export_qualifier(id) {
            Some(qualifier) => self.write(&format!(
                ")({name} = {qualifier}.{name} || ({qualifier}.{name} = {{}}));"
            )),
            None => self.write(&format!(")({name} || ({name} = {{}}));")),
        }
        self.write_line();
        Ok(())
    }

    // =========================================================================
    // External modules
    // =========================================================================

    pub(crate) fn in_amd_module(&self) -> bool {
        self.options().module == ModuleKind::AMD
    }

    /// The file is a module: CommonJS emits the body as is, AMD wraps it in
    /// a `define` call whose dependencies are the file's imports.
    pub(crate) fn emit_external_module(&mut self, id: DeclId) -> Result<(), EmitError> {
        let decl = self.decl(id)?;
        self.emit_comments(id)?;
        self.start_mapping(decl.span, None);

        if self.in_amd_module() {
            let tree = self.tree;
            let imports: Vec<(&str, &str)> = tree
                .children_of_kind(id, DeclKind::TypeAlias)
                .filter(|&alias| self.should_emit(alias))
                .filter_map(|alias| {
                    let decl = tree.get(alias)?;
                    match decl.alias.as_ref()? {
                        AliasTarget::ExternalModule(module) => Some((module.as_str(), decl.name.as_str())),
                        AliasTarget::Entity(_) => None,
                    }
                })
                .collect();

            let mut deps = vec!["\"require\"".to_string(), "\"exports\"".to_string()];
            deps.extend(imports.iter().map(|(module, _)| format!("\"{module}\"")));
            let mut params = vec!["require", "exports"];
            params.extend(imports.iter().map(|(_, name)| *name));

            self.write(&format!("define([{}], function ({}) ", deps.join(", "), params.join(", ")));
            self.open_block();
            self.out.ctx.push_scope(id);
            for (_, name) in &imports {
                self.out.ctx.declare(name);
            }
            self.emit_this_capture(id);
            self.emit_body(id)?;
            self.out.ctx.pop_scope(id)?;
            self.close_block();
            self.write(");");
            self.write_line();
        } else {
            self.out.ctx.push_scope(id);
            self.emit_this_capture(id);
            self.emit_body(id)?;
            self.out.ctx.pop_scope(id)?;
        }

        self.end_mapping()
    }
}
