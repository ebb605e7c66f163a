//! Class closures.
//!
//! ```text
//! var C = (function (_super) {
//!     __extends(C, _super);
//!     function C(p) {
//!         _super.call(this, p);
//!         this.p = p;
//!     }
//!     C.prototype.m = function () {
//!     };
//!     return C;
//! })(B);
//! ```

use rustc_hash::FxHashSet;
use tspull_common::diagnostic_codes;
use tspull_decl::{BodyItem, DeclFlags, DeclId, DeclKind, Declaration};

use super::Printer;
use crate::errors::EmitError;
use crate::helpers::SUPER_PARAM;

impl<'s, 'a> Printer<'s, 'a> {
    pub(crate) fn emit_class(&mut self, id: DeclId) -> Result<(), EmitError> {
        let class = self.decl(id)?;
        let name = class.name.as_str();
        let has_base = class.extends.is_some();
        self.out.ctx.declare(name);

        if has_base {
            self.write(&format!("var {name} = (function ({SUPER_PARAM}) "));
        } else {
            self.write(&format!("var {name} = (function () "));
        }
        self.open_block();
        self.out.ctx.push_scope(id);
        if has_base {
            self.write(&format!("__extends({name}, {SUPER_PARAM});"));
            self.write_line();
        }

        self.emit_constructor(id, class)?;
        self.emit_members(id, class)?;

        self.write(&format!("return {name};"));
        self.write_line();
        self.out.ctx.pop_scope(id)?;
        self.close_block();
        self.write(")(");
        if let Some(base) = class.extends.as_ref() {
            self.emit_code(id, base)?;
        }
        self.write(");");
        self.write_line();
        self.emit_export_assignment(id)
    }

    /// The constructor function: prologue, a leading `super(...)` call,
    /// parameter properties, instance property initializers, then the rest
    /// of the body.
    fn emit_constructor(&mut self, class_id: DeclId, class: &'a Declaration) -> Result<(), EmitError> {
        let tree = self.tree;
        let ctor = tree
            .children_of_kind(class_id, DeclKind::Constructor)
            .find(|&c| self.should_emit(c));

        match ctor {
            Some(ctor_id) => {
                let ctor = self.decl(ctor_id)?;
                self.out.writer.ensure_line_start();
                self.emit_comments(ctor_id)?;
                self.start_mapping(ctor.span, Some(&class.name));
                self.write(&format!("function {}", class.name));
                self.emit_parameter_list(ctor_id)?;
                self.write(" ");
                self.open_block();
                self.out.ctx.push_scope(ctor_id);

                if !ctor.has_flag(DeclFlags::MUST_CAPTURE_THIS) {
                    self.emit_this_capture(class_id);
                }
                self.emit_function_prologue(ctor_id)?;

                let body: &'a [BodyItem] = ctor.body.as_deref().unwrap_or(&[]);
                let split = match body.first() {
                    Some(BodyItem::Stmt { code, .. }) if code.starts_with_super_call() => 1,
                    _ => 0,
                };
                self.emit_body_items(ctor_id, &body[..split])?;
                self.emit_parameter_properties(ctor_id)?;
                self.emit_property_initializers(class_id)?;
                self.emit_body_items(ctor_id, &body[split..])?;

                self.out.ctx.pop_scope(ctor_id)?;
                self.close_block();
                self.end_mapping()?;
                self.write_line();
            }
            None => {
                self.out.writer.ensure_line_start();
                self.write(&format!("function {}() ", class.name));
                self.open_block();
                self.emit_this_capture(class_id);
                if class.extends.is_some() {
                    self.write(&format!("{SUPER_PARAM}.apply(this, arguments);"));
                    self.write_line();
                }
                self.emit_property_initializers(class_id)?;
                self.close_block();
                self.write_line();
            }
        }
        Ok(())
    }

    fn emit_parameter_properties(&mut self, ctor_id: DeclId) -> Result<(), EmitError> {
        let tree = self.tree;
        for param in tree.parameters(ctor_id) {
            let decl = self.decl(param)?;
            if decl.has_flag(DeclFlags::PROPERTY_PARAMETER) {
                self.write(&format!("this.{0} = {0};", decl.name));
                self.write_line();
            }
        }
        Ok(())
    }

    fn emit_property_initializers(&mut self, class_id: DeclId) -> Result<(), EmitError> {
        let tree = self.tree;
        for prop in tree.children_of_kind(class_id, DeclKind::Property) {
            let decl = self.decl(prop)?;
            if decl.is_static() || !self.should_emit(prop) {
                continue;
            }
            let Some(init) = decl.initializer.as_ref() else {
                continue;
            };
            self.start_mapping(decl.span, Some(&decl.name));
            self.write(&format!("this.{} = ", decl.name));
            self.emit_code(prop, init)?;
            self.write(";");
            self.end_mapping()?;
            self.write_line();
        }
        Ok(())
    }

    /// Methods, accessors and static properties, in declaration order.
    fn emit_members(&mut self, class_id: DeclId, class: &'a Declaration) -> Result<(), EmitError> {
        let mut accessors_done: FxHashSet<(&'a str, bool)> = FxHashSet::default();
        for &member_id in &class.children {
            let member = self.decl(member_id)?;
            if !self.should_emit(member_id) {
                continue;
            }
            let target = if member.is_static() {
                class.name.clone()
            } else {
                format!("{}.prototype", class.name)
            };
            match member.kind {
                DeclKind::Method => {
                    self.emit_comments(member_id)?;
                    self.start_mapping(member.span, Some(&member.name));
                    self.write(&format!("{target}.{} = ", member.name));
                    self.emit_function_expression_body(member_id)?;
                    self.write(";");
                    self.end_mapping()?;
                    self.write_line();
                }
                DeclKind::Property if member.is_static() => {
                    let Some(init) = member.initializer.as_ref() else {
                        continue;
                    };
                    self.start_mapping(member.span, Some(&member.name));
                    self.write(&format!("{target}.{} = ", member.name));
                    self.emit_code(member_id, init)?;
                    self.write(";");
                    self.end_mapping()?;
                    self.write_line();
                }
                DeclKind::GetAccessor | DeclKind::SetAccessor => {
                    if !self.options().target.supports_accessors() {
                        self.report(
                            member_id,
                            diagnostic_codes::ACCESSORS_ARE_ONLY_AVAILABLE_WHEN_TARGETING_ECMASCRIPT_5_AND_HIGHER,
                            &[],
                        );
                    }
                    if !accessors_done.insert((member.name.as_str(), member.is_static())) {
                        continue;
                    }
                    self.emit_accessor_pair(class_id, member_id, &target)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// `Object.defineProperty(target, "x", { get: ..., set: ..., ... });`
    fn emit_accessor_pair(&mut self, class_id: DeclId, first: DeclId, target: &str) -> Result<(), EmitError> {
        let first_decl = self.decl(first)?;
        let tree = self.tree;
        let partner_kind = match first_decl.kind {
            DeclKind::GetAccessor => DeclKind::SetAccessor,
            _ => DeclKind::GetAccessor,
        };
        let partner = tree.children_of_kind(class_id, partner_kind).find(|&p| {
            self.should_emit(p)
                && tree
                    .get(p)
                    .is_some_and(|d| d.name == first_decl.name && d.is_static() == first_decl.is_static())
        });
        let (getter, setter) = match first_decl.kind {
            DeclKind::GetAccessor => (Some(first), partner),
            _ => (partner, Some(first)),
        };

        self.emit_comments(first)?;
        self.start_mapping(first_decl.span, Some(&first_decl.name));
        self.write(&format!("Object.defineProperty({target}, \"{}\", ", first_decl.name));
        self.open_block();
        for (label, accessor) in [("get", getter), ("set", setter)] {
            let Some(accessor) = accessor else {
                continue;
            };
            self.write(&format!("{label}: "));
            self.emit_function_expression_body(accessor)?;
            self.write(",");
            self.write_line();
        }
        self.write("enumerable: true,");
        self.write_line();
        self.write("configurable: true");
        self.write_line();
        self.close_block();
        self.write(");");
        self.end_mapping()?;
        self.write_line();
        Ok(())
    }

    /// `function (params) { ... }` for a method or accessor.
    fn emit_function_expression_body(&mut self, id: DeclId) -> Result<(), EmitError> {
        self.write("function ");
        self.emit_parameter_list(id)?;
        self.write(" ");
        self.emit_function_body(id)
    }
}
