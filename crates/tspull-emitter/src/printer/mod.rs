//! Source-order printer for one unit.
//!
//! The printer walks the unit's declaration tree once, asking the symbol
//! graph how names are spelled and which declarations survived binding.
//! Output goes to the session's writer; each emitted declaration is wrapped
//! in a mapping frame.

mod classes;
mod functions;
mod modules;
mod names;
mod statements;

use tracing::{Level, debug, span};
use tspull_binder::SymbolGraph;
use tspull_common::{CompilerOptions, DiagnosticSink, LineAndCharacter, LineMap, TextSpan};
use tspull_decl::{DeclFlags, DeclId, DeclKind, DeclLookup, DeclRef, DeclTree, Declaration, UnitId};

use crate::context::EmitState;
use crate::errors::EmitError;
use crate::helpers::EXTENDS_HELPER;
use crate::session::EmitSession;

pub(crate) struct Printer<'s, 'a> {
    pub(crate) out: &'s mut EmitSession,
    pub(crate) graph: &'a SymbolGraph,
    pub(crate) units: &'a dyn DeclLookup,
    pub(crate) unit: UnitId,
    pub(crate) tree: &'a DeclTree,
    pub(crate) path: &'a str,
    source_text: &'a str,
    line_map: LineMap,
    source_index: u32,
}

impl<'s, 'a> Printer<'s, 'a> {
    pub(crate) fn new(
        out: &'s mut EmitSession,
        graph: &'a SymbolGraph,
        units: &'a dyn DeclLookup,
        unit: UnitId,
        source_text: &'a str,
        source_index: u32,
    ) -> Result<Self, EmitError> {
        let tree = units.tree(unit).ok_or(EmitError::UnknownUnit(unit))?;
        let path = units.unit_path(unit).unwrap_or("");
        Ok(Self {
            out,
            graph,
            units,
            unit,
            tree,
            path,
            source_text,
            line_map: LineMap::build(source_text),
            source_index,
        })
    }

    /// Emit the whole unit: prologue, then the body walk.
    pub(crate) fn emit_unit(mut self) -> Result<(), EmitError> {
        let _span = span!(Level::DEBUG, "emit_unit", path = self.path, unit = self.unit.0).entered();

        self.out.ctx.advance(EmitState::Prologue)?;
        self.emit_prologue();

        self.out.ctx.advance(EmitState::BodyWalk)?;
        let root = self.tree.root();
        match self.external_module() {
            Some(module) => self.emit_external_module(module)?,
            None => {
                self.out.ctx.push_scope(root);
                self.emit_this_capture(root);
                self.emit_body(root)?;
                self.out.ctx.pop_scope(root)?;
            }
        }
        self.out.ctx.check_balanced()?;

        self.out.ctx.advance(EmitState::Closed)?;
        debug!(bytes = self.out.writer.len(), "unit emitted");
        Ok(())
    }

    fn emit_prologue(&mut self) {
        if self.out.ctx.prologue.extends_emitted || !self.needs_extends() {
            return;
        }
        for line in EXTENDS_HELPER.lines() {
            self.write(line);
            self.write_line();
        }
        self.out.ctx.prologue.extends_emitted = true;
    }

    fn needs_extends(&self) -> bool {
        self.tree
            .iter()
            .any(|(id, decl)| decl.kind == DeclKind::Class && decl.extends.is_some() && self.should_emit(id))
    }

    /// The dynamic module that is the file itself, if the unit is one.
    fn external_module(&self) -> Option<DeclId> {
        self.tree.get(self.tree.root())?.children.iter().copied().find(|&c| {
            self.tree
                .get(c)
                .is_some_and(|d| d.kind == DeclKind::DynamicModule && d.has_flag(DeclFlags::EXTERNAL_MODULE))
        })
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    pub(crate) fn decl(&self, id: DeclId) -> Result<&'a Declaration, EmitError> {
        let tree: &'a DeclTree = self.tree;
        tree.get(id).ok_or(EmitError::MissingDeclaration {
            unit: self.unit,
            decl: id,
        })
    }

    pub(crate) fn dref(&self, id: DeclId) -> DeclRef {
        DeclRef::new(self.unit, id)
    }

    pub(crate) fn parent_of(&self, id: DeclId) -> Option<&'a Declaration> {
        let tree: &'a DeclTree = self.tree;
        tree.parent(id).and_then(|p| tree.get(p))
    }

    fn is_isolated(&self, id: DeclId) -> bool {
        self.graph
            .symbol_of(self.dref(id))
            .and_then(|s| self.graph.symbol(s))
            .is_some_and(|s| s.is_isolated())
    }

    /// The exception variable of a catch clause is printed in the clause
    /// header, not as a statement.
    pub(crate) fn is_catch_variable(&self, id: DeclId) -> bool {
        let Some(parent) = self.tree.parent(id) else {
            return false;
        };
        self.tree.kind(parent) == Some(DeclKind::CatchBlock)
            && self.tree.children_of_kind(parent, DeclKind::Variable).next() == Some(id)
    }

    /// Whether a declaration produces any output.
    pub(crate) fn should_emit(&self, id: DeclId) -> bool {
        let Some(decl) = self.tree.get(id) else {
            return false;
        };
        if decl.has_flag(DeclFlags::SKIP_EMIT) || decl.is_ambient() {
            return false;
        }
        let emits = match decl.kind {
            DeclKind::Interface
            | DeclKind::ObjectType
            | DeclKind::FunctionType
            | DeclKind::ConstructorType
            | DeclKind::CallSignature
            | DeclKind::ConstructSignature
            | DeclKind::IndexSignature
            | DeclKind::TypeParameter => false,
            DeclKind::Container => decl.has_flag(DeclFlags::INITIALIZED_MODULE),
            DeclKind::DynamicModule => decl.has_flag(DeclFlags::EXTERNAL_MODULE),
            DeclKind::Variable => !decl.has_flag(DeclFlags::IMPLICIT_VARIABLE) && !self.is_catch_variable(id),
            DeclKind::TypeAlias => self.alias_has_value(id),
            kind if kind.is_function_like() => decl.body.is_some(),
            _ => true,
        };
        emits && !self.is_isolated(id)
    }

    // =========================================================================
    // Output helpers
    // =========================================================================

    pub(crate) fn write(&mut self, text: &str) {
        self.out.writer.write(text);
    }

    pub(crate) fn write_line(&mut self) {
        self.out.writer.write_line();
    }

    pub(crate) fn increase_indent(&mut self) {
        self.out.writer.increase_indent();
    }

    pub(crate) fn decrease_indent(&mut self) {
        self.out.writer.decrease_indent();
    }

    /// `{`, newline, one level deeper.
    pub(crate) fn open_block(&mut self) {
        self.write("{");
        self.write_line();
        self.increase_indent();
    }

    /// One level shallower, then `}` on its own line start.
    pub(crate) fn close_block(&mut self) {
        self.out.writer.ensure_line_start();
        self.decrease_indent();
        self.write("}");
    }

    pub(crate) fn options(&self) -> &CompilerOptions {
        &self.out.options
    }

    fn position_of(&self, offset: u32) -> LineAndCharacter {
        self.line_map.offset_to_position(offset, self.source_text)
    }

    pub(crate) fn start_mapping(&mut self, span: TextSpan, name: Option<&str>) {
        let start = self.position_of(span.start);
        let end = self.position_of(span.end);
        let emitted = self.out.writer.position();
        self.out.mappings.start(
            self.source_index,
            start,
            end,
            emitted,
            name.filter(|n| !n.is_empty()).map(str::to_string),
        );
    }

    pub(crate) fn end_mapping(&mut self) -> Result<(), EmitError> {
        let emitted = self.out.writer.position();
        self.out.mappings.end(emitted)
    }

    pub(crate) fn report(&mut self, id: DeclId, code: u32, args: &[&str]) {
        let span = self.tree.get(id).map(|d| d.name_span).unwrap_or_default();
        self.out
            .diagnostics
            .add_diagnostic(self.path, span.start, span.len(), code, args);
    }

    pub(crate) fn emit_comments(&mut self, id: DeclId) -> Result<(), EmitError> {
        if self.options().remove_comments {
            return Ok(());
        }
        let decl = self.decl(id)?;
        for comment in &decl.comments {
            self.write(comment);
            self.write_line();
        }
        Ok(())
    }
}
