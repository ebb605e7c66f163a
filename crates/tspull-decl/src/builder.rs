//! Incremental construction of declaration trees.
//!
//! The parser (or a test) opens and closes declarations in source order;
//! `finish` normalizes the result:
//! - ambient context is inherited by every nested declaration
//! - `InitializedModule` / `InitializedEnum` / `InitializedDynamicModule`
//!   are computed bottom-up
//! - initialized modules, enums and classes get their companion implicit
//!   variable declaration
//! - functions whose arrow-function descendants use `this` are marked
//!   `MustCaptureThis`

use tspull_common::TextSpan;

use crate::code::{AliasTarget, BodyItem, Code};
use crate::flags::{DeclFlags, DeclKind};
use crate::tree::{DeclId, DeclTree, Declaration};

#[derive(Debug)]
pub struct DeclTreeBuilder {
    decls: Vec<Declaration>,
    stack: Vec<DeclId>,
    source: String,
    cursor: usize,
    last_end: u32,
}

impl Default for DeclTreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DeclTreeBuilder {
    pub fn new() -> Self {
        Self::with_source("")
    }

    /// Builder whose spans can be found with [`DeclTreeBuilder::locate`].
    pub fn with_source(source: impl Into<String>) -> Self {
        let source = source.into();
        let mut root = Declaration::new(
            DeclKind::Script,
            "",
            DeclFlags::empty(),
            TextSpan::new(0, source.len() as u32),
        );
        root.body = Some(Vec::new());
        Self {
            decls: vec![root],
            stack: vec![DeclId(0)],
            source,
            cursor: 0,
            last_end: 0,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Span of the next occurrence of `needle` at or after the cursor.
    /// Advances the cursor past the match. Missing needles yield an empty
    /// span at the cursor.
    pub fn locate(&mut self, needle: &str) -> TextSpan {
        let Some(rel) = self.source.get(self.cursor..).and_then(|s| s.find(needle)) else {
            return TextSpan::new(self.cursor as u32, self.cursor as u32);
        };
        let start = self.cursor + rel;
        self.cursor = start + needle.len();
        let span = TextSpan::new(start as u32, self.cursor as u32);
        self.last_end = self.last_end.max(span.end);
        span
    }

    /// The innermost open declaration.
    pub fn current(&self) -> DeclId {
        self.stack.last().copied().unwrap_or(DeclId(0))
    }

    pub fn open(&mut self, kind: DeclKind, name: &str, flags: DeclFlags, span: TextSpan) -> DeclId {
        let parent = self.current();
        let mut flags = flags;
        if self.decl(parent).is_some_and(Declaration::is_ambient) {
            flags |= DeclFlags::AMBIENT;
        }
        if kind.is_function_like() && flags.contains(DeclFlags::AMBIENT) {
            flags |= DeclFlags::SIGNATURE;
        }

        let mut decl = Declaration::new(kind, name, flags, span);
        decl.parent = parent;
        if kind.has_statement_body() && !flags.contains(DeclFlags::SIGNATURE) {
            decl.body = Some(Vec::new());
        }

        let id = DeclId(self.decls.len() as u32);
        self.decls.push(decl);
        self.last_end = self.last_end.max(span.end);

        if let Some(parent_decl) = self.decl_mut(parent) {
            parent_decl.children.push(id);
            if kind.is_statement()
                && let Some(body) = parent_decl.body.as_mut()
            {
                body.push(BodyItem::Decl(id));
            }
        }
        self.stack.push(id);
        id
    }

    /// Close the innermost open declaration, extending its span over
    /// everything located inside it.
    pub fn close(&mut self) -> DeclId {
        if self.stack.len() <= 1 {
            return DeclId(0);
        }
        let Some(id) = self.stack.pop() else {
            return DeclId(0);
        };
        let last_end = self.last_end;
        if let Some(decl) = self.decl_mut(id) {
            decl.span.end = decl.span.end.max(last_end);
        }
        id
    }

    pub fn leaf(&mut self, kind: DeclKind, name: &str, flags: DeclFlags, span: TextSpan) -> DeclId {
        let id = self.open(kind, name, flags, span);
        self.close();
        id
    }

    /// Append a statement to the innermost open body.
    pub fn stmt(&mut self, code: Code, span: TextSpan) {
        let current = self.current();
        self.last_end = self.last_end.max(span.end);
        if let Some(body) = self.decl_mut(current).and_then(|d| d.body.as_mut()) {
            body.push(BodyItem::Stmt { code, span });
        }
    }

    pub fn set_initializer(&mut self, id: DeclId, code: Code) {
        if let Some(decl) = self.decl_mut(id) {
            decl.initializer = Some(code);
        }
    }

    pub fn set_type(&mut self, id: DeclId, annotation: &str) {
        if let Some(decl) = self.decl_mut(id) {
            decl.type_annotation = Some(annotation.to_string());
        }
    }

    pub fn set_constraint(&mut self, id: DeclId, constraint: &str) {
        if let Some(decl) = self.decl_mut(id) {
            decl.constraint = Some(constraint.to_string());
        }
    }

    pub fn set_extends(&mut self, id: DeclId, heritage: Code) {
        if let Some(decl) = self.decl_mut(id) {
            decl.extends = Some(heritage);
        }
    }

    pub fn set_alias(&mut self, id: DeclId, target: AliasTarget) {
        if let Some(decl) = self.decl_mut(id) {
            decl.alias = Some(target);
        }
    }

    pub fn set_name_span(&mut self, id: DeclId, span: TextSpan) {
        if let Some(decl) = self.decl_mut(id) {
            decl.name_span = span;
        }
    }

    pub fn add_comment(&mut self, id: DeclId, comment: &str) {
        if let Some(decl) = self.decl_mut(id) {
            decl.comments.push(comment.to_string());
        }
    }

    pub fn add_flags(&mut self, id: DeclId, flags: DeclFlags) {
        if let Some(decl) = self.decl_mut(id) {
            decl.flags |= flags;
        }
    }

    pub fn finish(mut self) -> DeclTree {
        while self.stack.len() > 1 {
            self.close();
        }
        self.compute_initialized();
        self.synthesize_value_decls();
        let mut tree = DeclTree { decls: self.decls };
        mark_this_capture(&mut tree);
        tracing::trace!(decls = tree.len(), "declaration tree finished");
        tree
    }

    fn decl(&self, id: DeclId) -> Option<&Declaration> {
        self.decls.get(id.0 as usize)
    }

    fn decl_mut(&mut self, id: DeclId) -> Option<&mut Declaration> {
        self.decls.get_mut(id.0 as usize)
    }

    fn contributes_value(&self, id: DeclId) -> bool {
        let Some(decl) = self.decl(id) else {
            return false;
        };
        match decl.kind {
            DeclKind::Variable | DeclKind::Function | DeclKind::Class | DeclKind::Enum => true,
            DeclKind::Container => decl.has_flag(DeclFlags::INITIALIZED_MODULE),
            _ => false,
        }
    }

    // Children always have larger ids than their parent, so a reverse
    // sweep sees every child before its container.
    fn compute_initialized(&mut self) {
        for index in (0..self.decls.len()).rev() {
            let id = DeclId(index as u32);
            let (kind, has_stmt, children) = {
                let decl = &self.decls[index];
                let has_stmt = decl
                    .body
                    .as_ref()
                    .is_some_and(|b| b.iter().any(|item| matches!(item, BodyItem::Stmt { .. })));
                (decl.kind, has_stmt, decl.children.clone())
            };
            let flag = match kind {
                DeclKind::Enum => Some(DeclFlags::INITIALIZED_ENUM),
                DeclKind::Container | DeclKind::DynamicModule => {
                    let has_value = has_stmt || children.iter().any(|&c| self.contributes_value(c));
                    has_value.then_some(if kind == DeclKind::Container {
                        DeclFlags::INITIALIZED_MODULE
                    } else {
                        DeclFlags::INITIALIZED_DYNAMIC_MODULE
                    })
                }
                _ => None,
            };
            if let Some(flag) = flag
                && let Some(decl) = self.decl_mut(id)
            {
                decl.flags |= flag;
            }
        }
    }

    fn synthesize_value_decls(&mut self) {
        let original = self.decls.len();
        for index in 0..original {
            let owner = &self.decls[index];
            let marker = match owner.kind {
                DeclKind::Container if owner.has_flag(DeclFlags::INITIALIZED_MODULE) => {
                    DeclFlags::INITIALIZED_MODULE
                }
                DeclKind::Enum => DeclFlags::INITIALIZED_ENUM,
                DeclKind::Class => DeclFlags::CLASS_CONSTRUCTOR_VARIABLE,
                _ => continue,
            };
            let inherited = owner.flags & (DeclFlags::EXPORTED | DeclFlags::AMBIENT);
            let mut value = Declaration::new(
                DeclKind::Variable,
                owner.name.clone(),
                DeclFlags::IMPLICIT_VARIABLE | marker | inherited,
                owner.span,
            );
            value.parent = owner.parent;
            value.name_span = owner.name_span;
            value.value_of = DeclId(index as u32);

            let value_id = DeclId(self.decls.len() as u32);
            self.decls.push(value);
            self.decls[index].value_decl = value_id;
        }
    }
}

fn mark_this_capture(tree: &mut DeclTree) {
    let mut owners = Vec::new();
    for (id, decl) in tree.iter() {
        let body_mentions = decl.body.as_ref().is_some_and(|body| {
            body.iter().any(|item| match item {
                BodyItem::Stmt { code, .. } => code.mentions_this(),
                BodyItem::Decl(_) => false,
            })
        });
        let mentions = body_mentions
            || decl.initializer.as_ref().is_some_and(Code::mentions_this)
            || decl.extends.as_ref().is_some_and(Code::mentions_this);
        if !mentions {
            continue;
        }
        let (scope, crossed_arrow) = tree.this_scope(id);
        if crossed_arrow {
            owners.push(scope);
        }
    }
    for owner in owners {
        if let Some(decl) = tree.decls.get_mut(owner.0 as usize) {
            decl.flags |= DeclFlags::MUST_CAPTURE_THIS;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_with_value_is_initialized_and_gets_value_decl() {
        let mut b = DeclTreeBuilder::with_source("module M { export var x = 1; }");
        let m = b.open(DeclKind::Container, "M", DeclFlags::empty(), TextSpan::default());
        let x = b.leaf(DeclKind::Variable, "x", DeclFlags::EXPORTED, TextSpan::default());
        b.set_initializer(x, Code::lit("1"));
        b.close();
        let tree = b.finish();

        let module = tree.get(m).unwrap();
        assert!(module.has_flag(DeclFlags::INITIALIZED_MODULE));
        let value = tree.get(module.value_decl).unwrap();
        assert_eq!(value.kind, DeclKind::Variable);
        assert_eq!(value.name, "M");
        assert!(value.has_flag(DeclFlags::IMPLICIT_VARIABLE | DeclFlags::INITIALIZED_MODULE));
        assert_eq!(value.value_of, m);
        assert_eq!(value.parent, tree.root());
        // the companion is not a child of anything
        assert!(!tree.get(tree.root()).unwrap().children.contains(&module.value_decl));
    }

    #[test]
    fn test_type_only_module_is_not_initialized() {
        let mut b = DeclTreeBuilder::new();
        let outer = b.open(DeclKind::Container, "A", DeclFlags::empty(), TextSpan::default());
        let inner = b.open(DeclKind::Container, "B", DeclFlags::EXPORTED, TextSpan::default());
        b.leaf(DeclKind::Interface, "I", DeclFlags::EXPORTED, TextSpan::default());
        b.close();
        b.close();
        let tree = b.finish();

        assert!(!tree.get(inner).unwrap().has_flag(DeclFlags::INITIALIZED_MODULE));
        assert!(!tree.get(outer).unwrap().has_flag(DeclFlags::INITIALIZED_MODULE));
        assert!(tree.get(outer).unwrap().value_decl.is_none());
    }

    #[test]
    fn test_nested_initialized_module_initializes_parent() {
        let mut b = DeclTreeBuilder::new();
        let outer = b.open(DeclKind::Container, "A", DeclFlags::empty(), TextSpan::default());
        b.open(DeclKind::Container, "B", DeclFlags::EXPORTED, TextSpan::default());
        b.stmt(Code::lit("log();"), TextSpan::default());
        b.close();
        b.close();
        let tree = b.finish();

        assert!(tree.get(outer).unwrap().has_flag(DeclFlags::INITIALIZED_MODULE));
    }

    #[test]
    fn test_ambient_context_is_inherited() {
        let mut b = DeclTreeBuilder::new();
        b.open(DeclKind::Container, "M", DeclFlags::AMBIENT, TextSpan::default());
        let f = b.leaf(DeclKind::Function, "f", DeclFlags::EXPORTED, TextSpan::default());
        b.close();
        let tree = b.finish();

        let func = tree.get(f).unwrap();
        assert!(func.is_ambient());
        assert!(func.has_flag(DeclFlags::SIGNATURE));
        assert!(func.body.is_none());
    }

    #[test]
    fn test_arrow_this_marks_enclosing_function() {
        let mut b = DeclTreeBuilder::new();
        let f = b.open(DeclKind::Function, "f", DeclFlags::empty(), TextSpan::default());
        let arrow = b.open(
            DeclKind::FunctionExpression,
            "",
            DeclFlags::ARROW_FUNCTION,
            TextSpan::default(),
        );
        b.stmt(Code::lit("return ").this().text(".x;"), TextSpan::default());
        b.close();
        b.stmt(Code::lit("return ").decl(arrow).text(";"), TextSpan::default());
        b.close();
        let tree = b.finish();

        assert!(tree.get(f).unwrap().has_flag(DeclFlags::MUST_CAPTURE_THIS));
        assert!(!tree.get(arrow).unwrap().has_flag(DeclFlags::MUST_CAPTURE_THIS));
        // embedded declarations are children but not statements
        let body = tree.get(f).unwrap().body.as_ref().unwrap();
        assert_eq!(body.len(), 1);
    }

    #[test]
    fn test_locate_advances_and_close_extends_span() {
        let mut b = DeclTreeBuilder::with_source("module M { var x; var x; }");
        let m_span = b.locate("module M");
        let m = b.open(DeclKind::Container, "M", DeclFlags::empty(), m_span);
        let first = b.locate("var x");
        let second = b.locate("var x");
        b.leaf(DeclKind::Variable, "x", DeclFlags::empty(), first);
        b.leaf(DeclKind::Variable, "x", DeclFlags::empty(), second);
        b.locate("}");
        b.close();
        let tree = b.finish();

        assert_eq!(first, TextSpan::new(11, 16));
        assert_eq!(second, TextSpan::new(18, 23));
        assert_eq!(tree.get(m).unwrap().span, TextSpan::new(0, 26));
        assert_eq!(tree.qualified_name(DeclId(2)), "M.x");
    }

    #[test]
    fn test_tree_survives_json() {
        let mut b = DeclTreeBuilder::new();
        b.open(DeclKind::Enum, "E", DeclFlags::empty(), TextSpan::default());
        let a = b.leaf(DeclKind::EnumMember, "A", DeclFlags::empty(), TextSpan::default());
        b.set_initializer(a, Code::lit("3"));
        b.close();
        let tree = b.finish();

        let json = serde_json::to_string(&tree).unwrap();
        let back: DeclTree = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tree);
    }
}
