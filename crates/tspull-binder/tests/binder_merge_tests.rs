//! Declaration merging across modules, enums, classes and functions.

use tspull_binder::{BindContext, Binder, KindMask, SymbolFlags, SymbolGraph, SymbolId, SymbolKind, resolve_unit_aliases};
use tspull_common::{DiagnosticEvent, TextSpan, diagnostic_codes};
use tspull_decl::{AliasTarget, Code, DeclFlags, DeclId, DeclKind, DeclRef, DeclTree, DeclTreeBuilder, UnitId, UnitSet};

/// Builder wrapper that hands out distinct spans.
struct Fixture {
    b: DeclTreeBuilder,
    next: u32,
}

impl Fixture {
    fn new() -> Self {
        Self {
            b: DeclTreeBuilder::new(),
            next: 0,
        }
    }

    fn span(&mut self) -> TextSpan {
        self.next += 10;
        TextSpan::new(self.next, self.next + 5)
    }

    fn open(&mut self, kind: DeclKind, name: &str, flags: DeclFlags) -> DeclId {
        let span = self.span();
        self.b.open(kind, name, flags, span)
    }

    fn leaf(&mut self, kind: DeclKind, name: &str, flags: DeclFlags) -> DeclId {
        let span = self.span();
        self.b.leaf(kind, name, flags, span)
    }

    fn close(&mut self) {
        self.b.close();
    }

    fn module_var(&mut self, module: &str, var: &str) -> DeclId {
        let m = self.open(DeclKind::Container, module, DeclFlags::empty());
        let x = self.leaf(DeclKind::Variable, var, DeclFlags::EXPORTED);
        self.b.set_initializer(x, Code::lit("1"));
        self.close();
        m
    }

    fn function(&mut self, name: &str) -> DeclId {
        let f = self.open(DeclKind::Function, name, DeclFlags::empty());
        self.close();
        f
    }

    fn class(&mut self, name: &str) -> DeclId {
        let c = self.open(DeclKind::Class, name, DeclFlags::empty());
        self.close();
        c
    }

    fn enum_decl(&mut self, name: &str, members: &[(&str, Option<&str>)]) -> DeclId {
        let e = self.open(DeclKind::Enum, name, DeclFlags::empty());
        for (member, init) in members {
            let m = self.leaf(DeclKind::EnumMember, member, DeclFlags::empty());
            if let Some(init) = init {
                self.b.set_initializer(m, Code::lit(*init));
            }
        }
        self.close();
        e
    }

    fn finish(self) -> DeclTree {
        self.b.finish()
    }
}

fn bind_units(units: &UnitSet) -> (SymbolGraph, Vec<DiagnosticEvent>) {
    let mut graph = SymbolGraph::new();
    let mut ctx = BindContext::new();
    let mut diagnostics = Vec::new();
    for unit in units.ids() {
        let outcome = Binder::new(&mut graph, units, &mut ctx, unit)
            .expect("unit exists")
            .bind_unit()
            .expect("bind succeeds");
        diagnostics.extend(outcome.diagnostics);
    }
    for unit in units.ids() {
        diagnostics.extend(resolve_unit_aliases(&mut graph, units, unit));
    }
    (graph, diagnostics)
}

fn bind_one(tree: DeclTree) -> (UnitSet, SymbolGraph, Vec<DiagnosticEvent>) {
    let mut units = UnitSet::new();
    units.add("test.ts", tree);
    let (graph, diagnostics) = bind_units(&units);
    (units, graph, diagnostics)
}

fn codes(diagnostics: &[DiagnosticEvent]) -> Vec<u32> {
    diagnostics.iter().map(|d| d.code).collect()
}

fn count_globals(graph: &SymbolGraph, name: &str, kind: SymbolKind) -> usize {
    graph
        .globals()
        .filter_map(|id| graph.symbol(id))
        .filter(|s| s.name == name && s.kind == kind)
        .count()
}

fn member_names(graph: &SymbolGraph, symbol: SymbolId) -> Vec<String> {
    let sym = graph.symbol(symbol).expect("symbol exists");
    sym.members
        .iter()
        .filter_map(|m| graph.symbol(m).map(|s| s.name.clone()))
        .collect()
}

#[test]
fn test_two_module_declarations_share_container_and_instance() {
    let mut fx = Fixture::new();
    let m1 = fx.module_var("M", "x");
    let m2 = fx.module_var("M", "y");
    let (_units, graph, diagnostics) = bind_one(fx.finish());

    assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics:?}");
    let unit = UnitId(0);
    let container = graph.symbol_of(DeclRef::new(unit, m1)).expect("M bound");
    assert_eq!(graph.symbol_of(DeclRef::new(unit, m2)), Some(container));
    assert_eq!(count_globals(&graph, "M", SymbolKind::Container), 1);

    let sym = graph.symbol(container).unwrap();
    assert_eq!(sym.kind, SymbolKind::Container);
    assert!(sym.declarations.contains(&DeclRef::new(unit, m1)));
    assert!(sym.declarations.contains(&DeclRef::new(unit, m2)));

    let instance = sym.instance_symbol;
    assert!(instance.is_some());
    let names = member_names(&graph, instance);
    assert!(names.contains(&"x".to_string()), "members: {names:?}");
    assert!(names.contains(&"y".to_string()), "members: {names:?}");
}

#[test]
fn test_module_merge_does_not_depend_on_bind_order() {
    let mut fx = Fixture::new();
    let m1 = fx.module_var("M", "x");
    let m2 = fx.module_var("M", "y");
    let tree = fx.finish();
    let x = tree.children_of_kind(m1, DeclKind::Variable).next().expect("x declared");
    let y = tree.children_of_kind(m2, DeclKind::Variable).next().expect("y declared");
    let mut units = UnitSet::new();
    let unit = units.add("test.ts", tree);

    let mut graph = SymbolGraph::new();
    let mut ctx = BindContext::new();
    let mut binder = Binder::new(&mut graph, &units, &mut ctx, unit).expect("unit exists");
    for decl in [y, m2, x, m1] {
        binder.bind_declaration(decl).expect("binds out of order");
    }
    let outcome = binder.bind_unit().expect("rest of the unit binds");
    assert!(outcome.diagnostics.is_empty(), "unexpected diagnostics: {:?}", outcome.diagnostics);

    let container = graph.symbol_of(DeclRef::new(unit, m2)).expect("M bound");
    assert_eq!(graph.symbol_of(DeclRef::new(unit, m1)), Some(container));
    assert_eq!(count_globals(&graph, "M", SymbolKind::Container), 1);
    let sym = graph.symbol(container).unwrap();
    assert!(sym.declarations.contains(&DeclRef::new(unit, m1)));
    assert!(sym.declarations.contains(&DeclRef::new(unit, m2)));

    let mut names = member_names(&graph, sym.instance_symbol);
    names.sort();
    assert_eq!(names, vec!["x", "y"]);
}

#[test]
fn test_function_then_module_shares_value_symbol() {
    let mut fx = Fixture::new();
    let f = fx.function("f");
    let m = fx.module_var("f", "x");
    let (_units, graph, diagnostics) = bind_one(fx.finish());

    assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics:?}");
    let unit = UnitId(0);
    let function = graph.symbol_of(DeclRef::new(unit, f)).unwrap();
    let container = graph.symbol_of(DeclRef::new(unit, m)).unwrap();
    assert_eq!(graph.symbol(container).unwrap().instance_symbol, function);
    assert!(member_names(&graph, function).contains(&"x".to_string()));
}

#[test]
fn test_class_then_module_shares_constructor() {
    let mut fx = Fixture::new();
    let c = fx.class("C");
    let m = fx.module_var("C", "x");
    let (_units, graph, diagnostics) = bind_one(fx.finish());

    assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics:?}");
    let unit = UnitId(0);
    let class = graph.symbol_of(DeclRef::new(unit, c)).unwrap();
    let ctor = graph.symbol(class).unwrap().constructor;
    assert_eq!(graph.kind_of(ctor), Some(SymbolKind::ConstructorMethod));
    let container = graph.symbol_of(DeclRef::new(unit, m)).unwrap();
    assert_eq!(graph.symbol(container).unwrap().instance_symbol, ctor);
}

#[test]
fn test_module_then_class_is_duplicate() {
    let mut fx = Fixture::new();
    fx.module_var("C", "x");
    fx.class("C");
    let (_units, graph, diagnostics) = bind_one(fx.finish());

    assert_eq!(codes(&diagnostics), vec![diagnostic_codes::DUPLICATE_IDENTIFIER]);
    assert_eq!(count_globals(&graph, "C", SymbolKind::Container), 1);
}

#[test]
fn test_module_merging_with_function_in_other_file_is_flagged() {
    let mut a = Fixture::new();
    let f = a.function("f");
    let mut b = Fixture::new();
    b.module_var("f", "x");

    let mut units = UnitSet::new();
    units.add("a.ts", a.finish());
    units.add("b.ts", b.finish());
    let (graph, diagnostics) = bind_units(&units);

    assert_eq!(
        codes(&diagnostics),
        vec![diagnostic_codes::MODULE_CANNOT_MERGE_WITH_PREVIOUS_DECLARATION_IN_A_DIFFERENT_FILE]
    );
    assert_eq!(diagnostics[0].file, "b.ts");
    assert_eq!(diagnostics[0].args, vec!["f", "f", "a.ts"]);
    let function = graph.symbol_of(DeclRef::new(UnitId(0), f)).unwrap();
    assert!(graph.symbol(function).unwrap().has_flag(SymbolFlags::MERGE_ERROR));
}

#[test]
fn test_enum_and_module_do_not_merge() {
    let mut fx = Fixture::new();
    let e = fx.enum_decl("E", &[("A", None)]);
    let m = fx.module_var("E", "x");
    let (_units, graph, diagnostics) = bind_one(fx.finish());

    assert_eq!(codes(&diagnostics), vec![diagnostic_codes::DUPLICATE_IDENTIFIER]);
    let unit = UnitId(0);
    let enum_sym = graph.symbol_of(DeclRef::new(unit, e)).unwrap();
    let module_sym = graph.symbol_of(DeclRef::new(unit, m)).unwrap();
    assert_ne!(enum_sym, module_sym);
    assert!(graph.symbol(module_sym).unwrap().is_isolated());
    assert_eq!(graph.find_global("E", KindMask::SOME_CONTAINER), Some(enum_sym));
}

#[test]
fn test_enum_initializer_rule_reported_once_on_first_declaration() {
    let mut fx = Fixture::new();
    let first = fx.enum_decl("E", &[("A", None)]);
    fx.enum_decl("E", &[("B", None)]);
    fx.enum_decl("E", &[("C", None)]);
    let tree = fx.finish();
    let first_span = tree.get(first).unwrap().name_span;
    let (_units, _graph, diagnostics) = bind_one(tree);

    assert_eq!(
        codes(&diagnostics),
        vec![diagnostic_codes::ENUMS_WITH_MULTIPLE_DECLARATIONS_MUST_PROVIDE_AN_INITIALIZER_FOR_THE_FIRST_ENUM_ELEMENT]
    );
    assert_eq!(diagnostics[0].start, first_span.start);
}

#[test]
fn test_enum_initializer_rule_satisfied() {
    let mut fx = Fixture::new();
    let e1 = fx.enum_decl("E", &[("A", Some("0"))]);
    let e2 = fx.enum_decl("E", &[("B", Some("1"))]);
    let (_units, graph, diagnostics) = bind_one(fx.finish());

    assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics:?}");
    let unit = UnitId(0);
    let sym = graph.symbol_of(DeclRef::new(unit, e1)).unwrap();
    assert_eq!(graph.symbol_of(DeclRef::new(unit, e2)), Some(sym));
    let names = member_names(&graph, sym);
    assert_eq!(names, vec!["A".to_string(), "B".to_string()]);
}

#[test]
fn test_duplicate_class_yields_one_diagnostic_and_one_registered_symbol() {
    let mut fx = Fixture::new();
    let first = fx.class("C");
    let second = fx.class("C");
    let (_units, graph, diagnostics) = bind_one(fx.finish());

    assert_eq!(codes(&diagnostics), vec![diagnostic_codes::DUPLICATE_IDENTIFIER]);
    assert_eq!(count_globals(&graph, "C", SymbolKind::Class), 1);
    assert_eq!(count_globals(&graph, "C", SymbolKind::ConstructorMethod), 1);

    let unit = UnitId(0);
    let winner = graph.symbol_of(DeclRef::new(unit, first)).unwrap();
    let loser = graph.symbol_of(DeclRef::new(unit, second)).unwrap();
    assert!(!graph.symbol(winner).unwrap().is_isolated());
    assert!(graph.symbol(loser).unwrap().is_isolated());
}

#[test]
fn test_interface_after_class_is_duplicate() {
    let mut fx = Fixture::new();
    fx.class("I");
    fx.leaf(DeclKind::Interface, "I", DeclFlags::empty());
    let (_units, _graph, diagnostics) = bind_one(fx.finish());
    assert_eq!(codes(&diagnostics), vec![diagnostic_codes::DUPLICATE_IDENTIFIER]);
}

#[test]
fn test_export_mismatch_between_module_declarations() {
    let mut fx = Fixture::new();
    fx.open(DeclKind::Container, "A", DeclFlags::empty());
    fx.open(DeclKind::Container, "N", DeclFlags::EXPORTED);
    fx.leaf(DeclKind::Variable, "a", DeclFlags::empty());
    fx.close();
    fx.open(DeclKind::Container, "N", DeclFlags::empty());
    fx.leaf(DeclKind::Variable, "b", DeclFlags::empty());
    fx.close();
    fx.close();
    let (_units, _graph, diagnostics) = bind_one(fx.finish());

    assert_eq!(
        codes(&diagnostics),
        vec![diagnostic_codes::ALL_DECLARATIONS_OF_MERGED_DECLARATION_MUST_BE_EXPORTED_OR_NOT_EXPORTED]
    );
}

#[test]
fn test_nested_ambient_external_module_is_reported() {
    let mut fx = Fixture::new();
    fx.open(DeclKind::Container, "M", DeclFlags::AMBIENT);
    fx.open(DeclKind::DynamicModule, "fs", DeclFlags::empty());
    fx.close();
    fx.close();
    let (_units, _graph, diagnostics) = bind_one(fx.finish());
    assert_eq!(
        codes(&diagnostics),
        vec![diagnostic_codes::AMBIENT_EXTERNAL_MODULE_DECLARATION_CANNOT_BE_NESTED_IN_OTHER_MODULES]
    );
}

#[test]
fn test_catch_variable_is_scoped_to_clause() {
    let mut fx = Fixture::new();
    let catch = fx.open(DeclKind::CatchBlock, "", DeclFlags::empty());
    fx.leaf(DeclKind::Variable, "e", DeclFlags::empty());
    fx.leaf(DeclKind::Variable, "hoisted", DeclFlags::empty());
    fx.close();
    let (_units, graph, diagnostics) = bind_one(fx.finish());

    assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics:?}");
    let locals = graph.locals_of(DeclRef::new(UnitId(0), catch)).expect("catch scope");
    assert_eq!(locals.get("e").len(), 1);
    assert!(locals.get("hoisted").is_empty());
    assert!(graph.find_global("hoisted", KindMask::VARIABLE).is_some());
    assert!(graph.find_global("e", KindMask::VARIABLE).is_none());
}

#[test]
fn test_import_alias_resolves_module_and_external_module() {
    let mut fx = Fixture::new();
    fx.module_var("M", "x");
    fx.open(DeclKind::DynamicModule, "fs", DeclFlags::AMBIENT);
    fx.close();
    let local = fx.leaf(DeclKind::TypeAlias, "m", DeclFlags::empty());
    fx.b.set_alias(local, AliasTarget::Entity(vec!["M".to_string()]));
    let external = fx.leaf(DeclKind::TypeAlias, "fs", DeclFlags::empty());
    fx.b.set_alias(external, AliasTarget::ExternalModule("fs".to_string()));
    let missing = fx.leaf(DeclKind::TypeAlias, "nope", DeclFlags::empty());
    fx.b.set_alias(missing, AliasTarget::ExternalModule("./nope".to_string()));
    let (_units, graph, diagnostics) = bind_one(fx.finish());

    assert_eq!(codes(&diagnostics), vec![diagnostic_codes::CANNOT_FIND_EXTERNAL_MODULE]);
    assert_eq!(diagnostics[0].args, vec!["./nope"]);

    let unit = UnitId(0);
    let m = graph.symbol_of(DeclRef::new(unit, local)).unwrap();
    let slots = graph.symbol(m).unwrap().alias.expect("alias slots");
    assert!(slots.resolved);
    assert_eq!(graph.kind_of(slots.container), Some(SymbolKind::Container));
    assert_eq!(graph.kind_of(slots.value), Some(SymbolKind::Variable));

    let fs = graph.symbol_of(DeclRef::new(unit, external)).unwrap();
    let slots = graph.symbol(fs).unwrap().alias.expect("alias slots");
    assert_eq!(graph.kind_of(slots.container), Some(SymbolKind::DynamicModule));
}

#[test]
fn test_rebinding_a_unit_is_idempotent() {
    let mut fx = Fixture::new();
    fx.module_var("M", "x");
    fx.function("f");
    let mut units = UnitSet::new();
    let unit = units.add("test.ts", fx.finish());

    let mut graph = SymbolGraph::new();
    let mut ctx = BindContext::new();
    let first = Binder::new(&mut graph, &units, &mut ctx, unit).unwrap().bind_unit().unwrap();
    let symbols = graph.symbols.len();
    let second = Binder::new(&mut graph, &units, &mut ctx, unit).unwrap().bind_unit().unwrap();

    assert!(first.declarations_bound > 0);
    assert_eq!(second.declarations_bound, 0);
    assert!(second.diagnostics.is_empty());
    assert_eq!(graph.symbols.len(), symbols);
    assert_eq!(ctx.passes(), 2);
}
