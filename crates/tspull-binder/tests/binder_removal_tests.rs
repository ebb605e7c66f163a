//! Discarding a unit's declarations from the symbol graph.

use tspull_binder::{BindContext, Binder, KindMask, SymbolFlags, SymbolGraph, SymbolKind};
use tspull_common::TextSpan;
use tspull_decl::{Code, DeclFlags, DeclKind, DeclRef, DeclTree, DeclTreeBuilder, UnitId, UnitSet};

fn module_tree(module: &str, var: &str, flags: DeclFlags) -> DeclTree {
    let mut b = DeclTreeBuilder::new();
    b.open(DeclKind::Container, module, flags, TextSpan::new(0, 10));
    let x = b.leaf(DeclKind::Variable, var, DeclFlags::EXPORTED, TextSpan::new(11, 20));
    b.set_initializer(x, Code::lit("1"));
    b.close();
    b.finish()
}

fn class_tree() -> DeclTree {
    let mut b = DeclTreeBuilder::new();
    b.open(DeclKind::Class, "C", DeclFlags::empty(), TextSpan::new(0, 50));
    b.open(DeclKind::Constructor, "constructor", DeclFlags::empty(), TextSpan::new(10, 20));
    b.leaf(
        DeclKind::Parameter,
        "p",
        DeclFlags::PRIVATE | DeclFlags::PROPERTY_PARAMETER,
        TextSpan::new(12, 13),
    );
    b.close();
    b.open(DeclKind::Method, "m", DeclFlags::empty(), TextSpan::new(21, 30));
    b.leaf(DeclKind::Parameter, "a", DeclFlags::empty(), TextSpan::new(23, 24));
    b.close();
    b.close();
    b.finish()
}

fn bind_all(graph: &mut SymbolGraph, ctx: &mut BindContext, units: &UnitSet) {
    for unit in units.ids() {
        let outcome = Binder::new(graph, units, ctx, unit)
            .expect("unit exists")
            .bind_unit()
            .expect("bind succeeds");
        assert!(outcome.diagnostics.is_empty(), "unexpected diagnostics: {:?}", outcome.diagnostics);
    }
}

fn instance_member_names(graph: &SymbolGraph, module: &str) -> Vec<String> {
    let container = graph.find_global(module, KindMask::CONTAINER).expect("module bound");
    let instance = graph.symbol(container).unwrap().instance_symbol;
    graph
        .symbol(instance)
        .map(|s| {
            s.members
                .iter()
                .filter_map(|m| graph.symbol(m).map(|m| m.name.clone()))
                .collect()
        })
        .unwrap_or_default()
}

#[test]
fn test_removing_one_side_of_a_merge_keeps_the_other() {
    let mut units = UnitSet::new();
    let a = units.add("a.ts", module_tree("M", "x", DeclFlags::empty()));
    let b = units.add("b.ts", module_tree("M", "y", DeclFlags::empty()));
    let mut graph = SymbolGraph::new();
    let mut ctx = BindContext::new();
    bind_all(&mut graph, &mut ctx, &units);
    assert_eq!(instance_member_names(&graph, "M"), vec!["x", "y"]);

    let stats = graph.remove_unit(b, &units);
    assert!(stats.declarations_removed >= 3);
    assert_eq!(stats.symbols_destroyed, 1);

    let container = graph.find_global("M", KindMask::CONTAINER).expect("M survives");
    let sym = graph.symbol(container).unwrap();
    assert!(sym.declarations.iter().all(|d| d.unit == a));
    assert_eq!(instance_member_names(&graph, "M"), vec!["x"]);
}

#[test]
fn test_removing_last_unit_destroys_everything() {
    let mut units = UnitSet::new();
    let unit = units.add("c.ts", class_tree());
    let mut graph = SymbolGraph::new();
    let mut ctx = BindContext::new();
    bind_all(&mut graph, &mut ctx, &units);
    assert!(!graph.symbols.is_empty());

    graph.remove_unit(unit, &units);
    assert!(graph.symbols.is_empty(), "left over: {:?}", graph.symbols.iter().map(|(_, s)| &s.name).collect::<Vec<_>>());
    assert!(graph.signatures.is_empty());
    assert_eq!(graph.globals().count(), 0);
    assert!(!graph.is_bound(DeclRef::new(unit, tspull_decl::DeclId(0))));
}

#[test]
fn test_flags_reaggregate_from_surviving_declarations() {
    let mut units = UnitSet::new();
    let ambient = units.add("lib.d.ts", module_tree("M", "x", DeclFlags::AMBIENT));
    units.add("b.ts", module_tree("M", "y", DeclFlags::empty()));
    let mut graph = SymbolGraph::new();
    let mut ctx = BindContext::new();
    bind_all(&mut graph, &mut ctx, &units);

    let container = graph.find_global("M", KindMask::CONTAINER).unwrap();
    assert!(graph.symbol(container).unwrap().has_flag(SymbolFlags::AMBIENT));

    graph.remove_unit(ambient, &units);
    let sym = graph.symbol(container).unwrap();
    assert!(!sym.has_flag(SymbolFlags::AMBIENT));
    assert_eq!(sym.kind, SymbolKind::Container);
}

#[test]
fn test_rebinding_after_removal_restores_the_graph() {
    let mut units = UnitSet::new();
    units.add("a.ts", module_tree("M", "x", DeclFlags::empty()));
    let c = units.add("c.ts", class_tree());
    let mut graph = SymbolGraph::new();
    let mut ctx = BindContext::new();
    bind_all(&mut graph, &mut ctx, &units);
    let symbols = graph.symbols.len();
    let signatures = graph.signatures.len();

    graph.remove_unit(c, &units);
    units.replace(c, class_tree());
    let outcome = Binder::new(&mut graph, &units, &mut ctx, c)
        .unwrap()
        .bind_unit()
        .unwrap();

    assert!(outcome.diagnostics.is_empty(), "unexpected diagnostics: {:?}", outcome.diagnostics);
    assert_eq!(graph.symbols.len(), symbols);
    assert_eq!(graph.signatures.len(), signatures);
    let class = graph.find_global("C", KindMask::CLASS).expect("class rebound");
    let ctor = graph.symbol(class).unwrap().constructor;
    assert_eq!(graph.kind_of(ctor), Some(SymbolKind::ConstructorMethod));
    assert!(graph.find_member(class, "p", KindMask::PROPERTY).is_some());
    assert_eq!(
        graph.globals().filter(|s| graph.symbol(*s).is_some_and(|s| s.name == "C")).count(),
        2,
        "class and constructor only"
    );
    assert_eq!(graph.symbol_of(DeclRef::new(UnitId(1), tspull_decl::DeclId(1))), Some(class));
}
