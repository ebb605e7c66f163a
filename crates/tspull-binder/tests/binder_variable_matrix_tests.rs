//! Table-driven coverage of variable redeclaration against functions,
//! parameters and the implicit values of modules, enums and classes.

use tspull_binder::{BindContext, Binder, KindMask, SymbolGraph, SymbolKind};
use tspull_common::{TextSpan, diagnostic_codes};
use tspull_decl::{Code, DeclFlags, DeclKind, DeclTreeBuilder, UnitSet};

const DUP: u32 = diagnostic_codes::DUPLICATE_IDENTIFIER;

struct Fixture {
    b: DeclTreeBuilder,
    next: u32,
}

impl Fixture {
    fn span(&mut self) -> TextSpan {
        self.next += 10;
        TextSpan::new(self.next, self.next + 5)
    }

    fn var(&mut self, name: &str) {
        let span = self.span();
        self.b.leaf(DeclKind::Variable, name, DeclFlags::empty(), span);
    }

    fn function(&mut self, name: &str) {
        let span = self.span();
        self.b.open(DeclKind::Function, name, DeclFlags::empty(), span);
        self.b.close();
    }

    fn function_with_param_and_var(&mut self, name: &str, param: &str) {
        let span = self.span();
        self.b.open(DeclKind::Function, name, DeclFlags::empty(), span);
        let span = self.span();
        self.b.leaf(DeclKind::Parameter, param, DeclFlags::empty(), span);
        self.var(param);
        self.b.close();
    }

    fn module(&mut self, name: &str, flags: DeclFlags) {
        let span = self.span();
        self.b.open(DeclKind::Container, name, flags, span);
        let span = self.span();
        let x = self.b.leaf(DeclKind::Variable, "x", DeclFlags::EXPORTED, span);
        self.b.set_initializer(x, Code::lit("1"));
        self.b.close();
    }

    fn class(&mut self, name: &str, flags: DeclFlags) {
        let span = self.span();
        self.b.leaf(DeclKind::Class, name, flags, span);
    }

    fn enum_decl(&mut self, name: &str, member: &str) {
        let span = self.span();
        self.b.open(DeclKind::Enum, name, DeclFlags::empty(), span);
        let span = self.span();
        let a = self.b.leaf(DeclKind::EnumMember, member, DeclFlags::empty(), span);
        self.b.set_initializer(a, Code::lit("0"));
        self.b.close();
    }
}

fn error_codes(build: fn(&mut Fixture)) -> (Vec<u32>, SymbolGraph) {
    let mut fx = Fixture {
        b: DeclTreeBuilder::new(),
        next: 0,
    };
    build(&mut fx);
    let mut units = UnitSet::new();
    let unit = units.add("test.ts", fx.b.finish());

    let mut graph = SymbolGraph::new();
    let mut ctx = BindContext::new();
    let outcome = Binder::new(&mut graph, &units, &mut ctx, unit)
        .expect("unit exists")
        .bind_unit()
        .expect("bind succeeds");
    (outcome.diagnostics.iter().map(|d| d.code).collect(), graph)
}

struct Case {
    name: &'static str,
    build: fn(&mut Fixture),
    expected: &'static [u32],
}

fn cases() -> Vec<Case> {
    vec![
        Case {
            name: "var after var",
            build: |fx| {
                fx.var("x");
                fx.var("x");
            },
            expected: &[],
        },
        Case {
            name: "var after function",
            build: |fx| {
                fx.function("f");
                fx.var("f");
            },
            expected: &[DUP],
        },
        Case {
            name: "function after var",
            build: |fx| {
                fx.var("f");
                fx.function("f");
            },
            expected: &[DUP],
        },
        Case {
            name: "var redeclaring a parameter",
            build: |fx| fx.function_with_param_and_var("f", "p"),
            expected: &[],
        },
        Case {
            name: "module after function",
            build: |fx| {
                fx.function("f");
                fx.module("f", DeclFlags::empty());
            },
            expected: &[],
        },
        Case {
            name: "function after module",
            build: |fx| {
                fx.module("f", DeclFlags::empty());
                fx.function("f");
            },
            expected: &[DUP],
        },
        Case {
            name: "module after class",
            build: |fx| {
                fx.class("C", DeclFlags::empty());
                fx.module("C", DeclFlags::empty());
            },
            expected: &[],
        },
        Case {
            name: "class after module",
            build: |fx| {
                fx.module("C", DeclFlags::empty());
                fx.class("C", DeclFlags::empty());
            },
            expected: &[DUP],
        },
        Case {
            name: "ambient class after ambient module",
            build: |fx| {
                fx.module("C", DeclFlags::AMBIENT);
                fx.class("C", DeclFlags::AMBIENT);
            },
            expected: &[],
        },
        Case {
            name: "module after module",
            build: |fx| {
                fx.module("M", DeclFlags::empty());
                fx.module("M", DeclFlags::empty());
            },
            expected: &[],
        },
        Case {
            name: "var after module",
            build: |fx| {
                fx.module("M", DeclFlags::empty());
                fx.var("M");
            },
            expected: &[DUP],
        },
        Case {
            name: "enum after var",
            build: |fx| {
                fx.var("E");
                fx.enum_decl("E", "A");
            },
            expected: &[DUP],
        },
        Case {
            name: "enum after enum",
            build: |fx| {
                fx.enum_decl("E", "A");
                fx.enum_decl("E", "B");
            },
            expected: &[],
        },
        Case {
            name: "enum after function",
            build: |fx| {
                fx.function("E");
                fx.enum_decl("E", "A");
            },
            expected: &[DUP],
        },
        Case {
            name: "class after function",
            build: |fx| {
                fx.function("C");
                fx.class("C", DeclFlags::empty());
            },
            expected: &[DUP],
        },
    ]
}

#[test]
fn test_variable_redeclaration_matrix() {
    let mut failures = Vec::new();
    for case in cases() {
        let (codes, _) = error_codes(case.build);
        if codes != case.expected {
            failures.push(format!("{}: expected {:?}, got {:?}", case.name, case.expected, codes));
        }
    }
    assert!(failures.is_empty(), "matrix mismatches:\n{}", failures.join("\n"));
}

#[test]
fn test_parameter_and_var_share_symbol() {
    let (codes, graph) = error_codes(|fx| fx.function_with_param_and_var("f", "p"));
    assert!(codes.is_empty(), "got: {codes:?}");
    let params = graph
        .symbols
        .iter()
        .filter(|(_, s)| s.name == "p")
        .map(|(_, s)| (s.kind, s.declarations.len()))
        .collect::<Vec<_>>();
    assert_eq!(params, vec![(SymbolKind::Parameter, 2)]);
}

#[test]
fn test_rejected_var_does_not_replace_registered_symbol() {
    let (codes, graph) = error_codes(|fx| {
        fx.function("f");
        fx.var("f");
    });
    assert_eq!(codes, vec![DUP]);
    let found = graph.find_global("f", KindMask::SOME_VALUE).expect("f registered");
    assert_eq!(graph.kind_of(found), Some(SymbolKind::Function));
    let isolated = graph
        .symbols
        .iter()
        .filter(|(_, s)| s.name == "f" && s.is_isolated())
        .count();
    assert_eq!(isolated, 1);
}
