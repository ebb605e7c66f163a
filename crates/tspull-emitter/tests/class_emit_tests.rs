//! Class closures: heritage, constructors, members and accessors.

use tspull_binder::{BindContext, Binder, SymbolGraph};
use tspull_common::{CompilerOptions, DiagnosticEvent, ScriptTarget, TextSpan, diagnostic_codes};
use tspull_decl::{Code, DeclFlags, DeclId, DeclKind, DeclTree, DeclTreeBuilder, UnitSet};
use tspull_emitter::{EmitOutput, emit_unit};

fn span() -> TextSpan {
    TextSpan::default()
}

fn emit_with(options: &CompilerOptions, tree: DeclTree) -> (EmitOutput, Vec<DiagnosticEvent>) {
    let mut units = UnitSet::new();
    let unit = units.add("test.ts", tree);
    let mut graph = SymbolGraph::new();
    let mut ctx = BindContext::new();
    let outcome = Binder::new(&mut graph, &units, &mut ctx, unit)
        .expect("unit exists")
        .bind_unit()
        .expect("bind succeeds");
    let output = emit_unit(options, &graph, &units, unit, "").expect("emit succeeds");
    (output, outcome.diagnostics)
}

fn emit(tree: DeclTree) -> (EmitOutput, Vec<DiagnosticEvent>) {
    emit_with(&CompilerOptions::default(), tree)
}

fn empty_class(b: &mut DeclTreeBuilder, name: &str) -> DeclId {
    let c = b.open(DeclKind::Class, name, DeclFlags::empty(), span());
    b.close();
    c
}

fn derived_class(b: &mut DeclTreeBuilder, name: &str, base: &str) -> DeclId {
    let c = b.open(DeclKind::Class, name, DeclFlags::empty(), span());
    b.set_extends(c, Code::new().reference(base, span()));
    b.close();
    c
}

#[test]
fn test_plain_class_closure() {
    let mut b = DeclTreeBuilder::new();
    empty_class(&mut b, "C");

    let (output, diagnostics) = emit(b.finish());
    assert!(diagnostics.is_empty(), "unexpected diagnostics {diagnostics:?}");
    let expected = "\
var C = (function () {
    function C() {
    }
    return C;
})();
";
    assert_eq!(output.text, expected);
}

#[test]
fn test_extends_helper_is_emitted_once() {
    let mut b = DeclTreeBuilder::new();
    empty_class(&mut b, "B");
    derived_class(&mut b, "D1", "B");
    derived_class(&mut b, "D2", "B");

    let (output, _) = emit(b.finish());
    assert_eq!(output.text.matches("var __extends").count(), 1, "{}", output.text);
    assert!(output.text.starts_with("var __extends"), "helper not first {}", output.text);
    assert!(output.text.contains("var D1 = (function (_super) {"), "{}", output.text);
    assert!(output.text.contains("    __extends(D2, _super);"), "{}", output.text);
    assert!(output.text.contains("})(B);"), "{}", output.text);
}

#[test]
fn test_class_without_base_needs_no_helper() {
    let mut b = DeclTreeBuilder::new();
    empty_class(&mut b, "C");

    let (output, _) = emit(b.finish());
    assert!(!output.text.contains("__extends"), "{}", output.text);
}

#[test]
fn test_default_constructor_forwards_to_base() {
    let mut b = DeclTreeBuilder::new();
    empty_class(&mut b, "B");
    derived_class(&mut b, "D", "B");

    let (output, _) = emit(b.finish());
    assert!(
        output
            .text
            .contains("    function D() {\n        _super.apply(this, arguments);\n    }\n"),
        "{}",
        output.text
    );
}

#[test]
fn test_constructor_body_order() {
    let mut b = DeclTreeBuilder::new();
    empty_class(&mut b, "B");
    let c = b.open(DeclKind::Class, "C", DeclFlags::empty(), span());
    b.set_extends(c, Code::new().reference("B", span()));
    let prop = b.leaf(DeclKind::Property, "x", DeclFlags::empty(), span());
    b.set_initializer(prop, Code::lit("1"));
    b.open(DeclKind::Constructor, "", DeclFlags::empty(), span());
    b.leaf(
        DeclKind::Parameter,
        "p",
        DeclFlags::PUBLIC | DeclFlags::PROPERTY_PARAMETER,
        span(),
    );
    let q = b.leaf(DeclKind::Parameter, "q", DeclFlags::empty(), span());
    b.set_initializer(q, Code::lit("2"));
    b.stmt(Code::new().super_call(Code::new()).text(";"), span());
    b.stmt(Code::new().this().text(".z = 3;"), span());
    b.close();
    b.close();

    let (output, diagnostics) = emit(b.finish());
    assert!(diagnostics.is_empty(), "unexpected diagnostics {diagnostics:?}");
    let expected = "\
    function C(p, q) {
        if (typeof q === \"undefined\") { q = 2; }
        _super.call(this);
        this.p = p;
        this.x = 1;
        this.z = 3;
    }
";
    assert!(output.text.contains(expected), "{}", output.text);
}

#[test]
fn test_methods_and_static_members() {
    let mut b = DeclTreeBuilder::new();
    b.open(DeclKind::Class, "C", DeclFlags::empty(), span());
    b.open(DeclKind::Method, "m", DeclFlags::empty(), span());
    b.leaf(DeclKind::Parameter, "a", DeclFlags::empty(), span());
    b.stmt(Code::lit("return ").reference("a", span()).text(";"), span());
    b.close();
    let s = b.leaf(DeclKind::Property, "s", DeclFlags::STATIC, span());
    b.set_initializer(s, Code::lit("1"));
    b.open(DeclKind::Method, "f", DeclFlags::STATIC, span());
    b.close();
    b.close();

    let (output, _) = emit(b.finish());
    let expected = "\
var C = (function () {
    function C() {
    }
    C.prototype.m = function (a) {
        return a;
    };
    C.s = 1;
    C.f = function () {
    };
    return C;
})();
";
    assert_eq!(output.text, expected);
}

#[test]
fn test_member_reference_goes_through_this() {
    let mut b = DeclTreeBuilder::new();
    b.open(DeclKind::Class, "C", DeclFlags::empty(), span());
    b.leaf(DeclKind::Property, "count", DeclFlags::empty(), span());
    b.open(DeclKind::Method, "inc", DeclFlags::empty(), span());
    b.stmt(Code::new().reference("count", span()).text("++;"), span());
    b.close();
    b.close();

    let (output, _) = emit(b.finish());
    assert!(output.text.contains("        this.count++;"), "{}", output.text);
}

#[test]
fn test_accessor_pair_uses_define_property() {
    let mut b = DeclTreeBuilder::new();
    b.open(DeclKind::Class, "C", DeclFlags::empty(), span());
    b.open(DeclKind::GetAccessor, "x", DeclFlags::empty(), span());
    b.stmt(Code::lit("return 1;"), span());
    b.close();
    b.open(DeclKind::SetAccessor, "x", DeclFlags::empty(), span());
    b.leaf(DeclKind::Parameter, "v", DeclFlags::empty(), span());
    b.close();
    b.close();

    let (output, diagnostics) = emit(b.finish());
    assert!(diagnostics.is_empty(), "unexpected diagnostics {diagnostics:?}");
    let expected = "\
    Object.defineProperty(C.prototype, \"x\", {
        get: function () {
            return 1;
        },
        set: function (v) {
        },
        enumerable: true,
        configurable: true
    });
";
    assert!(output.text.contains(expected), "{}", output.text);
    assert_eq!(output.text.matches("Object.defineProperty").count(), 1);
}

#[test]
fn test_accessors_on_es3_are_reported() {
    let mut b = DeclTreeBuilder::new();
    b.open(DeclKind::Class, "C", DeclFlags::empty(), span());
    b.open(DeclKind::GetAccessor, "x", DeclFlags::empty(), span());
    b.stmt(Code::lit("return 1;"), span());
    b.close();
    b.open(DeclKind::SetAccessor, "x", DeclFlags::empty(), span());
    b.leaf(DeclKind::Parameter, "v", DeclFlags::empty(), span());
    b.close();
    b.close();

    let options = CompilerOptions {
        target: ScriptTarget::ES3,
        ..CompilerOptions::default()
    };
    let (output, _) = emit_with(&options, b.finish());
    let reported = output
        .diagnostics
        .iter()
        .filter(|d| d.code == diagnostic_codes::ACCESSORS_ARE_ONLY_AVAILABLE_WHEN_TARGETING_ECMASCRIPT_5_AND_HIGHER)
        .count();
    assert_eq!(reported, 2, "{:?}", output.diagnostics);
    assert!(output.text.contains("Object.defineProperty"), "{}", output.text);
}

#[test]
fn test_duplicate_class_is_emitted_once() {
    let mut b = DeclTreeBuilder::new();
    empty_class(&mut b, "C");
    empty_class(&mut b, "C");

    let (output, diagnostics) = emit(b.finish());
    assert!(
        diagnostics.iter().any(|d| d.code == diagnostic_codes::DUPLICATE_IDENTIFIER),
        "{diagnostics:?}"
    );
    assert_eq!(output.text.matches("var C = ").count(), 1, "{}", output.text);
}

#[test]
fn test_exported_class_in_module() {
    let mut b = DeclTreeBuilder::new();
    b.open(DeclKind::Container, "M", DeclFlags::empty(), span());
    b.open(DeclKind::Class, "C", DeclFlags::EXPORTED, span());
    b.close();
    b.close();

    let (output, _) = emit(b.finish());
    assert!(output.text.contains("    })();\n    M.C = C;\n"), "{}", output.text);
}
