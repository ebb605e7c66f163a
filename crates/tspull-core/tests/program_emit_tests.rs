//! Program emit through memory, filesystem and failing hosts.

use anyhow::{Result, anyhow};
use tspull_common::{CompilerOptions, NewLineKind, TextSpan, diagnostic_codes};
use tspull_core::{EmitHost, FsHost, MemoryHost, Registry, UnitSource};
use tspull_decl::{Code, DeclFlags, DeclKind, DeclTreeBuilder};

fn span() -> TextSpan {
    TextSpan::default()
}

/// `var <name> = <init>;`
fn script(name: &str, init: &str) -> UnitSource {
    let text = format!("var {name} = {init};\n");
    let mut b = DeclTreeBuilder::with_source(text.as_str());
    let span = b.locate(&format!("var {name} = {init};"));
    let v = b.leaf(DeclKind::Variable, name, DeclFlags::empty(), span);
    b.set_initializer(v, Code::lit(init));
    UnitSource::from_builder(b)
}

/// `class <name> extends <name>Base {}` with its base.
fn derived_class(name: &str) -> UnitSource {
    let mut b = DeclTreeBuilder::new();
    b.leaf(DeclKind::Class, &format!("{name}Base"), DeclFlags::empty(), span());
    let c = b.leaf(DeclKind::Class, name, DeclFlags::empty(), span());
    b.set_extends(c, Code::new().reference(format!("{name}Base"), span()));
    UnitSource::from_builder(b)
}

fn ambient_declarations() -> UnitSource {
    let mut b = DeclTreeBuilder::new();
    b.leaf(DeclKind::Variable, "console", DeclFlags::AMBIENT, span());
    UnitSource::from_builder(b)
}

fn registry(options: CompilerOptions, units: Vec<(&str, UnitSource)>) -> Registry {
    let mut registry = Registry::new(options);
    for (path, source) in units {
        registry.add_unit(path, source).expect("fresh path");
    }
    registry
}

struct FailingHost;

impl EmitHost for FailingHost {
    fn write_file(&mut self, _path: &str, _contents: &str, _bom: bool) -> Result<()> {
        Err(anyhow!("disk full"))
    }
}

#[test]
fn test_one_output_per_unit() {
    let mut registry = registry(
        CompilerOptions::default(),
        vec![
            ("lib.d.ts", ambient_declarations()),
            ("a.ts", script("a", "1")),
            ("b.ts", script("b", "2")),
        ],
    );
    let mut host = MemoryHost::new();
    let result = registry.emit_program(&mut host);

    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    assert_eq!(result.files_written, vec!["a.js", "b.js"]);
    assert_eq!(host.paths().collect::<Vec<_>>(), vec!["a.js", "b.js"]);
    assert_eq!(host.file("a.js"), Some("var a = 1;\n"));
    assert_eq!(host.file("b.js"), Some("var b = 2;\n"));
}

#[test]
fn test_out_file_concatenates_in_registration_order() {
    let options = CompilerOptions {
        out_file: Some("all.js".to_string()),
        ..CompilerOptions::default()
    };
    let mut registry = registry(
        options,
        vec![
            ("two.ts", derived_class("Two")),
            ("lib.d.ts", ambient_declarations()),
            ("one.ts", derived_class("One")),
        ],
    );
    let mut host = MemoryHost::new();
    let result = registry.emit_program(&mut host);

    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    assert_eq!(result.files_written, vec!["all.js"]);
    let text = host.file("all.js").expect("written");
    assert_eq!(text.matches("var __extends").count(), 1, "{text}");
    let two = text.find("var Two = ").expect("Two emitted");
    let one = text.find("var One = ").expect("One emitted");
    assert!(two < one, "registration order {text}");
}

#[test]
fn test_source_maps_are_written_next_to_outputs() {
    let options = CompilerOptions {
        source_map: true,
        ..CompilerOptions::default()
    };
    let mut registry = registry(options, vec![("src/a.ts", script("a", "1"))]);
    let mut host = MemoryHost::new();
    let result = registry.emit_program(&mut host);

    assert_eq!(result.files_written, vec!["src/a.js", "src/a.js.map"]);
    let js = host.file("src/a.js").expect("written");
    assert!(js.ends_with("//# sourceMappingURL=a.js.map\n"), "{js}");

    let map: serde_json::Value =
        serde_json::from_str(host.file("src/a.js.map").expect("written")).expect("valid json");
    assert_eq!(map["version"], 3);
    assert_eq!(map["file"], "a.js");
    assert_eq!(map["sources"], serde_json::json!(["a.ts"]));
    assert!(!map["mappings"].as_str().unwrap_or_default().is_empty());
}

#[test]
fn test_byte_order_mark_and_crlf() {
    let options = CompilerOptions {
        emit_bom: true,
        new_line: NewLineKind::CarriageReturnLineFeed,
        source_map: true,
        ..CompilerOptions::default()
    };
    let mut registry = registry(options, vec![("a.ts", script("a", "1"))]);
    let mut host = MemoryHost::new();
    registry.emit_program(&mut host);

    let js = host.file("a.js").expect("written");
    assert!(js.starts_with("\u{feff}var a = 1;\r\n"), "{js:?}");
    let map = host.file("a.js.map").expect("written");
    assert!(map.starts_with('{'), "map files carry no BOM {map:?}");
}

#[test]
fn test_write_failures_become_diagnostics() {
    let mut registry = registry(CompilerOptions::default(), vec![("a.ts", script("a", "1"))]);
    let result = registry.emit_program(&mut FailingHost);

    assert!(result.files_written.is_empty());
    assert_eq!(result.diagnostics.len(), 1, "{:?}", result.diagnostics);
    let failure = &result.diagnostics[0];
    assert_eq!(failure.code, diagnostic_codes::COULD_NOT_WRITE_FILE);
    assert_eq!(failure.args[0], "a.js");
    assert_eq!(
        failure.render().message_text,
        "Could not write file 'a.js': disk full."
    );
}

#[test]
fn test_binder_diagnostics_do_not_block_emit() {
    let duplicate = {
        let mut b = DeclTreeBuilder::new();
        b.leaf(DeclKind::Class, "C", DeclFlags::empty(), span());
        b.leaf(DeclKind::Class, "C", DeclFlags::empty(), span());
        UnitSource::from_builder(b)
    };
    let mut registry = registry(CompilerOptions::default(), vec![("a.ts", duplicate)]);
    let mut host = MemoryHost::new();
    let result = registry.emit_program(&mut host);

    assert!(result.diagnostics.is_empty(), "emit itself succeeded {:?}", result.diagnostics);
    assert!(registry.diagnostics().has_code(diagnostic_codes::DUPLICATE_IDENTIFIER));
    let text = host.file("a.js").expect("written");
    assert_eq!(text.matches("var C = ").count(), 1, "{text}");
}

#[test]
fn test_fs_host_writes_nested_paths() {
    let dir = tempfile::tempdir().expect("temp dir");
    let options = CompilerOptions {
        emit_bom: true,
        ..CompilerOptions::default()
    };
    let mut registry = registry(options, vec![("src/nested/a.ts", script("a", "1"))]);
    let mut host = FsHost::new(dir.path());
    let result = registry.emit_program(&mut host);

    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    let written = std::fs::read(dir.path().join("src/nested/a.js")).expect("file on disk");
    assert_eq!(&written[..3], &[0xEF, 0xBB, 0xBF]);
    assert_eq!(&written[3..], b"var a = 1;\n");
}

#[test]
fn test_fs_host_reports_unwritable_target() {
    let dir = tempfile::tempdir().expect("temp dir");
    let blocker = dir.path().join("out");
    std::fs::write(&blocker, "not a directory").expect("write blocker");

    let mut host = FsHost::new(&blocker);
    let err = host
        .write_file("a.js", "var a;", false)
        .expect_err("parent is a file");
    assert!(format!("{err:#}").contains("failed to"), "{err:#}");
}
