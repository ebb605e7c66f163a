//! Configuration parsing and option resolution.

use std::io::Write;

use tspull_common::{DiagnosticBag, ModuleKind, NewLineKind, ScriptTarget, diagnostic_codes};
use tspull_core::config::read_compiler_options;
use tspull_core::{load_config, parse_config, resolve_compiler_options};

#[test]
fn test_parse_config_with_comments_and_trailing_commas() {
    let source = r#"{
        // build settings
        "compilerOptions": {
            "target": "ES3",
            "module": "amd", /* wrapped in define */
            "removeComments": "yes",
            "sourceMap": true,
            "outFile": "out/all.js",
            "emitBOM": "1",
            "newLine": "CRLF",
        },
        "files": ["a.ts", "b.ts",],
    }"#;
    let config = parse_config(source).expect("valid config");
    assert_eq!(config.files, Some(vec!["a.ts".to_string(), "b.ts".to_string()]));

    let options = resolve_compiler_options(config.compiler_options.as_ref()).expect("known values");
    assert_eq!(options.target, ScriptTarget::ES3);
    assert_eq!(options.module, ModuleKind::AMD);
    assert!(options.remove_comments);
    assert!(options.source_map);
    assert!(options.emit_bom);
    assert!(!options.declaration);
    assert_eq!(options.out_file.as_deref(), Some("out/all.js"));
    assert_eq!(options.new_line, NewLineKind::CarriageReturnLineFeed);
    assert!(!options.output_many());
}

#[test]
fn test_missing_compiler_options_use_defaults() {
    let config = parse_config("{}").expect("valid config");
    assert!(config.files.is_none());
    let options = resolve_compiler_options(config.compiler_options.as_ref()).expect("defaults");
    assert_eq!(options, Default::default());
    assert!(options.output_many());

    let config = parse_config(r#"{ "compilerOptions": { "outFile": "" } }"#).expect("valid config");
    let options = resolve_compiler_options(config.compiler_options.as_ref()).expect("defaults");
    assert!(options.out_file.is_none(), "empty outFile means one output per unit");
}

#[test]
fn test_invalid_boolean_string_is_rejected() {
    let err = parse_config(r#"{ "compilerOptions": { "sourceMap": "maybe" } }"#).expect_err("not a boolean");
    assert!(format!("{err:#}").contains("invalid boolean value: 'maybe'"), "{err:#}");
}

#[test]
fn test_unknown_enumerated_values_are_rejected() {
    for (json, needle) in [
        (r#"{ "compilerOptions": { "target": "es2015" } }"#, "unsupported target 'es2015'"),
        (r#"{ "compilerOptions": { "module": "umd" } }"#, "unsupported module kind 'umd'"),
        (r#"{ "compilerOptions": { "newLine": "cr" } }"#, "unsupported newLine 'cr'"),
    ] {
        let config = parse_config(json).expect("valid json");
        let err = resolve_compiler_options(config.compiler_options.as_ref()).expect_err(needle);
        assert!(err.to_string().contains(needle), "{err}");
    }
}

#[test]
fn test_load_config_from_disk() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(file, r#"{{ "compilerOptions": {{ "declaration": "true" }} }}"#).expect("write config");

    let config = load_config(file.path()).expect("readable config");
    let options = resolve_compiler_options(config.compiler_options.as_ref()).expect("known values");
    assert!(options.declaration);
}

#[test]
fn test_load_config_errors_carry_context() {
    let dir = tempfile::tempdir().expect("temp dir");
    let missing = dir.path().join("missing.json");
    let err = load_config(&missing).expect_err("no such file");
    assert!(format!("{err:#}").contains("failed to read config"), "{err:#}");

    let broken = dir.path().join("broken.json");
    std::fs::write(&broken, "{ not json").expect("write config");
    let err = load_config(&broken).expect_err("invalid json");
    assert!(format!("{err:#}").contains("failed to parse config"), "{err:#}");
}

#[test]
fn test_unreadable_config_is_reported_as_diagnostic() {
    let dir = tempfile::tempdir().expect("temp dir");
    let missing = dir.path().join("missing.json");
    let mut bag = DiagnosticBag::new();

    assert!(read_compiler_options(&missing, &mut bag).is_none());
    assert_eq!(bag.count_code(diagnostic_codes::CANNOT_READ_FILE), 1);
    let rendered = bag.render();
    assert!(
        rendered[0].message_text.starts_with("Cannot read file '"),
        "{}",
        rendered[0].message_text
    );
    assert_eq!(bag.events()[0].args[0], missing.display().to_string());
}
