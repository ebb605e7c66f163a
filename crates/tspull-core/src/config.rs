//! Configuration file loading.
//!
//! The file is JSON with comments and trailing commas allowed. Only the
//! `compilerOptions` object and the `files` list are read; unknown keys are
//! ignored. Boolean options also accept the strings `"true"`/`"false"`
//! (and `yes`/`no`, `on`/`off`, `1`/`0`).

use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Deserializer};
use tspull_common::{
    CompilerOptions, DiagnosticSink, ModuleKind, NewLineKind, ScriptTarget, diagnostic_codes,
};

fn deserialize_bool_or_string<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrString {
        Bool(bool),
        String(String),
    }

    match Option::<BoolOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(BoolOrString::Bool(b)) => Ok(Some(b)),
        Some(BoolOrString::String(s)) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Some(true)),
            "false" | "0" | "no" | "off" => Ok(Some(false)),
            _ => Err(Error::custom(format!(
                "invalid boolean value: '{s}'. Expected true, false, 'true', or 'false'"
            ))),
        },
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    #[serde(default)]
    pub compiler_options: Option<RawCompilerOptions>,
    #[serde(default)]
    pub files: Option<Vec<String>>,
}

/// `compilerOptions` as written in the file.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawCompilerOptions {
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default, deserialize_with = "deserialize_bool_or_string")]
    pub remove_comments: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_bool_or_string")]
    pub declaration: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_bool_or_string")]
    pub source_map: Option<bool>,
    #[serde(default)]
    pub out_file: Option<String>,
    #[serde(default, rename = "emitBOM", deserialize_with = "deserialize_bool_or_string")]
    pub emit_bom: Option<bool>,
    #[serde(default)]
    pub new_line: Option<String>,
}

pub fn parse_config(source: &str) -> Result<ConfigFile> {
    let stripped = strip_comments(source);
    let normalized = remove_trailing_commas(&stripped);
    let config = serde_json::from_str(&normalized).context("failed to parse config JSON")?;
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<ConfigFile> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    parse_config(&source).with_context(|| format!("failed to parse config: {}", path.display()))
}

/// Fill in defaults and check enumerated values. Names compare
/// case-insensitively.
pub fn resolve_compiler_options(raw: Option<&RawCompilerOptions>) -> Result<CompilerOptions> {
    let mut options = CompilerOptions::default();
    let Some(raw) = raw else {
        return Ok(options);
    };

    if let Some(target) = raw.target.as_deref() {
        options.target = match target.to_lowercase().as_str() {
            "es3" => ScriptTarget::ES3,
            "es5" => ScriptTarget::ES5,
            _ => bail!("unsupported target '{target}'"),
        };
    }
    if let Some(module) = raw.module.as_deref() {
        options.module = match module.to_lowercase().as_str() {
            "commonjs" => ModuleKind::CommonJS,
            "amd" => ModuleKind::AMD,
            _ => bail!("unsupported module kind '{module}'"),
        };
    }
    if let Some(new_line) = raw.new_line.as_deref() {
        options.new_line = match new_line.to_lowercase().as_str() {
            "lf" => NewLineKind::LineFeed,
            "crlf" => NewLineKind::CarriageReturnLineFeed,
            _ => bail!("unsupported newLine '{new_line}'"),
        };
    }
    options.remove_comments = raw.remove_comments.unwrap_or(false);
    options.declaration = raw.declaration.unwrap_or(false);
    options.source_map = raw.source_map.unwrap_or(false);
    options.emit_bom = raw.emit_bom.unwrap_or(false);
    options.out_file = raw.out_file.clone().filter(|f| !f.is_empty());
    Ok(options)
}

/// Load and resolve the options in one step. Any failure is reported as a
/// `Cannot read file` diagnostic and yields `None`.
pub fn read_compiler_options(path: &Path, sink: &mut dyn DiagnosticSink) -> Option<CompilerOptions> {
    let resolved = load_config(path).and_then(|config| resolve_compiler_options(config.compiler_options.as_ref()));
    match resolved {
        Ok(options) => Some(options),
        Err(err) => {
            let file = path.display().to_string();
            let message = format!("{err:#}");
            sink.add_diagnostic("", 0, 0, diagnostic_codes::CANNOT_READ_FILE, &[file.as_str(), message.as_str()]);
            None
        }
    }
}

fn strip_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;
    let mut escape = false;

    while let Some(ch) = chars.next() {
        if in_string {
            out.push(ch);
            if escape {
                escape = false;
            } else if ch == '\\' {
                escape = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match (ch, chars.peek().copied()) {
            ('"', _) => {
                in_string = true;
                out.push(ch);
            }
            ('/', Some('/')) => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    if next == '\n' {
                        out.push('\n');
                    }
                    prev = next;
                }
            }
            _ => out.push(ch),
        }
    }
    out
}

fn remove_trailing_commas(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;
    let mut escape = false;

    while let Some(ch) = chars.next() {
        if in_string {
            out.push(ch);
            if escape {
                escape = false;
            } else if ch == '\\' {
                escape = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        if ch == '"' {
            in_string = true;
            out.push(ch);
            continue;
        }

        if ch == ',' {
            let closes = chars
                .clone()
                .find(|c| !c.is_whitespace())
                .is_some_and(|c| c == '}' || c == ']');
            if closes {
                continue;
            }
        }
        out.push(ch);
    }
    out
}
