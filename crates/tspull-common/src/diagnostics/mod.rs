//! Diagnostic types, message lookup and the sink shared by binder and emitter.
//!
//! Producers report raw events (`code` + positional `args`) through
//! [`DiagnosticSink`]; rendering to text happens once, against the catalog
//! in `data.rs`.

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use serde::Serialize;

mod data;
pub use data::{DIAGNOSTIC_MESSAGES, diagnostic_codes, diagnostic_messages};

// =============================================================================
// Diagnostic Types
// =============================================================================

/// Diagnostic category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum DiagnosticCategory {
    Warning = 0,
    Error = 1,
    Suggestion = 2,
    Message = 3,
}

/// A catalog entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DiagnosticMessage {
    pub code: u32,
    pub category: DiagnosticCategory,
    pub message: &'static str,
}

/// A rendered diagnostic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub file: String,
    pub start: u32,
    pub length: u32,
    pub message_text: String,
    pub category: DiagnosticCategory,
    pub code: u32,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    #[must_use]
    pub const fn error(file: String, start: u32, length: u32, message: String, code: u32) -> Self {
        Self {
            file,
            start,
            length,
            message_text: message,
            category: DiagnosticCategory::Error,
            code,
        }
    }
}

/// A raw diagnostic as reported by the binder or emitter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DiagnosticEvent {
    pub file: String,
    pub start: u32,
    pub length: u32,
    pub code: u32,
    pub args: Vec<String>,
}

impl DiagnosticEvent {
    /// Render against the catalog. Unknown codes render as their number.
    pub fn render(&self) -> Diagnostic {
        let args: Vec<&str> = self.args.iter().map(String::as_str).collect();
        let (message_text, category) = match lookup(self.code) {
            Some(entry) => (format_message(entry.message, &args), entry.category),
            None => (format!("TS{}", self.code), DiagnosticCategory::Error),
        };
        Diagnostic {
            file: self.file.clone(),
            start: self.start,
            length: self.length,
            message_text,
            category,
            code: self.code,
        }
    }
}

// =============================================================================
// Sink
// =============================================================================

/// Where binder, emitter and driver report user-facing diagnostics.
///
/// A unit pass collects into a plain `Vec<DiagnosticEvent>` so its events
/// can be kept per unit and replaced on rebind; callers that want one
/// ordered list use [`DiagnosticBag`].
pub trait DiagnosticSink {
    fn add_diagnostic(&mut self, unit_path: &str, start: u32, length: u32, code: u32, args: &[&str]);
}

impl DiagnosticSink for Vec<DiagnosticEvent> {
    fn add_diagnostic(&mut self, unit_path: &str, start: u32, length: u32, code: u32, args: &[&str]) {
        self.push(DiagnosticEvent {
            file: unit_path.to_string(),
            start,
            length,
            code,
            args: args.iter().map(|a| (*a).to_string()).collect(),
        });
    }
}

/// Default sink: an ordered list of events.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticBag {
    events: Vec<DiagnosticEvent>,
}

impl DiagnosticBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[DiagnosticEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn has_code(&self, code: u32) -> bool {
        self.events.iter().any(|e| e.code == code)
    }

    pub fn count_code(&self, code: u32) -> usize {
        self.events.iter().filter(|e| e.code == code).count()
    }

    pub fn push(&mut self, event: DiagnosticEvent) {
        self.events.push(event);
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = DiagnosticEvent>) {
        self.events.extend(events);
    }

    pub fn render(&self) -> Vec<Diagnostic> {
        self.events.iter().map(DiagnosticEvent::render).collect()
    }
}

impl DiagnosticSink for DiagnosticBag {
    fn add_diagnostic(&mut self, unit_path: &str, start: u32, length: u32, code: u32, args: &[&str]) {
        self.events.add_diagnostic(unit_path, start, length, code, args);
    }
}

// =============================================================================
// Catalog lookup
// =============================================================================

static CATALOG_INDEX: Lazy<FxHashMap<u32, &'static DiagnosticMessage>> = Lazy::new(|| {
    let mut index = FxHashMap::default();
    for entry in DIAGNOSTIC_MESSAGES {
        let previous = index.insert(entry.code, entry);
        assert!(
            previous.is_none(),
            "diagnostic code {} is registered twice",
            entry.code
        );
    }
    index
});

/// Look up a catalog entry by code.
pub fn lookup(code: u32) -> Option<&'static DiagnosticMessage> {
    CATALOG_INDEX.get(&code).copied()
}

pub fn get_message_template(code: u32) -> Option<&'static str> {
    lookup(code).map(|m| m.message)
}

/// Substitute `{0}`, `{1}`, ... placeholders.
pub fn format_message(message: &str, args: &[&str]) -> String {
    let mut result = message.to_string();
    for (i, arg) in args.iter().enumerate() {
        result = result.replace(&format!("{{{i}}}"), arg);
    }
    result
}
