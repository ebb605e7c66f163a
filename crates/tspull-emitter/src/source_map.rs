//! Source map v3 serialization.
//!
//! The printer records a tree of mapping frames (see [`crate::mapping`]);
//! once a unit is finished the tree is flattened into a
//! [`SourceMapGenerator`] and serialized here. Serialization is a separate
//! step so an aborted unit never leaves half-written segments behind.

use rustc_hash::FxHashMap;
use serde::Serialize;

/// Base64 VLQ encoding of signed segment fields.
pub mod vlq {
    const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    const SHIFT: u32 = 5;
    const MASK: u32 = (1 << SHIFT) - 1;
    const CONTINUATION: u32 = 1 << SHIFT;

    pub fn encode(value: i32) -> String {
        let mut out = String::new();
        encode_into(value, &mut out);
        out
    }

    pub fn encode_into(value: i32, out: &mut String) {
        let mut vlq = if value < 0 {
            ((value.unsigned_abs()) << 1) | 1
        } else {
            (value as u32) << 1
        };
        loop {
            let mut digit = vlq & MASK;
            vlq >>= SHIFT;
            if vlq > 0 {
                digit |= CONTINUATION;
            }
            out.push(BASE64[digit as usize] as char);
            if vlq == 0 {
                break;
            }
        }
    }

    /// Decode one value from the front of `input`. Returns the value and the
    /// number of characters consumed.
    pub fn decode(input: &str) -> Option<(i32, usize)> {
        let mut result: u32 = 0;
        let mut shift = 0;
        for (consumed, byte) in input.bytes().enumerate() {
            let digit = BASE64.iter().position(|&b| b == byte)? as u32;
            if shift >= 32 {
                return None;
            }
            result |= (digit & MASK) << shift;
            if digit & CONTINUATION == 0 {
                let magnitude = (result >> 1) as i32;
                let value = if result & 1 == 1 { -magnitude } else { magnitude };
                return Some((value, consumed + 1));
            }
            shift += SHIFT;
        }
        None
    }
}

/// One decoded or pending segment. All positions are 0-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mapping {
    pub generated_line: u32,
    pub generated_column: u32,
    pub source_index: u32,
    pub original_line: u32,
    pub original_column: u32,
    pub name_index: Option<u32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RawSourceMap<'a> {
    version: u32,
    file: &'a str,
    source_root: &'a str,
    sources: &'a [String],
    names: &'a [String],
    mappings: String,
}

#[derive(Debug, Default)]
pub struct SourceMapGenerator {
    file: String,
    sources: Vec<String>,
    names: Vec<String>,
    name_indices: FxHashMap<String, u32>,
    mappings: Vec<Mapping>,
}

impl SourceMapGenerator {
    pub fn new(file: String) -> Self {
        Self {
            file,
            ..Self::default()
        }
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn add_source(&mut self, source: String) -> u32 {
        if let Some(existing) = self.sources.iter().position(|s| *s == source) {
            return existing as u32;
        }
        self.sources.push(source);
        (self.sources.len() - 1) as u32
    }

    pub fn add_name(&mut self, name: String) -> u32 {
        if let Some(&index) = self.name_indices.get(&name) {
            return index;
        }
        let index = self.names.len() as u32;
        self.name_indices.insert(name.clone(), index);
        self.names.push(name);
        index
    }

    pub fn add_simple_mapping(
        &mut self,
        generated_line: u32,
        generated_column: u32,
        source_index: u32,
        original_line: u32,
        original_column: u32,
    ) {
        self.add_mapping(Mapping {
            generated_line,
            generated_column,
            source_index,
            original_line,
            original_column,
            name_index: None,
        });
    }

    pub fn add_named_mapping(
        &mut self,
        generated_line: u32,
        generated_column: u32,
        source_index: u32,
        original_line: u32,
        original_column: u32,
        name_index: u32,
    ) {
        self.add_mapping(Mapping {
            generated_line,
            generated_column,
            source_index,
            original_line,
            original_column,
            name_index: Some(name_index),
        });
    }

    pub fn add_mapping(&mut self, mapping: Mapping) {
        self.mappings.push(mapping);
    }

    pub fn mappings(&self) -> &[Mapping] {
        &self.mappings
    }

    /// Segments sorted by generated position, one per generated position.
    fn sorted_mappings(&self) -> Vec<Mapping> {
        let mut sorted = self.mappings.clone();
        sorted.sort_by_key(|m| (m.generated_line, m.generated_column));
        sorted.dedup_by_key(|m| (m.generated_line, m.generated_column));
        sorted
    }

    /// The `mappings` field: `;` between generated lines, `,` between
    /// segments, every field relative to the previous segment.
    pub fn serialize_mappings(&self) -> String {
        let mut out = String::new();
        let mut line = 0u32;
        let mut prev_column = 0i64;
        let mut prev_source = 0i64;
        let mut prev_original_line = 0i64;
        let mut prev_original_column = 0i64;
        let mut prev_name = 0i64;
        let mut first_on_line = true;

        for mapping in self.sorted_mappings() {
            while line < mapping.generated_line {
                out.push(';');
                line += 1;
                prev_column = 0;
                first_on_line = true;
            }
            if !first_on_line {
                out.push(',');
            }
            first_on_line = false;

            vlq::encode_into((mapping.generated_column as i64 - prev_column) as i32, &mut out);
            prev_column = mapping.generated_column as i64;
            vlq::encode_into((mapping.source_index as i64 - prev_source) as i32, &mut out);
            prev_source = mapping.source_index as i64;
            vlq::encode_into((mapping.original_line as i64 - prev_original_line) as i32, &mut out);
            prev_original_line = mapping.original_line as i64;
            vlq::encode_into((mapping.original_column as i64 - prev_original_column) as i32, &mut out);
            prev_original_column = mapping.original_column as i64;
            if let Some(name) = mapping.name_index {
                vlq::encode_into((name as i64 - prev_name) as i32, &mut out);
                prev_name = name as i64;
            }
        }
        out
    }

    pub fn to_json(&self) -> String {
        let raw = RawSourceMap {
            version: 3,
            file: &self.file,
            source_root: "",
            sources: &self.sources,
            names: &self.names,
            mappings: self.serialize_mappings(),
        };
        // Plain strings and integers only; serialization cannot fail.
        serde_json::to_string(&raw).unwrap_or_default()
    }
}

/// Decode a `mappings` string back into absolute segments.
pub fn decode_mappings(mappings: &str) -> Vec<Mapping> {
    let mut decoded = Vec::new();
    let mut source = 0i64;
    let mut original_line = 0i64;
    let mut original_column = 0i64;
    let mut name = 0i64;

    for (line, group) in mappings.split(';').enumerate() {
        let mut column = 0i64;
        for segment in group.split(',').filter(|s| !s.is_empty()) {
            let mut fields = Vec::with_capacity(5);
            let mut rest = segment;
            while !rest.is_empty() {
                let Some((value, consumed)) = vlq::decode(rest) else {
                    break;
                };
                fields.push(value as i64);
                rest = &rest[consumed..];
            }
            let Some(&delta_column) = fields.first() else {
                continue;
            };
            column += delta_column;
            if fields.len() < 4 {
                continue;
            }
            source += fields[1];
            original_line += fields[2];
            original_column += fields[3];
            let name_index = fields.get(4).map(|delta| {
                name += delta;
                name as u32
            });
            decoded.push(Mapping {
                generated_line: line as u32,
                generated_column: column as u32,
                source_index: source as u32,
                original_line: original_line as u32,
                original_column: original_column as u32,
                name_index,
            });
        }
    }
    decoded
}
