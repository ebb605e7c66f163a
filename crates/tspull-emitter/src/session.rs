//! One output file: the writer, the mapping frames and the prologue state
//! shared by every unit written to it.

use tracing::{debug, warn};
use tspull_binder::SymbolGraph;
use tspull_common::{CompilerOptions, DiagnosticEvent};
use tspull_decl::{DeclLookup, UnitId};

use crate::context::{EmitContext, EmitState};
use crate::errors::EmitError;
use crate::mapping::{MappingFrame, SourceMapBuilder, flatten_into};
use crate::printer::Printer;
use crate::source_map::SourceMapGenerator;
use crate::writer::SourceWriter;

/// A finished output file.
#[derive(Clone, Debug, Default)]
pub struct EmitOutput {
    pub file_name: String,
    pub text: String,
    /// v3 JSON, when source maps are enabled.
    pub source_map: Option<String>,
    pub diagnostics: Vec<DiagnosticEvent>,
    pub frames: Vec<MappingFrame>,
}

impl EmitOutput {
    pub fn map_file_name(&self) -> String {
        format!("{}.map", self.file_name)
    }
}

pub struct EmitSession {
    pub(crate) options: CompilerOptions,
    file_name: String,
    pub(crate) writer: SourceWriter,
    pub(crate) mappings: SourceMapBuilder,
    pub(crate) ctx: EmitContext,
    pub(crate) diagnostics: Vec<DiagnosticEvent>,
    sources: Vec<String>,
}

impl EmitSession {
    pub fn new(options: CompilerOptions, file_name: impl Into<String>) -> Self {
        let mut writer = SourceWriter::with_capacity(4096);
        writer.set_new_line(options.new_line);
        Self {
            options,
            file_name: file_name.into(),
            writer,
            mappings: SourceMapBuilder::new(),
            ctx: EmitContext::new(),
            diagnostics: Vec::new(),
            sources: Vec::new(),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn state(&self) -> EmitState {
        self.ctx.state()
    }

    /// Append one unit. On failure everything the unit wrote is discarded
    /// and the session stays usable for the next unit.
    pub fn emit_unit(
        &mut self,
        graph: &SymbolGraph,
        units: &dyn DeclLookup,
        unit: UnitId,
        source_text: &str,
    ) -> Result<(), EmitError> {
        if self.ctx.state() == EmitState::Closed {
            self.ctx.advance(EmitState::Idle)?;
        }
        let path = units.unit_path(unit).ok_or(EmitError::UnknownUnit(unit))?.to_string();

        let writer_checkpoint = self.writer.checkpoint();
        let mapping_checkpoint = self.mappings.checkpoint();
        let diagnostics_len = self.diagnostics.len();
        let prologue = self.ctx.prologue;
        let sources_len = self.sources.len();

        let source_index = match self.sources.iter().position(|s| *s == path) {
            Some(index) => index as u32,
            None => {
                self.sources.push(path.clone());
                (self.sources.len() - 1) as u32
            }
        };

        let result = Printer::new(self, graph, units, unit, source_text, source_index)
            .and_then(Printer::emit_unit);
        if let Err(err) = &result {
            warn!(path = %path, error = %err, "unit emit aborted");
            self.writer.rollback(writer_checkpoint);
            self.mappings.rollback(mapping_checkpoint);
            self.diagnostics.truncate(diagnostics_len);
            self.sources.truncate(sources_len);
            self.ctx.abort_unit();
            self.ctx.prologue = prologue;
        }
        result
    }

    /// Close the output. Fails if a mapping frame was left open.
    pub fn finish(mut self) -> Result<EmitOutput, EmitError> {
        let frames = self.mappings.finish()?;
        let source_map = if self.options.source_map {
            let mut generator = SourceMapGenerator::new(base_name(&self.file_name).to_string());
            let dir = parent_dir(&self.file_name);
            for source in &self.sources {
                generator.add_source(relative_to(dir, source).to_string());
            }
            flatten_into(&frames, &mut generator);
            self.writer.ensure_line_start();
            let map_name = base_name(&self.file_name);
            self.writer.write(&format!("//# sourceMappingURL={map_name}.map"));
            self.writer.write_line();
            Some(generator.to_json())
        } else {
            None
        };
        debug!(file = %self.file_name, sources = self.sources.len(), "output finished");
        Ok(EmitOutput {
            file_name: self.file_name,
            text: self.writer.take_output(),
            source_map,
            diagnostics: self.diagnostics,
            frames,
        })
    }
}

fn base_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

fn parent_dir(path: &str) -> &str {
    path.rfind(['/', '\\']).map_or("", |i| &path[..i])
}

/// Sources are listed relative to the map, which sits next to the output.
fn relative_to<'a>(dir: &str, path: &'a str) -> &'a str {
    if dir.is_empty() {
        return path;
    }
    path.strip_prefix(dir)
        .and_then(|rest| rest.strip_prefix(['/', '\\']))
        .unwrap_or(path)
}
