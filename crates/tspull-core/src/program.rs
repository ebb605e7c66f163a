//! Program emit: every unit through the emitter and out to a host.
//!
//! Without `out_file` each unit gets its own output. With it, all units
//! are appended to one session in registration order and share its
//! prologue, so helpers are written once for the whole file.

use tracing::{Level, debug, span, warn};
use tspull_common::{DiagnosticEvent, diagnostic_codes};
use tspull_decl::DeclLookup;
use tspull_emitter::{EmitOutput, EmitSession, output_file_name};

use crate::host::EmitHost;
use crate::registry::Registry;

/// What a program emit produced.
#[derive(Clone, Debug, Default)]
pub struct ProgramOutput {
    /// Paths handed to the host, maps included.
    pub files_written: Vec<String>,
    pub diagnostics: Vec<DiagnosticEvent>,
}

impl Registry {
    pub fn emit_program(&mut self, host: &mut dyn EmitHost) -> ProgramOutput {
        self.bind_all();
        let _span = span!(Level::DEBUG, "emit_program", units = self.units().len()).entered();
        let mut result = ProgramOutput::default();

        match self.options().out_file.clone() {
            None => {
                for id in self.units().ids() {
                    let Some(path) = self.units().unit_path(id) else {
                        continue;
                    };
                    let Some(file_name) = output_file_name(path) else {
                        debug!(path, "declaration file has no output");
                        continue;
                    };
                    let mut session = EmitSession::new(self.options().clone(), file_name);
                    let mut failures = Vec::new();
                    self.emit_into(&mut session, id, &mut failures);
                    let output = self.finish_session(session, failures);
                    self.write_output(host, output, &mut result);
                }
            }
            Some(out_file) => {
                let mut session = EmitSession::new(self.options().clone(), out_file);
                let mut failures = Vec::new();
                for id in self.units().ids() {
                    let emits = self
                        .units()
                        .unit_path(id)
                        .is_some_and(|p| output_file_name(p).is_some());
                    if emits {
                        self.emit_into(&mut session, id, &mut failures);
                    }
                }
                let output = self.finish_session(session, failures);
                self.write_output(host, output, &mut result);
            }
        }
        result
    }

    fn write_output(&self, host: &mut dyn EmitHost, output: EmitOutput, result: &mut ProgramOutput) {
        let bom = self.options().emit_bom;
        let map_name = output.map_file_name();
        result.diagnostics.extend(output.diagnostics);

        write_one(host, &output.file_name, &output.text, bom, result);
        if let Some(map) = output.source_map {
            write_one(host, &map_name, &map, false, result);
        }
    }
}

fn write_one(host: &mut dyn EmitHost, path: &str, contents: &str, bom: bool, result: &mut ProgramOutput) {
    match host.write_file(path, contents, bom) {
        Ok(()) => result.files_written.push(path.to_string()),
        Err(err) => {
            let message = format!("{err:#}");
            warn!(path, error = %message, "write failed");
            result.diagnostics.push(DiagnosticEvent {
                file: String::new(),
                start: 0,
                length: 0,
                code: diagnostic_codes::COULD_NOT_WRITE_FILE,
                args: vec![path.to_string(), message],
            });
        }
    }
}
