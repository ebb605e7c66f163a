//! Compiler core session: the unit registry, program emit and
//! configuration.
//!
//! A [`Registry`] holds every compilation unit of a program together with
//! the shared symbol graph. Units are added, replaced and removed by path;
//! binding happens lazily on the next query and emit goes through an
//! [`EmitHost`].
//!
//! ```ignore
//! let mut registry = Registry::new(options);
//! registry.add_unit("a.ts", UnitSource::from_builder(builder))?;
//! let result = registry.emit_program(&mut FsHost::new("out"));
//! ```
//!
//! Logging: call [`tracing_config::init_tracing`] once at startup.
//! Registry mutations are `debug!` spans, written outputs are `info!`.

pub mod config;
pub mod errors;
pub mod host;
pub mod program;
pub mod registry;
pub mod tracing_config;

pub use config::{ConfigFile, RawCompilerOptions, load_config, parse_config, resolve_compiler_options};
pub use errors::RegistryError;
pub use host::{EmitHost, FsHost, MemoryHost};
pub use program::ProgramOutput;
pub use registry::{Registry, UnitSource, UnitState, UnitTable};
