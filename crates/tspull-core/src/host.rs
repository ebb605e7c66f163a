//! Output hosts: where emitted files go.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use indexmap::IndexMap;

const BYTE_ORDER_MARK: char = '\u{feff}';

/// Receives one call per output file.
pub trait EmitHost {
    fn write_file(&mut self, path: &str, contents: &str, write_byte_order_mark: bool) -> Result<()>;
}

/// Keeps outputs in memory, in write order.
#[derive(Clone, Debug, Default)]
pub struct MemoryHost {
    files: IndexMap<String, String>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl EmitHost for MemoryHost {
    fn write_file(&mut self, path: &str, contents: &str, write_byte_order_mark: bool) -> Result<()> {
        let mut text = String::with_capacity(contents.len() + 3);
        if write_byte_order_mark {
            text.push(BYTE_ORDER_MARK);
        }
        text.push_str(contents);
        self.files.insert(path.to_string(), text);
        Ok(())
    }
}

/// Writes outputs below a root directory, creating parents as needed.
#[derive(Clone, Debug)]
pub struct FsHost {
    root: PathBuf,
}

impl FsHost {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl EmitHost for FsHost {
    fn write_file(&mut self, path: &str, contents: &str, write_byte_order_mark: bool) -> Result<()> {
        let target = self.root.join(path);
        if let Some(parent) = target.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        let bytes = if write_byte_order_mark {
            format!("{BYTE_ORDER_MARK}{contents}")
        } else {
            contents.to_string()
        };
        fs::write(&target, bytes).with_context(|| format!("failed to write {}", target.display()))?;
        Ok(())
    }
}
