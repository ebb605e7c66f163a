//! Mapping frames recorded while printing.
//!
//! Every emitted declaration opens a frame when its output starts and closes
//! it when the output ends. Frames nest, so the builder is a stack of
//! stacks: one list of finished siblings per open nesting level.

use tspull_common::LineAndCharacter;

use crate::errors::EmitError;
use crate::source_map::{Mapping, SourceMapGenerator};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MappingFrame {
    pub source_index: u32,
    pub source_start: LineAndCharacter,
    pub source_end: LineAndCharacter,
    /// Emitted (line, column) of the first character.
    pub emitted_start: (u32, u32),
    /// Emitted (line, column) just past the last character.
    pub emitted_end: (u32, u32),
    pub name: Option<String>,
    pub children: Vec<MappingFrame>,
}

impl MappingFrame {
    /// Total number of frames in this subtree.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(MappingFrame::count).sum::<usize>()
    }
}

/// Where a unit's frames started, for rollback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MappingCheckpoint {
    depth: usize,
    siblings: usize,
}

#[derive(Debug)]
pub struct SourceMapBuilder {
    open: Vec<MappingFrame>,
    /// `levels[0]` holds finished root frames; `levels[i + 1]` the finished
    /// children of `open[i]`.
    levels: Vec<Vec<MappingFrame>>,
}

impl Default for SourceMapBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceMapBuilder {
    pub fn new() -> Self {
        Self {
            open: Vec::new(),
            levels: vec![Vec::new()],
        }
    }

    pub fn depth(&self) -> usize {
        self.open.len()
    }

    pub fn start(
        &mut self,
        source_index: u32,
        source_start: LineAndCharacter,
        source_end: LineAndCharacter,
        emitted: (u32, u32),
        name: Option<String>,
    ) {
        self.open.push(MappingFrame {
            source_index,
            source_start,
            source_end,
            emitted_start: emitted,
            emitted_end: emitted,
            name,
            children: Vec::new(),
        });
        self.levels.push(Vec::new());
    }

    pub fn end(&mut self, emitted: (u32, u32)) -> Result<(), EmitError> {
        let mut frame = self.open.pop().ok_or(EmitError::MappingUnderflow)?;
        frame.children = self.levels.pop().unwrap_or_default();
        frame.emitted_end = emitted;
        match self.levels.last_mut() {
            Some(siblings) => siblings.push(frame),
            None => return Err(EmitError::MappingUnderflow),
        }
        Ok(())
    }

    pub fn checkpoint(&self) -> MappingCheckpoint {
        MappingCheckpoint {
            depth: self.open.len(),
            siblings: self.levels.last().map_or(0, Vec::len),
        }
    }

    /// Drop every frame opened or finished since `checkpoint`.
    pub fn rollback(&mut self, checkpoint: MappingCheckpoint) {
        self.open.truncate(checkpoint.depth);
        self.levels.truncate(checkpoint.depth + 1);
        if let Some(siblings) = self.levels.last_mut() {
            siblings.truncate(checkpoint.siblings);
        }
    }

    /// Finished root frames. Fails if any frame is still open.
    pub fn finish(mut self) -> Result<Vec<MappingFrame>, EmitError> {
        if !self.open.is_empty() {
            return Err(EmitError::UnbalancedMapping { open: self.open.len() });
        }
        Ok(self.levels.pop().unwrap_or_default())
    }
}

/// Flatten frames into segments: one at each frame's start, named when the
/// frame is, and one at its end.
pub fn flatten_into(frames: &[MappingFrame], generator: &mut SourceMapGenerator) {
    for frame in frames {
        let name_index = frame.name.clone().map(|n| generator.add_name(n));
        generator.add_mapping(Mapping {
            generated_line: frame.emitted_start.0,
            generated_column: frame.emitted_start.1,
            source_index: frame.source_index,
            original_line: frame.source_start.line,
            original_column: frame.source_start.character,
            name_index,
        });
        flatten_into(&frame.children, generator);
        if frame.emitted_end != frame.emitted_start {
            generator.add_mapping(Mapping {
                generated_line: frame.emitted_end.0,
                generated_column: frame.emitted_end.1,
                source_index: frame.source_index,
                original_line: frame.source_end.line,
                original_column: frame.source_end.character,
                name_index: None,
            });
        }
    }
}
