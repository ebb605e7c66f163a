//! Emit context: the per-unit state machine, the scope stack and the
//! prologue state shared by every unit written to the same output.

use rustc_hash::FxHashSet;
use tspull_decl::DeclId;

use crate::errors::EmitError;

/// Per-unit emitter state. A unit moves `Idle -> Prologue -> BodyWalk ->
/// Closed`; `Closed -> Idle` readies the context for the next unit of a
/// concatenated output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EmitState {
    #[default]
    Idle,
    Prologue,
    BodyWalk,
    Closed,
}

impl EmitState {
    pub const fn can_advance_to(self, next: EmitState) -> bool {
        matches!(
            (self, next),
            (EmitState::Idle, EmitState::Prologue)
                | (EmitState::Prologue, EmitState::BodyWalk)
                | (EmitState::BodyWalk, EmitState::Closed)
                | (EmitState::Closed, EmitState::Idle)
        )
    }
}

/// Helpers already written to the current output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PrologueState {
    pub extends_emitted: bool,
}

/// One statement list being emitted.
#[derive(Debug)]
pub(crate) struct ScopeFrame {
    pub owner: DeclId,
    /// Names given a `var` or function declaration in this list.
    pub declared: FxHashSet<String>,
}

#[derive(Debug, Default)]
pub struct EmitContext {
    state: EmitState,
    pub prologue: PrologueState,
    scopes: Vec<ScopeFrame>,
}

impl EmitContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> EmitState {
        self.state
    }

    pub fn advance(&mut self, next: EmitState) -> Result<(), EmitError> {
        if !self.state.can_advance_to(next) {
            return Err(EmitError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    /// Forget a unit that was aborted mid-emit.
    pub fn abort_unit(&mut self) {
        self.scopes.clear();
        self.state = EmitState::Idle;
    }

    pub(crate) fn push_scope(&mut self, owner: DeclId) {
        self.scopes.push(ScopeFrame {
            owner,
            declared: FxHashSet::default(),
        });
    }

    /// Close the innermost scope, which must belong to `owner`.
    pub(crate) fn pop_scope(&mut self, owner: DeclId) -> Result<ScopeFrame, EmitError> {
        let frame = self.scopes.pop().ok_or(EmitError::ScopeUnderflow)?;
        if frame.owner != owner {
            return Err(EmitError::ScopeMismatch {
                expected: owner,
                found: frame.owner,
            });
        }
        Ok(frame)
    }

    /// Record `name` as declared in the innermost scope. Returns false if it
    /// already was.
    pub(crate) fn declare(&mut self, name: &str) -> bool {
        match self.scopes.last_mut() {
            Some(frame) => frame.declared.insert(name.to_string()),
            None => true,
        }
    }

    pub(crate) fn check_balanced(&self) -> Result<(), EmitError> {
        if self.scopes.is_empty() {
            Ok(())
        } else {
            Err(EmitError::UnbalancedScopes {
                open: self.scopes.len(),
            })
        }
    }
}
