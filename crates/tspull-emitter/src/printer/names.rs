//! Name qualification.

use tracing::trace;
use tspull_binder::{ValueHit, resolve_value};
use tspull_common::TextSpan;
use tspull_decl::DeclId;

use super::Printer;
use crate::errors::EmitError;
use crate::helpers::THIS_CAPTURE;

impl<'s, 'a> Printer<'s, 'a> {
    /// Print `name` as referenced from code owned by `owner`: bare, through
    /// `this`, or qualified by its module, enum, class or `exports`.
    pub(crate) fn emit_reference(&mut self, owner: DeclId, name: &str, span: TextSpan) -> Result<(), EmitError> {
        let hit = resolve_value(self.graph, self.units, self.dref(owner), name);
        trace!(name, ?hit, "qualify reference");
        self.start_mapping(span, Some(name));
        match hit {
            ValueHit::Bare => self.write(name),
            ValueHit::InstanceMember => {
                let this = self.this_text(owner);
                self.write(&format!("{this}.{name}"));
            }
            ValueHit::Qualified(qualifier) => self.write(&format!("{qualifier}.{name}")),
            ValueHit::Exported => self.write(&format!("exports.{name}")),
        }
        self.end_mapping()
    }

    /// `this`, or the captured `_this` when an arrow function lies between
    /// `owner` and the declaration that owns `this`.
    pub(crate) fn this_text(&self, owner: DeclId) -> &'static str {
        let (_, crossed_arrow) = self.tree.this_scope(owner);
        if crossed_arrow { THIS_CAPTURE } else { "this" }
    }
}
