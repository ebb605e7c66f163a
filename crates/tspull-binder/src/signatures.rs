//! Call, construct and index signatures.

use serde::Serialize;
use tspull_decl::DeclRef;

use crate::symbols::SymbolId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SignatureId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum SignatureKind {
    Call,
    Construct,
    Index,
}

#[derive(Clone, Debug)]
pub struct Signature {
    pub kind: SignatureKind,
    /// Declaration that produced the signature. Synthesized default
    /// constructors point at the class value declaration.
    pub decl: DeclRef,
    /// Symbol whose signature list holds this signature.
    pub owner: SymbolId,
    pub parameters: Vec<SymbolId>,
    /// Annotation text per parameter, `any` when absent.
    pub parameter_types: Vec<String>,
    pub return_type: Option<String>,
    pub type_parameters: Vec<SymbolId>,
    pub is_definition: bool,
    pub has_var_args: bool,
    pub synthesized: bool,
}

impl Signature {
    /// Two overloads with the same shape are duplicates.
    pub fn same_shape(&self, other: &Signature) -> bool {
        self.kind == other.kind
            && self.parameter_types == other.parameter_types
            && self.return_type == other.return_type
            && self.type_parameters.len() == other.type_parameters.len()
            && self.has_var_args == other.has_var_args
    }
}

#[derive(Clone, Debug, Default)]
pub struct SignatureArena {
    slots: Vec<Option<Signature>>,
    free: Vec<u32>,
}

impl SignatureArena {
    pub fn alloc(&mut self, signature: Signature) -> SignatureId {
        if let Some(index) = self.free.pop() {
            self.slots[index as usize] = Some(signature);
            SignatureId(index)
        } else {
            self.slots.push(Some(signature));
            SignatureId(self.slots.len() as u32 - 1)
        }
    }

    pub fn get(&self, id: SignatureId) -> Option<&Signature> {
        self.slots.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: SignatureId) -> Option<&mut Signature> {
        self.slots.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    pub fn free(&mut self, id: SignatureId) -> Option<Signature> {
        let taken = self.slots.get_mut(id.0 as usize)?.take();
        if taken.is_some() {
            self.free.push(id.0);
        }
        taken
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (SignatureId, &Signature)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|s| (SignatureId(i as u32), s)))
    }
}
