//! Symbol storage.
//!
//! Symbols live in an arena indexed by [`SymbolId`]. Freed slots are reused,
//! so a `SymbolId` must not outlive the unit removal that destroyed it.

use bitflags::bitflags;
use rustc_hash::FxHashMap;
use serde::Serialize;
use smallvec::SmallVec;
use tspull_decl::DeclRef;

use crate::signatures::SignatureId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SymbolId(pub u32);

impl SymbolId {
    pub const NONE: SymbolId = SymbolId(u32::MAX);

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == u32::MAX
    }

    #[inline]
    pub const fn is_some(self) -> bool {
        self.0 != u32::MAX
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum SymbolKind {
    Class,
    Interface,
    Container,
    Enum,
    DynamicModule,
    Function,
    Variable,
    Parameter,
    Property,
    Method,
    ConstructorMethod,
    Accessor,
    EnumMember,
    TypeAlias,
    TypeParameter,
    TypeLiteral,
}

impl SymbolKind {
    pub const fn mask(self) -> KindMask {
        match self {
            SymbolKind::Class => KindMask::CLASS,
            SymbolKind::Interface => KindMask::INTERFACE,
            SymbolKind::Container => KindMask::CONTAINER,
            SymbolKind::Enum => KindMask::ENUM,
            SymbolKind::DynamicModule => KindMask::DYNAMIC_MODULE,
            SymbolKind::Function => KindMask::FUNCTION,
            SymbolKind::Variable => KindMask::VARIABLE,
            SymbolKind::Parameter => KindMask::PARAMETER,
            SymbolKind::Property => KindMask::PROPERTY,
            SymbolKind::Method => KindMask::METHOD,
            SymbolKind::ConstructorMethod => KindMask::CONSTRUCTOR_METHOD,
            SymbolKind::Accessor => KindMask::ACCESSOR,
            SymbolKind::EnumMember => KindMask::ENUM_MEMBER,
            SymbolKind::TypeAlias => KindMask::TYPE_ALIAS,
            SymbolKind::TypeParameter => KindMask::TYPE_PARAMETER,
            SymbolKind::TypeLiteral => KindMask::TYPE_LITERAL,
        }
    }

    pub const fn is_function_like(self) -> bool {
        matches!(
            self,
            SymbolKind::Function | SymbolKind::Method | SymbolKind::ConstructorMethod
        )
    }
}

bitflags! {
    /// Sets of symbol kinds used by lookups.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct KindMask: u32 {
        const CLASS = 1 << 0;
        const INTERFACE = 1 << 1;
        const CONTAINER = 1 << 2;
        const ENUM = 1 << 3;
        const DYNAMIC_MODULE = 1 << 4;
        const FUNCTION = 1 << 5;
        const VARIABLE = 1 << 6;
        const PARAMETER = 1 << 7;
        const PROPERTY = 1 << 8;
        const METHOD = 1 << 9;
        const CONSTRUCTOR_METHOD = 1 << 10;
        const ACCESSOR = 1 << 11;
        const ENUM_MEMBER = 1 << 12;
        const TYPE_ALIAS = 1 << 13;
        const TYPE_PARAMETER = 1 << 14;
        const TYPE_LITERAL = 1 << 15;

        const SOME_CONTAINER = Self::CONTAINER.bits() | Self::ENUM.bits() | Self::DYNAMIC_MODULE.bits();
        const SOME_NAMED_TYPE = Self::CLASS.bits()
            | Self::INTERFACE.bits()
            | Self::ENUM.bits()
            | Self::TYPE_ALIAS.bits();
        const SOME_FUNCTION = Self::FUNCTION.bits() | Self::METHOD.bits() | Self::CONSTRUCTOR_METHOD.bits();
        const SOME_VALUE = Self::SOME_FUNCTION.bits()
            | Self::VARIABLE.bits()
            | Self::PARAMETER.bits()
            | Self::PROPERTY.bits()
            | Self::ACCESSOR.bits()
            | Self::ENUM_MEMBER.bits()
            | Self::TYPE_ALIAS.bits();
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct SymbolFlags: u32 {
        const EXPORTED = 1 << 0;
        const AMBIENT = 1 << 1;
        const STATIC = 1 << 2;
        const PRIVATE = 1 << 3;
        const OPTIONAL = 1 << 4;
        /// Value side of a module, enum or class.
        const IMPLICIT = 1 << 5;
        /// Default constructor created for a class with no constructor.
        const SYNTHESIZED = 1 << 6;
        /// Created for a rejected redeclaration; never registered in a table.
        const ISOLATED = 1 << 7;
        /// A merge was accepted with an error (e.g. across files).
        const MERGE_ERROR = 1 << 8;
    }
}

/// Export-assigned slots of an import alias. Filled lazily by alias
/// resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AliasSlots {
    pub resolved: bool,
    pub value: SymbolId,
    pub type_symbol: SymbolId,
    pub container: SymbolId,
}

impl Default for AliasSlots {
    fn default() -> Self {
        Self {
            resolved: false,
            value: SymbolId::NONE,
            type_symbol: SymbolId::NONE,
            container: SymbolId::NONE,
        }
    }
}

/// Name-indexed symbol list that keeps insertion order.
#[derive(Clone, Debug, Default)]
pub struct MemberTable {
    order: Vec<SymbolId>,
    by_name: FxHashMap<String, SmallVec<[SymbolId; 2]>>,
}

impl MemberTable {
    pub fn insert(&mut self, name: &str, id: SymbolId) {
        let slot = self.by_name.entry(name.to_string()).or_default();
        if !slot.contains(&id) {
            slot.push(id);
            self.order.push(id);
        }
    }

    pub fn remove(&mut self, name: &str, id: SymbolId) -> bool {
        let Some(slot) = self.by_name.get_mut(name) else {
            return false;
        };
        let before = slot.len();
        slot.retain(|s| *s != id);
        let removed = slot.len() != before;
        if slot.is_empty() {
            self.by_name.remove(name);
        }
        if removed {
            self.order.retain(|s| *s != id);
        }
        removed
    }

    pub fn replace(&mut self, old: SymbolId, new: SymbolId) {
        for id in &mut self.order {
            if *id == old {
                *id = new;
            }
        }
        for slot in self.by_name.values_mut() {
            for id in slot.iter_mut() {
                if *id == old {
                    *id = new;
                }
            }
        }
    }

    /// Candidates for `name`, in insertion order.
    pub fn get(&self, name: &str) -> &[SymbolId] {
        self.by_name.get(name).map(|s| s.as_slice()).unwrap_or(&[])
    }

    pub fn contains(&self, id: SymbolId) -> bool {
        self.order.contains(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.order.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub flags: SymbolFlags,
    /// Declarations in bind order.
    pub declarations: SmallVec<[DeclRef; 1]>,
    /// Enclosing symbol, if registered under one.
    pub container: SymbolId,
    /// For value sides: the module, enum or class they stand for.
    pub type_symbol: SymbolId,
    /// Exported / member symbols.
    pub members: MemberTable,
    /// Non-exported symbols declared inside a module body.
    pub enclosed: MemberTable,
    /// Value side of a module or enum.
    pub instance_symbol: SymbolId,
    /// Constructor of a class.
    pub constructor: SymbolId,
    pub call_signatures: Vec<SignatureId>,
    pub construct_signatures: Vec<SignatureId>,
    pub index_signatures: Vec<SignatureId>,
    pub type_parameters: Vec<SymbolId>,
    pub getter: Option<SignatureId>,
    pub setter: Option<SignatureId>,
    pub alias: Option<AliasSlots>,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind) -> Self {
        Self {
            name: name.into(),
            kind,
            flags: SymbolFlags::empty(),
            declarations: SmallVec::new(),
            container: SymbolId::NONE,
            type_symbol: SymbolId::NONE,
            members: MemberTable::default(),
            enclosed: MemberTable::default(),
            instance_symbol: SymbolId::NONE,
            constructor: SymbolId::NONE,
            call_signatures: Vec::new(),
            construct_signatures: Vec::new(),
            index_signatures: Vec::new(),
            type_parameters: Vec::new(),
            getter: None,
            setter: None,
            alias: None,
        }
    }

    #[inline]
    pub fn has_flag(&self, flag: SymbolFlags) -> bool {
        self.flags.contains(flag)
    }

    pub fn is_isolated(&self) -> bool {
        self.flags.contains(SymbolFlags::ISOLATED)
    }

    pub fn matches(&self, mask: KindMask) -> bool {
        mask.intersects(self.kind.mask())
    }

    /// Every signature the symbol owns.
    pub fn all_signatures(&self) -> impl Iterator<Item = SignatureId> + '_ {
        self.call_signatures
            .iter()
            .chain(&self.construct_signatures)
            .chain(&self.index_signatures)
            .copied()
            .chain(self.getter)
            .chain(self.setter)
    }
}

/// Arena of symbols with slot reuse.
#[derive(Clone, Debug, Default)]
pub struct SymbolArena {
    slots: Vec<Option<Symbol>>,
    free: Vec<u32>,
}

impl SymbolArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, symbol: Symbol) -> SymbolId {
        if let Some(index) = self.free.pop() {
            self.slots[index as usize] = Some(symbol);
            SymbolId(index)
        } else {
            self.slots.push(Some(symbol));
            SymbolId(self.slots.len() as u32 - 1)
        }
    }

    pub fn get(&self, id: SymbolId) -> Option<&Symbol> {
        if id.is_none() {
            return None;
        }
        self.slots.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: SymbolId) -> Option<&mut Symbol> {
        if id.is_none() {
            return None;
        }
        self.slots.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    pub fn free(&mut self, id: SymbolId) -> Option<Symbol> {
        let taken = self.slots.get_mut(id.0 as usize)?.take();
        if taken.is_some() {
            self.free.push(id.0);
        }
        taken
    }

    pub fn contains(&self, id: SymbolId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live symbols.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|s| (SymbolId(i as u32), s)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (SymbolId, &mut Symbol)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, s)| s.as_mut().map(|s| (SymbolId(i as u32), s)))
    }
}
