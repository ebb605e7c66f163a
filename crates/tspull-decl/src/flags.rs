//! Declaration kinds and flags.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Closed set of declaration kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeclKind {
    Script,
    Container,
    Enum,
    EnumMember,
    DynamicModule,
    Class,
    Interface,
    Function,
    FunctionExpression,
    Variable,
    Property,
    Method,
    Constructor,
    GetAccessor,
    SetAccessor,
    CallSignature,
    ConstructSignature,
    IndexSignature,
    ObjectType,
    FunctionType,
    ConstructorType,
    TypeAlias,
    Parameter,
    TypeParameter,
    CatchBlock,
    WithBlock,
}

impl DeclKind {
    /// Kinds whose declarations own a parameter list and a local scope.
    pub const fn is_function_like(self) -> bool {
        matches!(
            self,
            DeclKind::Function
                | DeclKind::FunctionExpression
                | DeclKind::Method
                | DeclKind::Constructor
                | DeclKind::GetAccessor
                | DeclKind::SetAccessor
        )
    }

    pub const fn is_signature_like(self) -> bool {
        matches!(
            self,
            DeclKind::CallSignature
                | DeclKind::ConstructSignature
                | DeclKind::IndexSignature
                | DeclKind::FunctionType
                | DeclKind::ConstructorType
        )
    }

    /// Kinds that carry a statement list when they have a body.
    pub const fn has_statement_body(self) -> bool {
        matches!(
            self,
            DeclKind::Script
                | DeclKind::Container
                | DeclKind::DynamicModule
                | DeclKind::CatchBlock
                | DeclKind::WithBlock
        ) || self.is_function_like()
    }

    /// Kinds that appear as statements in their parent's body.
    pub const fn is_statement(self) -> bool {
        matches!(
            self,
            DeclKind::Container
                | DeclKind::Enum
                | DeclKind::DynamicModule
                | DeclKind::Class
                | DeclKind::Interface
                | DeclKind::Function
                | DeclKind::Variable
                | DeclKind::TypeAlias
        )
    }

    /// Kinds that can only be reached through an embedding code fragment.
    pub const fn is_embedded(self) -> bool {
        matches!(
            self,
            DeclKind::FunctionExpression
                | DeclKind::CatchBlock
                | DeclKind::WithBlock
                | DeclKind::ObjectType
                | DeclKind::FunctionType
                | DeclKind::ConstructorType
        )
    }

    /// Kinds that own the `this` binding of the code nested in them.
    pub const fn is_this_scope(self) -> bool {
        matches!(
            self,
            DeclKind::Script
                | DeclKind::Container
                | DeclKind::Enum
                | DeclKind::DynamicModule
                | DeclKind::Class
        ) || self.is_function_like()
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct DeclFlags: u32 {
        const EXPORTED = 1 << 0;
        const STATIC = 1 << 1;
        const PRIVATE = 1 << 2;
        const PUBLIC = 1 << 3;
        const OPTIONAL = 1 << 4;
        /// Var-arg parameter.
        const REST = 1 << 5;
        const AMBIENT = 1 << 6;
        /// Function-like declaration without a body.
        const SIGNATURE = 1 << 7;
        /// Companion value declaration synthesized for a module, enum or class.
        const IMPLICIT_VARIABLE = 1 << 8;
        const INITIALIZED_MODULE = 1 << 9;
        const INITIALIZED_ENUM = 1 << 10;
        const INITIALIZED_DYNAMIC_MODULE = 1 << 11;
        const CLASS_CONSTRUCTOR_VARIABLE = 1 << 12;
        const MUST_CAPTURE_THIS = 1 << 13;
        const ARROW_FUNCTION = 1 << 14;
        /// Constructor parameter that also declares a class property.
        const PROPERTY_PARAMETER = 1 << 15;
        /// The dynamic module is the file itself.
        const EXTERNAL_MODULE = 1 << 16;
        const SKIP_EMIT = 1 << 17;

        const SOME_INITIALIZED = Self::INITIALIZED_MODULE.bits()
            | Self::INITIALIZED_ENUM.bits()
            | Self::INITIALIZED_DYNAMIC_MODULE.bits();
        const ACCESSIBILITY = Self::PRIVATE.bits() | Self::PUBLIC.bits();
    }
}
