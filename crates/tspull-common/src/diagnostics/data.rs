//! Diagnostic message catalog.
//!
//! Code ranges:
//! - 0..100: meta (internal failures surfaced to the user)
//! - 1000..2000: syntactic legality checks
//! - 2000..3000: semantic / binder
//! - 4000..5000: structural comparison (reserved)
//! - 5000..6000: driver

use super::{DiagnosticCategory, DiagnosticMessage};

pub mod diagnostic_codes {
    pub const INTERNAL_ERROR_WHILE_BINDING_0: u32 = 10;
    pub const INTERNAL_ERROR_WHILE_EMITTING_0: u32 = 11;

    pub const A_REST_PARAMETER_MUST_BE_LAST_IN_A_PARAMETER_LIST: u32 = 1014;
    pub const ACCESSORS_ARE_ONLY_AVAILABLE_WHEN_TARGETING_ECMASCRIPT_5_AND_HIGHER: u32 = 1056;
    pub const ACCESSORS_CANNOT_HAVE_TYPE_PARAMETERS: u32 = 1094;

    pub const DUPLICATE_IDENTIFIER: u32 = 2300;
    pub const CANNOT_FIND_EXTERNAL_MODULE: u32 = 2307;
    pub const GETTER_ALREADY_DECLARED: u32 = 2350;
    pub const SETTER_ALREADY_DECLARED: u32 = 2351;
    pub const DUPLICATE_STRING_INDEX_SIGNATURE: u32 = 2374;
    pub const DUPLICATE_NUMBER_INDEX_SIGNATURE: u32 = 2375;
    pub const DUPLICATE_OVERLOAD_SIGNATURE: u32 = 2386;
    pub const CONSTRUCTOR_IMPLEMENTATION_EXPECTED: u32 = 2390;
    pub const FUNCTION_IMPLEMENTATION_EXPECTED: u32 = 2391;
    pub const MULTIPLE_CONSTRUCTOR_IMPLEMENTATIONS_ARE_NOT_ALLOWED: u32 = 2392;
    pub const ALL_DECLARATIONS_OF_MERGED_DECLARATION_MUST_BE_EXPORTED_OR_NOT_EXPORTED: u32 = 2395;
    pub const ENUMS_WITH_MULTIPLE_DECLARATIONS_MUST_PROVIDE_AN_INITIALIZER_FOR_THE_FIRST_ENUM_ELEMENT: u32 = 2432;
    pub const MODULE_CANNOT_MERGE_WITH_PREVIOUS_DECLARATION_IN_A_DIFFERENT_FILE: u32 = 2433;
    pub const AMBIENT_EXTERNAL_MODULE_DECLARATION_CANNOT_BE_NESTED_IN_OTHER_MODULES: u32 = 2435;

    pub const CANNOT_READ_FILE: u32 = 5012;
    pub const COULD_NOT_WRITE_FILE: u32 = 5033;
}

pub mod diagnostic_messages {
    pub const INTERNAL_ERROR_WHILE_BINDING_0: &str = "Internal error while binding: {0}";
    pub const INTERNAL_ERROR_WHILE_EMITTING_0: &str = "Internal error while emitting: {0}";

    pub const A_REST_PARAMETER_MUST_BE_LAST_IN_A_PARAMETER_LIST: &str =
        "A rest parameter must be last in a parameter list.";
    pub const ACCESSORS_ARE_ONLY_AVAILABLE_WHEN_TARGETING_ECMASCRIPT_5_AND_HIGHER: &str =
        "Accessors are only available when targeting ECMAScript 5 and higher.";
    pub const ACCESSORS_CANNOT_HAVE_TYPE_PARAMETERS: &str =
        "Accessors cannot have type parameters.";

    pub const DUPLICATE_IDENTIFIER: &str = "Duplicate identifier '{0}'.";
    pub const CANNOT_FIND_EXTERNAL_MODULE: &str = "Cannot find external module '{0}'.";
    pub const GETTER_ALREADY_DECLARED: &str = "Getter '{0}' already declared.";
    pub const SETTER_ALREADY_DECLARED: &str = "Setter '{0}' already declared.";
    pub const DUPLICATE_STRING_INDEX_SIGNATURE: &str = "Duplicate string index signature.";
    pub const DUPLICATE_NUMBER_INDEX_SIGNATURE: &str = "Duplicate number index signature.";
    pub const DUPLICATE_OVERLOAD_SIGNATURE: &str = "Duplicate overload signature for '{0}'.";
    pub const CONSTRUCTOR_IMPLEMENTATION_EXPECTED: &str = "Constructor implementation expected.";
    pub const FUNCTION_IMPLEMENTATION_EXPECTED: &str = "Function implementation expected.";
    pub const MULTIPLE_CONSTRUCTOR_IMPLEMENTATIONS_ARE_NOT_ALLOWED: &str =
        "Multiple constructor implementations are not allowed.";
    pub const ALL_DECLARATIONS_OF_MERGED_DECLARATION_MUST_BE_EXPORTED_OR_NOT_EXPORTED: &str =
        "All declarations of merged declaration '{0}' must be exported or not exported.";
    pub const ENUMS_WITH_MULTIPLE_DECLARATIONS_MUST_PROVIDE_AN_INITIALIZER_FOR_THE_FIRST_ENUM_ELEMENT: &str =
        "Enums with multiple declarations must provide an initializer for the first enum element.";
    pub const MODULE_CANNOT_MERGE_WITH_PREVIOUS_DECLARATION_IN_A_DIFFERENT_FILE: &str =
        "Module '{0}' cannot merge with previous declaration of '{1}' in a different file '{2}'.";
    pub const AMBIENT_EXTERNAL_MODULE_DECLARATION_CANNOT_BE_NESTED_IN_OTHER_MODULES: &str =
        "Ambient external module declaration cannot be nested in other modules.";

    pub const CANNOT_READ_FILE: &str = "Cannot read file '{0}': {1}.";
    pub const COULD_NOT_WRITE_FILE: &str = "Could not write file '{0}': {1}.";
}

macro_rules! catalog {
    ($($name:ident => $category:ident),* $(,)?) => {
        pub static DIAGNOSTIC_MESSAGES: &[DiagnosticMessage] = &[
            $(DiagnosticMessage {
                code: diagnostic_codes::$name,
                category: DiagnosticCategory::$category,
                message: diagnostic_messages::$name,
            },)*
        ];
    };
}

catalog! {
    INTERNAL_ERROR_WHILE_BINDING_0 => Error,
    INTERNAL_ERROR_WHILE_EMITTING_0 => Error,
    A_REST_PARAMETER_MUST_BE_LAST_IN_A_PARAMETER_LIST => Error,
    ACCESSORS_ARE_ONLY_AVAILABLE_WHEN_TARGETING_ECMASCRIPT_5_AND_HIGHER => Error,
    ACCESSORS_CANNOT_HAVE_TYPE_PARAMETERS => Error,
    DUPLICATE_IDENTIFIER => Error,
    CANNOT_FIND_EXTERNAL_MODULE => Error,
    GETTER_ALREADY_DECLARED => Error,
    SETTER_ALREADY_DECLARED => Error,
    DUPLICATE_STRING_INDEX_SIGNATURE => Error,
    DUPLICATE_NUMBER_INDEX_SIGNATURE => Error,
    DUPLICATE_OVERLOAD_SIGNATURE => Error,
    CONSTRUCTOR_IMPLEMENTATION_EXPECTED => Error,
    FUNCTION_IMPLEMENTATION_EXPECTED => Error,
    MULTIPLE_CONSTRUCTOR_IMPLEMENTATIONS_ARE_NOT_ALLOWED => Error,
    ALL_DECLARATIONS_OF_MERGED_DECLARATION_MUST_BE_EXPORTED_OR_NOT_EXPORTED => Error,
    ENUMS_WITH_MULTIPLE_DECLARATIONS_MUST_PROVIDE_AN_INITIALIZER_FOR_THE_FIRST_ENUM_ELEMENT => Error,
    MODULE_CANNOT_MERGE_WITH_PREVIOUS_DECLARATION_IN_A_DIFFERENT_FILE => Error,
    AMBIENT_EXTERNAL_MODULE_DECLARATION_CANNOT_BE_NESTED_IN_OTHER_MODULES => Error,
    CANNOT_READ_FILE => Error,
    COULD_NOT_WRITE_FILE => Error,
}
