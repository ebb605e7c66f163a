//! Runtime helpers injected into the prologue.

/// Copies statics and chains prototypes for a derived class.
pub const EXTENDS_HELPER: &str = "var __extends = this.__extends || function (d, b) {
    for (var p in b) if (b.hasOwnProperty(p)) d[p] = b[p];
    function __() { this.constructor = d; }
    __.prototype = b.prototype;
    d.prototype = new __();
};";

/// Parameter name of a class closure whose class has a base.
pub const SUPER_PARAM: &str = "_super";

/// Local that holds the outer `this` for lowered arrow functions.
pub const THIS_CAPTURE: &str = "_this";

/// Loop index of rest parameter collection.
pub const REST_INDEX: &str = "_i";
