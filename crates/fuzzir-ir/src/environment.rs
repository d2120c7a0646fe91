//! Static knowledge about the target runtime's global environment.
//!
//! Used by code generation to pick plausible names and by type inference to
//! type builtin loads.

use crate::types::Type;

const CONSTRUCTOR_FUNCTION: Type = Type::from_bits(Type::FUNCTION.bits() | Type::CONSTRUCTOR.bits());

/// Global builtins and the type of the value each one names.
pub const BUILTINS: &[(&str, Type)] = &[
    ("Object", CONSTRUCTOR_FUNCTION),
    ("Array", CONSTRUCTOR_FUNCTION),
    ("Function", CONSTRUCTOR_FUNCTION),
    ("String", CONSTRUCTOR_FUNCTION),
    ("Number", CONSTRUCTOR_FUNCTION),
    ("Boolean", CONSTRUCTOR_FUNCTION),
    ("Map", CONSTRUCTOR_FUNCTION),
    ("Set", CONSTRUCTOR_FUNCTION),
    ("WeakMap", CONSTRUCTOR_FUNCTION),
    ("WeakSet", CONSTRUCTOR_FUNCTION),
    ("Promise", CONSTRUCTOR_FUNCTION),
    ("RegExp", CONSTRUCTOR_FUNCTION),
    ("ArrayBuffer", CONSTRUCTOR_FUNCTION),
    ("DataView", CONSTRUCTOR_FUNCTION),
    ("Uint8Array", CONSTRUCTOR_FUNCTION),
    ("Int32Array", CONSTRUCTOR_FUNCTION),
    ("Float64Array", CONSTRUCTOR_FUNCTION),
    ("Symbol", Type::FUNCTION),
    ("BigInt", Type::FUNCTION),
    ("parseInt", Type::FUNCTION),
    ("parseFloat", Type::FUNCTION),
    ("isNaN", Type::FUNCTION),
    ("isFinite", Type::FUNCTION),
    ("Math", Type::OBJECT),
    ("JSON", Type::OBJECT),
    ("Reflect", Type::OBJECT),
    ("globalThis", Type::OBJECT),
    ("NaN", Type::FLOAT),
    ("Infinity", Type::FLOAT),
    ("undefined", Type::UNDEFINED),
];

pub const PROPERTY_NAMES: &[&str] = &[
    "a", "b", "c", "length", "prototype", "constructor", "__proto__", "valueOf", "toString",
    "0", "1", "size", "byteLength", "buffer", "name",
];

pub const METHOD_NAMES: &[&str] = &[
    "toString", "valueOf", "push", "pop", "slice", "splice", "concat", "indexOf", "join",
    "keys", "values", "entries", "get", "set", "has", "delete", "apply", "call", "bind",
    "charCodeAt", "replace", "exec", "then", "fill", "sort", "reverse",
];

pub const INTERESTING_INTEGERS: &[i64] = &[
    -9007199254740993, -9007199254740992, -4294967297, -4294967296, -2147483649, -2147483648,
    -1073741824, -65536, -4096, -1024, -256, -128, -1, 0, 1, 2, 7, 16, 64, 127, 128, 255, 256,
    1024, 4096, 65535, 65536, 1073741823, 1073741824, 2147483647, 2147483648, 4294967295,
    4294967296, 9007199254740991, 9007199254740992,
];

pub const INTERESTING_FLOATS: &[f64] = &[
    -1e-15, -1e12, -1e9, -1e6, -1e3, -5.0, -2.0, -1.0, -0.0, 0.0, 0.5, 1.0, 1.5, 2.0, 3.14,
    1e3, 1e6, 1e9, 1e12, 1e-15, 1.7976931348623157e308, 5e-324,
];

pub const INTERESTING_STRINGS: &[&str] = &[
    "", "a", "foo", "length", "__proto__", "constructor", "0", "-1", "1e3", "NaN",
    "undefined", "\u{0}", "\u{ffff}", "\u{1f600}",
];

pub const REGEXP_PATTERNS: &[&str] = &[
    "a", "[a-z]+", "(a|b)*c", "\\d+", "^x$", "(?<n>.)\\k<n>", "\\bfoo\\b", ".*?", "(?=a)b",
];

pub const REGEXP_FLAGS: &[&str] = &["", "g", "i", "m", "gi", "u", "y", "s", "gimsuy"];

/// Type of the builtin called `name`, or `unknown` for names we know nothing about
pub fn builtin_type(name: &str) -> Type {
    BUILTINS
        .iter()
        .find(|(builtin, _)| *builtin == name)
        .map(|(_, ty)| *ty)
        .unwrap_or(Type::UNKNOWN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_types() {
        assert!(builtin_type("Array").may_be(Type::CONSTRUCTOR));
        assert_eq!(builtin_type("Math"), Type::OBJECT);
        assert_eq!(builtin_type("doesNotExist"), Type::UNKNOWN);
    }
}
