//! Abstract type lattice used to bias mutations.
//!
//! A [`Type`] is a bitmask over a fixed set of base categories, optionally
//! refined by an [`ObjectGroup`] for object values. Types are advisory: they
//! guide mutation choices but are never guaranteed to match runtime behavior.
//!
//! The base categories and the object groups are declared exactly once, in
//! the two macro invocations below. The runtime-side type collection helper
//! is rendered from the same tables (see [`crate::runtime_helpers`]).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

macro_rules! base_types {
    ($($konst:ident => $name:literal = $bits:expr),+ $(,)?) => {
        impl Type {
            $(
                pub const $konst: Type = Type::from_bits($bits);
            )+
        }

        /// Every base category with the name the runtime helper uses for it.
        pub const BASE_TYPES: &[(&str, Type)] = &[$(($name, Type::$konst)),+];
    };
}

macro_rules! object_groups {
    ($($group:ident => $check:literal),+ $(,)?) => {
        /// Named object categories observed at runtime.
        ///
        /// Declaration order is the classification order: a value is assigned
        /// to the first group whose check matches, so `Object` must stay last.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum ObjectGroup {
            $($group),+
        }

        impl ObjectGroup {
            pub const ALL: &'static [ObjectGroup] = &[$(ObjectGroup::$group),+];

            pub fn name(&self) -> &'static str {
                match self {
                    $(ObjectGroup::$group => stringify!($group)),+
                }
            }

            pub fn from_name(name: &str) -> Option<ObjectGroup> {
                match name {
                    $(stringify!($group) => Some(ObjectGroup::$group),)+
                    _ => None,
                }
            }

            /// JavaScript predicate over `obj` deciding membership in this group.
            pub fn js_check(&self) -> &'static str {
                match self {
                    $(ObjectGroup::$group => $check),+
                }
            }
        }
    };
}

/// An abstract classification of a runtime value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Type {
    bits: u16,
    group: Option<ObjectGroup>,
}

base_types! {
    NOTHING => "nothing" = 0,
    UNDEFINED => "undefined" = 1 << 0,
    INTEGER => "integer" = 1 << 1,
    FLOAT => "float" = 1 << 2,
    STRING => "string" = 1 << 3,
    BOOLEAN => "boolean" = 1 << 4,
    OBJECT => "object" = 1 << 5,
    FUNCTION => "function" = 1 << 6,
    CONSTRUCTOR => "constructor" = 1 << 7,
    UNKNOWN => "unknown" = 1 << 8,
    BIGINT => "bigint" = 1 << 9,
    REGEXP => "regexp" = 1 << 10,
}

object_groups! {
    Symbol => "typeof obj === 'symbol'",
    String => "obj instanceof String",
    RegExp => "obj instanceof RegExp",
    Array => "obj instanceof Array",
    Map => "obj instanceof Map",
    Promise => "obj instanceof Promise",
    WeakMap => "obj instanceof WeakMap",
    Set => "obj instanceof Set",
    WeakSet => "obj instanceof WeakSet",
    ArrayBuffer => "obj instanceof ArrayBuffer",
    DataView => "obj instanceof DataView",
    Uint8Array => "obj instanceof Uint8Array",
    Int8Array => "obj instanceof Int8Array",
    Uint16Array => "obj instanceof Uint16Array",
    Int16Array => "obj instanceof Int16Array",
    Uint32Array => "obj instanceof Uint32Array",
    Int32Array => "obj instanceof Int32Array",
    Float32Array => "obj instanceof Float32Array",
    Float64Array => "obj instanceof Float64Array",
    Uint8ClampedArray => "obj instanceof Uint8ClampedArray",
    Object => "obj instanceof Object",
}

impl Type {
    pub const NUMBER: Type = Type::from_bits(Type::INTEGER.bits | Type::FLOAT.bits);

    pub const PRIMITIVE: Type = Type::from_bits(
        Type::UNDEFINED.bits
            | Type::INTEGER.bits
            | Type::FLOAT.bits
            | Type::STRING.bits
            | Type::BOOLEAN.bits
            | Type::BIGINT.bits,
    );

    /// Union of every base category.
    pub const ANYTHING: Type = Type::from_bits(0x07ff);

    pub const fn from_bits(bits: u16) -> Self {
        Self { bits, group: None }
    }

    /// An object known to belong to `group`.
    pub const fn object_of_group(group: ObjectGroup) -> Self {
        Self {
            bits: Type::OBJECT.bits,
            group: Some(group),
        }
    }

    pub const fn bits(&self) -> u16 {
        self.bits
    }

    pub fn group(&self) -> Option<ObjectGroup> {
        self.group
    }

    pub fn union(self, other: Type) -> Type {
        let group = match (self.group, other.group) {
            (Some(a), Some(b)) if a == b => Some(a),
            (Some(a), None) if !other.may_be(Type::OBJECT) => Some(a),
            (None, Some(b)) if !self.may_be(Type::OBJECT) => Some(b),
            _ => None,
        };
        Type {
            bits: self.bits | other.bits,
            group,
        }
    }

    pub fn intersection(self, other: Type) -> Type {
        let bits = self.bits & other.bits;
        let group = if bits & Type::OBJECT.bits != 0 {
            self.group.or(other.group)
        } else {
            None
        };
        Type { bits, group }
    }

    /// True if every value of `self` is also a value of `other`.
    pub fn is(&self, other: Type) -> bool {
        if self.bits & !other.bits != 0 {
            return false;
        }
        match other.group {
            Some(group) => self.group == Some(group) || !self.may_be(Type::OBJECT),
            None => true,
        }
    }

    /// True if a value of `self` could also be a value of `other`.
    pub fn may_be(&self, other: Type) -> bool {
        self.bits & other.bits != 0
    }

    pub fn is_nothing(&self) -> bool {
        self.bits == 0
    }

    pub fn is_unknown(&self) -> bool {
        self.bits == Type::UNKNOWN.bits
    }

    pub fn is_numeric(&self) -> bool {
        !self.is_nothing() && self.is(Type::NUMBER)
    }

    /// Whether a value of `self` is a plausible stand-in for a value of `wanted`.
    ///
    /// `unknown` on either side is compatible with everything; otherwise the
    /// two types must overlap in at least one base category.
    pub fn is_compatible_with(&self, wanted: Type) -> bool {
        self.may_be(Type::UNKNOWN) || wanted.may_be(Type::UNKNOWN) || self.may_be(wanted)
    }

    /// The base categories making up this type, in table order.
    pub fn categories(&self) -> impl Iterator<Item = &'static str> + '_ {
        BASE_TYPES
            .iter()
            .filter(move |(_, t)| t.bits != 0 && self.bits & t.bits != 0)
            .map(|(name, _)| *name)
    }
}

impl Default for Type {
    fn default() -> Self {
        Type::UNKNOWN
    }
}

impl BitOr for Type {
    type Output = Type;

    fn bitor(self, rhs: Type) -> Type {
        self.union(rhs)
    }
}

impl BitOrAssign for Type {
    fn bitor_assign(&mut self, rhs: Type) {
        *self = self.union(rhs);
    }
}

impl BitAnd for Type {
    type Output = Type;

    fn bitand(self, rhs: Type) -> Type {
        self.intersection(rhs)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_nothing() {
            return write!(f, ".nothing");
        }
        let mut first = true;
        for name in self.categories() {
            if !first {
                write!(f, " | ")?;
            }
            first = false;
            match (name, self.group) {
                ("object", Some(group)) => write!(f, ".object({})", group.name())?,
                _ => write!(f, ".{}", name)?,
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_type_bits() {
        assert_eq!(Type::NOTHING.bits(), 0);
        assert_eq!(Type::UNDEFINED.bits(), 1);
        assert_eq!(Type::INTEGER.bits(), 2);
        assert_eq!(Type::UNKNOWN.bits(), 256);
        assert_eq!(Type::REGEXP.bits(), 1024);
        let all = BASE_TYPES.iter().fold(Type::NOTHING, |acc, (_, t)| acc | *t);
        assert_eq!(all, Type::ANYTHING);
    }

    #[test]
    fn test_union_and_subsumption() {
        let t = Type::INTEGER | Type::FLOAT;
        assert_eq!(t, Type::NUMBER);
        assert!(Type::INTEGER.is(Type::NUMBER));
        assert!(!Type::NUMBER.is(Type::INTEGER));
        assert!(Type::NUMBER.may_be(Type::INTEGER));
        assert!(!Type::STRING.may_be(Type::NUMBER));
        assert!(Type::NOTHING.is(Type::STRING));
        assert_eq!((Type::NUMBER & Type::FLOAT), Type::FLOAT);
    }

    #[test]
    fn test_unknown_is_distinct_from_nothing() {
        assert_ne!(Type::UNKNOWN, Type::NOTHING);
        assert!(Type::UNKNOWN.is_unknown());
        assert!(!Type::NOTHING.is_unknown());
        assert!(Type::UNKNOWN.is_compatible_with(Type::STRING));
        assert!(Type::STRING.is_compatible_with(Type::UNKNOWN));
        assert!(!Type::STRING.is_compatible_with(Type::INTEGER));
    }

    #[test]
    fn test_object_groups() {
        let array = Type::object_of_group(ObjectGroup::Array);
        assert!(array.is(Type::OBJECT));
        assert!(!Type::OBJECT.is(array));
        assert_eq!(array | array, array);

        let map = Type::object_of_group(ObjectGroup::Map);
        let merged = array | map;
        assert_eq!(merged.group(), None);
        assert!(merged.is(Type::OBJECT));

        let maybe_array = array | Type::UNDEFINED;
        assert_eq!(maybe_array.group(), Some(ObjectGroup::Array));
    }

    #[test]
    fn test_object_group_order() {
        assert_eq!(ObjectGroup::ALL.first(), Some(&ObjectGroup::Symbol));
        assert_eq!(ObjectGroup::ALL.last(), Some(&ObjectGroup::Object));
        assert_eq!(ObjectGroup::Float64Array.name(), "Float64Array");
        assert_eq!(ObjectGroup::from_name("Map"), Some(ObjectGroup::Map));
        assert_eq!(ObjectGroup::from_name("Nope"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Type::INTEGER.to_string(), ".integer");
        assert_eq!((Type::FLOAT | Type::STRING).to_string(), ".float | .string");
        assert_eq!(
            Type::object_of_group(ObjectGroup::Array).to_string(),
            ".object(Array)"
        );
        assert_eq!(Type::NOTHING.to_string(), ".nothing");
    }
}
