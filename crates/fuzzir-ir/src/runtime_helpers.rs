//! Runtime-side type collection prelude.
//!
//! The execution backend prepends a small script to every program that
//! classifies observed values into the same categories as [`Type`]. The
//! prelude is rendered from [`BASE_TYPES`] and [`ObjectGroup::ALL`], so the
//! two sides cannot drift apart. Group checks run in declaration order and
//! the first match wins.

use crate::types::{ObjectGroup, Type, BASE_TYPES};
use std::fmt::Write;
use std::sync::OnceLock;

/// Builtins the prelude captures before the program under test can replace them
pub const BUILTIN_BACKUPS: &[(&str, &str)] = &[
    ("isInteger", "Number.isInteger"),
    ("getObjectPropertyNames", "Object.getOwnPropertyNames"),
    ("getObjectKeys", "Object.keys"),
    ("mathMin", "Math.min"),
];

static PRELUDE: OnceLock<String> = OnceLock::new();

/// The rendered prelude, built once per process
pub fn prelude() -> &'static str {
    PRELUDE.get_or_init(render)
}

fn render() -> String {
    let mut out = String::new();

    out.push_str("// Order matters: a value belongs to the first group whose check matches.\n");
    out.push_str("const possibleGroups = [\n");
    for group in ObjectGroup::ALL {
        // Writing to a String cannot fail
        let _ = writeln!(
            out,
            "    {{name: \"{}\", belongsToGroup: function(obj) {{ return {} }}}},",
            group.name(),
            group.js_check()
        );
    }
    out.push_str("]\n\n");

    out.push_str("const baseTypes = {\n");
    for (name, ty) in BASE_TYPES {
        let _ = writeln!(out, "    {}: {},", name, ty.bits());
    }
    out.push_str("}\n\n");

    for (alias, builtin) in BUILTIN_BACKUPS {
        let _ = writeln!(out, "const {} = {}", alias, builtin);
    }
    out
}

/// Decode a type reported by the prelude: a base type bitmask and, for
/// objects, the name of the matching group
pub fn decode_observed_type(bits: u16, group: Option<&str>) -> Type {
    let known = bits & Type::ANYTHING.bits();
    match group.and_then(ObjectGroup::from_name) {
        Some(group) if known & Type::OBJECT.bits() != 0 => {
            Type::object_of_group(group) | Type::from_bits(known & !Type::OBJECT.bits())
        }
        _ => Type::from_bits(known),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered_base_types(prelude: &str) -> Vec<(String, u16)> {
        let start = prelude.find("const baseTypes = {").unwrap();
        prelude[start..]
            .lines()
            .skip(1)
            .take_while(|line| !line.starts_with('}'))
            .map(|line| {
                let (name, bits) = line.trim().trim_end_matches(',').split_once(": ").unwrap();
                (name.to_string(), bits.parse().unwrap())
            })
            .collect()
    }

    fn rendered_groups(prelude: &str) -> Vec<String> {
        prelude
            .lines()
            .filter_map(|line| line.trim().strip_prefix("{name: \""))
            .map(|rest| rest.split('"').next().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_base_types_in_sync() {
        let rendered = rendered_base_types(prelude());
        assert_eq!(rendered.len(), BASE_TYPES.len());
        for ((name, bits), (expected_name, ty)) in rendered.iter().zip(BASE_TYPES) {
            assert_eq!(name.as_str(), *expected_name);
            assert_eq!(*bits, ty.bits());
        }
        for (name, bits) in &rendered {
            let ty = Type::from_bits(*bits);
            assert!(ty.is_nothing() || ty.categories().any(|c| c == name.as_str()));
        }
    }

    #[test]
    fn test_groups_in_sync() {
        let rendered = rendered_groups(prelude());
        let expected: Vec<&str> = ObjectGroup::ALL.iter().map(|g| g.name()).collect();
        assert_eq!(rendered, expected);
        assert_eq!(rendered.last().map(String::as_str), Some("Object"));
        for name in &rendered {
            assert!(ObjectGroup::from_name(name).is_some());
        }
    }

    #[test]
    fn test_every_group_check_returns() {
        for line in prelude().lines().filter(|l| l.contains("belongsToGroup")) {
            assert!(line.contains("{ return "), "{}", line);
        }
        assert!(prelude().contains("obj instanceof Uint8ClampedArray"));
    }

    #[test]
    fn test_builtin_backups_rendered_once() {
        assert!(std::ptr::eq(prelude(), prelude()));
        for (alias, builtin) in BUILTIN_BACKUPS {
            assert!(prelude().contains(&format!("const {} = {}", alias, builtin)));
        }
    }

    #[test]
    fn test_decode_observed_type() {
        assert_eq!(decode_observed_type(Type::INTEGER.bits(), None), Type::INTEGER);
        assert_eq!(
            decode_observed_type(Type::OBJECT.bits(), Some("Array")),
            Type::object_of_group(ObjectGroup::Array)
        );
        assert_eq!(decode_observed_type(Type::STRING.bits(), Some("Array")), Type::STRING);
        assert_eq!(decode_observed_type(Type::OBJECT.bits(), Some("Bogus")), Type::OBJECT);
        assert_eq!(decode_observed_type(0xffff, None), Type::ANYTHING);
    }
}
