//! Program-scoped variables and dense per-variable side tables.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a value produced by exactly one instruction.
///
/// Variables are numbered densely in definition order within their program,
/// so the number doubles as an index into a [`VariableMap`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Variable(pub u32);

impl Variable {
    pub fn number(&self) -> u32 {
        self.0
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A sparse map from variables to values, stored densely by variable number.
///
/// Two maps are equal when they hold the same entries; trailing absent slots
/// do not matter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableMap<T> {
    slots: Vec<Option<T>>,
}

impl<T> VariableMap<T> {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// A map with an entry for every variable `v0..vN`.
    pub fn from_values(values: Vec<T>) -> Self {
        Self {
            slots: values.into_iter().map(Some).collect(),
        }
    }

    pub fn get(&self, variable: Variable) -> Option<&T> {
        self.slots.get(variable.index()).and_then(|slot| slot.as_ref())
    }

    pub fn contains(&self, variable: Variable) -> bool {
        self.get(variable).is_some()
    }

    pub fn set(&mut self, variable: Variable, value: T) {
        let index = variable.index();
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || None);
        }
        self.slots[index] = Some(value);
    }

    pub fn remove(&mut self, variable: Variable) -> Option<T> {
        self.slots.get_mut(variable.index()).and_then(|slot| slot.take())
    }

    /// Number of variables that have an entry.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (Variable, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|v| (Variable(i as u32), v)))
    }
}

impl<T> Default for VariableMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> From<Vec<Option<T>>> for VariableMap<T> {
    fn from(slots: Vec<Option<T>>) -> Self {
        Self { slots }
    }
}

impl<T> FromIterator<(Variable, T)> for VariableMap<T> {
    fn from_iter<I: IntoIterator<Item = (Variable, T)>>(iter: I) -> Self {
        let mut map = VariableMap::new();
        for (variable, value) in iter {
            map.set(variable, value);
        }
        map
    }
}

impl<T: PartialEq> PartialEq for VariableMap<T> {
    fn eq(&self, other: &Self) -> bool {
        let len = self.slots.len().max(other.slots.len());
        (0..len).all(|i| {
            let a = self.slots.get(i).and_then(|s| s.as_ref());
            let b = other.slots.get(i).and_then(|s| s.as_ref());
            a == b
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let mut map = VariableMap::new();
        map.set(Variable(3), "c");
        assert_eq!(map.get(Variable(3)), Some(&"c"));
        assert_eq!(map.get(Variable(0)), None);
        assert_eq!(map.get(Variable(10)), None);
        assert_eq!(map.len(), 1);

        assert_eq!(map.remove(Variable(3)), Some("c"));
        assert!(map.is_empty());
        assert_eq!(map.remove(Variable(42)), None);
    }

    #[test]
    fn test_equality_ignores_trailing_absent_slots() {
        let a: VariableMap<u8> = VariableMap::from(vec![Some(1), Some(2), None, None]);
        let b: VariableMap<u8> = VariableMap::from_values(vec![1u8, 2]);
        assert_eq!(a, b);

        let c: VariableMap<u8> = VariableMap::from(vec![Some(1), None, Some(2)]);
        assert_ne!(a, c);
    }

    #[test]
    fn test_iter_in_variable_order() {
        let map: VariableMap<char> = [(Variable(2), 'b'), (Variable(0), 'a')].into_iter().collect();
        let entries: Vec<_> = map.iter().collect();
        assert_eq!(entries, vec![(Variable(0), &'a'), (Variable(2), &'b')]);
    }
}
