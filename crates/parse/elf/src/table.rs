//! Name-keyed tables of decoded entries.
//!
//! ELF does not require section or symbol names to be unique. A
//! [`NamedTable`] keeps every decoded entry in file order and indexes each
//! name by its last occurrence, so a lookup by name behaves like an
//! overwrite-on-insert map while nothing decoded is thrown away.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

/// File-ordered `(name, entry)` pairs with a last-occurrence name index.
#[derive(Debug, Clone)]
pub struct NamedTable<T> {
    entries: Vec<(String, T)>,
    index: BTreeMap<String, usize>,
}

impl<T> Default for NamedTable<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: BTreeMap::new(),
        }
    }
}

impl<T> NamedTable<T> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry. A later entry with the same name shadows earlier ones.
    pub fn insert(&mut self, name: String, entry: T) {
        self.index.insert(name.clone(), self.entries.len());
        self.entries.push((name, entry));
    }

    /// Looks up the last entry with the given name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&T> {
        self.index.get(name).map(|&i| &self.entries[i].1)
    }

    /// Returns `true` if some entry has this name.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Number of distinct names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns `true` if nothing has been inserted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates the entry each name resolves to, in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(i, (name, _))| self.index.get(name) == Some(i))
            .map(|(_, (name, entry))| (name.as_str(), entry))
    }

    /// Iterates every inserted entry in file order, shadowed ones included.
    pub fn all(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    /// Returns the entry at a file-order position.
    #[must_use]
    pub fn by_position(&self, position: usize) -> Option<(&str, &T)> {
        self.entries
            .get(position)
            .map(|(name, entry)| (name.as_str(), entry))
    }

    /// Distinct names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }
}

impl<T> FromIterator<(String, T)> for NamedTable<T> {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (name, entry) in iter {
            table.insert(name, entry);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(pairs: &[(&str, u32)]) -> NamedTable<u32> {
        pairs.iter().map(|&(n, v)| (n.to_string(), v)).collect()
    }

    #[test]
    fn lookup_by_name() {
        let t = table(&[(".text", 1), (".data", 2)]);
        assert_eq!(t.get(".text"), Some(&1));
        assert_eq!(t.get(".data"), Some(&2));
        assert_eq!(t.get(".bss"), None);
        assert!(t.contains(".data"));
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn last_occurrence_wins() {
        let t = table(&[("dup", 1), ("other", 2), ("dup", 3)]);
        assert_eq!(t.get("dup"), Some(&3));
        assert_eq!(t.len(), 2);
        assert_eq!(t.all().count(), 3);
    }

    #[test]
    fn iter_is_file_order_without_shadowed() {
        let t = table(&[("b", 1), ("a", 2), ("b", 3), ("c", 4)]);
        let seen: Vec<_> = t.iter().map(|(n, &v)| (n, v)).collect();
        assert_eq!(seen, [("a", 2), ("b", 3), ("c", 4)]);
    }

    #[test]
    fn all_keeps_every_entry() {
        let t = table(&[("b", 1), ("b", 2)]);
        let seen: Vec<_> = t.all().map(|(_, &v)| v).collect();
        assert_eq!(seen, [1, 2]);
        assert_eq!(t.by_position(0), Some(("b", &1)));
        assert_eq!(t.by_position(2), None);
    }

    #[test]
    fn names_are_sorted_and_distinct() {
        let t = table(&[("z", 1), ("a", 2), ("z", 3)]);
        let names: Vec<_> = t.names().collect();
        assert_eq!(names, ["a", "z"]);
    }

    #[test]
    fn empty_table() {
        let t: NamedTable<u8> = NamedTable::new();
        assert!(t.is_empty());
        assert_eq!(t.len(), 0);
        assert_eq!(t.iter().count(), 0);
    }
}
