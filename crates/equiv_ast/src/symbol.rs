//! Interning of symbol and function names.

use rustc_hash::FxHashMap;

/// Index of an interned name inside a [`SymbolTable`].
///
/// Ids depend on interning order, so they are only meaningful within the
/// table that produced them. Anything that must be stable across contexts
/// (ordering, hashing) goes through the resolved string.
pub type SymbolId = usize;

#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    strings: Vec<String>,
    lookup: FxHashMap<String, SymbolId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `s`, returning the existing id when it was seen before.
    pub fn intern(&mut self, s: &str) -> SymbolId {
        if let Some(&id) = self.lookup.get(s) {
            return id;
        }
        let id = self.strings.len();
        self.strings.push(s.to_string());
        self.lookup.insert(s.to_string(), id);
        id
    }

    /// Resolve an id produced by this table.
    ///
    /// # Panics
    /// Panics if `id` was not produced by this table.
    #[inline]
    pub fn resolve(&self, id: SymbolId) -> &str {
        &self.strings[id]
    }

    #[inline]
    pub fn get_id(&self, s: &str) -> Option<SymbolId> {
        self.lookup.get(s).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_is_idempotent() {
        let mut table = SymbolTable::new();
        let x1 = table.intern("x");
        let y = table.intern("y");
        let x2 = table.intern("x");
        assert_eq!(x1, x2);
        assert_ne!(x1, y);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_resolve_and_lookup() {
        let mut table = SymbolTable::new();
        let id = table.intern("theta");
        assert_eq!(table.resolve(id), "theta");
        assert_eq!(table.get_id("theta"), Some(id));
        assert_eq!(table.get_id("phi"), None);
    }
}
