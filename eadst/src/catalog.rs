//! Species/breed reference catalog
//!
//! The import validator and record entry only need to ask "which breeds are
//! valid for this species?". [`ReferenceCatalog`] is that question; the SQLite
//! reference database loads into an [`InMemoryCatalog`] that answers it.

use std::collections::{BTreeMap, BTreeSet};

/// Valid breed names of one species
pub type BreedSet = BTreeSet<String>;

/// Read-only species → breeds lookup. Names match case-sensitively.
pub trait ReferenceCatalog {
    /// Breeds of `species`, or None when the species is unknown
    fn lookup(&self, species: &str) -> Option<BreedSet>;

    /// Whether `species` is known
    fn has_species(&self, species: &str) -> bool {
        self.lookup(species).is_some()
    }
}

/// Catalog held entirely in memory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InMemoryCatalog {
    entries: BTreeMap<String, BreedSet>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a species with its breeds (builder style)
    pub fn with_species<I, S>(mut self, species: &str, breeds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(species, breeds);
        self
    }

    /// Add a species, merging breeds if it already exists
    pub fn insert<I, S>(&mut self, species: &str, breeds: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries
            .entry(species.to_string())
            .or_default()
            .extend(breeds.into_iter().map(Into::into));
    }

    pub fn species(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ReferenceCatalog for InMemoryCatalog {
    fn lookup(&self, species: &str) -> Option<BreedSet> {
        self.entries.get(species).cloned()
    }

    fn has_species(&self, species: &str) -> bool {
        self.entries.contains_key(species)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_sensitive() {
        let catalog = InMemoryCatalog::new().with_species("Cattle", ["Boran", "Holstein"]);

        let breeds = catalog.lookup("Cattle").unwrap();
        assert!(breeds.contains("Boran"));
        assert!(!breeds.contains("boran"));
        assert!(catalog.lookup("cattle").is_none());
        assert!(catalog.has_species("Cattle"));
    }

    #[test]
    fn test_insert_merges_breeds() {
        let mut catalog = InMemoryCatalog::new();
        catalog.insert("Goat", ["Afar"]);
        catalog.insert("Goat", ["Arsi-Bale"]);
        catalog.insert("Camel", Vec::<String>::new());

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.lookup("Goat").unwrap().len(), 2);
        assert!(catalog.lookup("Camel").unwrap().is_empty());
        assert_eq!(catalog.species().collect::<Vec<_>>(), vec!["Camel", "Goat"]);
    }
}
