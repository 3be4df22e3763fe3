//! Per-cycle query match sets.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Documents matched by each query during one evaluation cycle.
///
/// Produced by the query executor and read-only to trigger evaluation.
/// Ordered so evaluation results are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryMatchMap(BTreeMap<String, BTreeSet<String>>);

impl QueryMatchMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the matched documents for `query`, replacing any previous set.
    pub fn insert<I, D>(&mut self, query: impl Into<String>, docs: I)
    where
        I: IntoIterator<Item = D>,
        D: Into<String>,
    {
        self.0
            .insert(query.into(), docs.into_iter().map(Into::into).collect());
    }

    /// Records a single match.
    pub fn add_match(&mut self, query: impl Into<String>, doc_id: impl Into<String>) {
        self.0.entry(query.into()).or_default().insert(doc_id.into());
    }

    /// Matched documents for `query`, if the query reported at all.
    #[must_use]
    pub fn get(&self, query: &str) -> Option<&BTreeSet<String>> {
        self.0.get(query)
    }

    /// Number of queries present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no query reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Query names present in this cycle.
    pub fn queries(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Every document id that appears under any query.
    ///
    /// Negation is computed relative to this set.
    #[must_use]
    pub fn universe(&self) -> BTreeSet<String> {
        self.0.values().flatten().cloned().collect()
    }
}

impl<K, I, D> FromIterator<(K, I)> for QueryMatchMap
where
    K: Into<String>,
    I: IntoIterator<Item = D>,
    D: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, I)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (query, docs) in iter {
            map.insert(query, docs);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_universe_is_union_of_all_sets() {
        let map: QueryMatchMap = [("a", vec!["d1", "d2"]), ("b", vec!["d2", "d3"])]
            .into_iter()
            .collect();
        let universe: Vec<String> = map.universe().into_iter().collect();
        assert_eq!(universe, vec!["d1", "d2", "d3"]);
    }

    #[test]
    fn test_add_match_accumulates() {
        let mut map = QueryMatchMap::new();
        map.add_match("a", "d1");
        map.add_match("a", "d2");
        map.add_match("a", "d1");
        assert_eq!(map.get("a").map(BTreeSet::len), Some(2));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_insert_replaces() {
        let mut map = QueryMatchMap::new();
        map.insert("a", ["d1"]);
        map.insert("a", ["d9"]);
        assert!(map.get("a").unwrap().contains("d9"));
        assert!(!map.get("a").unwrap().contains("d1"));
    }

    #[test]
    fn test_empty_query_counts_as_present() {
        let mut map = QueryMatchMap::new();
        map.insert("a", Vec::<String>::new());
        assert!(!map.is_empty());
        assert!(map.universe().is_empty());
        assert_eq!(map.queries().collect::<Vec<_>>(), vec!["a"]);
    }
}
