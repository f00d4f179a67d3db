//! Per-node and global status code counters.
//!
//! Nodes and status codes are kept in first-seen order: the position at
//! which a key is first inserted becomes its row (nodes) or column (status
//! codes) on screen, and never changes afterwards.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

/// Insertion-ordered key → index table.
///
/// Lookup is a single hash probe; the index of a key is its insertion
/// position and is stable for the lifetime of the table.
#[derive(Debug, Clone)]
pub struct OrderedIndex<K> {
    slots: HashMap<K, usize>,
    keys: Vec<K>,
}

impl<K> Default for OrderedIndex<K> {
    fn default() -> Self {
        Self {
            slots: HashMap::new(),
            keys: Vec::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> OrderedIndex<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the index of `key`, inserting it at the end if unseen.
    ///
    /// The boolean is `true` when the key was inserted by this call.
    pub fn get_or_insert<Q>(&mut self, key: &Q) -> (usize, bool)
    where
        K: Borrow<Q>,
        Q: ToOwned<Owned = K> + Hash + Eq + ?Sized,
    {
        if let Some(&index) = self.slots.get(key) {
            return (index, false);
        }
        let index = self.keys.len();
        let owned = key.to_owned();
        self.keys.push(owned.clone());
        self.slots.insert(owned, index);
        (index, true)
    }

    pub fn index_of<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.slots.get(key).copied()
    }

    /// Keys in first-seen order.
    pub fn keys(&self) -> &[K] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Observation counts for a single backend node, keyed by status code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeRecord {
    counts: HashMap<u16, u64>,
}

impl NodeRecord {
    pub fn count(&self, status_code: u16) -> u64 {
        self.counts.get(&status_code).copied().unwrap_or(0)
    }

    pub fn counts(&self) -> &HashMap<u16, u64> {
        &self.counts
    }

    fn increment(&mut self, status_code: u16) -> u64 {
        let count = self.counts.entry(status_code).or_insert(0);
        *count += 1;
        *count
    }
}

/// Running totals across all nodes, one per status code, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct StatusTotals {
    columns: OrderedIndex<u16>,
    totals: Vec<u64>,
}

impl StatusTotals {
    pub fn total(&self, status_code: u16) -> u64 {
        self.columns
            .index_of(&status_code)
            .map(|column| self.totals[column])
            .unwrap_or(0)
    }

    /// `(status_code, total)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (u16, u64)> + '_ {
        self.columns.keys().iter().copied().zip(self.totals.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    fn increment(&mut self, status_code: u16) -> (usize, u64, bool) {
        let (column, inserted) = self.columns.get_or_insert(&status_code);
        if inserted {
            self.totals.push(0);
        }
        self.totals[column] += 1;
        (column, self.totals[column], inserted)
    }
}

/// What changed as the result of recording one observation.
///
/// This is everything the grid renderer needs to redraw incrementally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Update {
    pub row: usize,
    pub column: usize,
    pub status_code: u16,
    /// The node's count for this status code after the update.
    pub count: u64,
    /// The global total for this status code after the update.
    pub total: u64,
    pub new_node: bool,
    pub new_status: bool,
}

/// Process-wide aggregation state.
///
/// Not synchronized on its own: callers hold the single display lock
/// (see [`crate::ui::LiveTable`]) around every call.
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    rows: OrderedIndex<String>,
    nodes: Vec<NodeRecord>,
    totals: StatusTotals,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one `(node, status_code)` observation.
    pub fn record(&mut self, node_id: &str, status_code: u16) -> Update {
        let (row, new_node) = self.rows.get_or_insert(node_id);
        if new_node {
            self.nodes.push(NodeRecord::default());
        }
        let count = self.nodes[row].increment(status_code);
        let (column, total, new_status) = self.totals.increment(status_code);

        Update {
            row,
            column,
            status_code,
            count,
            total,
            new_node,
            new_status,
        }
    }

    /// Node ids in row order.
    pub fn nodes(&self) -> &[String] {
        self.rows.keys()
    }

    /// Status codes in column order.
    pub fn status_codes(&self) -> &[u16] {
        self.totals.columns.keys()
    }

    pub fn node_row(&self, node_id: &str) -> Option<usize> {
        self.rows.index_of(node_id)
    }

    pub fn status_column(&self, status_code: u16) -> Option<usize> {
        self.totals.columns.index_of(&status_code)
    }

    pub fn node(&self, node_id: &str) -> Option<&NodeRecord> {
        self.node_row(node_id).map(|row| &self.nodes[row])
    }

    pub fn count(&self, node_id: &str, status_code: u16) -> u64 {
        self.node(node_id).map(|n| n.count(status_code)).unwrap_or(0)
    }

    pub fn total(&self, status_code: u16) -> u64 {
        self.totals.total(status_code)
    }

    pub fn totals(&self) -> &StatusTotals {
        &self.totals
    }

    pub fn node_count(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_totals_consistent(agg: &Aggregator) {
        for (code, total) in agg.totals().iter() {
            let sum: u64 = agg.nodes().iter().map(|n| agg.count(n, code)).sum();
            assert_eq!(sum, total, "totals mismatch for status {}", code);
        }
        for node in agg.nodes() {
            for code in agg.node(node).unwrap().counts().keys() {
                assert!(agg.status_column(*code).is_some());
            }
        }
    }

    #[test]
    fn test_record_single_node() {
        let mut agg = Aggregator::new();
        for _ in 0..3 {
            agg.record("A", 200);
        }
        assert_eq!(agg.nodes(), &["A".to_string()]);
        assert_eq!(agg.count("A", 200), 3);
        assert_eq!(agg.total(200), 3);
        assert_eq!(agg.status_codes(), &[200]);
    }

    #[test]
    fn test_first_update_flags() {
        let mut agg = Aggregator::new();
        let first = agg.record("A", 200);
        assert!(first.new_node && first.new_status);
        assert_eq!((first.row, first.column, first.count, first.total), (0, 0, 1, 1));

        let second = agg.record("B", 200);
        assert!(second.new_node);
        assert!(!second.new_status);
        assert_eq!((second.row, second.column, second.count, second.total), (1, 0, 1, 2));

        let third = agg.record("A", 503);
        assert!(!third.new_node);
        assert!(third.new_status);
        assert_eq!((third.row, third.column), (0, 1));
    }

    #[test]
    fn test_indices_are_stable() {
        let mut agg = Aggregator::new();
        agg.record("node-2", 500);
        agg.record("node-1", 200);
        agg.record("node-3", 404);

        // Later observations, in any order, never reorder anything
        for (node, code) in [("node-3", 200), ("node-1", 500), ("node-2", 404), ("node-9", 301)] {
            agg.record(node, code);
        }

        assert_eq!(agg.node_row("node-2"), Some(0));
        assert_eq!(agg.node_row("node-1"), Some(1));
        assert_eq!(agg.node_row("node-3"), Some(2));
        assert_eq!(agg.node_row("node-9"), Some(3));
        assert_eq!(agg.status_codes(), &[500, 200, 404, 301]);
    }

    #[test]
    fn test_totals_match_node_sums() {
        let mut agg = Aggregator::new();
        let nodes = ["a", "b", "c", "Undefined"];
        let codes = [200u16, 500, 200, 404, 302, 200, 503];
        for i in 0..200usize {
            agg.record(nodes[i % nodes.len()], codes[(i * 7 + i / 3) % codes.len()]);
            assert_totals_consistent(&agg);
        }
        let grand: u64 = agg.totals().iter().map(|(_, t)| t).sum();
        assert_eq!(grand, 200);
    }

    #[test]
    fn test_ordered_index_borrowed_lookup() {
        let mut index: OrderedIndex<String> = OrderedIndex::new();
        assert_eq!(index.get_or_insert("x"), (0, true));
        assert_eq!(index.get_or_insert("y"), (1, true));
        assert_eq!(index.get_or_insert("x"), (0, false));
        assert_eq!(index.index_of("y"), Some(1));
        assert_eq!(index.index_of("z"), None);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_unknown_lookups_are_zero() {
        let agg = Aggregator::new();
        assert_eq!(agg.count("nobody", 200), 0);
        assert_eq!(agg.total(200), 0);
        assert!(agg.totals().is_empty());
    }
}
