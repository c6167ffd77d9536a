//! Version vectors.
//!
//! A version vector maps node ids to counters. Two versions of the same key
//! are causally ordered when one vector is element-wise >= the other, and
//! concurrent otherwise. Missing entries count as 0.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::node::NodeId;

/// Outcome of comparing `a` against `b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionOrder {
    /// `a` is strictly dominated by `b`.
    Before,
    /// `a` strictly dominates `b`.
    After,
    /// Neither dominates.
    Concurrent,
    /// Same counters everywhere.
    Equal,
}

impl VersionOrder {
    /// `Equal` is the degenerate case of concurrency: neither side is newer.
    pub fn is_concurrent(self) -> bool {
        matches!(self, VersionOrder::Concurrent | VersionOrder::Equal)
    }

    pub fn reverse(self) -> Self {
        match self {
            VersionOrder::Before => VersionOrder::After,
            VersionOrder::After => VersionOrder::Before,
            other => other,
        }
    }
}

/// Per-node counter map tracking the causal history of a value.
///
/// `Clone` is a deep copy; vectors never share storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionVector(BTreeMap<NodeId, u64>);

impl VersionVector {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Bump `node`'s counter, starting at 1.
    pub fn increment(&mut self, node: &NodeId) {
        let counter = self.0.entry(node.clone()).or_insert(0);
        *counter = counter.saturating_add(1);
    }

    /// Counter for `node`, 0 when absent.
    pub fn get(&self, node: &NodeId) -> u64 {
        self.0.get(node).copied().unwrap_or(0)
    }

    /// Compare `self` against `other`.
    pub fn compare(&self, other: &Self) -> VersionOrder {
        let mut self_ahead = false;
        let mut other_ahead = false;

        for (node, &counter) in &self.0 {
            let theirs = other.get(node);
            if counter > theirs {
                self_ahead = true;
            } else if counter < theirs {
                other_ahead = true;
            }
        }
        for (node, &counter) in &other.0 {
            if !self.0.contains_key(node) && counter > 0 {
                other_ahead = true;
            }
        }

        match (self_ahead, other_ahead) {
            (false, false) => VersionOrder::Equal,
            (true, false) => VersionOrder::After,
            (false, true) => VersionOrder::Before,
            (true, true) => VersionOrder::Concurrent,
        }
    }

    /// `self >= other` everywhere.
    pub fn descends(&self, other: &Self) -> bool {
        matches!(
            self.compare(other),
            VersionOrder::After | VersionOrder::Equal
        )
    }

    /// `self > other`: descends and differs.
    pub fn dominates(&self, other: &Self) -> bool {
        self.compare(other) == VersionOrder::After
    }

    /// Element-wise maximum of both vectors.
    pub fn merge(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        merged.merge_from(other);
        merged
    }

    /// In-place [`merge`](Self::merge).
    pub fn merge_from(&mut self, other: &Self) {
        for (node, &counter) in &other.0 {
            let mine = self.0.entry(node.clone()).or_insert(0);
            if counter > *mine {
                *mine = counter;
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, u64)> {
        self.0.iter().map(|(node, &counter)| (node, counter))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_map(self) -> BTreeMap<NodeId, u64> {
        self.0
    }
}

impl From<BTreeMap<NodeId, u64>> for VersionVector {
    fn from(map: BTreeMap<NodeId, u64>) -> Self {
        Self(map)
    }
}

impl<N: Into<NodeId>> FromIterator<(N, u64)> for VersionVector {
    fn from_iter<I: IntoIterator<Item = (N, u64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(n, c)| (n.into(), c)).collect())
    }
}

/// Compare two possibly-absent vectors.
///
/// An absent vector sorts before every present one, the empty vector
/// included; two absent vectors are equal.
pub fn compare_optional(a: Option<&VersionVector>, b: Option<&VersionVector>) -> VersionOrder {
    match (a, b) {
        (None, None) => VersionOrder::Equal,
        (None, Some(_)) => VersionOrder::Before,
        (Some(_), None) => VersionOrder::After,
        (Some(a), Some(b)) => a.compare(b),
    }
}
