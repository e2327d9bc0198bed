// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Subgraph keys.

use crate::{ModelId, UnitMask, WorkerId};
use std::fmt;

/// Identifies one prepared subgraph: a set of unit subgraphs of one model,
/// bound to one worker.
///
/// Keys are stable across runs for an unchanged model and configuration,
/// which lets schedulers keep reservations keyed by them. "No next
/// subgraph" is expressed as `Option::<SubgraphKey>::None`.
///
/// Ordering is `(model, worker, unit bits)`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct SubgraphKey {
    /// The model this subgraph belongs to.
    pub model_id: ModelId,
    /// The worker that executes it.
    pub worker_id: WorkerId,
    /// Unit subgraphs composing it.
    pub unit_indices: UnitMask,
}

impl SubgraphKey {
    /// Creates a new key.
    pub fn new(model_id: ModelId, worker_id: WorkerId, unit_indices: UnitMask) -> Self {
        Self {
            model_id,
            worker_id,
            unit_indices,
        }
    }
}

impl fmt::Display for SubgraphKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}{}", self.model_id, self.worker_id, self.unit_indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeSet, HashSet};

    fn key(worker: usize, units: &[usize]) -> SubgraphKey {
        SubgraphKey::new(
            ModelId(0),
            WorkerId(worker),
            UnitMask::from_indices(units.iter().copied()).unwrap(),
        )
    }

    #[test]
    fn test_key_equality_and_hash() {
        let mut set = HashSet::new();
        set.insert(key(0, &[0, 1]));
        assert!(set.contains(&key(0, &[1, 0])));
        assert!(!set.contains(&key(1, &[0, 1])));
    }

    #[test]
    fn test_key_ordering() {
        let ordered: BTreeSet<_> = [key(1, &[0]), key(0, &[1]), key(0, &[0])]
            .into_iter()
            .collect();
        let v: Vec<_> = ordered.into_iter().collect();
        assert_eq!(v[0], key(0, &[0]));
        assert_eq!(v[1], key(0, &[1]));
        assert_eq!(v[2], key(1, &[0]));
    }

    #[test]
    fn test_display() {
        assert_eq!(key(2, &[0, 1]).to_string(), "model#0@worker#2{0,1}");
    }
}
