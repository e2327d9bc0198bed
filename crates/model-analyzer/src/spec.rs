// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Analyzer output: the model summary and its subgraph definitions.
//!
//! A [`ModelSpec`] describes the unit-subgraph structure of one model. The
//! [`SubgraphDef`]s built on top of it are the contract between the
//! analyzer and the engine: each one is prepared once per worker and later
//! addressed by a [`sched_core::SubgraphKey`] whose unit mask is the def's
//! unit set.

use sched_core::{UnitMask, WorkerId, MAX_UNIT_SUBGRAPHS};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// One worker-assignable subgraph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub struct SubgraphDef {
    /// Worker this subgraph is prepared for.
    pub worker_id: WorkerId,
    /// Ops contained in the subgraph.
    pub op_indices: BTreeSet<usize>,
    /// Unit subgraphs composing it.
    pub unit_subgraph_indices: BTreeSet<usize>,
}

impl SubgraphDef {
    /// Unit set as a bitmask. Indices are bounded by the analyzer.
    pub fn unit_mask(&self) -> UnitMask {
        let bits = self
            .unit_subgraph_indices
            .iter()
            .filter(|&&u| u < MAX_UNIT_SUBGRAPHS)
            .fold(0u64, |acc, &u| acc | (1u64 << u));
        UnitMask::from_bits(bits)
    }

    pub fn num_ops(&self) -> usize {
        self.op_indices.len()
    }
}

impl fmt::Display for SubgraphDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ops {} units {}",
            self.worker_id,
            set_to_string(&self.op_indices),
            set_to_string(&self.unit_subgraph_indices),
        )
    }
}

/// Formats an index set compactly, collapsing consecutive runs: `{0-3,7}`.
pub fn set_to_string(set: &BTreeSet<usize>) -> String {
    let mut parts = Vec::new();
    let mut iter = set.iter().copied().peekable();
    while let Some(start) = iter.next() {
        let mut end = start;
        while iter.peek() == Some(&(end + 1)) {
            end += 1;
            iter.next();
        }
        if start == end {
            parts.push(start.to_string());
        } else {
            parts.push(format!("{start}-{end}"));
        }
    }
    format!("{{{}}}", parts.join(","))
}

/// Multi-line listing of subgraphs grouped by worker.
pub fn summarize_subgraphs(defs: &[SubgraphDef]) -> String {
    let mut by_worker: BTreeMap<WorkerId, Vec<&SubgraphDef>> = BTreeMap::new();
    for def in defs {
        by_worker.entry(def.worker_id).or_default().push(def);
    }
    let mut out = String::new();
    for (worker, defs) in by_worker {
        out.push_str(&format!("{worker}: {} subgraphs\n", defs.len()));
        for def in defs {
            out.push_str(&format!(
                "  units {} ({} ops)\n",
                set_to_string(&def.unit_subgraph_indices),
                def.num_ops(),
            ));
        }
    }
    out
}

/// Per-model structure derived by the analyzer. Read-only after creation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ModelSpec {
    pub name: String,
    pub num_ops: usize,
    pub num_tensors: usize,
    /// Model input tensors.
    pub input_tensors: BTreeSet<usize>,
    /// Model output tensors.
    pub output_tensors: BTreeSet<usize>,
    /// `unit_subgraph_ops[u]`: ops of unit subgraph `u`.
    pub unit_subgraph_ops: Vec<BTreeSet<usize>>,
    /// `unit_subgraph_deps[u]`: units producing an input of unit `u`.
    pub unit_subgraph_deps: Vec<UnitMask>,
    /// `unit_subgraph_workers[u]`: workers able to run every op of unit `u`.
    pub unit_subgraph_workers: Vec<BTreeSet<WorkerId>>,
    /// Ops each worker cannot execute.
    pub unsupported_ops: BTreeMap<WorkerId, BTreeSet<usize>>,
}

impl ModelSpec {
    pub fn num_unit_subgraphs(&self) -> usize {
        self.unit_subgraph_ops.len()
    }

    /// Mask with every unit subgraph set.
    pub fn all_units(&self) -> UnitMask {
        let n = self.num_unit_subgraphs().min(MAX_UNIT_SUBGRAPHS);
        if n == MAX_UNIT_SUBGRAPHS {
            UnitMask::from_bits(u64::MAX)
        } else {
            UnitMask::from_bits((1u64 << n) - 1)
        }
    }

    /// Returns `true` once every unit is in `resolved`.
    pub fn is_fully_resolved(&self, resolved: UnitMask) -> bool {
        self.all_units().is_subset(resolved)
    }

    /// Returns `true` if `units` can run right after `resolved`: disjoint
    /// from it, and every dependency outside `units` already resolved.
    pub fn can_run(&self, units: UnitMask, resolved: UnitMask) -> bool {
        if units.is_empty() || !units.is_disjoint(resolved) {
            return false;
        }
        let available = units | resolved;
        units.iter().all(|u| {
            self.unit_subgraph_deps
                .get(u)
                .map(|deps| deps.is_subset(available))
                .unwrap_or(false)
        })
    }

    /// Returns a summary string describing the partitioning.
    pub fn summary(&self) -> String {
        let sizes: Vec<usize> = self.unit_subgraph_ops.iter().map(|s| s.len()).collect();
        format!(
            "Model '{}': {} ops, {} unit subgraphs, unit sizes: {:?}",
            self.name,
            self.num_ops,
            self.num_unit_subgraphs(),
            sizes,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask(units: &[usize]) -> UnitMask {
        UnitMask::from_indices(units.iter().copied()).unwrap()
    }

    /// Units 0 -> 1 -> 2, with unit 2 also reading unit 0.
    fn sample_spec() -> ModelSpec {
        ModelSpec {
            name: "sample".into(),
            num_ops: 6,
            num_tensors: 7,
            input_tensors: BTreeSet::from([0]),
            output_tensors: BTreeSet::from([6]),
            unit_subgraph_ops: vec![
                BTreeSet::from([0, 1]),
                BTreeSet::from([2, 3]),
                BTreeSet::from([4, 5]),
            ],
            unit_subgraph_deps: vec![mask(&[]), mask(&[0]), mask(&[0, 1])],
            unit_subgraph_workers: vec![
                BTreeSet::from([WorkerId(0), WorkerId(1)]),
                BTreeSet::from([WorkerId(0)]),
                BTreeSet::from([WorkerId(0), WorkerId(1)]),
            ],
            unsupported_ops: BTreeMap::from([(WorkerId(1), BTreeSet::from([2, 3]))]),
        }
    }

    #[test]
    fn test_all_units() {
        let spec = sample_spec();
        assert_eq!(spec.all_units(), mask(&[0, 1, 2]));
        assert!(spec.is_fully_resolved(mask(&[0, 1, 2])));
        assert!(!spec.is_fully_resolved(mask(&[0, 2])));
    }

    #[test]
    fn test_can_run() {
        let spec = sample_spec();
        assert!(spec.can_run(mask(&[0]), UnitMask::EMPTY));
        assert!(spec.can_run(mask(&[0, 1]), UnitMask::EMPTY));
        assert!(!spec.can_run(mask(&[1]), UnitMask::EMPTY));
        assert!(spec.can_run(mask(&[1]), mask(&[0])));
        assert!(!spec.can_run(mask(&[2]), mask(&[0])));
        assert!(!spec.can_run(mask(&[0]), mask(&[0])));
        assert!(!spec.can_run(UnitMask::EMPTY, UnitMask::EMPTY));
    }

    #[test]
    fn test_set_to_string() {
        assert_eq!(set_to_string(&BTreeSet::from([0, 1, 2, 3, 7])), "{0-3,7}");
        assert_eq!(set_to_string(&BTreeSet::new()), "{}");
        assert_eq!(set_to_string(&BTreeSet::from([4])), "{4}");
    }

    #[test]
    fn test_subgraph_def_display_and_mask() {
        let def = SubgraphDef {
            worker_id: WorkerId(2),
            op_indices: BTreeSet::from([0, 1, 2]),
            unit_subgraph_indices: BTreeSet::from([0, 1]),
        };
        assert_eq!(def.unit_mask(), mask(&[0, 1]));
        assert_eq!(def.to_string(), "worker#2 ops {0-2} units {0-1}");
    }

    #[test]
    fn test_summaries() {
        let spec = sample_spec();
        assert!(spec.summary().contains("3 unit subgraphs"));

        let defs = vec![
            SubgraphDef {
                worker_id: WorkerId(0),
                op_indices: BTreeSet::from([0, 1]),
                unit_subgraph_indices: BTreeSet::from([0]),
            },
            SubgraphDef {
                worker_id: WorkerId(1),
                op_indices: BTreeSet::from([0, 1]),
                unit_subgraph_indices: BTreeSet::from([0]),
            },
        ];
        let s = summarize_subgraphs(&defs);
        assert!(s.contains("worker#0: 1 subgraphs"));
        assert!(s.contains("worker#1: 1 subgraphs"));
    }
}
