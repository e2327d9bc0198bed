// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The [`PreparationStrategy`] trait and strategy implementations.

pub mod fallback_per_worker;
pub mod merge;
pub mod no_fallback;
pub mod unit;

pub use fallback_per_worker::FallbackPerWorker;
pub use merge::MergeUnitSubgraph;
pub use no_fallback::NoFallbackSubgraph;
pub use unit::UnitSubgraph;

use crate::{AnalyzerError, ModelSpec, SubgraphDef, WorkerSupport};
use model_ir::{graph::Validated, ModelGraph};
use sched_core::WorkerId;
use std::collections::BTreeSet;

/// Everything a strategy may look at.
pub struct PreparationContext<'a> {
    pub graph: &'a ModelGraph<Validated>,
    pub spec: &'a ModelSpec,
    pub workers: &'a [WorkerSupport],
}

impl PreparationContext<'_> {
    /// Returns `true` if `worker` can run unit `unit`.
    pub fn supports(&self, worker: WorkerId, unit: usize) -> bool {
        self.spec
            .unit_subgraph_workers
            .get(unit)
            .map(|ws| ws.contains(&worker))
            .unwrap_or(false)
    }

    /// Subgraph made of units `first..=last` on `worker`.
    pub fn range_def(&self, worker: WorkerId, first: usize, last: usize) -> SubgraphDef {
        let unit_subgraph_indices: BTreeSet<usize> = (first..=last).collect();
        let op_indices = unit_subgraph_indices
            .iter()
            .filter_map(|&u| self.spec.unit_subgraph_ops.get(u))
            .flatten()
            .copied()
            .collect();
        SubgraphDef {
            worker_id: worker,
            op_indices,
            unit_subgraph_indices,
        }
    }
}

/// Trait for subgraph preparation strategies.
///
/// A strategy turns the unit-subgraph structure of a model into the list
/// of subgraphs the engine prepares. Every subgraph must be a union of
/// whole unit subgraphs, and every unit must be covered by at least one
/// subgraph; the analyzer checks both after `prepare` returns.
pub trait PreparationStrategy: Send + Sync {
    /// Human-readable name of this strategy.
    fn name(&self) -> &str;

    /// Produces subgraph definitions for the model.
    fn prepare(&self, ctx: &PreparationContext<'_>) -> Result<Vec<SubgraphDef>, AnalyzerError>;
}
