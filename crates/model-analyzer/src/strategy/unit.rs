// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Unit-subgraph preparation: every unit on every worker supporting it.
//!
//! Gives the scheduler the finest granularity: any unit can move to any
//! capable worker, at the cost of one dispatch per unit.

use crate::strategy::{PreparationContext, PreparationStrategy};
use crate::{AnalyzerError, SubgraphDef};

#[derive(Debug, Clone, Default)]
pub struct UnitSubgraph;

/// Single-unit subgraphs for every `(unit, supporting worker)` pair.
pub(crate) fn unit_defs(ctx: &PreparationContext<'_>) -> Vec<SubgraphDef> {
    let mut defs = Vec::new();
    for (u, workers) in ctx.spec.unit_subgraph_workers.iter().enumerate() {
        for &w in workers {
            defs.push(ctx.range_def(w, u, u));
        }
    }
    defs
}

impl PreparationStrategy for UnitSubgraph {
    fn name(&self) -> &str {
        "unit_subgraph"
    }

    fn prepare(&self, ctx: &PreparationContext<'_>) -> Result<Vec<SubgraphDef>, AnalyzerError> {
        Ok(unit_defs(ctx))
    }
}
