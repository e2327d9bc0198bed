// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Whole-model preparation.
//!
//! Each worker able to run every unit gets a single subgraph spanning the
//! whole model. Used when no scheduler needs fallback subgraphs.

use crate::strategy::{PreparationContext, PreparationStrategy};
use crate::{AnalyzerError, SubgraphDef};

#[derive(Debug, Clone, Default)]
pub struct NoFallbackSubgraph;

impl PreparationStrategy for NoFallbackSubgraph {
    fn name(&self) -> &str {
        "no_fallback_subgraph"
    }

    fn prepare(&self, ctx: &PreparationContext<'_>) -> Result<Vec<SubgraphDef>, AnalyzerError> {
        let n = ctx.spec.num_unit_subgraphs();
        if n == 0 {
            return Err(AnalyzerError::StrategyFailed {
                strategy: self.name().into(),
                detail: "model has no unit subgraphs".into(),
            });
        }
        let defs: Vec<SubgraphDef> = ctx
            .workers
            .iter()
            .filter(|w| (0..n).all(|u| ctx.supports(w.worker_id, u)))
            .map(|w| ctx.range_def(w.worker_id, 0, n - 1))
            .collect();
        if defs.is_empty() {
            return Err(AnalyzerError::NoCoveringWorker {
                model: ctx.spec.name.clone(),
            });
        }
        Ok(defs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::test_support::{chain_graph, chain_spec, workers};
    use sched_core::WorkerId;

    #[test]
    fn test_one_subgraph_per_full_worker() {
        let graph = chain_graph(3);
        let spec = chain_spec(&[&[0, 1], &[0], &[0, 1]]);
        let workers = workers(2);
        let ctx = PreparationContext {
            graph: &graph,
            spec: &spec,
            workers: &workers,
        };
        let defs = NoFallbackSubgraph.prepare(&ctx).unwrap();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].worker_id, WorkerId(0));
        assert_eq!(defs[0].op_indices.len(), 3);
    }

    #[test]
    fn test_no_covering_worker() {
        let graph = chain_graph(2);
        let spec = chain_spec(&[&[0], &[1]]);
        let workers = workers(2);
        let ctx = PreparationContext {
            graph: &graph,
            spec: &spec,
            workers: &workers,
        };
        assert!(matches!(
            NoFallbackSubgraph.prepare(&ctx),
            Err(AnalyzerError::NoCoveringWorker { .. })
        ));
    }
}
