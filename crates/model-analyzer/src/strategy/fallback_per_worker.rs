// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-worker fallback preparation.
//!
//! For each worker, the model is cut into maximal runs of units that worker
//! supports. The gaps between runs are covered by fallback subgraphs on the
//! lowest-id worker able to run them, extended as far as that worker's
//! support allows. Every worker therefore has one complete chain covering
//! the model, with as few hand-offs as its operator support permits.

use crate::strategy::{PreparationContext, PreparationStrategy};
use crate::{AnalyzerError, SubgraphDef};

#[derive(Debug, Clone, Default)]
pub struct FallbackPerWorker;

impl PreparationStrategy for FallbackPerWorker {
    fn name(&self) -> &str {
        "fallback_per_worker"
    }

    fn prepare(&self, ctx: &PreparationContext<'_>) -> Result<Vec<SubgraphDef>, AnalyzerError> {
        let n = ctx.spec.num_unit_subgraphs();
        let mut defs = Vec::new();

        for worker in ctx.workers {
            let w = worker.worker_id;
            let mut u = 0;
            while u < n {
                if ctx.supports(w, u) {
                    let first = u;
                    while u + 1 < n && ctx.supports(w, u + 1) {
                        u += 1;
                    }
                    defs.push(ctx.range_def(w, first, u));
                } else {
                    let fallback = ctx.spec.unit_subgraph_workers[u]
                        .iter()
                        .next()
                        .copied()
                        .ok_or_else(|| AnalyzerError::StrategyFailed {
                            strategy: self.name().into(),
                            detail: format!("unit {u} has no supporting worker"),
                        })?;
                    let first = u;
                    while u + 1 < n && !ctx.supports(w, u + 1) && ctx.supports(fallback, u + 1) {
                        u += 1;
                    }
                    defs.push(ctx.range_def(fallback, first, u));
                }
                u += 1;
            }
        }

        Ok(defs)
    }
}
