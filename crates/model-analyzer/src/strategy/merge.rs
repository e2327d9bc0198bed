// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Merged unit-subgraph preparation (default).
//!
//! On top of the unit subgraphs, each worker gets every contiguous range of
//! two or more units it supports entirely. Unit indices are topologically
//! ordered, so a contiguous range never depends on a unit after it and is
//! always runnable once the units before it are resolved.
//!
//! ```text
//! units:     u0   u1   u2        worker 0 supports all,
//! worker 0:  [u0] [u1] [u2]      worker 1 lacks u1
//!            [u0 u1] [u1 u2]
//!            [u0 u1 u2]
//! worker 1:  [u0]      [u2]
//! ```

use crate::strategy::unit::unit_defs;
use crate::strategy::{PreparationContext, PreparationStrategy};
use crate::{AnalyzerError, SubgraphDef};

#[derive(Debug, Clone, Default)]
pub struct MergeUnitSubgraph;

impl PreparationStrategy for MergeUnitSubgraph {
    fn name(&self) -> &str {
        "merge_unit_subgraph"
    }

    fn prepare(&self, ctx: &PreparationContext<'_>) -> Result<Vec<SubgraphDef>, AnalyzerError> {
        let mut defs = unit_defs(ctx);
        let n = ctx.spec.num_unit_subgraphs();

        for worker in ctx.workers {
            let w = worker.worker_id;
            for first in 0..n {
                if !ctx.supports(w, first) {
                    continue;
                }
                let mut last = first + 1;
                while last < n && ctx.supports(w, last) {
                    defs.push(ctx.range_def(w, first, last));
                    last += 1;
                }
            }
        }

        tracing::debug!("merged into {} subgraphs over {} units", defs.len(), n);
        Ok(defs)
    }
}
