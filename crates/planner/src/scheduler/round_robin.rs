// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Round-robin over idle workers.

use super::{ScheduleContext, Scheduler};
use crate::JobQueue;
use sched_core::WorkerType;

/// Gives every idle worker the first windowed job it can run.
///
/// Workers are visited in id order; each takes at most one job per pass.
#[derive(Debug, Default)]
pub struct RoundRobin;

impl RoundRobin {
    pub fn new() -> Self {
        Self
    }
}

impl Scheduler for RoundRobin {
    fn name(&self) -> &str {
        "round_robin"
    }

    fn schedule(&mut self, ctx: &mut ScheduleContext<'_>, requests: &mut JobQueue) -> bool {
        let mut success = true;
        for worker in ctx.engine().idle_workers() {
            let window = ctx.window(requests.len());
            let found = requests.iter().take(window).enumerate().find_map(|(i, job)| {
                ctx.engine()
                    .largest_subgraph_key(job.model_id, worker, job.resolved_unit_subgraphs)
                    .map(|key| (i, key))
            });
            let Some((index, key)) = found else {
                continue;
            };
            if let Some(job) = requests.remove(index) {
                success &= ctx.enqueue_to_worker(job, key);
            }
        }
        success
    }

    fn need_fallback_subgraphs(&self) -> bool {
        false
    }

    fn worker_type(&self) -> WorkerType {
        WorkerType::DeviceQueue
    }
}
