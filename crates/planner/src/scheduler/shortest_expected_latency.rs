// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Shortest-expected-latency (SEL) policy.

use super::{ScheduleContext, Scheduler};
use crate::JobQueue;
use sched_core::{SubgraphKey, WorkerType};

/// Places each job on the subgraph chain the oracle expects to finish
/// first, serving the slowest job first.
///
/// Every selection round asks the oracle about each windowed job, then
/// dispatches the candidate with the largest projected latency whose worker
/// is idle. Candidates whose worker is busy are deferred; the pass ends when
/// no candidate can be placed or the window taken at pass start is used up.
#[derive(Debug, Default)]
pub struct ShortestExpectedLatency;

impl ShortestExpectedLatency {
    pub fn new() -> Self {
        Self
    }
}

struct Candidate {
    index: usize,
    latency: i64,
    key: SubgraphKey,
}

impl Scheduler for ShortestExpectedLatency {
    fn name(&self) -> &str {
        "shortest_expected_latency"
    }

    fn schedule(&mut self, ctx: &mut ScheduleContext<'_>, requests: &mut JobQueue) -> bool {
        let engine = ctx.engine();
        let mut success = true;
        let mut window = ctx.window(requests.len());

        while window > 0 {
            engine.update_workers_waiting();
            let idle = engine.idle_workers();
            if idle.is_empty() {
                break;
            }
            let waiting = engine.worker_waiting_time();

            let mut candidates = Vec::with_capacity(window);
            let mut unplannable = Vec::new();
            for (index, job) in requests.iter().take(window).enumerate() {
                let (keys, latency) = engine.subgraph_with_shortest_latency(job, &waiting);
                match keys.first() {
                    Some(&key) => candidates.push(Candidate {
                        index,
                        latency,
                        key,
                    }),
                    None => unplannable.push(index),
                }
            }
            if !unplannable.is_empty() {
                for index in unplannable.into_iter().rev() {
                    if let Some(job) = requests.remove(index) {
                        ctx.fail(job);
                        window -= 1;
                    }
                }
                continue;
            }

            candidates.sort_by(|a, b| b.latency.cmp(&a.latency));
            let Some(chosen) = candidates.iter().find(|c| idle.contains(&c.key.worker_id)) else {
                break;
            };
            let Some(mut job) = requests.remove(chosen.index) else {
                break;
            };
            if engine.is_begin(&chosen.key) {
                job.expected_latency = chosen.latency;
            }
            window -= 1;
            success &= ctx.enqueue_to_worker(job, chosen.key);
        }
        success
    }

    fn need_fallback_subgraphs(&self) -> bool {
        true
    }

    fn worker_type(&self) -> WorkerType {
        WorkerType::GlobalQueue
    }
}
