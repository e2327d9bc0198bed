// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Least-slack-time-first policy.

use super::{display_id, ScheduleContext, Scheduler};
use crate::{Job, JobQueue};
use sched_core::{time, SubgraphKey, WorkerType};

/// Serves the windowed jobs closest to missing their deadline first.
///
/// Slack is `deadline - now - expected_latency`, with the expected latency
/// planned once per windowed job at the start of every pass. Jobs without an
/// SLO have unbounded slack and keep their relative order. A job whose best
/// plan already overshoots its deadline is dispatched straight away and
/// reported as a violation instead of waiting for an idle worker.
#[derive(Debug, Default)]
pub struct LeastSlackTimeFirst;

impl LeastSlackTimeFirst {
    pub fn new() -> Self {
        Self
    }

    fn slack(now: i64, job: &Job) -> i64 {
        match job.deadline() {
            Some(deadline) => deadline - now - job.expected_latency,
            None => i64::MAX,
        }
    }
}

impl Scheduler for LeastSlackTimeFirst {
    fn name(&self) -> &str {
        "least_slack_time_first"
    }

    fn schedule(&mut self, ctx: &mut ScheduleContext<'_>, requests: &mut JobQueue) -> bool {
        let engine = ctx.engine();
        engine.update_workers_waiting();
        let window = ctx.window(requests.len());
        if window == 0 {
            return true;
        }
        let mut idle = engine.idle_workers();
        if idle.is_empty() {
            return true;
        }
        let waiting = engine.worker_waiting_time();
        let now = time::now_micros();

        // One oracle query per job; the plan is reused for dispatch.
        let mut windowed: Vec<(Job, Vec<SubgraphKey>, i64)> = requests
            .drain(..window)
            .map(|mut job| {
                let (keys, latency) = engine.subgraph_with_shortest_latency(&job, &waiting);
                job.expected_latency = latency;
                (job, keys, latency)
            })
            .collect();
        windowed.sort_by_key(|(job, _, _)| Self::slack(now, job));

        let mut success = true;
        let mut kept = Vec::with_capacity(windowed.len());
        for (mut job, keys, latency) in windowed {
            let Some(&key) = keys.first() else {
                ctx.fail(job);
                continue;
            };

            if job.misses_deadline(now + latency) {
                job.slo_violated = true;
                tracing::warn!(
                    "{} cannot meet its SLO, dispatching to {}",
                    display_id(&job),
                    key.worker_id
                );
                success &= ctx.enqueue_to_worker(job, key);
                continue;
            }

            if idle.remove(&key.worker_id) {
                success &= ctx.enqueue_to_worker(job, key);
                continue;
            }
            kept.push(job);
        }

        for job in kept.into_iter().rev() {
            requests.push_front(job);
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
