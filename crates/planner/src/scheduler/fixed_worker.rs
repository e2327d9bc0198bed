// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Fixed-worker policies.
//!
//! Each job runs on its `target_worker`, or on the worker the planner's
//! affinity cache assigned to its model. No latency estimation is involved.

use super::{ScheduleContext, Scheduler};
use crate::{Job, JobQueue};
use sched_core::WorkerType;

/// Queues every windowed job on its fixed worker, busy or not.
#[derive(Debug, Default)]
pub struct FixedWorker;

impl FixedWorker {
    pub fn new() -> Self {
        Self
    }
}

impl Scheduler for FixedWorker {
    fn name(&self) -> &str {
        "fixed_worker"
    }

    fn schedule(&mut self, ctx: &mut ScheduleContext<'_>, requests: &mut JobQueue) -> bool {
        let window = ctx.window(requests.len());
        let batch: Vec<Job> = requests.drain(..window).collect();
        let mut success = true;
        for job in batch {
            let key = ctx.preferred_worker(&job).and_then(|worker| {
                ctx.engine()
                    .largest_subgraph_key(job.model_id, worker, job.resolved_unit_subgraphs)
            });
            match key {
                Some(key) => success &= ctx.enqueue_to_worker(job, key),
                None => ctx.fail(job),
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

/// Like [`FixedWorker`], but for global-queue workers: a job is only handed
/// over once its worker is idle, otherwise it keeps its place in the queue.
#[derive(Debug, Default)]
pub struct FixedWorkerGlobalQueue;

impl FixedWorkerGlobalQueue {
    pub fn new() -> Self {
        Self
    }
}

impl Scheduler for FixedWorkerGlobalQueue {
    fn name(&self) -> &str {
        "fixed_worker_global_queue"
    }

    fn schedule(&mut self, ctx: &mut ScheduleContext<'_>, requests: &mut JobQueue) -> bool {
        let mut idle = ctx.engine().idle_workers();
        let window = ctx.window(requests.len());
        let mut kept = JobQueue::new();
        let mut success = true;

        for job in requests.drain(..window).collect::<Vec<_>>() {
            let Some(worker) = ctx.preferred_worker(&job) else {
                ctx.fail(job);
                continue;
            };
            if !idle.contains(&worker) {
                kept.push_back(job);
                continue;
            }
            match ctx
                .engine()
                .largest_subgraph_key(job.model_id, worker, job.resolved_unit_subgraphs)
            {
                Some(key) => {
                    idle.remove(&worker);
                    success &= ctx.enqueue_to_worker(job, key);
                }
                None => ctx.fail(job),
            }
        }

        while let Some(job) = kept.pop_back() {
            requests.push_front(job);
        }
        success
    }

    fn need_fallback_subgraphs(&self) -> bool {
        false
    }

    fn worker_type(&self) -> WorkerType {
        WorkerType::GlobalQueue
    }
}
