// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The [`Scheduler`] trait and policy implementations.
//!
//! | Policy | Worker type | Fallback subgraphs | Uses latency oracle |
//! |---|---|---|---|
//! | [`FixedWorker`] | device queue | no | no |
//! | [`RoundRobin`] | device queue | no | no |
//! | [`FixedWorkerGlobalQueue`] | global queue | no | no |
//! | [`ShortestExpectedLatency`] | global queue | yes | yes |
//! | [`HeterogeneousEarliestFinishTime`] | global queue | yes | yes |
//! | [`LeastSlackTimeFirst`] | global queue | yes | yes |
//!
//! Every dispatch goes through [`ScheduleContext::enqueue_to_worker`], which
//! stamps the job with its subgraph, projects the SLO, and records
//! rejections so the planner can put the job back at the front of the
//! queue.

pub mod fixed_worker;
pub mod heft;
pub mod least_slack_first;
pub mod round_robin;
pub mod shortest_expected_latency;

#[cfg(test)]
pub(crate) mod testing;

pub use fixed_worker::{FixedWorker, FixedWorkerGlobalQueue};
pub use heft::HeterogeneousEarliestFinishTime;
pub use least_slack_first::LeastSlackTimeFirst;
pub use round_robin::RoundRobin;
pub use shortest_expected_latency::ShortestExpectedLatency;

use crate::{Engine, Job, JobQueue, JobStatus, ScheduleAction};
use sched_core::{time, JobId, ModelId, SubgraphKey, WorkerId, WorkerType};
use std::collections::BTreeMap;

/// A scheduling policy.
///
/// `schedule` looks at up to [`ScheduleContext::window`] jobs at the front
/// of `requests`, removes the ones it dispatches (or fails), and leaves the
/// rest in order. It returns `false` if any dispatch was rejected.
/// Implementations never block: worker state is read from snapshots.
pub trait Scheduler: Send {
    /// Human-readable name of this policy.
    fn name(&self) -> &str;

    fn schedule(&mut self, ctx: &mut ScheduleContext<'_>, requests: &mut JobQueue) -> bool;

    /// Whether models must be prepared with fallback subgraphs.
    fn need_fallback_subgraphs(&self) -> bool;

    /// Queueing discipline the policy expects from workers.
    fn worker_type(&self) -> WorkerType;

    /// Called once a job has left the system, so per-job state can be
    /// dropped.
    fn job_finished(&mut self, _job_id: JobId) {}
}

/// What happened during one `schedule` call, beyond the returned flag.
#[derive(Debug, Default)]
pub struct ScheduleOutcome {
    /// Jobs handed to a worker.
    pub dispatched: usize,
    /// Jobs a worker refused, in refusal order, as they were before dispatch.
    pub rejected: Vec<Job>,
    /// Jobs that can never run (no subgraph or no worker).
    pub failed: Vec<Job>,
    /// Dispatches projected to miss their deadline.
    pub slo_violations: usize,
}

/// Per-pass view handed to a scheduler.
pub struct ScheduleContext<'a> {
    engine: &'a dyn Engine,
    window_size: usize,
    model_worker_map: &'a BTreeMap<ModelId, WorkerId>,
    outcome: ScheduleOutcome,
}

impl<'a> ScheduleContext<'a> {
    pub fn new(
        engine: &'a dyn Engine,
        window_size: usize,
        model_worker_map: &'a BTreeMap<ModelId, WorkerId>,
    ) -> Self {
        Self {
            engine,
            window_size,
            model_worker_map,
            outcome: ScheduleOutcome::default(),
        }
    }

    pub fn engine(&self) -> &'a dyn Engine {
        self.engine
    }

    /// Number of queue entries a policy may look at.
    pub fn window(&self, queue_len: usize) -> usize {
        self.window_size.min(queue_len)
    }

    /// Worker a job should run on when the policy does not estimate
    /// latency: the job's own hint, else the model's cached assignment.
    pub fn preferred_worker(&self, job: &Job) -> Option<WorkerId> {
        job.target_worker
            .or_else(|| self.model_worker_map.get(&job.model_id).copied())
    }

    /// Dispatches `job` with `key`. Returns `false` if the worker refused.
    pub fn enqueue_to_worker(&mut self, job: Job, key: SubgraphKey) -> bool {
        let mut scheduled = job.clone();
        scheduled.subgraph_key = Some(key);
        scheduled.profiled_time = self.engine.expected_latency(&key);
        scheduled.resolved_unit_subgraphs |= key.unit_indices;
        scheduled.status = JobStatus::Scheduled;
        if scheduled.expected_latency == 0 && self.engine.is_begin(&key) {
            scheduled.expected_latency = scheduled.profiled_time;
        }

        if let Some(deadline) = scheduled.deadline() {
            let waiting = self
                .engine
                .worker_waiting_time()
                .get(&key.worker_id)
                .copied()
                .unwrap_or(0);
            let projected = time::now_micros() + waiting + scheduled.profiled_time;
            if projected > deadline && !scheduled.slo_violated {
                scheduled.slo_violated = true;
                self.outcome.slo_violations += 1;
                tracing::warn!(
                    "{} projected to miss its SLO by {}us on {}",
                    display_id(&scheduled),
                    projected - deadline,
                    key.worker_id,
                );
            }
        }

        tracing::debug!("dispatch {} -> {key}", display_id(&scheduled));
        if self.engine.enqueue_to_worker(ScheduleAction {
            job: scheduled,
            key,
        }) {
            self.outcome.dispatched += 1;
            true
        } else {
            tracing::warn!("{} rejected {}", key.worker_id, display_id(&job));
            self.outcome.rejected.push(job);
            false
        }
    }

    /// Retires a job that cannot be scheduled.
    pub fn fail(&mut self, mut job: Job) {
        tracing::warn!(
            "{} of {} cannot be scheduled",
            display_id(&job),
            job.model_id
        );
        job.status = JobStatus::EnqueueFailed;
        self.outcome.failed.push(job);
    }

    pub fn outcome(&self) -> &ScheduleOutcome {
        &self.outcome
    }

    pub fn into_outcome(self) -> ScheduleOutcome {
        self.outcome
    }
}

fn display_id(job: &Job) -> String {
    job.job_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "job#?".to_string())
}

#[cfg(test)]
mod tests {
    use super::testing::{job, MockEngine};
    use super::*;
    use sched_core::UnitMask;

    #[test]
    fn test_enqueue_stamps_job() {
        let engine = MockEngine::new(2, WorkerType::DeviceQueue).with_model(0, &[100, 200], 2);
        let map = BTreeMap::new();
        let mut ctx = ScheduleContext::new(&engine, 4, &map);
        let key = SubgraphKey::new(ModelId(0), WorkerId(1), UnitMask::from_bits(0b1));

        assert!(ctx.enqueue_to_worker(job(1, 0), key));
        let sent = engine.dispatched();
        assert_eq!(sent.len(), 1);
        let dispatched = &sent[0];
        assert_eq!(dispatched.subgraph_key, Some(key));
        assert_eq!(dispatched.profiled_time, 200);
        assert_eq!(dispatched.status, JobStatus::Scheduled);
        assert!(dispatched.resolved_unit_subgraphs.contains(0));
        assert_eq!(ctx.outcome().dispatched, 1);
    }

    #[test]
    fn test_rejection_keeps_original_job() {
        let engine = MockEngine::new(1, WorkerType::GlobalQueue).with_model(0, &[100], 1);
        engine.set_reject(true);
        let map = BTreeMap::new();
        let mut ctx = ScheduleContext::new(&engine, 4, &map);
        let key = SubgraphKey::new(ModelId(0), WorkerId(0), UnitMask::from_bits(0b1));

        assert!(!ctx.enqueue_to_worker(job(5, 0), key));
        let outcome = ctx.into_outcome();
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.rejected[0].status, JobStatus::Queued);
        assert!(outcome.rejected[0].resolved_unit_subgraphs.is_empty());
    }

    #[test]
    fn test_slo_projection_flags_but_dispatches() {
        let engine = MockEngine::new(1, WorkerType::GlobalQueue).with_model(0, &[5_000], 1);
        let map = BTreeMap::new();
        let mut ctx = ScheduleContext::new(&engine, 4, &map);
        let key = SubgraphKey::new(ModelId(0), WorkerId(0), UnitMask::from_bits(0b1));

        let mut j = job(1, 0).with_slo(1_000);
        j.enqueue_time = time::now_micros();
        assert!(ctx.enqueue_to_worker(j, key));
        assert_eq!(ctx.outcome().slo_violations, 1);
        assert!(engine.dispatched()[0].slo_violated);
    }

    #[test]
    fn test_preferred_worker() {
        let engine = MockEngine::new(2, WorkerType::DeviceQueue);
        let map = BTreeMap::from([(ModelId(0), WorkerId(1))]);
        let ctx = ScheduleContext::new(&engine, 1, &map);
        assert_eq!(ctx.preferred_worker(&job(1, 0)), Some(WorkerId(1)));
        assert_eq!(
            ctx.preferred_worker(&job(1, 0).with_target_worker(WorkerId(0))),
            Some(WorkerId(0))
        );
        assert_eq!(ctx.preferred_worker(&job(1, 7)), None);
        assert_eq!(ctx.window(5), 1);
    }

    #[test]
    fn test_fail_marks_status() {
        let engine = MockEngine::new(1, WorkerType::DeviceQueue);
        let map = BTreeMap::new();
        let mut ctx = ScheduleContext::new(&engine, 1, &map);
        ctx.fail(job(3, 0));
        assert_eq!(ctx.outcome().failed[0].status, JobStatus::EnqueueFailed);
    }
}
