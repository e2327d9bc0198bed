// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The engine contract consumed by the planner and schedulers.
//!
//! An [`Engine`] owns the workers and the registered models. The planner
//! never touches a backend directly: it asks the engine which workers are
//! idle, how long a subgraph is expected to take, and hands it
//! [`ScheduleAction`]s to run. Workers report back through a
//! [`crate::PlannerHandle`].

use crate::{Job, PlannerError};
use sched_core::{ModelId, SubgraphKey, UnitMask, WorkerId, WorkerType};
use std::collections::{BTreeMap, BTreeSet};

/// Projected busy time per worker, in microseconds.
pub type WorkerWaitingTime = BTreeMap<WorkerId, i64>;

/// A job bound to the subgraph it should run next.
#[derive(Debug, Clone)]
pub struct ScheduleAction {
    pub job: Job,
    pub key: SubgraphKey,
}

/// Facade over workers, models, and latency estimates.
///
/// Implementations must be cheap to query: schedulers call the latency
/// oracle once per candidate job on every pass.
pub trait Engine: Send + Sync {
    // ── Enumeration ────────────────────────────────────────────────

    fn worker_ids(&self) -> Vec<WorkerId>;

    /// Queueing discipline of `worker`, or `None` if it does not exist.
    fn worker_type(&self, worker: WorkerId) -> Option<WorkerType>;

    fn model_ids(&self) -> Vec<ModelId>;

    // ── Worker state ───────────────────────────────────────────────

    /// Workers with nothing running and nothing queued.
    fn idle_workers(&self) -> BTreeSet<WorkerId>;

    /// Refreshes the waiting-time snapshot returned by
    /// [`worker_waiting_time`](Engine::worker_waiting_time).
    fn update_workers_waiting(&self);

    fn worker_waiting_time(&self) -> WorkerWaitingTime;

    // ── Latency oracle ─────────────────────────────────────────────

    /// Best chain of subgraphs finishing `job`, and its projected
    /// completion latency given `waiting`. The first key is the one to run
    /// next. An empty chain means the job cannot be planned.
    fn subgraph_with_shortest_latency(
        &self,
        job: &Job,
        waiting: &WorkerWaitingTime,
    ) -> (Vec<SubgraphKey>, i64);

    /// Expected execution time of one subgraph.
    fn expected_latency(&self, key: &SubgraphKey) -> i64;

    /// Largest runnable subgraph of `model` on `worker` after `resolved`,
    /// for policies that do not consult the oracle.
    fn largest_subgraph_key(
        &self,
        model: ModelId,
        worker: WorkerId,
        resolved: UnitMask,
    ) -> Option<SubgraphKey>;

    /// Returns `true` if `key` contains the model's first unit.
    fn is_begin(&self, key: &SubgraphKey) -> bool;

    /// Returns `true` if `key` contains the model's last unit.
    fn is_end(&self, key: &SubgraphKey) -> bool;

    // ── Execution ──────────────────────────────────────────────────

    /// Hands an action to its worker. Returns `false` if the worker
    /// refused it (busy global-queue worker, shutting down).
    fn enqueue_to_worker(&self, action: ScheduleAction) -> bool;

    /// Runs one subgraph to completion on the calling thread and returns
    /// the measured execution time in microseconds.
    fn invoke(&self, key: &SubgraphKey) -> Result<i64, PlannerError>;
}
