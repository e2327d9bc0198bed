// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Deterministic engine for scheduler unit tests.
//!
//! Models are linear chains of units; each worker has a fixed per-unit
//! latency (`0` means the worker cannot run the model). The oracle places
//! every remaining unit on the worker that finishes it first.

use crate::{Engine, Job, PlannerError, ScheduleAction, WorkerWaitingTime};
use sched_core::{JobId, ModelId, SubgraphKey, UnitMask, WorkerId, WorkerType};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

struct MockModel {
    per_worker_latency: Vec<i64>,
    units: usize,
}

#[derive(Default)]
struct MockState {
    busy: BTreeSet<WorkerId>,
    waiting: WorkerWaitingTime,
    dispatched: Vec<ScheduleAction>,
    reject: bool,
    oracle_calls: usize,
}

pub(crate) struct MockEngine {
    workers: Vec<WorkerType>,
    models: BTreeMap<ModelId, MockModel>,
    state: Mutex<MockState>,
}

pub(crate) fn job(id: u64, model: u32) -> Job {
    let mut job = Job::new(ModelId(model));
    job.job_id = Some(JobId(id));
    job.enqueue_time = sched_core::time::now_micros();
    job
}

impl MockEngine {
    pub(crate) fn new(num_workers: usize, worker_type: WorkerType) -> Self {
        let waiting = (0..num_workers).map(|w| (WorkerId(w), 0)).collect();
        Self {
            workers: vec![worker_type; num_workers],
            models: BTreeMap::new(),
            state: Mutex::new(MockState {
                waiting,
                ..MockState::default()
            }),
        }
    }

    pub(crate) fn with_model(mut self, model: u32, per_worker_latency: &[i64], units: usize) -> Self {
        self.models.insert(
            ModelId(model),
            MockModel {
                per_worker_latency: per_worker_latency.to_vec(),
                units,
            },
        );
        self
    }

    pub(crate) fn set_busy(&self, worker: usize, waiting_us: i64) {
        let mut state = self.state.lock().unwrap();
        state.busy.insert(WorkerId(worker));
        state.waiting.insert(WorkerId(worker), waiting_us);
    }

    pub(crate) fn set_idle(&self, worker: usize) {
        let mut state = self.state.lock().unwrap();
        state.busy.remove(&WorkerId(worker));
        state.waiting.insert(WorkerId(worker), 0);
    }

    pub(crate) fn set_reject(&self, reject: bool) {
        self.state.lock().unwrap().reject = reject;
    }

    pub(crate) fn dispatched(&self) -> Vec<Job> {
        let state = self.state.lock().unwrap();
        state.dispatched.iter().map(|a| a.job.clone()).collect()
    }

    pub(crate) fn dispatched_keys(&self) -> Vec<SubgraphKey> {
        let state = self.state.lock().unwrap();
        state.dispatched.iter().map(|a| a.key).collect()
    }

    pub(crate) fn oracle_calls(&self) -> usize {
        self.state.lock().unwrap().oracle_calls
    }

    fn latency(&self, model: ModelId, worker: WorkerId) -> Option<i64> {
        self.models
            .get(&model)
            .and_then(|m| m.per_worker_latency.get(worker.get()))
            .copied()
            .filter(|l| *l > 0)
    }

    fn units(&self, model: ModelId) -> usize {
        self.models.get(&model).map(|m| m.units).unwrap_or(0)
    }
}

impl Engine for MockEngine {
    fn worker_ids(&self) -> Vec<WorkerId> {
        (0..self.workers.len()).map(WorkerId).collect()
    }

    fn worker_type(&self, worker: WorkerId) -> Option<WorkerType> {
        self.workers.get(worker.get()).copied()
    }

    fn model_ids(&self) -> Vec<ModelId> {
        self.models.keys().copied().collect()
    }

    fn idle_workers(&self) -> BTreeSet<WorkerId> {
        let state = self.state.lock().unwrap();
        self.worker_ids()
            .into_iter()
            .filter(|w| !state.busy.contains(w))
            .collect()
    }

    fn update_workers_waiting(&self) {}

    fn worker_waiting_time(&self) -> WorkerWaitingTime {
        self.state.lock().unwrap().waiting.clone()
    }

    fn subgraph_with_shortest_latency(
        &self,
        job: &Job,
        waiting: &WorkerWaitingTime,
    ) -> (Vec<SubgraphKey>, i64) {
        self.state.lock().unwrap().oracle_calls += 1;
        let units = self.units(job.model_id);
        let mut keys = Vec::new();
        let mut end = 0;
        for unit in 0..units {
            if job.resolved_unit_subgraphs.contains(unit) {
                continue;
            }
            let best = self
                .worker_ids()
                .into_iter()
                .filter_map(|w| {
                    let latency = self.latency(job.model_id, w)?;
                    let start = end.max(waiting.get(&w).copied().unwrap_or(0));
                    Some((start + latency, w))
                })
                .min();
            let Some((finish, worker)) = best else {
                return (Vec::new(), 0);
            };
            keys.push(SubgraphKey::new(
                job.model_id,
                worker,
                UnitMask::from_bits(1 << unit),
            ));
            end = finish;
        }
        if keys.is_empty() {
            return (keys, 0);
        }
        (keys, end)
    }

    fn expected_latency(&self, key: &SubgraphKey) -> i64 {
        self.latency(key.model_id, key.worker_id).unwrap_or(0) * key.unit_indices.len() as i64
    }

    fn largest_subgraph_key(
        &self,
        model: ModelId,
        worker: WorkerId,
        resolved: UnitMask,
    ) -> Option<SubgraphKey> {
        self.latency(model, worker)?;
        let units = self.units(model);
        let remaining = (0..units).filter(|u| !resolved.contains(*u));
        let mask = UnitMask::from_indices(remaining).ok()?;
        (!mask.is_empty()).then(|| SubgraphKey::new(model, worker, mask))
    }

    fn is_begin(&self, key: &SubgraphKey) -> bool {
        key.unit_indices.contains(0)
    }

    fn is_end(&self, key: &SubgraphKey) -> bool {
        let units = self.units(key.model_id);
        units > 0 && key.unit_indices.contains(units - 1)
    }

    fn enqueue_to_worker(&self, action: ScheduleAction) -> bool {
        let worker = action.key.worker_id;
        let global = self.worker_type(worker) == Some(WorkerType::GlobalQueue);
        let mut state = self.state.lock().unwrap();
        if state.reject || (global && state.busy.contains(&worker)) {
            return false;
        }
        state.busy.insert(worker);
        *state.waiting.entry(worker).or_insert(0) += action.job.profiled_time;
        state.dispatched.push(action);
        true
    }

    fn invoke(&self, key: &SubgraphKey) -> Result<i64, PlannerError> {
        Ok(self.expected_latency(key))
    }
}
