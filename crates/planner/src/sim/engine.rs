// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! In-process engine that simulates heterogeneous workers.

use super::latency::{op_cost_us, LatencyEstimator};
use super::worker::run_worker;
use crate::planner::lock;
use crate::{
    Engine, Job, JobStatus, PlannerError, PlannerHandle, SchedConfig, ScheduleAction,
    WorkerWaitingTime,
};
use model_analyzer::{ModelAnalyzer, ModelSpec, SubgraphConfig, SubgraphDef, WorkerSupport};
use model_ir::graph::Validated;
use model_ir::ModelGraph;
use sched_core::{time, DeviceFlag, ModelId, SubgraphKey, UnitMask, WorkerId, WorkerType};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Static description of one simulated worker.
#[derive(Debug, Clone)]
pub struct SimWorker {
    pub id: WorkerId,
    pub device: DeviceFlag,
    pub worker_type: WorkerType,
    /// Relative throughput; op costs are divided by it.
    pub speed: f64,
    pub support: WorkerSupport,
}

struct SimModel {
    name: String,
    spec: ModelSpec,
    defs: Vec<SubgraphDef>,
    /// `keys[i]` addresses `defs[i]`.
    keys: Vec<SubgraphKey>,
    /// Nominal cost per op on a speed-1.0 worker.
    op_costs: Vec<f64>,
}

#[derive(Debug, Default, Clone)]
struct WorkerState {
    /// Actions accepted and not yet finished, including the running one.
    queued: usize,
    /// Expected time of accepted actions that have not started.
    backlog_us: i64,
    /// Expected time of the running action, `0` when idle.
    running_expected_us: i64,
    running_since: i64,
}

type MemoKey = (UnitMask, i64);
type Chain = Option<(Vec<SubgraphKey>, i64)>;

/// Simulated engine: one tokio task per worker, subgraph execution as a
/// blocking sleep proportional to the ops it contains.
///
/// Build it with [`SimEngine::from_config`], hand it a [`PlannerHandle`]
/// through [`set_planner`](SimEngine::set_planner), then
/// [`start`](SimEngine::start) the workers. [`super::launch`] does all of
/// this.
pub struct SimEngine {
    workers: Vec<SimWorker>,
    subgraph_config: SubgraphConfig,
    /// Multiplier applied to every simulated duration.
    time_scale: f64,
    models: Mutex<BTreeMap<ModelId, SimModel>>,
    next_model_id: AtomicU32,
    latency: Mutex<LatencyEstimator>,
    states: Mutex<Vec<WorkerState>>,
    waiting: Mutex<WorkerWaitingTime>,
    senders: Mutex<Vec<Option<mpsc::UnboundedSender<ScheduleAction>>>>,
    receivers: Mutex<Vec<Option<mpsc::UnboundedReceiver<ScheduleAction>>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    planner: OnceLock<PlannerHandle>,
    shutting_down: AtomicBool,
}

impl SimEngine {
    /// Creates the engine and its worker channels. Workers are not running
    /// until [`start`](Self::start).
    pub fn from_config(config: &SchedConfig, time_scale: f64) -> Result<Arc<Self>, PlannerError> {
        config.validate()?;
        if config.workers.is_empty() {
            return Err(PlannerError::ConfigError(
                "the simulated engine needs at least one worker".into(),
            ));
        }
        if time_scale <= 0.0 {
            return Err(PlannerError::ConfigError(format!(
                "time scale must be positive, got {time_scale}"
            )));
        }

        let default_type = config.default_worker_type();
        let mut workers = Vec::with_capacity(config.workers.len());
        let mut senders = Vec::with_capacity(config.workers.len());
        let mut receivers = Vec::with_capacity(config.workers.len());
        for (index, wc) in config.workers.iter().enumerate() {
            let id = WorkerId(index);
            workers.push(SimWorker {
                id,
                device: wc.device,
                worker_type: wc.worker_type.unwrap_or(default_type),
                speed: wc.speed,
                support: wc.support(id)?,
            });
            let (tx, rx) = mpsc::unbounded_channel();
            senders.push(Some(tx));
            receivers.push(Some(rx));
        }

        let waiting = workers.iter().map(|w| (w.id, 0)).collect();
        let states = vec![WorkerState::default(); workers.len()];
        tracing::info!(
            "simulated engine: {}",
            workers
                .iter()
                .map(|w| format!("{}={}({})x{}", w.id, w.device, w.worker_type, w.speed))
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(Arc::new(Self {
            workers,
            subgraph_config: config.subgraph.clone(),
            time_scale,
            models: Mutex::new(BTreeMap::new()),
            next_model_id: AtomicU32::new(0),
            latency: Mutex::new(LatencyEstimator::new(config.profile.smoothing_factor)),
            states: Mutex::new(states),
            waiting: Mutex::new(waiting),
            senders: Mutex::new(senders),
            receivers: Mutex::new(receivers),
            tasks: Mutex::new(Vec::new()),
            planner: OnceLock::new(),
            shutting_down: AtomicBool::new(false),
        }))
    }

    /// Connects the planner that receives finished and partial jobs.
    pub fn set_planner(&self, handle: PlannerHandle) -> Result<(), PlannerError> {
        self.planner
            .set(handle)
            .map_err(|_| PlannerError::ConfigError("planner already attached".into()))
    }

    /// Spawns one task per worker on the current tokio runtime.
    pub fn start(self: &Arc<Self>) -> Result<(), PlannerError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            PlannerError::ConfigError("workers must be started inside a tokio runtime".into())
        })?;
        let receivers: Vec<_> = lock(&self.receivers).iter_mut().map(Option::take).collect();
        let mut tasks = lock(&self.tasks);
        for (worker, rx) in self.workers.iter().zip(receivers) {
            let Some(rx) = rx else {
                return Err(PlannerError::ConfigError(format!(
                    "{} already started",
                    worker.id
                )));
            };
            tasks.push(runtime.spawn(run_worker(self.clone(), worker.id, rx)));
        }
        Ok(())
    }

    /// Stops accepting work, lets workers drain, and waits for them.
    pub async fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::Release);
        lock(&self.senders).iter_mut().for_each(|tx| {
            tx.take();
        });
        let tasks = std::mem::take(&mut *lock(&self.tasks));
        for task in tasks {
            if let Err(e) = task.await {
                tracing::warn!("worker task ended abnormally: {e}");
            }
        }
    }

    pub fn workers(&self) -> &[SimWorker] {
        &self.workers
    }

    // ── Models ─────────────────────────────────────────────────────────

    /// Partitions `graph` for the configured workers and registers it.
    pub fn register_model(
        &self,
        graph: &ModelGraph<Validated>,
        need_fallback_subgraphs: bool,
    ) -> Result<ModelId, PlannerError> {
        let supports: Vec<WorkerSupport> = self.workers.iter().map(|w| w.support.clone()).collect();
        let analyzer = ModelAnalyzer::new(
            graph,
            &supports,
            self.subgraph_config.clone(),
            need_fallback_subgraphs,
        );
        let (spec, defs) = analyzer.create_subgraphs()?;

        let id = ModelId(self.next_model_id.fetch_add(1, Ordering::SeqCst));
        let keys = defs
            .iter()
            .map(|d| SubgraphKey::new(id, d.worker_id, d.unit_mask()))
            .collect();
        let model = SimModel {
            name: graph.name.clone(),
            spec,
            defs,
            keys,
            op_costs: graph.iter_ops().map(|op| op_cost_us(&op.op_type)).collect(),
        };

        {
            let mut latency = lock(&self.latency);
            for key in &model.keys {
                latency.seed(*key, self.static_cost(&model, key));
            }
        }
        tracing::info!(
            "registered {id} '{}' ({}): {} unit subgraphs, {} subgraphs",
            model.name,
            analyzer.preparation_type(),
            model.spec.num_unit_subgraphs(),
            model.defs.len()
        );
        lock(&self.models).insert(id, model);

        if let Some(planner) = self.planner.get() {
            planner.invalidate_model_worker_map();
        }
        Ok(id)
    }

    pub fn model_spec(&self, model: ModelId) -> Option<ModelSpec> {
        lock(&self.models).get(&model).map(|m| m.spec.clone())
    }

    pub fn subgraph_defs(&self, model: ModelId) -> Vec<SubgraphDef> {
        lock(&self.models)
            .get(&model)
            .map(|m| m.defs.clone())
            .unwrap_or_default()
    }

    fn worker_speed(&self, worker: WorkerId) -> f64 {
        self.workers
            .get(worker.get())
            .map(|w| w.speed)
            .unwrap_or(1.0)
    }

    /// Simulated duration of `key`, in microseconds.
    fn static_cost(&self, model: &SimModel, key: &SubgraphKey) -> i64 {
        let ops: BTreeSet<usize> = key
            .unit_indices
            .iter()
            .filter_map(|u| model.spec.unit_subgraph_ops.get(u))
            .flatten()
            .copied()
            .collect();
        let nominal: f64 = ops
            .iter()
            .filter_map(|&op| model.op_costs.get(op))
            .sum();
        ((nominal / self.worker_speed(key.worker_id)) * self.time_scale)
            .round()
            .max(1.0) as i64
    }

    // ── Oracle ─────────────────────────────────────────────────────────

    /// Cheapest chain finishing `resolved`, each step starting at the
    /// lowest unresolved unit.
    fn shortest_chain(
        &self,
        model: &SimModel,
        latency: &LatencyEstimator,
        resolved: UnitMask,
        start: i64,
        waiting: &WorkerWaitingTime,
        memo: &mut BTreeMap<MemoKey, Chain>,
    ) -> Chain {
        if model.spec.is_fully_resolved(resolved) {
            return Some((Vec::new(), start));
        }
        if let Some(hit) = memo.get(&(resolved, start)) {
            return hit.clone();
        }
        let first = resolved.first_missing(model.spec.num_unit_subgraphs())?;

        let mut best: Chain = None;
        for key in &model.keys {
            if !key.unit_indices.contains(first) || !model.spec.can_run(key.unit_indices, resolved) {
                continue;
            }
            let expected = latency
                .get(key)
                .unwrap_or_else(|| self.static_cost(model, key));
            let begin = start.max(waiting.get(&key.worker_id).copied().unwrap_or(0));
            let end = begin + expected;
            let next = resolved | key.unit_indices;
            if let Some((rest, total)) =
                self.shortest_chain(model, latency, next, end, waiting, memo)
            {
                if best.as_ref().map_or(true, |(_, t)| total < *t) {
                    let mut chain = Vec::with_capacity(rest.len() + 1);
                    chain.push(*key);
                    chain.extend(rest);
                    best = Some((chain, total));
                }
            }
        }
        memo.insert((resolved, start), best.clone());
        best
    }

    // ── Worker bookkeeping ─────────────────────────────────────────────

    pub(super) fn begin_execution(&self, worker: WorkerId, expected_us: i64) {
        let mut states = lock(&self.states);
        if let Some(state) = states.get_mut(worker.get()) {
            state.backlog_us = (state.backlog_us - expected_us).max(0);
            state.running_expected_us = expected_us;
            state.running_since = time::now_micros();
        }
    }

    pub(super) fn finish_execution(
        &self,
        worker: WorkerId,
        mut job: Job,
        key: SubgraphKey,
        result: Result<i64, PlannerError>,
    ) {
        {
            let mut states = lock(&self.states);
            if let Some(state) = states.get_mut(worker.get()) {
                state.queued = state.queued.saturating_sub(1);
                state.running_expected_us = 0;
            }
        }

        let failed = match result {
            Ok(measured) => {
                let estimate = lock(&self.latency).update(key, measured);
                tracing::debug!("{key} ran in {measured}us (estimate {estimate}us)");
                false
            }
            Err(e) => {
                tracing::warn!("{e}");
                job.status = JobStatus::InvokeFailure;
                true
            }
        };

        let Some(planner) = self.planner.get() else {
            tracing::warn!("no planner attached; dropping {:?}", job.job_id);
            return;
        };
        let done = failed
            || lock(&self.models)
                .get(&key.model_id)
                .map(|m| m.spec.is_fully_resolved(job.resolved_unit_subgraphs))
                .unwrap_or(true);
        if failed {
            planner.enqueue_finished_job(job);
        } else if done {
            job.status = JobStatus::Success;
            planner.enqueue_finished_job(job);
        } else {
            planner.prepare_reenqueue(job);
        }
        planner.trigger();
    }

    fn is_accepting(&self) -> bool {
        !self.shutting_down.load(Ordering::Acquire)
            && !self.planner.get().is_some_and(|p| p.is_shut_down())
    }
}

impl Engine for SimEngine {
    fn worker_ids(&self) -> Vec<WorkerId> {
        self.workers.iter().map(|w| w.id).collect()
    }

    fn worker_type(&self, worker: WorkerId) -> Option<WorkerType> {
        self.workers.get(worker.get()).map(|w| w.worker_type)
    }

    fn model_ids(&self) -> Vec<ModelId> {
        lock(&self.models).keys().copied().collect()
    }

    fn idle_workers(&self) -> BTreeSet<WorkerId> {
        lock(&self.states)
            .iter()
            .enumerate()
            .filter(|(_, s)| s.queued == 0)
            .map(|(i, _)| WorkerId(i))
            .collect()
    }

    fn update_workers_waiting(&self) {
        let now = time::now_micros();
        let snapshot: WorkerWaitingTime = lock(&self.states)
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let running = if s.running_expected_us > 0 {
                    (s.running_expected_us - (now - s.running_since)).max(0)
                } else {
                    0
                };
                (WorkerId(i), s.backlog_us + running)
            })
            .collect();
        *lock(&self.waiting) = snapshot;
    }

    fn worker_waiting_time(&self) -> WorkerWaitingTime {
        lock(&self.waiting).clone()
    }

    fn subgraph_with_shortest_latency(
        &self,
        job: &Job,
        waiting: &WorkerWaitingTime,
    ) -> (Vec<SubgraphKey>, i64) {
        let models = lock(&self.models);
        let Some(model) = models.get(&job.model_id) else {
            return (Vec::new(), 0);
        };
        let latency = lock(&self.latency);
        let mut memo = BTreeMap::new();
        match self.shortest_chain(
            model,
            &latency,
            job.resolved_unit_subgraphs,
            0,
            waiting,
            &mut memo,
        ) {
            Some((keys, total)) if !keys.is_empty() => (keys, total),
            _ => (Vec::new(), 0),
        }
    }

    fn expected_latency(&self, key: &SubgraphKey) -> i64 {
        if let Some(expected) = lock(&self.latency).get(key) {
            return expected;
        }
        lock(&self.models)
            .get(&key.model_id)
            .map(|m| self.static_cost(m, key))
            .unwrap_or(0)
    }

    fn largest_subgraph_key(
        &self,
        model: ModelId,
        worker: WorkerId,
        resolved: UnitMask,
    ) -> Option<SubgraphKey> {
        let models = lock(&self.models);
        let m = models.get(&model)?;
        let first = resolved.first_missing(m.spec.num_unit_subgraphs())?;
        m.keys
            .iter()
            .filter(|k| k.worker_id == worker)
            .filter(|k| k.unit_indices.contains(first) && m.spec.can_run(k.unit_indices, resolved))
            .max_by(|a, b| {
                a.unit_indices
                    .len()
                    .cmp(&b.unit_indices.len())
                    .then(b.unit_indices.cmp(&a.unit_indices))
            })
            .copied()
    }

    fn is_begin(&self, key: &SubgraphKey) -> bool {
        key.unit_indices.contains(0)
    }

    fn is_end(&self, key: &SubgraphKey) -> bool {
        lock(&self.models)
            .get(&key.model_id)
            .map(|m| {
                let n = m.spec.num_unit_subgraphs();
                n > 0 && key.unit_indices.contains(n - 1)
            })
            .unwrap_or(false)
    }

    fn enqueue_to_worker(&self, action: ScheduleAction) -> bool {
        if !self.is_accepting() {
            tracing::debug!("rejecting {}: shutting down", action.key);
            return false;
        }
        let index = action.key.worker_id.get();
        let Some(worker) = self.workers.get(index) else {
            return false;
        };
        let expected = action.job.profiled_time;
        {
            let mut states = lock(&self.states);
            let state = &mut states[index];
            if worker.worker_type == WorkerType::GlobalQueue && state.queued > 0 {
                return false;
            }
            state.queued += 1;
            state.backlog_us += expected;
        }

        let sent = lock(&self.senders)
            .get(index)
            .and_then(Option::as_ref)
            .is_some_and(|tx| tx.send(action).is_ok());
        if !sent {
            let mut states = lock(&self.states);
            let state = &mut states[index];
            state.queued = state.queued.saturating_sub(1);
            state.backlog_us = (state.backlog_us - expected).max(0);
        }
        sent
    }

    fn invoke(&self, key: &SubgraphKey) -> Result<i64, PlannerError> {
        let cost = {
            let models = lock(&self.models);
            let model = models
                .get(&key.model_id)
                .ok_or(PlannerError::ModelNotFound(key.model_id))?;
            if !model.keys.contains(key) {
                return Err(PlannerError::InvokeFailed {
                    key: *key,
                    detail: "no such subgraph".into(),
                });
            }
            self.static_cost(model, key)
        };
        let started = Instant::now();
        std::thread::sleep(time::from_micros(cost));
        Ok(time::as_micros(started.elapsed()))
    }
}
