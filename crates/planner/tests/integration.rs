// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Integration tests: requests flowing through planner, scheduler, and
//! engine until their callbacks fire.
//!
//! The first group drives the planner with a small executing engine that
//! runs one unit per dispatch; the second uses the simulated engine with a
//! real model graph.

use model_ir::{graph::Validated, ModelGraph, ModelLoader};
use planner::{
    sim, Engine, Job, JobStatus, Planner, PlannerConfig, PlannerError, PlannerHandle,
    ScheduleAction, SchedConfig, SchedulerType, WorkerConfig, WorkerWaitingTime,
};
use sched_core::{time, DeviceFlag, JobId, ModelId, SubgraphKey, UnitMask, WorkerId, WorkerType};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(10);

// ── Helpers ────────────────────────────────────────────────────

/// Engine with one model of `units` units. Every dispatch executes the
/// units of its key on a tokio task and reports back to the planner.
struct StagedEngine {
    worker_type: WorkerType,
    num_workers: usize,
    units: usize,
    busy: Arc<Mutex<BTreeSet<WorkerId>>>,
    executed: Mutex<Vec<(JobId, SubgraphKey)>>,
    planner: OnceLock<PlannerHandle>,
}

impl StagedEngine {
    fn new(worker_type: WorkerType, num_workers: usize, units: usize) -> Arc<Self> {
        Arc::new(Self {
            worker_type,
            num_workers,
            units,
            busy: Arc::new(Mutex::new(BTreeSet::new())),
            executed: Mutex::new(Vec::new()),
            planner: OnceLock::new(),
        })
    }

    fn all_units(&self) -> UnitMask {
        UnitMask::first_n(self.units).unwrap()
    }

    fn next_unit(&self, model: ModelId, worker: WorkerId, resolved: UnitMask) -> Option<SubgraphKey> {
        if model != ModelId(0) || worker.get() >= self.num_workers {
            return None;
        }
        let unit = resolved.first_missing(self.units)?;
        Some(SubgraphKey::new(
            model,
            worker,
            UnitMask::from_indices([unit]).unwrap(),
        ))
    }

    fn executed(&self) -> Vec<(JobId, SubgraphKey)> {
        self.executed.lock().unwrap().clone()
    }
}

impl Engine for StagedEngine {
    fn worker_ids(&self) -> Vec<WorkerId> {
        (0..self.num_workers).map(WorkerId).collect()
    }
    fn worker_type(&self, worker: WorkerId) -> Option<WorkerType> {
        (worker.get() < self.num_workers).then_some(self.worker_type)
    }
    fn model_ids(&self) -> Vec<ModelId> {
        vec![ModelId(0)]
    }
    fn idle_workers(&self) -> BTreeSet<WorkerId> {
        let busy = self.busy.lock().unwrap();
        self.worker_ids()
            .into_iter()
            .filter(|w| !busy.contains(w))
            .collect()
    }
    fn update_workers_waiting(&self) {}
    fn worker_waiting_time(&self) -> WorkerWaitingTime {
        self.worker_ids().into_iter().map(|w| (w, 0)).collect()
    }
    fn subgraph_with_shortest_latency(
        &self,
        job: &Job,
        _: &WorkerWaitingTime,
    ) -> (Vec<SubgraphKey>, i64) {
        let worker = job.target_worker.unwrap_or(WorkerId(0));
        let mut resolved = job.resolved_unit_subgraphs;
        let mut keys = Vec::new();
        while let Some(key) = self.next_unit(job.model_id, worker, resolved) {
            resolved |= key.unit_indices;
            keys.push(key);
        }
        let latency = keys.len() as i64 * 100;
        (keys, latency)
    }
    fn expected_latency(&self, _: &SubgraphKey) -> i64 {
        100
    }
    fn largest_subgraph_key(
        &self,
        model: ModelId,
        worker: WorkerId,
        resolved: UnitMask,
    ) -> Option<SubgraphKey> {
        self.next_unit(model, worker, resolved)
    }
    fn is_begin(&self, key: &SubgraphKey) -> bool {
        key.unit_indices.contains(0)
    }
    fn is_end(&self, key: &SubgraphKey) -> bool {
        key.unit_indices.contains(self.units - 1)
    }
    fn enqueue_to_worker(&self, action: ScheduleAction) -> bool {
        let worker = action.key.worker_id;
        if !self.busy.lock().unwrap().insert(worker) && self.worker_type == WorkerType::GlobalQueue {
            return false;
        }
        let Some(handle) = self.planner.get().cloned() else {
            return false;
        };
        let ScheduleAction { mut job, key } = action;
        if let Some(id) = job.job_id {
            self.executed.lock().unwrap().push((id, key));
        }
        let done = job.resolved_unit_subgraphs == self.all_units();
        let busy = self.busy.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1)).await;
            busy.lock().unwrap().remove(&worker);
            job.end_time = time::now_micros();
            if done {
                job.status = JobStatus::Success;
                handle.enqueue_finished_job(job);
            } else {
                handle.prepare_reenqueue(job);
            }
            handle.trigger();
        });
        true
    }
    fn invoke(&self, _: &SubgraphKey) -> Result<i64, PlannerError> {
        Ok(100)
    }
}

fn start(
    engine: &Arc<StagedEngine>,
    schedulers: Vec<SchedulerType>,
) -> Result<Planner, PlannerError> {
    let planner = Planner::new(engine.clone());
    engine.planner.set(planner.handle()).unwrap();
    planner.init(&PlannerConfig::with_schedulers(schedulers))?;
    Ok(planner)
}

/// conv -> conv -> softmax -> conv.
fn chain_model() -> ModelGraph<Validated> {
    ModelLoader::from_json(
        r#"{
            "name": "chain",
            "inputs": [0],
            "outputs": [4],
            "ops": [
                { "name": "c0", "op_type": "conv", "inputs": [0], "outputs": [1] },
                { "name": "c1", "op_type": "conv", "inputs": [1], "outputs": [2] },
                { "name": "sm", "op_type": "softmax", "inputs": [2], "outputs": [3] },
                { "name": "c2", "op_type": "conv", "inputs": [3], "outputs": [4] }
            ]
        }"#,
    )
    .unwrap()
}

fn sim_config(scheduler: SchedulerType) -> SchedConfig {
    let mut config = SchedConfig::default();
    config.planner.schedulers = vec![scheduler];
    config.subgraph.minimum_subgraph_size = 1;
    config.workers = vec![
        WorkerConfig::new(DeviceFlag::Cpu),
        WorkerConfig::new(DeviceFlag::Npu)
            .with_speed(4.0)
            .without_op_type("softmax"),
    ];
    config
}

// ── Planner with a staged engine ───────────────────────────────

#[tokio::test]
async fn test_ids_increase_and_one_callback_per_job() {
    let engine = StagedEngine::new(WorkerType::DeviceQueue, 2, 1);
    let planner = start(&engine, vec![SchedulerType::RoundRobin]).unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    planner.set_on_end_request(move |_, status| {
        assert_eq!(status, JobStatus::Success);
        seen.fetch_add(1, Ordering::SeqCst);
    });

    let ids: Vec<JobId> = (0..5)
        .map(|_| planner.enqueue_request(Job::new(ModelId(0))))
        .collect();
    assert!(ids.windows(2).all(|w| w[0] < w[1]));

    let finished = tokio::time::timeout(TIMEOUT, planner.wait(&ids))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(finished.len(), 5);
    assert!(finished.iter().all(|j| j.status == JobStatus::Success));
    assert_eq!(calls.load(Ordering::SeqCst), 5);
    planner.shutdown().await;
}

#[tokio::test]
async fn test_fixed_worker_runs_stages_in_order_on_target() {
    let engine = StagedEngine::new(WorkerType::DeviceQueue, 2, 2);
    let planner = start(&engine, vec![SchedulerType::FixedWorker]).unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    planner.set_on_end_request(move |_, _| {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    let id = planner.enqueue_request(Job::new(ModelId(0)).with_target_worker(WorkerId(1)));
    let finished = tokio::time::timeout(TIMEOUT, planner.wait(&[id]))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(finished[0].status, JobStatus::Success);
    assert_eq!(finished[0].resolved_unit_subgraphs, UnitMask::from_bits(0b11));

    let executed = engine.executed();
    assert_eq!(executed.len(), 2);
    assert!(executed.iter().all(|(job, key)| *job == id && key.worker_id == WorkerId(1)));
    assert_eq!(executed[0].1.unit_indices, UnitMask::from_bits(0b01));
    assert_eq!(executed[1].1.unit_indices, UnitMask::from_bits(0b10));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    planner.shutdown().await;
}

#[tokio::test]
async fn test_init_fails_without_matching_worker_type() {
    let engine = StagedEngine::new(WorkerType::DeviceQueue, 2, 1);
    let result = start(&engine, vec![SchedulerType::HeterogeneousEarliestFinishTime]);
    assert!(matches!(result, Err(PlannerError::ConfigError(_))));
}

#[tokio::test]
async fn test_unknown_model_fails_to_enqueue() {
    let engine = StagedEngine::new(WorkerType::DeviceQueue, 1, 1);
    let planner = start(&engine, vec![SchedulerType::FixedWorker]).unwrap();
    let statuses = Arc::new(Mutex::new(Vec::new()));
    let sink = statuses.clone();
    planner.set_on_end_request(move |id, status| sink.lock().unwrap().push((id, status)));

    let id = planner.enqueue_request(Job::new(ModelId(7)).with_target_worker(WorkerId(0)));
    let finished = tokio::time::timeout(TIMEOUT, planner.wait(&[id]))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(finished[0].status, JobStatus::EnqueueFailed);
    assert_eq!(*statuses.lock().unwrap(), vec![(id, JobStatus::EnqueueFailed)]);
    assert!(engine.executed().is_empty());
    planner.shutdown().await;
}

#[tokio::test]
async fn test_wait_all_and_eviction() {
    let engine = StagedEngine::new(WorkerType::DeviceQueue, 1, 1);
    let planner = Planner::new(engine.clone());
    engine.planner.set(planner.handle()).unwrap();
    let mut config = PlannerConfig::with_schedulers(vec![SchedulerType::RoundRobin]);
    config.finished_capacity = 2;
    planner.init(&config).unwrap();

    let ids = planner.enqueue_batch((0..5).map(|_| Job::new(ModelId(0)).without_callback()).collect());
    tokio::time::timeout(TIMEOUT, planner.wait_all())
        .await
        .unwrap()
        .unwrap();

    let metrics = planner.metrics();
    assert_eq!(metrics.submitted, 5);
    assert_eq!(metrics.finished, 5);
    assert_eq!(planner.model_execution_counts()[&ModelId(0)], 5);

    // Only the two most recent records survive.
    assert!(planner.get_finished_job(ids[4]).is_ok());
    assert!(matches!(
        planner.get_finished_job(ids[0]),
        Err(PlannerError::JobNotFound(_))
    ));
    assert!(matches!(
        planner.wait(&[ids[0]]).await,
        Err(PlannerError::JobNotFound(_))
    ));
    planner.shutdown().await;
}

// ── Simulated engine end to end ────────────────────────────────

async fn run_sim(scheduler: SchedulerType, jobs: Vec<Job>) -> (Vec<Job>, planner::PlannerMetrics) {
    let config = sim_config(scheduler);
    let (engine, planner) = sim::launch(&config, 0.01).unwrap();
    let model = engine
        .register_model(&chain_model(), planner.need_fallback_subgraphs())
        .unwrap();
    let jobs = jobs
        .into_iter()
        .map(|mut job| {
            job.model_id = model;
            job
        })
        .collect();
    let ids = planner.enqueue_batch(jobs);
    let finished = tokio::time::timeout(TIMEOUT, planner.wait(&ids))
        .await
        .unwrap()
        .unwrap();
    let metrics = planner.metrics();
    planner.shutdown().await;
    engine.shutdown().await;
    (finished, metrics)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_sim_heft_completes_every_job() {
    let jobs = (0..8).map(|_| Job::new(ModelId(0))).collect();
    let (finished, metrics) = run_sim(SchedulerType::HeterogeneousEarliestFinishTime, jobs).await;
    assert!(finished.iter().all(|j| j.status == JobStatus::Success));
    assert!(finished.iter().all(|j| j.resolved_unit_subgraphs == UnitMask::from_bits(0b111)));
    assert!(finished.iter().all(|j| j.end_time >= j.enqueue_time));
    assert_eq!(metrics.finished, 8);
    assert_eq!(metrics.succeeded, 8);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_sim_every_scheduler_drains_queue() {
    for scheduler in SchedulerType::ALL {
        let jobs = (0..4).map(|_| Job::new(ModelId(0))).collect();
        let (finished, _) = run_sim(scheduler, jobs).await;
        assert!(
            finished.iter().all(|j| j.status == JobStatus::Success),
            "{scheduler} left jobs unfinished"
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_sim_unreachable_slo_is_reported() {
    let jobs = (0..3).map(|_| Job::new(ModelId(0)).with_slo(1)).collect();
    let (finished, metrics) = run_sim(SchedulerType::LeastSlackTimeFirst, jobs).await;
    assert!(finished.iter().all(|j| j.status == JobStatus::SloViolation));
    assert_eq!(metrics.slo_violations, 3);
    assert_eq!(metrics.slo_satisfaction(), 0.0);
}
