// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The planner: job intake, dispatch loop, and finished-job bookkeeping.

use crate::callbacks::{CallbackRegistry, EndRequestCallback};
use crate::finished::FinishedJobs;
use crate::job_log::JobLog;
use crate::scheduler::{ScheduleContext, Scheduler};
use crate::{Engine, Job, JobQueue, JobStatus, PlannerConfig, PlannerError, PlannerMetrics};
use sched_core::{time, CallbackId, JobId, ModelId, UnitMask, WorkerId, WorkerType};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;

/// Passes between periodic refreshes of the model-to-worker map.
const MODEL_WORKER_REFRESH_PASSES: u64 = 100;

/// Default size of the finished-job ring.
pub const DEFAULT_FINISHED_CAPACITY: usize = 1000;

/// Locks `mutex`, recovering the data if a holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Shared state ───────────────────────────────────────────────────────

#[derive(Default)]
struct Intake {
    /// Continuations and urgent requests, served before `back`.
    front: JobQueue,
    back: JobQueue,
}

struct FinishedState {
    ring: FinishedJobs,
    metrics: PlannerMetrics,
    /// Finished since the last pass, for scheduler bookkeeping.
    retired: Vec<JobId>,
    /// Finished since the last flush; `None` when no job log is configured.
    pending_log: Option<Vec<Job>>,
}

struct SchedulerEntry {
    scheduler: Box<dyn Scheduler>,
    queue: JobQueue,
}

#[derive(Default)]
struct SchedulerSet {
    entries: Vec<SchedulerEntry>,
    model_worker_map: BTreeMap<ModelId, WorkerId>,
    map_dirty: bool,
    passes: u64,
}

pub(crate) struct PlannerShared {
    intake: Mutex<Intake>,
    next_job_id: AtomicU64,
    num_submitted: AtomicU64,
    finished: Mutex<FinishedState>,
    callbacks: Mutex<CallbackRegistry>,
    /// Number of finished jobs; waiters watch it.
    finished_tx: watch::Sender<u64>,
    trigger: Notify,
    shutdown: AtomicBool,
    window_size: AtomicUsize,
    schedulers: Mutex<SchedulerSet>,
    job_log: Mutex<Option<JobLog>>,
}

impl PlannerShared {
    fn new() -> Self {
        let (finished_tx, _) = watch::channel(0);
        Self {
            intake: Mutex::new(Intake::default()),
            next_job_id: AtomicU64::new(0),
            num_submitted: AtomicU64::new(0),
            finished: Mutex::new(FinishedState {
                ring: FinishedJobs::new(DEFAULT_FINISHED_CAPACITY),
                metrics: PlannerMetrics::new(),
                retired: Vec::new(),
                pending_log: None,
            }),
            callbacks: Mutex::new(CallbackRegistry::new()),
            finished_tx,
            trigger: Notify::new(),
            shutdown: AtomicBool::new(false),
            window_size: AtomicUsize::new(PlannerConfig::default().schedule_window_size),
            schedulers: Mutex::new(SchedulerSet::default()),
            job_log: Mutex::new(None),
        }
    }

    fn is_shut_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    fn trigger(&self) {
        self.trigger.notify_one();
    }

    fn push(&self, mut job: Job, front: bool) -> JobId {
        let id = match job.job_id {
            Some(id) => id,
            None => {
                let id = JobId(self.next_job_id.fetch_add(1, Ordering::SeqCst));
                job.job_id = Some(id);
                job.enqueue_time = time::now_micros();
                self.num_submitted.fetch_add(1, Ordering::SeqCst);
                id
            }
        };
        job.status = JobStatus::Queued;
        {
            let mut intake = lock(&self.intake);
            if front {
                intake.front.push_back(job);
            } else {
                intake.back.push_back(job);
            }
        }
        self.trigger();
        id
    }

    fn push_batch(&self, jobs: Vec<Job>) -> Vec<JobId> {
        let now = time::now_micros();
        let mut ids = Vec::with_capacity(jobs.len());
        {
            let mut intake = lock(&self.intake);
            for mut job in jobs {
                let id = JobId(self.next_job_id.fetch_add(1, Ordering::SeqCst));
                job.job_id = Some(id);
                job.enqueue_time = now;
                job.status = JobStatus::Queued;
                intake.back.push_back(job);
                ids.push(id);
            }
        }
        self.num_submitted
            .fetch_add(ids.len() as u64, Ordering::SeqCst);
        self.trigger();
        ids
    }

    fn enqueue_finished_job(&self, mut job: Job) {
        let Some(id) = job.job_id else {
            tracing::warn!("dropping finished job without an id for {}", job.model_id);
            return;
        };
        if job.status == JobStatus::Success
            && (job.slo_violated || job.misses_deadline(job.end_time))
        {
            job.status = JobStatus::SloViolation;
            tracing::warn!(
                "{id} violated its SLO: {}us > {}us",
                job.latency(),
                job.deadline().map(|d| d - job.enqueue_time).unwrap_or(0)
            );
        }
        let status = job.status;
        let require_callback = job.require_callback;

        {
            let mut finished = lock(&self.finished);
            finished.metrics.record_finished(&job);
            finished.retired.push(id);
            if let Some(pending) = finished.pending_log.as_mut() {
                pending.push(job.clone());
            }
            finished.ring.insert(job);
        }

        if require_callback {
            let handlers = lock(&self.callbacks).snapshot();
            for handler in handlers {
                handler(id, status);
            }
        }

        self.finished_tx.send_modify(|count| *count += 1);
        self.trigger();
    }

    fn reenqueue(&self, mut job: Job) {
        job.subgraph_key = None;
        job.invoke_time = 0;
        job.end_time = 0;
        job.profiled_time = 0;
        self.push(job, true);
    }

    // ── Dispatch loop ──────────────────────────────────────────────────

    async fn run(self: Arc<Self>, engine: Arc<dyn Engine>) {
        tracing::info!("planner loop started");
        loop {
            self.trigger.notified().await;
            if self.is_shut_down() {
                break;
            }
            self.schedule_pass(engine.as_ref());
        }
        tracing::info!("planner loop stopped");
    }

    fn schedule_pass(&self, engine: &dyn Engine) {
        let retired = std::mem::take(&mut lock(&self.finished).retired);
        let window_size = self.window_size.load(Ordering::Relaxed);
        let mut failed = Vec::new();
        let mut rejected = 0u64;

        {
            let mut set = lock(&self.schedulers);
            let SchedulerSet {
                entries,
                model_worker_map,
                map_dirty,
                passes,
            } = &mut *set;
            if entries.is_empty() {
                return;
            }

            for id in retired {
                for entry in entries.iter_mut() {
                    entry.scheduler.job_finished(id);
                }
            }

            let (front, back) = {
                let mut intake = lock(&self.intake);
                (
                    std::mem::take(&mut intake.front),
                    std::mem::take(&mut intake.back),
                )
            };
            let last = entries.len() - 1;
            let route = |job: &Job| if last == 0 || job.has_slo() { 0 } else { last };
            for job in front.into_iter().rev() {
                entries[route(&job)].queue.push_front(job);
            }
            for job in back {
                entries[route(&job)].queue.push_back(job);
            }

            if *map_dirty || *passes % MODEL_WORKER_REFRESH_PASSES == 0 {
                *model_worker_map = compute_model_worker_map(engine);
                *map_dirty = false;
            }
            *passes += 1;

            for entry in entries.iter_mut() {
                if entry.queue.is_empty() {
                    continue;
                }
                let mut ctx = ScheduleContext::new(engine, window_size, model_worker_map);
                let success = entry.scheduler.schedule(&mut ctx, &mut entry.queue);
                let outcome = ctx.into_outcome();
                if !success {
                    tracing::debug!(
                        "{}: {} dispatches rejected",
                        entry.scheduler.name(),
                        outcome.rejected.len()
                    );
                }
                rejected += outcome.rejected.len() as u64;
                for job in outcome.rejected.into_iter().rev() {
                    entry.queue.push_front(job);
                }
                failed.extend(outcome.failed);
            }
        }

        {
            let mut finished = lock(&self.finished);
            finished.metrics.passes += 1;
            finished.metrics.rejected_dispatches += rejected;
        }

        for mut job in failed {
            job.end_time = time::now_micros();
            self.enqueue_finished_job(job);
        }
        self.flush_job_log();
    }

    fn flush_job_log(&self) {
        let pending = match lock(&self.finished).pending_log.as_mut() {
            Some(pending) if !pending.is_empty() => std::mem::take(pending),
            _ => return,
        };
        if let Some(log) = lock(&self.job_log).as_mut() {
            if let Err(e) = log.append(&pending) {
                tracing::warn!("failed to write {}: {e}", log.path().display());
            }
        }
    }
}

/// Spreads models over workers round-robin, skipping workers that cannot
/// run a model at all.
fn compute_model_worker_map(engine: &dyn Engine) -> BTreeMap<ModelId, WorkerId> {
    let workers = engine.worker_ids();
    let mut map = BTreeMap::new();
    if workers.is_empty() {
        return map;
    }
    let mut next = 0;
    for model in engine.model_ids() {
        for offset in 0..workers.len() {
            let index = (next + offset) % workers.len();
            let worker = workers[index];
            if engine
                .largest_subgraph_key(model, worker, UnitMask::EMPTY)
                .is_some()
            {
                map.insert(model, worker);
                next = index + 1;
                break;
            }
        }
    }
    map
}

// ── Worker-facing handle ───────────────────────────────────────────────

/// The planner's entry points for engines and workers.
#[derive(Clone)]
pub struct PlannerHandle {
    shared: Arc<PlannerShared>,
}

impl PlannerHandle {
    /// Retires a job whose last subgraph ran (or that failed).
    pub fn enqueue_finished_job(&self, job: Job) {
        self.shared.enqueue_finished_job(job);
    }

    /// Puts a partially executed job back at the front of the queue.
    pub fn prepare_reenqueue(&self, job: Job) {
        self.shared.reenqueue(job);
    }

    /// Wakes the dispatch loop, e.g. after a worker went idle.
    pub fn trigger(&self) {
        self.shared.trigger();
    }

    /// Forces the model-to-worker map to be rebuilt on the next pass, e.g.
    /// after the engine registered a model.
    pub fn invalidate_model_worker_map(&self) {
        lock(&self.shared.schedulers).map_dirty = true;
        self.shared.trigger();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.is_shut_down()
    }
}

impl std::fmt::Debug for PlannerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlannerHandle")
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

// ── Planner ────────────────────────────────────────────────────────────

/// Owns the job lifecycle for one engine.
///
/// # Example
/// ```no_run
/// # async fn demo(engine: std::sync::Arc<dyn planner::Engine>) -> Result<(), planner::PlannerError> {
/// use planner::{Job, Planner, PlannerConfig, SchedulerType};
/// use sched_core::ModelId;
///
/// let planner = Planner::new(engine);
/// planner.init(&PlannerConfig::with_schedulers(vec![SchedulerType::HeterogeneousEarliestFinishTime]))?;
/// let id = planner.enqueue_request(Job::new(ModelId(0)));
/// let finished = planner.wait(&[id]).await?;
/// println!("{}", finished[0].status);
/// planner.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub struct Planner {
    shared: Arc<PlannerShared>,
    engine: Arc<dyn Engine>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Planner {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self {
            shared: Arc::new(PlannerShared::new()),
            engine,
            task: Mutex::new(None),
        }
    }

    /// Handle for the engine to report finished and partial jobs.
    pub fn handle(&self) -> PlannerHandle {
        PlannerHandle {
            shared: self.shared.clone(),
        }
    }

    pub fn engine(&self) -> &Arc<dyn Engine> {
        &self.engine
    }

    /// Validates `config`, installs its schedulers, and starts the dispatch
    /// loop on the current tokio runtime.
    pub fn init(&self, config: &PlannerConfig) -> Result<(), PlannerError> {
        config.validate()?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            PlannerError::ConfigError("the planner must be started inside a tokio runtime".into())
        })?;
        let mut task = lock(&self.task);
        if task.is_some() {
            return Err(PlannerError::ConfigError("planner already initialised".into()));
        }

        // Everything fallible happens before any state is installed.
        let log = config.log_path.as_deref().map(JobLog::open).transpose()?;
        let schedulers: Vec<Box<dyn Scheduler>> =
            config.schedulers.iter().map(|ty| ty.create()).collect();
        {
            let mut set = lock(&self.shared.schedulers);
            let mut current = set.entries.first().map(|e| e.scheduler.worker_type());
            for scheduler in &schedulers {
                self.check_worker_type(scheduler.as_ref(), current)?;
                current = Some(scheduler.worker_type());
            }
            for scheduler in schedulers {
                tracing::info!("added scheduler '{}'", scheduler.name());
                set.entries.push(SchedulerEntry {
                    scheduler,
                    queue: JobQueue::new(),
                });
            }
            set.map_dirty = true;
        }
        self.set_window_size(config.schedule_window_size);

        {
            let mut finished = lock(&self.shared.finished);
            if finished.ring.capacity() != config.finished_capacity {
                finished.ring = FinishedJobs::new(config.finished_capacity);
            }
        }
        if let Some(log) = log {
            *lock(&self.shared.job_log) = Some(log);
            lock(&self.shared.finished).pending_log = Some(Vec::new());
        }

        let shared = self.shared.clone();
        let engine = self.engine.clone();
        *task = Some(runtime.spawn(shared.run(engine)));
        tracing::info!(
            "planner initialised: schedulers [{}], window {}",
            self.scheduler_names().join(", "),
            config.schedule_window_size
        );
        self.shared.trigger();
        Ok(())
    }

    /// Appends a scheduler. Every scheduler must use the same worker type,
    /// and at least one engine worker must provide it.
    pub fn add_scheduler(&self, scheduler: Box<dyn Scheduler>) -> Result<(), PlannerError> {
        let mut set = lock(&self.shared.schedulers);
        let current = set.entries.first().map(|e| e.scheduler.worker_type());
        self.check_worker_type(scheduler.as_ref(), current)?;
        tracing::info!("added scheduler '{}'", scheduler.name());
        set.entries.push(SchedulerEntry {
            scheduler,
            queue: JobQueue::new(),
        });
        set.map_dirty = true;
        Ok(())
    }

    /// Fails if no engine worker provides the worker type `scheduler`
    /// needs, or if it differs from `current`.
    fn check_worker_type(
        &self,
        scheduler: &dyn Scheduler,
        current: Option<WorkerType>,
    ) -> Result<(), PlannerError> {
        let wanted = scheduler.worker_type();
        let provided = self
            .engine
            .worker_ids()
            .into_iter()
            .any(|w| self.engine.worker_type(w) == Some(wanted));
        if !provided {
            return Err(PlannerError::ConfigError(format!(
                "scheduler '{}' needs {wanted} workers, but the engine has none",
                scheduler.name()
            )));
        }
        if let Some(current) = current.filter(|&c| c != wanted) {
            return Err(PlannerError::ConfigError(format!(
                "scheduler '{}' needs {wanted} workers but the installed schedulers need {current}",
                scheduler.name()
            )));
        }
        Ok(())
    }

    pub fn scheduler_names(&self) -> Vec<String> {
        lock(&self.shared.schedulers)
            .entries
            .iter()
            .map(|e| e.scheduler.name().to_string())
            .collect()
    }

    /// Whether any installed scheduler needs fallback subgraphs.
    pub fn need_fallback_subgraphs(&self) -> bool {
        lock(&self.shared.schedulers)
            .entries
            .iter()
            .any(|e| e.scheduler.need_fallback_subgraphs())
    }

    /// Worker type shared by the installed schedulers.
    pub fn worker_type(&self) -> Option<WorkerType> {
        lock(&self.shared.schedulers)
            .entries
            .first()
            .map(|e| e.scheduler.worker_type())
    }

    // ── Requests ───────────────────────────────────────────────────────

    /// Queues a job and returns its id.
    pub fn enqueue_request(&self, mut job: Job) -> JobId {
        job.job_id = None;
        self.shared.push(job, false)
    }

    /// Queues a job ahead of everything not yet drained.
    pub fn enqueue_request_front(&self, mut job: Job) -> JobId {
        job.job_id = None;
        self.shared.push(job, true)
    }

    /// Queues several jobs under one intake lock; ids are consecutive.
    pub fn enqueue_batch(&self, jobs: Vec<Job>) -> Vec<JobId> {
        self.shared.push_batch(jobs)
    }

    /// Waits until every job in `ids` has finished and returns their records.
    pub async fn wait(&self, ids: &[JobId]) -> Result<Vec<Job>, PlannerError> {
        let mut rx = self.shared.finished_tx.subscribe();
        loop {
            let issued = self.shared.next_job_id.load(Ordering::SeqCst);
            {
                let finished = lock(&self.shared.finished);
                let mut done = Vec::with_capacity(ids.len());
                for &id in ids {
                    if id.get() >= issued || finished.ring.is_superseded(id) {
                        return Err(PlannerError::JobNotFound(id));
                    }
                    match finished.ring.get(id) {
                        Some(job) => done.push(job.clone()),
                        None => break,
                    }
                }
                if done.len() == ids.len() {
                    return Ok(done);
                }
            }
            if self.shared.is_shut_down() {
                return Err(PlannerError::ShutDown);
            }
            rx.changed().await.map_err(|_| PlannerError::ShutDown)?;
        }
    }

    /// Waits until every submitted job has finished.
    pub async fn wait_all(&self) -> Result<(), PlannerError> {
        let mut rx = self.shared.finished_tx.subscribe();
        loop {
            let finished = *rx.borrow_and_update();
            if finished >= self.shared.num_submitted.load(Ordering::SeqCst) {
                return Ok(());
            }
            if self.shared.is_shut_down() {
                return Err(PlannerError::ShutDown);
            }
            rx.changed().await.map_err(|_| PlannerError::ShutDown)?;
        }
    }

    /// Finished record of `id`.
    pub fn get_finished_job(&self, id: JobId) -> Result<Job, PlannerError> {
        lock(&self.shared.finished)
            .ring
            .get(id)
            .cloned()
            .ok_or(PlannerError::JobNotFound(id))
    }

    // ── Callbacks ──────────────────────────────────────────────────────

    /// Registers a handler called with `(job_id, status)` for every job
    /// that finishes with `require_callback` set.
    pub fn set_on_end_request<F>(&self, callback: F) -> CallbackId
    where
        F: Fn(JobId, JobStatus) + Send + Sync + 'static,
    {
        let callback: EndRequestCallback = Arc::new(callback);
        lock(&self.shared.callbacks).register(callback)
    }

    pub fn unset_on_end_request(&self, id: CallbackId) -> Result<(), PlannerError> {
        lock(&self.shared.callbacks).unregister(id)
    }

    // ── Tuning and introspection ───────────────────────────────────────

    /// Sets the scheduling window. Zero is ignored.
    pub fn set_window_size(&self, size: usize) {
        if size == 0 {
            tracing::warn!("ignoring window size 0");
            return;
        }
        self.shared.window_size.store(size, Ordering::Relaxed);
    }

    pub fn window_size(&self) -> usize {
        self.shared.window_size.load(Ordering::Relaxed)
    }

    /// Wakes the dispatch loop.
    pub fn trigger(&self) {
        self.shared.trigger();
    }

    /// Finished jobs per model.
    pub fn model_execution_counts(&self) -> BTreeMap<ModelId, u64> {
        lock(&self.shared.finished).metrics.per_model.clone()
    }

    /// The cached model-to-worker assignment. A hint only.
    pub fn model_worker_map(&self) -> BTreeMap<ModelId, WorkerId> {
        lock(&self.shared.schedulers).model_worker_map.clone()
    }

    pub fn metrics(&self) -> PlannerMetrics {
        let mut metrics = lock(&self.shared.finished).metrics.clone();
        metrics.submitted = self.shared.num_submitted.load(Ordering::SeqCst);
        metrics
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.is_shut_down()
    }

    /// Stops dispatching. The pass in progress completes; waiters are
    /// released with [`PlannerError::ShutDown`].
    pub async fn shutdown(&self) {
        self.signal_shutdown();
        let task = lock(&self.task).take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::warn!("planner loop ended abnormally: {e}");
            }
        }
        self.shared.flush_job_log();
    }

    fn signal_shutdown(&self) {
        if self.shared.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::info!("planner shutting down");
        self.shared.trigger();
        self.shared.finished_tx.send_modify(|_| {});
    }
}

impl Drop for Planner {
    fn drop(&mut self) {
        self.signal_shutdown();
    }
}
