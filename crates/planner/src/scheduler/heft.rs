// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Heterogeneous Earliest Finish Time, with optional reservation.
//!
//! Each pass repeats selection rounds over the window:
//!
//! 1. Ask the oracle for every non-yielded job, once per distinct
//!    `(model, resolved units)` pair. With reservation enabled, the
//!    expected cost of every *other* job's reserved next subgraph is first
//!    added to the waiting time of its worker.
//! 2. Pick the job with the largest projected latency.
//! 3. If its first subgraph's worker is busy, charge that subgraph to the
//!    worker's local waiting time, mark the job yielded, and go again.
//!    Once every job has yielded the pass ends.
//! 4. Otherwise dispatch it and, with reservation, remember the next
//!    subgraph of its chain.

use super::{ScheduleContext, Scheduler};
use crate::{Engine, JobQueue, WorkerWaitingTime};
use sched_core::{JobId, ModelId, SubgraphKey, UnitMask, WorkerType};
use std::collections::{BTreeMap, BTreeSet};

/// HEFT scheduler. See the module docs for the algorithm.
#[derive(Debug, Default)]
pub struct HeterogeneousEarliestFinishTime {
    reserve: bool,
    reserved: BTreeMap<JobId, SubgraphKey>,
}

struct Pick {
    index: usize,
    latency: i64,
    keys: Vec<SubgraphKey>,
}

enum Selection {
    /// Nothing left to evaluate in this pass.
    Exhausted,
    Unplannable(usize),
    Best(Pick),
}

impl HeterogeneousEarliestFinishTime {
    pub fn new(reserve: bool) -> Self {
        Self {
            reserve,
            reserved: BTreeMap::new(),
        }
    }

    pub fn is_reserving(&self) -> bool {
        self.reserve
    }

    /// Next subgraph anticipated for each in-flight job.
    pub fn reserved(&self) -> &BTreeMap<JobId, SubgraphKey> {
        &self.reserved
    }

    fn waiting_with_reservations(
        &self,
        engine: &dyn Engine,
        waiting: &WorkerWaitingTime,
        job_id: Option<JobId>,
    ) -> WorkerWaitingTime {
        let mut reserved_time = waiting.clone();
        for (id, key) in &self.reserved {
            if Some(*id) == job_id {
                continue;
            }
            *reserved_time.entry(key.worker_id).or_insert(0) += engine.expected_latency(key);
        }
        reserved_time
    }

    fn select(
        &self,
        engine: &dyn Engine,
        requests: &JobQueue,
        yielded: &[bool],
        waiting: &WorkerWaitingTime,
    ) -> Selection {
        let mut searched: BTreeSet<(ModelId, UnitMask)> = BTreeSet::new();
        let mut best: Option<Pick> = None;

        for (index, job) in requests.iter().enumerate().take(yielded.len()) {
            if yielded[index] || !searched.insert((job.model_id, job.resolved_unit_subgraphs)) {
                continue;
            }
            let (keys, latency) = if self.reserve {
                let reserved_time = self.waiting_with_reservations(engine, waiting, job.job_id);
                engine.subgraph_with_shortest_latency(job, &reserved_time)
            } else {
                engine.subgraph_with_shortest_latency(job, waiting)
            };
            if keys.is_empty() {
                return Selection::Unplannable(index);
            }
            if best.as_ref().map_or(true, |b| latency > b.latency) {
                best = Some(Pick {
                    index,
                    latency,
                    keys,
                });
            }
        }

        best.map_or(Selection::Exhausted, Selection::Best)
    }
}

impl Scheduler for HeterogeneousEarliestFinishTime {
    fn name(&self) -> &str {
        if self.reserve {
            "heft_reserved"
        } else {
            "heft"
        }
    }

    fn schedule(&mut self, ctx: &mut ScheduleContext<'_>, requests: &mut JobQueue) -> bool {
        let engine = ctx.engine();
        let mut success = true;
        let mut yielded = vec![false; ctx.window(requests.len())];

        loop {
            engine.update_workers_waiting();
            let idle = engine.idle_workers();
            if idle.is_empty() {
                break;
            }
            let mut waiting = engine.worker_waiting_time();

            let pick = loop {
                match self.select(engine, requests, &yielded, &waiting) {
                    Selection::Exhausted => return success,
                    Selection::Unplannable(index) => {
                        yielded.remove(index);
                        if let Some(job) = requests.remove(index) {
                            ctx.fail(job);
                        }
                    }
                    Selection::Best(pick) => {
                        let first = pick.keys[0];
                        if idle.contains(&first.worker_id) {
                            break pick;
                        }
                        *waiting.entry(first.worker_id).or_insert(0) +=
                            engine.expected_latency(&first);
                        yielded[pick.index] = true;
                    }
                }
            };

            yielded.remove(pick.index);
            let Some(mut job) = requests.remove(pick.index) else {
                break;
            };
            let key = pick.keys[0];
            if engine.is_begin(&key) {
                job.expected_latency = pick.latency;
            }
            let job_id = job.job_id;
            let dispatched = ctx.enqueue_to_worker(job, key);
            success &= dispatched;

            if self.reserve && dispatched {
                if let Some(id) = job_id {
                    match pick.keys.get(1) {
                        Some(next) => {
                            self.reserved.insert(id, *next);
                        }
                        None => {
                            self.reserved.remove(&id);
                        }
                    }
                }
            }
        }
        success
    }

    fn need_fallback_subgraphs(&self) -> bool {
        true
    }

    fn worker_type(&self) -> WorkerType {
        WorkerType::GlobalQueue
    }

    fn job_finished(&mut self, job_id: JobId) {
        self.reserved.remove(&job_id);
    }
}
