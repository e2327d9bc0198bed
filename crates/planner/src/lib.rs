// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # planner
//!
//! Decides which worker runs which part of which inference request, and
//! when.
//!
//! A [`Planner`] owns the request queue, one or more [`Scheduler`]s, the
//! ring of finished jobs and the end-of-request callbacks. It talks to the
//! execution side only through the [`Engine`] trait:
//! ```text
//! enqueue_request ─▶ intake ─▶ scheduler queues ─▶ Scheduler::schedule
//!                                                      │
//!                      Engine::enqueue_to_worker ◀─────┘
//!                                │
//!        worker runs subgraph ───┴─▶ prepare_reenqueue  (more units left)
//!                                └─▶ enqueue_finished_job ─▶ callbacks, wait()
//! ```
//!
//! # Dispatch loop
//! A single tokio task wakes on every trigger (new request, finished
//! subgraph, explicit [`Planner::trigger`]) and runs one pass over all
//! schedulers. Jobs with an SLO go to the first scheduler and the rest to
//! the last one when more than one is configured.
//!
//! # Simulation
//! [`sim`] provides an in-process engine whose workers sleep for a
//! cost-model latency, enough to compare policies without hardware.

mod callbacks;
mod config;
mod engine;
mod error;
mod finished;
mod job;
mod job_log;
mod metrics;
mod planner;
pub mod scheduler;
pub mod sim;

pub use callbacks::{CallbackRegistry, EndRequestCallback};
pub use config::{PlannerConfig, ProfileConfig, SchedConfig, SchedulerType, WorkerConfig};
pub use engine::{Engine, ScheduleAction, WorkerWaitingTime};
pub use error::PlannerError;
pub use finished::FinishedJobs;
pub use job::{Job, JobQueue, JobStatus};
pub use job_log::JobLog;
pub use metrics::PlannerMetrics;
pub use planner::{Planner, PlannerHandle, DEFAULT_FINISHED_CAPACITY};
pub use scheduler::{ScheduleContext, ScheduleOutcome, Scheduler};
