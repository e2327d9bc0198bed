// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Inference jobs and their lifecycle.
//!
//! ```text
//! Queued ──schedule──▶ Scheduled(key) ──worker done──┬─▶ Queued (units left)
//!                                                     └─▶ Success / SloViolation
//!                                                         / InvokeFailure
//! Queued ──no latency plan──▶ EnqueueFailed
//! ```

use sched_core::{JobId, ModelId, SubgraphKey, UnitMask, WorkerId};
use std::collections::VecDeque;

/// Where a job is in its lifecycle.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Scheduled,
    Success,
    /// Finished, but later than `enqueue_time + slo_us * slo_scale`.
    SloViolation,
    /// No worker could take the job.
    EnqueueFailed,
    /// The worker reported a failed invocation.
    InvokeFailure,
}

impl JobStatus {
    /// Returns `true` for statuses a job finishes with.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Success | Self::SloViolation | Self::EnqueueFailed | Self::InvokeFailure
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Scheduled => "scheduled",
            Self::Success => "success",
            Self::SloViolation => "slo_violation",
            Self::EnqueueFailed => "enqueue_failed",
            Self::InvokeFailure => "invoke_failure",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One inference request.
///
/// Times are microseconds since the Unix epoch, latencies microseconds.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Job {
    /// Assigned by the planner on first enqueue.
    pub job_id: Option<JobId>,
    pub model_id: ModelId,
    /// Units already executed (or dispatched). Only grows.
    pub resolved_unit_subgraphs: UnitMask,
    pub enqueue_time: i64,
    pub invoke_time: i64,
    pub end_time: i64,
    /// Expected latency of the subgraph currently dispatched.
    pub profiled_time: i64,
    /// Whole-model latency estimate, set when the first subgraph is scheduled.
    pub expected_latency: i64,
    /// Latency objective; `0` means none.
    pub slo_us: i64,
    /// Multiplier on `slo_us`; values `<= 0` count as `1.0`.
    pub slo_scale: f32,
    /// Pin the job to a worker; `None` lets the scheduler decide.
    pub target_worker: Option<WorkerId>,
    /// Subgraph the job was last dispatched with.
    pub subgraph_key: Option<SubgraphKey>,
    pub status: JobStatus,
    /// Deliver end-of-request callbacks for this job.
    pub require_callback: bool,
    /// Set when dispatch-time projection already exceeded the deadline.
    pub slo_violated: bool,
}

impl Job {
    pub fn new(model_id: ModelId) -> Self {
        Self {
            job_id: None,
            model_id,
            resolved_unit_subgraphs: UnitMask::EMPTY,
            enqueue_time: 0,
            invoke_time: 0,
            end_time: 0,
            profiled_time: 0,
            expected_latency: 0,
            slo_us: 0,
            slo_scale: 0.0,
            target_worker: None,
            subgraph_key: None,
            status: JobStatus::Queued,
            require_callback: true,
            slo_violated: false,
        }
    }

    pub fn with_slo(mut self, slo_us: i64) -> Self {
        self.slo_us = slo_us;
        self
    }

    pub fn with_slo_scale(mut self, scale: f32) -> Self {
        self.slo_scale = scale;
        self
    }

    pub fn with_target_worker(mut self, worker: WorkerId) -> Self {
        self.target_worker = Some(worker);
        self
    }

    pub fn without_callback(mut self) -> Self {
        self.require_callback = false;
        self
    }

    pub fn has_slo(&self) -> bool {
        self.slo_us > 0
    }

    /// Absolute deadline, if the job has an SLO.
    pub fn deadline(&self) -> Option<i64> {
        if !self.has_slo() {
            return None;
        }
        let scale = if self.slo_scale > 0.0 {
            self.slo_scale as f64
        } else {
            1.0
        };
        Some(self.enqueue_time + (self.slo_us as f64 * scale) as i64)
    }

    /// Returns `true` if finishing at `at` would miss the deadline.
    pub fn misses_deadline(&self, at: i64) -> bool {
        self.deadline().map(|d| at > d).unwrap_or(false)
    }

    /// Time from enqueue to end, once finished.
    pub fn latency(&self) -> i64 {
        (self.end_time - self.enqueue_time).max(0)
    }
}

/// FIFO-biased job queue.
pub type JobQueue = VecDeque<Job>;
