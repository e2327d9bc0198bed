// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Planner metrics.
//!
//! [`PlannerMetrics`] aggregates job outcomes and end-to-end latency. It is
//! the primary tool for comparing scheduling policies in simulation.

use crate::{Job, JobStatus};
use sched_core::ModelId;
use std::collections::BTreeMap;

/// Aggregate counters for a planner's lifetime.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct PlannerMetrics {
    /// Jobs accepted by `enqueue_request` / `enqueue_batch`.
    pub submitted: u64,
    /// Jobs that reached a terminal status.
    pub finished: u64,
    pub succeeded: u64,
    pub slo_violations: u64,
    pub enqueue_failures: u64,
    pub invoke_failures: u64,
    /// Dispatches a worker refused; the job was re-queued.
    pub rejected_dispatches: u64,
    /// Scheduling passes run by the dispatch loop.
    pub passes: u64,
    /// Sum of enqueue-to-end latency over finished jobs, in microseconds.
    pub total_latency_us: i64,
    pub max_latency_us: i64,
    /// Finished jobs per model.
    pub per_model: BTreeMap<ModelId, u64>,
}

impl PlannerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a job that reached a terminal status.
    pub fn record_finished(&mut self, job: &Job) {
        self.finished += 1;
        match job.status {
            JobStatus::Success => self.succeeded += 1,
            JobStatus::SloViolation => self.slo_violations += 1,
            JobStatus::EnqueueFailed => self.enqueue_failures += 1,
            JobStatus::InvokeFailure => self.invoke_failures += 1,
            JobStatus::Queued | JobStatus::Scheduled => {}
        }
        *self.per_model.entry(job.model_id).or_insert(0) += 1;
        if job.end_time > 0 {
            let latency = job.latency();
            self.total_latency_us += latency;
            self.max_latency_us = self.max_latency_us.max(latency);
        }
    }

    /// Mean end-to-end latency of executed jobs, in microseconds.
    pub fn avg_latency_us(&self) -> f64 {
        let executed = self.succeeded + self.slo_violations + self.invoke_failures;
        if executed == 0 {
            return 0.0;
        }
        self.total_latency_us as f64 / executed as f64
    }

    /// Fraction of finished jobs that completed within their SLO.
    pub fn slo_satisfaction(&self) -> f64 {
        if self.finished == 0 {
            return 1.0;
        }
        self.succeeded as f64 / self.finished as f64
    }

    /// Returns a human-readable summary suitable for CLI output.
    pub fn summary(&self) -> String {
        format!(
            "Planner: {} submitted, {} finished ({} ok, {} SLO violations, \
             {} enqueue failures, {} invoke failures), {} rejected dispatches, \
             {} passes, avg latency {:.2}ms, max {:.2}ms, SLO satisfaction {:.1}%",
            self.submitted,
            self.finished,
            self.succeeded,
            self.slo_violations,
            self.enqueue_failures,
            self.invoke_failures,
            self.rejected_dispatches,
            self.passes,
            self.avg_latency_us() / 1000.0,
            self.max_latency_us as f64 / 1000.0,
            self.slo_satisfaction() * 100.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finished(status: JobStatus, latency: i64) -> Job {
        let mut job = Job::new(ModelId(1));
        job.status = status;
        job.enqueue_time = 1_000;
        job.end_time = 1_000 + latency;
        job
    }

    #[test]
    fn test_empty_metrics() {
        let m = PlannerMetrics::new();
        assert_eq!(m.avg_latency_us(), 0.0);
        assert_eq!(m.slo_satisfaction(), 1.0);
    }

    #[test]
    fn test_record_finished() {
        let mut m = PlannerMetrics::new();
        m.record_finished(&finished(JobStatus::Success, 2_000));
        m.record_finished(&finished(JobStatus::SloViolation, 6_000));
        let mut failed = Job::new(ModelId(2));
        failed.status = JobStatus::EnqueueFailed;
        m.record_finished(&failed);

        assert_eq!(m.finished, 3);
        assert_eq!(m.succeeded, 1);
        assert_eq!(m.slo_violations, 1);
        assert_eq!(m.enqueue_failures, 1);
        assert_eq!(m.max_latency_us, 6_000);
        assert_eq!(m.avg_latency_us(), 4_000.0);
        assert_eq!(m.per_model[&ModelId(1)], 2);
        assert!((m.slo_satisfaction() - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_summary_mentions_counts() {
        let mut m = PlannerMetrics::new();
        m.submitted = 2;
        m.record_finished(&finished(JobStatus::Success, 1_500));
        let s = m.summary();
        assert!(s.contains("2 submitted"));
        assert!(s.contains("1 finished"));
        assert!(s.contains("avg latency 1.50ms"));
    }
}
