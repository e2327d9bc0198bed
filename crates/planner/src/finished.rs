// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Bounded record of finished jobs.

use crate::Job;
use sched_core::JobId;

/// Fixed-capacity ring of finished jobs, indexed by `job_id % capacity`.
///
/// A slot is only ever overwritten by a newer job, so a late report for an
/// old id cannot clobber a fresher record.
#[derive(Debug)]
pub struct FinishedJobs {
    slots: Vec<Option<Job>>,
}

impl FinishedJobs {
    /// Creates an empty ring. A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity.max(1)],
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn slot(&self, id: JobId) -> usize {
        (id.get() % self.slots.len() as u64) as usize
    }

    /// Stores `job`. Returns `false` if its slot already holds a newer job.
    pub fn insert(&mut self, job: Job) -> bool {
        let Some(id) = job.job_id else {
            tracing::warn!("finished job without an id for {}", job.model_id);
            return false;
        };
        let slot = self.slot(id);
        if let Some(existing) = self.slots[slot].as_ref().and_then(|j| j.job_id) {
            if existing > id {
                tracing::warn!("{id} finished after newer {existing} took its slot");
                return false;
            }
            if existing != id {
                tracing::debug!("{existing} evicted by {id}");
            }
        }
        self.slots[slot] = Some(job);
        true
    }

    /// Finished record for `id`, unless it was never stored or was evicted.
    pub fn get(&self, id: JobId) -> Option<&Job> {
        self.slots[self.slot(id)]
            .as_ref()
            .filter(|job| job.job_id == Some(id))
    }

    pub fn contains(&self, id: JobId) -> bool {
        self.get(id).is_some()
    }

    /// Returns `true` if `id`'s slot holds a newer job, so `id` can never
    /// be read back.
    pub fn is_superseded(&self, id: JobId) -> bool {
        self.slots[self.slot(id)]
            .as_ref()
            .and_then(|job| job.job_id)
            .is_some_and(|existing| existing > id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sched_core::ModelId;

    fn finished(id: u64) -> Job {
        let mut job = Job::new(ModelId(0));
        job.job_id = Some(JobId(id));
        job
    }

    #[test]
    fn test_insert_and_get() {
        let mut ring = FinishedJobs::new(4);
        assert!(ring.insert(finished(1)));
        assert!(ring.contains(JobId(1)));
        assert!(!ring.contains(JobId(2)));
        assert!(!ring.contains(JobId(5)));
    }

    #[test]
    fn test_eviction_by_newer_job() {
        let mut ring = FinishedJobs::new(4);
        ring.insert(finished(1));
        ring.insert(finished(5));
        assert!(!ring.contains(JobId(1)));
        assert!(ring.is_superseded(JobId(1)));
        assert!(!ring.is_superseded(JobId(5)));
        assert_eq!(ring.get(JobId(5)).unwrap().job_id, Some(JobId(5)));
    }

    #[test]
    fn test_older_job_never_overwrites() {
        let mut ring = FinishedJobs::new(4);
        ring.insert(finished(9));
        assert!(!ring.insert(finished(1)));
        assert!(ring.contains(JobId(9)));
    }

    #[test]
    fn test_overflow_does_not_panic() {
        let mut ring = FinishedJobs::new(3);
        for id in 0..100 {
            ring.insert(finished(id));
        }
        assert!(ring.contains(JobId(99)));
        assert!(!ring.contains(JobId(0)));
        assert_eq!(ring.capacity(), 3);
    }

    #[test]
    fn test_job_without_id_rejected() {
        let mut ring = FinishedJobs::new(2);
        assert!(!ring.insert(Job::new(ModelId(0))));
    }
}
