// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! End-of-request callbacks.

use crate::{JobStatus, PlannerError};
use sched_core::{CallbackId, JobId};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Called once per finished job with its id and final status.
///
/// Handlers run on the thread that reports the job finished and must not
/// register or unregister callbacks themselves.
pub type EndRequestCallback = Arc<dyn Fn(JobId, JobStatus) + Send + Sync>;

/// Registered callbacks, keyed by monotonically increasing ids.
#[derive(Default)]
pub struct CallbackRegistry {
    next_id: u64,
    handlers: BTreeMap<CallbackId, EndRequestCallback>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, callback: EndRequestCallback) -> CallbackId {
        let id = CallbackId(self.next_id);
        self.next_id += 1;
        self.handlers.insert(id, callback);
        id
    }

    pub fn unregister(&mut self, id: CallbackId) -> Result<(), PlannerError> {
        self.handlers
            .remove(&id)
            .map(|_| ())
            .ok_or(PlannerError::CallbackNotFound(id))
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Handlers in registration order, detached from the registry so they
    /// can be invoked without holding its lock.
    pub fn snapshot(&self) -> Vec<EndRequestCallback> {
        self.handlers.values().cloned().collect()
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("next_id", &self.next_id)
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}
