// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-worker operator support.
//!
//! Backends differ in which kernels they implement: an NPU delegate may
//! lack softmax, a DSP may only run quantized convolutions. The analyzer
//! only needs a yes/no answer per `(worker, op)` pair.

use model_ir::{OpDef, OpType};
use sched_core::{DeviceFlag, WorkerId};
use std::collections::BTreeSet;

/// What one worker can execute.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct WorkerSupport {
    pub worker_id: WorkerId,
    pub device: DeviceFlag,
    /// Op types this worker has no kernel for.
    #[serde(default)]
    pub unsupported_op_types: BTreeSet<OpType>,
    /// Individual op indices rejected by the backend (e.g. unsupported shapes).
    #[serde(default)]
    pub unsupported_ops: BTreeSet<usize>,
}

impl WorkerSupport {
    /// A worker supporting every op.
    pub fn new(worker_id: WorkerId, device: DeviceFlag) -> Self {
        Self {
            worker_id,
            device,
            unsupported_op_types: BTreeSet::new(),
            unsupported_ops: BTreeSet::new(),
        }
    }

    pub fn without_op_type(mut self, op_type: OpType) -> Self {
        self.unsupported_op_types.insert(op_type);
        self
    }

    pub fn without_op(mut self, index: usize) -> Self {
        self.unsupported_ops.insert(index);
        self
    }

    /// Returns `true` if this worker can execute `op`.
    pub fn supports(&self, op: &OpDef) -> bool {
        !self.unsupported_ops.contains(&op.index) && !self.unsupported_op_types.contains(&op.op_type)
    }
}
