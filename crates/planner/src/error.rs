// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the planner and engines.

use sched_core::{CallbackId, JobId, ModelId, SubgraphKey};

/// Errors that can occur while planning and dispatching jobs.
#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    /// Invalid scheduler list, window size, or worker setup.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// The job id was never issued, or its finished record was evicted.
    #[error("{0} not found")]
    JobNotFound(JobId),

    /// The callback id is not registered.
    #[error("{0} not found")]
    CallbackNotFound(CallbackId),

    /// The model is not registered with the engine.
    #[error("{0} is not registered")]
    ModelNotFound(ModelId),

    /// A subgraph invocation failed on its worker.
    #[error("invoke of {key} failed: {detail}")]
    InvokeFailed { key: SubgraphKey, detail: String },

    /// The planner was shut down before the operation completed.
    #[error("planner is shut down")]
    ShutDown,

    /// Model partitioning failed.
    #[error("analyzer error: {0}")]
    AnalyzerError(#[from] model_analyzer::AnalyzerError),

    /// Model loading failed.
    #[error("model error: {0}")]
    ModelError(#[from] model_ir::ModelError),

    /// Job log I/O failed.
    #[error("job log error: {0}")]
    LogError(#[from] std::io::Error),
}
