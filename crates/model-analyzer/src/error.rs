// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the model analyzer.

use sched_core::WorkerId;

/// Errors that can occur while partitioning a model into subgraphs.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    /// No worker was described to the analyzer.
    #[error("no workers available for partitioning")]
    NoWorkers,

    /// A worker id is duplicated or otherwise unusable.
    #[error("invalid worker {worker}: {detail}")]
    InvalidWorker { worker: WorkerId, detail: String },

    /// An op is not supported by any worker.
    #[error("op {index} ('{name}') is not supported by any worker")]
    UnsupportedOp { index: usize, name: String },

    /// No single worker can run the whole model and fallback is disabled.
    #[error("no worker supports every op of model '{model}'")]
    NoCoveringWorker { model: String },

    /// Resolution stalled: the remaining ops have unresolvable inputs.
    #[error("cannot resolve {remaining} ops (dependency cycle or missing producer)")]
    Unresolvable { remaining: usize },

    /// The model splits into more unit subgraphs than a job mask can track.
    #[error("model splits into {count} unit subgraphs, at most {max} supported")]
    TooManyUnitSubgraphs { count: usize, max: usize },

    /// Invalid subgraph configuration.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// A strategy produced an inconsistent subgraph set.
    #[error("strategy '{strategy}' failed: {detail}")]
    StrategyFailed { strategy: String, detail: String },

    #[error(transparent)]
    Core(#[from] sched_core::CoreError),
}
