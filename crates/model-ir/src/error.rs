// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for model loading and IR construction.

/// Errors that can occur when working with model representations.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The model manifest file could not be read.
    #[error("failed to read manifest: {0}")]
    ManifestReadError(#[from] std::io::Error),

    /// The manifest JSON is malformed.
    #[error("failed to parse manifest: {0}")]
    ManifestParseError(#[from] serde_json::Error),

    /// An operator definition is invalid (e.g., references a missing tensor).
    #[error("invalid op '{op}': {detail}")]
    InvalidOp { op: String, detail: String },

    /// The model graph is malformed.
    #[error("invalid model graph: {0}")]
    InvalidGraph(String),

    /// The operators form a dependency cycle.
    #[error("model graph contains a cycle through {remaining} ops")]
    CyclicGraph { remaining: usize },
}
