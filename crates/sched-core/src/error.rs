// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the core vocabulary.

/// Errors raised when constructing core values from untrusted input.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A unit-subgraph index does not fit in a [`crate::UnitMask`].
    #[error("unit subgraph index {index} exceeds the maximum of {max}")]
    UnitIndexOutOfRange { index: usize, max: usize },

    /// A device name could not be parsed.
    #[error("unknown device '{0}'; expected 'cpu', 'gpu', 'dsp', or 'npu'")]
    UnknownDevice(String),

    /// A worker type name could not be parsed.
    #[error("unknown worker type '{0}'; expected 'device_queue' or 'global_queue'")]
    UnknownWorkerType(String),
}
