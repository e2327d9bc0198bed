// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # sched-core
//!
//! Vocabulary types shared by every edge-sched crate.
//!
//! This crate provides:
//! - [`JobId`], [`ModelId`], [`WorkerId`], [`CallbackId`]: strongly typed
//!   identifiers so a worker index can never be passed where a model id is
//!   expected.
//! - [`UnitMask`]: a fixed-width bitset over unit-subgraph indices, used to
//!   track which parts of a model a job has already executed.
//! - [`SubgraphKey`]: `(model, worker, unit set)`, the handle under which
//!   a prepared subgraph is executed and profiled.
//! - [`DeviceFlag`] and [`WorkerType`]: what a worker runs on and how it
//!   accepts work.
//! - [`time`]: microsecond wall-clock helpers used for enqueue / end times.
//!
//! # Design Goals
//! - `Copy` identifiers, no heap allocation in keys.
//! - Total ordering on every key type so maps iterate deterministically.
//! - Clean error types via `thiserror`.

mod device;
mod error;
mod ids;
mod key;
mod mask;
pub mod time;

pub use device::{DeviceFlag, WorkerType};
pub use error::CoreError;
pub use ids::{CallbackId, JobId, ModelId, WorkerId};
pub use key::SubgraphKey;
pub use mask::{UnitMask, MAX_UNIT_SUBGRAPHS};
