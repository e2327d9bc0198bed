// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Simulated engine for experiments and end-to-end tests.
//!
//! Workers are tokio tasks; executing a subgraph sleeps for the sum of its
//! op costs divided by the worker's speed. Latency estimates start from
//! those costs and follow measurements through an exponential moving
//! average.

mod engine;
mod latency;
mod worker;

pub use engine::{SimEngine, SimWorker};
pub use latency::{op_cost_us, LatencyEstimator};

use crate::{Planner, PlannerError, SchedConfig};
use std::sync::Arc;

/// Builds a simulated engine and a planner from `config` and starts both.
///
/// Must be called inside a tokio runtime. Register models afterwards with
/// [`SimEngine::register_model`], passing
/// [`Planner::need_fallback_subgraphs`].
pub fn launch(config: &SchedConfig, time_scale: f64) -> Result<(Arc<SimEngine>, Planner), PlannerError> {
    let engine = SimEngine::from_config(config, time_scale)?;
    let planner = Planner::new(engine.clone());
    engine.set_planner(planner.handle())?;
    engine.start()?;
    planner.init(&config.planner)?;
    Ok((engine, planner))
}
