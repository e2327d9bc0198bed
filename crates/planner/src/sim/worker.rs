// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Simulated worker task.

use super::SimEngine;
use crate::{Engine, PlannerError, ScheduleAction};
use sched_core::{time, WorkerId};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

/// Runs actions for one worker in arrival order until its channel closes.
///
/// Each subgraph runs on the blocking pool so a long invocation never
/// stalls the planner loop.
pub(super) async fn run_worker(
    engine: Arc<SimEngine>,
    worker: WorkerId,
    mut rx: UnboundedReceiver<ScheduleAction>,
) {
    tracing::debug!("{worker} started");
    while let Some(ScheduleAction { mut job, key }) = rx.recv().await {
        engine.begin_execution(worker, job.profiled_time);
        job.invoke_time = time::now_micros();

        let runner = engine.clone();
        let result = match tokio::task::spawn_blocking(move || runner.invoke(&key)).await {
            Ok(result) => result,
            Err(e) => Err(PlannerError::InvokeFailed {
                key,
                detail: e.to_string(),
            }),
        };
        job.end_time = time::now_micros();
        engine.finish_execution(worker, job, key, result);
    }
    tracing::debug!("{worker} stopped");
}
