// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Subcommand implementations and the helpers they share.

pub mod analyze;
pub mod compare;
pub mod simulate;

use model_ir::{graph::Validated, ModelGraph, ModelLoader};
use planner::{sim, Job, JobStatus, PlannerMetrics, SchedConfig, WorkerConfig};
use sched_core::DeviceFlag;
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Sets up the global subscriber. `RUST_LOG` wins over `-v`.
pub fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Reads the configuration file, or builds a CPU + GPU + NPU setup.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<SchedConfig> {
    let mut config = match path {
        Some(path) => SchedConfig::from_file(path)?,
        None => SchedConfig::default(),
    };
    if config.workers.is_empty() {
        config.workers = vec![
            WorkerConfig::new(DeviceFlag::Cpu),
            WorkerConfig::new(DeviceFlag::Gpu).with_speed(2.0),
            WorkerConfig::new(DeviceFlag::Npu)
                .with_speed(4.0)
                .without_op_type("softmax"),
        ];
    }
    config.validate()?;
    Ok(config)
}

/// Loads the model, or a synthetic one when `path` has no manifest.
pub fn load_model(path: &Path) -> anyhow::Result<ModelGraph<Validated>> {
    match ModelLoader::load(path) {
        Ok(graph) => Ok(graph),
        Err(e) => {
            tracing::warn!("model load failed: {e}");
            println!("  Model not found at '{}', using a synthetic CNN.", path.display());
            Ok(synthetic_model()?)
        }
    }
}

/// Eight conv blocks with a softmax head and a custom post-processing op.
fn synthetic_model() -> Result<ModelGraph<Validated>, model_ir::ModelError> {
    let blocks = ["conv", "relu", "depthwise_conv2d", "relu", "add"];
    let mut ops = Vec::new();
    let mut tensor = 0;
    for b in 0..8 {
        for op in blocks {
            ops.push(format!(
                r#"{{ "name": "b{b}.{op}", "op_type": "{op}", "inputs": [{tensor}], "outputs": [{}] }}"#,
                tensor + 1
            ));
            tensor += 1;
        }
    }
    for op in ["fc", "softmax", "custom:nms"] {
        ops.push(format!(
            r#"{{ "name": "{op}", "op_type": "{op}", "inputs": [{tensor}], "outputs": [{}] }}"#,
            tensor + 1
        ));
        tensor += 1;
    }
    let json = format!(
        r#"{{ "name": "synthetic-cnn", "inputs": [0], "outputs": [{tensor}], "ops": [{}] }}"#,
        ops.join(",")
    );
    ModelLoader::from_json(&json)
}

/// Shape of a simulated workload.
#[derive(Debug, Clone, Copy)]
pub struct Workload {
    pub requests: usize,
    pub slo_us: i64,
    pub time_scale: f64,
}

/// Result of one simulated run.
pub struct RunReport {
    pub metrics: PlannerMetrics,
    pub elapsed: std::time::Duration,
    pub by_status: std::collections::BTreeMap<JobStatus, usize>,
}

/// Launches a simulated engine for `config`, submits the workload, and
/// waits for every request.
pub async fn run_workload(
    config: &SchedConfig,
    graph: &ModelGraph<Validated>,
    workload: Workload,
) -> anyhow::Result<RunReport> {
    // Every record must survive until the final wait.
    let mut config = config.clone();
    config.planner.finished_capacity = config.planner.finished_capacity.max(workload.requests);
    let (engine, planner) = sim::launch(&config, workload.time_scale)?;
    let model = engine.register_model(graph, planner.need_fallback_subgraphs())?;

    let jobs = (0..workload.requests)
        .map(|_| Job::new(model).with_slo(workload.slo_us.max(0)))
        .collect();
    let start = std::time::Instant::now();
    let ids = planner.enqueue_batch(jobs);
    let finished = planner.wait(&ids).await;
    let elapsed = start.elapsed();

    let metrics = planner.metrics();
    planner.shutdown().await;
    engine.shutdown().await;

    let mut by_status = std::collections::BTreeMap::new();
    for job in finished? {
        *by_status.entry(job.status).or_insert(0) += 1;
    }
    Ok(RunReport {
        metrics,
        elapsed,
        by_status,
    })
}
