// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `edge-sched compare` command: sweep schedulers over one workload.
//!
//! Each scheduler gets a fresh simulated engine and planner, so latency
//! estimates learned by one run do not leak into the next.

use super::Workload;
use planner::{SchedConfig, SchedulerType};
use std::path::PathBuf;

pub async fn execute(
    config: SchedConfig,
    model: PathBuf,
    schedulers: String,
    workload: Workload,
) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║           edge-sched · Scheduler Sweep              ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let types: Vec<SchedulerType> = schedulers
        .split(',')
        .map(|s| {
            SchedulerType::from_str_loose(s)
                .ok_or_else(|| anyhow::anyhow!("unknown scheduler '{}'", s.trim()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let graph = super::load_model(&model)?;
    println!("  Model:    {}", graph.summary());
    println!("  Requests: {} per scheduler", workload.requests);
    println!();

    println!(
        "  {:<44} {:>10} {:>10} {:>10} {:>8} {:>7}",
        "Scheduler", "Wall (ms)", "Avg (ms)", "Max (ms)", "SLO %", "Failed",
    );
    println!("  {}", "-".repeat(94));

    for ty in types {
        let mut run_config = config.clone();
        run_config.planner.schedulers = vec![ty];
        // Per-worker types come from the scheduler when left unset.
        for worker in &mut run_config.workers {
            worker.worker_type = None;
        }

        match super::run_workload(&run_config, &graph, workload).await {
            Ok(report) => {
                let m = &report.metrics;
                println!(
                    "  {:<44} {:>10.2} {:>10.2} {:>10.2} {:>7.1}% {:>7}",
                    ty.as_str(),
                    report.elapsed.as_secs_f64() * 1000.0,
                    m.avg_latency_us() / 1000.0,
                    m.max_latency_us as f64 / 1000.0,
                    m.slo_satisfaction() * 100.0,
                    m.enqueue_failures + m.invoke_failures,
                );
            }
            Err(e) => {
                tracing::warn!("{ty} failed: {e}");
                println!("  {:<44} (failed)", ty.as_str());
            }
        }
    }
    println!();

    Ok(())
}
