// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `edge-sched simulate` command: push requests through one scheduler on
//! the simulated engine.

use super::{RunReport, Workload};
use planner::{SchedConfig, SchedulerType};
use std::path::PathBuf;

pub async fn execute(
    mut config: SchedConfig,
    model: PathBuf,
    scheduler: String,
    window: Option<usize>,
    workload: Workload,
) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║            edge-sched · Simulation Run              ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let ty = SchedulerType::from_str_loose(&scheduler)
        .ok_or_else(|| anyhow::anyhow!("unknown scheduler '{scheduler}'"))?;
    config.planner.schedulers = vec![ty];
    if let Some(window) = window {
        config.planner.schedule_window_size = window;
    }
    config.validate()?;

    let graph = super::load_model(&model)?;

    // ── Configuration ──────────────────────────────────────────
    println!("  Config:");
    println!("   Model:      {}", graph.name);
    println!("   Scheduler:  {ty}");
    println!("   Workers:    {}", config.workers.len());
    println!("   Requests:   {}", workload.requests);
    if workload.slo_us > 0 {
        println!("   SLO:        {:.2} ms", workload.slo_us as f64 / 1000.0);
    }
    println!("   Time scale: {}", workload.time_scale);
    println!();

    let report = super::run_workload(&config, &graph, workload).await?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &RunReport) {
    let metrics = &report.metrics;
    println!("  Results:");
    println!("   Wall time:       {:.2} ms", report.elapsed.as_secs_f64() * 1000.0);
    println!(
        "   Throughput:      {:.1} req/s",
        metrics.finished as f64 / report.elapsed.as_secs_f64().max(f64::EPSILON)
    );
    println!("   Avg latency:     {:.2} ms", metrics.avg_latency_us() / 1000.0);
    println!("   Max latency:     {:.2} ms", metrics.max_latency_us as f64 / 1000.0);
    println!("   SLO satisfied:   {:.1}%", metrics.slo_satisfaction() * 100.0);
    println!("   Dispatch passes: {}", metrics.passes);
    println!();
    println!("  By status:");
    for (status, count) in &report.by_status {
        println!("   {:<16} {count}", status.as_str());
    }
    println!();
    println!("  {}", metrics.summary());
}
