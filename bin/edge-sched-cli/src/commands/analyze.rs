// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `edge-sched analyze` command: show how a model splits across workers.
//!
//! Prints the unit subgraphs (maximal runs of ops supported by the same
//! set of workers), then every subgraph each worker can execute.

use model_analyzer::{set_to_string, summarize_subgraphs, ModelAnalyzer};
use planner::SchedConfig;
use std::path::PathBuf;

pub async fn execute(config: &SchedConfig, model: PathBuf, no_fallback: bool) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║            edge-sched · Model Analyzer              ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let graph = super::load_model(&model)?;
    let workers = config.worker_supports()?;
    let analyzer = ModelAnalyzer::new(&graph, &workers, config.subgraph.clone(), !no_fallback);
    let (spec, subgraphs) = analyzer.create_subgraphs()?;

    // ── Summary ────────────────────────────────────────────────
    println!("  {}", graph.summary());
    println!("  Preparation: {}", analyzer.preparation_type().as_str());
    println!(
        "  Minimum subgraph size: {}",
        config.subgraph.minimum_subgraph_size
    );
    println!();

    println!("  Workers:");
    for (worker, wc) in workers.iter().zip(&config.workers) {
        let unsupported = spec
            .unsupported_ops
            .get(&worker.worker_id)
            .map(|ops| ops.len())
            .unwrap_or(0);
        println!(
            "   {:<10} {:<4} x{:<5.2} {} unsupported ops",
            worker.worker_id.to_string(),
            worker.device.to_string(),
            wc.speed,
            unsupported,
        );
    }
    println!();

    // ── Unit Subgraphs ─────────────────────────────────────────
    println!("  {:<5} {:>5}  {:<20} {:<12}", "Unit", "Ops", "Workers", "Depends on");
    println!("  {}", "-".repeat(48));
    for (unit, ops) in spec.unit_subgraph_ops.iter().enumerate() {
        let workers: Vec<String> = spec.unit_subgraph_workers[unit]
            .iter()
            .map(|w| w.get().to_string())
            .collect();
        let deps: std::collections::BTreeSet<usize> = spec.unit_subgraph_deps[unit].iter().collect();
        println!(
            "  {:<5} {:>5}  {:<20} {:<12}",
            unit,
            ops.len(),
            workers.join(","),
            set_to_string(&deps),
        );
    }
    println!();

    // ── Worker Subgraphs ───────────────────────────────────────
    println!("  {} subgraphs:", subgraphs.len());
    for line in summarize_subgraphs(&subgraphs).lines() {
        println!("   {line}");
    }
    println!();

    Ok(())
}
