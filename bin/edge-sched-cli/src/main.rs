// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # edge-sched
//!
//! Command-line interface for the edge-sched planner.
//!
//! ## Usage
//! ```bash
//! # Show how a model is split across workers
//! edge-sched analyze --model ./models/mobilenet
//!
//! # Run 200 simulated requests through one scheduler
//! edge-sched simulate --model ./models/mobilenet --scheduler heft --requests 200
//!
//! # Compare schedulers on the same workload
//! edge-sched compare --model ./models/mobilenet --schedulers rr,sel,heft,lsf --slo-us 20000
//!
//! # Print a starting configuration
//! edge-sched config > sched.toml
//! ```

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "edge-sched",
    about = "Heterogeneous inference scheduling for edge devices",
    version,
    author
)]
struct Cli {
    /// Path to a TOML configuration file (workers, planner, subgraphs).
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Partition a model into unit subgraphs and per-worker subgraphs.
    Analyze {
        /// Path to the model directory or manifest.
        #[arg(short, long)]
        model: std::path::PathBuf,

        /// Prepare the whole model as one subgraph per worker.
        #[arg(long)]
        no_fallback: bool,
    },

    /// Run simulated requests through one scheduler and report metrics.
    Simulate {
        /// Path to the model directory or manifest.
        #[arg(short, long)]
        model: std::path::PathBuf,

        /// Scheduler: fixed, rr, sel, fixed_worker_global_queue, heft, lsf, heft_reserved.
        #[arg(short, long, default_value = "heft_reserved")]
        scheduler: String,

        /// Number of requests to submit.
        #[arg(short = 'n', long, default_value_t = 100)]
        requests: usize,

        /// Latency objective per request in microseconds (0 = none).
        #[arg(long, default_value_t = 0)]
        slo_us: i64,

        /// Scheduling window (defaults to the configured one).
        #[arg(short, long)]
        window: Option<usize>,

        /// Multiplier applied to simulated execution times.
        #[arg(long, default_value_t = 0.1)]
        time_scale: f64,
    },

    /// Run the same workload through several schedulers.
    Compare {
        /// Path to the model directory or manifest.
        #[arg(short, long)]
        model: std::path::PathBuf,

        /// Schedulers to compare (comma-separated).
        #[arg(long, default_value = "fixed,rr,sel,heft,lsf,heft_reserved")]
        schedulers: String,

        /// Number of requests per scheduler.
        #[arg(short = 'n', long, default_value_t = 100)]
        requests: usize,

        /// Latency objective per request in microseconds (0 = none).
        #[arg(long, default_value_t = 0)]
        slo_us: i64,

        /// Multiplier applied to simulated execution times.
        #[arg(long, default_value_t = 0.1)]
        time_scale: f64,
    },

    /// Print the effective configuration as TOML.
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    commands::init_tracing(cli.verbose);
    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze { model, no_fallback } => {
            commands::analyze::execute(&config, model, no_fallback).await
        }
        Commands::Simulate {
            model,
            scheduler,
            requests,
            slo_us,
            window,
            time_scale,
        } => {
            let opts = commands::Workload {
                requests,
                slo_us,
                time_scale,
            };
            commands::simulate::execute(config, model, scheduler, window, opts).await
        }
        Commands::Compare {
            model,
            schedulers,
            requests,
            slo_us,
            time_scale,
        } => {
            let opts = commands::Workload {
                requests,
                slo_us,
                time_scale,
            };
            commands::compare::execute(config, model, schedulers, opts).await
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}
