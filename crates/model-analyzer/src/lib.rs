// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # model-analyzer
//!
//! Partitions a validated `ModelGraph` into unit subgraphs and
//! worker-assignable subgraphs using pluggable preparation strategies.
//!
//! # Strategies
//!
//! | Strategy | Subgraphs | Dispatches per job | Scheduler freedom |
//! |---|---|---|---|
//! | [`NoFallbackSubgraph`] | one per fully supporting worker | 1 | Lowest |
//! | [`FallbackPerWorker`] | one chain per worker | few | Low |
//! | [`UnitSubgraph`] | one per (unit, worker) | one per unit | High |
//! | [`MergeUnitSubgraph`] | units + contiguous merges | 1..units | Highest |
//!
//! # Trait-Based Extensibility
//!
//! All strategies implement [`PreparationStrategy`]:
//!
//! ```ignore
//! struct MyStrategy;
//! impl PreparationStrategy for MyStrategy {
//!     fn name(&self) -> &str { "custom" }
//!     fn prepare(&self, ctx: &PreparationContext<'_>)
//!         -> Result<Vec<SubgraphDef>, AnalyzerError> { /* ... */ }
//! }
//! ```
//!
//! # Example
//! ```no_run
//! use model_analyzer::{ModelAnalyzer, SubgraphConfig, WorkerSupport};
//! use model_ir::ModelLoader;
//! use sched_core::{DeviceFlag, WorkerId};
//! use std::path::Path;
//!
//! let graph = ModelLoader::load(Path::new("./model")).unwrap();
//! let workers = vec![
//!     WorkerSupport::new(WorkerId(0), DeviceFlag::Cpu),
//!     WorkerSupport::new(WorkerId(1), DeviceFlag::Gpu),
//! ];
//! let analyzer = ModelAnalyzer::new(&graph, &workers, SubgraphConfig::default(), true);
//! let (spec, subgraphs) = analyzer.create_subgraphs().unwrap();
//! println!("{}", spec.summary());
//! ```

mod analyzer;
mod config;
mod error;
mod spec;
pub mod strategy;
mod support;

pub use analyzer::ModelAnalyzer;
pub use config::{PreparationType, SubgraphConfig};
pub use error::AnalyzerError;
pub use spec::{set_to_string, summarize_subgraphs, ModelSpec, SubgraphDef};
pub use strategy::{
    FallbackPerWorker, MergeUnitSubgraph, NoFallbackSubgraph, PreparationContext,
    PreparationStrategy, UnitSubgraph,
};
pub use support::WorkerSupport;
