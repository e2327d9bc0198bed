// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Unit-subgraph extraction and subgraph preparation.
//!
//! # Algorithm
//!
//! 1. **Support signatures.** For every op, the set of workers able to run
//!    it. An op with an empty signature cannot be placed anywhere.
//! 2. **Minimum size.** For a worker that lacks some ops, runs of
//!    consecutive supported ops shorter than `minimum_subgraph_size` are
//!    not worth a hand-off; the worker is dropped from those signatures
//!    unless that would leave an op with no worker.
//! 3. **Resolution-driven growth.** Starting from the tensors with no
//!    producer, repeatedly take the lowest-index resolvable op and grow a
//!    unit around it with resolvable ops of the same signature, until no
//!    more can join. Units are therefore numbered in topological order,
//!    and ties between independent ops go to the lower op index.
//! 4. **Preparation.** The configured [`PreparationStrategy`] turns units
//!    into subgraph definitions, which are then checked and sorted.
//!
//! Only ordered collections are used, so identical inputs always produce
//! identical unit and subgraph indices.
//!
//! [`PreparationStrategy`]: crate::PreparationStrategy

use crate::strategy::PreparationContext;
use crate::{
    AnalyzerError, ModelSpec, PreparationType, SubgraphConfig, SubgraphDef, WorkerSupport,
};
use model_ir::{graph::Validated, ModelGraph};
use sched_core::{UnitMask, WorkerId, MAX_UNIT_SUBGRAPHS};
use std::collections::{BTreeMap, BTreeSet};

/// Partitions one model for a given set of workers.
pub struct ModelAnalyzer<'a> {
    graph: &'a ModelGraph<Validated>,
    workers: &'a [WorkerSupport],
    config: SubgraphConfig,
    need_fallback_subgraphs: bool,
}

impl<'a> ModelAnalyzer<'a> {
    /// Creates an analyzer.
    ///
    /// When `need_fallback_subgraphs` is `false` the model is prepared as a
    /// single whole-model subgraph per worker, whatever the configured
    /// preparation type.
    pub fn new(
        graph: &'a ModelGraph<Validated>,
        workers: &'a [WorkerSupport],
        config: SubgraphConfig,
        need_fallback_subgraphs: bool,
    ) -> Self {
        Self {
            graph,
            workers,
            config,
            need_fallback_subgraphs,
        }
    }

    /// The preparation actually applied.
    pub fn preparation_type(&self) -> PreparationType {
        if self.need_fallback_subgraphs {
            self.config.preparation
        } else {
            PreparationType::NoFallbackSubgraph
        }
    }

    /// Runs the analysis.
    pub fn create_subgraphs(&self) -> Result<(ModelSpec, Vec<SubgraphDef>), AnalyzerError> {
        self.config.validate()?;
        self.validate_workers()?;

        let preparation = self.preparation_type();
        let spec = match preparation {
            PreparationType::NoFallbackSubgraph => self.whole_model_spec()?,
            _ => self.unit_spec()?,
        };

        let strategy = preparation.create_strategy();
        let ctx = PreparationContext {
            graph: self.graph,
            spec: &spec,
            workers: self.workers,
        };
        let mut defs = strategy.prepare(&ctx)?;
        defs.sort_by_key(|d| {
            (
                d.unit_subgraph_indices.first().copied(),
                d.unit_subgraph_indices.len(),
                d.worker_id,
            )
        });
        defs.dedup();
        check_subgraphs(&spec, &defs, strategy.name())?;

        tracing::info!(
            "analyzed '{}' with {}: {} unit subgraphs, {} subgraphs",
            spec.name,
            strategy.name(),
            spec.num_unit_subgraphs(),
            defs.len(),
        );
        Ok((spec, defs))
    }

    fn validate_workers(&self) -> Result<(), AnalyzerError> {
        if self.workers.is_empty() {
            return Err(AnalyzerError::NoWorkers);
        }
        let mut seen = BTreeSet::new();
        for w in self.workers {
            if !seen.insert(w.worker_id) {
                return Err(AnalyzerError::InvalidWorker {
                    worker: w.worker_id,
                    detail: "duplicate worker id".into(),
                });
            }
            if let Some(&op) = w.unsupported_ops.iter().find(|&&op| op >= self.graph.num_ops()) {
                return Err(AnalyzerError::InvalidWorker {
                    worker: w.worker_id,
                    detail: format!("unsupported op {op} out of range"),
                });
            }
        }
        Ok(())
    }

    // ── Support ────────────────────────────────────────────────────

    fn support_signatures(&self) -> Result<Vec<BTreeSet<WorkerId>>, AnalyzerError> {
        self.graph
            .iter_ops()
            .map(|op| {
                let sig: BTreeSet<WorkerId> = self
                    .workers
                    .iter()
                    .filter(|w| w.supports(op))
                    .map(|w| w.worker_id)
                    .collect();
                if sig.is_empty() {
                    return Err(AnalyzerError::UnsupportedOp {
                        index: op.index,
                        name: op.name.clone(),
                    });
                }
                Ok(sig)
            })
            .collect()
    }

    fn unsupported_ops(&self) -> BTreeMap<WorkerId, BTreeSet<usize>> {
        self.workers
            .iter()
            .map(|w| {
                let ops = self
                    .graph
                    .iter_ops()
                    .filter(|op| !w.supports(op))
                    .map(|op| op.index)
                    .collect();
                (w.worker_id, ops)
            })
            .collect()
    }

    fn apply_minimum_size(&self, sigs: &mut [BTreeSet<WorkerId>]) {
        let min = self.config.minimum_subgraph_size;
        let n = sigs.len();
        for worker in self.workers {
            let w = worker.worker_id;
            if sigs.iter().all(|s| s.contains(&w)) {
                continue;
            }
            let mut i = 0;
            while i < n {
                if !sigs[i].contains(&w) {
                    i += 1;
                    continue;
                }
                let start = i;
                while i < n && sigs[i].contains(&w) {
                    i += 1;
                }
                if i - start < min {
                    tracing::debug!(
                        "{w}: run of {} ops at op {start} below minimum size {min}",
                        i - start,
                    );
                    for sig in &mut sigs[start..i] {
                        if sig.len() > 1 {
                            sig.remove(&w);
                        }
                    }
                }
            }
        }
    }

    // ── Units ──────────────────────────────────────────────────────

    fn extract_units(
        &self,
        sigs: &[BTreeSet<WorkerId>],
    ) -> Result<Vec<BTreeSet<usize>>, AnalyzerError> {
        let graph = self.graph;
        let mut resolved = graph.initially_resolved_tensors();
        let mut remaining: BTreeSet<usize> = (0..graph.num_ops()).collect();
        let mut units: Vec<BTreeSet<usize>> = Vec::new();

        while let Some(seed) = remaining
            .iter()
            .copied()
            .find(|&op| graph.is_op_resolvable(op, &resolved))
        {
            let sig = &sigs[seed];
            let mut unit = BTreeSet::new();
            while let Some(op) = remaining
                .iter()
                .copied()
                .find(|&op| &sigs[op] == sig && graph.is_op_resolvable(op, &resolved))
            {
                remaining.remove(&op);
                unit.insert(op);
                if let Some(def) = graph.op(op) {
                    resolved.extend(def.outputs.iter().copied());
                }
            }
            units.push(unit);
            if units.len() > MAX_UNIT_SUBGRAPHS {
                return Err(AnalyzerError::TooManyUnitSubgraphs {
                    count: units.len(),
                    max: MAX_UNIT_SUBGRAPHS,
                });
            }
        }

        if !remaining.is_empty() {
            return Err(AnalyzerError::Unresolvable {
                remaining: remaining.len(),
            });
        }
        Ok(units)
    }

    fn unit_dependencies(&self, units: &[BTreeSet<usize>]) -> Result<Vec<UnitMask>, AnalyzerError> {
        let mut unit_of = vec![0usize; self.graph.num_ops()];
        for (u, ops) in units.iter().enumerate() {
            for &op in ops {
                unit_of[op] = u;
            }
        }
        units
            .iter()
            .enumerate()
            .map(|(u, ops)| {
                let mut deps = UnitMask::EMPTY;
                for &op in ops {
                    for producer in self.graph.predecessors(op) {
                        let pu = unit_of[producer];
                        if pu != u {
                            deps.insert(pu)?;
                        }
                    }
                }
                Ok(deps)
            })
            .collect()
    }

    fn unit_spec(&self) -> Result<ModelSpec, AnalyzerError> {
        let mut sigs = self.support_signatures()?;
        self.apply_minimum_size(&mut sigs);
        let units = self.extract_units(&sigs)?;
        let deps = self.unit_dependencies(&units)?;
        let unit_workers = units
            .iter()
            .map(|ops| {
                ops.iter()
                    .next()
                    .map(|&op| sigs[op].clone())
                    .unwrap_or_default()
            })
            .collect();
        Ok(self.build_spec(units, deps, unit_workers))
    }

    fn whole_model_spec(&self) -> Result<ModelSpec, AnalyzerError> {
        let sigs = self.support_signatures()?;
        let full: BTreeSet<WorkerId> = self
            .workers
            .iter()
            .map(|w| w.worker_id)
            .filter(|w| sigs.iter().all(|s| s.contains(w)))
            .collect();
        if full.is_empty() {
            return Err(AnalyzerError::NoCoveringWorker {
                model: self.graph.name.clone(),
            });
        }
        let all_ops = (0..self.graph.num_ops()).collect();
        Ok(self.build_spec(vec![all_ops], vec![UnitMask::EMPTY], vec![full]))
    }

    fn build_spec(
        &self,
        units: Vec<BTreeSet<usize>>,
        deps: Vec<UnitMask>,
        unit_workers: Vec<BTreeSet<WorkerId>>,
    ) -> ModelSpec {
        ModelSpec {
            name: self.graph.name.clone(),
            num_ops: self.graph.num_ops(),
            num_tensors: self.graph.num_tensors,
            input_tensors: self.graph.inputs.iter().copied().collect(),
            output_tensors: self.graph.outputs.iter().copied().collect(),
            unit_subgraph_ops: units,
            unit_subgraph_deps: deps,
            unit_subgraph_workers: unit_workers,
            unsupported_ops: self.unsupported_ops(),
        }
    }
}

/// Every subgraph must be a non-empty union of whole units its worker
/// supports, and every unit must appear in some subgraph.
fn check_subgraphs(
    spec: &ModelSpec,
    defs: &[SubgraphDef],
    strategy: &str,
) -> Result<(), AnalyzerError> {
    let fail = |detail: String| AnalyzerError::StrategyFailed {
        strategy: strategy.to_string(),
        detail,
    };
    let mut covered = BTreeSet::new();
    for def in defs {
        if def.unit_subgraph_indices.is_empty() {
            return Err(fail(format!("empty subgraph on {}", def.worker_id)));
        }
        let mut ops = BTreeSet::new();
        for &u in &def.unit_subgraph_indices {
            let unit_ops = spec
                .unit_subgraph_ops
                .get(u)
                .ok_or_else(|| fail(format!("unknown unit subgraph {u}")))?;
            if !spec.unit_subgraph_workers[u].contains(&def.worker_id) {
                return Err(fail(format!("{} cannot run unit {u}", def.worker_id)));
            }
            ops.extend(unit_ops.iter().copied());
            covered.insert(u);
        }
        if ops != def.op_indices {
            return Err(fail(format!("subgraph {def} is not a union of units")));
        }
    }
    if covered.len() != spec.num_unit_subgraphs() {
        return Err(fail(format!(
            "{} of {} unit subgraphs covered",
            covered.len(),
            spec.num_unit_subgraphs()
        )));
    }
    Ok(())
}
