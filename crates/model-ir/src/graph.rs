// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Model graph: operators connected through tensors.
//!
//! # Type-State Pattern
//!
//! ```text
//! ModelGraph<Loaded>       ops parsed, not yet checked.
//!       │  .validate()
//!       ▼
//! ModelGraph<Validated>    tensor references checked, producers indexed,
//!                          acyclicity proven; ready for partitioning.
//! ```
//!
//! The model analyzer only accepts `ModelGraph<Validated>`, so it never has
//! to handle dangling tensor ids or cycles in its own resolution loop.

use crate::{ModelError, OpDef};
use std::collections::{BTreeSet, VecDeque};
use std::fmt;

// ── Type-state markers ─────────────────────────────────────────────

/// Marker: graph has been loaded but not validated.
#[derive(Debug, Clone)]
pub struct Loaded;

/// Marker: graph has been validated and is ready for partitioning.
#[derive(Debug, Clone)]
pub struct Validated;

/// Sealed trait for graph states.
pub trait GraphState: fmt::Debug + Clone {}
impl GraphState for Loaded {}
impl GraphState for Validated {}

// ── ModelGraph ─────────────────────────────────────────────────────

/// A model as a directed acyclic graph of operators over tensors.
///
/// Tensors are identified by index in `0..num_tensors`. A tensor with no
/// producing op (a model input or a constant) is available from the start.
#[derive(Debug, Clone)]
pub struct ModelGraph<S: GraphState = Loaded> {
    /// Human-readable model name.
    pub name: String,
    /// Number of tensors referenced by the graph.
    pub num_tensors: usize,
    /// Tensor indices fed by the caller.
    pub inputs: Vec<usize>,
    /// Tensor indices returned to the caller.
    pub outputs: Vec<usize>,
    /// Operators in their original order.
    pub ops: Vec<OpDef>,
    /// `producers[t]` is the op writing tensor `t` (filled by validation).
    producers: Vec<Option<usize>>,
    _state: std::marker::PhantomData<S>,
}

// ── Loaded state ───────────────────────────────────────────────────

impl ModelGraph<Loaded> {
    /// Creates a new graph in the `Loaded` state.
    pub fn new(
        name: String,
        num_tensors: usize,
        inputs: Vec<usize>,
        outputs: Vec<usize>,
        ops: Vec<OpDef>,
    ) -> Self {
        Self {
            name,
            num_tensors,
            inputs,
            outputs,
            ops,
            producers: Vec::new(),
            _state: std::marker::PhantomData,
        }
    }

    /// Validates the graph and transitions to the `Validated` state.
    ///
    /// # Checks
    /// - The graph has at least one op.
    /// - Op indices are consecutive starting from 0.
    /// - Every referenced tensor index is in range.
    /// - Each tensor has at most one producer, and model inputs have none.
    /// - The op dependency graph is acyclic.
    pub fn validate(self) -> Result<ModelGraph<Validated>, ModelError> {
        if self.ops.is_empty() {
            return Err(ModelError::InvalidGraph("model graph contains no ops".into()));
        }

        for (i, op) in self.ops.iter().enumerate() {
            if op.index != i {
                return Err(ModelError::InvalidOp {
                    op: op.name.clone(),
                    detail: format!("expected index {i}, got {}", op.index),
                });
            }
        }

        let in_range = |t: usize| t < self.num_tensors;
        for &t in self.inputs.iter().chain(self.outputs.iter()) {
            if !in_range(t) {
                return Err(ModelError::InvalidGraph(format!(
                    "model tensor {t} out of range (num_tensors = {})",
                    self.num_tensors,
                )));
            }
        }

        let mut producers: Vec<Option<usize>> = vec![None; self.num_tensors];
        for op in &self.ops {
            for &t in op.inputs.iter().chain(op.outputs.iter()) {
                if !in_range(t) {
                    return Err(ModelError::InvalidOp {
                        op: op.name.clone(),
                        detail: format!("tensor {t} out of range"),
                    });
                }
            }
            for &t in &op.outputs {
                if let Some(other) = producers[t] {
                    return Err(ModelError::InvalidOp {
                        op: op.name.clone(),
                        detail: format!("tensor {t} already produced by op {other}"),
                    });
                }
                producers[t] = Some(op.index);
            }
        }

        for &t in &self.inputs {
            if let Some(op) = producers[t] {
                return Err(ModelError::InvalidGraph(format!(
                    "model input tensor {t} is produced by op {op}"
                )));
            }
        }

        for op in &self.ops {
            if op.outputs.is_empty() {
                tracing::warn!("op '{}' produces no tensors", op.name);
            }
        }

        let graph = ModelGraph {
            name: self.name,
            num_tensors: self.num_tensors,
            inputs: self.inputs,
            outputs: self.outputs,
            ops: self.ops,
            producers,
            _state: std::marker::PhantomData,
        };

        // Kahn's algorithm: every op must eventually become ready.
        let order = graph.topological_order();
        if order.len() != graph.ops.len() {
            return Err(ModelError::CyclicGraph {
                remaining: graph.ops.len() - order.len(),
            });
        }

        Ok(graph)
    }
}

// ── Validated state ────────────────────────────────────────────────

impl ModelGraph<Validated> {
    /// Returns the number of ops.
    pub fn num_ops(&self) -> usize {
        self.ops.len()
    }

    /// Returns an iterator over the ops in original order.
    pub fn iter_ops(&self) -> impl Iterator<Item = &OpDef> {
        self.ops.iter()
    }

    /// Returns an op by index.
    pub fn op(&self, index: usize) -> Option<&OpDef> {
        self.ops.get(index)
    }

    /// Returns the op producing `tensor`, if any.
    pub fn producer(&self, tensor: usize) -> Option<usize> {
        self.producers.get(tensor).copied().flatten()
    }

    /// Ops that read `tensor`, in index order.
    pub fn consumers(&self, tensor: usize) -> Vec<usize> {
        self.ops
            .iter()
            .filter(|op| op.inputs.contains(&tensor))
            .map(|op| op.index)
            .collect()
    }

    /// Tensors available before any op runs: model inputs and constants.
    pub fn initially_resolved_tensors(&self) -> BTreeSet<usize> {
        (0..self.num_tensors)
            .filter(|&t| self.producers[t].is_none())
            .collect()
    }

    /// Returns `true` if every input tensor of `op` is in `resolved`.
    pub fn is_op_resolvable(&self, op: usize, resolved: &BTreeSet<usize>) -> bool {
        self.ops
            .get(op)
            .map(|o| o.inputs.iter().all(|t| resolved.contains(t)))
            .unwrap_or(false)
    }

    /// Ops whose inputs include a tensor produced by `op`.
    pub fn successors(&self, op: usize) -> BTreeSet<usize> {
        let mut out = BTreeSet::new();
        if let Some(o) = self.ops.get(op) {
            for &t in &o.outputs {
                out.extend(self.consumers(t));
            }
        }
        out
    }

    /// Ops producing an input of `op`.
    pub fn predecessors(&self, op: usize) -> BTreeSet<usize> {
        self.ops
            .get(op)
            .map(|o| o.inputs.iter().filter_map(|&t| self.producer(t)).collect())
            .unwrap_or_default()
    }

    /// Returns a summary string describing the model.
    pub fn summary(&self) -> String {
        format!(
            "Model '{}': {} ops, {} tensors, {} inputs, {} outputs",
            self.name,
            self.num_ops(),
            self.num_tensors,
            self.inputs.len(),
            self.outputs.len(),
        )
    }

    /// Topological order of ops; ties resolved by lowest op index.
    ///
    /// Shorter than `num_ops()` only if the graph has a cycle, which
    /// validation already rules out.
    pub fn topological_order(&self) -> Vec<usize> {
        let n = self.ops.len();
        let mut indegree = vec![0usize; n];
        for op in &self.ops {
            indegree[op.index] = self.predecessors(op.index).len();
        }
        let mut ready: VecDeque<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);
        while let Some(i) = ready.pop_front() {
            order.push(i);
            let mut unlocked = Vec::new();
            for s in self.successors(i) {
                indegree[s] -= 1;
                if indegree[s] == 0 {
                    unlocked.push(s);
                }
            }
            ready.extend(unlocked);
            ready.make_contiguous().sort_unstable();
        }
        order
    }
}

// ── Shared implementations ─────────────────────────────────────────

impl<S: GraphState> fmt::Display for ModelGraph<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ModelGraph '{}' ({} ops):", self.name, self.ops.len())?;
        for op in &self.ops {
            writeln!(f, "  {}", op.summary())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OpType;

    fn op(index: usize, inputs: &[usize], outputs: &[usize]) -> OpDef {
        OpDef {
            name: format!("op.{index}"),
            op_type: OpType::Conv2d,
            index,
            inputs: inputs.to_vec(),
            outputs: outputs.to_vec(),
        }
    }

    /// t0 -> op0 -> t1 -> op1 -> t2 -> op2 -> t3
    fn chain(n: usize) -> ModelGraph<Loaded> {
        let ops = (0..n).map(|i| op(i, &[i], &[i + 1])).collect();
        ModelGraph::new("chain".into(), n + 1, vec![0], vec![n], ops)
    }

    #[test]
    fn test_validate_ok() {
        let g = chain(3).validate().unwrap();
        assert_eq!(g.num_ops(), 3);
        assert_eq!(g.producer(2), Some(1));
        assert_eq!(g.producer(0), None);
    }

    #[test]
    fn test_validate_empty() {
        let g = ModelGraph::new("empty".into(), 0, vec![], vec![], vec![]);
        assert!(g.validate().is_err());
    }

    #[test]
    fn test_validate_bad_index() {
        let mut g = chain(3);
        g.ops[1].index = 7;
        assert!(matches!(g.validate(), Err(ModelError::InvalidOp { .. })));
    }

    #[test]
    fn test_validate_tensor_out_of_range() {
        let mut g = chain(2);
        g.ops[0].outputs = vec![42];
        assert!(g.validate().is_err());
    }

    #[test]
    fn test_validate_double_producer() {
        let ops = vec![op(0, &[0], &[1]), op(1, &[0], &[1])];
        let g = ModelGraph::new("dup".into(), 2, vec![0], vec![1], ops);
        assert!(g.validate().is_err());
    }

    #[test]
    fn test_validate_cycle() {
        // op0 reads t2 (written by op1), op1 reads t1 (written by op0).
        let ops = vec![op(0, &[0, 2], &[1]), op(1, &[1], &[2])];
        let g = ModelGraph::new("cycle".into(), 3, vec![0], vec![2], ops);
        assert!(matches!(
            g.validate(),
            Err(ModelError::CyclicGraph { remaining: 2 })
        ));
    }

    #[test]
    fn test_initially_resolved_includes_constants() {
        // t0 input, t1 constant weight, op0(t0, t1) -> t2
        let ops = vec![op(0, &[0, 1], &[2])];
        let g = ModelGraph::new("const".into(), 3, vec![0], vec![2], ops)
            .validate()
            .unwrap();
        let resolved = g.initially_resolved_tensors();
        assert!(resolved.contains(&0));
        assert!(resolved.contains(&1));
        assert!(!resolved.contains(&2));
        assert!(g.is_op_resolvable(0, &resolved));
    }

    #[test]
    fn test_topological_order_diamond() {
        // op0 -> {op1, op2} -> op3
        let ops = vec![
            op(0, &[0], &[1]),
            op(1, &[1], &[2]),
            op(2, &[1], &[3]),
            op(3, &[2, 3], &[4]),
        ];
        let g = ModelGraph::new("diamond".into(), 5, vec![0], vec![4], ops)
            .validate()
            .unwrap();
        assert_eq!(g.topological_order(), vec![0, 1, 2, 3]);
        assert_eq!(g.successors(0), BTreeSet::from([1, 2]));
        assert_eq!(g.predecessors(3), BTreeSet::from([1, 2]));
    }

    #[test]
    fn test_summary_and_display() {
        let g = chain(2).validate().unwrap();
        assert!(g.summary().contains("2 ops"));
        let display = format!("{g}");
        assert!(display.contains("op.0"));
        assert!(display.contains("op.1"));
    }
}
