// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-subgraph latency estimates.

use model_ir::OpType;
use sched_core::SubgraphKey;
use std::collections::BTreeMap;

/// Nominal cost of one op on a speed-1.0 worker, in microseconds.
pub fn op_cost_us(op_type: &OpType) -> f64 {
    match op_type {
        OpType::Conv2d => 400.0,
        OpType::DepthwiseConv2d => 150.0,
        OpType::FullyConnected => 200.0,
        OpType::Add | OpType::Mul => 20.0,
        OpType::Concatenation => 30.0,
        OpType::Reshape => 5.0,
        OpType::Softmax => 40.0,
        OpType::AveragePool2d | OpType::MaxPool2d => 30.0,
        OpType::Relu => 10.0,
        OpType::Custom(_) => 100.0,
    }
}

/// Exponential moving average of measured latency per subgraph.
///
/// `estimate = smoothing * measured + (1 - smoothing) * estimate`. The
/// first measurement of an unseeded key is taken as is.
#[derive(Debug, Clone)]
pub struct LatencyEstimator {
    smoothing_factor: f32,
    expected: BTreeMap<SubgraphKey, i64>,
}

impl LatencyEstimator {
    pub fn new(smoothing_factor: f32) -> Self {
        Self {
            smoothing_factor: smoothing_factor.clamp(0.0, 1.0),
            expected: BTreeMap::new(),
        }
    }

    /// Sets the prior for `key`.
    pub fn seed(&mut self, key: SubgraphKey, latency_us: i64) {
        self.expected.insert(key, latency_us);
    }

    /// Folds a measurement into the estimate and returns the new value.
    pub fn update(&mut self, key: SubgraphKey, measured_us: i64) -> i64 {
        let alpha = self.smoothing_factor as f64;
        let next = match self.expected.get(&key) {
            Some(&prev) => (alpha * measured_us as f64 + (1.0 - alpha) * prev as f64).round() as i64,
            None => measured_us,
        };
        self.expected.insert(key, next);
        next
    }

    pub fn get(&self, key: &SubgraphKey) -> Option<i64> {
        self.expected.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.expected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expected.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sched_core::{ModelId, UnitMask, WorkerId};

    fn key() -> SubgraphKey {
        SubgraphKey::new(ModelId(0), WorkerId(0), UnitMask::from_bits(1))
    }

    #[test]
    fn test_first_measurement_taken_as_is() {
        let mut est = LatencyEstimator::new(0.1);
        assert!(est.is_empty());
        assert_eq!(est.update(key(), 500), 500);
        assert_eq!(est.get(&key()), Some(500));
    }

    #[test]
    fn test_moving_average() {
        let mut est = LatencyEstimator::new(0.1);
        est.seed(key(), 1_000);
        assert_eq!(est.update(key(), 2_000), 1_100);
        assert_eq!(est.update(key(), 1_100), 1_100);
        assert_eq!(est.len(), 1);
    }

    #[test]
    fn test_smoothing_bounds() {
        let mut frozen = LatencyEstimator::new(0.0);
        frozen.seed(key(), 300);
        assert_eq!(frozen.update(key(), 900), 300);

        let mut latest = LatencyEstimator::new(5.0);
        latest.seed(key(), 300);
        assert_eq!(latest.update(key(), 900), 900);
    }

    #[test]
    fn test_op_costs_positive() {
        assert!(op_cost_us(&OpType::Conv2d) > op_cost_us(&OpType::Relu));
        assert!(op_cost_us(&OpType::Custom("nms".into())) > 0.0);
    }
}
