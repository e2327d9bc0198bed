// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! JSON model manifest parsing.
//!
//! The manifest (`model.json`) lists the model's operators and the tensor
//! indices they connect.
//!
//! # Format
//! ```json
//! {
//!   "name": "mobilenet-v1",
//!   "num_tensors": 4,
//!   "inputs": [0],
//!   "outputs": [3],
//!   "ops": [
//!     { "name": "conv0", "op_type": "conv2d", "inputs": [0], "outputs": [1] },
//!     { "name": "relu0", "op_type": "relu",   "inputs": [1], "outputs": [2] },
//!     { "name": "fc",    "op_type": "fc",     "inputs": [2], "outputs": [3] }
//!   ]
//! }
//! ```

use crate::{ModelError, OpType};
use std::collections::HashSet;
use std::path::Path;

/// Top-level model manifest, deserialized from `model.json`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ModelManifest {
    /// Human-readable model name.
    pub name: String,
    /// Number of tensors. Derived from the op list when omitted.
    #[serde(default)]
    pub num_tensors: Option<usize>,
    /// Tensor indices fed by the caller.
    #[serde(default)]
    pub inputs: Vec<usize>,
    /// Tensor indices returned to the caller.
    #[serde(default)]
    pub outputs: Vec<usize>,
    /// Operators in execution order.
    pub ops: Vec<ManifestOp>,
}

/// A single operator entry in the manifest.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ManifestOp {
    /// Operator name; must be unique within the manifest.
    pub name: String,
    /// Operator type string (e.g., `"conv2d"`, `"custom:nms"`).
    pub op_type: String,
    /// Tensor indices read by the op.
    #[serde(default)]
    pub inputs: Vec<usize>,
    /// Tensor indices written by the op.
    #[serde(default)]
    pub outputs: Vec<usize>,
}

impl ModelManifest {
    /// Loads a manifest from a JSON file path.
    pub fn from_file(path: &Path) -> Result<Self, ModelError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parses a manifest from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let manifest: Self = serde_json::from_str(json)?;
        Ok(manifest)
    }

    /// Validates that the manifest is internally consistent.
    ///
    /// Checks:
    /// - At least one op is defined.
    /// - All op type strings are recognised.
    /// - No duplicate op names.
    /// - An explicit `num_tensors` covers every referenced index.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.ops.is_empty() {
            return Err(ModelError::InvalidGraph("manifest contains no ops".into()));
        }

        let mut seen_names = HashSet::new();
        for op in &self.ops {
            if !seen_names.insert(&op.name) {
                return Err(ModelError::InvalidOp {
                    op: op.name.clone(),
                    detail: "duplicate op name".into(),
                });
            }
            if OpType::from_str_loose(&op.op_type).is_none() {
                return Err(ModelError::InvalidOp {
                    op: op.name.clone(),
                    detail: format!("unrecognised op type '{}'", op.op_type),
                });
            }
        }

        if let Some(declared) = self.num_tensors {
            let needed = self.referenced_tensor_count();
            if needed > declared {
                return Err(ModelError::InvalidGraph(format!(
                    "manifest declares {declared} tensors but references {needed}"
                )));
            }
        }

        Ok(())
    }

    /// One past the highest tensor index referenced anywhere.
    pub fn referenced_tensor_count(&self) -> usize {
        self.ops
            .iter()
            .flat_map(|op| op.inputs.iter().chain(op.outputs.iter()))
            .chain(self.inputs.iter())
            .chain(self.outputs.iter())
            .map(|&t| t + 1)
            .max()
            .unwrap_or(0)
    }

    /// Declared tensor count, or the referenced count when undeclared.
    pub fn tensor_count(&self) -> usize {
        self.num_tensors
            .unwrap_or_else(|| self.referenced_tensor_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_manifest_json() -> &'static str {
        r#"{
            "name": "tiny-cnn",
            "num_tensors": 5,
            "inputs": [0],
            "outputs": [4],
            "ops": [
                { "name": "conv0", "op_type": "conv2d", "inputs": [0], "outputs": [1] },
                { "name": "relu0", "op_type": "relu", "inputs": [1], "outputs": [2] },
                { "name": "pool0", "op_type": "maxpool", "inputs": [2], "outputs": [3] },
                { "name": "fc", "op_type": "fc", "inputs": [3], "outputs": [4] }
            ]
        }"#
    }

    #[test]
    fn test_parse_manifest() {
        let m = ModelManifest::from_json(sample_manifest_json()).unwrap();
        assert_eq!(m.name, "tiny-cnn");
        assert_eq!(m.ops.len(), 4);
        assert_eq!(m.inputs, vec![0]);
        assert_eq!(m.tensor_count(), 5);
    }

    #[test]
    fn test_validate_ok() {
        let m = ModelManifest::from_json(sample_manifest_json()).unwrap();
        m.validate().unwrap();
    }

    #[test]
    fn test_validate_empty_ops() {
        let m = ModelManifest::from_json(r#"{ "name": "empty", "ops": [] }"#).unwrap();
        assert!(m.validate().is_err());
    }

    #[test]
    fn test_validate_bad_op_type() {
        let json = r#"{
            "name": "bad",
            "ops": [{ "name": "x", "op_type": "bogus", "inputs": [0], "outputs": [1] }]
        }"#;
        let m = ModelManifest::from_json(json).unwrap();
        assert!(m.validate().is_err());
    }

    #[test]
    fn test_validate_duplicate_names() {
        let json = r#"{
            "name": "dup",
            "ops": [
                { "name": "a", "op_type": "add", "inputs": [0], "outputs": [1] },
                { "name": "a", "op_type": "add", "inputs": [1], "outputs": [2] }
            ]
        }"#;
        let m = ModelManifest::from_json(json).unwrap();
        assert!(m.validate().is_err());
    }

    #[test]
    fn test_validate_too_few_tensors() {
        let json = r#"{
            "name": "short",
            "num_tensors": 2,
            "ops": [{ "name": "a", "op_type": "add", "inputs": [0], "outputs": [5] }]
        }"#;
        let m = ModelManifest::from_json(json).unwrap();
        assert!(m.validate().is_err());
    }

    #[test]
    fn test_derived_tensor_count() {
        let json = r#"{
            "name": "derived",
            "ops": [{ "name": "a", "op_type": "add", "inputs": [0, 3], "outputs": [7] }]
        }"#;
        let m = ModelManifest::from_json(json).unwrap();
        assert_eq!(m.num_tensors, None);
        assert_eq!(m.tensor_count(), 8);
    }
}
