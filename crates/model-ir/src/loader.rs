// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Model loading from a JSON manifest.
//!
//! The loader accepts either a manifest file directly or a model directory
//! containing `model.json` (see [`ModelManifest`]).

use crate::{graph, ModelError, ModelGraph, ModelManifest, OpDef, OpType};
use std::path::Path;

/// Default manifest filename inside a model directory.
const MANIFEST_FILE: &str = "model.json";

/// Loads a model from disk into a validated [`ModelGraph`].
///
/// # Example
/// ```no_run
/// use model_ir::ModelLoader;
/// use std::path::Path;
///
/// let graph = ModelLoader::load(Path::new("./models/mobilenet")).unwrap();
/// println!("Loaded {} ops", graph.num_ops());
/// ```
pub struct ModelLoader;

impl ModelLoader {
    /// Loads and validates a model from a manifest file or model directory.
    pub fn load(path: &Path) -> Result<ModelGraph<graph::Validated>, ModelError> {
        let manifest_path = if path.is_dir() {
            path.join(MANIFEST_FILE)
        } else {
            path.to_path_buf()
        };
        let manifest = ModelManifest::from_file(&manifest_path)?;
        let graph = Self::from_manifest(&manifest)?;
        tracing::info!("{}", graph.summary());
        Ok(graph)
    }

    /// Parses a manifest from JSON and builds a validated graph.
    pub fn from_json(json: &str) -> Result<ModelGraph<graph::Validated>, ModelError> {
        let manifest = ModelManifest::from_json(json)?;
        Self::from_manifest(&manifest)
    }

    /// Builds a validated graph from an already parsed manifest.
    pub fn from_manifest(
        manifest: &ModelManifest,
    ) -> Result<ModelGraph<graph::Validated>, ModelError> {
        manifest.validate()?;
        let ops = Self::build_ops(manifest)?;
        let graph = ModelGraph::new(
            manifest.name.clone(),
            manifest.tensor_count(),
            manifest.inputs.clone(),
            manifest.outputs.clone(),
            ops,
        );
        graph.validate()
    }

    fn build_ops(manifest: &ModelManifest) -> Result<Vec<OpDef>, ModelError> {
        manifest
            .ops
            .iter()
            .enumerate()
            .map(|(index, mo)| {
                let op_type =
                    OpType::from_str_loose(&mo.op_type).ok_or_else(|| ModelError::InvalidOp {
                        op: mo.name.clone(),
                        detail: format!("unrecognised op type '{}'", mo.op_type),
                    })?;
                Ok(OpDef {
                    name: mo.name.clone(),
                    op_type,
                    index,
                    inputs: mo.inputs.clone(),
                    outputs: mo.outputs.clone(),
                })
            })
            .collect()
    }
}
