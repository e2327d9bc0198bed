// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # model-ir
//!
//! A lightweight operator-level intermediate representation (IR) of an
//! inference model, sufficient for partitioning it into subgraphs.
//!
//! Backends keep their own tensor and kernel representations; this crate only
//! captures the structure the scheduler needs:
//!
//! - [`OpType`]: the kind of computation an operator performs.
//! - [`OpDef`]: one operator and the tensor indices it reads and writes.
//! - [`ModelGraph`]: the full model as a DAG of operators over tensors,
//!   with a **type-state pattern** (`Loaded` → `Validated`).
//! - [`ModelLoader`]: loads a graph from a JSON manifest.
//! - [`ModelManifest`]: the JSON model descriptor.
//!
//! # Example
//! ```no_run
//! use model_ir::ModelLoader;
//! use std::path::Path;
//!
//! let graph = ModelLoader::load(Path::new("./models/mobilenet.json")).unwrap();
//! println!("{}", graph.summary());
//! for op in graph.iter_ops() {
//!     println!("  {}", op.summary());
//! }
//! ```

mod error;
pub mod graph;
mod loader;
pub(crate) mod manifest;
mod op;

pub use error::ModelError;
pub use graph::ModelGraph;
pub use loader::ModelLoader;
pub use manifest::{ManifestOp, ModelManifest};
pub use op::{OpDef, OpType};
