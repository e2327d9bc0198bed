// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Operator definitions for the model IR.
//!
//! Each [`OpDef`] describes one node of the model graph: its type and the
//! tensor indices it consumes and produces. Tensor data is **not** stored
//! here; backends own the actual buffers.

/// The type of computation an operator performs.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum OpType {
    Conv2d,
    DepthwiseConv2d,
    FullyConnected,
    Add,
    Mul,
    Concatenation,
    Reshape,
    Softmax,
    AveragePool2d,
    MaxPool2d,
    Relu,
    /// A backend-specific operator, identified by name.
    Custom(String),
}

impl OpType {
    /// Parses an op type from a manifest string.
    ///
    /// Accepts snake_case (`"depthwise_conv_2d"`) and common aliases
    /// (`"conv"`, `"fc"`, `"dense"`, `"concat"`). Strings of the form
    /// `"custom:<name>"` become [`OpType::Custom`].
    pub fn from_str_loose(s: &str) -> Option<Self> {
        let lower = s.to_lowercase();
        if let Some(name) = lower.strip_prefix("custom:") {
            if name.is_empty() {
                return None;
            }
            return Some(Self::Custom(name.to_string()));
        }
        match lower.as_str() {
            "conv2d" | "conv_2d" | "conv" => Some(Self::Conv2d),
            "depthwise_conv2d" | "depthwise_conv_2d" | "dwconv" => Some(Self::DepthwiseConv2d),
            "fully_connected" | "fc" | "dense" | "linear" => Some(Self::FullyConnected),
            "add" => Some(Self::Add),
            "mul" => Some(Self::Mul),
            "concatenation" | "concat" => Some(Self::Concatenation),
            "reshape" => Some(Self::Reshape),
            "softmax" => Some(Self::Softmax),
            "average_pool2d" | "average_pool_2d" | "avgpool" => Some(Self::AveragePool2d),
            "max_pool2d" | "max_pool_2d" | "maxpool" => Some(Self::MaxPool2d),
            "relu" => Some(Self::Relu),
            _ => None,
        }
    }

    /// Returns a human-readable label.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Conv2d => "conv2d",
            Self::DepthwiseConv2d => "depthwise_conv2d",
            Self::FullyConnected => "fully_connected",
            Self::Add => "add",
            Self::Mul => "mul",
            Self::Concatenation => "concatenation",
            Self::Reshape => "reshape",
            Self::Softmax => "softmax",
            Self::AveragePool2d => "average_pool2d",
            Self::MaxPool2d => "max_pool2d",
            Self::Relu => "relu",
            Self::Custom(name) => name,
        }
    }
}

impl std::fmt::Display for OpType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single operator in the model graph.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct OpDef {
    /// Operator name (e.g., `"block_3/expand_conv"`).
    pub name: String,
    /// The computation this operator performs.
    pub op_type: OpType,
    /// Position in the original op list (0-based).
    pub index: usize,
    /// Tensor indices read by this operator.
    pub inputs: Vec<usize>,
    /// Tensor indices written by this operator.
    pub outputs: Vec<usize>,
}

impl OpDef {
    /// Returns a concise summary string for display.
    pub fn summary(&self) -> String {
        format!(
            "[{}] {} ({}): inputs {:?}, outputs {:?}",
            self.index, self.name, self.op_type, self.inputs, self.outputs,
        )
    }
}
