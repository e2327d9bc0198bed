// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Subgraph preparation settings.

use crate::strategy::{
    FallbackPerWorker, MergeUnitSubgraph, NoFallbackSubgraph, PreparationStrategy, UnitSubgraph,
};
use crate::AnalyzerError;

/// How subgraphs are derived from a model.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PreparationType {
    /// One whole-model subgraph per fully supporting worker.
    NoFallbackSubgraph,
    /// Per worker, maximal runs of supported units plus fallback runs elsewhere.
    FallbackPerWorker,
    /// Every unit subgraph on every worker supporting it.
    UnitSubgraph,
    /// Unit subgraphs plus every contiguous merge of them per worker.
    #[default]
    MergeUnitSubgraph,
}

impl PreparationType {
    /// Parses a preparation type, accepting kebab-case and snake_case.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "no_fallback_subgraph" | "no_fallback" => Some(Self::NoFallbackSubgraph),
            "fallback_per_worker" => Some(Self::FallbackPerWorker),
            "unit_subgraph" | "unit" => Some(Self::UnitSubgraph),
            "merge_unit_subgraph" | "merge" => Some(Self::MergeUnitSubgraph),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoFallbackSubgraph => "no_fallback_subgraph",
            Self::FallbackPerWorker => "fallback_per_worker",
            Self::UnitSubgraph => "unit_subgraph",
            Self::MergeUnitSubgraph => "merge_unit_subgraph",
        }
    }

    /// Instantiates the strategy implementing this preparation type.
    pub fn create_strategy(self) -> Box<dyn PreparationStrategy> {
        match self {
            Self::NoFallbackSubgraph => Box::new(NoFallbackSubgraph),
            Self::FallbackPerWorker => Box::new(FallbackPerWorker),
            Self::UnitSubgraph => Box::new(UnitSubgraph),
            Self::MergeUnitSubgraph => Box::new(MergeUnitSubgraph),
        }
    }
}

impl std::fmt::Display for PreparationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_minimum_subgraph_size() -> usize {
    7
}

/// Settings for the analyzer.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SubgraphConfig {
    /// Supported runs shorter than this are not offloaded to a partial worker.
    #[serde(default = "default_minimum_subgraph_size")]
    pub minimum_subgraph_size: usize,
    #[serde(default)]
    pub preparation: PreparationType,
}

impl Default for SubgraphConfig {
    fn default() -> Self {
        Self {
            minimum_subgraph_size: default_minimum_subgraph_size(),
            preparation: PreparationType::default(),
        }
    }
}

impl SubgraphConfig {
    pub fn validate(&self) -> Result<(), AnalyzerError> {
        if self.minimum_subgraph_size == 0 {
            return Err(AnalyzerError::ConfigError(
                "minimum_subgraph_size must be > 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = SubgraphConfig::default();
        assert_eq!(c.minimum_subgraph_size, 7);
        assert_eq!(c.preparation, PreparationType::MergeUnitSubgraph);
        c.validate().unwrap();
    }

    #[test]
    fn test_zero_minimum_size_rejected() {
        let c = SubgraphConfig {
            minimum_subgraph_size: 0,
            ..Default::default()
        };
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_from_str_loose() {
        assert_eq!(
            PreparationType::from_str_loose("fallback-per-worker"),
            Some(PreparationType::FallbackPerWorker)
        );
        assert_eq!(
            PreparationType::from_str_loose("merge"),
            Some(PreparationType::MergeUnitSubgraph)
        );
        assert_eq!(PreparationType::from_str_loose("bogus"), None);
    }

    #[test]
    fn test_create_strategy_names() {
        for ty in [
            PreparationType::NoFallbackSubgraph,
            PreparationType::FallbackPerWorker,
            PreparationType::UnitSubgraph,
            PreparationType::MergeUnitSubgraph,
        ] {
            assert_eq!(ty.create_strategy().name(), ty.as_str());
        }
    }

    #[test]
    fn test_deserialize_partial() {
        let c: SubgraphConfig = serde_json::from_str(r#"{ "preparation": "unit_subgraph" }"#).unwrap();
        assert_eq!(c.minimum_subgraph_size, 7);
        assert_eq!(c.preparation, PreparationType::UnitSubgraph);
    }
}
