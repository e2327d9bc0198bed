// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Scheduler configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! [planner]
//! schedule_window_size = 4
//! schedulers = ["heft_reserved"]
//! log_path = "/tmp/jobs.jsonl"
//!
//! [subgraph]
//! minimum_subgraph_size = 7
//! preparation = "merge_unit_subgraph"
//!
//! [profile]
//! smoothing_factor = 0.1
//!
//! [[workers]]
//! device = "cpu"
//!
//! [[workers]]
//! device = "npu"
//! speed = 4.0
//! unsupported_op_types = ["softmax"]
//! ```

use crate::scheduler::{
    FixedWorker, FixedWorkerGlobalQueue, HeterogeneousEarliestFinishTime, LeastSlackTimeFirst,
    RoundRobin, Scheduler, ShortestExpectedLatency,
};
use crate::PlannerError;
use model_analyzer::{SubgraphConfig, WorkerSupport};
use model_ir::OpType;
use sched_core::{DeviceFlag, WorkerId, WorkerType};
use std::path::{Path, PathBuf};

/// Scheduling policy names accepted in `[planner].schedulers`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerType {
    FixedWorker,
    RoundRobin,
    ShortestExpectedLatency,
    FixedWorkerGlobalQueue,
    HeterogeneousEarliestFinishTime,
    LeastSlackTimeFirst,
    HeterogeneousEarliestFinishTimeReserved,
}

impl SchedulerType {
    /// Every scheduler type, in declaration order.
    pub const ALL: [SchedulerType; 7] = [
        Self::FixedWorker,
        Self::RoundRobin,
        Self::ShortestExpectedLatency,
        Self::FixedWorkerGlobalQueue,
        Self::HeterogeneousEarliestFinishTime,
        Self::LeastSlackTimeFirst,
        Self::HeterogeneousEarliestFinishTimeReserved,
    ];

    /// Parses a scheduler name, accepting abbreviations and kebab-case.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "fixed_worker" | "fixed" => Some(Self::FixedWorker),
            "round_robin" | "rr" => Some(Self::RoundRobin),
            "shortest_expected_latency" | "sel" => Some(Self::ShortestExpectedLatency),
            "fixed_worker_global_queue" => Some(Self::FixedWorkerGlobalQueue),
            "heterogeneous_earliest_finish_time" | "heft" => {
                Some(Self::HeterogeneousEarliestFinishTime)
            }
            "least_slack_time_first" | "lst" | "lsf" => Some(Self::LeastSlackTimeFirst),
            "heterogeneous_earliest_finish_time_reserved" | "heft_reserved" => {
                Some(Self::HeterogeneousEarliestFinishTimeReserved)
            }
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::FixedWorker => "fixed_worker",
            Self::RoundRobin => "round_robin",
            Self::ShortestExpectedLatency => "shortest_expected_latency",
            Self::FixedWorkerGlobalQueue => "fixed_worker_global_queue",
            Self::HeterogeneousEarliestFinishTime => "heterogeneous_earliest_finish_time",
            Self::LeastSlackTimeFirst => "least_slack_time_first",
            Self::HeterogeneousEarliestFinishTimeReserved => {
                "heterogeneous_earliest_finish_time_reserved"
            }
        }
    }

    /// Instantiates the policy.
    pub fn create(self) -> Box<dyn Scheduler> {
        match self {
            Self::FixedWorker => Box::new(FixedWorker::new()),
            Self::RoundRobin => Box::new(RoundRobin::new()),
            Self::ShortestExpectedLatency => Box::new(ShortestExpectedLatency::new()),
            Self::FixedWorkerGlobalQueue => Box::new(FixedWorkerGlobalQueue::new()),
            Self::HeterogeneousEarliestFinishTime => {
                Box::new(HeterogeneousEarliestFinishTime::new(false))
            }
            Self::LeastSlackTimeFirst => Box::new(LeastSlackTimeFirst::new()),
            Self::HeterogeneousEarliestFinishTimeReserved => {
                Box::new(HeterogeneousEarliestFinishTime::new(true))
            }
        }
    }

    /// Worker queueing discipline the policy needs.
    pub fn worker_type(self) -> WorkerType {
        match self {
            Self::FixedWorker | Self::RoundRobin => WorkerType::DeviceQueue,
            _ => WorkerType::GlobalQueue,
        }
    }
}

impl std::fmt::Display for SchedulerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_window_size() -> usize {
    i32::MAX as usize
}

fn default_schedulers() -> Vec<SchedulerType> {
    vec![SchedulerType::HeterogeneousEarliestFinishTimeReserved]
}

fn default_finished_capacity() -> usize {
    1000
}

fn default_smoothing_factor() -> f32 {
    0.1
}

fn default_speed() -> f64 {
    1.0
}

/// `[planner]` section.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PlannerConfig {
    /// Number of queued jobs a scheduler looks at per pass.
    #[serde(default = "default_window_size")]
    pub schedule_window_size: usize,
    /// Policies, run in this order on every pass.
    #[serde(default = "default_schedulers")]
    pub schedulers: Vec<SchedulerType>,
    /// Finished jobs are appended here as JSON lines, if set.
    #[serde(default)]
    pub log_path: Option<PathBuf>,
    /// Size of the finished-job ring.
    #[serde(default = "default_finished_capacity")]
    pub finished_capacity: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            schedule_window_size: default_window_size(),
            schedulers: default_schedulers(),
            log_path: None,
            finished_capacity: default_finished_capacity(),
        }
    }
}

impl PlannerConfig {
    pub fn with_schedulers(schedulers: Vec<SchedulerType>) -> Self {
        Self {
            schedulers,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), PlannerError> {
        if self.schedule_window_size == 0 {
            return Err(PlannerError::ConfigError(
                "schedule_window_size must be greater than 0".into(),
            ));
        }
        if self.schedulers.is_empty() {
            return Err(PlannerError::ConfigError(
                "at least one scheduler is required".into(),
            ));
        }
        if self.finished_capacity == 0 {
            return Err(PlannerError::ConfigError(
                "finished_capacity must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// `[profile]` section.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ProfileConfig {
    /// Weight of the newest measurement in the latency moving average.
    #[serde(default = "default_smoothing_factor")]
    pub smoothing_factor: f32,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            smoothing_factor: default_smoothing_factor(),
        }
    }
}

/// One `[[workers]]` entry of the simulated engine.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WorkerConfig {
    pub device: DeviceFlag,
    /// Defaults to the queueing discipline of the configured schedulers.
    #[serde(default)]
    pub worker_type: Option<WorkerType>,
    /// Relative throughput; op costs are divided by it.
    #[serde(default = "default_speed")]
    pub speed: f64,
    /// Op types this worker cannot run, as manifest names.
    #[serde(default)]
    pub unsupported_op_types: Vec<String>,
}

impl WorkerConfig {
    pub fn new(device: DeviceFlag) -> Self {
        Self {
            device,
            worker_type: None,
            speed: default_speed(),
            unsupported_op_types: Vec::new(),
        }
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    pub fn without_op_type(mut self, op_type: &str) -> Self {
        self.unsupported_op_types.push(op_type.to_string());
        self
    }

    /// Converts to the analyzer's view of this worker.
    pub fn support(&self, worker_id: WorkerId) -> Result<WorkerSupport, PlannerError> {
        let mut support = WorkerSupport::new(worker_id, self.device);
        for name in &self.unsupported_op_types {
            let op_type = OpType::from_str_loose(name).ok_or_else(|| {
                PlannerError::ConfigError(format!(
                    "worker {worker_id}: unknown op type '{name}'"
                ))
            })?;
            support = support.without_op_type(op_type);
        }
        Ok(support)
    }
}

/// Complete configuration for a planner and its simulated engine.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SchedConfig {
    #[serde(default)]
    pub planner: PlannerConfig,
    #[serde(default)]
    pub subgraph: SubgraphConfig,
    #[serde(default)]
    pub profile: ProfileConfig,
    #[serde(default)]
    pub workers: Vec<WorkerConfig>,
}

impl SchedConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, PlannerError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PlannerError::ConfigError(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, PlannerError> {
        toml::from_str(toml_str)
            .map_err(|e| PlannerError::ConfigError(format!("TOML parse error: {e}")))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, PlannerError> {
        toml::to_string_pretty(self)
            .map_err(|e| PlannerError::ConfigError(format!("TOML serialise error: {e}")))
    }

    pub fn validate(&self) -> Result<(), PlannerError> {
        self.planner.validate()?;
        self.subgraph.validate()?;
        if !(0.0..=1.0).contains(&self.profile.smoothing_factor) {
            return Err(PlannerError::ConfigError(format!(
                "smoothing_factor must be in [0, 1], got {}",
                self.profile.smoothing_factor
            )));
        }
        for (index, worker) in self.workers.iter().enumerate() {
            if worker.speed <= 0.0 {
                return Err(PlannerError::ConfigError(format!(
                    "worker {index}: speed must be positive"
                )));
            }
            worker.support(WorkerId(index))?;
        }
        Ok(())
    }

    /// Worker type used for workers that do not set one.
    pub fn default_worker_type(&self) -> WorkerType {
        self.planner
            .schedulers
            .first()
            .map(|s| s.worker_type())
            .unwrap_or(WorkerType::GlobalQueue)
    }

    /// Analyzer view of every configured worker, ids by position.
    pub fn worker_supports(&self) -> Result<Vec<WorkerSupport>, PlannerError> {
        self.workers
            .iter()
            .enumerate()
            .map(|(index, worker)| worker.support(WorkerId(index)))
            .collect()
    }
}
