// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Device and worker descriptors.

use crate::CoreError;

/// The kind of processor a worker drives.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DeviceFlag {
    Cpu,
    Gpu,
    Dsp,
    Npu,
}

impl DeviceFlag {
    /// Parses a device name, case-insensitively.
    pub fn from_str_loose(s: &str) -> Result<Self, CoreError> {
        match s.trim().to_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "gpu" => Ok(Self::Gpu),
            "dsp" => Ok(Self::Dsp),
            "npu" => Ok(Self::Npu),
            _ => Err(CoreError::UnknownDevice(s.to_string())),
        }
    }

    /// Returns a human-readable label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cpu => "CPU",
            Self::Gpu => "GPU",
            Self::Dsp => "DSP",
            Self::Npu => "NPU",
        }
    }
}

impl std::fmt::Display for DeviceFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a worker accepts work.
///
/// - `DeviceQueue` workers own a private queue: a dispatch is accepted even
///   while the worker is busy and runs once earlier jobs finish.
/// - `GlobalQueue` workers hold at most one job: jobs stay in the planner's
///   queue until the worker is idle, so the scheduler decides as late as
///   possible.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum WorkerType {
    DeviceQueue,
    GlobalQueue,
}

impl WorkerType {
    /// Parses a worker type name.
    pub fn from_str_loose(s: &str) -> Result<Self, CoreError> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "device_queue" | "device" => Ok(Self::DeviceQueue),
            "global_queue" | "global" => Ok(Self::GlobalQueue),
            _ => Err(CoreError::UnknownWorkerType(s.to_string())),
        }
    }

    /// Returns a human-readable label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DeviceQueue => "device_queue",
            Self::GlobalQueue => "global_queue",
        }
    }
}

impl std::fmt::Display for WorkerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_parse() {
        assert_eq!(DeviceFlag::from_str_loose("GPU").unwrap(), DeviceFlag::Gpu);
        assert_eq!(DeviceFlag::from_str_loose(" npu ").unwrap(), DeviceFlag::Npu);
        assert!(DeviceFlag::from_str_loose("tpu").is_err());
    }

    #[test]
    fn test_worker_type_parse() {
        assert_eq!(
            WorkerType::from_str_loose("global-queue").unwrap(),
            WorkerType::GlobalQueue
        );
        assert_eq!(
            WorkerType::from_str_loose("device").unwrap(),
            WorkerType::DeviceQueue
        );
        assert!(WorkerType::from_str_loose("shared").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(DeviceFlag::Cpu.to_string(), "CPU");
        assert_eq!(WorkerType::GlobalQueue.to_string(), "global_queue");
    }
}
