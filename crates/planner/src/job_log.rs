// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Append-only JSON-lines log of finished jobs.

use crate::{Job, PlannerError};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes one JSON object per finished job.
#[derive(Debug)]
pub struct JobLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl JobLog {
    /// Opens `path` for appending, creating it if needed.
    pub fn open(path: &Path) -> Result<Self, PlannerError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        tracing::info!("job log: {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `jobs` and flushes. Returns the number of lines written.
    pub fn append(&mut self, jobs: &[Job]) -> Result<usize, PlannerError> {
        for job in jobs {
            let line = serde_json::to_string(job)
                .map_err(|e| PlannerError::LogError(std::io::Error::other(e)))?;
            writeln!(self.writer, "{line}")?;
        }
        self.writer.flush()?;
        Ok(jobs.len())
    }
}
