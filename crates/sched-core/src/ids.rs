// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Strongly typed identifiers.

use std::fmt;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident($inner:ty), $prefix:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub $inner);

        impl $name {
            /// Returns the raw numeric value.
            pub fn get(self) -> $inner {
                self.0
            }
        }

        impl From<$inner> for $name {
            fn from(v: $inner) -> Self {
                Self(v)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

id_type!(
    /// Identifies one inference request. Issued by the planner, strictly
    /// increasing for the lifetime of a planner instance.
    JobId(u64),
    "job#"
);

id_type!(
    /// Identifies a registered model.
    ModelId(u32),
    "model#"
);

id_type!(
    /// Identifies an execution worker (a CPU cluster, GPU, DSP, or NPU queue).
    WorkerId(usize),
    "worker#"
);

id_type!(
    /// Handle returned when registering an end-of-request callback.
    CallbackId(u64),
    "callback#"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(JobId(7).to_string(), "job#7");
        assert_eq!(WorkerId(1).to_string(), "worker#1");
        assert_eq!(ModelId(3).to_string(), "model#3");
        assert_eq!(CallbackId(0).to_string(), "callback#0");
    }

    #[test]
    fn test_ordering() {
        assert!(JobId(1) < JobId(2));
        assert!(WorkerId(0) < WorkerId(3));
    }

    #[test]
    fn test_serde_transparent() {
        let json = serde_json::to_string(&WorkerId(4)).unwrap();
        assert_eq!(json, "4");
        let back: WorkerId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, WorkerId(4));
    }
}
