// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Fixed-width bitset over unit-subgraph indices.
//!
//! A model is partitioned into at most [`MAX_UNIT_SUBGRAPHS`] unit
//! subgraphs. Bit `i` of a [`UnitMask`] is set when unit subgraph `i` is
//! part of the set: a subgraph's composition, or the units a job has
//! already executed.

use crate::CoreError;
use std::fmt;

/// Maximum number of unit subgraphs a single model may be split into.
pub const MAX_UNIT_SUBGRAPHS: usize = 64;

/// A set of unit-subgraph indices stored in a single `u64`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct UnitMask(u64);

impl UnitMask {
    /// The empty set.
    pub const EMPTY: UnitMask = UnitMask(0);

    /// Creates an empty mask.
    pub fn new() -> Self {
        Self::EMPTY
    }

    /// Creates a mask from raw bits.
    pub fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Creates a mask containing `0..count`.
    pub fn first_n(count: usize) -> Result<Self, CoreError> {
        if count > MAX_UNIT_SUBGRAPHS {
            return Err(CoreError::UnitIndexOutOfRange {
                index: count - 1,
                max: MAX_UNIT_SUBGRAPHS - 1,
            });
        }
        if count == MAX_UNIT_SUBGRAPHS {
            return Ok(Self(u64::MAX));
        }
        Ok(Self((1u64 << count) - 1))
    }

    /// Creates a mask from an iterator of indices.
    pub fn from_indices<I>(indices: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = usize>,
    {
        let mut mask = Self::EMPTY;
        for index in indices {
            mask.insert(index)?;
        }
        Ok(mask)
    }

    /// Returns the raw bits.
    pub fn bits(self) -> u64 {
        self.0
    }

    /// Adds `index` to the set.
    pub fn insert(&mut self, index: usize) -> Result<(), CoreError> {
        if index >= MAX_UNIT_SUBGRAPHS {
            return Err(CoreError::UnitIndexOutOfRange {
                index,
                max: MAX_UNIT_SUBGRAPHS - 1,
            });
        }
        self.0 |= 1u64 << index;
        Ok(())
    }

    /// Returns `true` if `index` is in the set.
    pub fn contains(self, index: usize) -> bool {
        index < MAX_UNIT_SUBGRAPHS && self.0 & (1u64 << index) != 0
    }

    /// Returns the union of both sets.
    pub fn union(self, other: UnitMask) -> UnitMask {
        UnitMask(self.0 | other.0)
    }

    /// Returns `true` if the sets share no index.
    pub fn is_disjoint(self, other: UnitMask) -> bool {
        self.0 & other.0 == 0
    }

    /// Returns `true` if every index of `self` is in `other`.
    pub fn is_subset(self, other: UnitMask) -> bool {
        self.0 & !other.0 == 0
    }

    /// Returns `true` if the set is empty.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of indices in the set.
    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Smallest index in the set.
    pub fn first(self) -> Option<usize> {
        if self.0 == 0 {
            None
        } else {
            Some(self.0.trailing_zeros() as usize)
        }
    }

    /// Smallest index in `0..limit` that is *not* in the set.
    pub fn first_missing(self, limit: usize) -> Option<usize> {
        (0..limit.min(MAX_UNIT_SUBGRAPHS)).find(|&i| !self.contains(i))
    }

    /// Iterates over the indices in ascending order.
    pub fn iter(self) -> impl Iterator<Item = usize> {
        (0..MAX_UNIT_SUBGRAPHS).filter(move |&i| self.contains(i))
    }
}

impl std::ops::BitOr for UnitMask {
    type Output = UnitMask;

    fn bitor(self, rhs: UnitMask) -> UnitMask {
        self.union(rhs)
    }
}

impl std::ops::BitOrAssign for UnitMask {
    fn bitor_assign(&mut self, rhs: UnitMask) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for UnitMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (n, index) in self.iter().enumerate() {
            if n > 0 {
                f.write_str(",")?;
            }
            write!(f, "{index}")?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_contains() {
        let mut m = UnitMask::new();
        m.insert(0).unwrap();
        m.insert(5).unwrap();
        assert!(m.contains(0));
        assert!(m.contains(5));
        assert!(!m.contains(1));
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn test_out_of_range() {
        let mut m = UnitMask::new();
        assert!(m.insert(MAX_UNIT_SUBGRAPHS).is_err());
        assert!(!m.contains(MAX_UNIT_SUBGRAPHS + 3));
    }

    #[test]
    fn test_first_n() {
        assert_eq!(UnitMask::first_n(0).unwrap(), UnitMask::EMPTY);
        assert_eq!(UnitMask::first_n(3).unwrap().bits(), 0b111);
        assert_eq!(UnitMask::first_n(64).unwrap().bits(), u64::MAX);
        assert!(UnitMask::first_n(65).is_err());
    }

    #[test]
    fn test_set_relations() {
        let a = UnitMask::from_indices([0, 1]).unwrap();
        let b = UnitMask::from_indices([2]).unwrap();
        let all = a | b;
        assert!(a.is_disjoint(b));
        assert!(a.is_subset(all));
        assert!(!all.is_subset(a));
        assert_eq!(all.first_missing(4), Some(3));
        assert_eq!(all.first_missing(3), None);
        assert_eq!(b.first(), Some(2));
    }

    #[test]
    fn test_display_and_iter() {
        let m = UnitMask::from_indices([3, 1, 7]).unwrap();
        assert_eq!(m.iter().collect::<Vec<_>>(), vec![1, 3, 7]);
        assert_eq!(m.to_string(), "{1,3,7}");
        assert_eq!(UnitMask::EMPTY.to_string(), "{}");
    }
}
