use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;

use itertools::Itertools;

use crate::core::error::{CoverageError, Result};

/// Canonical completeness thresholds.
pub const DEFAULT_THRESHOLDS: [u32; 5] = [10, 15, 20, 50, 100];

/// Threshold used to flag incomplete exons when none is configured.
pub const DEFAULT_PRIMARY_THRESHOLD: u32 = 10;

/// Sorted, de-duplicated set of depth thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Thresholds(SmallVec<[u32; 8]>);

impl Thresholds {
    pub fn new<I: IntoIterator<Item = u32>>(values: I) -> Result<Self> {
        let mut inner: SmallVec<[u32; 8]> = values.into_iter().collect();
        if inner.is_empty() {
            return Err(CoverageError::Config(
                "at least one depth threshold is required".to_string(),
            ));
        }
        inner.sort_unstable();
        inner.dedup();
        Ok(Self(inner))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }

    #[inline]
    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    #[inline]
    pub fn contains(&self, threshold: u32) -> bool {
        self.0.binary_search(&threshold).is_ok()
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self(DEFAULT_THRESHOLDS.iter().copied().collect())
    }
}

impl FromStr for Thresholds {
    type Err = CoverageError;

    fn from_str(s: &str) -> Result<Self> {
        let values = s
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| {
                v.parse::<u32>()
                    .map_err(|_| CoverageError::Config(format!("invalid depth threshold '{}'", v)))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(values)
    }
}

impl fmt::Display for Thresholds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().join(","))
    }
}
