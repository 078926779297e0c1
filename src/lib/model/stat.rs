//! Per-sample, per-transcript coverage statistics.

use itertools::Itertools;
use serde::Serialize;
use std::collections::BTreeMap;

/// Separator used when an [`ExonIds`] set is persisted as text.
pub const EXON_SEPARATOR: char = ',';

/// Ordered set of exon ids, kept in genomic order of the owning transcript.
///
/// The delimited form only exists at the storage boundary, see
/// [`ExonIds::encode`] and [`ExonIds::decode`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExonIds(Vec<String>);

impl ExonIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an id, ignoring duplicates. Returns `true` when inserted.
    pub fn insert(&mut self, exon_id: impl Into<String>) -> bool {
        let exon_id = exon_id.into();
        if self.contains(&exon_id) {
            return false;
        }
        self.0.push(exon_id);
        true
    }

    pub fn contains(&self, exon_id: &str) -> bool {
        self.0.iter().any(|id| id == exon_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Storage form: ids joined by commas, empty string for an empty set.
    pub fn encode(&self) -> String {
        self.0.iter().join(&EXON_SEPARATOR.to_string())
    }

    /// Inverse of [`ExonIds::encode`]; `None` and `""` both decode to an empty set.
    pub fn decode(raw: Option<&str>) -> Self {
        let mut ids = Self::new();
        if let Some(raw) = raw {
            raw.split(EXON_SEPARATOR)
                .filter(|id| !id.is_empty())
                .for_each(|id| {
                    ids.insert(id);
                });
        }
        ids
    }
}

impl<S: Into<String>> FromIterator<S> for ExonIds {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut ids = Self::new();
        for id in iter {
            ids.insert(id);
        }
        ids
    }
}

/// Coverage statistics for one transcript in one sample.
///
/// `None` marks an undefined value: a transcript whose merged exon set has no
/// bases has neither a mean coverage nor a completeness.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptStat {
    pub sample_id: String,
    pub transcript_id: String,
    pub mean_coverage: Option<f64>,
    /// Completeness fraction in `[0, 1]` keyed by depth threshold.
    pub completeness: BTreeMap<u32, Option<f64>>,
    /// Threshold used to decide exon incompleteness.
    pub threshold: u32,
    pub incomplete_exons: ExonIds,
}

impl TranscriptStat {
    /// Completeness at `threshold`, `None` when undefined or not computed.
    pub fn completeness(&self, threshold: u32) -> Option<f64> {
        self.completeness.get(&threshold).copied().flatten()
    }

    pub fn completeness_10(&self) -> Option<f64> {
        self.completeness(10)
    }

    pub fn completeness_15(&self) -> Option<f64> {
        self.completeness(15)
    }

    pub fn completeness_20(&self) -> Option<f64> {
        self.completeness(20)
    }

    pub fn completeness_50(&self) -> Option<f64> {
        self.completeness(50)
    }

    pub fn completeness_100(&self) -> Option<f64> {
        self.completeness(100)
    }

    /// Thresholds this stat carries a value slot for.
    pub fn thresholds(&self) -> impl Iterator<Item = u32> + '_ {
        self.completeness.keys().copied()
    }

    /// `true` when every exon reached the primary threshold.
    pub fn is_complete(&self) -> bool {
        self.incomplete_exons.is_empty()
    }
}
