use smallvec::SmallVec;
use smartstring::alias::String as CompactString;

use crate::engine::index::Span;

/// Depth observed over a record's span.
#[derive(Debug, Clone, PartialEq)]
pub enum Coverage {
    /// Every base of the span has this depth.
    Uniform(f64),
    /// Region summary: mean depth and, per threshold, the fraction of bases
    /// whose depth is at least that threshold.
    Summary {
        mean: f64,
        fractions: SmallVec<[(u32, f64); 8]>,
    },
}

impl Coverage {
    /// Mean depth over the span.
    #[inline]
    pub fn mean(&self) -> f64 {
        match self {
            Coverage::Uniform(depth) => *depth,
            Coverage::Summary { mean, .. } => *mean,
        }
    }

    /// Fraction of bases reaching `threshold`. `None` when a summary record
    /// does not carry that threshold.
    pub fn fraction_at(&self, threshold: u32) -> Option<f64> {
        if threshold == 0 {
            return Some(1.0);
        }
        match self {
            Coverage::Uniform(depth) => Some(if *depth >= threshold as f64 { 1.0 } else { 0.0 }),
            Coverage::Summary { fractions, .. } => fractions
                .iter()
                .find(|(t, _)| *t == threshold)
                .map(|(_, fraction)| *fraction),
        }
    }
}

/// One record of a depth stream, attributed to a region id.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthRecord {
    pub region_id: CompactString,
    pub chrom: CompactString,
    pub span: Span,
    pub coverage: Coverage,
}

impl DepthRecord {
    /// Run of `end - start` bases that all share `depth`.
    pub fn uniform(region_id: &str, chrom: &str, start: u64, end: u64, depth: f64) -> Self {
        Self {
            region_id: CompactString::from(region_id),
            chrom: CompactString::from(chrom),
            span: Span::new(start, end),
            coverage: Coverage::Uniform(depth),
        }
    }

    /// Region summary with fractions keyed by threshold.
    pub fn summary<I>(region_id: &str, chrom: &str, start: u64, end: u64, mean: f64, fractions: I) -> Self
    where
        I: IntoIterator<Item = (u32, f64)>,
    {
        Self {
            region_id: CompactString::from(region_id),
            chrom: CompactString::from(chrom),
            span: Span::new(start, end),
            coverage: Coverage::Summary {
                mean,
                fractions: fractions.into_iter().collect(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_fraction_is_all_or_nothing() {
        let c = Coverage::Uniform(12.0);
        assert_eq!(c.fraction_at(10), Some(1.0));
        assert_eq!(c.fraction_at(12), Some(1.0));
        assert_eq!(c.fraction_at(15), Some(0.0));
        assert_eq!(c.fraction_at(0), Some(1.0));
        assert_eq!(c.mean(), 12.0);
    }

    #[test]
    fn summary_fraction_lookup() {
        let rec = DepthRecord::summary("e1", "1", 0, 10, 14.5, vec![(10, 0.8), (20, 0.1)]);
        assert_eq!(rec.coverage.fraction_at(10), Some(0.8));
        assert_eq!(rec.coverage.fraction_at(20), Some(0.1));
        assert_eq!(rec.coverage.fraction_at(15), None);
        assert_eq!(rec.coverage.fraction_at(0), Some(1.0));
        assert_eq!(rec.span.len(), 10);
    }
}
