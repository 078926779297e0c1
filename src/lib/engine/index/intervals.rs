use rust_lapper::{Interval, Lapper};

use super::types::Span;

/// Merge overlapping or adjacent spans into a sorted, non-overlapping set.
///
/// `[s1, e1)` and `[s2, e2)` merge when `s2 <= e1`. Empty spans are ignored.
pub(crate) fn merge_spans(spans: &[Span]) -> Vec<Span> {
    let ivs: Vec<Interval<u64, ()>> = spans
        .iter()
        .filter(|s| !s.is_empty())
        .map(|s| Interval {
            start: s.start,
            stop: s.end,
            val: (),
        })
        .collect();

    let mut lapper = Lapper::new(ivs);
    lapper.merge_overlaps();
    lapper
        .iter()
        .map(|iv| Span::new(iv.start, iv.stop))
        .collect()
}

/// Total number of bases in a merged span set.
#[inline]
pub(crate) fn covered_bases(merged: &[Span]) -> u64 {
    merged.iter().map(|s| s.len()).sum()
}

/// For spans sorted by start, the part of each span not covered by any
/// earlier span. Summing the results gives the size of the union.
pub(crate) fn owned_spans(sorted: &[Span]) -> Vec<Option<Span>> {
    let mut reach = 0u64;
    let mut seen_any = false;
    sorted
        .iter()
        .map(|span| {
            if span.is_empty() {
                return None;
            }
            let start = if seen_any {
                span.start.max(reach)
            } else {
                span.start
            };
            seen_any = true;
            reach = reach.max(span.end);
            (start < span.end).then(|| Span::new(start, span.end))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn merges_overlapping_and_adjacent() {
        let merged = merge_spans(&[
            Span::new(140, 200),
            Span::new(100, 150),
            Span::new(200, 210),
            Span::new(300, 310),
            Span::new(305, 305),
        ]);
        assert_eq!(merged, vec![Span::new(100, 210), Span::new(300, 310)]);
        assert_eq!(covered_bases(&merged), 120);
    }

    #[test]
    fn owned_parts_are_disjoint() {
        let sorted = [Span::new(100, 150), Span::new(120, 130), Span::new(140, 200)];
        assert_eq!(
            owned_spans(&sorted),
            vec![Some(Span::new(100, 150)), None, Some(Span::new(150, 200))]
        );
    }

    prop_compose! {
        fn arb_span(max: u64)(start in 0..max, size in 0..max / 4) -> Span {
            Span::new(start, start + size)
        }
    }

    fn union_size(spans: &[Span]) -> u64 {
        let mut bases = HashSet::new();
        for s in spans {
            for pos in s.start..s.end {
                bases.insert(pos);
            }
        }
        bases.len() as u64
    }

    proptest! {
        #[test]
        fn merged_length_is_union_size(spans in prop::collection::vec(arb_span(2_000), 0..60)) {
            let merged = merge_spans(&spans);
            prop_assert_eq!(covered_bases(&merged), union_size(&spans));
            for w in merged.windows(2) {
                prop_assert!(w[0].end < w[1].start);
            }
        }

        #[test]
        fn merge_is_order_independent(
            spans in prop::collection::vec(arb_span(2_000), 0..60),
            seed in any::<u64>(),
        ) {
            let mut shuffled = spans.clone();
            let n = shuffled.len();
            if n > 1 {
                let mut state = seed | 1;
                for i in (1..n).rev() {
                    state ^= state << 13;
                    state ^= state >> 7;
                    state ^= state << 17;
                    shuffled.swap(i, (state % (i as u64 + 1)) as usize);
                }
            }
            prop_assert_eq!(merge_spans(&spans), merge_spans(&shuffled));
        }

        #[test]
        fn owned_parts_sum_to_union(spans in prop::collection::vec(arb_span(2_000), 0..60)) {
            let mut sorted = spans.clone();
            sorted.sort();
            let owned: u64 = owned_spans(&sorted).into_iter().flatten().map(|s| s.len()).sum();
            prop_assert_eq!(owned, union_size(&spans));
        }
    }
}
