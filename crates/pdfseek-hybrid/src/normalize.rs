//! Min-max rescaling of one signal's scores into `[0, 1]`.
//!
//! Cosine similarities and BM25 magnitudes live on unrelated scales, so each
//! list is rescaled independently before the two are combined.

use pdfseek_core::types::ScoredChunk;

/// Rescale `scores` linearly into `[0, 1]`.
///
/// All-equal inputs map to `1.0` when positive and `0.0` otherwise.
/// Non-finite inputs map to `0.0` and do not take part in the min/max.
pub fn min_max(scores: &[f32]) -> Vec<f32> {
    let mut finite = scores.iter().copied().filter(|s| s.is_finite());
    let Some(first) = finite.next() else {
        return vec![0.0; scores.len()];
    };
    let (min, max) = finite.fold((first, first), |(lo, hi), s| (lo.min(s), hi.max(s)));
    let range = max - min;

    scores
        .iter()
        .map(|&s| {
            if !s.is_finite() {
                0.0
            } else if range <= f32::EPSILON {
                if max > 0.0 { 1.0 } else { 0.0 }
            } else {
                ((s - min) / range).clamp(0.0, 1.0)
            }
        })
        .collect()
}

/// Normalize a single-signal result list in place.
pub fn normalize(results: &mut [ScoredChunk]) {
    let scores: Vec<f32> = results.iter().map(|r| r.score).collect();
    for (r, n) in results.iter_mut().zip(min_max(&scores)) {
        r.score = n;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn empty_input_is_empty_output() {
        assert!(min_max(&[]).is_empty());
    }

    #[test]
    fn rescales_to_unit_interval() {
        let out = min_max(&[2.0, 4.0, 3.0, 6.0]);
        assert!(close(out[0], 0.0));
        assert!(close(out[1], 0.5));
        assert!(close(out[2], 0.25));
        assert!(close(out[3], 1.0));
    }

    #[test]
    fn negative_cosines_are_rescaled() {
        let out = min_max(&[-0.5, 0.5, 0.0]);
        assert!(close(out[0], 0.0));
        assert!(close(out[1], 1.0));
        assert!(close(out[2], 0.5));
    }

    #[test]
    fn equal_positive_scores_become_one() {
        assert_eq!(min_max(&[0.7, 0.7, 0.7]), vec![1.0, 1.0, 1.0]);
        assert_eq!(min_max(&[3.2]), vec![1.0]);
    }

    #[test]
    fn equal_zero_scores_stay_zero() {
        assert_eq!(min_max(&[0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn non_finite_scores_do_not_poison_the_range() {
        let out = min_max(&[f32::NAN, 1.0, 3.0, f32::INFINITY]);
        assert_eq!(out[0], 0.0);
        assert!(close(out[1], 0.0));
        assert!(close(out[2], 1.0));
        assert_eq!(out[3], 0.0);
    }

    #[test]
    fn output_always_within_bounds() {
        let inputs = [12.5, -3.0, 0.0, 7.25, 7.25, 1e-3, 40.0];
        assert!(min_max(&inputs).iter().all(|s| (0.0..=1.0).contains(s)));
    }
}
