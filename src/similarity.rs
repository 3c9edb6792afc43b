//! Full-string similarity primitives.
//!
//! The default metric is the classic sequence-matcher ratio: find the longest
//! common substring, recurse on the pieces to its left and right, and report
//! `2 * matched / (len_a + len_b)`. The `strsim` metrics are available for
//! callers that prefer edit-distance or prefix-weighted behaviour.

use serde::{Deserialize, Serialize};

/// Which full-string similarity primitive the scorer uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    /// Longest-matching-blocks ratio (Ratcliff/Obershelp)
    #[default]
    SequenceRatio,
    /// 1 - levenshtein / max_len
    NormalizedLevenshtein,
    /// Jaro-Winkler, favours shared prefixes
    JaroWinkler,
}

impl SimilarityMetric {
    /// Similarity of two normalized keys in [0, 1]. Symmetric for every metric.
    pub fn similarity(self, a: &str, b: &str) -> f64 {
        match self {
            SimilarityMetric::SequenceRatio => sequence_ratio(a, b),
            SimilarityMetric::NormalizedLevenshtein => strsim::normalized_levenshtein(a, b),
            SimilarityMetric::JaroWinkler => strsim::jaro_winkler(a, b),
        }
    }
}

// ============================================================================
// Sequence-matcher ratio
// ============================================================================

/// Longest-matching-blocks ratio in [0, 1].
///
/// Two empty strings are identical (1.0). The longest-match search breaks ties
/// by position, which makes the raw algorithm order-dependent ("tide" vs
/// "diet"), so the operands are sorted into a canonical order first.
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    let (first, second) = if (a.len(), &a) <= (b.len(), &b) { (&a, &b) } else { (&b, &a) };
    let matched = matching_characters(first, second);

    2.0 * matched as f64 / total as f64
}

/// Total length of all matching blocks between `a` and `b`.
pub fn matching_characters(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    // (a_lo, a_hi, b_lo, b_hi) ranges still to be searched
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, size) = longest_match(a, b, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }
        matched += size;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            pending.push((i + size, ahi, j + size, bhi));
        }
    }

    matched
}

/// Longest common substring of `a[alo..ahi]` and `b[blo..bhi]`.
///
/// Returns `(i, j, size)` with the earliest `i`, then earliest `j`, among the
/// longest blocks. `size == 0` means nothing in common.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
    // lengths[j] = length of the common suffix ending at a[i-1], b[j-1]
    let width = bhi - blo;
    let mut prev = vec![0usize; width + 1];
    let mut curr = vec![0usize; width + 1];

    for i in alo..ahi {
        for j in blo..bhi {
            let col = j - blo + 1;
            if a[i] == b[j] {
                let len = prev[col - 1] + 1;
                curr[col] = len;
                if len > best_size {
                    best_size = len;
                    best_i = i + 1 - len;
                    best_j = j + 1 - len;
                }
            } else {
                curr[col] = 0;
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    (best_i, best_j, best_size)
}
