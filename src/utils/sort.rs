use std::cmp::Ordering;

/// Descending comparison that places NaN after every number.
#[inline(always)]
fn desc_nan_last<S: PartialOrd>(a: &S, b: &S) -> Ordering {
    match (a.partial_cmp(a).is_some(), b.partial_cmp(b).is_some()) {
        (true, true) => b.partial_cmp(a).unwrap_or(Ordering::Equal),
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => Ordering::Equal,
    }
}

/// Returns the positions and values of the `n` largest scores.
///
/// - Sorted by descending score
/// - Ties keep their original order (stable)
/// - NaN sorts last instead of being dropped, so the output always holds
///   `min(n, scores.len())` entries
pub fn top_n_desc<S: PartialOrd + Copy>(scores: &[S], n: usize) -> Vec<(usize, S)> {
    let mut ranked: Vec<(usize, S)> = scores.iter().copied().enumerate().collect();
    ranked.sort_by(|a, b| desc_nan_last(&a.1, &b.1));
    ranked.truncate(n);
    ranked
}
