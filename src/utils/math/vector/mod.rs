use sprs::CsVecView;

use crate::utils::element::{Element, FloatElement};

/// ドット積
/// Accumulates in `f64` regardless of the element type.
#[inline]
pub fn dot<N: Element>(a: &[N], b: &[N]) -> f64 {
    debug_assert_eq!(
        a.len(),
        b.len(),
        "Vectors must be of the same length to compute dot product."
    );
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| x.as_f64() * y.as_f64())
        .sum()
}

#[inline]
pub fn norm_sq<N: Element>(a: &[N]) -> f64 {
    a.iter()
        .map(|x| {
            let x = x.as_f64();
            x * x
        })
        .sum()
}

/// Cosine similarity of two dense vectors.
///
/// cosθ = A・B / (|A||B|)
/// A zero-norm operand yields `0`, never `NaN`.
#[inline]
pub fn cosine<F: FloatElement>(a: &[F], b: &[F]) -> F {
    let denom = (norm_sq(a) * norm_sq(b)).sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return F::zero();
    }
    F::from_f64_lossy(dot(a, b) / denom)
}

/// Sum of the stored values of a sparse vector.
#[inline]
pub fn sparse_sum<N: Element>(v: CsVecView<'_, N>) -> f64 {
    v.iter().map(|(_, x)| x.as_f64()).sum()
}

/// Dense copy of a sparse vector.
pub fn sparse_to_dense<N: Element>(v: CsVecView<'_, N>) -> Vec<N> {
    let mut dense = vec![N::zero(); v.dim()];
    for (idx, &x) in v.iter() {
        dense[idx] = x;
    }
    dense
}
