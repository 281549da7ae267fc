use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use sprs::{CsMat, CsVecView};
use tracing::{debug, info};

use crate::config::{DefaultFloat, RpConfig};
use crate::error::{Error, Result};
use crate::model::EmbeddingModel;
use crate::utils::element::{Element, FloatElement};
use crate::utils::math::vector::sparse_to_dense;
use crate::vectorizer::lexicon::Lexicon;
use crate::vectorizer::tfidf::WeightingState;
use crate::vectorizer::{map_entries, DocumentTermMatrix};

/// Sparse random projection matrix (`m x k`, CSR).
///
/// Each entry is independently `+s` with probability `density / 2`, `-s`
/// with probability `density / 2` and `0` otherwise, where
/// `s = sqrt(1 / density) / sqrt(k)`.
///
/// # Errors
/// [`Error::InvalidParameter`] when `k` is zero or `density` is outside `(0, 1]`.
pub fn random_projection_matrix<F, R>(m: usize, k: usize, density: f64, rng: &mut R) -> Result<CsMat<F>>
where
    F: FloatElement,
    R: Rng + ?Sized,
{
    if k == 0 {
        return Err(Error::InvalidParameter(
            "projection dimensionality must be at least 1".to_string(),
        ));
    }
    if !(density > 0.0 && density <= 1.0) {
        return Err(Error::InvalidParameter(format!(
            "projection density must be in (0, 1], got {density}"
        )));
    }
    let s = (1.0 / density).sqrt() / (k as f64).sqrt();
    let (pos, neg) = (F::from_f64_lossy(s), F::from_f64_lossy(-s));
    let half = density / 2.0;

    let mut indptr = Vec::with_capacity(m + 1);
    let mut indices = Vec::new();
    let mut data = Vec::new();
    indptr.push(0);
    for _ in 0..m {
        for col in 0..k {
            let u: f64 = rng.gen();
            if u < half {
                indices.push(col);
                data.push(pos);
            } else if u < density {
                indices.push(col);
                data.push(neg);
            }
        }
        indptr.push(indices.len());
    }
    Ok(CsMat::new((m, k), indptr, indices, data))
}

/// Random projection model.
///
/// Documents are weighted as at training time and mapped with `Rᵀ x`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpModel<F: FloatElement = DefaultFloat> {
    pub(crate) lexicon: Lexicon,
    pub(crate) weighting: WeightingState<F>,
    /// n x k
    pub(crate) r: CsMat<F>,
    pub(crate) density: f64,
}

impl<F: FloatElement> RpModel<F> {
    pub fn new<T: Element>(dtm: &DocumentTermMatrix<T>, config: RpConfig) -> Result<Self> {
        Self::from_counts(&dtm.dtm, dtm.lexicon.clone(), config)
    }

    /// Builds a model from a raw count matrix whose columns follow `lexicon`.
    ///
    /// `k` defaults to the vocabulary size and `density` to `1 / sqrt(k)`.
    /// Equal seeds give equal projection matrices.
    pub fn from_counts<T: Element>(counts: &CsMat<T>, lexicon: Lexicon, config: RpConfig) -> Result<Self> {
        let n = counts.cols();
        if lexicon.len() != n {
            return Err(Error::DimensionMismatch(format!(
                "count matrix has {n} columns, lexicon has {} terms",
                lexicon.len()
            )));
        }
        let k = config.k.unwrap_or(n);
        let density = config.density.unwrap_or_else(|| 1.0 / (k as f64).sqrt());
        let seed = config.seed.unwrap_or_else(rand::random);
        debug!(terms = n, k, density, seed, "drawing projection matrix");
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let r = random_projection_matrix(n, k, density, &mut rng)?;
        let weighting = WeightingState::fit(counts, config.stats, config.bm25);
        info!(
            documents = counts.rows(),
            terms = n,
            k,
            nnz = r.nnz(),
            stats = %config.stats,
            "built random projection model"
        );
        Ok(Self {
            lexicon,
            weighting,
            r,
            density,
        })
    }

    /// Reassembles a model from stored parts, checking that the shapes agree.
    pub fn from_parts(lexicon: Lexicon, weighting: WeightingState<F>, r: CsMat<F>, density: f64) -> Result<Self> {
        let n = lexicon.len();
        if weighting.dim() != n || r.rows() != n {
            return Err(Error::DimensionMismatch(format!(
                "vocabulary has {n} terms, idf has {}, projection has {} rows",
                weighting.dim(),
                r.rows()
            )));
        }
        if !r.is_csr() {
            return Err(Error::TypeMismatch(
                "projection matrix must use CSR storage".to_string(),
            ));
        }
        Ok(Self {
            lexicon,
            weighting,
            r,
            density,
        })
    }

    /// Projection matrix `R` (`n x k`).
    #[inline]
    pub fn projection(&self) -> &CsMat<F> {
        &self.r
    }

    #[inline]
    pub fn density(&self) -> f64 {
        self.density
    }

    /// Same model with another element type.
    pub fn cast<G: FloatElement>(&self) -> RpModel<G> {
        RpModel {
            lexicon: self.lexicon.clone(),
            weighting: self.weighting.cast(),
            r: map_entries(&self.r, |_, _, v| G::from_f64_lossy(v.as_f64())),
            density: self.density,
        }
    }
}

impl<F: FloatElement> EmbeddingModel<F> for RpModel<F> {
    fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    fn weighting(&self) -> &WeightingState<F> {
        &self.weighting
    }

    fn dims(&self) -> usize {
        self.r.cols()
    }

    /// `Rᵀ x`
    fn project(&self, weighted: CsVecView<'_, F>) -> Vec<F> {
        let mut out = vec![0.0f64; self.r.cols()];
        for (j, x) in weighted.iter() {
            if let Some(row) = self.r.outer_view(j) {
                let x = x.as_f64();
                for (c, v) in row.iter() {
                    out[c] += x * v.as_f64();
                }
            }
        }
        out.into_iter().map(F::from_f64_lossy).collect()
    }

    fn column_vector(&self, j: usize) -> Vec<F> {
        match self.r.outer_view(j) {
            Some(row) => sparse_to_dense(row),
            None => vec![F::zero(); self.r.cols()],
        }
    }

    fn column_embedding(&self, j: usize) -> Vec<F> {
        self.column_vector(j)
    }
}
