use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use sprs::{CsMat, CsVecView};
use tracing::{debug, info};

use crate::config::{DefaultFloat, LsaConfig};
use crate::error::{Error, Result};
use crate::model::EmbeddingModel;
use crate::utils::element::{Element, FloatElement};
use crate::vectorizer::lexicon::Lexicon;
use crate::vectorizer::tfidf::WeightingState;
use crate::vectorizer::DocumentTermMatrix;

/// Latent semantic analysis model.
///
/// Built from the rank-`k` truncated SVD `X ≈ U Σ Vᵀ` of the weighted
/// training matrix. Only `Σ⁻¹` and `Vᵀ` are kept; a document is embedded as
/// `Σ⁻¹ Vᵀ x`, which for a training row gives its row of `U`.
///
/// # Serialization
/// Supported through serde, and through the text model format in
/// [`crate::vectorizer::serde`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LsaModel<F: FloatElement = DefaultFloat> {
    pub(crate) lexicon: Lexicon,
    pub(crate) weighting: WeightingState<F>,
    /// diagonal of Σ⁻¹, length k
    pub(crate) sigma_inv: Vec<F>,
    /// k x n
    pub(crate) vt: DMatrix<F>,
    pub(crate) tol: F,
}

impl<F: FloatElement> LsaModel<F> {
    /// Builds a model from a document-term matrix.
    ///
    /// # Errors
    /// - [`Error::InvalidParameter`] when the rank is zero
    /// - [`Error::DimensionMismatch`] when the rank exceeds `min(documents, terms)`
    pub fn new<T: Element>(dtm: &DocumentTermMatrix<T>, config: LsaConfig) -> Result<Self> {
        Self::from_counts(&dtm.dtm, dtm.lexicon.clone(), config)
    }

    /// Builds a model from a raw count matrix whose columns follow `lexicon`.
    pub fn from_counts<T: Element>(counts: &CsMat<T>, lexicon: Lexicon, config: LsaConfig) -> Result<Self> {
        let (m, n) = (counts.rows(), counts.cols());
        if lexicon.len() != n {
            return Err(Error::DimensionMismatch(format!(
                "count matrix has {n} columns, lexicon has {} terms",
                lexicon.len()
            )));
        }
        let max_rank = m.min(n);
        let k = config.k.unwrap_or(max_rank);
        if k == 0 {
            return Err(Error::InvalidParameter(
                "LSA rank must be at least 1".to_string(),
            ));
        }
        if k > max_rank {
            return Err(Error::DimensionMismatch(format!(
                "LSA rank {k} exceeds min(documents, terms) = {max_rank}"
            )));
        }

        // the decomposition always runs in f64
        let weighting = WeightingState::<f64>::fit(counts, config.stats, config.bm25);
        let x = weighting.weigh_matrix(counts)?;
        let mut dense = DMatrix::<f64>::zeros(m, n);
        for (i, row) in x.outer_iterator().enumerate() {
            for (j, &v) in row.iter() {
                dense[(i, j)] = v;
            }
        }
        debug!(documents = m, terms = n, k, stats = %config.stats, "computing SVD");
        let svd = dense
            .try_svd(false, true, f64::EPSILON, 0)
            .ok_or_else(|| Error::InvalidParameter("singular value decomposition did not converge".to_string()))?;
        let v_t = svd
            .v_t
            .ok_or_else(|| Error::InvalidParameter("singular value decomposition returned no V".to_string()))?;

        let singular: Vec<f64> = svd.singular_values.iter().copied().collect();
        let mut order: Vec<usize> = (0..singular.len()).collect();
        order.sort_by(|&a, &b| singular[b].total_cmp(&singular[a]));
        order.truncate(k);

        // singular values at rounding level count as zero
        let largest = order.first().map_or(0.0, |&i| singular[i]);
        let cutoff = largest * m.max(n) as f64 * f64::EPSILON;
        let sigma_inv: Vec<F> = order
            .iter()
            .map(|&i| {
                let s = singular[i];
                F::from_f64_lossy(if s > cutoff { 1.0 / s } else { 0.0 })
            })
            .collect();
        let vt = DMatrix::from_fn(k, n, |r, j| F::from_f64_lossy(v_t[(order[r], j)]));

        info!(documents = m, terms = n, k, stats = %config.stats, "built LSA model");
        Ok(Self {
            lexicon,
            weighting: weighting.cast(),
            sigma_inv,
            vt,
            tol: F::from_f64_lossy(config.tol),
        })
    }

    /// Reassembles a model from stored parts, checking that the shapes agree.
    pub fn from_parts(
        lexicon: Lexicon,
        weighting: WeightingState<F>,
        sigma_inv: Vec<F>,
        vt: DMatrix<F>,
        tol: F,
    ) -> Result<Self> {
        let n = lexicon.len();
        if weighting.dim() != n {
            return Err(Error::DimensionMismatch(format!(
                "idf has {} entries, vocabulary has {n}",
                weighting.dim()
            )));
        }
        if vt.nrows() != sigma_inv.len() || vt.ncols() != n {
            return Err(Error::DimensionMismatch(format!(
                "Vt is {}x{}, expected {}x{n}",
                vt.nrows(),
                vt.ncols(),
                sigma_inv.len()
            )));
        }
        Ok(Self {
            lexicon,
            weighting,
            sigma_inv,
            vt,
            tol,
        })
    }

    /// Diagonal of Σ⁻¹.
    #[inline]
    pub fn sigma_inv(&self) -> &[F] {
        &self.sigma_inv
    }

    /// Right singular vectors, transposed (`k x n`).
    #[inline]
    pub fn vt(&self) -> &DMatrix<F> {
        &self.vt
    }

    #[inline]
    pub fn tol(&self) -> F {
        self.tol
    }

    /// Same model with another element type.
    pub fn cast<G: FloatElement>(&self) -> LsaModel<G> {
        LsaModel {
            lexicon: self.lexicon.clone(),
            weighting: self.weighting.cast(),
            sigma_inv: self.sigma_inv.iter().map(|v| G::from_f64_lossy(v.as_f64())).collect(),
            vt: self.vt.map(|v| G::from_f64_lossy(v.as_f64())),
            tol: G::from_f64_lossy(self.tol.as_f64()),
        }
    }
}

impl<F: FloatElement> EmbeddingModel<F> for LsaModel<F> {
    fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    fn weighting(&self) -> &WeightingState<F> {
        &self.weighting
    }

    fn dims(&self) -> usize {
        self.sigma_inv.len()
    }

    /// `Σ⁻¹ Vᵀ x`, components below `tol` in magnitude set to zero.
    fn project(&self, weighted: CsVecView<'_, F>) -> Vec<F> {
        let tol = self.tol.as_f64();
        self.sigma_inv
            .iter()
            .enumerate()
            .map(|(r, s)| {
                let dot: f64 = weighted
                    .iter()
                    .filter(|(j, _)| *j < self.vt.ncols())
                    .map(|(j, x)| self.vt[(r, j)].as_f64() * x.as_f64())
                    .sum();
                let v = s.as_f64() * dot;
                if v.abs() < tol {
                    F::zero()
                } else {
                    F::from_f64_lossy(v)
                }
            })
            .collect()
    }

    fn column_vector(&self, j: usize) -> Vec<F> {
        self.vt.column(j).iter().copied().collect()
    }

    fn column_embedding(&self, j: usize) -> Vec<F> {
        self.vt
            .column(j)
            .iter()
            .zip(&self.sigma_inv)
            .map(|(v, s)| F::from_f64_lossy(v.as_f64() * s.as_f64()))
            .collect()
    }

    /// Rescales by `Σ`: a folded-in document `Σ⁻¹ Vᵀ x` is compared as `Vᵀ x`,
    /// so every latent axis counts by its singular value. Dropped axes stay zero.
    fn comparable(&self, embedding: Vec<F>) -> Vec<F> {
        embedding
            .into_iter()
            .zip(&self.sigma_inv)
            .map(|(e, s)| {
                let s = s.as_f64();
                F::from_f64_lossy(if s == 0.0 { 0.0 } else { e.as_f64() / s })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::math::vector::cosine;
    use crate::vectorizer::tfidf::Stats;
    use crate::vectorizer::{dtm, dtv};
    use sprs::CsVec;

    fn docs() -> Vec<&'static str> {
        vec![
            "red apple green apple",
            "green pear yellow pear",
            "red cherry red berry",
            "yellow banana green banana",
        ]
    }

    fn model(config: LsaConfig) -> (LsaModel, DocumentTermMatrix) {
        let docs = docs();
        let lex = Lexicon::sorted(docs.iter().flat_map(|d| d.split(' ')));
        let m: DocumentTermMatrix = dtm(&docs, &lex);
        (LsaModel::new(&m, config).unwrap(), m)
    }

    #[test]
    fn default_rank_is_min_dimension() {
        let (model, m) = model(LsaConfig::default());
        let (docs, terms) = m.shape();
        assert_eq!(model.size(), (terms, docs.min(terms)));
        assert_eq!(model.vt().shape(), (4, terms));
    }

    #[test]
    fn rank_bounds_are_checked() {
        let docs = docs();
        let lex = Lexicon::sorted(docs.iter().flat_map(|d| d.split(' ')));
        let m: DocumentTermMatrix = dtm(&docs, &lex);
        assert!(matches!(
            LsaModel::<f64>::new(&m, LsaConfig::default().with_k(5)),
            Err(Error::DimensionMismatch(_))
        ));
        assert!(matches!(
            LsaModel::<f64>::new(&m, LsaConfig::default().with_k(0)),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn singular_values_are_descending() {
        let (model, _) = model(LsaConfig::default().with_k(3));
        // Σ⁻¹ ascends when Σ descends
        let inv = model.sigma_inv();
        assert_eq!(inv.len(), 3);
        assert!(inv.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn full_rank_embeddings_of_training_documents_are_orthonormal() {
        // training embeddings are the rows of U, whose columns are orthonormal
        let (model, m) = model(LsaConfig::default());
        let e = model.embed_dtm(m.matrix()).unwrap();
        let gram = e.transpose() * &e;
        for r in 0..gram.nrows() {
            for c in 0..gram.ncols() {
                let expected = if r == c { 1.0 } else { 0.0 };
                assert!((gram[(r, c)] - expected).abs() < 1e-8, "gram[{r},{c}] = {}", gram[(r, c)]);
            }
        }
    }

    #[test]
    fn embed_matches_direct_projection() {
        let (model, m) = model(LsaConfig::default().with_stats(Stats::Bm25));
        let docs = docs();
        let weighted = model.weighting().weigh_matrix(m.matrix()).unwrap();
        for (i, doc) in docs.iter().enumerate() {
            let embedded = model.embed(*doc);
            // V Σ⁻¹ applied to the weighted training row
            let row = weighted.outer_view(i).unwrap();
            let direct: Vec<f64> = (0..model.dims())
                .map(|r| {
                    let s: f64 = row.iter().map(|(j, x)| model.vt()[(r, j)] * x).sum();
                    s * model.sigma_inv()[r]
                })
                .collect();
            assert!((cosine(&embedded, &direct) - 1.0).abs() < 1e-9);
            let from_counts: CsVec<i64> = dtv(*doc, &m.lexicon);
            assert_eq!(model.embed_dtv(from_counts.view()).unwrap(), embedded);
        }
    }

    #[test]
    fn tol_zeroes_small_components() {
        let (model, _) = model(LsaConfig::default().with_tol(1e6));
        assert!(model.embed("red apple").iter().all(|&v| v == 0.0));
    }

    #[test]
    fn word_vectors() {
        let (model, _) = model(LsaConfig::default().with_k(2));
        let v = model.get_vector("apple").unwrap();
        let w = model.embed_word("apple").unwrap();
        assert_eq!(v.len(), 2);
        for r in 0..2 {
            assert!((w[r] - v[r] * model.sigma_inv()[r]).abs() < 1e-12);
        }
        assert!(matches!(model.get_vector("durian"), Err(Error::UnknownTerm(_))));
        assert!(model.in_vocabulary("pear"));
        assert_eq!(model.index("apple").unwrap(), 0);
    }

    #[test]
    fn similarity_of_documents() {
        let (model, _) = model(LsaConfig::default().with_k(3));
        let own = model.similarity("red apple green apple", "red apple green apple");
        assert!((own - 1.0).abs() < 1e-9);
        // nothing in the vocabulary embeds to zero, which has similarity 0
        assert_eq!(model.similarity("nothing known", "red"), 0.0);
    }

    #[test]
    fn similarity_weighs_axes_by_singular_value() {
        let (model, m) = model(LsaConfig::default().with_k(3).with_stats(Stats::Tf));
        let project = |doc: &str| -> Vec<f64> {
            let counts: CsVec<i64> = dtv(doc, &m.lexicon);
            let weighted = model.weighting().weigh_vector(counts.view()).unwrap();
            (0..model.dims())
                .map(|r| weighted.iter().map(|(j, x)| model.vt()[(r, j)] * x).sum())
                .collect()
        };
        let (a, b) = ("red apple green pear", "yellow banana red berry");
        let expected = cosine(&project(a), &project(b));
        assert!((model.similarity(a, b) - expected).abs() < 1e-9);

        let hits = model.cosine(&docs()[..], a, 4);
        let ranked = model.cosine_dtm(m.matrix(), a, 4).unwrap();
        assert_eq!(hits.indices(), ranked.indices());
        for (x, y) in hits.scores().iter().zip(ranked.scores()) {
            assert!((x - y).abs() < 1e-9);
        }
    }

    #[test]
    fn dimension_mismatch_on_wrong_vector_length() {
        let (model, _) = model(LsaConfig::default());
        let v = CsVec::new(3, vec![0], vec![1i64]);
        assert!(matches!(model.embed_dtv(v.view()), Err(Error::DimensionMismatch(_))));
    }

    #[test]
    fn cast_and_serde_snapshot() {
        let (model, _) = model(LsaConfig::default().with_k(2));
        let small: LsaModel<f32> = model.cast();
        assert_eq!(small.size(), model.size());
        let bytes = serde_cbor::to_vec(&model).unwrap();
        let back: LsaModel<f64> = serde_cbor::from_slice(&bytes).unwrap();
        assert_eq!(back, model);
    }

    #[test]
    fn model_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<LsaModel<f32>>();
        assert_send_sync::<LsaModel<half::f16>>();
    }
}
