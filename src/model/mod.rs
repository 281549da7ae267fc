pub mod lsa;
pub mod rp;

use std::fmt;
use std::str::FromStr;

use nalgebra::DMatrix;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sprs::{CsMat, CsVecView};

use crate::error::{Error, Result};
use crate::utils::element::{Element, FloatElement};
use crate::utils::math::vector::cosine;
use crate::vectorizer::document::TermSource;
use crate::vectorizer::dtv;
use crate::vectorizer::evaluate::scoring::Hits;
use crate::vectorizer::lexicon::Lexicon;
use crate::vectorizer::tfidf::WeightingState;

use self::lsa::LsaModel;
use self::rp::RpModel;

/// Shared query surface of the embedding models.
///
/// Implementors supply the projection; everything else (vectorizing a
/// document against the vocabulary, reapplying the training weighting,
/// similarity and ranking) is provided here.
///
/// Models are immutable once built, so every query takes `&self` and may run
/// concurrently.
pub trait EmbeddingModel<F: FloatElement>: Send + Sync {
    fn lexicon(&self) -> &Lexicon;

    fn weighting(&self) -> &WeightingState<F>;

    /// Output dimensionality `k`.
    fn dims(&self) -> usize;

    /// Projects an already weighted vector of vocabulary length.
    fn project(&self, weighted: CsVecView<'_, F>) -> Vec<F>;

    /// Raw model vector of the term in column `j`.
    fn column_vector(&self, j: usize) -> Vec<F>;

    /// Embedding of the term in column `j`.
    fn column_embedding(&self, j: usize) -> Vec<F>;

    /// Terms in column order.
    fn vocabulary(&self) -> Vec<&str> {
        self.lexicon().terms().collect()
    }

    fn in_vocabulary(&self, word: &str) -> bool {
        self.lexicon().contains(word)
    }

    /// Column of `word`.
    ///
    /// # Errors
    /// [`Error::UnknownTerm`] when the word is not part of the vocabulary.
    fn index(&self, word: &str) -> Result<usize> {
        self.lexicon()
            .index_of(word)
            .ok_or_else(|| Error::UnknownTerm(word.to_string()))
    }

    /// (vocabulary size, output dimensionality)
    fn size(&self) -> (usize, usize) {
        (self.lexicon().len(), self.dims())
    }

    /// Embeds a document: count against the vocabulary, weigh, project.
    /// Terms outside the vocabulary are ignored.
    fn embed<D: TermSource + ?Sized>(&self, doc: &D) -> Vec<F> {
        let counts = dtv::<F, D>(doc, self.lexicon());
        let weighted = self.weighting().weigh_counts(counts.view());
        self.project(weighted.view())
    }

    /// Embeds a raw count vector.
    ///
    /// # Errors
    /// [`Error::DimensionMismatch`] when `counts` is not vocabulary sized.
    fn embed_dtv<T: Element>(&self, counts: CsVecView<'_, T>) -> Result<Vec<F>> {
        let weighted = self.weighting().weigh_vector(counts)?;
        Ok(self.project(weighted.view()))
    }

    /// Embeds every row of a count matrix. Row `i` of the result is the
    /// embedding of document `i`.
    fn embed_dtm<T: Element>(&self, dtm: &CsMat<T>) -> Result<DMatrix<F>> {
        let weighted = self.weighting().weigh_matrix(dtm)?;
        let rows: Vec<CsVecView<'_, F>> = weighted.outer_iterator().collect();
        let embedded: Vec<Vec<F>> = rows.par_iter().map(|row| self.project(row.view())).collect();
        let k = self.dims();
        Ok(DMatrix::from_fn(embedded.len(), k, |i, r| embedded[i][r]))
    }

    /// # Errors
    /// [`Error::UnknownTerm`]
    fn get_vector(&self, word: &str) -> Result<Vec<F>> {
        Ok(self.column_vector(self.index(word)?))
    }

    /// # Errors
    /// [`Error::UnknownTerm`]
    fn embed_word(&self, word: &str) -> Result<Vec<F>> {
        Ok(self.column_embedding(self.index(word)?))
    }

    /// Maps an embedding into the space documents are compared in.
    ///
    /// Identity unless the embedding axes carry unequal weight.
    fn comparable(&self, embedding: Vec<F>) -> Vec<F> {
        embedding
    }

    /// Cosine similarity of two documents, compared through [`EmbeddingModel::comparable`].
    fn similarity<A, B>(&self, a: &A, b: &B) -> F
    where
        A: TermSource + ?Sized,
        B: TermSource + ?Sized,
    {
        cosine(&self.comparable(self.embed(a)), &self.comparable(self.embed(b)))
    }

    /// The `n` documents of `docs` closest to `query`, best first.
    fn cosine<D, Q>(&self, docs: &[D], query: &Q, n: usize) -> Hits<F>
    where
        D: TermSource + Sync,
        Q: TermSource + ?Sized,
    {
        let q = self.comparable(self.embed(query));
        let scores: Vec<F> = docs
            .par_iter()
            .map(|doc| cosine(&self.comparable(self.embed(doc)), &q))
            .collect();
        Hits::top_n(&scores, n)
    }

    /// [`EmbeddingModel::cosine`] over the rows of a count matrix.
    ///
    /// # Errors
    /// [`Error::DimensionMismatch`] when `dtm` is not vocabulary wide.
    fn cosine_dtm<T, Q>(&self, dtm: &CsMat<T>, query: &Q, n: usize) -> Result<Hits<F>>
    where
        T: Element,
        Q: TermSource + ?Sized,
    {
        let embedded = self.embed_dtm(dtm)?;
        let q = self.comparable(self.embed(query));
        let scores: Vec<F> = (0..embedded.nrows())
            .into_par_iter()
            .map(|i| {
                let row: Vec<F> = embedded.row(i).iter().copied().collect();
                cosine(&self.comparable(row), &q)
            })
            .collect();
        Ok(Hits::top_n(&scores, n))
    }
}

/// Which projection a model uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Lsa,
    Rp,
}

impl ModelKind {
    pub fn symbol(&self) -> &'static str {
        match self {
            ModelKind::Lsa => "lsa",
            ModelKind::Rp => "rp",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for ModelKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "lsa" => Ok(ModelKind::Lsa),
            "rp" => Ok(ModelKind::Rp),
            other => Err(Error::InvalidParameter(format!(
                "unknown model kind `{other}`, expected lsa or rp"
            ))),
        }
    }
}

/// Either model, as returned by loading a model file of unknown kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "F: FloatElement + Serialize",
    deserialize = "F: FloatElement + Deserialize<'de>"
))]
pub enum AnyModel<F: FloatElement> {
    Lsa(LsaModel<F>),
    Rp(RpModel<F>),
}

impl<F: FloatElement> AnyModel<F> {
    pub fn kind(&self) -> ModelKind {
        match self {
            AnyModel::Lsa(_) => ModelKind::Lsa,
            AnyModel::Rp(_) => ModelKind::Rp,
        }
    }

    pub fn as_lsa(&self) -> Option<&LsaModel<F>> {
        match self {
            AnyModel::Lsa(model) => Some(model),
            AnyModel::Rp(_) => None,
        }
    }

    pub fn as_rp(&self) -> Option<&RpModel<F>> {
        match self {
            AnyModel::Rp(model) => Some(model),
            AnyModel::Lsa(_) => None,
        }
    }
}

impl<F: FloatElement> From<LsaModel<F>> for AnyModel<F> {
    fn from(model: LsaModel<F>) -> Self {
        AnyModel::Lsa(model)
    }
}

impl<F: FloatElement> From<RpModel<F>> for AnyModel<F> {
    fn from(model: RpModel<F>) -> Self {
        AnyModel::Rp(model)
    }
}

impl<F: FloatElement> EmbeddingModel<F> for AnyModel<F> {
    fn lexicon(&self) -> &Lexicon {
        match self {
            AnyModel::Lsa(m) => m.lexicon(),
            AnyModel::Rp(m) => m.lexicon(),
        }
    }

    fn weighting(&self) -> &WeightingState<F> {
        match self {
            AnyModel::Lsa(m) => m.weighting(),
            AnyModel::Rp(m) => m.weighting(),
        }
    }

    fn dims(&self) -> usize {
        match self {
            AnyModel::Lsa(m) => m.dims(),
            AnyModel::Rp(m) => m.dims(),
        }
    }

    fn project(&self, weighted: CsVecView<'_, F>) -> Vec<F> {
        match self {
            AnyModel::Lsa(m) => m.project(weighted),
            AnyModel::Rp(m) => m.project(weighted),
        }
    }

    fn column_vector(&self, j: usize) -> Vec<F> {
        match self {
            AnyModel::Lsa(m) => m.column_vector(j),
            AnyModel::Rp(m) => m.column_vector(j),
        }
    }

    fn column_embedding(&self, j: usize) -> Vec<F> {
        match self {
            AnyModel::Lsa(m) => m.column_embedding(j),
            AnyModel::Rp(m) => m.column_embedding(j),
        }
    }

    fn comparable(&self, embedding: Vec<F>) -> Vec<F> {
        match self {
            AnyModel::Lsa(m) => m.comparable(embedding),
            AnyModel::Rp(m) => m.comparable(embedding),
        }
    }
}
