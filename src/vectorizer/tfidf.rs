use std::fmt;
use std::str::FromStr;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use sprs::{CsMat, CsVec, CsVecView};
use tracing::{debug, trace};

use crate::config::{Bm25Params, DefaultFloat};
use crate::error::{Error, Result};
use crate::utils::element::{Element, FloatElement};
use crate::utils::math::vector::sparse_sum;
use crate::vectorizer::{as_csr, map_entries};

/// Weighting applied to raw counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stats {
    /// `count / row_sum`
    Tf,
    /// `tf * idf`
    #[default]
    TfIdf,
    /// Okapi BM25
    Bm25,
}

impl Stats {
    pub fn symbol(&self) -> &'static str {
        match self {
            Stats::Tf => "tf",
            Stats::TfIdf => "tfidf",
            Stats::Bm25 => "bm25",
        }
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Stats {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tf" => Ok(Stats::Tf),
            "tfidf" => Ok(Stats::TfIdf),
            "bm25" => Ok(Stats::Bm25),
            other => Err(Error::InvalidParameter(format!(
                "unknown weighting `{other}`, expected tf, tfidf or bm25"
            ))),
        }
    }
}

/// idf[j] = ln((1 + m) / (1 + df[j])) + 1
#[inline]
pub fn idf_value(documents: usize, document_frequency: usize) -> f64 {
    ((1.0 + documents as f64) / (1.0 + document_frequency as f64)).ln() + 1.0
}

/// Weight of a single stored count.
///
/// # Arguments
/// * `stats` - weighting kind
/// * `count` - raw count of the term in the document
/// * `doc_len` - sum of the document's counts
/// * `idf` - idf of the term (ignored by `Tf`)
/// * `avg_len` - mean document length of the training matrix (BM25 only)
#[inline]
pub fn weigh(stats: Stats, count: f64, doc_len: f64, idf: f64, avg_len: f64, bm25: &Bm25Params) -> f64 {
    if count == 0.0 {
        return 0.0;
    }
    match stats {
        Stats::Tf => {
            if doc_len == 0.0 {
                0.0
            } else {
                count / doc_len
            }
        }
        Stats::TfIdf => {
            if doc_len == 0.0 {
                0.0
            } else {
                count / doc_len * idf
            }
        }
        Stats::Bm25 => {
            let ratio = if avg_len == 0.0 { 0.0 } else { doc_len / avg_len };
            let Bm25Params { kappa, beta } = *bm25;
            let denom = kappa * (1.0 - beta + beta * ratio) + count;
            if denom == 0.0 {
                0.0
            } else {
                idf * ((kappa + 1.0) * count) / denom
            }
        }
    }
}

/// Per-row sums and per-column idf of a count matrix.
#[derive(Debug, Clone)]
struct CountStatistics {
    doc_lengths: Vec<f64>,
    idf: Vec<f64>,
    avg_doc_length: f64,
}

impl CountStatistics {
    fn of<T: Element>(dtm: &CsMat<T>) -> Self {
        let dtm = as_csr(dtm);
        let (m, n) = (dtm.rows(), dtm.cols());
        let mut df = vec![0usize; n];
        let mut doc_lengths = Vec::with_capacity(m);
        for row in dtm.outer_iterator() {
            for (col, value) in row.iter() {
                if !value.is_zero() {
                    df[col] += 1;
                }
            }
            doc_lengths.push(sparse_sum(row));
        }
        let idf = df.iter().map(|&d| idf_value(m, d)).collect();
        let avg_doc_length = if m == 0 {
            0.0
        } else {
            doc_lengths.iter().sum::<f64>() / m as f64
        };
        Self {
            doc_lengths,
            idf,
            avg_doc_length,
        }
    }
}

/// Row sums of a count matrix.
pub fn document_lengths<T: Element>(dtm: &CsMat<T>) -> Vec<f64> {
    as_csr(dtm).outer_iterator().map(sparse_sum).collect()
}

/// Idf of every column of a count matrix.
pub fn idf<T: Element>(dtm: &CsMat<T>) -> Vec<f64> {
    CountStatistics::of(dtm).idf
}

/// Weighted values of every stored entry, row by row, in storage order.
fn weighted_rows<T: Element>(dtm: &CsMat<T>, stats: Stats, bm25: &Bm25Params) -> Vec<Vec<(usize, f64)>> {
    let counts = CountStatistics::of(dtm);
    as_csr(dtm)
        .outer_iterator()
        .enumerate()
        .map(|(row, vec)| {
            let doc_len = counts.doc_lengths[row];
            vec.iter()
                .map(|(col, value)| {
                    let w = weigh(stats, value.as_f64(), doc_len, counts.idf[col], counts.avg_doc_length, bm25);
                    (col, w)
                })
                .collect()
        })
        .collect()
}

fn transform<T: Element, F: FloatElement>(dtm: &CsMat<T>, stats: Stats, bm25: &Bm25Params) -> CsMat<F> {
    let counts = CountStatistics::of(dtm);
    map_entries(dtm, |row, col, value| {
        F::from_f64_lossy(weigh(
            stats,
            value.as_f64(),
            counts.doc_lengths[row],
            counts.idf[col],
            counts.avg_doc_length,
            bm25,
        ))
    })
}

fn transform_inplace<T: Element>(dtm: &mut CsMat<T>, stats: Stats, bm25: &Bm25Params) -> Result<()> {
    if !T::IS_FLOAT {
        return Err(Error::TypeMismatch(format!(
            "in-place {stats} weighting needs a floating point matrix, found `{}`",
            T::NAME
        )));
    }
    if !dtm.is_csr() {
        return Err(Error::TypeMismatch(
            "in-place weighting needs CSR storage".to_string(),
        ));
    }
    let rows = weighted_rows(dtm, stats, bm25);
    for (slot, (_, w)) in dtm.data_mut().iter_mut().zip(rows.into_iter().flatten()) {
        *slot = T::from_f64_lossy(w);
    }
    trace!(%stats, "weighted matrix in place");
    Ok(())
}

fn transform_into<T, F, O>(dtm: &CsMat<T>, out: &mut O, stats: Stats, bm25: &Bm25Params) -> Result<()>
where
    T: Element,
    F: FloatElement,
    O: WeightOutput<F> + ?Sized,
{
    let expected = (dtm.rows(), dtm.cols());
    if out.shape() != expected {
        return Err(Error::DimensionMismatch(format!(
            "output is {:?}, count matrix is {:?}",
            out.shape(),
            expected
        )));
    }
    let rows = weighted_rows(dtm, stats, bm25)
        .into_iter()
        .map(|row| row.into_iter().map(|(col, w)| (col, F::from_f64_lossy(w))).collect())
        .collect();
    let dropped = out.store_rows(rows)?;
    if dropped > 0 {
        debug!(dropped, %stats, "weighted entries outside the output's stored structure were not written");
    }
    Ok(())
}

/// Destination of the `*_into` weighting functions.
///
/// Dense outputs are fully overwritten. Sparse outputs keep their stored
/// structure: an entry is only written if the output already stores that
/// position; other positions are skipped without error.
pub trait WeightOutput<F> {
    /// (rows, cols)
    fn shape(&self) -> (usize, usize);

    /// Writes `rows[i]` (column, value pairs) into row `i` and returns the
    /// number of entries that could not be stored.
    fn store_rows(&mut self, rows: Vec<Vec<(usize, F)>>) -> Result<usize>;
}

impl<F: FloatElement> WeightOutput<F> for CsMat<F> {
    fn shape(&self) -> (usize, usize) {
        (self.rows(), self.cols())
    }

    fn store_rows(&mut self, rows: Vec<Vec<(usize, F)>>) -> Result<usize> {
        if !self.is_csr() {
            return Err(Error::TypeMismatch(
                "sparse weighting output must use CSR storage".to_string(),
            ));
        }
        // column layout of each stored row, with its offset into `data`
        let mut layout: Vec<(usize, Vec<usize>)> = Vec::with_capacity(self.rows());
        let mut offset = 0;
        for row in self.outer_iterator() {
            layout.push((offset, row.indices().to_vec()));
            offset += row.nnz();
        }
        let data = self.data_mut();
        let mut dropped = 0;
        for ((start, cols), entries) in layout.iter().zip(rows) {
            for (col, value) in entries {
                match cols.binary_search(&col) {
                    Ok(pos) => data[start + pos] = value,
                    Err(_) => dropped += 1,
                }
            }
        }
        Ok(dropped)
    }
}

impl<F: FloatElement> WeightOutput<F> for DMatrix<F> {
    fn shape(&self) -> (usize, usize) {
        (self.nrows(), self.ncols())
    }

    fn store_rows(&mut self, rows: Vec<Vec<(usize, F)>>) -> Result<usize> {
        self.fill(F::zero());
        for (row, entries) in rows.into_iter().enumerate() {
            for (col, value) in entries {
                self[(row, col)] = value;
            }
        }
        Ok(0)
    }
}

/// Term frequency: each count divided by its row sum.
pub fn tf<T: Element>(dtm: &CsMat<T>) -> CsMat<DefaultFloat> {
    tf_as(dtm)
}

/// [`tf`] with a chosen output element type.
pub fn tf_as<T: Element, F: FloatElement>(dtm: &CsMat<T>) -> CsMat<F> {
    transform(dtm, Stats::Tf, &Bm25Params::default())
}

/// Overwrites a floating point count matrix with its term frequencies.
///
/// # Errors
/// [`Error::TypeMismatch`] for integer or CSC matrices.
pub fn tf_inplace<T: Element>(dtm: &mut CsMat<T>) -> Result<()> {
    transform_inplace(dtm, Stats::Tf, &Bm25Params::default())
}

/// Writes term frequencies into `out`; see [`WeightOutput`].
pub fn tf_into<T, F, O>(dtm: &CsMat<T>, out: &mut O) -> Result<()>
where
    T: Element,
    F: FloatElement,
    O: WeightOutput<F> + ?Sized,
{
    transform_into(dtm, out, Stats::Tf, &Bm25Params::default())
}

/// TF-IDF: `tf * idf`, with idf taken from the same matrix.
pub fn tfidf<T: Element>(dtm: &CsMat<T>) -> CsMat<DefaultFloat> {
    tfidf_as(dtm)
}

pub fn tfidf_as<T: Element, F: FloatElement>(dtm: &CsMat<T>) -> CsMat<F> {
    transform(dtm, Stats::TfIdf, &Bm25Params::default())
}

pub fn tfidf_inplace<T: Element>(dtm: &mut CsMat<T>) -> Result<()> {
    transform_inplace(dtm, Stats::TfIdf, &Bm25Params::default())
}

pub fn tfidf_into<T, F, O>(dtm: &CsMat<T>, out: &mut O) -> Result<()>
where
    T: Element,
    F: FloatElement,
    O: WeightOutput<F> + ?Sized,
{
    transform_into(dtm, out, Stats::TfIdf, &Bm25Params::default())
}

/// Okapi BM25 with the given saturation and length normalization.
pub fn bm25<T: Element>(dtm: &CsMat<T>, params: Bm25Params) -> CsMat<DefaultFloat> {
    bm25_as(dtm, params)
}

pub fn bm25_as<T: Element, F: FloatElement>(dtm: &CsMat<T>, params: Bm25Params) -> CsMat<F> {
    transform(dtm, Stats::Bm25, &params)
}

pub fn bm25_inplace<T: Element>(dtm: &mut CsMat<T>, params: Bm25Params) -> Result<()> {
    transform_inplace(dtm, Stats::Bm25, &params)
}

pub fn bm25_into<T, F, O>(dtm: &CsMat<T>, out: &mut O, params: Bm25Params) -> Result<()>
where
    T: Element,
    F: FloatElement,
    O: WeightOutput<F> + ?Sized,
{
    transform_into(dtm, out, Stats::Bm25, &params)
}

/// Weighting captured from a training matrix.
///
/// Models keep one so that a query document is weighted with the idf and
/// average length of the documents the model was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightingState<F> {
    pub stats: Stats,
    pub idf: Vec<F>,
    pub avg_doc_length: F,
    pub bm25: Bm25Params,
}

impl<F: FloatElement> WeightingState<F> {
    pub fn fit<T: Element>(dtm: &CsMat<T>, stats: Stats, bm25: Bm25Params) -> Self {
        let counts = CountStatistics::of(dtm);
        Self {
            stats,
            idf: counts.idf.into_iter().map(F::from_f64_lossy).collect(),
            avg_doc_length: F::from_f64_lossy(counts.avg_doc_length),
            bm25,
        }
    }

    /// Same state with another element type.
    pub fn cast<G: FloatElement>(&self) -> WeightingState<G> {
        WeightingState {
            stats: self.stats,
            idf: self.idf.iter().map(|v| G::from_f64_lossy(v.as_f64())).collect(),
            avg_doc_length: G::from_f64_lossy(self.avg_doc_length.as_f64()),
            bm25: self.bm25,
        }
    }

    /// Number of terms the state was fitted on.
    #[inline]
    pub fn dim(&self) -> usize {
        self.idf.len()
    }

    /// Weighted copy of one count vector.
    ///
    /// # Errors
    /// [`Error::DimensionMismatch`] when the vector length differs from the
    /// fitted vocabulary.
    pub fn weigh_vector<T: Element>(&self, counts: CsVecView<'_, T>) -> Result<CsVec<F>> {
        if counts.dim() != self.dim() {
            return Err(Error::DimensionMismatch(format!(
                "count vector has {} entries, vocabulary has {}",
                counts.dim(),
                self.dim()
            )));
        }
        Ok(self.weigh_counts(counts))
    }

    /// [`WeightingState::weigh_vector`] without the length check. Columns
    /// beyond the fitted vocabulary get an idf of 1.
    pub fn weigh_counts<T: Element>(&self, counts: CsVecView<'_, T>) -> CsVec<F> {
        let doc_len = sparse_sum(counts.view());
        let avg = self.avg_doc_length.as_f64();
        let (indices, data): (Vec<usize>, Vec<F>) = counts
            .iter()
            .map(|(col, value)| {
                let idf = self.idf.get(col).map_or(1.0, |v| v.as_f64());
                let w = weigh(self.stats, value.as_f64(), doc_len, idf, avg, &self.bm25);
                (col, F::from_f64_lossy(w))
            })
            .unzip();
        CsVec::new(counts.dim(), indices, data)
    }

    /// Weighted copy of a count matrix, rows weighted independently.
    pub fn weigh_matrix<T: Element>(&self, dtm: &CsMat<T>) -> Result<CsMat<F>> {
        if dtm.cols() != self.dim() {
            return Err(Error::DimensionMismatch(format!(
                "count matrix has {} columns, vocabulary has {}",
                dtm.cols(),
                self.dim()
            )));
        }
        let lengths = document_lengths(dtm);
        let avg = self.avg_doc_length.as_f64();
        Ok(map_entries(dtm, |row, col, value| {
            let w = weigh(self.stats, value.as_f64(), lengths[row], self.idf[col].as_f64(), avg, &self.bm25);
            F::from_f64_lossy(w)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprs::TriMat;

    /// 3 x 4 counts, last row empty
    fn counts() -> CsMat<i64> {
        let mut tri = TriMat::new((3, 4));
        tri.add_triplet(0, 0, 2);
        tri.add_triplet(0, 1, 1);
        tri.add_triplet(0, 3, 1);
        tri.add_triplet(1, 1, 3);
        tri.add_triplet(1, 2, 1);
        tri.to_csr()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn stats_symbols_roundtrip() {
        for stats in [Stats::Tf, Stats::TfIdf, Stats::Bm25] {
            assert_eq!(stats.to_string().parse::<Stats>().unwrap(), stats);
        }
        assert!(matches!("idf".parse::<Stats>(), Err(Error::InvalidParameter(_))));
        assert_eq!(serde_json::to_string(&Stats::TfIdf).unwrap(), "\"tfidf\"");
    }

    #[test]
    fn tf_rows_sum_to_one_and_empty_rows_stay_empty() {
        let w = tf(&counts());
        let sums: Vec<f64> = w.outer_iterator().map(sparse_sum).collect();
        assert!(approx(sums[0], 1.0));
        assert!(approx(sums[1], 1.0));
        assert_eq!(sums[2], 0.0);
        assert_eq!(w.outer_view(2).map(|r| r.nnz()), Some(0));
    }

    #[test]
    fn tfidf_keeps_structure_and_uses_smoothed_idf() {
        let c = counts();
        let w = tfidf(&c);
        assert_eq!(w.indices(), c.indices());
        for (a, b) in w.outer_iterator().zip(c.outer_iterator()) {
            assert_eq!(a.nnz(), b.nnz());
        }
        // term 1 appears in 2 of 3 documents
        let idf1 = (4.0f64 / 3.0).ln() + 1.0;
        assert!(approx(idf(&c)[1], idf1));
        let row1 = w.outer_view(1).unwrap();
        assert!(approx(*row1.get(1).unwrap(), 0.75 * idf1));
    }

    #[test]
    fn bm25_matches_formula() {
        let c = counts();
        let w = bm25(&c, Bm25Params::default());
        // avg length (4 + 4 + 0) / 3
        let avg = 8.0 / 3.0;
        let idf0 = (4.0f64 / 2.0).ln() + 1.0;
        let expected = idf0 * (3.0 * 2.0) / (2.0 * (1.0 - 0.75 + 0.75 * 4.0 / avg) + 2.0);
        assert!(approx(*w.outer_view(0).unwrap().get(0).unwrap(), expected));

        let flat = bm25(&c, Bm25Params::new(1.2, 0.0));
        let expected_flat = idf0 * (2.2 * 2.0) / (1.2 + 2.0);
        assert!(approx(*flat.outer_view(0).unwrap().get(0).unwrap(), expected_flat));
    }

    #[test]
    fn element_type_is_selectable() {
        let w32: CsMat<f32> = tfidf_as(&counts());
        let w64 = tfidf(&counts());
        for (a, b) in w32.data().iter().zip(w64.data()) {
            assert!((*a as f64 - b).abs() < 1e-6);
        }
    }

    #[test]
    fn inplace_requires_float_elements() {
        let mut ints = counts();
        assert!(matches!(tf_inplace(&mut ints), Err(Error::TypeMismatch(_))));
        assert!(matches!(
            bm25_inplace(&mut ints, Bm25Params::default()),
            Err(Error::TypeMismatch(_))
        ));
        // untouched
        assert_eq!(ints, counts());
    }

    #[test]
    fn inplace_matches_pure() {
        let mut floats: CsMat<f64> = map_entries(&counts(), |_, _, v| v as f64);
        tfidf_inplace(&mut floats).unwrap();
        assert_eq!(floats, tfidf(&counts()));
    }

    #[test]
    fn into_dense_output() {
        let c = counts();
        let mut out = DMatrix::<f64>::from_element(3, 4, 9.0);
        tf_into(&c, &mut out).unwrap();
        assert!(approx(out[(0, 0)], 0.5));
        assert_eq!(out[(0, 2)], 0.0);
        assert_eq!(out[(2, 3)], 0.0);

        let mut wrong = DMatrix::<f64>::zeros(2, 4);
        assert!(matches!(tf_into(&c, &mut wrong), Err(Error::DimensionMismatch(_))));
    }

    #[test]
    fn into_sparse_output_only_writes_stored_positions() {
        let c = counts();
        // stores (0,0) and (1,0) only; (1,0) is zero in the counts
        let mut out: CsMat<f32> = CsMat::new((3, 4), vec![0, 1, 2, 2], vec![0, 0], vec![-1.0, -1.0]);
        tf_into(&c, &mut out).unwrap();
        assert_eq!(out.nnz(), 2);
        assert!((out.data()[0] - 0.5).abs() < 1e-6);
        // not part of the weighted structure, left as it was
        assert_eq!(out.data()[1], -1.0);
        assert_eq!(out.outer_view(0).unwrap().get(1), None);
    }

    #[test]
    fn weighting_state_reproduces_matrix_weighting() {
        let c = counts();
        let state: WeightingState<f64> = WeightingState::fit(&c, Stats::Bm25, Bm25Params::default());
        assert_eq!(state.dim(), 4);
        let expected = bm25(&c, Bm25Params::default());
        assert_eq!(state.weigh_matrix(&c).unwrap(), expected);
        let row = state.weigh_vector(c.outer_view(1).unwrap()).unwrap();
        assert_eq!(row, expected.outer_view(1).unwrap().to_owned());

        let short = CsVec::new(2, vec![0], vec![1i64]);
        assert!(matches!(state.weigh_vector(short.view()), Err(Error::DimensionMismatch(_))));
    }
}
