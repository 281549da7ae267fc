pub mod corpus;
pub mod document;
pub mod evaluate;
pub mod hash;
pub mod lexicon;
pub mod serde;
pub mod tfidf;
pub mod token;

use std::borrow::Cow;
use std::collections::BTreeMap;

use ::serde::{Deserialize, Serialize};
use rayon::prelude::*;
use sprs::{CsMat, CsVec, CsVecView};
use tracing::debug;

use crate::config::DefaultDtmType;
use crate::utils::element::Element;
use crate::vectorizer::document::TermSource;
use crate::vectorizer::hash::TextHashFunction;
use crate::vectorizer::lexicon::Lexicon;

/// Document-term matrix paired with the lexicon that defines its columns.
///
/// Row `i` is the count vector of document `i`, column `j` is the term at
/// position `j` of `lexicon`. The matrix is always stored as CSR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentTermMatrix<T = DefaultDtmType> {
    pub dtm: CsMat<T>,
    pub lexicon: Lexicon,
}

impl<T: Element> DocumentTermMatrix<T> {
    /// Builds the count matrix of `documents` over `lexicon`.
    pub fn new<D>(documents: &[D], lexicon: Lexicon) -> Self
    where
        D: TermSource + Sync,
    {
        let rows: Vec<CsVec<T>> = documents
            .par_iter()
            .map(|doc| dtv(doc, &lexicon))
            .collect();
        let dtm = stack_rows(&rows, lexicon.len());
        debug!(
            documents = dtm.rows(),
            terms = dtm.cols(),
            nnz = dtm.nnz(),
            "built document-term matrix"
        );
        Self { dtm, lexicon }
    }

    /// (documents, terms)
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.dtm.rows(), self.dtm.cols())
    }

    /// Terms in column order.
    pub fn terms(&self) -> Vec<&str> {
        self.lexicon.terms().collect()
    }

    /// Column of `term`, if it is part of the lexicon.
    #[inline]
    pub fn column_index(&self, term: &str) -> Option<usize> {
        self.lexicon.index_of(term)
    }

    /// Count vector of document `i`.
    pub fn row(&self, i: usize) -> Option<CsVecView<'_, T>> {
        self.dtm.outer_view(i)
    }

    #[inline]
    pub fn matrix(&self) -> &CsMat<T> {
        &self.dtm
    }

    #[inline]
    pub fn into_parts(self) -> (CsMat<T>, Lexicon) {
        (self.dtm, self.lexicon)
    }

    /// Same matrix with a different element type. Values that do not fit
    /// the target type become zero.
    pub fn convert<U: Element>(&self) -> DocumentTermMatrix<U> {
        DocumentTermMatrix {
            dtm: map_entries(&self.dtm, |_, _, v| U::from_f64_lossy(v.as_f64())),
            lexicon: self.lexicon.clone(),
        }
    }
}

/// Count vector of one document over `lexicon`.
///
/// Terms missing from the lexicon are ignored; the result always has
/// `lexicon.len()` dimensions.
pub fn dtv<T, D>(doc: &D, lexicon: &Lexicon) -> CsVec<T>
where
    T: Element,
    D: TermSource + ?Sized,
{
    let freq = doc.term_frequency();
    let mut entries: Vec<(usize, T)> = freq
        .iter()
        .filter_map(|(term, count)| {
            lexicon
                .index_of(term)
                .map(|idx| (idx, T::from_count(count)))
        })
        .filter(|(_, value)| !value.is_zero())
        .collect();
    entries.sort_unstable_by_key(|(idx, _)| *idx);
    let (indices, data): (Vec<usize>, Vec<T>) = entries.into_iter().unzip();
    CsVec::new(lexicon.len(), indices, data)
}

/// Count vector of one document using the hash trick.
///
/// The result has `hash_function.cardinality()` dimensions; terms sharing a
/// bucket add up.
pub fn hash_dtv<T, D>(doc: &D, hash_function: &TextHashFunction) -> CsVec<T>
where
    T: Element,
    D: TermSource + ?Sized,
{
    let mut buckets: BTreeMap<usize, u64> = BTreeMap::new();
    for (term, count) in doc.term_frequency().iter() {
        *buckets.entry(hash_function.index(term)).or_insert(0) += count;
    }
    let (indices, data): (Vec<usize>, Vec<T>) = buckets
        .into_iter()
        .map(|(idx, count)| (idx, T::from_count(count)))
        .filter(|(_, value)| !value.is_zero())
        .unzip();
    CsVec::new(hash_function.cardinality(), indices, data)
}

/// Document-term matrix of `documents` over `lexicon`.
pub fn dtm<T, D>(documents: &[D], lexicon: &Lexicon) -> DocumentTermMatrix<T>
where
    T: Element,
    D: TermSource + Sync,
{
    DocumentTermMatrix::new(documents, lexicon.clone())
}

/// Hashed count matrix: `documents.len() x cardinality`.
pub fn hash_dtm<T, D>(documents: &[D], hash_function: &TextHashFunction) -> CsMat<T>
where
    T: Element,
    D: TermSource + Sync,
{
    let rows: Vec<CsVec<T>> = documents
        .par_iter()
        .map(|doc| hash_dtv(doc, hash_function))
        .collect();
    let m = stack_rows(&rows, hash_function.cardinality());
    debug!(
        documents = m.rows(),
        buckets = m.cols(),
        nnz = m.nnz(),
        "built hashed document-term matrix"
    );
    m
}

/// Lazily yields the count vector of each document.
///
/// Nothing is computed until the iterator is advanced. Call again to start
/// over.
pub fn each_dtv<'a, T, I>(documents: I, lexicon: &'a Lexicon) -> impl Iterator<Item = CsVec<T>> + 'a
where
    T: Element,
    I: IntoIterator + 'a,
    I::IntoIter: 'a,
    I::Item: TermSource,
{
    documents.into_iter().map(move |doc| dtv(&doc, lexicon))
}

/// Lazy counterpart of [`hash_dtm`].
pub fn each_hash_dtv<T, I>(
    documents: I,
    hash_function: TextHashFunction,
) -> impl Iterator<Item = CsVec<T>>
where
    T: Element,
    I: IntoIterator,
    I::Item: TermSource,
{
    documents
        .into_iter()
        .map(move |doc| hash_dtv(&doc, &hash_function))
}

/// Stacks sparse rows into a CSR matrix with `cols` columns.
pub(crate) fn stack_rows<T: Element>(rows: &[CsVec<T>], cols: usize) -> CsMat<T> {
    let nnz: usize = rows.iter().map(|r| r.nnz()).sum();
    let mut indptr = Vec::with_capacity(rows.len() + 1);
    let mut indices = Vec::with_capacity(nnz);
    let mut data = Vec::with_capacity(nnz);
    indptr.push(0);
    for row in rows {
        indices.extend_from_slice(row.indices());
        data.extend_from_slice(row.data());
        indptr.push(indices.len());
    }
    CsMat::new((rows.len(), cols), indptr, indices, data)
}

/// CSR view of `m`, converting only when it is stored as CSC.
pub(crate) fn as_csr<T: Element>(m: &CsMat<T>) -> Cow<'_, CsMat<T>> {
    if m.is_csr() {
        Cow::Borrowed(m)
    } else {
        Cow::Owned(m.to_csr())
    }
}

/// Rebuilds a CSR matrix with the same structure, mapping every stored value.
/// `f` receives `(row, col, value)`.
pub(crate) fn map_entries<T, U, G>(m: &CsMat<T>, mut f: G) -> CsMat<U>
where
    T: Element,
    G: FnMut(usize, usize, T) -> U,
{
    let m = as_csr(m);
    let mut indptr = Vec::with_capacity(m.rows() + 1);
    let mut indices = Vec::with_capacity(m.nnz());
    let mut data = Vec::with_capacity(m.nnz());
    indptr.push(0);
    for (row, vec) in m.outer_iterator().enumerate() {
        for (col, &value) in vec.iter() {
            indices.push(col);
            data.push(f(row, col, value));
        }
        indptr.push(indices.len());
    }
    CsMat::new((m.rows(), m.cols()), indptr, indices, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::math::vector::sparse_sum;
    use crate::vectorizer::document::Document;

    fn docs() -> Vec<Document> {
        vec![
            Document::from("this is a text"),
            Document::from("this is another text text"),
            Document::from("nothing in common"),
        ]
    }

    #[test]
    fn dtv_counts_known_terms_only() {
        let lex = Lexicon::sorted(["a", "is", "text", "this"]);
        let v: CsVec<i64> = dtv("this is a text, a big text", &lex);
        assert_eq!(v.dim(), 4);
        // unknown "big" is ignored
        assert_eq!(sparse_sum(v.view()), 6.0);
        assert_eq!(v.get(lex.index_of("text").unwrap()), Some(&2));
        assert_eq!(v.get(lex.index_of("a").unwrap()), Some(&2));
    }

    #[test]
    fn counts_beyond_the_element_range_saturate() {
        let mut text = "a ".repeat(256);
        text.push('b');
        let lex = Lexicon::sorted(["a", "b"]);
        let v: CsVec<u8> = dtv(text.as_str(), &lex);
        assert_eq!(v.indices(), &[0, 1]);
        assert_eq!(v.data(), &[u8::MAX, 1]);

        let hash = TextHashFunction::with_cardinality(64).unwrap();
        let hashed: CsVec<u8> = hash_dtv(text.as_str(), &hash);
        assert_eq!(hashed.get(hash.index("a")), Some(&u8::MAX));
    }

    #[test]
    fn dtv_of_unrelated_document_is_all_zero() {
        let lex = Lexicon::sorted(["x", "y"]);
        let v: CsVec<u8> = dtv("nothing matches", &lex);
        assert_eq!(v.dim(), 2);
        assert_eq!(v.nnz(), 0);
    }

    #[test]
    fn hash_dtv_is_deterministic_and_sized() {
        let h = TextHashFunction::with_cardinality(7).unwrap();
        let a: CsVec<i32> = hash_dtv("a b c a", &h);
        let b: CsVec<i32> = hash_dtv("a b c a", &h);
        assert_eq!(a, b);
        assert_eq!(a.dim(), 7);
        assert_eq!(sparse_sum(a.view()), 4.0);
    }

    #[test]
    fn hash_dtv_sums_collisions() {
        fn one_bucket(_: &str) -> u64 {
            3
        }
        let h = TextHashFunction::new(one_bucket, 5).unwrap();
        let v: CsVec<i64> = hash_dtv("x y z", &h);
        assert_eq!(v.nnz(), 1);
        assert_eq!(v.get(3), Some(&3));
    }

    #[test]
    fn dtm_rows_match_dtv() {
        let docs = docs();
        let lex = Lexicon::sorted(["a", "another", "is", "text", "this"]);
        let m: DocumentTermMatrix = dtm(&docs, &lex);
        assert_eq!(m.shape(), (3, 5));
        for (i, doc) in docs.iter().enumerate() {
            let expected: CsVec<i64> = dtv(doc, &lex);
            let row = m.row(i).unwrap();
            assert_eq!(row.to_owned(), expected);
        }
        assert_eq!(m.row(1).map(|r| sparse_sum(r)), Some(5.0));
        assert_eq!(m.row(2).map(|r| r.nnz()), Some(0));
        assert!(m.row(3).is_none());
        assert_eq!(m.terms(), vec!["a", "another", "is", "text", "this"]);
        assert_eq!(m.column_index("text"), Some(3));
    }

    #[test]
    fn hash_dtm_shape() {
        let docs = docs();
        let h = TextHashFunction::default();
        let m: CsMat<u32> = hash_dtm(&docs, &h);
        assert_eq!((m.rows(), m.cols()), (3, 100));
        for (i, row) in m.outer_iterator().enumerate() {
            let expected: CsVec<u32> = hash_dtv(&docs[i], &h);
            assert_eq!(row.to_owned(), expected);
        }
    }

    #[test]
    fn each_dtv_is_lazy_and_restartable() {
        let docs = docs();
        let lex = Lexicon::sorted(["text"]);
        let first: Vec<CsVec<i64>> = each_dtv(&docs, &lex).collect();
        let second: Vec<CsVec<i64>> = each_dtv(&docs, &lex).collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
        assert_eq!(first[1].get(0), Some(&2));

        let h = TextHashFunction::with_cardinality(4).unwrap();
        let hashed: Vec<CsVec<i64>> = each_hash_dtv(&docs, h).take(2).collect();
        assert_eq!(hashed.len(), 2);
        assert!(hashed.iter().all(|v| v.dim() == 4));
    }

    #[test]
    fn convert_changes_element_type() {
        let docs = docs();
        let lex = Lexicon::sorted(["text", "this"]);
        let m: DocumentTermMatrix<i64> = dtm(&docs, &lex);
        let f: DocumentTermMatrix<f32> = m.convert();
        assert_eq!(f.shape(), m.shape());
        assert_eq!(f.dtm.data(), &[1.0f32, 1.0, 2.0, 1.0][..]);
    }
}
