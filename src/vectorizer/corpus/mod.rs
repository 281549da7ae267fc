use std::ops::Index;

use indexmap::IndexMap;
use sprs::{CsMat, CsVec};
use tracing::debug;

use crate::error::{Error, Result};
use crate::utils::element::Element;
use crate::vectorizer::document::{Document, TermSource};
use crate::vectorizer::hash::TextHashFunction;
use crate::vectorizer::lexicon::Lexicon;
use crate::vectorizer::token::TermFrequency;
use crate::vectorizer::{each_dtv, each_hash_dtv, hash_dtm, DocumentTermMatrix};

/// An ordered collection of documents.
///
/// Besides the documents it keeps:
/// - an optional lexicon (term -> number of occurrences in the whole corpus),
///   built on demand by [`Corpus::update_lexicon`]
/// - the text hash function used by the hashed matrix builders
///
/// Once a lexicon exists, [`Corpus::push`] keeps it current.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    documents: Vec<Document>,
    lexicon: Option<IndexMap<String, u64>>,
    hash_function: TextHashFunction,
}

/// Building and editing
impl Corpus {
    pub fn new(documents: Vec<Document>) -> Self {
        Self {
            documents,
            lexicon: None,
            hash_function: TextHashFunction::default(),
        }
    }

    pub fn with_hash_function(mut self, hash_function: TextHashFunction) -> Self {
        self.hash_function = hash_function;
        self
    }

    pub fn push(&mut self, document: impl Into<Document>) {
        let document = document.into();
        if let Some(lexicon) = self.lexicon.as_mut() {
            for (term, count) in document.terms().iter() {
                *lexicon.entry(term.to_string()).or_insert(0) += count;
            }
        }
        self.documents.push(document);
    }

    /// Counts every term of every document into the corpus lexicon,
    /// replacing a previous one.
    pub fn update_lexicon(&mut self) {
        let mut lexicon: IndexMap<String, u64> = IndexMap::new();
        for doc in &self.documents {
            for (term, count) in doc.terms().iter() {
                *lexicon.entry(term.to_string()).or_insert(0) += count;
            }
        }
        debug!(
            documents = self.documents.len(),
            terms = lexicon.len(),
            "updated corpus lexicon"
        );
        self.lexicon = Some(lexicon);
    }
}

/// Queries
impl Corpus {
    #[inline]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Document> {
        self.documents.get(index)
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Document> {
        self.documents.iter()
    }

    #[inline]
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    #[inline]
    pub fn hash_function(&self) -> &TextHashFunction {
        &self.hash_function
    }

    /// Corpus frequency of `term`, if a lexicon was built.
    pub fn lexicon_count(&self, term: &str) -> Option<u64> {
        self.lexicon
            .as_ref()
            .map(|lex| lex.get(term).copied().unwrap_or(0))
    }

    /// Sorted lexicon of the corpus.
    pub fn lexicon(&self) -> Result<Lexicon> {
        self.lexicon
            .as_ref()
            .map(|lex| Lexicon::sorted(lex.keys().cloned()))
            .ok_or(Error::LexiconRequired)
    }

    /// Terms that occur in more than `alpha` of the documents.
    pub fn frequent_terms(&self, alpha: f64) -> Vec<String> {
        self.split_by_document_ratio(alpha, true)
    }

    /// Terms that occur in at most `alpha` of the documents.
    pub fn sparse_terms(&self, alpha: f64) -> Vec<String> {
        self.split_by_document_ratio(alpha, false)
    }

    fn split_by_document_ratio(&self, alpha: f64, frequent: bool) -> Vec<String> {
        if self.documents.is_empty() {
            return Vec::new();
        }
        let mut df: IndexMap<String, u64> = IndexMap::new();
        for doc in &self.documents {
            for (term, _) in doc.terms().iter() {
                *df.entry(term.to_string()).or_insert(0) += 1;
            }
        }
        let m = self.documents.len() as f64;
        let mut terms: Vec<String> = df
            .into_iter()
            .filter(|(_, count)| (*count as f64 / m > alpha) == frequent)
            .map(|(term, _)| term)
            .collect();
        terms.sort_unstable();
        terms
    }
}

/// Matrix building
impl Corpus {
    /// Document-term matrix over the corpus lexicon.
    ///
    /// # Errors
    /// [`Error::LexiconRequired`] when [`Corpus::update_lexicon`] was never called.
    pub fn dtm<T: Element>(&self) -> Result<DocumentTermMatrix<T>> {
        let lexicon = self.lexicon()?;
        Ok(DocumentTermMatrix::new(&self.documents, lexicon))
    }

    /// Hashed count matrix using the corpus hash function.
    pub fn hash_dtm<T: Element>(&self) -> CsMat<T> {
        hash_dtm(&self.documents, &self.hash_function)
    }

    /// Lazy count vectors over `lexicon`; see [`Corpus::lexicon`].
    pub fn each_dtv<'a, T: Element>(
        &'a self,
        lexicon: &'a Lexicon,
    ) -> impl Iterator<Item = CsVec<T>> + 'a {
        each_dtv(&self.documents, lexicon)
    }

    pub fn each_hash_dtv<T: Element>(&self) -> impl Iterator<Item = CsVec<T>> + '_ {
        each_hash_dtv(&self.documents, self.hash_function)
    }
}

impl Index<usize> for Corpus {
    type Output = Document;

    fn index(&self, index: usize) -> &Document {
        &self.documents[index]
    }
}

impl<D: Into<Document>> FromIterator<D> for Corpus {
    fn from_iter<I: IntoIterator<Item = D>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

impl<'a> IntoIterator for &'a Corpus {
    type Item = &'a Document;
    type IntoIter = std::slice::Iter<'a, Document>;

    fn into_iter(self) -> Self::IntoIter {
        self.documents.iter()
    }
}

impl TermSource for Corpus {
    /// Term multiset of all documents together.
    fn term_frequency(&self) -> TermFrequency {
        let mut total = TermFrequency::new();
        for doc in &self.documents {
            total.add_terms_from_freq(&doc.terms());
        }
        total
    }
}
