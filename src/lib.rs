//! Document-term matrices, statistical weightings and embedding models.
//!
//! Documents become sparse count vectors (over a lexicon or through the hash
//! trick), count matrices are weighted with TF, TF-IDF or BM25, and the
//! weighted matrices train LSA or random projection models that embed new
//! documents and rank them by cosine similarity.
//!
//! ```
//! use dtm_vectorizer::{Corpus, EmbeddingModel, LsaConfig, LsaModel, Stats};
//!
//! let mut corpus: Corpus = ["red apple", "green apple", "yellow banana"].into_iter().collect();
//! corpus.update_lexicon();
//! let dtm = corpus.dtm::<i64>().unwrap();
//!
//! let model: LsaModel = LsaModel::new(&dtm, LsaConfig::default().with_k(2).with_stats(Stats::Tf)).unwrap();
//! let hits = model.cosine(corpus.documents(), "apple", 2);
//! assert_eq!(hits.len(), 2);
//! ```

pub mod config;
pub mod error;
pub mod model;
pub mod utils;
pub mod vectorizer;

/// Error type of every fallible operation in this crate.
///
/// All variants are local and recoverable; nothing is retried or swallowed.
pub use error::{Error, Result};

/// Defaults and per-call parameter sets
/// - `DefaultDtmType` / `DefaultFloat`: element types used when none is given
/// - `DEFAULT_CARDINALITY`: bucket count of the default hash function
/// - `Bm25Params`, `LsaConfig`, `RpConfig`: builder style parameter structs
pub use config::{Bm25Params, DefaultDtmType, DefaultFloat, LsaConfig, RpConfig, DEFAULT_CARDINALITY};

/// Element types
/// `Element` covers every primitive integer plus `f16`, `f32` and `f64`.
/// `FloatElement` is the floating subset used for weighted matrices and
/// model storage.
pub use utils::element::{Element, FloatElement};

/// Term Frequency structure
/// A term multiset for one document.
/// It manages:
/// - The count of occurrences of each term
/// - The total number of terms in the document
///
/// Every vectorizer consumes documents through this view.
pub use vectorizer::token::TermFrequency;

/// Documents
/// `Document` has three variants (raw text, token list, pre-counted n-grams)
/// that all expose the same term multiset and raw text.
/// `TermSource` is implemented for documents, strings, token lists and
/// `TermFrequency`, so any of them can be vectorized directly.
pub use vectorizer::document::{tokenize, Document, TermSource};

/// Corpus
/// An ordered collection of documents with an optional corpus lexicon and a
/// text hash function.
///
/// Lexicon based matrices require `update_lexicon` first; otherwise
/// `Error::LexiconRequired` is returned.
pub use vectorizer::corpus::Corpus;

/// Lexicon
/// Ordered vocabulary mapping each term to its matrix column.
pub use vectorizer::lexicon::Lexicon;

/// Hash trick
/// A hash function paired with a fixed cardinality. Colliding terms share a
/// bucket.
pub use vectorizer::hash::{default_text_hash, TextHashFunction};

/// Vectorizers and matrix builders
/// - `dtv` / `hash_dtv`: one document
/// - `dtm` / `hash_dtm`: many documents, built in parallel
/// - `each_dtv` / `each_hash_dtv`: lazy, restartable iteration
pub use vectorizer::{dtm, dtv, each_dtv, each_hash_dtv, hash_dtm, hash_dtv, DocumentTermMatrix};

/// Weighting Engine
/// Pure (`tf`, `tf_as::<F>`), in-place (`tf_inplace`) and explicit output
/// (`tf_into`) variants for TF, TF-IDF and BM25.
///
/// # Sparse outputs
/// `*_into` writes only the positions a sparse output already stores;
/// anything else is skipped silently.
pub use vectorizer::tfidf::{
    bm25, bm25_as, bm25_inplace, bm25_into, tf, tf_as, tf_inplace, tf_into, tfidf, tfidf_as, tfidf_inplace,
    tfidf_into, Stats, WeightOutput, WeightingState,
};

/// Search results
/// Ranked `(index, score)` entries, best first.
pub use vectorizer::evaluate::scoring::{HitEntry, Hits};

/// Embedding models
/// - `LsaModel`: truncated SVD of the weighted training matrix
/// - `RpModel`: sparse random projection
/// - `AnyModel`: either, as returned by `load_model`
///
/// Query operations live on the `EmbeddingModel` trait; models are immutable
/// and can be queried from several threads at once.
pub use model::{lsa::LsaModel, rp::random_projection_matrix, rp::RpModel, AnyModel, EmbeddingModel, ModelKind};

/// Model persistence
/// A line oriented text format; see [`vectorizer::serde`]. Loading takes the
/// target element type, which may differ from the one used when saving.
pub use vectorizer::serde::{
    load_lsa_model, load_model, load_rp_model, read_model, save_lsa_model, save_model, save_rp_model, write_model,
    ModelText,
};
