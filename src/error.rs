use thiserror::Error;

/// Errors raised by vectorization, weighting, embedding and persistence.
///
/// Every variant is a local, recoverable condition reported at the call that
/// caused it. Numerically degenerate inputs (zero-norm vectors, empty rows)
/// are not errors; they produce zeros.
#[derive(Debug, Error)]
pub enum Error {
    /// A lexicon-based matrix or vector was requested but no lexicon was
    /// supplied and none could be derived from the corpus.
    #[error("a lexicon is required; build one with `Corpus::update_lexicon` or pass it explicitly")]
    LexiconRequired,

    /// In-place weighting on a non-floating-point matrix, or an output
    /// buffer whose storage layout cannot receive the result.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// Vector length does not match the model vocabulary, output shape does
    /// not match the input, or the requested rank exceeds `min(m, n)`.
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Direct lookup of a word that is not part of a model vocabulary.
    #[error("unknown term `{0}`")]
    UnknownTerm(String),

    /// A persisted model failed header or shape validation.
    #[error("malformed model file (line {line}): {reason}")]
    MalformedModelFile { line: usize, reason: String },

    /// A hyperparameter outside of its valid range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Error::MalformedModelFile {
            line,
            reason: reason.into(),
        }
    }
}
