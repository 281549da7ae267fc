//! Process-wide defaults and per-call parameter sets.
//!
//! Defaults are plain constants; nothing here is mutable global state.
//! Every call that uses one of them also accepts an explicit override,
//! either as a type parameter (element types) or through one of the
//! parameter structs below.

use serde::{Deserialize, Serialize};

use crate::vectorizer::tfidf::Stats;

/// Element type of document-term matrices when the caller does not pick one.
pub type DefaultDtmType = i64;

/// Floating point type of weighted matrices and models when the caller does
/// not pick one.
pub type DefaultFloat = f64;

/// Number of hash buckets used by `TextHashFunction::default()`.
pub const DEFAULT_CARDINALITY: usize = 100;

/// BM25 term-frequency saturation.
pub const DEFAULT_KAPPA: f64 = 2.0;

/// BM25 document-length normalization.
pub const DEFAULT_BETA: f64 = 0.75;

/// LSA embedding components with a smaller magnitude are zeroed.
pub const DEFAULT_LSA_TOL: f64 = 1e-15;

/// Okapi BM25 hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bm25Params {
    /// saturation (κ)
    pub kappa: f64,
    /// length normalization (β)
    pub beta: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self {
            kappa: DEFAULT_KAPPA,
            beta: DEFAULT_BETA,
        }
    }
}

impl Bm25Params {
    pub fn new(kappa: f64, beta: f64) -> Self {
        Self { kappa, beta }
    }
}

/// Construction parameters of an LSA model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LsaConfig {
    /// Target rank. `None` means `min(documents, terms)`.
    pub k: Option<usize>,
    pub stats: Stats,
    pub bm25: Bm25Params,
    pub tol: f64,
}

impl Default for LsaConfig {
    fn default() -> Self {
        Self {
            k: None,
            stats: Stats::TfIdf,
            bm25: Bm25Params::default(),
            tol: DEFAULT_LSA_TOL,
        }
    }
}

impl LsaConfig {
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = Some(k);
        self
    }

    pub fn with_stats(mut self, stats: Stats) -> Self {
        self.stats = stats;
        self
    }

    pub fn with_bm25(mut self, bm25: Bm25Params) -> Self {
        self.bm25 = bm25;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }
}

/// Construction parameters of a random projection model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RpConfig {
    /// Output dimensionality. `None` keeps the vocabulary size.
    pub k: Option<usize>,
    /// Share of non-zero projection entries. `None` means `1/sqrt(k)`.
    pub density: Option<f64>,
    pub stats: Stats,
    pub bm25: Bm25Params,
    /// RNG seed. `None` draws a fresh one.
    pub seed: Option<u64>,
}

impl Default for RpConfig {
    fn default() -> Self {
        Self {
            k: None,
            density: None,
            stats: Stats::TfIdf,
            bm25: Bm25Params::default(),
            seed: None,
        }
    }
}

impl RpConfig {
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = Some(k);
        self
    }

    pub fn with_density(mut self, density: f64) -> Self {
        self.density = Some(density);
        self
    }

    pub fn with_stats(mut self, stats: Stats) -> Self {
        self.stats = stats;
        self
    }

    pub fn with_bm25(mut self, bm25: Bm25Params) -> Self {
        self.bm25 = bm25;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}
