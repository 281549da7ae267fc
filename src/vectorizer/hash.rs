use std::fmt;

use ahash::RandomState;

use crate::config::DEFAULT_CARDINALITY;
use crate::error::{Error, Result};

/// fixed seeds so that the default hash is identical across processes
const HASH_SEEDS: [u64; 4] = [
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
    0x082e_fa98_ec4e_6c89,
];

/// Default term hash: aHash with fixed seeds.
///
/// The output depends on the `ahash` version and on the target CPU features
/// (the AES path and the fallback hash differently), so bucket assignments
/// are only stable within one build. Persist a vocabulary, not hashed
/// indices, when vectors must be comparable across machines. Bit-exact
/// parity with other hash algorithms is not a goal.
pub fn default_text_hash(term: &str) -> u64 {
    RandomState::with_seeds(HASH_SEEDS[0], HASH_SEEDS[1], HASH_SEEDS[2], HASH_SEEDS[3])
        .hash_one(term)
}

/// A hash function paired with a fixed number of buckets.
///
/// Each term goes to bucket `hash(term) mod cardinality`. Colliding terms
/// share a bucket, which is the intended dimensionality reduction of the
/// hash trick.
#[derive(Clone, Copy)]
pub struct TextHashFunction {
    hash_function: fn(&str) -> u64,
    cardinality: usize,
}

impl TextHashFunction {
    pub fn new(hash_function: fn(&str) -> u64, cardinality: usize) -> Result<Self> {
        if cardinality == 0 {
            return Err(Error::InvalidParameter(
                "hash cardinality must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            hash_function,
            cardinality,
        })
    }

    /// Default hash function with a custom cardinality.
    pub fn with_cardinality(cardinality: usize) -> Result<Self> {
        Self::new(default_text_hash, cardinality)
    }

    #[inline]
    pub fn cardinality(&self) -> usize {
        self.cardinality
    }

    /// Bucket index of `term`.
    #[inline]
    pub fn index(&self, term: &str) -> usize {
        ((self.hash_function)(term) % self.cardinality as u64) as usize
    }
}

impl Default for TextHashFunction {
    fn default() -> Self {
        Self {
            hash_function: default_text_hash,
            cardinality: DEFAULT_CARDINALITY,
        }
    }
}

impl fmt::Debug for TextHashFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextHashFunction")
            .field("cardinality", &self.cardinality)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_is_in_range_and_deterministic() {
        let h = TextHashFunction::with_cardinality(13).unwrap();
        for term in ["this", "is", "a", "text", "", "ünïcödé"] {
            let i = h.index(term);
            assert!(i < 13);
            assert_eq!(i, h.index(term));
            assert_eq!(i, TextHashFunction::with_cardinality(13).unwrap().index(term));
        }
    }

    #[test]
    fn custom_hash_function_is_used() {
        fn len_hash(term: &str) -> u64 {
            term.len() as u64
        }
        let h = TextHashFunction::new(len_hash, 4).unwrap();
        assert_eq!(h.index("abcdef"), 2);
        assert_eq!(h.index("abcd"), 0);
    }

    #[test]
    fn zero_cardinality_is_rejected() {
        assert!(matches!(
            TextHashFunction::with_cardinality(0),
            Err(Error::InvalidParameter(_))
        ));
        assert_eq!(TextHashFunction::default().cardinality(), DEFAULT_CARDINALITY);
    }
}
