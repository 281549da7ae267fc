use std::fmt::{self, Debug};

use serde::{Deserialize, Serialize};

use crate::utils::element::FloatElement;
use crate::utils::sort::top_n_desc;

/// One ranked result: the position of a document in the searched
/// collection and its similarity to the query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitEntry<F> {
    pub index: usize,
    pub score: F,
}

/// Structure to store search results
///
/// Entries are ordered by descending score; equal scores keep collection
/// order and NaN scores come last.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Hits<F> {
    pub list: Vec<HitEntry<F>>,
}

impl<F: FloatElement> Hits<F> {
    /// Ranks `scores` and keeps the best `n`.
    pub fn top_n(scores: &[F], n: usize) -> Self {
        let list = top_n_desc(scores, n)
            .into_iter()
            .map(|(index, score)| HitEntry { index, score })
            .collect();
        Hits { list }
    }

    /// Document positions, best first.
    pub fn indices(&self) -> Vec<usize> {
        self.list.iter().map(|hit| hit.index).collect()
    }

    /// Scores, best first.
    pub fn scores(&self) -> Vec<F> {
        self.list.iter().map(|hit| hit.score).collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.list.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HitEntry<F>> {
        self.list.iter()
    }
}

impl<F> IntoIterator for Hits<F> {
    type Item = HitEntry<F>;
    type IntoIter = std::vec::IntoIter<HitEntry<F>>;

    fn into_iter(self) -> Self::IntoIter {
        self.list.into_iter()
    }
}

impl<F: Debug + fmt::Display> Debug for Hits<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            // one hit per line
            writeln!(f, "Hits [")?;
            for hit in &self.list {
                writeln!(f, "    #{}: {:.6}", hit.index, hit.score)?;
            }
            write!(f, "]")
        } else {
            f.debug_list().entries(&self.list).finish()
        }
    }
}
