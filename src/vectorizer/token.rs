use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// TermFrequency 構造体
/// A term multiset: how often each term occurs in one document.
///
/// It manages:
/// - The count of occurrences of each term
/// - The total number of terms in the document
///
/// This is the only view of a document the vectorizer consumes.
///
/// # Examples
/// ```
/// use dtm_vectorizer::TermFrequency;
/// let mut freq = TermFrequency::new();
/// freq.add_term("apple");
/// freq.add_terms(&["pear", "apple"]);
///
/// assert_eq!(freq.term_count("apple"), 2);
/// assert_eq!(freq.term_sum(), 3);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct TermFrequency {
    #[serde(with = "indexmap::map::serde_seq")]
    term_count: IndexMap<String, u64>,
    total_term_count: u64,
}

/// Term addition
impl TermFrequency {
    pub fn new() -> Self {
        TermFrequency {
            term_count: IndexMap::new(),
            total_term_count: 0,
        }
    }

    /// Adds one occurrence of `term`.
    #[inline]
    pub fn add_term(&mut self, term: &str) -> &mut Self {
        match self.term_count.get_mut(term) {
            Some(count) => *count += 1,
            None => {
                self.term_count.insert(term.to_string(), 1);
            }
        }
        self.total_term_count += 1;
        self
    }

    /// Adds one occurrence of each term in `terms`.
    #[inline]
    pub fn add_terms<T>(&mut self, terms: &[T]) -> &mut Self
    where
        T: AsRef<str>,
    {
        for term in terms {
            self.add_term(term.as_ref());
        }
        self
    }

    /// Sets the count of `term`, keeping the total consistent.
    /// A count of zero removes the term.
    pub fn set_term_count(&mut self, term: &str, count: u64) -> &mut Self {
        let previous = if count == 0 {
            self.term_count.shift_remove(term).unwrap_or(0)
        } else {
            self.term_count.insert(term.to_string(), count).unwrap_or(0)
        };
        self.total_term_count = self.total_term_count - previous + count;
        self
    }

    /// Merges another multiset into this one.
    pub fn add_terms_from_freq(&mut self, other: &TermFrequency) -> &mut Self {
        for (term, &count) in other.term_count.iter() {
            *self.term_count.entry(term.clone()).or_insert(0) += count;
        }
        self.total_term_count += other.total_term_count;
        self
    }

    #[inline]
    pub fn clear(&mut self) {
        self.term_count.clear();
        self.total_term_count = 0;
    }
}

/// Queries
impl TermFrequency {
    #[inline]
    pub fn term_count(&self, term: &str) -> u64 {
        self.term_count.get(term).copied().unwrap_or(0)
    }

    /// Total number of terms, counting repetitions.
    #[inline]
    pub fn term_sum(&self) -> u64 {
        self.total_term_count
    }

    /// Number of distinct terms.
    #[inline]
    pub fn len(&self) -> usize {
        self.term_count.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.term_count.is_empty()
    }

    #[inline]
    pub fn contains_term(&self, term: &str) -> bool {
        self.term_count.contains_key(term)
    }

    /// `(term, count)` in first-seen order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.term_count.iter().map(|(term, &count)| (term.as_str(), count))
    }

    /// Distinct terms in first-seen order.
    #[inline]
    pub fn term_set_ref_str(&self) -> Vec<&str> {
        self.term_count.keys().map(|t| t.as_str()).collect()
    }

    /// Terms whose relative frequency `count / term_sum` is greater than `alpha`.
    pub fn frequent_terms(&self, alpha: f64) -> Vec<&str> {
        self.split_by_ratio(alpha, true)
    }

    /// Terms whose relative frequency `count / term_sum` is at most `alpha`.
    pub fn sparse_terms(&self, alpha: f64) -> Vec<&str> {
        self.split_by_ratio(alpha, false)
    }

    fn split_by_ratio(&self, alpha: f64, frequent: bool) -> Vec<&str> {
        if self.total_term_count == 0 {
            return Vec::new();
        }
        let total = self.total_term_count as f64;
        self.term_count
            .iter()
            .filter(|(_, count)| (**count as f64 / total > alpha) == frequent)
            .map(|(term, _)| term.as_str())
            .collect()
    }
}

impl<S: AsRef<str>> FromIterator<S> for TermFrequency {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut freq = TermFrequency::new();
        for term in iter {
            freq.add_term(term.as_ref());
        }
        freq
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_and_total_stay_consistent() {
        let mut f = TermFrequency::new();
        f.add_terms(&["a", "b", "a", "c", "a"]);
        assert_eq!(f.term_count("a"), 3);
        assert_eq!(f.term_count("z"), 0);
        assert_eq!(f.term_sum(), 5);
        assert_eq!(f.len(), 3);

        f.set_term_count("a", 1);
        assert_eq!(f.term_sum(), 3);
        f.set_term_count("b", 0);
        assert!(!f.contains_term("b"));
        assert_eq!(f.term_sum(), 2);
        f.set_term_count("new", 4);
        assert_eq!(f.term_sum(), 6);
    }

    #[test]
    fn merge_adds_counts() {
        let mut a: TermFrequency = ["x", "y"].into_iter().collect();
        let b: TermFrequency = ["y", "y", "z"].into_iter().collect();
        a.add_terms_from_freq(&b);
        assert_eq!(a.term_count("y"), 3);
        assert_eq!(a.term_sum(), 5);
        assert_eq!(a.term_set_ref_str(), vec!["x", "y", "z"]);
    }

    #[test]
    fn frequent_and_sparse_partition_terms() {
        let f: TermFrequency = ["a", "a", "a", "b", "c"].into_iter().collect();
        assert_eq!(f.frequent_terms(0.5), vec!["a"]);
        assert_eq!(f.sparse_terms(0.5), vec!["b", "c"]);
        assert!(TermFrequency::new().frequent_terms(0.1).is_empty());
    }

    #[test]
    fn serde_roundtrip_json_keeps_order() {
        let f: TermFrequency = ["b", "a", "b"].into_iter().collect();
        let s = serde_json::to_string(&f).unwrap();
        let de: TermFrequency = serde_json::from_str(&s).unwrap();
        assert_eq!(de, f);
        assert_eq!(de.term_set_ref_str(), vec!["b", "a"]);
    }
}
