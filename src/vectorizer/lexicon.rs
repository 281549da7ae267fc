use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Ordered vocabulary: term -> zero-based column index.
///
/// The column of a term is its insertion position. Duplicate insertions keep
/// the first position.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Lexicon {
    terms: IndexSet<String>,
}

impl Lexicon {
    pub fn new() -> Self {
        Self {
            terms: IndexSet::new(),
        }
    }

    /// Lexicon with columns in lexicographic term order.
    pub fn sorted<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut terms: Vec<String> = terms.into_iter().map(Into::into).collect();
        terms.sort_unstable();
        terms.dedup();
        Self {
            terms: terms.into_iter().collect(),
        }
    }

    /// Adds `term` if missing and returns its column.
    pub fn insert(&mut self, term: impl Into<String>) -> usize {
        self.terms.insert_full(term.into()).0
    }

    #[inline]
    pub fn index_of(&self, term: &str) -> Option<usize> {
        self.terms.get_index_of(term)
    }

    #[inline]
    pub fn contains(&self, term: &str) -> bool {
        self.terms.contains(term)
    }

    #[inline]
    pub fn term(&self, index: usize) -> Option<&str> {
        self.terms.get_index(index).map(String::as_str)
    }

    /// Terms in column order.
    #[inline]
    pub fn terms(&self) -> impl ExactSizeIterator<Item = &str> {
        self.terms.iter().map(String::as_str)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Order-sensitive: two lexicons are equal only if every term has the same
/// column.
impl PartialEq for Lexicon {
    fn eq(&self, other: &Self) -> bool {
        self.terms.iter().eq(other.terms.iter())
    }
}

impl Eq for Lexicon {}

impl<S: Into<String>> FromIterator<S> for Lexicon {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            terms: iter.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_order_defines_columns() {
        let mut lex: Lexicon = ["b", "a", "b"].into_iter().collect();
        assert_eq!(lex.len(), 2);
        assert_eq!(lex.index_of("b"), Some(0));
        assert_eq!(lex.index_of("a"), Some(1));
        assert_eq!(lex.insert("c"), 2);
        assert_eq!(lex.insert("a"), 1);
        assert_eq!(lex.term(2), Some("c"));
        assert_eq!(lex.index_of("zzz"), None);
    }

    #[test]
    fn sorted_lexicon() {
        let lex = Lexicon::sorted(["pear", "apple", "pear", "fig"]);
        assert_eq!(lex.terms().collect::<Vec<_>>(), vec!["apple", "fig", "pear"]);
    }

    #[test]
    fn equality_is_order_sensitive() {
        let a: Lexicon = ["x", "y"].into_iter().collect();
        let b: Lexicon = ["y", "x"].into_iter().collect();
        assert_ne!(a, b);
        assert_eq!(a, ["x", "y"].into_iter().collect::<Lexicon>());
    }
}
