use serde::{Deserialize, Serialize};

use crate::vectorizer::token::TermFrequency;

/// Anything that can be viewed as a term multiset.
///
/// Vectorizers, matrix builders and models accept any `TermSource`, so raw
/// strings, token lists, prepared `TermFrequency` values and `Document`s can
/// be mixed freely.
pub trait TermSource {
    fn term_frequency(&self) -> TermFrequency;
}

/// Splits raw text on whitespace and ASCII punctuation.
///
/// No case folding, stemming or stop-word handling happens here; callers
/// needing those should prepare the text before building documents.
#[inline]
pub fn tokenize(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
        .filter(|t| !t.is_empty())
}

/// A single document.
///
/// The variants differ in how the text is stored; all of them expose the
/// same term multiset and raw text views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Document {
    /// Raw, untokenized text.
    Text(String),
    /// Already tokenized text.
    Tokens(Vec<String>),
    /// Pre-counted terms or n-grams.
    NGrams(TermFrequency),
}

impl Document {
    /// Term multiset of this document.
    pub fn terms(&self) -> TermFrequency {
        match self {
            Document::Text(text) => tokenize(text).collect(),
            Document::Tokens(tokens) => tokens.iter().collect(),
            Document::NGrams(freq) => freq.clone(),
        }
    }

    /// Tokens in document order. N-gram documents have no order; their terms
    /// come out in first-seen order, repeated by count.
    pub fn tokens(&self) -> Vec<String> {
        match self {
            Document::Text(text) => tokenize(text).map(str::to_string).collect(),
            Document::Tokens(tokens) => tokens.clone(),
            Document::NGrams(freq) => freq
                .iter()
                .flat_map(|(term, count)| std::iter::repeat(term.to_string()).take(count as usize))
                .collect(),
        }
    }

    /// Raw text view: the original text, or tokens joined by single spaces.
    pub fn text(&self) -> String {
        match self {
            Document::Text(text) => text.clone(),
            _ => self.tokens().join(" "),
        }
    }
}

impl From<&str> for Document {
    fn from(text: &str) -> Self {
        Document::Text(text.to_string())
    }
}

impl From<String> for Document {
    fn from(text: String) -> Self {
        Document::Text(text)
    }
}

impl From<Vec<String>> for Document {
    fn from(tokens: Vec<String>) -> Self {
        Document::Tokens(tokens)
    }
}

impl From<TermFrequency> for Document {
    fn from(freq: TermFrequency) -> Self {
        Document::NGrams(freq)
    }
}

impl TermSource for Document {
    fn term_frequency(&self) -> TermFrequency {
        self.terms()
    }
}

impl TermSource for TermFrequency {
    fn term_frequency(&self) -> TermFrequency {
        self.clone()
    }
}

impl TermSource for str {
    fn term_frequency(&self) -> TermFrequency {
        tokenize(self).collect()
    }
}

impl TermSource for String {
    fn term_frequency(&self) -> TermFrequency {
        self.as_str().term_frequency()
    }
}

impl<S: AsRef<str>> TermSource for [S] {
    fn term_frequency(&self) -> TermFrequency {
        self.iter().collect()
    }
}

impl<S: AsRef<str>> TermSource for Vec<S> {
    fn term_frequency(&self) -> TermFrequency {
        self.as_slice().term_frequency()
    }
}

impl<T: TermSource + ?Sized> TermSource for &T {
    fn term_frequency(&self) -> TermFrequency {
        (**self).term_frequency()
    }
}
