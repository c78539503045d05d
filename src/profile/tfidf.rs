/**
 * Term-Weight Vectorization
 *
 * TF-IDF vectorizer fitted jointly over all room corpora so the resulting
 * vectors are comparable via cosine similarity. Vectors are l2-normalized
 * non-negative term-weight vectors; cosine similarity between them lands in
 * [0, 1] in practice.
 *
 * # Insufficient Data
 *
 * `fit` returns `None` when document-frequency filtering leaves the
 * vocabulary empty. That is the expected small-corpus outcome, not a
 * failure - callers degrade to an unvectorized profile.
 */
use std::collections::{HashMap, HashSet};

use ndarray::Array1;

use crate::profile::text::tokenize;

/// TF-IDF vectorizer with a fixed vocabulary
#[derive(Debug, Clone)]
pub struct TfIdfVectorizer {
    /// Term -> vector index, terms sorted alphabetically
    vocabulary: HashMap<String, usize>,
    /// Smoothed inverse document frequency per term
    idf: Array1<f64>,
}

impl TfIdfVectorizer {
    /// Fit a vocabulary and idf weights over a document collection
    ///
    /// Terms must appear in at least `min_df` documents and in at most
    /// `max_df_ratio` of all documents. Returns `None` when no term
    /// survives the filtering.
    pub fn fit(documents: &[String], min_df: usize, max_df_ratio: f64) -> Option<Self> {
        if documents.is_empty() {
            return None;
        }
        let n_docs = documents.len();
        let max_doc_count = max_df_ratio * n_docs as f64;

        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        for doc in documents {
            let unique: HashSet<String> = tokenize(doc).into_iter().collect();
            for term in unique {
                *doc_freq.entry(term).or_insert(0) += 1;
            }
        }

        let mut terms: Vec<(String, usize)> = doc_freq
            .into_iter()
            .filter(|(_, df)| *df >= min_df && (*df as f64) <= max_doc_count)
            .collect();
        if terms.is_empty() {
            return None;
        }
        terms.sort_by(|a, b| a.0.cmp(&b.0));

        let mut vocabulary = HashMap::with_capacity(terms.len());
        let mut idf = Array1::zeros(terms.len());
        for (index, (term, df)) in terms.into_iter().enumerate() {
            // Smoothed idf, never zero, so every vocabulary term contributes
            idf[index] = ((1.0 + n_docs as f64) / (1.0 + df as f64)).ln() + 1.0;
            vocabulary.insert(term, index);
        }

        Some(Self { vocabulary, idf })
    }

    /// Vectorize a document into l2-normalized term weights
    ///
    /// Terms outside the fitted vocabulary are ignored; a document with no
    /// known terms maps to the zero vector.
    pub fn transform(&self, text: &str) -> Array1<f64> {
        let mut vector = Array1::zeros(self.vocabulary.len());
        for token in tokenize(text) {
            if let Some(&index) = self.vocabulary.get(&token) {
                vector[index] += 1.0;
            }
        }
        vector *= &self.idf;
        let norm = vector.dot(&vector).sqrt();
        if norm > 0.0 {
            vector /= norm;
        }
        vector
    }

    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }
}

/// Cosine similarity between two term-weight vectors
///
/// Zero when either vector is zero.
pub fn cosine_similarity(a: &Array1<f64>, b: &Array1<f64>) -> f64 {
    let norm_a = a.dot(a).sqrt();
    let norm_b = b.dot(b).sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    a.dot(b) / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_fit_empty_corpus() {
        assert!(TfIdfVectorizer::fit(&[], 1, 0.95).is_none());
    }

    #[test]
    fn test_fit_stop_words_only() {
        let corpus = docs(&["the and of", "a an the"]);
        assert!(TfIdfVectorizer::fit(&corpus, 1, 0.95).is_none());
    }

    #[test]
    fn test_min_df_filters_rare_terms() {
        let corpus = docs(&[
            "rust tokio rust",
            "rust async",
            "python flask",
        ]);
        let vectorizer = TfIdfVectorizer::fit(&corpus, 2, 1.0).unwrap();
        // Only "rust" appears in two documents
        assert_eq!(vectorizer.vocabulary_len(), 1);
    }

    #[test]
    fn test_transform_is_normalized() {
        let corpus = docs(&["chess openings endgames", "music guitar piano"]);
        let vectorizer = TfIdfVectorizer::fit(&corpus, 1, 1.0).unwrap();
        let vector = vectorizer.transform("chess chess openings");
        let norm = vector.dot(&vector).sqrt();
        assert!((norm - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_transform_unknown_terms_is_zero() {
        let corpus = docs(&["chess openings", "music guitar"]);
        let vectorizer = TfIdfVectorizer::fit(&corpus, 1, 1.0).unwrap();
        let vector = vectorizer.transform("quantum entanglement");
        assert_eq!(vector.dot(&vector), 0.0);
    }

    #[test]
    fn test_cosine_similarity_ranks_overlap() {
        let corpus = docs(&[
            "chess openings strategy endgames chess",
            "guitar chords music scales",
        ]);
        let vectorizer = TfIdfVectorizer::fit(&corpus, 1, 1.0).unwrap();
        let chess_doc = vectorizer.transform(&corpus[0]);
        let music_doc = vectorizer.transform(&corpus[1]);
        let query = vectorizer.transform("chess strategy");

        let to_chess = cosine_similarity(&query, &chess_doc);
        let to_music = cosine_similarity(&query, &music_doc);
        assert!(to_chess > to_music);
        assert!(to_chess > 0.0 && to_chess <= 1.0 + 1e-9);
        assert_eq!(to_music, 0.0);
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        let a = Array1::zeros(3);
        let b = Array1::from_vec(vec![1.0, 0.0, 0.0]);
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }
}
