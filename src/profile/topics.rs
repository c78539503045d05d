/**
 * Latent Topic Modeling
 *
 * Collapsed Gibbs sampling LDA over the room corpora. Fits are seeded, so
 * the same corpus always yields the same model. The model exposes topic
 * distributions for documents (rooms or interest pseudo-documents) and the
 * top-weighted words per topic for the trending-topics view.
 *
 * # Soft Degradation
 *
 * `fit` returns `None` for corpora below the document minimum or with an
 * empty vocabulary. Topic-based signals then simply produce no candidates;
 * nothing treats the absence of a model as an error.
 */
use std::collections::HashMap;

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Dirichlet prior on document-topic distributions
const ALPHA: f64 = 0.1;
/// Dirichlet prior on topic-word distributions
const BETA: f64 = 0.01;

/// A fitted topic model over a fixed vocabulary
#[derive(Debug, Clone)]
pub struct TopicModel {
    /// Term -> word index
    vocabulary: HashMap<String, usize>,
    /// Word index -> term
    terms: Vec<String>,
    /// Assignment counts, shape (topics, words)
    word_topic: Array2<f64>,
    /// Total assignments per topic
    topic_totals: Array1<f64>,
}

/// One trending topic: its strongest words and total weight
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TrendingTopic {
    pub words: Vec<String>,
    pub weight: f64,
}

impl TopicModel {
    /// Fit a model over tokenized documents
    ///
    /// The effective topic count is capped at the number of documents.
    /// Returns `None` when fewer than `min_docs` non-empty documents exist
    /// or the vocabulary is empty.
    pub fn fit(
        documents: &[Vec<String>],
        num_topics: usize,
        min_docs: usize,
        iterations: usize,
        seed: u64,
    ) -> Option<Self> {
        let docs: Vec<&Vec<String>> = documents.iter().filter(|d| !d.is_empty()).collect();
        if docs.len() < min_docs {
            return None;
        }

        let mut vocabulary: HashMap<String, usize> = HashMap::new();
        let mut terms: Vec<String> = Vec::new();
        let doc_words: Vec<Vec<usize>> = docs
            .iter()
            .map(|doc| {
                doc.iter()
                    .map(|token| {
                        *vocabulary.entry(token.clone()).or_insert_with(|| {
                            terms.push(token.clone());
                            terms.len() - 1
                        })
                    })
                    .collect()
            })
            .collect();
        if terms.is_empty() {
            return None;
        }

        let num_topics = num_topics.min(docs.len()).max(1);
        let vocab_size = terms.len();
        let mut rng = StdRng::seed_from_u64(seed);

        let mut word_topic = Array2::<f64>::zeros((num_topics, vocab_size));
        let mut doc_topic = Array2::<f64>::zeros((doc_words.len(), num_topics));
        let mut topic_totals = Array1::<f64>::zeros(num_topics);
        let mut assignments: Vec<Vec<usize>> = Vec::with_capacity(doc_words.len());

        for (d, words) in doc_words.iter().enumerate() {
            let mut doc_assignments = Vec::with_capacity(words.len());
            for &w in words {
                let k = rng.gen_range(0..num_topics);
                word_topic[(k, w)] += 1.0;
                doc_topic[(d, k)] += 1.0;
                topic_totals[k] += 1.0;
                doc_assignments.push(k);
            }
            assignments.push(doc_assignments);
        }

        let mut weights = vec![0.0f64; num_topics];
        for _ in 0..iterations {
            for (d, words) in doc_words.iter().enumerate() {
                for (i, &w) in words.iter().enumerate() {
                    let old = assignments[d][i];
                    word_topic[(old, w)] -= 1.0;
                    doc_topic[(d, old)] -= 1.0;
                    topic_totals[old] -= 1.0;

                    let mut total = 0.0;
                    for (k, weight) in weights.iter_mut().enumerate() {
                        *weight = (doc_topic[(d, k)] + ALPHA)
                            * (word_topic[(k, w)] + BETA)
                            / (topic_totals[k] + vocab_size as f64 * BETA);
                        total += *weight;
                    }
                    let mut target = rng.gen::<f64>() * total;
                    let mut new = num_topics - 1;
                    for (k, &weight) in weights.iter().enumerate() {
                        target -= weight;
                        if target <= 0.0 {
                            new = k;
                            break;
                        }
                    }

                    word_topic[(new, w)] += 1.0;
                    doc_topic[(d, new)] += 1.0;
                    topic_totals[new] += 1.0;
                    assignments[d][i] = new;
                }
            }
        }

        Some(Self {
            vocabulary,
            terms,
            word_topic,
            topic_totals,
        })
    }

    pub fn num_topics(&self) -> usize {
        self.topic_totals.len()
    }

    /// Project a tokenized document into topic-distribution space
    ///
    /// Estimated as `p(topic | doc) ∝ Σ_w n(w, doc) · p(w | topic)`,
    /// normalized to sum to one. Documents with no vocabulary overlap map
    /// to the uniform distribution.
    pub fn infer(&self, tokens: &[String]) -> Array1<f64> {
        let num_topics = self.num_topics();
        let vocab_size = self.terms.len() as f64;
        let mut dist = Array1::<f64>::zeros(num_topics);
        for token in tokens {
            if let Some(&w) = self.vocabulary.get(token) {
                for k in 0..num_topics {
                    dist[k] += (self.word_topic[(k, w)] + BETA)
                        / (self.topic_totals[k] + vocab_size * BETA);
                }
            }
        }
        let total: f64 = dist.sum();
        if total > 0.0 {
            dist /= total;
        } else {
            dist.fill(1.0 / num_topics as f64);
        }
        dist
    }

    /// The `num_words` strongest words of a topic, heaviest first
    pub fn top_words(&self, topic: usize, num_words: usize) -> Vec<String> {
        let mut weighted: Vec<(usize, f64)> = (0..self.terms.len())
            .map(|w| (w, self.word_topic[(topic, w)]))
            .collect();
        weighted.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        weighted
            .into_iter()
            .take(num_words)
            .map(|(w, _)| self.terms[w].clone())
            .collect()
    }

    /// Trending topics across the corpus, heaviest first
    pub fn trending(&self, num_topics: usize, num_words: usize) -> Vec<TrendingTopic> {
        let mut topics: Vec<TrendingTopic> = (0..self.num_topics())
            .map(|k| TrendingTopic {
                words: self.top_words(k, num_words),
                weight: self.topic_totals[k],
            })
            .collect();
        topics.sort_by(|a, b| b.weight.partial_cmp(&a.weight).unwrap_or(std::cmp::Ordering::Equal));
        topics.truncate(num_topics);
        topics
    }
}
