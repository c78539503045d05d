/**
 * Candidate Signals
 *
 * The three independent ranking signals behind room recommendations, plus
 * the hybrid rank fusion that merges them. All functions here are pure:
 * they read a profile cache and user data and return ordered candidate
 * lists, which keeps each signal testable in isolation.
 *
 * # Ranking Determinism
 *
 * Scores accumulate in first-seen order and sorting is stable, so equal
 * scores keep a reproducible order across runs.
 */
use std::collections::{BTreeSet, HashMap};

use crate::profile::tfidf::cosine_similarity;
use crate::profile::ProfileCache;

/// Score accumulator preserving first-seen insertion order across ties
#[derive(Debug, Default)]
struct ScoreBoard {
    order: Vec<String>,
    scores: HashMap<String, f64>,
}

impl ScoreBoard {
    fn add(&mut self, room: &str, score: f64) {
        match self.scores.get_mut(room) {
            Some(existing) => *existing += score,
            None => {
                self.order.push(room.to_string());
                self.scores.insert(room.to_string(), score);
            }
        }
    }

    /// Rooms sorted by score descending, ties in insertion order
    fn ranked(mut self) -> Vec<String> {
        self.order.sort_by(|a, b| {
            self.scores[b]
                .partial_cmp(&self.scores[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        self.order
    }
}

/// Content-based candidates: interest keywords as a pseudo-document,
/// vectorized with the room vectorizer, ranked by cosine similarity
///
/// Returns up to `2 * top_n` rooms so post-filtering still has material to
/// work with. Empty when the user has no interests or no vectorizer was
/// fitted.
pub(crate) fn content_candidates(
    cache: &ProfileCache,
    interests: &[String],
    top_n: usize,
) -> Vec<String> {
    if interests.is_empty() {
        return Vec::new();
    }
    let vectorizer = match &cache.vectorizer {
        Some(vectorizer) => vectorizer,
        None => return Vec::new(),
    };
    let user_vector = vectorizer.transform(&interests.join(" "));

    let mut scored: Vec<(&String, f64)> = cache
        .room_order
        .iter()
        .filter_map(|room| {
            cache
                .vectors
                .get(room)
                .map(|vector| (room, cosine_similarity(&user_vector, vector)))
        })
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored
        .into_iter()
        .take(top_n.saturating_mul(2))
        .map(|(room, _)| room.clone())
        .collect()
}

/// Collaborative candidates: Jaccard similarity of joined-room sets
///
/// The `similar_user_limit` most similar users vote for their rooms, each
/// vote weighted by that user's similarity; rooms the target user already
/// joined are not candidates.
pub(crate) fn collaborative_candidates(
    user_rooms: &BTreeSet<String>,
    others: &[(String, BTreeSet<String>)],
    similar_user_limit: usize,
    top_n: usize,
) -> Vec<String> {
    if user_rooms.is_empty() {
        return Vec::new();
    }

    let mut similar: Vec<(&BTreeSet<String>, f64)> = others
        .iter()
        .filter(|(_, rooms)| !rooms.is_empty())
        .map(|(_, rooms)| {
            let intersection = user_rooms.intersection(rooms).count();
            let union = user_rooms.union(rooms).count();
            (rooms, intersection as f64 / union as f64)
        })
        .collect();
    similar.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut board = ScoreBoard::default();
    for (rooms, similarity) in similar.into_iter().take(similar_user_limit) {
        for room in rooms.iter() {
            if !user_rooms.contains(room) {
                board.add(room, similarity);
            }
        }
    }
    let mut ranked = board.ranked();
    ranked.truncate(top_n);
    ranked
}

/// Topic-based candidates: distance between the user's and each room's
/// topic distributions, turned into a similarity
///
/// Similarity is `1 − sqrt(0.5 × Σ(user_topic − room_topic)²)`. Empty when
/// no topic model exists or the user has no interests.
pub(crate) fn topic_candidates(
    cache: &ProfileCache,
    interests: &[String],
    top_n: usize,
) -> Vec<String> {
    if interests.is_empty() {
        return Vec::new();
    }
    let model = match &cache.topics {
        Some(model) => model,
        None => return Vec::new(),
    };
    let tokens = crate::profile::text::tokenize(&interests.join(" "));
    let user_dist = model.infer(&tokens);

    let mut scored: Vec<(&String, f64)> = cache
        .room_order
        .iter()
        .filter_map(|room| {
            cache.topic_dists.get(room).map(|room_dist| {
                let sq_sum: f64 = user_dist
                    .iter()
                    .zip(room_dist.iter())
                    .map(|(u, r)| (u - r) * (u - r))
                    .sum();
                (room, 1.0 - (0.5 * sq_sum).sqrt())
            })
        })
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored
        .into_iter()
        .take(top_n)
        .map(|(room, _)| room.clone())
        .collect()
}

/// Merge the three candidate lists by positional weight
///
/// Rank position `i` of a list of length `L` contributes
/// `base_weight × (1 − i/L)`; a room absent from a list contributes zero
/// for that list. Note the decay depends on each list's own length, so a
/// shorter list decays faster per position. That matches the system this
/// replaces and is kept for compatibility.
pub(crate) fn hybrid_merge(
    content: &[String],
    collaborative: &[String],
    topic: &[String],
    weights: (f64, f64, f64),
    top_n: usize,
) -> Vec<String> {
    let mut board = ScoreBoard::default();
    for (list, base) in [
        (content, weights.0),
        (collaborative, weights.1),
        (topic, weights.2),
    ] {
        let len = list.len() as f64;
        for (i, room) in list.iter().enumerate() {
            board.add(room, base * (1.0 - i as f64 / len));
        }
    }
    let mut ranked = board.ranked();
    ranked.truncate(top_n);
    ranked
}
