//! Room recommendations: candidate signals, rank fusion and explanations

pub mod engine;
pub(crate) mod signals;

pub use engine::{Algorithm, Explanation, Recommender, RecommendationRecord};
