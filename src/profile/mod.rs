//! Room content profiling: corpora, TF-IDF vectors and topic models

pub mod profiler;
pub mod text;
pub mod tfidf;
pub mod topics;

pub use profiler::{spawn_refresh_task, ContentProfiler, ProfileCache};
pub use tfidf::{cosine_similarity, TfIdfVectorizer};
pub use topics::{TopicModel, TrendingTopic};
