/**
 * Content Profiler
 *
 * Builds per-room content profiles from persisted message history: one
 * concatenated corpus per active room, a TF-IDF vector per corpus (fitted
 * jointly so vectors are comparable), and an optional topic model when the
 * corpus is large enough.
 *
 * # Cache Discipline
 *
 * The profile is fully recomputed on refresh and swapped in as a whole;
 * readers always observe either the previous complete cache or the new
 * one, never a partially-written mix. Concurrent refreshes serialize on an
 * async mutex - the second caller waits, observes the first caller's
 * completed cache, and returns without rebuilding (unless forced).
 *
 * # Scheduling
 *
 * `refresh` fetches and vectorizes potentially hundreds of documents and
 * belongs off the hot request path: [`spawn_refresh_task`] runs it on a
 * periodic timer, and on-demand callers hit the built-cache fast path.
 */
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use ndarray::Array1;

use crate::config::ProfilerConfig;
use crate::profile::text::tokenize;
use crate::profile::tfidf::{cosine_similarity, TfIdfVectorizer};
use crate::profile::topics::{TopicModel, TrendingTopic};
use crate::shared::CoreError;
use crate::store::{bounded, ContentStore};

/// One complete, immutable build of the room content profiles
#[derive(Debug)]
pub struct ProfileCache {
    /// Rooms with content, in corpus insertion order (the similarity
    /// tie-break order)
    pub(crate) room_order: Vec<String>,
    /// Room -> concatenated recent-message text
    pub(crate) corpus: HashMap<String, String>,
    /// Vectorizer fitted jointly over all room corpora, absent when the
    /// corpus was too small to produce a vocabulary
    pub(crate) vectorizer: Option<TfIdfVectorizer>,
    /// Room -> l2-normalized TF-IDF vector
    pub(crate) vectors: HashMap<String, Array1<f64>>,
    /// Topic model, absent below the document minimum
    pub(crate) topics: Option<TopicModel>,
    /// Room -> topic distribution, present iff `topics` is
    pub(crate) topic_dists: HashMap<String, Array1<f64>>,
    /// When this build completed
    pub built_at: DateTime<Utc>,
}

impl ProfileCache {
    /// Rooms with content, in insertion order
    pub fn rooms(&self) -> &[String] {
        &self.room_order
    }

    pub fn is_empty(&self) -> bool {
        self.room_order.is_empty()
    }
}

/// Refreshable store of per-room content vectors
pub struct ContentProfiler {
    store: Arc<dyn ContentStore>,
    config: ProfilerConfig,
    cache: RwLock<Option<Arc<ProfileCache>>>,
    refresh_guard: tokio::sync::Mutex<()>,
}

impl ContentProfiler {
    pub fn new(store: Arc<dyn ContentStore>, config: ProfilerConfig) -> Self {
        Self {
            store,
            config,
            cache: RwLock::new(None),
            refresh_guard: tokio::sync::Mutex::new(()),
        }
    }

    pub fn config(&self) -> &ProfilerConfig {
        &self.config
    }

    /// The current complete profile build, if any
    pub fn snapshot(&self) -> Option<Arc<ProfileCache>> {
        self.cache.read().unwrap().clone()
    }

    /// Rebuild the room content profiles
    ///
    /// A no-op when a build already exists and `force` is false. Store
    /// failures surface as `TransientStore`; the previous cache stays
    /// visible until a rebuild completes.
    pub async fn refresh(&self, force: bool) -> Result<(), CoreError> {
        if !force && self.snapshot().is_some() {
            return Ok(());
        }
        let _guard = self.refresh_guard.lock().await;
        // A refresh that finished while we waited for the guard counts
        if !force && self.snapshot().is_some() {
            return Ok(());
        }

        let timeout = self.config.store_timeout();
        let active = bounded(
            timeout,
            "active_rooms",
            self.store.active_rooms(self.config.max_rooms),
        )
        .await?;

        let mut room_order = Vec::new();
        let mut corpus: HashMap<String, String> = HashMap::new();
        for room in &active {
            let messages = match bounded(
                timeout,
                "room_messages",
                self.store
                    .room_messages(&room.name, self.config.messages_per_room),
            )
            .await
            {
                Ok(messages) => messages,
                Err(CoreError::NotFound { .. }) => {
                    // Listed active but gone by the time we fetched it
                    tracing::warn!("[Profiler] Room {} vanished during refresh", room.name);
                    continue;
                }
                Err(e) => return Err(e),
            };
            if messages.is_empty() {
                continue;
            }
            let text = messages
                .iter()
                .map(|m| m.content.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            if text.trim().is_empty() {
                continue;
            }
            room_order.push(room.name.clone());
            corpus.insert(room.name.clone(), text);
        }

        let texts: Vec<String> = room_order
            .iter()
            .map(|room| corpus[room].clone())
            .collect();
        let vectorizer = TfIdfVectorizer::fit(&texts, self.config.min_df, self.config.max_df_ratio);
        let mut vectors = HashMap::new();
        if let Some(vectorizer) = &vectorizer {
            for room in &room_order {
                vectors.insert(room.clone(), vectorizer.transform(&corpus[room]));
            }
        }

        let tokenized: Vec<Vec<String>> = texts.iter().map(|t| tokenize(t)).collect();
        let topics = TopicModel::fit(
            &tokenized,
            self.config.num_topics,
            self.config.min_topic_docs,
            self.config.topic_iterations,
            self.config.topic_seed,
        );
        let mut topic_dists = HashMap::new();
        if let Some(model) = &topics {
            for (room, tokens) in room_order.iter().zip(&tokenized) {
                topic_dists.insert(room.clone(), model.infer(tokens));
            }
        }

        let built = ProfileCache {
            room_order,
            corpus,
            vectorizer,
            vectors,
            topics,
            topic_dists,
            built_at: Utc::now(),
        };
        tracing::info!(
            "[Profiler] Profile rebuilt: {} rooms, vocabulary {}, topics {}",
            built.room_order.len(),
            built
                .vectorizer
                .as_ref()
                .map(|v| v.vocabulary_len())
                .unwrap_or(0),
            built
                .topics
                .as_ref()
                .map(|t| t.num_topics())
                .unwrap_or(0)
        );
        *self.cache.write().unwrap() = Some(Arc::new(built));
        Ok(())
    }

    /// The cached vector of a room, absent until built or when the room has
    /// no content
    pub fn vector_for(&self, room: &str) -> Option<Array1<f64>> {
        self.snapshot()?.vectors.get(room).cloned()
    }

    /// Rooms most similar to `room` by cosine similarity, descending
    ///
    /// The queried room is excluded; ties keep corpus insertion order.
    ///
    /// # Errors
    ///
    /// * `NotFound` - the room has no vector (or no profile is built yet)
    pub fn similar_rooms(&self, room: &str, top_n: usize) -> Result<Vec<String>, CoreError> {
        let cache = self
            .snapshot()
            .ok_or_else(|| CoreError::not_found(format!("room '{}'", room)))?;
        let target = cache
            .vectors
            .get(room)
            .ok_or_else(|| CoreError::not_found(format!("room '{}'", room)))?;

        let mut scored: Vec<(&String, f64)> = cache
            .room_order
            .iter()
            .filter(|other| other.as_str() != room)
            .filter_map(|other| {
                cache
                    .vectors
                    .get(other)
                    .map(|vector| (other, cosine_similarity(target, vector)))
            })
            .collect();
        // Stable sort keeps insertion order between equal scores
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scored
            .into_iter()
            .take(top_n)
            .map(|(name, _)| name.clone())
            .collect())
    }

    /// Trending topics across all rooms, heaviest first
    ///
    /// # Errors
    ///
    /// * `NoContent` - no topic model could be fitted
    pub fn trending_topics(
        &self,
        num_topics: usize,
        num_words: usize,
    ) -> Result<Vec<TrendingTopic>, CoreError> {
        let cache = self.snapshot().ok_or(CoreError::NoContent)?;
        match &cache.topics {
            Some(model) => Ok(model.trending(num_topics, num_words)),
            None => Err(CoreError::NoContent),
        }
    }
}

/// Run periodic forced refreshes until the task is aborted
///
/// The first tick fires immediately, so this also performs the initial
/// build. A failed refresh is logged and retried on the next cycle, never
/// fatal.
pub fn spawn_refresh_task(profiler: Arc<ContentProfiler>) -> tokio::task::JoinHandle<()> {
    let interval = profiler.config.refresh_interval();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if let Err(e) = profiler.refresh(true).await {
                tracing::warn!("[Profiler] Scheduled refresh failed: {}", e);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use assert_matches::assert_matches;

    fn chess_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store.add_message("chess-club", "carl", "chess openings and chess endgames");
        store.add_message("chess-club", "dana", "my favorite chess strategy");
        store.add_message("random", "eve", "weather is nice today");
        store
    }

    fn profiler(store: Arc<MemoryStore>) -> ContentProfiler {
        ContentProfiler::new(store, ProfilerConfig::default())
    }

    #[tokio::test]
    async fn test_vector_absent_before_build() {
        let profiler = profiler(chess_store());
        assert!(profiler.vector_for("chess-club").is_none());
    }

    #[tokio::test]
    async fn test_refresh_builds_vectors() {
        let profiler = profiler(chess_store());
        profiler.refresh(false).await.unwrap();
        assert!(profiler.vector_for("chess-club").is_some());
        assert!(profiler.vector_for("random").is_some());
        assert!(profiler.vector_for("unknown").is_none());
    }

    #[tokio::test]
    async fn test_refresh_without_force_is_noop() {
        let store = chess_store();
        let profiler = profiler(store.clone());
        profiler.refresh(false).await.unwrap();
        let first = profiler.snapshot().unwrap();

        store.add_message("new-room", "fred", "fresh content here");
        profiler.refresh(false).await.unwrap();
        assert!(Arc::ptr_eq(&first, &profiler.snapshot().unwrap()));

        profiler.refresh(true).await.unwrap();
        assert!(profiler.vector_for("new-room").is_some());
    }

    #[tokio::test]
    async fn test_empty_room_has_no_vector() {
        let store = chess_store();
        store.add_room("silent", &[]);
        let profiler = profiler(store);
        profiler.refresh(false).await.unwrap();
        assert!(profiler.vector_for("silent").is_none());
    }

    #[tokio::test]
    async fn test_refresh_with_no_rooms_is_ok() {
        let profiler = profiler(Arc::new(MemoryStore::new()));
        profiler.refresh(false).await.unwrap();
        let cache = profiler.snapshot().unwrap();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_similar_rooms_excludes_self() {
        let store = chess_store();
        store.add_message("chess-talk", "gina", "chess chess openings");
        let profiler = profiler(store);
        profiler.refresh(false).await.unwrap();

        let similar = profiler.similar_rooms("chess-club", 5).unwrap();
        assert!(!similar.contains(&"chess-club".to_string()));
        assert_eq!(similar.first().map(String::as_str), Some("chess-talk"));
    }

    #[tokio::test]
    async fn test_similar_rooms_unknown_room() {
        let profiler = profiler(chess_store());
        profiler.refresh(false).await.unwrap();
        assert_matches!(
            profiler.similar_rooms("nope", 5),
            Err(CoreError::NotFound { .. })
        );
    }

    #[tokio::test]
    async fn test_topic_model_skipped_below_minimum() {
        // Two rooms with content is below the three-document minimum
        let profiler = profiler(chess_store());
        profiler.refresh(false).await.unwrap();
        assert!(profiler.snapshot().unwrap().topics.is_none());
        assert_matches!(profiler.trending_topics(5, 5), Err(CoreError::NoContent));
    }

    #[tokio::test]
    async fn test_topic_model_built_with_enough_rooms() {
        let store = chess_store();
        store.add_message("rust-room", "hana", "rust tokio async futures rust");
        store.add_message("music", "ivan", "guitar chords scales music");
        let profiler = profiler(store);
        profiler.refresh(false).await.unwrap();

        let trending = profiler.trending_topics(3, 4).unwrap();
        assert!(!trending.is_empty());
        for pair in trending.windows(2) {
            assert!(pair[0].weight >= pair[1].weight);
        }
    }
}
