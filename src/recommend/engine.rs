/**
 * Recommendation Engine
 *
 * Ranks rooms for a user by blending the content, collaborative and topic
 * signals, then post-processes: rooms the user already joined are dropped,
 * the list is cut to the requested size, and globally most-active rooms
 * backfill any shortfall. Every request is recorded in a capped per-user
 * history.
 *
 * # Degradation
 *
 * A sub-algorithm that cannot produce candidates (no interests, no
 * vectorizer, no topic model, a failing store call) degrades to an empty
 * list; the hybrid merge tolerates any subset of the three lists being
 * empty. Only two conditions surface as errors to the caller, and both are
 * expected empty states rather than failures: `NoContent` (no active
 * rooms at all) and `InsufficientData` (nothing known about the user).
 */
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::RecommenderConfig;
use crate::profile::{ContentProfiler, ProfileCache, TrendingTopic};
use crate::recommend::signals::{
    collaborative_candidates, content_candidates, hybrid_merge, topic_candidates,
};
use crate::shared::CoreError;
use crate::store::{bounded, ContentStore, UserData};

/// Recommendation algorithm selector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    Content,
    Collaborative,
    Topic,
    #[default]
    Hybrid,
}

impl Algorithm {
    /// Parse an algorithm name, defaulting to hybrid for anything
    /// unrecognized
    pub fn from_name(name: &str) -> Self {
        match name {
            "content" => Self::Content,
            "collaborative" => Self::Collaborative,
            "topic" => Self::Topic,
            _ => Self::Hybrid,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Content => "content",
            Self::Collaborative => "collaborative",
            Self::Topic => "topic",
            Self::Hybrid => "hybrid",
        };
        f.write_str(name)
    }
}

/// One recorded recommendation request
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RecommendationRecord {
    pub timestamp: DateTime<Utc>,
    pub algorithm: Algorithm,
    pub rooms: Vec<String>,
}

/// Why a room was (or would be) recommended to a user
///
/// Advisory output for display, not used in ranking. `Display` renders the
/// human-readable explanation text.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Explanation {
    pub room: String,
    /// User interests found in the room's recent messages
    pub matched_interests: Vec<String>,
    /// Room tags matching a user interest
    pub matched_tags: Vec<String>,
    /// Persisted message count of the room
    pub message_count: u64,
}

impl fmt::Display for Explanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Room '{}' was recommended because:", self.room)?;
        if !self.matched_interests.is_empty() {
            writeln!(
                f,
                "- It contains content related to your interests: {}",
                self.matched_interests.join(", ")
            )?;
        }
        if !self.matched_tags.is_empty() {
            writeln!(
                f,
                "- It has tags that match your interests: {}",
                self.matched_tags.join(", ")
            )?;
        }
        if self.message_count > 0 {
            writeln!(
                f,
                "- It's an active room with {} messages",
                self.message_count
            )?;
        }
        if self.matched_interests.is_empty() && self.matched_tags.is_empty() {
            writeln!(
                f,
                "- It's a popular room that might interest you based on your activity"
            )?;
        }
        Ok(())
    }
}

/// Room recommendation engine over a content profiler and store
pub struct Recommender {
    store: Arc<dyn ContentStore>,
    profiler: Arc<ContentProfiler>,
    config: RecommenderConfig,
    history: Mutex<HashMap<String, VecDeque<RecommendationRecord>>>,
}

impl Recommender {
    pub fn new(
        store: Arc<dyn ContentStore>,
        profiler: Arc<ContentProfiler>,
        config: RecommenderConfig,
    ) -> Self {
        Self {
            store,
            profiler,
            config,
            history: Mutex::new(HashMap::new()),
        }
    }

    /// Ranked room recommendations for a user
    ///
    /// # Errors
    ///
    /// * `NoContent` - no active rooms exist to recommend from
    /// * `InsufficientData` - the user has neither interests nor joined rooms
    /// * `TransientStore` - the store failed and no cached profile exists
    pub async fn recommend(
        &self,
        username: &str,
        top_n: usize,
        algorithm: Algorithm,
    ) -> Result<Vec<String>, CoreError> {
        let cache = self.profile_snapshot().await?;
        if cache.is_empty() {
            return Err(CoreError::NoContent);
        }

        let timeout = self.profiler.config().store_timeout();
        let user = bounded(timeout, "user_data", self.store.user_data(username)).await?;
        if !user.has_signal() {
            return Err(CoreError::insufficient_data(username));
        }

        let candidates = match algorithm {
            Algorithm::Content => content_candidates(&cache, &user.interests, top_n),
            Algorithm::Collaborative => self.collaborative(username, &user, top_n).await,
            Algorithm::Topic => topic_candidates(&cache, &user.interests, top_n),
            Algorithm::Hybrid => {
                let content = content_candidates(&cache, &user.interests, top_n);
                let collaborative = self.collaborative(username, &user, top_n).await;
                let topic = topic_candidates(&cache, &user.interests, top_n);
                hybrid_merge(
                    &content,
                    &collaborative,
                    &topic,
                    (
                        self.config.content_weight,
                        self.config.collaborative_weight,
                        self.config.topic_weight,
                    ),
                    top_n,
                )
            }
        };

        let mut result: Vec<String> = Vec::with_capacity(top_n);
        for room in candidates {
            if result.len() == top_n {
                break;
            }
            if !user.joined_rooms.contains(&room) && !result.contains(&room) {
                result.push(room);
            }
        }
        if result.len() < top_n {
            self.backfill(&mut result, &user.joined_rooms, top_n).await;
        }

        self.record(username, algorithm, &result);
        tracing::debug!(
            "[Recommender] {} recommendations for {} via {}",
            result.len(),
            username,
            algorithm
        );
        Ok(result)
    }

    /// Explain why a room suits a user
    ///
    /// # Errors
    ///
    /// * `NotFound` - the room does not exist
    pub async fn explain(&self, username: &str, room: &str) -> Result<Explanation, CoreError> {
        let timeout = self.profiler.config().store_timeout();
        let user = bounded(timeout, "user_data", self.store.user_data(username)).await?;
        let metadata = bounded(timeout, "room_metadata", self.store.room_metadata(room)).await?;
        let messages = bounded(timeout, "room_messages", self.store.room_messages(room, 100))
            .await
            .unwrap_or_default();

        let content_lower = messages
            .iter()
            .map(|m| m.content.to_lowercase())
            .collect::<Vec<_>>()
            .join(" ");
        let matched_interests: Vec<String> = user
            .interests
            .iter()
            .filter(|interest| content_lower.contains(&interest.to_lowercase()))
            .cloned()
            .collect();
        let interests_lower: Vec<String> =
            user.interests.iter().map(|i| i.to_lowercase()).collect();
        let matched_tags: Vec<String> = metadata
            .tags
            .iter()
            .filter(|tag| interests_lower.contains(&tag.to_lowercase()))
            .cloned()
            .collect();

        Ok(Explanation {
            room: room.to_string(),
            matched_interests,
            matched_tags,
            message_count: metadata.message_count,
        })
    }

    /// Rooms similar to a given room, via the content profiler
    pub async fn similar_rooms(&self, room: &str, top_n: usize) -> Result<Vec<String>, CoreError> {
        self.profile_snapshot().await?;
        self.profiler.similar_rooms(room, top_n)
    }

    /// Trending topics across all rooms
    pub async fn trending_topics(
        &self,
        num_topics: usize,
        num_words: usize,
    ) -> Result<Vec<TrendingTopic>, CoreError> {
        self.profile_snapshot().await?;
        self.profiler.trending_topics(num_topics, num_words)
    }

    /// Recorded recommendation requests for a user, oldest first
    pub fn history_for(&self, username: &str) -> Vec<RecommendationRecord> {
        self.history
            .lock()
            .unwrap()
            .get(username)
            .map(|records| records.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Ensure a profile build exists, falling back to a stale cache when a
    /// refresh fails
    async fn profile_snapshot(&self) -> Result<Arc<ProfileCache>, CoreError> {
        match self.profiler.refresh(false).await {
            Ok(()) => {}
            Err(e) => match self.profiler.snapshot() {
                Some(stale) => {
                    tracing::warn!("[Recommender] Refresh failed, using stale profile: {}", e);
                    return Ok(stale);
                }
                None => return Err(e),
            },
        }
        self.profiler.snapshot().ok_or(CoreError::NoContent)
    }

    /// Collaborative candidates, degrading to empty on store failure
    async fn collaborative(&self, username: &str, user: &UserData, top_n: usize) -> Vec<String> {
        if user.joined_rooms.is_empty() {
            return Vec::new();
        }
        let timeout = self.profiler.config().store_timeout();
        let known = match bounded(timeout, "known_users", self.store.known_users()).await {
            Ok(known) => known,
            Err(e) => {
                tracing::warn!("[Recommender] known_users failed: {}", e);
                return Vec::new();
            }
        };

        let mut others: Vec<(String, BTreeSet<String>)> = Vec::with_capacity(known.len());
        for other in known {
            if other == username {
                continue;
            }
            match bounded(timeout, "user_data", self.store.user_data(&other)).await {
                Ok(data) => others.push((other, data.joined_rooms)),
                Err(e) => {
                    tracing::debug!("[Recommender] Skipping user {}: {}", other, e);
                }
            }
        }
        collaborative_candidates(
            &user.joined_rooms,
            &others,
            self.config.similar_user_limit,
            top_n,
        )
    }

    /// Top up a short result list with globally most-active rooms
    async fn backfill(&self, result: &mut Vec<String>, joined: &BTreeSet<String>, top_n: usize) {
        let timeout = self.profiler.config().store_timeout();
        let mut active = match bounded(
            timeout,
            "active_rooms",
            self.store.active_rooms(top_n.saturating_mul(2)),
        )
        .await
        {
            Ok(active) => active,
            Err(e) => {
                tracing::warn!("[Recommender] Backfill skipped: {}", e);
                return;
            }
        };
        active.sort_by(|a, b| b.message_count.cmp(&a.message_count));
        for room in active {
            if result.len() == top_n {
                break;
            }
            if !joined.contains(&room.name) && !result.contains(&room.name) {
                result.push(room.name);
            }
        }
    }

    /// Append to the capped per-user history
    fn record(&self, username: &str, algorithm: Algorithm, rooms: &[String]) {
        let mut history = self.history.lock().unwrap();
        let records = history.entry(username.to_string()).or_default();
        records.push_back(RecommendationRecord {
            timestamp: Utc::now(),
            algorithm,
            rooms: rooms.to_vec(),
        });
        while records.len() > self.config.history_cap {
            records.pop_front();
        }
    }
}
