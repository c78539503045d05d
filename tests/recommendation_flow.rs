//! End-to-end recommendation flows over the in-memory store

use std::collections::BTreeSet;
use std::sync::Arc;

use assert_matches::assert_matches;
use roomcast::config::CoreConfig;
use roomcast::profile::ContentProfiler;
use roomcast::recommend::{Algorithm, Recommender};
use roomcast::shared::CoreError;
use roomcast::store::{MemoryStore, UserData};

fn rooms(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn interests(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// A small community: a chess room, a music room and a catch-all
fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.add_room("chess-club", &["chess", "strategy"]);
    store.add_message("chess-club", "carl", "chess openings and endgame strategy");
    store.add_message("chess-club", "dana", "my favorite chess gambit");
    store.add_message("chess-club", "carl", "queen sacrifice in chess");
    store.add_room("music-hall", &["music"]);
    store.add_message("music-hall", "eve", "guitar chords and piano scales");
    store.add_room("random", &[]);
    store.add_message("random", "fred", "weather looks nice today");
    store
}

fn recommender(store: Arc<MemoryStore>) -> Recommender {
    let config = CoreConfig::default();
    let profiler = Arc::new(ContentProfiler::new(store.clone(), config.profiler));
    Recommender::new(store, profiler, config.recommender)
}

#[tokio::test]
async fn test_content_recommendations_match_interests() {
    let store = seeded_store();
    store.set_user(
        "alice",
        UserData {
            interests: interests(&["chess"]),
            ..Default::default()
        },
    );
    let recommender = recommender(store);

    let result = recommender
        .recommend("alice", 2, Algorithm::Content)
        .await
        .unwrap();
    assert_eq!(result.first().map(String::as_str), Some("chess-club"));
}

#[tokio::test]
async fn test_joined_rooms_are_never_recommended() {
    let store = seeded_store();
    store.set_user(
        "alice",
        UserData {
            joined_rooms: rooms(&["chess-club"]),
            interests: interests(&["chess"]),
            ..Default::default()
        },
    );
    let recommender = recommender(store);

    let result = recommender
        .recommend("alice", 5, Algorithm::Hybrid)
        .await
        .unwrap();
    assert!(!result.contains(&"chess-club".to_string()));
}

#[tokio::test]
async fn test_collaborative_follows_similar_users() {
    let store = seeded_store();
    store.set_user(
        "alice",
        UserData {
            joined_rooms: rooms(&["random"]),
            ..Default::default()
        },
    );
    store.set_user(
        "bob",
        UserData {
            joined_rooms: rooms(&["random", "chess-club"]),
            ..Default::default()
        },
    );
    let recommender = recommender(store);

    let result = recommender
        .recommend("alice", 1, Algorithm::Collaborative)
        .await
        .unwrap();
    assert_eq!(result, vec!["chess-club".to_string()]);
}

#[tokio::test]
async fn test_backfill_tops_up_with_active_rooms() {
    let store = seeded_store();
    // Joined rooms but no overlapping users, so collaborative filtering
    // produces nothing and the most active rooms fill the list
    store.set_user(
        "alice",
        UserData {
            joined_rooms: rooms(&["random"]),
            ..Default::default()
        },
    );
    let recommender = recommender(store);

    let result = recommender
        .recommend("alice", 2, Algorithm::Collaborative)
        .await
        .unwrap();
    // chess-club has the most messages; random is excluded as joined
    assert_eq!(
        result,
        vec!["chess-club".to_string(), "music-hall".to_string()]
    );
}

#[tokio::test]
async fn test_unknown_user_is_insufficient_data() {
    let recommender = recommender(seeded_store());
    let result = recommender.recommend("ghost", 5, Algorithm::Hybrid).await;
    assert_matches!(result, Err(CoreError::InsufficientData { .. }));
}

#[tokio::test]
async fn test_empty_store_is_no_content() {
    let store = Arc::new(MemoryStore::new());
    store.set_user(
        "alice",
        UserData {
            interests: interests(&["chess"]),
            ..Default::default()
        },
    );
    let recommender = recommender(store);
    let result = recommender.recommend("alice", 5, Algorithm::Hybrid).await;
    assert_matches!(result, Err(CoreError::NoContent));
}

#[tokio::test]
async fn test_history_records_each_request() {
    let store = seeded_store();
    store.set_user(
        "alice",
        UserData {
            interests: interests(&["chess"]),
            ..Default::default()
        },
    );
    let recommender = recommender(store);

    assert!(recommender.history_for("alice").is_empty());
    let first = recommender
        .recommend("alice", 2, Algorithm::Content)
        .await
        .unwrap();
    recommender
        .recommend("alice", 2, Algorithm::Hybrid)
        .await
        .unwrap();

    let history = recommender.history_for("alice");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].algorithm, Algorithm::Content);
    assert_eq!(history[0].rooms, first);
    assert_eq!(history[1].algorithm, Algorithm::Hybrid);
    assert!(recommender.history_for("bob").is_empty());
}

#[tokio::test]
async fn test_explain_reports_interest_and_tag_matches() {
    let store = seeded_store();
    store.set_user(
        "alice",
        UserData {
            interests: interests(&["chess", "cooking"]),
            ..Default::default()
        },
    );
    let recommender = recommender(store);

    let explanation = recommender.explain("alice", "chess-club").await.unwrap();
    assert_eq!(explanation.matched_interests, interests(&["chess"]));
    assert_eq!(explanation.matched_tags, interests(&["chess"]));
    assert_eq!(explanation.message_count, 3);

    let text = explanation.to_string();
    assert!(text.contains("Room 'chess-club' was recommended because:"));
    assert!(text.contains("active room with 3 messages"));
}

#[tokio::test]
async fn test_explain_unknown_room_is_not_found() {
    let recommender = recommender(seeded_store());
    let result = recommender.explain("alice", "nope").await;
    assert_matches!(result, Err(CoreError::NotFound { .. }));
}

#[tokio::test]
async fn test_similar_rooms_passthrough_excludes_self() {
    let store = seeded_store();
    store.add_message("chess-talk", "gina", "chess chess openings");
    let recommender = recommender(store);

    let similar = recommender.similar_rooms("chess-club", 5).await.unwrap();
    assert!(!similar.contains(&"chess-club".to_string()));
    assert_eq!(similar.first().map(String::as_str), Some("chess-talk"));
}

#[tokio::test]
async fn test_trending_topics_orders_by_weight() {
    let store = seeded_store();
    store.add_message("rust-room", "hana", "rust tokio async futures rust");
    let recommender = recommender(store);

    let trending = recommender.trending_topics(3, 4).await.unwrap();
    assert!(!trending.is_empty());
    for pair in trending.windows(2) {
        assert!(pair[0].weight >= pair[1].weight);
    }
}
