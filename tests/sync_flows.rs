//! Integration tests for the state-synchronization flows: sign in, load the
//! feed, submit, favorite, delete, sign out.
//!
//! Each test runs against its own wiremock server and its own temp credential
//! file for isolation. These exercise the full `AppState` intent surface the
//! way a rendering layer would: issue an intent, then re-read the snapshots.

use hearsay::api::{ApiClient, PAGE_SIZE};
use hearsay::state::{AppState, FavoriteState, SessionManager, StateError};
use hearsay::storage::CredentialStore;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_app(name: &str) -> (AppState, CredentialStore) {
    let dir = std::env::temp_dir().join(format!("hearsay_flow_test_{name}"));
    let _ = std::fs::remove_dir_all(&dir);
    let store = CredentialStore::new(dir.join("credentials.toml"));
    (AppState::new(SessionManager::new(store.clone())), store)
}

fn story_json(id: &str, title: &str, owner: &str) -> serde_json::Value {
    json!({
        "storyId": id,
        "title": title,
        "author": "an author",
        "url": format!("https://example.com/{id}"),
        "username": owner,
        "createdAt": "2024-01-15T10:00:00.000Z",
    })
}

fn user_json(username: &str, favorites: Vec<serde_json::Value>, stories: Vec<serde_json::Value>) -> serde_json::Value {
    json!({
        "username": username,
        "name": "Display Name",
        "createdAt": "2024-01-01T00:00:00.000Z",
        "favorites": favorites,
        "stories": stories,
    })
}

async fn mount_login(server: &MockServer, username: &str) {
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": user_json(username, vec![], vec![]),
            "token": "tok-1",
        })))
        .mount(server)
        .await;
}

// ============================================================================
// Session + seeding
// ============================================================================

#[tokio::test]
async fn login_seeds_favorites_and_own_stories() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": user_json(
                "alice",
                vec![story_json("fav1", "Saved", "bob")],
                vec![story_json("mine1", "Mine", "alice")],
            ),
            "token": "tok-1",
        })))
        .mount(&server)
        .await;

    let (mut app, store) = test_app("login_seeds");
    let api = ApiClient::new(server.uri());

    app.login(&api, "alice", "pw").await.unwrap();

    assert!(app.session.is_signed_in());
    assert!(app.favorites.contains("fav1"));
    assert_eq!(app.own_stories().len(), 1);
    assert_eq!(app.own_stories()[0].id, "mine1");
    assert!(store.load().is_some());
}

#[tokio::test]
async fn restore_then_logout_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/alice"))
        .and(query_param("token", "tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": user_json("alice", vec![story_json("fav1", "Saved", "bob")], vec![]),
        })))
        .mount(&server)
        .await;

    let (mut app, store) = test_app("restore_logout");
    store.save(&SecretString::from("tok-1"), "alice").unwrap();
    let api = ApiClient::new(server.uri());

    assert!(app.restore(&api).await);
    assert!(app.favorites.contains("fav1"));

    let requests_before = server.received_requests().await.unwrap().len();
    app.logout();

    // Logout is synchronous and local: session, favorites, and the stored
    // pair are gone, and no extra request was made.
    assert!(!app.session.is_signed_in());
    assert!(app.favorites.is_empty());
    assert!(app.own_stories().is_empty());
    assert!(store.load().is_none());
    assert_eq!(server.received_requests().await.unwrap().len(), requests_before);
}

#[tokio::test]
async fn logout_invalidates_pending_favorites_for_next_user() {
    let server = MockServer::start().await;
    mount_login(&server, "alice").await;
    Mock::given(method("POST"))
        .and(path("/users/alice/favorites/s1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": user_json("alice", vec![story_json("s1", "T", "bob")], vec![]),
        })))
        .mount(&server)
        .await;

    let (mut app, _store) = test_app("logout_pending");
    let api = ApiClient::new(server.uri());
    app.login(&api, "alice", "pw").await.unwrap();
    app.toggle_favorite(&api, "s1").await.unwrap();
    assert!(app.favorites.contains("s1"));

    app.logout();

    // A different user signing in starts from a clean slate.
    app.login(&api, "alice", "pw").await.unwrap();
    assert!(!app.favorites.contains("s1"));
    assert_eq!(app.favorites.state_of("s1"), FavoriteState::NotFavorited);
}

// ============================================================================
// Feed flows
// ============================================================================

#[tokio::test]
async fn initial_load_merges_two_pages_and_dedupes_overlap() {
    let server = MockServer::start().await;
    let first_page: Vec<_> = (0..PAGE_SIZE)
        .map(|i| story_json(&format!("s{i}"), "Story", "poster"))
        .collect();
    // Second page overlaps the first by one id, as happens when a story is
    // submitted between the two fetches.
    let second_page = vec![
        story_json(&format!("s{}", PAGE_SIZE - 1), "Story", "poster"),
        story_json("extra", "Story", "poster"),
    ];
    Mock::given(method("GET"))
        .and(path("/stories"))
        .and(query_param("skip", PAGE_SIZE.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "stories": second_page })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/stories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "stories": first_page })))
        .mount(&server)
        .await;

    let (mut app, _store) = test_app("two_pages");
    let api = ApiClient::new(server.uri());

    let added = app.load_feed(&api).await.unwrap();
    assert_eq!(added, PAGE_SIZE + 1);
    assert_eq!(app.feed.len(), PAGE_SIZE + 1);
}

#[tokio::test]
async fn submit_requires_session() {
    let server = MockServer::start().await;
    let (mut app, _store) = test_app("submit_no_session");
    let api = ApiClient::new(server.uri());

    let err = app
        .submit_story(&api, "Title", "Author", "https://example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, StateError::AuthRequired));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn submit_validation_failure_leaves_feed_unchanged() {
    let server = MockServer::start().await;
    mount_login(&server, "alice").await;

    let (mut app, _store) = test_app("submit_invalid");
    let api = ApiClient::new(server.uri());
    app.login(&api, "alice", "pw").await.unwrap();
    let size_before = app.feed.len();
    let requests_before = server.received_requests().await.unwrap().len();

    let err = app
        .submit_story(&api, "", "author", "https://example.com")
        .await
        .unwrap_err();

    assert!(matches!(err, StateError::Validation { field: "title" }));
    assert_eq!(app.feed.len(), size_before);
    assert_eq!(server.received_requests().await.unwrap().len(), requests_before);
}

#[tokio::test]
async fn submit_then_delete_own_story() {
    let server = MockServer::start().await;
    mount_login(&server, "alice").await;
    Mock::given(method("POST"))
        .and(path("/stories"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "story": story_json("new1", "Fresh", "alice"),
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/stories/new1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let (mut app, _store) = test_app("submit_delete");
    let api = ApiClient::new(server.uri());
    app.login(&api, "alice", "pw").await.unwrap();

    let story = app
        .submit_story(&api, "Fresh", "me", "https://example.com/new")
        .await
        .unwrap();
    assert_eq!(story.id, "new1");
    assert!(app.feed.contains("new1"));
    assert_eq!(app.own_stories()[0].id, "new1");

    app.delete_story(&api, "new1").await.unwrap();
    assert!(!app.feed.contains("new1"));
    assert!(app.own_stories().is_empty());
}

#[tokio::test]
async fn delete_of_foreign_story_is_blocked_locally() {
    let server = MockServer::start().await;
    mount_login(&server, "alice").await;
    Mock::given(method("GET"))
        .and(path("/stories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "stories": [story_json("theirs", "Not Mine", "bob")],
        })))
        .mount(&server)
        .await;

    let (mut app, _store) = test_app("delete_foreign");
    let api = ApiClient::new(server.uri());
    app.login(&api, "alice", "pw").await.unwrap();
    app.load_feed(&api).await.unwrap();
    let requests_before = server.received_requests().await.unwrap().len();

    let err = app.delete_story(&api, "theirs").await.unwrap_err();
    assert!(matches!(err, StateError::Ownership { ref owner, .. } if owner == "bob"));
    assert!(app.feed.contains("theirs"));
    // The ownership gate fired before any DELETE went out.
    assert_eq!(server.received_requests().await.unwrap().len(), requests_before);
}

// ============================================================================
// Favorites flows
// ============================================================================

#[tokio::test]
async fn toggle_favorite_requires_session() {
    let server = MockServer::start().await;
    let (mut app, _store) = test_app("fav_no_session");
    let api = ApiClient::new(server.uri());

    let err = app.toggle_favorite(&api, "s1").await.unwrap_err();
    assert!(matches!(err, StateError::AuthRequired));
    assert!(app.favorites.is_empty());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn toggle_favorite_refreshes_own_stories_from_response() {
    let server = MockServer::start().await;
    mount_login(&server, "alice").await;
    Mock::given(method("POST"))
        .and(path("/users/alice/favorites/s1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": user_json(
                "alice",
                vec![story_json("s1", "T", "bob")],
                vec![story_json("mine-late", "Synced", "alice")],
            ),
        })))
        .mount(&server)
        .await;

    let (mut app, _store) = test_app("fav_refresh");
    let api = ApiClient::new(server.uri());
    app.login(&api, "alice", "pw").await.unwrap();

    let favorited = app.toggle_favorite(&api, "s1").await.unwrap();
    assert!(favorited);
    // The server's user record is adopted wholesale, own stories included.
    assert_eq!(app.own_stories().len(), 1);
    assert_eq!(app.own_stories()[0].id, "mine-late");
}

#[tokio::test]
async fn clear_favorites_empties_the_set() {
    let server = MockServer::start().await;
    mount_login(&server, "alice").await;
    Mock::given(method("POST"))
        .and(path("/users/alice/favorites/a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": user_json("alice", vec![story_json("a", "T", "x")], vec![]),
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/users/alice/favorites/a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": user_json("alice", vec![], vec![]),
        })))
        .mount(&server)
        .await;

    let (mut app, _store) = test_app("clear_favs");
    let api = ApiClient::new(server.uri());
    app.login(&api, "alice", "pw").await.unwrap();
    app.toggle_favorite(&api, "a").await.unwrap();
    assert!(app.favorites.contains("a"));

    app.clear_favorites(&api).await.unwrap();
    assert!(app.favorites.is_empty());
}

// ============================================================================
// Search over the live feed
// ============================================================================

#[tokio::test]
async fn search_filters_loaded_feed_in_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "stories": [
                story_json("a", "Rust Guide", "u1"),
                story_json("b", "Go Guide", "u2"),
                story_json("c", "rust tips", "u3"),
            ],
        })))
        .mount(&server)
        .await;

    let (mut app, _store) = test_app("search");
    let api = ApiClient::new(server.uri());
    app.load_feed(&api).await.unwrap();

    let hits: Vec<&str> = app.search("rust").iter().map(|s| s.id.as_str()).collect();
    assert_eq!(hits, vec!["a", "c"]);
}
