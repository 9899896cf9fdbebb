mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::{Value, json};

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new();
    let response = app.server.get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "ok");
}

#[tokio::test]
async fn song_lifecycle_and_ownership() {
    let app = TestApp::new();
    let author = app.register("author@x.com").await;
    let stranger = app.register("stranger@x.com").await;
    let admin = app.register_admin("admin@x.com").await;

    app.server
        .post("/api/songlyrics")
        .json(&json!({ "title": "T", "artist": "A", "content": "C" }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let id = app.create_song(&author, "First").await;

    let song = app.server.get(&format!("/api/songlyrics/{id}")).await.json::<Value>();
    assert_eq!(song["title"], "First");
    assert_eq!(song["authorEmail"], "author@x.com");
    assert_eq!(song["likeCount"], 0);
    assert_eq!(song["hasLiked"], false);

    let update = json!({ "title": "Renamed", "artist": "A", "content": "New words" });
    app.server
        .put(&format!("/api/songlyrics/{id}"))
        .authorization_bearer(&stranger)
        .json(&update)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    app.server
        .put(&format!("/api/songlyrics/{id}"))
        .authorization_bearer(&author)
        .json(&update)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let song = app.server.get(&format!("/api/songlyrics/{id}")).await.json::<Value>();
    assert_eq!(song["title"], "Renamed");
    assert!(song["updatedAt"].is_string());

    app.server
        .delete(&format!("/api/songlyrics/{id}"))
        .authorization_bearer(&stranger)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    app.server
        .delete(&format!("/api/songlyrics/{id}"))
        .authorization_bearer(&admin)
        .await
        .assert_status(StatusCode::NO_CONTENT);
    app.server
        .get(&format!("/api/songlyrics/{id}"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn non_numeric_ids_are_json_bad_requests() {
    let app = TestApp::new();
    let token = app.register("a@x.com").await;

    let song = app.server.get("/api/songlyrics/abc").await;
    song.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(song.json::<Value>()["message"], "Invalid route parameter.");

    let comment = app
        .server
        .put("/api/songlyrics/1/comments/latest")
        .authorization_bearer(&token)
        .json(&json!({ "text": "hi" }))
        .await;
    comment.assert_status(StatusCode::BAD_REQUEST);
    assert!(!comment.text().contains("i64"));
}

#[tokio::test]
async fn commenting_on_a_missing_song_is_not_found() {
    let app = TestApp::new();
    let token = app.register("a@x.com").await;

    let response = app
        .server
        .post("/api/songlyrics/9999/comments")
        .authorization_bearer(&token)
        .json(&json!({ "text": "hello" }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["message"], "Song lyric not found.");
}

#[tokio::test]
async fn song_validation() {
    let app = TestApp::new();
    let token = app.register("a@x.com").await;

    let response = app
        .server
        .post("/api/songlyrics")
        .authorization_bearer(&token)
        .json(&json!({ "title": "x".repeat(201), "artist": "", "content": "words" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let errors = &response.json::<Value>()["errors"];
    assert!(errors["title"].is_array());
    assert!(errors["artist"].is_array());
}

#[tokio::test]
async fn listing_is_newest_first_with_has_liked() {
    let app = TestApp::new();
    let token = app.register("a@x.com").await;
    let first = app.create_song(&token, "Older").await;
    let second = app.create_song(&token, "Newer").await;

    app.server
        .post(&format!("/api/songlyrics/{first}/likes"))
        .authorization_bearer(&token)
        .await
        .assert_status_ok();

    let anonymous = app.server.get("/api/songlyrics").await.json::<Value>();
    let ids: Vec<i64> = anonymous
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![second, first]);
    assert!(anonymous.as_array().unwrap().iter().all(|s| s["hasLiked"] == false));

    let mine = app
        .server
        .get("/api/songlyrics")
        .authorization_bearer(&token)
        .await
        .json::<Value>();
    assert_eq!(mine[1]["hasLiked"], true);
    assert_eq!(mine[1]["likeCount"], 1);
}

#[tokio::test]
async fn comments_flow() {
    let app = TestApp::new();
    let author = app.register("author@x.com").await;
    let other = app.register("other@x.com").await;
    let song = app.create_song(&author, "Song").await;
    let other_song = app.create_song(&author, "Other song").await;

    app.server
        .post("/api/songlyrics/9999/comments")
        .authorization_bearer(&other)
        .json(&json!({ "text": "hello" }))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let response = app
        .server
        .post(&format!("/api/songlyrics/{song}/comments"))
        .authorization_bearer(&other)
        .json(&json!({ "text": "Great lyrics" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let comment = response.json::<Value>();
    let comment_id = comment["id"].as_i64().unwrap();
    assert_eq!(comment["songLyricId"], song);
    assert_eq!(comment["userEmail"], "other@x.com");

    let list = app
        .server
        .get(&format!("/api/songlyrics/{song}/comments"))
        .await
        .json::<Value>();
    assert_eq!(list.as_array().unwrap().len(), 1);

    // Wrong parent song.
    app.server
        .put(&format!("/api/songlyrics/{other_song}/comments/{comment_id}"))
        .authorization_bearer(&other)
        .json(&json!({ "text": "moved" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    // The song's author does not own the comment.
    app.server
        .put(&format!("/api/songlyrics/{song}/comments/{comment_id}"))
        .authorization_bearer(&author)
        .json(&json!({ "text": "hijacked" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    app.server
        .put(&format!("/api/songlyrics/{song}/comments/{comment_id}"))
        .authorization_bearer(&other)
        .json(&json!({ "text": "Edited" }))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    app.server
        .delete(&format!("/api/songlyrics/{song}/comments/{comment_id}"))
        .authorization_bearer(&other)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let list = app
        .server
        .get(&format!("/api/songlyrics/{song}/comments"))
        .await
        .json::<Value>();
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn likes_toggle_and_count() {
    let app = TestApp::new();
    let token = app.register("a@x.com").await;
    let song = app.create_song(&token, "Song").await;

    app.server
        .post("/api/songlyrics/9999/likes")
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let first = app
        .server
        .post(&format!("/api/songlyrics/{song}/likes"))
        .authorization_bearer(&token)
        .await
        .json::<Value>();
    assert_eq!(first["liked"], true);

    let check = app
        .server
        .get(&format!("/api/songlyrics/{song}/likes/check"))
        .authorization_bearer(&token)
        .await
        .json::<Value>();
    assert_eq!(check, json!(true));

    let count = app
        .server
        .get(&format!("/api/songlyrics/{song}/likes/count"))
        .await
        .json::<Value>();
    assert_eq!(count, json!(1));

    let likers = app
        .server
        .get(&format!("/api/songlyrics/{song}/likes"))
        .await
        .json::<Value>();
    assert_eq!(likers[0]["userFirstName"], "First");

    let second = app
        .server
        .post(&format!("/api/songlyrics/{song}/likes"))
        .authorization_bearer(&token)
        .await
        .json::<Value>();
    assert_eq!(second["liked"], false);

    let count = app
        .server
        .get(&format!("/api/songlyrics/{song}/likes/count"))
        .await
        .json::<Value>();
    assert_eq!(count, json!(0));
}

#[tokio::test]
async fn profile_views_and_stats() {
    let app = TestApp::new();
    let author = app.register("author@x.com").await;
    let fan = app.register("fan@x.com").await;
    let song = app.create_song(&author, "Hit").await;
    let author_id = app.user_id("author@x.com").await;

    app.server
        .post(&format!("/api/songlyrics/{song}/likes"))
        .authorization_bearer(&fan)
        .await
        .assert_status_ok();
    app.server
        .post(&format!("/api/songlyrics/{song}/comments"))
        .authorization_bearer(&fan)
        .json(&json!({ "text": "Love it" }))
        .await
        .assert_status(StatusCode::CREATED);

    app.server
        .put("/api/profiles/me")
        .authorization_bearer(&author)
        .json(&json!({ "firstName": "Ada", "lastName": "Lovelace" }))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let profile = app
        .server
        .get(&format!("/api/profiles/{author_id}"))
        .authorization_bearer(&fan)
        .await
        .json::<Value>();
    assert_eq!(profile["firstName"], "Ada");

    let stats = app
        .server
        .get("/api/profiles/me/stats")
        .authorization_bearer(&author)
        .await
        .json::<Value>();
    assert_eq!(stats["totalSongLyrics"], 1);
    assert_eq!(stats["totalLikesReceived"], 1);
    assert_eq!(stats["totalCommentsReceived"], 1);
    assert_eq!(stats["totalCommentsWritten"], 0);

    let fan_stats = app
        .server
        .get("/api/profiles/me/stats")
        .authorization_bearer(&fan)
        .await
        .json::<Value>();
    assert_eq!(fan_stats["totalLikesGiven"], 1);
    assert_eq!(fan_stats["totalCommentsWritten"], 1);

    let songs = app
        .server
        .get("/api/profiles/me/songlyrics")
        .authorization_bearer(&author)
        .await
        .json::<Value>();
    assert_eq!(songs[0]["likeCount"], 1);
    assert_eq!(songs[0]["commentCount"], 1);

    let activity = app
        .server
        .get("/api/profiles/me/activity")
        .authorization_bearer(&fan)
        .await
        .json::<Value>();
    assert_eq!(activity["recentComments"][0]["songTitle"], "Hit");
    assert_eq!(activity["recentLikes"][0]["songTitle"], "Hit");
    assert!(activity["recentSongs"].as_array().unwrap().is_empty());

    app.server
        .get("/api/profiles/9999")
        .authorization_bearer(&fan)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_dashboard_and_moderation() {
    let app = TestApp::new();
    let admin = app.register_admin("admin@x.com").await;
    let user = app.register("user@x.com").await;
    let song = app.create_song(&user, "Popular").await;

    app.server
        .post(&format!("/api/songlyrics/{song}/likes"))
        .authorization_bearer(&user)
        .await
        .assert_status_ok();
    let comment = app
        .server
        .post(&format!("/api/songlyrics/{song}/comments"))
        .authorization_bearer(&user)
        .json(&json!({ "text": "spam" }))
        .await
        .json::<Value>()["id"]
        .as_i64()
        .unwrap();

    let stats = app
        .server
        .get("/api/admin/stats")
        .authorization_bearer(&admin)
        .await
        .json::<Value>();
    assert_eq!(stats["totalUsers"], 2);
    assert_eq!(stats["totalSongs"], 1);
    assert_eq!(stats["totalComments"], 1);
    assert_eq!(stats["totalLikes"], 1);
    assert_eq!(stats["popularSongs"][0]["likeCount"], 1);
    assert_eq!(stats["recentSignups"].as_array().unwrap().len(), 2);

    let user_id = app.user_id("user@x.com").await;
    app.server
        .put(&format!("/api/admin/users/{user_id}/roles"))
        .authorization_bearer(&admin)
        .json(&json!({ "roles": ["Superuser"] }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    app.server
        .put("/api/admin/users/9999/roles")
        .authorization_bearer(&admin)
        .json(&json!({ "roles": ["User"] }))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    app.server
        .delete(&format!("/api/admin/comments/{comment}"))
        .authorization_bearer(&admin)
        .await
        .assert_status_ok();
    app.server
        .delete(&format!("/api/admin/comments/{comment}"))
        .authorization_bearer(&admin)
        .await
        .assert_status(StatusCode::NOT_FOUND);

    app.server
        .delete(&format!("/api/admin/songs/{song}"))
        .authorization_bearer(&admin)
        .await
        .assert_status_ok();
    app.server
        .delete(&format!("/api/admin/songs/{song}"))
        .authorization_bearer(&user)
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn deleting_account_removes_owned_content() {
    let app = TestApp::new();
    let author = app.register("author@x.com").await;
    let fan = app.register("fan@x.com").await;
    let song = app.create_song(&author, "Soon gone").await;
    let fan_song = app.create_song(&fan, "Stays").await;

    app.server
        .post(&format!("/api/songlyrics/{fan_song}/comments"))
        .authorization_bearer(&author)
        .json(&json!({ "text": "nice" }))
        .await
        .assert_status(StatusCode::CREATED);

    app.server
        .delete("/api/profiles/me")
        .authorization_bearer(&author)
        .json(&json!({ "password": common::PASSWORD }))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    app.server
        .get(&format!("/api/songlyrics/{song}"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    let comments = app
        .server
        .get(&format!("/api/songlyrics/{fan_song}/comments"))
        .await
        .json::<Value>();
    assert!(comments.as_array().unwrap().is_empty());

    // The token outlives the account but no longer resolves to a profile.
    app.server
        .get("/api/profiles/me")
        .authorization_bearer(&author)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}
