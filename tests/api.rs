mod common;

use std::io::Write;

use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde_json::{Value, json};

use common::TestServer;

fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    let mut writer = zip::ZipWriter::new(&mut cursor);
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored);

    for (name, data) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap();

    cursor.into_inner()
}

fn upload_form(file_name: &str, data: Vec<u8>, title: &str) -> Form {
    Form::new()
        .part("file", Part::bytes(data).file_name(file_name.to_string()))
        .text("title", title.to_string())
        .text("desc", "test game")
        .text("username", "admin")
}

async fn upload(server: &TestServer, file_name: &str, data: Vec<u8>, title: &str) -> Value {
    let response = server
        .client
        .post(server.url("/api/games/upload"))
        .multipart(upload_form(file_name, data, title))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    response.json::<Value>().await.unwrap()["data"].clone()
}

#[tokio::test]
async fn health_check() {
    let server = TestServer::start().await;

    let response = server.client.get(server.url("/health")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn register_login_and_duplicate() {
    let server = TestServer::start().await;

    let response = server
        .client
        .post(server.url("/api/auth/register"))
        .json(&json!({"username": "alice", "password": "secret", "email": "a@example.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["role"], "STUDENT");

    // Duplicate username is rejected.
    let response = server
        .client
        .post(server.url("/api/auth/register"))
        .json(&json!({"username": "alice", "password": "other"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = server
        .client
        .post(server.url("/api/auth/login"))
        .json(&json!({"username": "alice", "password": "secret"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["username"], "alice");

    // Wrong password and unknown username both yield the same 401.
    for payload in [
        json!({"username": "alice", "password": "wrong"}),
        json!({"username": "nobody", "password": "secret"}),
    ] {
        let response = server
            .client
            .post(server.url("/api/auth/login"))
            .json(&payload)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"], "Invalid username or password");
    }
}

#[tokio::test]
async fn upload_single_html_and_play() {
    let server = TestServer::start().await;

    let game = upload(
        &server,
        "runner.html",
        b"<html><body>go</body></html>".to_vec(),
        "Runner",
    )
    .await;

    let play_url = game["playUrl"].as_str().unwrap();
    assert!(play_url.ends_with("/index.html"));

    let response = server.client.get(server.url(play_url)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "text/html"
    );
    assert_eq!(response.text().await.unwrap(), "<html><body>go</body></html>");
}

#[tokio::test]
async fn upload_zip_prefers_index_html() {
    let server = TestServer::start().await;

    let data = build_zip(&[
        ("readme.txt", b"notes".as_slice()),
        ("level.html", b"<html>level</html>".as_slice()),
        ("www/index.html", b"<html>main</html>".as_slice()),
        ("assets/app.js", b"console.log(1)".as_slice()),
    ]);
    let game = upload(&server, "bundle.zip", data, "Bundle").await;

    let play_url = game["playUrl"].as_str().unwrap();
    assert!(play_url.ends_with("/www/index.html"));

    // Sibling assets are served with their own content types.
    let asset_url = play_url.replace("www/index.html", "assets/app.js");
    let response = server.client.get(server.url(&asset_url)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "application/javascript"
    );
}

#[tokio::test]
async fn upload_zip_first_html_wins_without_index() {
    let server = TestServer::start().await;

    let data = build_zip(&[
        ("a.html", b"<html>a</html>".as_slice()),
        ("b.html", b"<html>b</html>".as_slice()),
    ]);
    let game = upload(&server, "bundle.zip", data, "NoIndex").await;

    assert!(game["playUrl"].as_str().unwrap().ends_with("/a.html"));
}

#[tokio::test]
async fn upload_zip_without_html_is_rejected() {
    let server = TestServer::start().await;

    let data = build_zip(&[("app.js", b"console.log(1)".as_slice())]);
    let response = server
        .client
        .post(server.url("/api/games/upload"))
        .multipart(upload_form("bundle.zip", data, "Broken"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn thumbnail_file_is_stored_in_upload_folder() {
    let server = TestServer::start().await;

    let form = Form::new()
        .part(
            "file",
            Part::bytes(b"<html></html>".to_vec()).file_name("g.html"),
        )
        .part(
            "thumbnail",
            Part::bytes(b"fake png".to_vec()).file_name("cover.png"),
        )
        .text("title", "With Art")
        .text("desc", "thumbnailed")
        .text("username", "admin");
    let response = server
        .client
        .post(server.url("/api/games/upload"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    let game = &body["data"];

    let play_url = game["playUrl"].as_str().unwrap();
    let folder = play_url
        .strip_prefix("/files/")
        .unwrap()
        .split('/')
        .next()
        .unwrap();

    // Stored next to the game's own objects, named by the original extension.
    assert_eq!(
        game["thumbnailUrl"].as_str().unwrap(),
        format!("{folder}/thumbnail.png")
    );
    let full_url = game["thumbnailFullUrl"].as_str().unwrap();
    assert_eq!(full_url, format!("/files/{folder}/thumbnail.png"));

    let response = server.client.get(server.url(full_url)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "image/png"
    );
    assert_eq!(response.bytes().await.unwrap().as_ref(), b"fake png");
}

#[tokio::test]
async fn thumbnail_url_passes_through_verbatim() {
    let server = TestServer::start().await;

    let form = upload_form("g.html", b"<html></html>".to_vec(), "Linked Art")
        .text("thumbnailUrl", "https://cdn.example.com/t.png");
    let response = server
        .client
        .post(server.url("/api/games/upload"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();

    assert_eq!(body["data"]["thumbnailUrl"], "https://cdn.example.com/t.png");
    assert_eq!(
        body["data"]["thumbnailFullUrl"],
        "https://cdn.example.com/t.png"
    );
}

#[tokio::test]
async fn update_stores_new_thumbnail_in_existing_folder() {
    let server = TestServer::start().await;

    let game = upload(&server, "g.html", b"<html></html>".to_vec(), "Plain").await;
    let id = game["id"].as_i64().unwrap();
    let folder = game["playUrl"]
        .as_str()
        .unwrap()
        .strip_prefix("/files/")
        .unwrap()
        .split('/')
        .next()
        .unwrap()
        .to_string();

    let form = Form::new()
        .part(
            "thumbnail",
            Part::bytes(b"fake jpeg".to_vec()).file_name("cover.jpg"),
        )
        .text("title", "Plain")
        .text("desc", "now with art")
        .text("username", "admin");
    let response = server
        .client
        .put(server.url(&format!("/api/games/{id}")))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();

    assert_eq!(
        body["data"]["thumbnailUrl"].as_str().unwrap(),
        format!("{folder}/thumbnail.jpg")
    );

    let response = server
        .client
        .get(server.url(&format!("/files/{folder}/thumbnail.jpg")))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.bytes().await.unwrap().as_ref(), b"fake jpeg");
}

#[tokio::test]
async fn game_detail_counts_views() {
    let server = TestServer::start().await;

    let game = upload(&server, "g.html", b"<html></html>".to_vec(), "Views").await;
    let id = game["id"].as_i64().unwrap();

    for expected in 1..=2 {
        let response = server
            .client
            .get(server.url(&format!("/api/games/{id}")))
            .send()
            .await
            .unwrap();
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["data"]["views"].as_i64().unwrap(), expected);
    }
}

#[tokio::test]
async fn only_admins_can_update_and_delete() {
    let server = TestServer::start().await;

    let game = upload(&server, "g.html", b"<html></html>".to_vec(), "Guarded").await;
    let id = game["id"].as_i64().unwrap();

    let student_update = Form::new()
        .text("title", "Hacked")
        .text("desc", "nope")
        .text("username", "student");
    let response = server
        .client
        .put(server.url(&format!("/api/games/{id}")))
        .multipart(student_update)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let admin_update = Form::new()
        .text("title", "Renamed")
        .text("desc", "updated")
        .text("username", "admin");
    let response = server
        .client
        .put(server.url(&format!("/api/games/{id}")))
        .multipart(admin_update)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["title"], "Renamed");

    let response = server
        .client
        .delete(server.url(&format!("/api/games/{id}?username=student")))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = server
        .client
        .delete(server.url(&format!("/api/games/{id}?username=admin")))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = server
        .client
        .get(server.url(&format!("/api/games/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn like_toggles_and_is_idempotent_per_state() {
    let server = TestServer::start().await;

    let game = upload(&server, "g.html", b"<html></html>".to_vec(), "Likeable").await;
    let id = game["id"].as_i64().unwrap();
    let like_url = server.url(&format!("/api/games/{id}/like?username=student"));
    let status_url = server.url(&format!("/api/games/{id}/like/status?username=student"));

    let body: Value = server
        .client
        .post(&like_url)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["isLiked"], true);
    assert_eq!(body["data"]["totalLikes"].as_i64().unwrap(), 1);

    let body: Value = server
        .client
        .get(&status_url)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"], true);

    // Second toggle removes the like.
    let body: Value = server
        .client
        .post(&like_url)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["isLiked"], false);
    assert_eq!(body["data"]["totalLikes"].as_i64().unwrap(), 0);

    // Missing user reads as not liked rather than an error.
    let body: Value = server
        .client
        .get(server.url(&format!("/api/games/{id}/like/status?username=ghost")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"], false);
}

#[tokio::test]
async fn comments_and_reply_validation() {
    let server = TestServer::start().await;

    let first = upload(&server, "g.html", b"<html></html>".to_vec(), "First").await;
    let second = upload(&server, "h.html", b"<html></html>".to_vec(), "Second").await;
    let first_id = first["id"].as_i64().unwrap();
    let second_id = second["id"].as_i64().unwrap();

    let response = server
        .client
        .post(server.url(&format!("/api/games/{first_id}/comments")))
        .json(&json!({"username": "student", "content": "fun!"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    let comment_id = body["data"]["id"].as_i64().unwrap();

    // Replying from another game to this comment is rejected.
    let response = server
        .client
        .post(server.url(&format!("/api/games/{second_id}/comments")))
        .json(&json!({
            "username": "student",
            "content": "cross-post",
            "parentCommentId": comment_id,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = server
        .client
        .post(server.url(&format!("/api/games/{first_id}/comments")))
        .json(&json!({
            "username": "admin",
            "content": "glad you liked it",
            "parentCommentId": comment_id,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = server
        .client
        .get(server.url(&format!("/api/games/{first_id}/comments")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let comments = body["data"].as_array().unwrap();
    assert_eq!(comments.len(), 2);
    // Newest first, joined with author usernames.
    assert_eq!(comments[0]["username"], "admin");
    assert_eq!(comments[1]["username"], "student");
}

#[tokio::test]
async fn category_lifecycle_with_soft_delete() {
    let server = TestServer::start().await;

    let response = server
        .client
        .post(server.url("/api/games-categories"))
        .json(&json!({"name": "ARCADE", "icon": "🕹️"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    let id = body["data"]["id"].as_i64().unwrap();

    // Duplicate names are rejected, even against the seeds.
    for name in ["ARCADE", "QUIZ"] {
        let response = server
            .client
            .post(server.url("/api/games-categories"))
            .json(&json!({"name": name}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    let response = server
        .client
        .delete(server.url(&format!("/api/games-categories/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = server
        .client
        .get(server.url(&format!("/api/games-categories/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body: Value = server
        .client
        .get(server.url("/api/games-categories"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert!(!names.contains(&"ARCADE"));
}

#[tokio::test]
async fn game_center_groups_games_by_category() {
    let server = TestServer::start().await;

    let body: Value = server
        .client
        .get(server.url("/api/games/categories"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let quiz_id = body["data"][0]["id"].as_i64().unwrap();

    let form = Form::new()
        .part(
            "file",
            Part::bytes(b"<html></html>".to_vec()).file_name("quiz.html"),
        )
        .text("title", "Capital Quiz")
        .text("desc", "geography")
        .text("categoryId", quiz_id.to_string())
        .text("username", "admin");
    let response = server
        .client
        .post(server.url("/api/games/upload"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = server
        .client
        .get(server.url("/api/game-center/game-categories"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let sections = body["data"].as_array().unwrap();
    let quiz = sections
        .iter()
        .find(|s| s["name"] == "QUIZ")
        .expect("QUIZ section");
    assert_eq!(quiz["games"][0]["title"], "Capital Quiz");
}

#[tokio::test]
async fn play_tracking_feeds_leaderboard_and_history() {
    let server = TestServer::start().await;

    let game = upload(&server, "g.html", b"<html></html>".to_vec(), "Scored").await;
    let id = game["id"].as_i64().unwrap();

    for score in [100, 250] {
        let response = server
            .client
            .post(server.url(&format!(
                "/api/games/{id}/play?userId=student&score={score}&duration=60"
            )))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let body: Value = server
        .client
        .get(server.url("/api/auth/leaderboard"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let top = &body["data"][0];
    assert_eq!(top["username"], "student");
    assert_eq!(top["totalScore"].as_i64().unwrap(), 350);
    assert_eq!(top["gamesPlayed"].as_i64().unwrap(), 2);

    let body: Value = server
        .client
        .get(server.url("/api/auth/user/student"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let student_id = body["data"]["id"].as_i64().unwrap();

    let body: Value = server
        .client
        .get(server.url(&format!(
            "/api/students/{student_id}/play-history?page=0&size=1"
        )))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["totalItems"].as_i64().unwrap(), 2);
    assert_eq!(body["data"]["totalPages"].as_i64().unwrap(), 2);
    let content = body["data"]["content"].as_array().unwrap();
    assert_eq!(content.len(), 1);
    // Newest first.
    assert_eq!(content[0]["score"].as_i64().unwrap(), 250);
    assert_eq!(content[0]["gameTitle"], "Scored");

    let body: Value = server
        .client
        .get(server.url(&format!("/api/students/{student_id}/profile")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["totalScore"].as_i64().unwrap(), 350);
}
