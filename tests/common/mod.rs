#![allow(dead_code)]

use makaba::{Client, ClientBuilder};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub fn global_boards() -> Value {
    json!({
        "Разное": [
            { "id": "b", "name": "Бред", "category": "Разное", "bump_limit": "500" },
            { "id": "soc", "name": "Общение", "category": "Разное" }
        ],
        "Техника и софт": [
            { "id": "pr", "name": "Программирование", "category": "Техника и софт",
              "enable_thread_tags": 1 }
        ]
    })
}

pub fn user_boards() -> Value {
    json!({
        "is_index": 1,
        "boards": [
            { "id": "zz", "name": "user board" },
            { "id": "soc", "name": "renamed by users" }
        ]
    })
}

pub async fn mount_boards(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/makaba/mobile.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(global_boards()))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/userboards.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_boards()))
        .mount(server)
        .await;
}

pub async fn mount_json(server: &MockServer, at: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub async fn mount_bytes(server: &MockServer, at: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

/// A server that already knows the boards.
pub async fn server() -> MockServer {
    let server = MockServer::start().await;
    mount_boards(&server).await;
    server
}

pub fn builder(server: &MockServer) -> ClientBuilder {
    Client::builder().base_url(server.uri())
}

pub async fn client(server: &MockServer) -> Client {
    builder(server).build().await.unwrap()
}

/// Catalog of `/b/` with one thread per `(num, subject, tags, views, score, posts)`.
pub fn catalog(threads: &[(u64, &str, &str, u64, u64, u64)]) -> Value {
    let threads: Vec<Value> = threads
        .iter()
        .map(|(num, subject, tags, views, score, posts)| {
            json!({
                "num": num.to_string(),
                "subject": subject,
                "comment": "",
                "tags": tags,
                "views": views,
                "score": score,
                "posts_count": posts,
                "lasthit": 1_660_000_000,
                "files": []
            })
        })
        .collect();
    json!({ "board": "b", "threads": threads })
}

/// A thread document with the given posts.
pub fn thread(posts: Vec<Value>) -> Value {
    json!({ "threads": [ { "posts": posts } ] })
}

pub fn media(kind: u64, name: &str, at: &str) -> Value {
    json!({ "type": kind, "displayname": name, "name": name, "path": at })
}
