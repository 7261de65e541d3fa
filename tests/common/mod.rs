#![allow(dead_code)]

use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use blogd::config::Config;
use blogd::db::Database;
use blogd::{create_router, AppState};

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub dir: TempDir,
}

impl TestApp {
    pub fn upload_dir(&self) -> PathBuf {
        PathBuf::from(&self.state.config.storage.upload_dir)
    }

    pub async fn send(&self, req: Request<Body>) -> (StatusCode, Bytes) {
        let res = self.router.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        (status, bytes)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Bytes) {
        self.send(Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn get_json(&self, uri: &str) -> serde_json::Value {
        let (status, bytes) = self.get(uri).await;
        assert_eq!(status, StatusCode::OK, "GET {} -> {}", uri, text(&bytes));
        serde_json::from_slice(&bytes).unwrap()
    }

    pub async fn upload(&self, form: Form) -> (StatusCode, String) {
        let (status, bytes) = self.send(form.into_request("/api/upload")).await;
        (status, text(&bytes))
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

pub async fn spawn_app_with(customize: impl FnOnce(&mut Config)) -> TestApp {
    let dir = tempfile::tempdir().unwrap();

    let uploads = dir.path().join("uploads");
    let html = dir.path().join("html");
    std::fs::create_dir_all(&uploads).unwrap();
    std::fs::create_dir_all(&html).unwrap();
    std::fs::write(html.join("index.html"), "<h1>blog</h1>").unwrap();

    let mut config = Config::default();
    config.storage.upload_dir = uploads.to_string_lossy().into_owned();
    config.server.static_dir = html.to_string_lossy().into_owned();
    config.database.url = Some(format!(
        "sqlite://{}?mode=rwc",
        dir.path().join("blog.db").display()
    ));
    config.database.max_connections = 2;
    customize(&mut config);
    config.validate().unwrap();

    let db = Database::new(&config.database.url().unwrap(), config.database.max_connections)
        .await
        .unwrap();
    db.run_migrations().await.unwrap();

    let state = AppState::new(db, Arc::new(config));
    let router = create_router(state.clone());

    TestApp { router, state, dir }
}

pub fn text(bytes: &Bytes) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Every regular file below `dir`
pub fn files_under(dir: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let Ok(entries) = std::fs::read_dir(dir) else {
        return found;
    };
    for entry in entries {
        let path = entry.unwrap().path();
        if path.is_dir() {
            found.extend(files_under(&path));
        } else {
            found.push(path);
        }
    }
    found
}

/// Hand-built multipart/form-data body
pub struct Form {
    boundary: &'static str,
    body: Vec<u8>,
}

impl Form {
    pub fn new() -> Self {
        Self {
            boundary: "blogd-test-boundary",
            body: Vec::new(),
        }
    }

    /// The standard upload form
    pub fn blog(title: &str, author_id: &str, content: &str) -> Self {
        Self::new()
            .text("title", title)
            .text("author_id", author_id)
            .text("content", content)
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                self.boundary, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, filename: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\n\
                 Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n",
                self.boundary, name, filename
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn into_request(mut self, uri: &str) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", self.boundary),
            )
            .header("content-length", self.body.len())
            .body(Body::from(self.body))
            .unwrap()
    }
}
