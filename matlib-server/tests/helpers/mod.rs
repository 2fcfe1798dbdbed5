//! Shared fixtures for matlib-server integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use matlib_common::channels::resolve_in_dir;
use matlib_common::{Channel, Error, Result};
use matlib_server::config::ServerConfig;
use matlib_server::pbr::PbrGenerator;
use matlib_server::repository::MaterialRepository;
use matlib_server::staging::StagingArea;
use serde_json::Value;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// Isolated root folder with its directory tree created
pub struct TestRoot {
    pub dir: TempDir,
    pub config: ServerConfig,
}

impl TestRoot {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let mut config = ServerConfig::from_root(dir.path());
        config.pbr_enabled = false;
        config.layout.ensure_directories().expect("layout");
        Self { dir, config }
    }

    pub fn repository(&self) -> Arc<MaterialRepository> {
        Arc::new(MaterialRepository::from_config(&self.config))
    }

    pub fn staging(&self, repository: Arc<MaterialRepository>) -> StagingArea {
        StagingArea::new(self.config.staging_dir(), repository)
    }

    /// Write a file straight into `staging/<sku>/`
    pub fn stage_raw(&self, sku: &str, name: &str) {
        let dir = self.config.staging_dir().join(sku);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(name), b"data").unwrap();
    }
}

/// Generator writing the configured channels beside the color file
pub struct FakeGenerator {
    channels: Vec<Channel>,
    fail: bool,
    pub calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl FakeGenerator {
    pub fn producing(channels: &[Channel]) -> Self {
        Self {
            channels: channels.to_vec(),
            fail: false,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Leaves the first channel behind, then fails
    pub fn failing_after(channels: &[Channel]) -> Self {
        Self {
            fail: true,
            ..Self::producing(channels)
        }
    }
}

#[async_trait]
impl PbrGenerator for FakeGenerator {
    async fn generate(&self, color_path: &Path, _resolution: u32) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::task::yield_now().await;

        let dir = color_path.parent().unwrap();
        let name = color_path.file_name().unwrap().to_str().unwrap();
        let targets = resolve_in_dir(dir, "", name);
        let wanted: Vec<_> = targets
            .into_iter()
            .filter(|(channel, _)| self.channels.contains(channel))
            .collect();

        let result = if self.fail {
            if let Some((_, path)) = wanted.first() {
                std::fs::write(path, b"partial").unwrap();
            }
            Err(Error::ExternalProcess("generator crashed".to_string()))
        } else {
            for (_, path) in &wanted {
                std::fs::write(path, b"map").unwrap();
            }
            Ok(())
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub const BOUNDARY: &str = "matlib-test-boundary";

/// multipart/form-data body with one `files` part per entry
pub fn multipart_request(uri: &str, files: &[(&str, &[u8])]) -> Request<Body> {
    let mut body = Vec::new();
    for (name, bytes) in files {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"files\"; filename=\"{}\"\r\n",
                name
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

pub async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}
