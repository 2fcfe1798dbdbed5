//! Texture handles and loaders

use crate::{ClientError, ClientResult};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

/// Sampler wrap mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapMode {
    ClampToEdge,
    Repeat,
}

/// How texel values are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    Srgb,
    Linear,
}

/// A loaded texture plus its sampling parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    /// Path the texture was requested by
    pub path: String,
    pub byte_len: usize,
    pub wrap: WrapMode,
    pub repeat: [f32; 2],
    pub offset: [f32; 2],
    pub color_space: ColorSpace,
}

impl Texture {
    pub fn new(path: impl Into<String>, byte_len: usize) -> Self {
        Self {
            path: path.into(),
            byte_len,
            wrap: WrapMode::ClampToEdge,
            repeat: [1.0, 1.0],
            offset: [0.0, 0.0],
            color_space: ColorSpace::Linear,
        }
    }

    /// Repeat-wrapped with the given tiling and offset
    pub fn tiled(mut self, tiling: f32, offset: [f32; 2]) -> Self {
        self.wrap = WrapMode::Repeat;
        self.repeat = [tiling, tiling];
        self.offset = offset;
        self
    }

    pub fn with_color_space(mut self, color_space: ColorSpace) -> Self {
        self.color_space = color_space;
        self
    }
}

/// Fetches texture bytes by asset path (`/materials/<sku>/<file>`)
#[async_trait]
pub trait TextureLoader: Send + Sync {
    async fn load(&self, path: &str) -> ClientResult<Texture>;
}

/// Reads textures from a local root folder
#[derive(Debug, Clone)]
pub struct FsTextureLoader {
    root: PathBuf,
}

impl FsTextureLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

#[async_trait]
impl TextureLoader for FsTextureLoader {
    async fn load(&self, path: &str) -> ClientResult<Texture> {
        let full = self.resolve(path);
        let bytes = tokio::fs::read(&full)
            .await
            .map_err(|e| ClientError::TextureLoad {
                path: path.to_string(),
                reason: e.to_string(),
            })?;
        debug!(path = %path, bytes = bytes.len(), "Texture loaded from disk");
        Ok(Texture::new(path, bytes.len()))
    }
}

/// Downloads textures from the server's asset route.
///
/// `base_url` is the server address plus `/assets`, so an asset path
/// `/materials/<sku>/<file>` maps onto the served materials directory.
#[derive(Debug, Clone)]
pub struct HttpTextureLoader {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTextureLoader {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl TextureLoader for HttpTextureLoader {
    async fn load(&self, path: &str) -> ClientResult<Texture> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let failed = |reason: String| ClientError::TextureLoad {
            path: path.to_string(),
            reason,
        };

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(failed(format!("HTTP {}", response.status())));
        }
        let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;
        Ok(Texture::new(path, bytes.len()))
    }
}
