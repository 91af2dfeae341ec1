//! Artifact publication and the blob-storage collaborator.
//!
//! `ObjectStore` is the narrow contract the pipeline needs from a storage
//! service. `SupabaseStore` speaks the Supabase Storage REST API, and
//! `ArtifactPublisher` layers the bucket layout and path scheme on top.

use std::path::Path;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::StorageConfig;
use crate::error::{PipelineError, Result};

/// Minimal blob-storage contract
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(&self, bucket: &str, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;

    /// Create a time-limited read URL for an uploaded object
    async fn create_signed_url(&self, bucket: &str, path: &str, ttl_secs: u64) -> Result<String>;

    /// Stream the object behind `url` into `dest`; returns the byte count
    async fn download(&self, url: &str, dest: &Path) -> Result<u64>;

    fn is_configured(&self) -> bool {
        true
    }
}

/// Bucket and object path parsed from a storage URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLocation {
    pub bucket: String,
    pub path: String,
}

fn storage_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^/storage/v1/object/(?:(?:public|sign|authenticated)/)?([^/]+)/(.+)$")
            .expect("static storage url pattern")
    })
}

impl StorageLocation {
    /// Parse `…/storage/v1/object/[public|sign|authenticated/]<bucket>/<path>`.
    ///
    /// Only URLs on `base`'s host are recognised; anything else is `None`.
    pub fn parse(url: &str, base: &Url) -> Option<Self> {
        let url = Url::parse(url).ok()?;
        if url.host_str() != base.host_str() {
            return None;
        }

        let caps = storage_url_pattern().captures(url.path())?;
        let path = urlencoding::decode(&caps[2]).ok()?.into_owned();

        Some(Self {
            bucket: caps[1].to_string(),
            path,
        })
    }
}

/// Supabase Storage REST client
pub struct SupabaseStore {
    base_url: Option<Url>,
    service_key: Option<String>,
    download_timeout: Duration,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignRequest {
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct SignResponse {
    #[serde(rename = "signedURL", alias = "signedUrl")]
    signed_url: String,
}

impl SupabaseStore {
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let base_url = config
            .url
            .as_deref()
            .map(|raw| {
                Url::parse(raw.trim_end_matches('/'))
                    .map_err(|e| PipelineError::Config(format!("invalid storage url '{}': {}", raw, e)))
            })
            .transpose()?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            base_url,
            service_key: config.service_key.clone(),
            download_timeout: Duration::from_secs(config.download_timeout_secs),
            client,
        })
    }

    fn credentials(&self) -> Result<(&Url, &str)> {
        let base = self
            .base_url
            .as_ref()
            .ok_or_else(|| PipelineError::Config("storage url not configured".to_string()))?;
        let key = self
            .service_key
            .as_deref()
            .ok_or_else(|| PipelineError::Config("storage service key not configured".to_string()))?;
        Ok((base, key))
    }

    fn object_url(base: &Url, prefix: &str, bucket: &str, path: &str) -> String {
        let encoded: Vec<String> = path
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!(
            "{}/storage/v1/object/{}{}/{}",
            base.as_str().trim_end_matches('/'),
            prefix,
            bucket,
            encoded.join("/")
        )
    }

    /// Authenticated fetch through the storage API
    async fn download_object(&self, location: &StorageLocation, dest: &Path) -> Result<u64> {
        let (base, key) = self.credentials()?;
        let url = Self::object_url(base, "authenticated/", &location.bucket, &location.path);

        let response = self
            .client
            .get(&url)
            .bearer_auth(key)
            .header("apikey", key)
            .timeout(self.download_timeout)
            .send()
            .await
            .map_err(|e| transport_error("download", e))?;

        stream_to_file(response, dest).await
    }

    /// Plain GET; reqwest follows redirects
    async fn download_http(&self, url: &str, dest: &Path) -> Result<u64> {
        let response = self
            .client
            .get(url)
            .timeout(self.download_timeout)
            .send()
            .await
            .map_err(|e| transport_error("download", e))?;

        stream_to_file(response, dest).await
    }
}

/// Transport failures talking to storage are storage errors, not bare HTTP ones
fn transport_error(operation: &str, error: reqwest::Error) -> PipelineError {
    PipelineError::storage(format!("{} request failed: {}", operation, error))
}

async fn stream_to_file(response: reqwest::Response, dest: &Path) -> Result<u64> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(PipelineError::storage(format!(
            "download failed with status {}: {}",
            status, text
        )));
    }

    let mut file = tokio::fs::File::create(dest).await?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| transport_error("download", e))?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    Ok(written)
}

#[async_trait]
impl ObjectStore for SupabaseStore {
    async fn upload(&self, bucket: &str, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        let (base, key) = self.credentials()?;
        let url = Self::object_url(base, "", bucket, path);
        debug!("Uploading {} bytes to {}/{}", bytes.len(), bucket, path);

        let response = self
            .client
            .post(&url)
            .bearer_auth(key)
            .header("apikey", key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await
            .map_err(|e| transport_error("upload", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(PipelineError::storage(format!(
                "upload to {}/{} failed ({}): {}",
                bucket, path, status, text
            )));
        }

        Ok(())
    }

    async fn create_signed_url(&self, bucket: &str, path: &str, ttl_secs: u64) -> Result<String> {
        let (base, key) = self.credentials()?;
        let url = Self::object_url(base, "sign/", bucket, path);

        let response = self
            .client
            .post(&url)
            .bearer_auth(key)
            .header("apikey", key)
            .json(&SignRequest { expires_in: ttl_secs })
            .send()
            .await
            .map_err(|e| transport_error("signing", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(PipelineError::storage(format!(
                "signing {}/{} failed ({}): {}",
                bucket, path, status, text
            )));
        }

        let signed: SignResponse = response
            .json()
            .await
            .map_err(|e| transport_error("signing", e))?;
        Ok(format!(
            "{}/storage/v1{}",
            base.as_str().trim_end_matches('/'),
            signed.signed_url
        ))
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        let location = self
            .base_url
            .as_ref()
            .and_then(|base| StorageLocation::parse(url, base));

        if let Some(location) = location {
            debug!(
                "Detected storage object: bucket={}, path={}",
                location.bucket, location.path
            );
            match self.download_object(&location, dest).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) => warn!("Storage API download failed, trying plain HTTP: {}", e),
            }
        }

        self.download_http(url, dest).await
    }

    fn is_configured(&self) -> bool {
        self.credentials().is_ok()
    }
}

/// What an uploaded artifact is, which decides its bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Video,
    Audio,
    Subtitles,
    Export,
}

/// Bucket names per artifact kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Buckets {
    pub videos: String,
    pub audio: String,
    pub subtitles: String,
    pub exports: String,
}

impl Default for Buckets {
    fn default() -> Self {
        Self {
            videos: "videos".to_string(),
            audio: "audio".to_string(),
            subtitles: "subtitles".to_string(),
            exports: "exports".to_string(),
        }
    }
}

impl Buckets {
    pub fn for_kind(&self, kind: ArtifactKind) -> &str {
        match kind {
            ArtifactKind::Video => &self.videos,
            ArtifactKind::Audio => &self.audio,
            ArtifactKind::Subtitles => &self.subtitles,
            ArtifactKind::Export => &self.exports,
        }
    }
}

/// A published artifact and its time-limited URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedArtifact {
    pub bucket: String,
    pub path: String,
    pub url: String,
}

/// Uploads artifacts under the `<user>/<kind>/<ts>…` layout and signs them
#[derive(Clone)]
pub struct ArtifactPublisher {
    store: Arc<dyn ObjectStore>,
    buckets: Buckets,
    signed_url_ttl: u64,
    export_url_ttl: u64,
    min_download_bytes: u64,
}

impl ArtifactPublisher {
    pub fn new(store: Arc<dyn ObjectStore>, config: &StorageConfig) -> Self {
        Self {
            store,
            buckets: config.buckets.clone(),
            signed_url_ttl: config.signed_url_ttl_secs,
            export_url_ttl: config.export_url_ttl_secs,
            min_download_bytes: config.min_download_bytes,
        }
    }

    pub fn signed_url_ttl(&self) -> u64 {
        self.signed_url_ttl
    }

    pub fn export_url_ttl(&self) -> u64 {
        self.export_url_ttl
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Upload then sign with the TTL for `kind`
    pub async fn publish(
        &self,
        kind: ArtifactKind,
        path: String,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<PublishedArtifact> {
        let bucket = self.buckets.for_kind(kind).to_string();
        let ttl = match kind {
            ArtifactKind::Export => self.export_url_ttl,
            _ => self.signed_url_ttl,
        };

        let size = bytes.len();
        self.store.upload(&bucket, &path, bytes, content_type).await?;
        let url = self.store.create_signed_url(&bucket, &path, ttl).await?;
        info!("☁️ Published {}/{} ({} bytes)", bucket, path, size);

        Ok(PublishedArtifact { bucket, path, url })
    }

    /// Download a referenced file, rejecting bodies too small to be media
    pub async fn fetch(&self, url: &str, dest: &Path) -> Result<u64> {
        info!("⬇️ Downloading {}", url);
        let bytes = self.store.download(url, dest).await?;

        if bytes < self.min_download_bytes {
            return Err(PipelineError::storage(format!(
                "downloaded file is too small ({} bytes), likely corrupted or empty",
                bytes
            )));
        }

        debug!("Downloaded {} bytes to {}", bytes, dest.display());
        Ok(bytes)
    }
}

/// Storage path builders; `ts` is Unix milliseconds
pub mod paths {
    const ANONYMOUS: &str = "anonymous";

    /// Strip separators and parent references from a single path segment
    pub fn sanitize(segment: &str, fallback: &str) -> String {
        let cleaned: String = segment
            .replace(['/', '\\'], "_")
            .replace("..", "")
            .trim()
            .to_string();
        if cleaned.is_empty() || cleaned.chars().all(|c| c == '.' || c == '_') {
            fallback.to_string()
        } else {
            cleaned
        }
    }

    pub fn user(user_id: Option<&str>) -> String {
        sanitize(user_id.unwrap_or(ANONYMOUS), ANONYMOUS)
    }

    pub fn video(user_id: Option<&str>, ts: i64, original_name: &str) -> String {
        format!(
            "{}/videos/{}-{}",
            user(user_id),
            ts,
            sanitize(original_name, "video.mp4")
        )
    }

    pub fn audio(user_id: Option<&str>, ts: i64) -> String {
        format!("{}/audio/{}-audio.wav", user(user_id), ts)
    }

    pub fn subtitles(user_id: Option<&str>, ts: i64, extension: &str) -> String {
        format!("{}/subtitles/{}.{}", user(user_id), ts, extension)
    }

    pub fn words(user_id: Option<&str>, ts: i64) -> String {
        format!("{}/subtitles/{}-words.json", user(user_id), ts)
    }

    pub fn export(user_id: Option<&str>, ts: i64) -> String {
        format!("{}/exports/{}-burned.mp4", user(user_id), ts)
    }
}
