use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{PipelineError, Result};
use crate::storage::Buckets;

/// Configuration for the caption pipeline service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,
    /// Remote ASR worker settings
    pub transcription: TranscriptionConfig,
    /// ffmpeg settings
    pub transcoder: TranscoderConfig,
    /// Blob storage settings
    pub storage: StorageConfig,
    /// Request lifecycle settings
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted request body (multipart uploads included)
    pub upload_limit_bytes: usize,
    pub enable_cors: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// RunPod API base URL
    pub api_base: String,
    pub endpoint_id: Option<String>,
    pub api_key: Option<String>,
    /// Delay before each status check
    pub poll_interval_ms: u64,
    pub max_poll_attempts: u32,
    /// Timeout for a single submit or status HTTP call
    pub http_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscoderConfig {
    pub ffmpeg_path: PathBuf,
    /// Sample rate of extracted audio
    pub sample_rate: u32,
    /// Passed to the subtitles filter when the directory exists
    pub fonts_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Supabase project URL
    pub url: Option<String>,
    pub service_key: Option<String>,
    pub signed_url_ttl_secs: u64,
    /// TTL for burned exports
    pub export_url_ttl_secs: u64,
    pub request_timeout_secs: u64,
    pub download_timeout_secs: u64,
    /// Smaller downloads are treated as corrupt
    pub min_download_bytes: u64,
    pub buckets: Buckets,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Parent of the per-request workspaces
    pub temp_dir: PathBuf,
    /// Upper bound for one request, transcription polling included
    pub request_timeout_secs: u64,
    /// Delay between a successful response and temp-file deletion
    pub cleanup_grace_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            upload_limit_bytes: 350 * 1024 * 1024,
            enable_cors: true,
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.runpod.ai".to_string(),
            endpoint_id: None,
            api_key: None,
            poll_interval_ms: 3000,
            max_poll_attempts: 100,
            http_timeout_secs: 30,
        }
    }
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            sample_rate: 16000,
            fonts_dir: Some(PathBuf::from("fonts")),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            url: None,
            service_key: None,
            signed_url_ttl_secs: 3600,
            export_url_ttl_secs: 86400,
            request_timeout_secs: 120,
            download_timeout_secs: 60,
            min_download_bytes: 1000,
            buckets: Buckets::default(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            temp_dir: std::env::temp_dir().join("caption-pipeline"),
            // 100 polls x 3s plus headroom for extraction and publishing
            request_timeout_secs: 330,
            cleanup_grace_ms: 2000,
        }
    }
}

impl TranscriptionConfig {
    /// Worst-case time spent polling one job
    pub fn poll_budget(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms) * self.max_poll_attempts
    }
}

impl PipelineConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn cleanup_grace(&self) -> Duration {
        Duration::from_millis(self.cleanup_grace_ms)
    }
}

const CONFIG_SEARCH_PATHS: [&str; 2] = ["caption-pipeline.toml", "config/caption-pipeline.toml"];

impl Config {
    /// Load configuration, then apply environment overrides.
    ///
    /// An explicit `path` must exist and parse. Without one, the first of the
    /// search paths that parses is used, falling back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::search().unwrap_or_default(),
        };

        config.apply_env_with(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn search() -> Option<Self> {
        for path in CONFIG_SEARCH_PATHS {
            let path = Path::new(path);
            if !path.exists() {
                continue;
            }
            match Self::from_file(path) {
                Ok(config) => return Some(config),
                Err(e) => tracing::warn!("Failed to parse config file {}: {}", path.display(), e),
            }
        }
        None
    }

    /// Parse a TOML file; missing keys take their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml(&config_str)
            .map_err(|e| PipelineError::Config(format!("{}: {}", path.display(), e)))?;

        tracing::info!("📄 Loaded configuration from: {}", path.display());
        Ok(config)
    }

    pub fn from_toml(config_str: &str) -> Result<Self> {
        toml::from_str(config_str).map_err(|e| PipelineError::Config(e.to_string()))
    }

    /// Apply environment overrides through `lookup`
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| PipelineError::Config(format!("PORT is not a valid port: {}", port)))?;
        }
        if let Some(key) = lookup("RUNPOD_API_KEY") {
            self.transcription.api_key = Some(key);
        }
        if let Some(endpoint) = lookup("RUNPOD_ENDPOINT_ID") {
            self.transcription.endpoint_id = Some(endpoint);
        }
        if let Some(url) = lookup("SUPABASE_URL") {
            self.storage.url = Some(url);
        }
        if let Some(key) = lookup("SUPABASE_SERVICE_ROLE_KEY") {
            self.storage.service_key = Some(key);
        }
        if let Some(dir) = lookup("CAPTION_PIPELINE_TEMP_DIR") {
            self.pipeline.temp_dir = PathBuf::from(dir);
        }
        if let Some(ffmpeg) = lookup("CAPTION_PIPELINE_FFMPEG") {
            self.transcoder.ffmpeg_path = PathBuf::from(ffmpeg);
        }
        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let config_str =
            toml::to_string_pretty(self).map_err(|e| PipelineError::Config(e.to_string()))?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.transcription.poll_interval_ms == 0 {
            return Err(PipelineError::Config(
                "transcription.poll_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.transcription.max_poll_attempts == 0 {
            return Err(PipelineError::Config(
                "transcription.max_poll_attempts must be greater than 0".to_string(),
            ));
        }
        if self.transcoder.sample_rate == 0 {
            return Err(PipelineError::Config(
                "transcoder.sample_rate must be greater than 0".to_string(),
            ));
        }
        if self.server.upload_limit_bytes == 0 {
            return Err(PipelineError::Config(
                "server.upload_limit_bytes must be greater than 0".to_string(),
            ));
        }

        // A shorter request timeout would abort jobs the poll loop still
        // considers in progress
        let poll_budget = self.transcription.poll_budget();
        if self.pipeline.request_timeout() < poll_budget {
            return Err(PipelineError::Config(format!(
                "pipeline.request_timeout_secs ({}s) is shorter than the transcription poll budget ({}s)",
                self.pipeline.request_timeout_secs,
                poll_budget.as_secs()
            )));
        }

        tracing::info!("✅ Configuration validation passed");
        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Caption Pipeline Configuration:\n\
            - Listen: {}:{}\n\
            - Upload Limit: {} MiB\n\
            - ASR Worker: {}\n\
            - Poll: {}ms x {}\n\
            - Storage: {}\n\
            - ffmpeg: {}\n\
            - Temp Dir: {}\n\
            - Request Timeout: {}s",
            self.server.host,
            self.server.port,
            self.server.upload_limit_bytes / (1024 * 1024),
            if self.transcription.api_key.is_some() && self.transcription.endpoint_id.is_some() {
                "configured"
            } else {
                "not configured"
            },
            self.transcription.poll_interval_ms,
            self.transcription.max_poll_attempts,
            self.storage.url.as_deref().unwrap_or("not configured"),
            self.transcoder.ffmpeg_path.display(),
            self.pipeline.temp_dir.display(),
            self.pipeline.request_timeout_secs
        )
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn with_temp_dir(mut self, dir: PathBuf) -> Self {
        self.config.pipeline.temp_dir = dir;
        self
    }

    pub fn with_poll(mut self, interval: Duration, max_attempts: u32) -> Self {
        self.config.transcription.poll_interval_ms = interval.as_millis() as u64;
        self.config.transcription.max_poll_attempts = max_attempts;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.config.pipeline.request_timeout_secs = timeout.as_secs();
        self
    }

    pub fn with_cleanup_grace(mut self, grace: Duration) -> Self {
        self.config.pipeline.cleanup_grace_ms = grace.as_millis() as u64;
        self
    }

    pub fn with_runpod(mut self, endpoint_id: String, api_key: String) -> Self {
        self.config.transcription.endpoint_id = Some(endpoint_id);
        self.config.transcription.api_key = Some(api_key);
        self
    }

    pub fn with_storage(mut self, url: String, service_key: String) -> Self {
        self.config.storage.url = Some(url);
        self.config.storage.service_key = Some(service_key);
        self
    }

    pub fn with_ffmpeg(mut self, path: PathBuf) -> Self {
        self.config.transcoder.ffmpeg_path = path;
        self
    }

    pub fn with_fonts_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.config.transcoder.fonts_dir = dir;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
