//! RunPod serverless ASR worker client

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{AsrWorker, JobStatus, StatusReport, TranscriptionOutput};
use crate::config::TranscriptionConfig;
use crate::error::{PipelineError, Result};

/// Client for a RunPod serverless endpoint (`/v2/{endpoint}/run` + `/status/{id}`)
pub struct RunPodWorker {
    api_base: String,
    endpoint_id: Option<String>,
    api_key: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct RunRequest<'a> {
    input: RunInput<'a>,
}

#[derive(Debug, Serialize)]
struct RunInput<'a> {
    audio: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct RunResponse {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    status: String,
    output: Option<Value>,
    error: Option<Value>,
}

impl RunPodWorker {
    pub fn new(config: &TranscriptionConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()?;

        Ok(Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            endpoint_id: config.endpoint_id.clone(),
            api_key: config.api_key.clone(),
            client,
        })
    }

    fn credentials(&self) -> Result<(&str, &str)> {
        let endpoint = self
            .endpoint_id
            .as_deref()
            .ok_or_else(|| PipelineError::Config("RunPod endpoint id not configured".to_string()))?;
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| PipelineError::Config("RunPod API key not configured".to_string()))?;
        Ok((endpoint, key))
    }

    fn endpoint_url(&self, endpoint: &str, path: &str) -> String {
        format!("{}/v2/{}/{}", self.api_base, endpoint, path)
    }
}

#[async_trait]
impl AsrWorker for RunPodWorker {
    async fn submit(&self, audio_base64: &str, language: Option<&str>) -> Result<Option<String>> {
        let (endpoint, key) = self.credentials()?;
        let url = self.endpoint_url(endpoint, "run");

        debug!("POST {} ({} base64 chars)", url, audio_base64.len());

        let request = RunRequest {
            input: RunInput {
                audio: audio_base64,
                language,
            },
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(key)
            .json(&request)
            .send()
            .await
            .map_err(|e| PipelineError::UpstreamSubmit(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(PipelineError::UpstreamSubmit(format!(
                "RunPod API error {}: {}",
                status, text
            )));
        }

        let run: RunResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::UpstreamSubmit(e.to_string()))?;

        Ok(run.id)
    }

    async fn status(&self, job_id: &str) -> Result<StatusReport> {
        let (endpoint, key) = self.credentials()?;
        let url = self.endpoint_url(endpoint, &format!("status/{}", job_id));

        let body: Value = self
            .client
            .get(&url)
            .bearer_auth(key)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        parse_status(body)
    }

    fn is_configured(&self) -> bool {
        self.credentials().is_ok()
    }
}

/// Turn a raw `/status` body into a report.
///
/// Failure detail is the worker's `error` field when present, otherwise the
/// whole body.
fn parse_status(body: Value) -> Result<StatusReport> {
    let parsed: StatusResponse = serde_json::from_value(body.clone())?;
    let status = JobStatus::from_worker(&parsed.status);

    let output = match (status, parsed.output) {
        (JobStatus::Completed, Some(output)) => Some(serde_json::from_value::<TranscriptionOutput>(output)?),
        _ => None,
    };

    let detail = match status {
        JobStatus::Failed => Some(match parsed.error {
            Some(Value::String(message)) => message,
            Some(other) => other.to_string(),
            None => body.to_string(),
        }),
        _ => None,
    };

    Ok(StatusReport {
        status,
        raw_status: parsed.status,
        output,
        detail,
    })
}
