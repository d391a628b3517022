//! API client for the Replicate predictions service

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use imagegen_core::{GenerationService, ImagegenError, Result, ServiceResponse, Settings};
use reqwest::Client as ReqwestClient;
use serde_json::Value;
use tracing::debug;

use crate::config::SettingsManager;

const POLL_INTERVAL: Duration = Duration::from_secs(1);

pub struct Client {
    http: ReqwestClient,
    base_url: String,
    token: String,
}

/// Lifecycle state reported by the service for a prediction
#[derive(Debug, Clone, PartialEq, Eq)]
enum PredictionState {
    Pending { poll_url: String },
    Succeeded,
    Failed(String),
}

impl Client {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            http: ReqwestClient::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// Create client from settings; fails when the token is not set
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let token = SettingsManager::api_token()?;
        Ok(Self::new(settings.api_base_url.clone(), token))
    }

    /// `owner/name` runs the latest model version, `owner/name:version` pins one
    fn prediction_request(&self, endpoint: &str, input: serde_json::Map<String, Value>) -> (String, Value) {
        match endpoint.split_once(':') {
            Some((_, version)) => (
                format!("{}/predictions", self.base_url),
                serde_json::json!({ "version": version, "input": input }),
            ),
            None => (
                format!("{}/models/{}/predictions", self.base_url, endpoint),
                serde_json::json!({ "input": input }),
            ),
        }
    }

    async fn create_prediction(
        &self,
        endpoint: &str,
        input: serde_json::Map<String, Value>,
    ) -> Result<Value> {
        let (url, body) = self.prediction_request(endpoint, input);
        debug!("POST {}", url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .header("Prefer", "wait")
            .json(&body)
            .send()
            .await
            .map_err(transport)?;

        read_json(response).await
    }

    async fn poll(&self, url: &str) -> Result<Value> {
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(transport)?;

        read_json(response).await
    }

    /// Follow a prediction until the service reports a terminal state
    async fn wait_for(&self, mut prediction: Value) -> Result<Value> {
        loop {
            match prediction_state(&prediction)? {
                PredictionState::Succeeded => return Ok(prediction),
                PredictionState::Failed(message) => return Err(ImagegenError::Upstream(message)),
                PredictionState::Pending { poll_url } => {
                    debug!("Prediction still running, polling {}", poll_url);
                    tokio::time::sleep(POLL_INTERVAL).await;
                    prediction = self.poll(&poll_url).await?;
                }
            }
        }
    }
}

#[async_trait]
impl GenerationService for Client {
    async fn run(
        &self,
        endpoint: &str,
        input: serde_json::Map<String, Value>,
    ) -> Result<ServiceResponse> {
        let created = self.create_prediction(endpoint, input).await?;
        let finished = self.wait_for(created).await?;
        ServiceResponse::from_json(finished)
    }

    async fn fetch(&self, url: &str) -> Result<Bytes> {
        let response = self.http.get(url).send().await.map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImagegenError::UpstreamFetch {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.bytes().await.map_err(transport)
    }
}

fn transport(e: reqwest::Error) -> ImagegenError {
    ImagegenError::Transport(e.to_string())
}

async fn read_json(response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    let body = response.text().await.map_err(transport)?;

    if !status.is_success() {
        let error: Value = serde_json::from_str(&body).unwrap_or_default();
        let detail = error["detail"]
            .as_str()
            .map(str::to_string)
            .unwrap_or(body);
        return Err(ImagegenError::Upstream(format!("HTTP {}: {}", status.as_u16(), detail)));
    }

    serde_json::from_str(&body)
        .map_err(|e| ImagegenError::UpstreamFormat(format!("response is not JSON: {}", e)))
}

fn prediction_state(prediction: &Value) -> Result<PredictionState> {
    // Plain output lists carry no lifecycle at all
    let Some(status) = prediction.get("status").and_then(Value::as_str) else {
        return Ok(PredictionState::Succeeded);
    };

    match status {
        "succeeded" => Ok(PredictionState::Succeeded),
        "failed" | "canceled" | "aborted" => {
            let reason = prediction["error"]
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| format!("prediction {}", status));
            Ok(PredictionState::Failed(reason))
        }
        _ => {
            let poll_url = prediction["urls"]["get"].as_str().ok_or_else(|| {
                ImagegenError::UpstreamFormat(format!(
                    "prediction is '{}' but has no polling URL",
                    status
                ))
            })?;
            Ok(PredictionState::Pending {
                poll_url: poll_url.to_string(),
            })
        }
    }
}
