//! Shared test doubles

use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{ImagegenError, Result};
use crate::service::{GenerationService, ServiceResponse};

/// Service double returning a canned response and recording payloads
pub struct FakeService {
    pub response: serde_json::Value,
    pub image: Option<Bytes>,
    pub payloads: Mutex<Vec<serde_json::Map<String, serde_json::Value>>>,
}

impl FakeService {
    pub fn new(response: serde_json::Value) -> Self {
        Self {
            response,
            image: Some(Bytes::from_static(b"RIFF....WEBPVP8 ")),
            payloads: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_fetch(mut self) -> Self {
        self.image = None;
        self
    }
}

#[async_trait]
impl GenerationService for FakeService {
    async fn run(
        &self,
        _endpoint: &str,
        input: serde_json::Map<String, serde_json::Value>,
    ) -> Result<ServiceResponse> {
        self.payloads.lock().unwrap().push(input);
        ServiceResponse::from_json(self.response.clone())
    }

    async fn fetch(&self, url: &str) -> Result<Bytes> {
        self.image.clone().ok_or_else(|| ImagegenError::UpstreamFetch {
            url: url.to_string(),
            status: 404,
        })
    }
}
