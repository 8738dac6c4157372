/// Placeholder image generation
///
/// Waits a fixed latency, then points at a placeholder image of the
/// requested size. Fails only when no service URL is configured.

use chrono::Utc;
use std::time::Duration;

use super::{GenerationFuture, GenerationRequest, ImageBackend};
use crate::error::GenerateError;
use crate::state::data::GenerationSettings;

#[derive(Debug, Clone)]
pub struct PlaceholderBackend {
    latency: Duration,
    base_url: String,
}

impl PlaceholderBackend {
    pub fn new(latency: Duration, base_url: impl Into<String>) -> Self {
        Self {
            latency,
            base_url: base_url.into(),
        }
    }
}

impl ImageBackend for PlaceholderBackend {
    fn generate(&self, request: &GenerationRequest) -> GenerationFuture {
        let latency = self.latency;
        let base_url = self.base_url.clone();
        let settings = request.settings;

        Box::pin(async move {
            if base_url.is_empty() {
                return Err(GenerateError::Backend(
                    "No placeholder image service configured".to_string(),
                ));
            }
            tokio::time::sleep(latency).await;
            Ok(placeholder_url(&base_url, &settings, Utc::now().timestamp_millis()))
        })
    }
}

/// `{base}/{width}/{height}?random={token}`
pub fn placeholder_url(base_url: &str, settings: &GenerationSettings, token: i64) -> String {
    format!(
        "{}/{}/{}?random={}",
        base_url.trim_end_matches('/'),
        settings.width,
        settings.height,
        token
    )
}
