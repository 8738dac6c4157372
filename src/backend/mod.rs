/// External collaborators of the studio
///
/// This module handles:
/// - The image-generation boundary (`ImageBackend`, placeholder implementation)
/// - Saving generated images and log exports to disk

pub mod download;
pub mod mock;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::GenerateError;
use crate::state::data::GenerationSettings;

pub use mock::PlaceholderBackend;

/// Everything the backend needs for one generation, captured when it starts
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub settings: GenerationSettings,
}

/// Resolves to the location of the generated image
pub type GenerationFuture = Pin<Box<dyn Future<Output = Result<String, GenerateError>> + Send>>;

/// An image-generation service.
///
/// Only this boundary changes when a real model replaces the placeholder.
pub trait ImageBackend: Send + Sync {
    fn generate(&self, request: &GenerationRequest) -> GenerationFuture;
}

/// Run one generation on the async runtime.
///
/// The backend runs in its own task so a panic inside it comes back
/// as a `GenerateError` instead of tearing down the UI.
pub async fn run_generation(
    backend: Arc<dyn ImageBackend>,
    request: GenerationRequest,
) -> Result<String, GenerateError> {
    tokio::spawn(async move { backend.generate(&request).await })
        .await
        .map_err(|e| GenerateError::Task(e.to_string()))?
}
