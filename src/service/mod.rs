// Translation service boundary
//
// The session only depends on the TranslationService trait:
// - HttpTranslationService: multipart POST to the remote endpoint
//
// Tests substitute mocks or gated fakes to control when and how a request completes.

pub mod http;

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

pub use http::HttpTranslationService;
use crate::error::TranslationFailure;
use crate::intake::Credential;

/// Everything one outbound translation request carries.
#[derive(Debug, Clone)]
pub struct TranslationRequest {
    pub id: Uuid,
    pub credential: Credential,
    pub file_name: String,
    pub payload: Arc<[u8]>,
}

/// Remote service turning a subtitle file into a translated one
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranslationService: Send + Sync {
    /// Submit one file; returns the translated file bytes.
    async fn translate(&self, request: &TranslationRequest) -> Result<Vec<u8>, TranslationFailure>;
}
