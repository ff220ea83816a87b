// HTTP implementation of the translation service
// Sends the credential and the subtitle file as one multipart request

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::ServiceConfig;
use crate::error::{Result, TranslationFailure};
use super::{TranslationRequest, TranslationService};

pub struct HttpTranslationService {
    client: Client,
    url: String,
}

impl HttpTranslationService {
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            url: config.translate_url(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn build_form(request: &TranslationRequest) -> Form {
        let file = Part::bytes(request.payload.to_vec()).file_name(request.file_name.clone());
        Form::new()
            .text("api_key", request.credential.expose().to_string())
            .part("file", file)
    }

    /// Classify a non-2xx response by its body.
    ///
    /// A JSON body is a service-reported failure whose `detail` string (if any)
    /// is kept; anything else counts as a transport failure.
    fn classify_error_body(status: StatusCode, body: &[u8]) -> TranslationFailure {
        match serde_json::from_slice::<Value>(body) {
            Ok(json) => {
                let detail = json
                    .get("detail")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                if detail.is_none() {
                    debug!("Error body carried no usable detail: {}", json);
                }
                TranslationFailure::Service {
                    status: status.as_u16(),
                    detail,
                }
            }
            Err(_) => TranslationFailure::Transport(format!(
                "HTTP {} without a JSON error body ({} bytes)",
                status,
                body.len()
            )),
        }
    }
}

#[async_trait]
impl TranslationService for HttpTranslationService {
    async fn translate(&self, request: &TranslationRequest) -> std::result::Result<Vec<u8>, TranslationFailure> {
        info!(
            request_id = %request.id,
            "Sending {} ({} bytes) to {}",
            request.file_name,
            request.payload.len(),
            self.url
        );

        let response = self.client
            .post(&self.url)
            .multipart(Self::build_form(request))
            .send()
            .await
            .map_err(|e| {
                warn!(request_id = %request.id, "Translation request failed: {}", e);
                TranslationFailure::Transport(e.to_string())
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            warn!(request_id = %request.id, "Failed to read response body: {}", e);
            TranslationFailure::Transport(format!("Failed to read response body: {}", e))
        })?;

        if !status.is_success() {
            let failure = Self::classify_error_body(status, &body);
            warn!(request_id = %request.id, "Translation service returned {}: {}", status, failure);
            return Err(failure);
        }

        debug!(request_id = %request.id, "Received {} translated bytes", body.len());
        Ok(body.to_vec())
    }
}
