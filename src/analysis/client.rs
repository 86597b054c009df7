use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use serde_json::{json, Value};
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

use super::schema::{decode_payload, response_schema, SYSTEM_INSTRUCTION};
use super::types::{AnalysisResult, IMAGE_ERROR_PLACEHOLDER, IMAGE_PLACEHOLDER};
use crate::bundle::{ContentPart, ContextBundle};
use crate::config::AnalysisConfig;
use crate::credentials::Credential;
use crate::error::{XrayError, XrayResult};
use crate::logging::PerformanceTimer;

/// Everything the service needs for one call
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub model: String,
    pub system_instruction: &'static str,
    pub parts: Vec<ContentPart>,
    pub response_schema: Value,
}

/// Request/response seam to the reasoning service; returns the raw JSON text
pub trait AnalysisTransport: Send + Sync {
    fn generate(
        &self,
        request: &AnalysisRequest,
        credential: &Credential,
    ) -> impl Future<Output = XrayResult<String>> + Send;
}

/// Gemini `generateContent` over HTTPS
pub struct GeminiTransport {
    http: reqwest::Client,
    endpoint: String,
}

impl GeminiTransport {
    pub fn new(config: &AnalysisConfig) -> XrayResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| XrayError::transport_with_source("failed to build HTTP client", e))?;
        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub fn url_for(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, model)
    }

    pub fn request_body(request: &AnalysisRequest) -> Value {
        let parts: Vec<Value> = request
            .parts
            .iter()
            .map(|part| match part {
                ContentPart::Text(text) => json!({ "text": text }),
                ContentPart::InlineImage { mime, data } => json!({
                    "inlineData": {
                        "mimeType": mime.as_str(),
                        "data": general_purpose::STANDARD.encode(data),
                    }
                }),
            })
            .collect();

        json!({
            "systemInstruction": { "parts": [{ "text": request.system_instruction }] },
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": request.response_schema,
            }
        })
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Concatenated text parts of the first candidate
pub fn response_text(body: &str) -> XrayResult<String> {
    let response: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| XrayError::service(format!("invalid API JSON: {}", e)))?;

    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(XrayError::service("no text in response"));
    }
    Ok(text)
}

impl AnalysisTransport for GeminiTransport {
    fn generate(
        &self,
        request: &AnalysisRequest,
        credential: &Credential,
    ) -> impl Future<Output = XrayResult<String>> + Send {
        let url = self.url_for(&request.model);
        let body = Self::request_body(request);
        let key = credential.expose().to_string();
        let http = self.http.clone();

        async move {
            let response = http
                .post(&url)
                .header("x-goog-api-key", key)
                .json(&body)
                .send()
                .await
                .map_err(|e| XrayError::transport_with_source("request failed", e))?;

            let status = response.status();
            let text = response
                .text()
                .await
                .map_err(|e| XrayError::transport_with_source("failed to read response body", e))?;

            if status == reqwest::StatusCode::UNAUTHORIZED
                || status == reqwest::StatusCode::FORBIDDEN
            {
                return Err(XrayError::transport(format!("API key rejected ({})", status)));
            }
            if !status.is_success() {
                let snippet: String = text.chars().take(200).collect();
                return Err(XrayError::transport(format!("HTTP {}: {}", status, snippet)));
            }

            response_text(&text)
        }
    }
}

/// Sends context bundles and always comes back with a renderable result
pub struct AnalysisClient<T: AnalysisTransport> {
    transport: T,
    model: String,
}

impl<T: AnalysisTransport> AnalysisClient<T> {
    pub fn new(transport: T, model: impl Into<String>) -> Self {
        Self {
            transport,
            model: model.into(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn build_request(&self, bundle: &ContextBundle) -> AnalysisRequest {
        AnalysisRequest {
            model: self.model.clone(),
            system_instruction: SYSTEM_INSTRUCTION,
            parts: bundle.to_parts(),
            response_schema: response_schema(),
        }
    }

    /// Analyze a bundle. Every failure, including a missing key, becomes the
    /// fallback result.
    pub async fn analyze(
        &self,
        bundle: &ContextBundle,
        credential: Option<&Credential>,
    ) -> AnalysisResult {
        match self.try_analyze(bundle, credential).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Analysis failed, using fallback: {}", e);
                let original = bundle.text().unwrap_or(IMAGE_ERROR_PLACEHOLDER);
                AnalysisResult::fallback(original)
            }
        }
    }

    async fn try_analyze(
        &self,
        bundle: &ContextBundle,
        credential: Option<&Credential>,
    ) -> XrayResult<AnalysisResult> {
        let credential = credential.ok_or(XrayError::MissingCredential)?;
        let request = self.build_request(bundle);
        let _timer = PerformanceTimer::start(format!("analysis ({} parts)", request.parts.len()));

        let text = self.transport.generate(&request, credential).await?;
        let payload = decode_payload(&text)?;

        let original = bundle.text().unwrap_or(IMAGE_PLACEHOLDER);
        let result = payload.into_result(original);
        info!(
            "Analysis complete: {} symbols, {} dimension steps, {}",
            result.symbols.len(),
            result.dimensions.len(),
            result.viz_type
        );
        Ok(result)
    }
}
