use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{FileState, GenerateRequest, GenerativeClient, RemoteFile};
use crate::error::AiError;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

const API_VERSION: &str = "v1beta";
const PDF_MIME_TYPE: &str = "application/pdf";

#[derive(Clone, Debug)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: Url,
}

impl GeminiConfig {
    /// Build a config, falling back to the public endpoint when no base URL
    /// is given.
    ///
    /// # Errors
    ///
    /// Returns `AiError::InvalidBaseUrl` if `base_url` does not parse.
    pub fn new(api_key: impl Into<String>, base_url: Option<&str>) -> Result<Self, AiError> {
        let raw = base_url.unwrap_or(DEFAULT_BASE_URL);
        let mut base_url = Url::parse(raw).map_err(|e| AiError::InvalidBaseUrl(e.to_string()))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            api_key: api_key.into(),
            base_url,
        })
    }
}

/// `GenerativeClient` over the Gemini REST API.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    #[must_use]
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, AiError> {
        self.config
            .base_url
            .join(path)
            .map_err(|e| AiError::InvalidBaseUrl(e.to_string()))
    }
}

#[async_trait]
impl GenerativeClient for GeminiClient {
    async fn upload_file(&self, path: &Path, display_name: &str) -> Result<RemoteFile, AiError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| AiError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let start = StartUpload {
            file: StartUploadFile { display_name },
        };
        let response = self
            .client
            .post(self.endpoint(&format!("upload/{API_VERSION}/files"))?)
            .header("x-goog-api-key", &self.config.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len())
            .header("X-Goog-Upload-Header-Content-Type", PDF_MIME_TYPE)
            .json(&start)
            .send()
            .await?;
        let response = check_status(response).await?;
        let upload_url = response
            .headers()
            .get("x-goog-upload-url")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or(AiError::MissingUploadUrl)?;

        tracing::debug!(display_name, size = bytes.len(), "uploading file bytes");
        let response = self
            .client
            .post(upload_url)
            .header("X-Goog-Upload-Offset", 0)
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(bytes)
            .send()
            .await?;
        let body: UploadedFile = check_status(response).await?.json().await?;
        Ok(body.file.into())
    }

    async fn get_file(&self, name: &str) -> Result<RemoteFile, AiError> {
        let response = self
            .client
            .get(self.endpoint(&format!("{API_VERSION}/{name}"))?)
            .header("x-goog-api-key", &self.config.api_key)
            .send()
            .await?;
        let file: FileResource = check_status(response).await?.json().await?;
        Ok(file.into())
    }

    async fn delete_file(&self, name: &str) -> Result<(), AiError> {
        let response = self
            .client
            .delete(self.endpoint(&format!("{API_VERSION}/{name}"))?)
            .header("x-goog-api-key", &self.config.api_key)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<String, AiError> {
        let mut parts = vec![Part::Text {
            text: request.prompt.clone(),
        }];
        parts.extend(request.files.iter().map(|file| Part::File {
            file_data: FileData {
                mime_type: file.mime_type.clone(),
                file_uri: file.uri.clone(),
            },
        }));
        let payload = GenerateContentRequest {
            system_instruction: SystemInstruction {
                parts: vec![Part::Text {
                    text: request.system_instruction.clone(),
                }],
            },
            contents: vec![Content {
                role: "user",
                parts,
            }],
        };

        let url = self.endpoint(&format!(
            "{API_VERSION}/models/{}:generateContent",
            request.model
        ))?;
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&payload)
            .send()
            .await?;
        let body: GenerateContentResponse = check_status(response).await?.json().await?;
        extract_text(body)
    }
}

async fn check_status(response: Response) -> Result<Response, AiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let raw = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&raw)
        .map(|body| body.error.message)
        .unwrap_or(raw);
    tracing::warn!(status = status.as_u16(), %message, "generative API request failed");
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AiError::PermissionDenied(message),
        StatusCode::NOT_FOUND => AiError::NotFound(message),
        _ => AiError::Api {
            status: status.as_u16(),
            message,
        },
    })
}

fn extract_text(body: GenerateContentResponse) -> Result<String, AiError> {
    if let Some(reason) = body.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(AiError::Safety(format!("prompt blocked: {reason}")));
    }

    let candidate = body
        .candidates
        .into_iter()
        .next()
        .ok_or(AiError::EmptyResponse)?;

    if let Some(reason) = candidate.finish_reason.as_deref() {
        if reason != "STOP" && reason != "MAX_TOKENS" {
            let flagged: Vec<&str> = candidate
                .safety_ratings
                .iter()
                .filter(|rating| !matches!(rating.probability.as_str(), "NEGLIGIBLE" | "LOW"))
                .map(|rating| rating.category.as_str())
                .collect();
            if flagged.is_empty() {
                return Err(AiError::UnexpectedFinish(reason.to_string()));
            }
            return Err(AiError::Safety(format!("{reason}: {}", flagged.join(", "))));
        }
    }

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();
    let text = text.trim();
    if text.is_empty() {
        return Err(AiError::EmptyResponse);
    }
    Ok(text.to_string())
}

//
// ─── WIRE TYPES ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Serialize)]
struct StartUpload<'a> {
    file: StartUploadFile<'a>,
}

#[derive(Debug, Serialize)]
struct StartUploadFile<'a> {
    display_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct UploadedFile {
    file: FileResource,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileResource {
    name: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    uri: String,
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    state: FileState,
    expiration_time: Option<DateTime<Utc>>,
}

impl From<FileResource> for RemoteFile {
    fn from(file: FileResource) -> Self {
        let mime_type = if file.mime_type.is_empty() {
            PDF_MIME_TYPE.to_string()
        } else {
            file.mime_type
        };
        Self {
            name: file.name,
            display_name: file.display_name,
            uri: file.uri,
            mime_type,
            state: file.state,
            expires_at: file.expiration_time,
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    system_instruction: SystemInstruction,
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    File { file_data: FileData },
}

#[derive(Debug, Serialize)]
struct FileData {
    mime_type: String,
    file_uri: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
    #[serde(default)]
    safety_ratings: Vec<SafetyRating>,
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

#[derive(Debug, Deserialize)]
struct SafetyRating {
    category: String,
    probability: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}
