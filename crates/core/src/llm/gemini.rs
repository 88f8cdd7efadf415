use crate::config::Settings;
use crate::llm::error::ModelCallError;
use crate::llm::{Provider, VisionModel, VisionRequest};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl GeminiClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_gemini_api_key()?.to_string();
        let base_url =
            std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let timeout_secs = std::env::var("GEMINI_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|s| *s > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Self::new(api_key, base_url, model, Duration::from_secs(timeout_secs))
    }

    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: model.into(),
            timeout,
        })
    }

    /// Request timeout, also used by the extractor as its overall deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    // The key travels as a header so it never shows up in a URL, and with it in
    // error text, logs or Sentry events.
    fn build_request(&self, request: &VisionRequest) -> anyhow::Result<reqwest::Request> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(&self.api_key).context("invalid GEMINI_API_KEY")?;
        key.set_sensitive(true);
        headers.insert("x-goog-api-key", key);

        self.http
            .post(self.url())
            .headers(headers)
            .json(&Self::request_body(request))
            .build()
            .map_err(|e| {
                ModelCallError::new(Provider::Gemini, "build", e.without_url().to_string()).into()
            })
    }

    fn request_body(request: &VisionRequest) -> GenerateContentRequest<'_> {
        GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text {
                        text: &request.prompt,
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: &request.image.mime_type,
                            data: &request.image.data,
                        },
                    },
                ],
            }],
        }
    }

    fn response_text(res: &GenerateContentResponse) -> Result<String, ModelCallError> {
        let Some(candidate) = res.candidates.first() else {
            let reason = res
                .prompt_feedback
                .as_ref()
                .and_then(|f| f.block_reason.clone())
                .unwrap_or_else(|| "no candidates".to_string());
            return Err(ModelCallError::new(Provider::Gemini, "decode", reason));
        };

        let mut out = String::new();
        for part in candidate.content.iter().flat_map(|c| &c.parts) {
            if let Some(text) = &part.text {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(text);
            }
        }
        Ok(out)
    }
}

#[async_trait::async_trait]
impl VisionModel for GeminiClient {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    async fn generate(&self, request: VisionRequest) -> anyhow::Result<String> {
        let req = self.build_request(&request)?;
        let res = self.http.execute(req).await.map_err(|e| {
            ModelCallError::new(Provider::Gemini, "send", e.without_url().to_string())
        })?;

        let status = res.status();
        let text = res.text().await.map_err(|e| {
            ModelCallError::new(Provider::Gemini, "read_body", e.without_url().to_string())
        })?;
        if !status.is_success() {
            return Err(ModelCallError::new(Provider::Gemini, "http", format!("status={status}"))
                .with_status(status.as_u16())
                .with_raw_body(text)
                .into());
        }

        let parsed = serde_json::from_str::<GenerateContentResponse>(&text).map_err(|e| {
            ModelCallError::new(Provider::Gemini, "decode", e.to_string()).with_raw_body(text.clone())
        })?;
        Ok(Self::response_text(&parsed)?)
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Clone, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Clone, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Clone, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}
