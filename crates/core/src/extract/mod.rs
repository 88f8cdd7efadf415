//! One receipt image in, zero or more line items out, via a single hosted
//! model call.

pub mod gate;

use crate::capture::ReceiptImage;
use crate::domain::ExtractionResult;
use crate::llm::error::ModelCallError;
use crate::llm::{InlineImage, Provider, VisionModel, VisionRequest};
use crate::parse::{parse_receipt_text, ParseOutcome};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub use gate::{ScanGate, ScanInProgress, ScanPermit};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome {
    Items(ExtractionResult),
    /// The call succeeded but nothing item-shaped came back; the user should
    /// scan again.
    Empty { reason: EmptyReason, raw: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyReason {
    NoItemsExtracted,
    MalformedResponse,
}

#[derive(Debug, Clone)]
pub struct ExtractionFailed {
    pub provider: Provider,
    pub detail: String,
    pub status: Option<u16>,
    /// Error body returned by the provider, if any.
    pub raw_body: Option<String>,
    pub timed_out: bool,
}

impl ExtractionFailed {
    pub fn user_message(&self) -> &'static str {
        "Failed to process receipt. Please try again."
    }

    fn from_model_error(provider: Provider, err: anyhow::Error) -> Self {
        let call = err.downcast_ref::<ModelCallError>();
        let status = call.and_then(|e| e.status);
        let raw_body = call.and_then(|e| e.raw_body.clone());
        if let Some(body) = &raw_body {
            tracing::debug!(?provider, ?status, raw_body = %body, "model error body");
        }
        Self {
            provider,
            detail: format!("{err:#}"),
            status,
            raw_body,
            timed_out: false,
        }
    }

    fn timeout(provider: Provider, after: Duration) -> Self {
        Self {
            provider,
            detail: format!("no response within {}s", after.as_secs_f32()),
            status: None,
            raw_body: None,
            timed_out: true,
        }
    }
}

impl fmt::Display for ExtractionFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "receipt extraction failed (provider={:?}): {}",
            self.provider, self.detail
        )
    }
}

impl std::error::Error for ExtractionFailed {}

#[derive(Clone)]
pub struct ReceiptExtractor {
    model: Arc<dyn VisionModel>,
    currency: String,
    timeout: Duration,
}

impl ReceiptExtractor {
    pub fn new(model: Arc<dyn VisionModel>, currency: impl Into<String>) -> Self {
        Self {
            model,
            currency: currency.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn prompt(&self) -> String {
        [
            "Extract the receipt information from this image.".to_string(),
            String::new(),
            "I need you to:".to_string(),
            "1. Identify individual items purchased".to_string(),
            format!(
                "2. Extract the price for each item as a plain number in {}",
                self.currency
            ),
            "3. Categorize each item with a short label (e.g., Groceries, Electronics, Restaurant)"
                .to_string(),
            "4. If an item is printed as a cryptic code or abbreviation, infer the readable product name from context"
                .to_string(),
            String::new(),
            "Return ONLY a valid JSON object with this structure:".to_string(),
            "{".to_string(),
            "  \"items\": [".to_string(),
            "    {\"name\": \"Item name\", \"price\": 10.99, \"category\": \"Category name\"}"
                .to_string(),
            "  ]".to_string(),
            "}".to_string(),
            String::new(),
            "Do not include any explanation or text outside of the JSON structure.".to_string(),
            "Do not put currency symbols in the price field.".to_string(),
        ]
        .join("\n")
    }

    pub async fn extract(
        &self,
        image: &ReceiptImage,
    ) -> Result<ExtractionOutcome, ExtractionFailed> {
        let provider = self.model.provider();
        let request = VisionRequest {
            prompt: self.prompt(),
            image: InlineImage {
                data: image.base64_data().to_string(),
                mime_type: image.mime_type().to_string(),
            },
        };

        let started = std::time::Instant::now();
        let text = match tokio::time::timeout(self.timeout, self.model.generate(request)).await {
            Ok(Ok(text)) => text,
            Ok(Err(err)) => {
                let failed = ExtractionFailed::from_model_error(provider, err);
                tracing::warn!(?provider, error = %failed, "receipt extraction failed");
                return Err(failed);
            }
            Err(_) => {
                let failed = ExtractionFailed::timeout(provider, self.timeout);
                tracing::warn!(?provider, error = %failed, "receipt extraction timed out");
                return Err(failed);
            }
        };

        tracing::debug!(
            ?provider,
            elapsed_ms = started.elapsed().as_millis(),
            raw = %text,
            "raw model response"
        );

        let outcome = match parse_receipt_text(&text) {
            ParseOutcome::Items(items) => ExtractionOutcome::Items(ExtractionResult { items }),
            ParseOutcome::Empty => ExtractionOutcome::Empty {
                reason: EmptyReason::NoItemsExtracted,
                raw: text,
            },
            ParseOutcome::Malformed { raw } => ExtractionOutcome::Empty {
                reason: EmptyReason::MalformedResponse,
                raw,
            },
        };

        match &outcome {
            ExtractionOutcome::Items(result) => {
                tracing::info!(?provider, items = result.items.len(), total = result.total(), "receipt extracted")
            }
            ExtractionOutcome::Empty { reason, .. } => {
                tracing::info!(?provider, ?reason, "no items detected on receipt")
            }
        }
        Ok(outcome)
    }
}
