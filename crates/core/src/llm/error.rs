use crate::llm::Provider;
use std::fmt;

/// A hosted model call that did not produce a usable response envelope.
#[derive(Debug, Clone)]
pub struct ModelCallError {
    pub provider: Provider,
    pub stage: &'static str,
    pub status: Option<u16>,
    pub detail: String,
    pub raw_body: Option<String>,
}

impl ModelCallError {
    pub fn new(provider: Provider, stage: &'static str, detail: impl Into<String>) -> Self {
        Self {
            provider,
            stage,
            status: None,
            detail: detail.into(),
            raw_body: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_raw_body(mut self, body: impl Into<String>) -> Self {
        self.raw_body = Some(body.into());
        self
    }
}

impl fmt::Display for ModelCallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "model call failed (provider={:?}, stage={}",
            self.provider, self.stage
        )?;
        if let Some(status) = self.status {
            write!(f, ", status={status}")?;
        }
        write!(f, "): {}", self.detail)
    }
}

impl std::error::Error for ModelCallError {}
