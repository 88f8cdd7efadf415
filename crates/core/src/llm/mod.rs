pub mod error;
pub mod gemini;

#[derive(Debug, Clone)]
pub struct VisionRequest {
    pub prompt: String,
    pub image: InlineImage,
}

/// Image as transmitted: base64 payload without the data URI prefix.
#[derive(Debug, Clone)]
pub struct InlineImage {
    pub data: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gemini,
    Fake,
}

/// A hosted model that turns an image plus prompt into free-form text.
#[async_trait::async_trait]
pub trait VisionModel: Send + Sync {
    fn provider(&self) -> Provider;

    async fn generate(&self, request: VisionRequest) -> anyhow::Result<String>;
}
