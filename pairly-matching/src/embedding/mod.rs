//! Text → vector providers used by the similarity ranker.

use async_trait::async_trait;

mod openai;

pub use openai::OpenAiEmbeddingClient;

#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("embedding provider is disabled")]
    Disabled,

    #[error("nothing to embed")]
    EmptyInput,

    #[error("embedding request timed out")]
    Timeout,

    #[error("embedding provider rate limited the request")]
    RateLimited,

    #[error("embedding provider returned status {0}")]
    Status(u16),

    #[error("embedding transport error: {0}")]
    Transport(String),

    #[error("malformed embedding response: {0}")]
    Malformed(String),
}

impl EmbeddingError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::EmptyInput => "empty_input",
            Self::Timeout => "timeout",
            Self::RateLimited => "rate_limited",
            Self::Status(_) => "status",
            Self::Transport(_) => "transport",
            Self::Malformed(_) => "malformed",
        }
    }
}

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    fn is_enabled(&self) -> bool {
        true
    }
}

/// Used when no API key is configured; ranking then keeps filter order.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledEmbeddings;

#[async_trait]
impl EmbeddingProvider for DisabledEmbeddings {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::Disabled)
    }

    fn is_enabled(&self) -> bool {
        false
    }
}
