// OpenAI embeddings adapter. Also works with OpenAI-compatible servers.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{EmbeddingError, EmbeddingProvider};

pub struct OpenAiEmbeddingClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

impl OpenAiEmbeddingClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }
}

fn classify(err: reqwest::Error) -> EmbeddingError {
    if err.is_timeout() {
        EmbeddingError::Timeout
    } else if err.is_decode() {
        EmbeddingError::Malformed(err.to_string())
    } else {
        EmbeddingError::Transport(err.to_string())
    }
}

fn first_vector(response: EmbeddingResponse) -> Result<Vec<f32>, EmbeddingError> {
    let vector = response
        .data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .ok_or_else(|| EmbeddingError::Malformed("response has no data".into()))?;

    if vector.is_empty() {
        return Err(EmbeddingError::Malformed("empty vector".into()));
    }
    if vector.iter().any(|x| !x.is_finite()) {
        return Err(EmbeddingError::Malformed("non-finite component".into()));
    }
    Ok(vector)
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: text,
            })
            .send()
            .await
            .map_err(classify)?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => return Err(EmbeddingError::RateLimited),
            status if !status.is_success() => return Err(EmbeddingError::Status(status.as_u16())),
            _ => {}
        }

        let body = response.json::<EmbeddingResponse>().await.map_err(classify)?;
        first_vector(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<Vec<f32>, EmbeddingError> {
        first_vector(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn takes_first_vector() {
        let v = parse(r#"{"data":[{"embedding":[0.1,0.2]},{"embedding":[9.0]}],"model":"m"}"#).unwrap();
        assert_eq!(v, vec![0.1, 0.2]);
    }

    #[test]
    fn empty_data_is_malformed() {
        assert!(matches!(parse(r#"{"data":[]}"#), Err(EmbeddingError::Malformed(_))));
        assert!(matches!(parse(r#"{"data":[{"embedding":[]}]}"#), Err(EmbeddingError::Malformed(_))));
    }

    #[tokio::test]
    async fn blank_text_is_never_sent() {
        let client = OpenAiEmbeddingClient::new(
            "http://127.0.0.1:9/v1/embeddings",
            "key",
            "text-embedding-3-small",
            Duration::from_millis(50),
        )
        .unwrap();

        assert!(matches!(client.embed("   ").await, Err(EmbeddingError::EmptyInput)));
    }

    #[tokio::test]
    async fn disabled_provider_always_fails() {
        let provider = super::super::DisabledEmbeddings;
        assert!(!provider.is_enabled());
        assert!(matches!(provider.embed("hello").await, Err(EmbeddingError::Disabled)));
    }
}
