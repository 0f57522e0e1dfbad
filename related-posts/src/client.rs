use std::time::Duration;

use reqwest::StatusCode;
use serde::Serialize;

use crate::error::RelatedPostsError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    text: &'a str,
}

/// Client for the embedding API's `POST /embedding`.
#[derive(Clone)]
pub struct EmbedClient {
    client: reqwest::Client,
    url: String,
    token: String,
}

impl EmbedClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self, RelatedPostsError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            url: format!("{}/embedding", base_url.trim_end_matches('/')),
            token: token.to_owned(),
        })
    }

    pub async fn get_embedding(&self, text: &str) -> Result<Vec<f64>, RelatedPostsError> {
        let mut request = self.client.post(&self.url).json(&EmbeddingRequest { text });
        if !self.token.is_empty() {
            request = request.bearer_auth(&self.token);
        }

        let response = request.send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(RelatedPostsError::Status { status, body });
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use httpmock::{Method::POST, MockServer};
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_get_embedding_sends_token() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/embedding")
                    .header("authorization", "Bearer s3cret")
                    .json_body(json!({"text": "hello"}));
                then.status(200).json_body(json!([0.25, -1.0]));
            })
            .await;

        let client = EmbedClient::new(&server.base_url(), "s3cret").unwrap();
        let embedding = client.get_embedding("hello").await.unwrap();

        mock.assert_async().await;
        assert_eq!(embedding, vec![0.25, -1.0]);
    }

    #[tokio::test]
    async fn test_get_embedding_without_token_sends_no_header() {
        let server = MockServer::start_async().await;
        let with_header = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/embedding")
                    .header_exists("authorization");
                then.status(401);
            })
            .await;
        let without_header = server
            .mock_async(|when, then| {
                when.method(POST).path("/embedding");
                then.status(200).json_body(json!([1.0]));
            })
            .await;

        let client = EmbedClient::new(&format!("{}/", server.base_url()), "").unwrap();
        let embedding = client.get_embedding("hello").await.unwrap();

        assert_eq!(embedding, vec![1.0]);
        with_header.assert_hits_async(0).await;
        without_header.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_embedding_non_200_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/embedding");
                then.status(500)
                    .json_body(json!({"error": "Internal Server Error"}));
            })
            .await;

        let client = EmbedClient::new(&server.base_url(), "").unwrap();
        let result = client.get_embedding("hello").await;

        match result {
            Err(RelatedPostsError::Status { status, body }) => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert!(body.contains("Internal Server Error"));
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }
}
