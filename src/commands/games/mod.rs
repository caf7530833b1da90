//! Minigames backed by external randomness services.

use serde_json::{Value, json};
use thiserror::Error;

pub(crate) mod rps;

/// random.org JSON-RPC endpoint.
const API: &str = "https://api.random.org/json-rpc/1/invoke";

/// Errors raised while fetching a random draw.
#[derive(Error, Debug)]
enum RandomOrgError {
    #[error("API communication failure: {0}")]
    Api(#[from] reqwest::Error),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid response received from random.org")]
    Invalid,
}

/// Requests a single integer in `min..=max` from random.org.
///
/// One attempt only. A failed draw is reported, never replaced with
/// local randomness.
async fn request_integer(base_url: &str, min: i64, max: i64) -> Result<i64, RandomOrgError> {
    let api_key = std::env::var("RANDOM_ORG_KEY")
        .map_err(|_| RandomOrgError::BadRequest("RANDOM_ORG_KEY is not set".to_string()))?;

    let body = json!({
        "jsonrpc": "2.0",
        "method": "generateIntegers",
        "params": {
            "apiKey": api_key,
            "n": 1,
            "min": min,
            "max": max,
        },
        "id": rand::random_range(0..42),
    });

    let client = reqwest::Client::new();
    let response: Value = client
        .post(base_url)
        .header("Content-Type", "application/json-rpc")
        .json(&body)
        .send()
        .await?
        .json()
        .await?;

    if let Value::String(message) = &response["error"]["message"] {
        return Err(RandomOrgError::BadRequest(message.to_string()));
    }

    response["result"]["random"]["data"][0]
        .as_i64()
        .ok_or(RandomOrgError::Invalid)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    use super::*;

    #[tokio::test]
    async fn test_request_integer_success() {
        let server = MockServer::start().await;
        // SAFETY: test-only env mutation, no concurrent readers of this key.
        unsafe { std::env::set_var("RANDOM_ORG_KEY", "test-key") };

        let mock_response = json!({
            "jsonrpc": "2.0",
            "result": {
                "random": {
                    "data": [2],
                    "completionTime": "2026-08-26 12:00:00Z"
                },
                "bitsUsed": 2,
                "bitsLeft": 199998,
                "requestsLeft": 9999,
                "advisoryDelay": 0
            },
            "id": 7
        });

        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(mock_response))
            .mount(&server)
            .await;

        let result = request_integer(&server.uri(), 1, 3).await;
        assert_eq!(result.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_request_integer_api_error() {
        let server = MockServer::start().await;
        unsafe { std::env::set_var("RANDOM_ORG_KEY", "test-key") };

        let mock_response = json!({
            "jsonrpc": "2.0",
            "error": {
                "code": 202,
                "message": "The API key is not valid",
            },
            "id": 7
        });

        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(mock_response))
            .mount(&server)
            .await;

        let result = request_integer(&server.uri(), 1, 3).await;
        assert!(matches!(result, Err(RandomOrgError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_request_integer_malformed_response() {
        let server = MockServer::start().await;
        unsafe { std::env::set_var("RANDOM_ORG_KEY", "test-key") };

        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"jsonrpc": "2.0"})))
            .mount(&server)
            .await;

        let result = request_integer(&server.uri(), 1, 3).await;
        assert!(matches!(result, Err(RandomOrgError::Invalid)));
    }
}
