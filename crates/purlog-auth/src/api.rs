//! REST client for the session token endpoints.
//!
//! - `POST /api/session_tokens` issues a session credential for a device
//! - `PUT /api/session_tokens/refresh` exchanges a session credential for a
//!   fresh one
//!
//! Both answer `200 {"jwt": "..."}` on success. Anything else, including a
//! `200` without a usable `jwt`, is a failure.

use crate::error::{AuthError, AuthResult};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Token issuance endpoint path.
pub const SESSION_TOKENS_PATH: &str = "/api/session_tokens";

/// Token refresh endpoint path.
pub const SESSION_TOKENS_REFRESH_PATH: &str = "/api/session_tokens/refresh";

/// Length and digest of a response body, for logs and error messages that
/// must not echo the body itself.
pub fn summarize_response_body(body: &str) -> String {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("len={},digest={:016x}", body.len(), hasher.finish())
}

/// Remote operations the session token manager relies on.
#[async_trait]
pub trait SessionTokenApi: Send + Sync {
    /// Issue a new session credential bound to `device_identity`.
    ///
    /// Fails with [`AuthError::TokenCreation`].
    async fn create_session_token(
        &self,
        project_credential: &str,
        device_identity: &str,
        project_id: &str,
    ) -> AuthResult<String>;

    /// Exchange `session_credential` for a fresh one.
    ///
    /// Fails with [`AuthError::TokenRefresh`].
    async fn refresh_session_token(
        &self,
        project_credential: &str,
        session_credential: &str,
        project_id: &str,
    ) -> AuthResult<String>;
}

#[derive(Debug, Serialize)]
struct CreateTokenRequest<'a> {
    #[serde(rename = "projectJWT")]
    project_jwt: &'a str,
    uuid: &'a str,
    #[serde(rename = "projectId")]
    project_id: &'a str,
}

#[derive(Debug, Serialize)]
struct RefreshTokenRequest<'a> {
    #[serde(rename = "projectJWT")]
    project_jwt: &'a str,
    #[serde(rename = "sessionJWT")]
    session_jwt: &'a str,
    #[serde(rename = "projectId")]
    project_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    jwt: Option<String>,
}

/// HTTP implementation of [`SessionTokenApi`].
#[derive(Clone, Debug)]
pub struct HttpSessionTokenApi {
    http_client: reqwest::Client,
    api_url: String,
}

impl HttpSessionTokenApi {
    /// Create a client for the API rooted at `api_url`.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), api_url)
    }

    /// Create a client that shares an existing `reqwest::Client`.
    pub fn with_client(http_client: reqwest::Client, api_url: impl Into<String>) -> Self {
        let api_url: String = api_url.into();
        Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    /// Send a token request and pull the `jwt` out of a `200` response.
    async fn exchange(&self, request: reqwest::RequestBuilder) -> Result<String, String> {
        let response = request
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            let body_summary = summarize_response_body(&body);
            tracing::error!(
                status = %status,
                body_summary = %body_summary,
                "Session token request rejected"
            );
            return Err(format!("Non-200 status code: {} ({})", status, body_summary));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| format!("Failed to parse the response: {}", e))?;

        body.jwt
            .filter(|jwt| !jwt.is_empty())
            .ok_or_else(|| "Failed to parse the response: missing jwt".to_string())
    }
}

#[async_trait]
impl SessionTokenApi for HttpSessionTokenApi {
    async fn create_session_token(
        &self,
        project_credential: &str,
        device_identity: &str,
        project_id: &str,
    ) -> AuthResult<String> {
        let url = self.url(SESSION_TOKENS_PATH);
        tracing::debug!(url = %url, project_id = %project_id, "Requesting session JWT");

        let body = CreateTokenRequest {
            project_jwt: project_credential,
            uuid: device_identity,
            project_id,
        };

        self.exchange(self.http_client.post(&url).json(&body))
            .await
            .map_err(AuthError::TokenCreation)
    }

    async fn refresh_session_token(
        &self,
        project_credential: &str,
        session_credential: &str,
        project_id: &str,
    ) -> AuthResult<String> {
        let url = self.url(SESSION_TOKENS_REFRESH_PATH);
        tracing::debug!(url = %url, project_id = %project_id, "Refreshing session JWT");

        let body = RefreshTokenRequest {
            project_jwt: project_credential,
            session_jwt: session_credential,
            project_id,
        };

        self.exchange(self.http_client.put(&url).json(&body))
            .await
            .map_err(AuthError::TokenRefresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    #[test]
    fn test_url_trims_trailing_slash() {
        let api = HttpSessionTokenApi::new("https://logs.example.com/");
        assert_eq!(
            api.url(SESSION_TOKENS_PATH),
            "https://logs.example.com/api/session_tokens"
        );
    }

    #[test]
    fn test_request_serialization_uses_wire_names() {
        let body = CreateTokenRequest {
            project_jwt: "p",
            uuid: "u",
            project_id: "id",
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value, json!({"projectJWT": "p", "uuid": "u", "projectId": "id"}));

        let body = RefreshTokenRequest {
            project_jwt: "p",
            session_jwt: "s",
            project_id: "id",
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value, json!({"projectJWT": "p", "sessionJWT": "s", "projectId": "id"}));
    }

    #[test]
    fn test_summarize_response_body_hides_content() {
        let summary = summarize_response_body("secret-token");
        assert!(summary.starts_with("len=12,digest="));
        assert!(!summary.contains("secret"));
    }

    #[tokio::test]
    async fn test_create_session_token_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", SESSION_TOKENS_PATH)
            .match_body(Matcher::Json(json!({
                "projectJWT": "project-jwt",
                "uuid": "device-1",
                "projectId": "p1"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"jwt": "s1"}"#)
            .expect(1)
            .create_async()
            .await;

        let api = HttpSessionTokenApi::new(server.url());
        let token = api
            .create_session_token("project-jwt", "device-1", "p1")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(token, "s1");
    }

    #[tokio::test]
    async fn test_create_session_token_non_200() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", SESSION_TOKENS_PATH)
            .with_status(401)
            .with_body("unauthorized")
            .create_async()
            .await;

        let api = HttpSessionTokenApi::new(server.url());
        let err = api
            .create_session_token("project-jwt", "device-1", "p1")
            .await
            .unwrap_err();

        match err {
            AuthError::TokenCreation(reason) => {
                assert!(reason.contains("401"));
                assert!(!reason.contains("unauthorized"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_session_token_requires_exactly_200() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", SESSION_TOKENS_PATH)
            .with_status(201)
            .with_body(r#"{"jwt": "s1"}"#)
            .create_async()
            .await;

        let api = HttpSessionTokenApi::new(server.url());
        let result = api.create_session_token("p", "d", "p1").await;
        assert!(matches!(result, Err(AuthError::TokenCreation(_))));
    }

    #[tokio::test]
    async fn test_create_session_token_missing_or_empty_jwt() {
        for body in [r#"{}"#, r#"{"jwt": ""}"#, r#"{"jwt": null}"#, "not json"] {
            let mut server = Server::new_async().await;
            let _mock = server
                .mock("POST", SESSION_TOKENS_PATH)
                .with_status(200)
                .with_body(body)
                .create_async()
                .await;

            let api = HttpSessionTokenApi::new(server.url());
            let result = api.create_session_token("p", "d", "p1").await;
            assert!(
                matches!(result, Err(AuthError::TokenCreation(_))),
                "body {body:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_create_session_token_transport_failure() {
        // Nothing listens on port 1
        let api = HttpSessionTokenApi::new("http://127.0.0.1:1");
        let result = api.create_session_token("p", "d", "p1").await;
        assert!(matches!(result, Err(AuthError::TokenCreation(_))));
    }

    #[tokio::test]
    async fn test_refresh_session_token_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PUT", SESSION_TOKENS_REFRESH_PATH)
            .match_body(Matcher::Json(json!({
                "projectJWT": "project-jwt",
                "sessionJWT": "s1",
                "projectId": "p1"
            })))
            .with_status(200)
            .with_body(r#"{"jwt": "s2"}"#)
            .expect(1)
            .create_async()
            .await;

        let api = HttpSessionTokenApi::new(server.url());
        let token = api
            .refresh_session_token("project-jwt", "s1", "p1")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(token, "s2");
    }

    #[tokio::test]
    async fn test_refresh_session_token_failure() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("PUT", SESSION_TOKENS_REFRESH_PATH)
            .with_status(500)
            .create_async()
            .await;

        let api = HttpSessionTokenApi::new(server.url());
        let result = api.refresh_session_token("p", "s1", "p1").await;
        assert!(matches!(result, Err(AuthError::TokenRefresh(_))));
    }
}
