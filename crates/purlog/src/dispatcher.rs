//! Remote delivery of log records.
//!
//! Each dispatch reads the stored credentials, lets the session token
//! manager refresh an expired session credential, then submits one
//! [`LogRecord`] to `POST /api/logs`. Nothing is retried or queued.

use crate::device::DeviceInfo;
use crate::error::{PurLogError, PurLogResult};
use crate::level::{Environment, LogLevel};
use crate::Metadata;
use async_trait::async_trait;
use purlog_auth::SessionTokenManager;
use purlog_storage::CredentialStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Log submission endpoint path.
pub const LOGS_PATH: &str = "/api/logs";

/// Value of the `sdk` field of every record.
pub const SDK_NAME: &str = "rust";

/// One log submission as it goes over the wire.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    #[serde(rename = "projectJWT")]
    pub project_jwt: String,
    #[serde(rename = "sessionJWT")]
    pub session_jwt: String,
    pub project_id: String,
    pub message: String,
    pub level: LogLevel,
    pub env: Environment,
    pub device_info: DeviceInfo,
    pub metadata: Metadata,
    pub app_version: String,
    pub sdk: &'static str,
}

impl std::fmt::Debug for LogRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogRecord")
            .field("project_id", &self.project_id)
            .field("level", &self.level)
            .field("env", &self.env)
            .field("message", &self.message)
            .field("app_version", &self.app_version)
            .finish_non_exhaustive()
    }
}

/// Per-client values shared by every record.
#[derive(Debug, Clone)]
pub struct RecordContext {
    pub project_id: String,
    pub env: Environment,
    pub device_info: DeviceInfo,
    pub app_version: String,
}

/// Submits a built record to the backend.
#[async_trait]
pub trait LogTransport: Send + Sync {
    /// Fails with [`PurLogError::LogDelivery`] on a non-2xx answer and
    /// [`PurLogError::Http`] when the request could not be sent.
    async fn send(&self, record: &LogRecord) -> PurLogResult<()>;
}

/// HTTP implementation of [`LogTransport`].
#[derive(Clone, Debug)]
pub struct HttpLogTransport {
    http_client: reqwest::Client,
    api_url: String,
}

impl HttpLogTransport {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), api_url)
    }

    pub fn with_client(http_client: reqwest::Client, api_url: impl Into<String>) -> Self {
        let api_url: String = api_url.into();
        Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl LogTransport for HttpLogTransport {
    async fn send(&self, record: &LogRecord) -> PurLogResult<()> {
        let url = format!("{}{}", self.api_url, LOGS_PATH);
        debug!(url = %url, level = %record.level, "Submitting log");

        let response = self.http_client.post(&url).json(record).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                status = %status,
                body_summary = %purlog_auth::summarize_response_body(&body),
                "Log submission rejected"
            );
            return Err(PurLogError::LogDelivery {
                status: status.as_u16(),
                detail: status.canonical_reason().unwrap_or("Unknown status").to_string(),
            });
        }

        Ok(())
    }
}

/// Builds and submits log records for one credential pair.
pub struct Dispatcher {
    store: CredentialStore,
    tokens: Arc<SessionTokenManager>,
    transport: Arc<dyn LogTransport>,
}

impl Dispatcher {
    pub fn new(
        store: CredentialStore,
        tokens: Arc<SessionTokenManager>,
        transport: Arc<dyn LogTransport>,
    ) -> Self {
        Self {
            store,
            tokens,
            transport,
        }
    }

    /// Submit one log line.
    ///
    /// A missing credential fails before any network request is made.
    pub async fn dispatch(
        &self,
        context: &RecordContext,
        level: LogLevel,
        message: &str,
        metadata: Metadata,
    ) -> PurLogResult<()> {
        let project_jwt = self
            .store
            .project_credential()
            .await?
            .ok_or(PurLogError::MissingCredential("project JWT"))?;
        let session_jwt = self
            .store
            .session_credential()
            .await?
            .ok_or(PurLogError::MissingCredential("session JWT"))?;

        let session_jwt = self
            .tokens
            .refresh_if_expired(&project_jwt, &session_jwt, &context.project_id)
            .await?;

        let record = LogRecord {
            project_jwt,
            session_jwt,
            project_id: context.project_id.clone(),
            message: message.to_string(),
            level,
            env: context.env,
            device_info: context.device_info.clone(),
            metadata,
            app_version: context.app_version.clone(),
            sdk: SDK_NAME,
        };

        self.transport.send(&record).await
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use mockito::{Matcher, Server};
    use purlog_auth::{ExpiryPolicy, HttpSessionTokenApi, NeverExpires, SESSION_TOKENS_REFRESH_PATH};
    use purlog_storage::{MemoryStorage, StorageKeys};
    use serde_json::json;

    struct ExpiredMarker;

    impl ExpiryPolicy for ExpiredMarker {
        fn is_expired(&self, session_credential: &str) -> bool {
            session_credential == "expired"
        }
    }

    fn context() -> RecordContext {
        RecordContext {
            project_id: "p1".into(),
            env: Environment::Prod,
            device_info: DeviceInfo::new(Some("Linux".into()), Some("6.1".into())),
            app_version: "1.2.3".into(),
        }
    }

    fn dispatcher(
        api_url: &str,
        entries: &[(&str, &str)],
        expiry: Arc<dyn ExpiryPolicy>,
    ) -> (Dispatcher, CredentialStore) {
        let storage = MemoryStorage::with_entries(entries.iter().copied());
        let store = CredentialStore::new(Arc::new(storage));
        let api = Arc::new(HttpSessionTokenApi::new(api_url));
        let tokens = Arc::new(SessionTokenManager::new(api, store.clone(), expiry));
        let transport = Arc::new(HttpLogTransport::new(api_url));
        (Dispatcher::new(store.clone(), tokens, transport), store)
    }

    #[test]
    fn test_record_wire_shape() {
        let mut metadata = Metadata::new();
        metadata.insert("k".into(), "v".into());
        let record = LogRecord {
            project_jwt: "pj".into(),
            session_jwt: "sj".into(),
            project_id: "p1".into(),
            message: "hello".into(),
            level: LogLevel::Info,
            env: Environment::Dev,
            device_info: DeviceInfo::new(Some("iOS".into()), Some("17".into())),
            metadata,
            app_version: "unknown".into(),
            sdk: SDK_NAME,
        };

        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({
                "projectJWT": "pj",
                "sessionJWT": "sj",
                "projectId": "p1",
                "message": "hello",
                "level": "INFO",
                "env": "DEV",
                "deviceInfo": {"osName": "iOS", "osVersion": "17"},
                "metadata": {"k": "v"},
                "appVersion": "unknown",
                "sdk": "rust"
            })
        );
        assert!(!format!("{record:?}").contains("pj"));
    }

    #[tokio::test]
    async fn test_dispatch_posts_record() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", LOGS_PATH)
            .match_body(Matcher::PartialJson(json!({
                "projectJWT": "project-jwt",
                "sessionJWT": "s1",
                "projectId": "p1",
                "message": "hello",
                "level": "WARN",
                "env": "PROD",
                "appVersion": "1.2.3",
                "sdk": "rust"
            })))
            .with_status(201)
            .expect(1)
            .create_async()
            .await;

        let (dispatcher, _store) = dispatcher(
            &server.url(),
            &[
                (StorageKeys::PROJECT_CREDENTIAL, "project-jwt"),
                (StorageKeys::SESSION_CREDENTIAL, "s1"),
            ],
            Arc::new(NeverExpires),
        );

        dispatcher
            .dispatch(&context(), LogLevel::Warn, "hello", Metadata::new())
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_credentials_make_no_request() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let (no_session, _) = dispatcher(
            &server.url(),
            &[(StorageKeys::PROJECT_CREDENTIAL, "project-jwt")],
            Arc::new(NeverExpires),
        );
        let err = no_session
            .dispatch(&context(), LogLevel::Info, "x", Metadata::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PurLogError::MissingCredential("session JWT")));

        let (no_project, _) = dispatcher(
            &server.url(),
            &[(StorageKeys::SESSION_CREDENTIAL, "s1")],
            Arc::new(NeverExpires),
        );
        let err = no_project
            .dispatch(&context(), LogLevel::Info, "x", Metadata::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PurLogError::MissingCredential("project JWT")));

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_status_is_log_delivery_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", LOGS_PATH)
            .with_status(500)
            .with_body("stack trace with secrets")
            .create_async()
            .await;

        let (dispatcher, _store) = dispatcher(
            &server.url(),
            &[
                (StorageKeys::PROJECT_CREDENTIAL, "project-jwt"),
                (StorageKeys::SESSION_CREDENTIAL, "s1"),
            ],
            Arc::new(NeverExpires),
        );

        let err = dispatcher
            .dispatch(&context(), LogLevel::Error, "x", Metadata::new())
            .await
            .unwrap_err();

        match err {
            PurLogError::LogDelivery { status, detail } => {
                assert_eq!(status, 500);
                assert_eq!(detail, "Internal Server Error");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_expired_session_is_refreshed_before_submit() {
        let mut server = Server::new_async().await;
        let refresh = server
            .mock("PUT", SESSION_TOKENS_REFRESH_PATH)
            .match_body(Matcher::PartialJson(json!({"sessionJWT": "expired"})))
            .with_status(200)
            .with_body(r#"{"jwt": "s2"}"#)
            .expect(1)
            .create_async()
            .await;
        let submit = server
            .mock("POST", LOGS_PATH)
            .match_body(Matcher::PartialJson(json!({"sessionJWT": "s2"})))
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let (dispatcher, store) = dispatcher(
            &server.url(),
            &[
                (StorageKeys::PROJECT_CREDENTIAL, "project-jwt"),
                (StorageKeys::SESSION_CREDENTIAL, "expired"),
            ],
            Arc::new(ExpiredMarker),
        );

        dispatcher
            .dispatch(&context(), LogLevel::Info, "x", Metadata::new())
            .await
            .unwrap();

        refresh.assert_async().await;
        submit.assert_async().await;
        assert_eq!(store.session_credential().await.unwrap().as_deref(), Some("s2"));
    }

    #[tokio::test]
    async fn test_refresh_failure_skips_submit() {
        let mut server = Server::new_async().await;
        let _refresh = server
            .mock("PUT", SESSION_TOKENS_REFRESH_PATH)
            .with_status(401)
            .create_async()
            .await;
        let submit = server
            .mock("POST", LOGS_PATH)
            .expect(0)
            .create_async()
            .await;

        let (dispatcher, _store) = dispatcher(
            &server.url(),
            &[
                (StorageKeys::PROJECT_CREDENTIAL, "project-jwt"),
                (StorageKeys::SESSION_CREDENTIAL, "expired"),
            ],
            Arc::new(ExpiredMarker),
        );

        let err = dispatcher
            .dispatch(&context(), LogLevel::Info, "x", Metadata::new())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::TokenRefresh);
        submit.assert_async().await;
    }
}
