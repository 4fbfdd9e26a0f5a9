//! Session credential lifecycle for the PurLog SDK.
//!
//! A session credential is issued by the backend for one device identity and
//! accompanies every log submission. [`SessionTokenManager`] creates it on
//! first use, refreshes it when the [`ExpiryPolicy`] says so, and persists it
//! through a [`purlog_storage::CredentialStore`].

mod api;
mod error;
mod expiry;
mod session;

pub use api::{
    summarize_response_body, HttpSessionTokenApi, SessionTokenApi, SESSION_TOKENS_PATH,
    SESSION_TOKENS_REFRESH_PATH,
};
pub use error::{AuthError, AuthResult};
pub use expiry::{ExpiryPolicy, JwtExpiry, NeverExpires, DEFAULT_EXPIRY_LEEWAY_SECS};
pub use session::SessionTokenManager;
