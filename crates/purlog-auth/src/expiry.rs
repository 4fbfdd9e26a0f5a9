//! Session credential expiry detection.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};

/// Default margin before the `exp` claim at which a credential is already
/// treated as expired.
pub const DEFAULT_EXPIRY_LEEWAY_SECS: i64 = 60;

/// Decides whether a session credential must be refreshed before use.
pub trait ExpiryPolicy: Send + Sync {
    /// Whether `session_credential` is expired (or about to be).
    fn is_expired(&self, session_credential: &str) -> bool;
}

/// Never reports expiry; the backend is the only judge.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverExpires;

impl ExpiryPolicy for NeverExpires {
    fn is_expired(&self, _session_credential: &str) -> bool {
        false
    }
}

/// Reads the `exp` claim of a JWT-shaped credential.
///
/// The signature is not verified. Credentials without a readable `exp` are
/// reported as not expired.
#[derive(Debug, Clone, Copy)]
pub struct JwtExpiry {
    leeway: Duration,
}

impl Default for JwtExpiry {
    fn default() -> Self {
        Self::with_leeway(Duration::seconds(DEFAULT_EXPIRY_LEEWAY_SECS))
    }
}

impl JwtExpiry {
    /// Create a policy that refreshes `leeway` before the `exp` claim.
    pub fn with_leeway(leeway: Duration) -> Self {
        Self { leeway }
    }

    /// The `exp` claim of `token`, if it has one.
    pub fn expires_at(token: &str) -> Option<DateTime<Utc>> {
        let payload = token.split('.').nth(1)?;
        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .ok()?;
        let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
        let exp = claims.get("exp")?;
        let secs = exp.as_i64().or_else(|| exp.as_f64().map(|f| f as i64))?;
        DateTime::from_timestamp(secs, 0)
    }

    /// Expiry decision against an explicit clock.
    pub fn is_expired_at(&self, token: &str, now: DateTime<Utc>) -> bool {
        match Self::expires_at(token) {
            Some(expires_at) => expires_at - now < self.leeway,
            None => false,
        }
    }
}

impl ExpiryPolicy for JwtExpiry {
    fn is_expired(&self, session_credential: &str) -> bool {
        self.is_expired_at(session_credential, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt_with_claims(claims: serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        format!("{header}.{payload}.signature")
    }

    #[test]
    fn test_never_expires() {
        assert!(!NeverExpires.is_expired("anything"));
        assert!(!NeverExpires.is_expired(""));
    }

    #[test]
    fn test_expires_at_reads_exp_claim() {
        let token = jwt_with_claims(serde_json::json!({"exp": 1_700_000_000}));
        let expires_at = JwtExpiry::expires_at(&token).unwrap();
        assert_eq!(expires_at.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_expired_and_fresh_tokens() {
        let now = Utc::now();
        let policy = JwtExpiry::default();

        let exp_at = |at: chrono::DateTime<Utc>| {
            jwt_with_claims(serde_json::json!({ "exp": at.timestamp() }))
        };
        let past = exp_at(now - Duration::hours(1));
        let future = exp_at(now + Duration::hours(1));
        let almost = exp_at(now + Duration::seconds(30));

        assert!(policy.is_expired_at(&past, now));
        assert!(!policy.is_expired_at(&future, now));
        // Inside the 60s leeway
        assert!(policy.is_expired_at(&almost, now));
    }

    #[test]
    fn test_unreadable_tokens_are_not_expired() {
        let policy = JwtExpiry::default();
        let now = Utc::now();

        assert!(!policy.is_expired_at("opaque-session-token", now));
        assert!(!policy.is_expired_at("a.!!!not-base64!!!.c", now));
        assert!(!policy.is_expired_at(&jwt_with_claims(serde_json::json!({"sub": "x"})), now));
    }

    #[test]
    fn test_padded_payload_is_accepted() {
        let header = URL_SAFE_NO_PAD.encode(b"{}");
        let payload = base64::engine::general_purpose::URL_SAFE.encode(br#"{"exp":10}"#);
        let token = format!("{header}.{payload}.sig");
        assert!(payload.ends_with('='));
        assert_eq!(JwtExpiry::expires_at(&token).unwrap().timestamp(), 10);
    }
}
