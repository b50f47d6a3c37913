//! HS256 bearer tokens for the service.
//!
//! The service checks `aud` by exact string match, so callers pass the fully
//! formed audience URL (port already stripped). Custom claims are list-valued
//! and merged into the top level of the payload next to the registered ones.

use std::collections::BTreeMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::error::{Result, WpsError};

/// Tokens live for one hour unless the caller says otherwise.
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 3600;

/// Role/permission claims, e.g. `role -> ["webpubsub.joinLeaveGroup"]`.
pub type ClaimMap = BTreeMap<String, Vec<String>>;

const RESERVED_CLAIMS: [&str; 4] = ["aud", "exp", "iat", "sub"];

/// Access key from the connection string. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningKey(String);

impl SigningKey {
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        if key.is_empty() {
            return Err(WpsError::Configuration("signing key is empty".into()));
        }
        Ok(Self(key))
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(***)")
    }
}

/// Payload of a signed token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub aud: String,
    pub exp: u64,
    pub iat: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(flatten)]
    pub custom: ClaimMap,
}

/// Mints tokens with a fixed key. Cheap to clone, safe to share.
#[derive(Debug, Clone)]
pub struct TokenSigner {
    key: SigningKey,
}

impl TokenSigner {
    pub fn new(key: SigningKey) -> Self {
        Self { key }
    }

    /// Build from a raw key string; empty keys are a configuration error.
    pub fn from_key(key: &str) -> Result<Self> {
        Ok(Self::new(SigningKey::new(key)?))
    }

    /// Sign against the current wall clock.
    pub fn sign(
        &self,
        audience: &str,
        ttl_secs: u64,
        subject: Option<&str>,
        claims: &ClaimMap,
    ) -> Result<String> {
        self.sign_at(audience, ttl_secs, subject, claims, unix_now())
    }

    /// Sign with an explicit issue time (seconds since epoch).
    ///
    /// Output is a pure function of the inputs: HS256 is deterministic and the
    /// payload map is ordered.
    pub fn sign_at(
        &self,
        audience: &str,
        ttl_secs: u64,
        subject: Option<&str>,
        claims: &ClaimMap,
        now: u64,
    ) -> Result<String> {
        if let Some(name) = claims.keys().find(|k| RESERVED_CLAIMS.contains(&k.as_str())) {
            return Err(WpsError::Configuration(format!(
                "custom claim '{name}' collides with a registered claim"
            )));
        }

        let payload = TokenClaims {
            aud: audience.to_string(),
            exp: now.saturating_add(ttl_secs),
            iat: now,
            sub: subject.filter(|s| !s.is_empty()).map(str::to_string),
            custom: claims.clone(),
        };

        encode(
            &Header::default(),
            &payload,
            &EncodingKey::from_secret(self.key.as_bytes()),
        )
        .map_err(|e| WpsError::Internal(format!("token encode failed: {e}")))
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

    fn read(token: &str, key: &str, aud: &str) -> TokenClaims {
        let mut v = Validation::new(Algorithm::HS256);
        v.set_audience(&[aud]);
        v.validate_exp = false;
        v.required_spec_claims.clear();
        decode::<TokenClaims>(token, &DecodingKey::from_secret(key.as_bytes()), &v)
            .unwrap()
            .claims
    }

    #[test]
    fn empty_key_is_configuration_error() {
        let err = TokenSigner::from_key("").unwrap_err();
        assert_eq!(err.kind(), "CONFIGURATION");
    }

    #[test]
    fn deterministic_for_fixed_clock() {
        let s = TokenSigner::from_key("k1").unwrap();
        let mut claims = ClaimMap::new();
        claims.insert("role".into(), vec!["webpubsub.sendToGroup".into()]);

        let a = s.sign_at("https://x.example/client/hubs/chat", 60, Some("u1"), &claims, 1_000).unwrap();
        let b = s.sign_at("https://x.example/client/hubs/chat", 60, Some("u1"), &claims, 1_000).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn payload_recovers_inputs() {
        let s = TokenSigner::from_key("k1").unwrap();
        let mut claims = ClaimMap::new();
        claims.insert("role".into(), vec!["a".into(), "b".into()]);

        let aud = "https://x.example/client/hubs/chat";
        let token = s.sign_at(aud, 3600, Some("alice"), &claims, 1_700_000_000).unwrap();
        let c = read(&token, "k1", aud);

        assert_eq!(c.aud, aud);
        assert_eq!(c.sub.as_deref(), Some("alice"));
        assert_eq!(c.exp, 1_700_003_600);
        assert_eq!(c.custom, claims);
    }

    #[test]
    fn subject_omitted_when_absent() {
        let s = TokenSigner::from_key("k1").unwrap();
        let token = s.sign_at("aud", 10, None, &ClaimMap::new(), 5).unwrap();
        let c = read(&token, "k1", "aud");
        assert!(c.sub.is_none());
        assert!(c.custom.is_empty());
    }

    #[test]
    fn reserved_claim_rejected() {
        let s = TokenSigner::from_key("k1").unwrap();
        let mut claims = ClaimMap::new();
        claims.insert("aud".into(), vec!["evil".into()]);
        assert!(s.sign_at("aud", 10, None, &claims, 5).is_err());
    }

    #[test]
    fn key_is_not_printed() {
        let k = SigningKey::new("super-secret").unwrap();
        assert!(!format!("{k:?}").contains("super-secret"));
    }
}
