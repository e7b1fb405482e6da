//! Access-token signing/verification and opaque token generation.
//!
//! Access claims are signed with a single pinned HMAC family (HS256); a token
//! declaring any other algorithm fails verification even when otherwise
//! well-formed. Opaque tokens (MFA, refresh, password reset) are 32 random
//! bytes from the OS RNG, never derived from time or counters.

use anyhow::{Context, Result};
use base64::Engine;
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use rand::{rngs::OsRng, RngCore};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token signing failed: {0}")]
    Signing(String),

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token expired")]
    Expired,

    #[error("malformed token")]
    Malformed,
}

/// Signed claim carried by every access token.
///
/// Validity is cryptographic plus a mandatory session-existence check:
/// deleting the session revokes all access tokens that reference `sid`.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccessClaim {
    pub sub: Uuid,
    pub sid: String,
    pub exp: i64,
}

/// Sign an access claim for `(user, session)` expiring after `ttl`.
pub fn issue_access_token(
    user_id: Uuid,
    session_id: &str,
    ttl: Duration,
    secret: &SecretString,
) -> Result<String, TokenError> {
    if secret.expose_secret().is_empty() {
        return Err(TokenError::Signing("signing secret is empty".to_string()));
    }

    let claim = AccessClaim {
        sub: user_id,
        sid: session_id.to_string(),
        exp: (Utc::now() + ttl).timestamp(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claim,
        &EncodingKey::from_secret(secret.expose_secret().as_bytes()),
    )
    .map_err(|err| TokenError::Signing(err.to_string()))
}

/// Verify a signed access token and return its claim.
pub fn verify_access_token(token: &str, secret: &SecretString) -> Result<AccessClaim, TokenError> {
    // Pinning the algorithm here is what rejects downgrade attempts.
    let validation = Validation::new(Algorithm::HS256);

    decode::<AccessClaim>(
        token,
        &DecodingKey::from_secret(secret.expose_secret().as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|err| match err.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenError::InvalidSignature,
        _ => TokenError::Malformed,
    })
}

/// Generate an opaque token with 256 bits of OS-provided entropy.
///
/// The raw value goes to the client; stores persist only a digest of it.
pub fn opaque_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate opaque token")?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret() -> SecretString {
        SecretString::from("unit-test-secret".to_string())
    }

    #[test]
    fn issue_and_verify_round_trip() {
        let user_id = Uuid::new_v4();
        let token =
            issue_access_token(user_id, "session-1", Duration::hours(1), &secret()).expect("issue");

        let claim = verify_access_token(&token, &secret()).expect("verify");
        assert_eq!(claim.sub, user_id);
        assert_eq!(claim.sid, "session-1");
        assert!(claim.exp > Utc::now().timestamp());
    }

    #[test]
    fn empty_secret_fails_signing() {
        let result = issue_access_token(
            Uuid::new_v4(),
            "session-1",
            Duration::hours(1),
            &SecretString::from(String::new()),
        );
        assert!(matches!(result, Err(TokenError::Signing(_))));
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = issue_access_token(
            Uuid::new_v4(),
            "session-1",
            Duration::seconds(-120),
            &secret(),
        )
        .expect("issue");

        let result = verify_access_token(&token, &secret());
        assert!(matches!(result, Err(TokenError::Expired)));
    }

    #[test]
    fn wrong_secret_is_an_invalid_signature() {
        let token = issue_access_token(Uuid::new_v4(), "session-1", Duration::hours(1), &secret())
            .expect("issue");

        let result =
            verify_access_token(&token, &SecretString::from("another-secret".to_string()));
        assert!(matches!(result, Err(TokenError::InvalidSignature)));
    }

    #[test]
    fn declared_algorithm_must_match() {
        // Same key, different HMAC family: the verifier must refuse it.
        let claim = AccessClaim {
            sub: Uuid::new_v4(),
            sid: "session-1".to_string(),
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS384),
            &claim,
            &EncodingKey::from_secret(secret().expose_secret().as_bytes()),
        )
        .expect("encode");

        assert!(verify_access_token(&token, &secret()).is_err());
    }

    #[test]
    fn garbage_is_malformed() {
        let result = verify_access_token("not-a-jwt", &secret());
        assert!(matches!(result, Err(TokenError::Malformed)));
    }

    #[test]
    fn opaque_tokens_are_unique_and_long_enough() {
        let first = opaque_token().expect("token");
        let second = opaque_token().expect("token");
        assert_ne!(first, second);

        let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(first.as_bytes())
            .expect("decode");
        assert_eq!(decoded.len(), 32);
    }
}
