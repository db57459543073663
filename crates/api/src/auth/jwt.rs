//! Signed session tokens.
//!
//! Tokens are HS256-signed JWTs with the payload
//! `{ "iat": .., "exp": .., "data": { "userId": .. } }`. A token on its own
//! is not enough to authenticate: the session manager also requires a live
//! session row holding the identical string.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use locker_core::types::DbId;
use serde::{Deserialize, Serialize};

use crate::config::{env_or, ConfigError};

/// Default token and session lifetime in seconds.
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Longest accepted token lifetime: ten years.
pub const MAX_TOKEN_LIFETIME_SECS: i64 = 10 * 365 * 24 * 60 * 60;

/// Upper bound imposed by the `sessions.token` column.
pub const MAX_TOKEN_LEN: usize = 500;

/// Application data carried inside the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenData {
    #[serde(rename = "userId")]
    pub user_id: DbId,
}

/// JWT claims embedded in every token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Expiration time (UTC Unix timestamp). The token is valid strictly
    /// before this instant.
    pub exp: i64,
    pub data: TokenData,
}

/// Configuration for token signing and session lifetime.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC-SHA256 secret used to sign and verify tokens.
    pub secret: String,
    /// Lifetime of both the token and its session row, in seconds.
    pub token_lifetime_secs: i64,
}

impl JwtConfig {
    /// Load token configuration from environment variables.
    ///
    /// | Env Var                  | Required | Default |
    /// |--------------------------|----------|---------|
    /// | `JWT_SECRET`             | **yes**  | --      |
    /// | `TOKEN_LIFETIME_SECONDS` | no       | `3600`  |
    pub fn from_env() -> Result<Self, ConfigError> {
        let secret = std::env::var("JWT_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let token_lifetime_secs = check_lifetime(env_or(
            "TOKEN_LIFETIME_SECONDS",
            DEFAULT_TOKEN_LIFETIME_SECS,
        )?)?;

        Ok(Self {
            secret,
            token_lifetime_secs,
        })
    }
}

/// Accept lifetimes in `1..=MAX_TOKEN_LIFETIME_SECS`.
pub(crate) fn check_lifetime(secs: i64) -> Result<i64, ConfigError> {
    let reason = if secs <= 0 {
        "must be positive".to_string()
    } else if secs > MAX_TOKEN_LIFETIME_SECS {
        format!("must not exceed {MAX_TOKEN_LIFETIME_SECS}")
    } else {
        return Ok(secs);
    };
    Err(ConfigError::Invalid {
        var: "TOKEN_LIFETIME_SECONDS",
        value: secs.to_string(),
        reason,
    })
}

/// Why a token was refused. Callers treat every variant the same way.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Bad signature, malformed structure, or missing claims.
    #[error("Invalid token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),

    #[error("Token expired")]
    Expired,

    /// `now + lifetime` does not fit in a timestamp.
    #[error("Token lifetime of {0}s is out of range")]
    LifetimeOutOfRange(i64),
}

/// What a successfully verified token tells us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub user_id: DbId,
    pub exp: i64,
}

/// Issues and verifies tokens with a server-held secret.
///
/// Pure: the only inputs are the secret, the token, and the clock value.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenService {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the caller's clock in `verify_at`.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Issue a token for `user_id` valid for `lifetime_secs` from now.
    pub fn issue(&self, user_id: DbId, lifetime_secs: i64) -> Result<String, TokenError> {
        self.issue_at(user_id, lifetime_secs, chrono::Utc::now().timestamp())
    }

    /// Issue a token as if the current time were `now` (Unix seconds).
    pub fn issue_at(&self, user_id: DbId, lifetime_secs: i64, now: i64) -> Result<String, TokenError> {
        let exp = now
            .checked_add(lifetime_secs)
            .ok_or(TokenError::LifetimeOutOfRange(lifetime_secs))?;
        let claims = Claims {
            iat: now,
            exp,
            data: TokenData { user_id },
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    /// Verify signature, structure, and expiry against the current time.
    pub fn verify(&self, token: &str) -> Result<VerifiedToken, TokenError> {
        self.verify_at(token, chrono::Utc::now().timestamp())
    }

    /// Verify signature, structure, and expiry as of `now` (Unix seconds).
    ///
    /// Nothing is returned unless every check passes; a token is valid
    /// while `now < exp`.
    pub fn verify_at(&self, token: &str, now: i64) -> Result<VerifiedToken, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding, &self.validation)?.claims;
        if now >= claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(VerifiedToken {
            user_id: claims.data.user_id,
            exp: claims.exp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const T0: i64 = 1_700_000_000;

    fn service() -> TokenService {
        TokenService::new("test-secret-that-is-long-enough-for-hmac")
    }

    #[test]
    fn issued_token_round_trips_user_id() {
        let tokens = service();
        let token = tokens.issue_at(42, 60, T0).unwrap();

        let verified = tokens.verify_at(&token, T0).unwrap();
        assert_eq!(verified, VerifiedToken { user_id: 42, exp: T0 + 60 });
        assert!(token.len() <= MAX_TOKEN_LEN);
    }

    #[test]
    fn payload_nests_user_id_under_data() {
        let tokens = service();
        let token = tokens.issue_at(7, 60, T0).unwrap();

        let payload =
            decode::<serde_json::Value>(&token, &tokens.decoding, &tokens.validation).unwrap();
        assert_eq!(payload.claims["data"]["userId"], 7);
        assert_eq!(payload.claims["iat"], T0);
        assert_eq!(payload.claims["exp"], T0 + 60);
    }

    #[test]
    fn accepted_until_just_before_expiry() {
        let tokens = service();
        let token = tokens.issue_at(1, 30, T0).unwrap();

        for now in [T0, T0 + 1, T0 + 29] {
            assert!(tokens.verify_at(&token, now).is_ok(), "should accept at {now}");
        }
        assert_matches!(tokens.verify_at(&token, T0 + 30), Err(TokenError::Expired));
        assert_matches!(tokens.verify_at(&token, T0 + 3600), Err(TokenError::Expired));
    }

    #[test]
    fn different_secret_is_rejected() {
        let token = TokenService::new("secret-alpha").issue_at(1, 60, T0).unwrap();
        assert_matches!(
            TokenService::new("secret-bravo").verify_at(&token, T0),
            Err(TokenError::Invalid(_))
        );
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let tokens = service();
        let token = tokens.issue_at(1, 60, T0).unwrap();
        let other = tokens.issue_at(2, 60, T0).unwrap();

        let mut parts: Vec<&str> = token.split('.').collect();
        let forged_payload = other.split('.').nth(1).unwrap();
        parts[1] = forged_payload;
        let forged = parts.join(".");

        assert_matches!(tokens.verify_at(&forged, T0), Err(TokenError::Invalid(_)));
    }

    #[test]
    fn overflowing_lifetime_is_an_error() {
        assert_matches!(
            service().issue_at(1, i64::MAX, T0),
            Err(TokenError::LifetimeOutOfRange(i64::MAX))
        );
    }

    #[test]
    fn lifetime_bounds() {
        assert_eq!(check_lifetime(1).unwrap(), 1);
        assert_eq!(
            check_lifetime(MAX_TOKEN_LIFETIME_SECS).unwrap(),
            MAX_TOKEN_LIFETIME_SECS
        );
        assert_matches!(check_lifetime(0), Err(ConfigError::Invalid { .. }));
        assert_matches!(check_lifetime(-5), Err(ConfigError::Invalid { .. }));
        assert_matches!(
            check_lifetime(MAX_TOKEN_LIFETIME_SECS + 1),
            Err(ConfigError::Invalid { var: "TOKEN_LIFETIME_SECONDS", .. })
        );
        assert_matches!(check_lifetime(i64::MAX / 2), Err(ConfigError::Invalid { .. }));
    }

    #[test]
    fn garbage_is_rejected() {
        assert_matches!(
            service().verify_at("not-a-token", T0),
            Err(TokenError::Invalid(_))
        );
        assert_matches!(service().verify_at("", T0), Err(TokenError::Invalid(_)));
    }
}
