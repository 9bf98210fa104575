//! Bearer-token authentication.
//!
//! Access tokens are HS256-signed JWTs issued by `tubely-access` whose
//! subject is the user's UUID.

use axum::http::{HeaderMap, header};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

const ISSUER: &str = "tubely-access";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing authorization header")]
    MissingHeader,
    #[error("authorization header is not a bearer token")]
    MalformedHeader,
    #[error("invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
    #[error("token subject `{0}` is not a user id")]
    InvalidSubject(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iss: String,
    sub: String,
    iat: i64,
    exp: i64,
}

#[derive(Clone)]
pub struct JwtAuth {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtAuth {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Resolve the caller's user id from an `Authorization: Bearer` header.
    pub fn validate_bearer_token(&self, headers: &HeaderMap) -> Result<Uuid, AuthError> {
        let value = headers
            .get(header::AUTHORIZATION)
            .ok_or(AuthError::MissingHeader)?
            .to_str()
            .map_err(|_| AuthError::MalformedHeader)?;

        let token = value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MalformedHeader)?;

        self.validate_token(token)
    }

    pub fn validate_token(&self, token: &str) -> Result<Uuid, AuthError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[ISSUER]);

        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        Uuid::parse_str(&data.claims.sub).map_err(|_| AuthError::InvalidSubject(data.claims.sub))
    }

    /// Sign an access token for `user_id` valid for `ttl`.
    pub fn issue_token(
        &self,
        user_id: Uuid,
        ttl: Duration,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = Claims {
            iss: ISSUER.to_string(),
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[test]
    fn issued_token_validates() {
        let auth = JwtAuth::new("test-secret");
        let user = Uuid::new_v4();
        let token = auth.issue_token(user, Duration::hours(1)).unwrap();

        assert_eq!(auth.validate_bearer_token(&bearer(&token)).unwrap(), user);
    }

    #[test]
    fn missing_or_malformed_header_fails() {
        let auth = JwtAuth::new("test-secret");
        assert!(matches!(
            auth.validate_bearer_token(&HeaderMap::new()),
            Err(AuthError::MissingHeader)
        ));

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(matches!(
            auth.validate_bearer_token(&headers),
            Err(AuthError::MalformedHeader)
        ));
    }

    #[test]
    fn expired_token_fails() {
        let auth = JwtAuth::new("test-secret");
        // Well past the default 60-second leeway.
        let token = auth
            .issue_token(Uuid::new_v4(), Duration::minutes(-10))
            .unwrap();
        assert!(matches!(
            auth.validate_token(&token),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn token_from_other_secret_fails() {
        let token = JwtAuth::new("secret-alpha")
            .issue_token(Uuid::new_v4(), Duration::hours(1))
            .unwrap();
        assert!(JwtAuth::new("secret-bravo").validate_token(&token).is_err());
    }
}
