//! HS256 JSON Web Tokens.
//!
//! # Design Decisions
//! - One algorithm only; tokens signed with anything else are rejected
//! - `exp` is checked when present but not required
//! - Tokens travel as `Authorization: jwt <token>`

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::context::RequestContext;
use crate::error::RespError;

pub const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

/// Authorization scheme expected in front of the token.
pub const AUTHORIZATION_SCHEME: &str = "jwt";

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("{0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

/// Sign `claims` with `secret`.
pub fn sign<T: Serialize>(claims: &T, secret: &str) -> Result<String, JwtError> {
    let token = encode(
        &Header::new(JWT_ALGORITHM),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

/// Verify `token` against `secret` and decode its claims.
pub fn verify<T: DeserializeOwned>(token: &str, secret: &str) -> Result<T, JwtError> {
    let mut validation = Validation::new(JWT_ALGORITHM);
    validation.required_spec_claims.clear();
    let data = decode::<T>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)?;
    Ok(data.claims)
}

/// Require a valid token in the request's `Authorization` header.
///
/// Every failure is a `BadRequest`. Returns the decoded claims.
pub fn assert_valid_jwt(ctx: &RequestContext, secret: &str) -> Result<serde_json::Value, RespError> {
    let Some(header) = ctx.header("authorization")? else {
        return Err(RespError::bad_request("missing authorization header"));
    };

    let (scheme, token) = header.split_once(' ').unwrap_or((&*header, ""));
    if scheme != AUTHORIZATION_SCHEME {
        return Err(RespError::bad_request("invalid authorization type"));
    }

    verify(token, secret).map_err(|e| RespError::bad_request(format!("invalid jwt: {}", e)).with_source(e))
}
