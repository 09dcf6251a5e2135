use jsonwebtoken::{Algorithm, Header};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::auth::error::TokenError;
use crate::auth::key_material::KeyMaterial;
use crate::utils::constants::ASSERTION_LIFETIME_SECS;
use crate::utils::time::now_i64;

/// A signed bearer assertion for the client-credentials grant. Created per
/// exchange attempt, consumed immediately, never persisted.
#[derive(Debug, Clone)]
pub struct SignedAssertion {
    pub encoded: String,
    pub issued_at: i64,
    pub expires_at: i64,
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    sub: &'a str,
    aud: &'a str,
    jti: String,
    exp: i64,
}

/// Build and sign the JWT the token endpoint expects: iss = sub = client id,
/// aud = token endpoint URL, a fresh jti per call (replay protection),
/// exp = now + 300s, RS384.
pub fn sign(key_material: &KeyMaterial, audience: &str) -> Result<SignedAssertion, TokenError> {
    let issued_at = now_i64();
    let expires_at = issued_at + ASSERTION_LIFETIME_SECS;

    let claims = AssertionClaims {
        iss: &key_material.client_id,
        sub: &key_material.client_id,
        aud: audience,
        jti: Uuid::new_v4().to_string(),
        exp: expires_at,
    };
    debug!("signing client assertion for audience {}", audience);

    let encoded = jsonwebtoken::encode(
        &Header::new(Algorithm::RS384),
        &claims,
        key_material.encoding_key(),
    )?;

    Ok(SignedAssertion {
        encoded,
        issued_at,
        expires_at,
    })
}
