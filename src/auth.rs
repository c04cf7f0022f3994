// src/auth.rs
use crate::error::ApiError;
use crate::models::User;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use warp::{Filter, Rejection};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub iat: usize,
    pub exp: usize,
}

/// Signing secret plus the knobs that control issued tokens and password hashes.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    secret: String,
    token_ttl: Duration,
    bcrypt_cost: u32,
}

impl AuthConfig {
    pub fn new(secret: impl Into<String>, token_ttl_hours: i64, bcrypt_cost: u32) -> Self {
        AuthConfig {
            secret: secret.into(),
            token_ttl: Duration::hours(token_ttl_hours),
            bcrypt_cost,
        }
    }

    pub fn create_token(&self, user: &User) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            iat: now.timestamp() as usize,
            exp: (now + self.token_ttl).timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?;
        Ok(token)
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(data.claims)
    }

    pub fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        Ok(bcrypt::hash(password, self.bcrypt_cost)?)
    }

    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        Ok(bcrypt::verify(password, hash)?)
    }
}

fn bearer_token(header: &str) -> Option<&str> {
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Resolves the `Authorization: Bearer` header to the caller's user id.
pub fn with_auth(
    auth: Arc<AuthConfig>,
) -> impl Filter<Extract = (String,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let auth = auth.clone();
        async move {
            let header = header.ok_or_else(|| warp::reject::custom(ApiError::unauthorized()))?;
            let token =
                bearer_token(&header).ok_or_else(|| warp::reject::custom(ApiError::unauthorized()))?;
            match auth.verify_token(token) {
                Ok(claims) => Ok(claims.sub),
                Err(e) => {
                    debug!("Rejected bearer token: {}", e);
                    Err(warp::reject::custom(ApiError::unauthorized()))
                }
            }
        }
    })
}
