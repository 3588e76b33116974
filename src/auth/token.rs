//! HS256 identity tokens
//!
//! Tokens use the compact JWS layout `header.claims.signature`, each part base64url
//! without padding. Validity depends only on the signature and the expiry at
//! verification time; nothing is persisted.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::account::AccountId;
use crate::config::AuthConfig;

type HmacSha256 = Hmac<Sha256>;

const HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("invalid token")]
    InvalidToken,
    #[error("token expired")]
    Expired,
    #[error("signing key rejected")]
    SigningKey,
    #[error("token lifetime out of range")]
    Lifetime,
}

/// Identity claim carried by a token
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Deserialize)]
struct Header {
    alg: String,
}

/// Access and refresh tokens issued together at registration and login
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

fn mac(secret: &str) -> Result<HmacSha256, TokenError> {
    HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| TokenError::SigningKey)
}

/// Issue a token for `subject` valid for `validity_minutes` from now
pub fn issue(subject: AccountId, secret: &str, validity_minutes: i64) -> Result<String, TokenError> {
    issue_at(subject, secret, validity_minutes, Utc::now().timestamp())
}

fn issue_at(subject: AccountId, secret: &str, validity_minutes: i64, now: i64) -> Result<String, TokenError> {
    let exp = validity_minutes
        .checked_mul(60)
        .and_then(|secs| now.checked_add(secs))
        .ok_or(TokenError::Lifetime)?;
    let claims = Claims {
        sub: subject.to_string(),
        iat: now,
        exp,
    };
    let payload = serde_json::to_vec(&claims).map_err(|_| TokenError::InvalidToken)?;
    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(HEADER),
        URL_SAFE_NO_PAD.encode(payload)
    );

    let mut mac = mac(secret)?;
    mac.update(signing_input.as_bytes());
    let signature = mac.finalize().into_bytes();

    Ok(format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(signature)))
}

/// Check signature, algorithm and expiry, returning the claims
pub fn decode(token: &str, secret: &str) -> Result<Claims, TokenError> {
    decode_at(token, secret, Utc::now().timestamp())
}

fn decode_at(token: &str, secret: &str, now: i64) -> Result<Claims, TokenError> {
    let (signing_input, signature) = token.rsplit_once('.').ok_or(TokenError::InvalidToken)?;
    let (header, payload) = signing_input.split_once('.').ok_or(TokenError::InvalidToken)?;
    if payload.contains('.') {
        return Err(TokenError::InvalidToken);
    }

    let header: Header = URL_SAFE_NO_PAD
        .decode(header)
        .ok()
        .and_then(|raw| serde_json::from_slice(&raw).ok())
        .ok_or(TokenError::InvalidToken)?;
    if header.alg != "HS256" {
        return Err(TokenError::InvalidToken);
    }

    let signature = URL_SAFE_NO_PAD
        .decode(signature)
        .map_err(|_| TokenError::InvalidToken)?;
    let mut mac = mac(secret)?;
    mac.update(signing_input.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| TokenError::InvalidToken)?;

    let claims: Claims = URL_SAFE_NO_PAD
        .decode(payload)
        .ok()
        .and_then(|raw| serde_json::from_slice(&raw).ok())
        .ok_or(TokenError::InvalidToken)?;

    if claims.exp <= now {
        return Err(TokenError::Expired);
    }
    Ok(claims)
}

/// True only for a well-formed, correctly signed, unexpired token
pub fn verify(token: &str, secret: &str) -> bool {
    decode(token, secret).is_ok()
}

/// Account id carried by a valid token
pub fn extract_subject(token: &str, secret: &str) -> Result<AccountId, TokenError> {
    decode(token, secret)?
        .sub
        .parse()
        .map_err(|_| TokenError::InvalidToken)
}

/// Issues and checks tokens with the secrets and lifetimes fixed at startup
#[derive(Debug, Clone)]
pub struct TokenService {
    config: AuthConfig,
}

impl TokenService {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    pub fn issue_pair(&self, subject: AccountId) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access_token: issue(
                subject,
                &self.config.access_token_secret,
                self.config.access_token_expiry_minutes,
            )?,
            refresh_token: issue(
                subject,
                &self.config.refresh_token_secret,
                self.config.refresh_token_expiry_minutes,
            )?,
        })
    }

    pub fn verify_access(&self, token: &str) -> bool {
        verify(token, &self.config.access_token_secret)
    }

    pub fn access_subject(&self, token: &str) -> Result<AccountId, TokenError> {
        extract_subject(token, &self.config.access_token_secret)
    }
}
