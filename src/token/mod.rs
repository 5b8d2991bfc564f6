//! Sealed row tokens: AES-256-GCM encrypted claims in JWE compact form
//!
//! ```text
//! b64u(header) . "" . b64u(iv) . b64u(ciphertext) . b64u(tag)
//! ```
//!
//! The header is `{"alg":"dir","enc":"A256GCM","typ":"JWT"}` and its encoded
//! form is the additional authenticated data. The body is the record's
//! fields followed by `exp` and `iat` in whole seconds.

/// Token body
pub mod claims;
/// Token lifetimes
pub mod duration;
/// Protected header
pub mod header;

use std::fmt;

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::config::ConfigError;
use crate::models::RowRecord;

pub use claims::Claims;
pub use duration::TtlSpec;
pub use header::JoseHeader;

const IV_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Issuing and verification errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The lifetime string does not parse
    #[error("invalid duration {0:?}: expected <positive integer><s|m|h|d>")]
    InvalidDuration(String),
    /// The cipher refused to seal the claims
    #[error("token encryption failed")]
    EncryptionFailure,
    /// Wrong segment count, bad base64 or bad header
    #[error("malformed token: {0}")]
    MalformedToken(&'static str),
    /// Wrong key or altered token
    #[error("token verification failed")]
    VerificationFailed,
    /// Authentic but past `exp`
    #[error("token expired at {expired_at}")]
    ExpiredToken {
        /// The token's `exp`
        expired_at: DateTime<Utc>,
    },
    /// A record field uses `exp` or `iat`
    #[error("field {0:?} is a reserved claim name")]
    ReservedClaim(String),
}

/// 256-bit shared key
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey([u8; SecretKey::LEN]);

impl SecretKey {
    /// Key length in bytes
    pub const LEN: usize = 32;

    /// Wrap raw key bytes
    pub fn from_bytes(bytes: [u8; Self::LEN]) -> Self {
        Self(bytes)
    }

    /// Exactly [`SecretKey::LEN`] bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ConfigError> {
        let bytes: [u8; Self::LEN] = bytes
            .try_into()
            .map_err(|_| ConfigError::InvalidSecret(format!("expected 32 bytes, got {}", bytes.len())))?;
        Ok(Self(bytes))
    }

    /// Standard (padded) base64 encoding of exactly 32 bytes
    pub fn from_base64(encoded: &str) -> Result<Self, ConfigError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| ConfigError::InvalidSecret(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    /// Raw key bytes
    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(..)")
    }
}

/// Issues and verifies tokens under one shared key
#[derive(Clone)]
pub struct TokenCodec {
    cipher: Aes256Gcm,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// Codec sealing with `key`
    pub fn new(key: SecretKey) -> Self {
        let key = Key::<Aes256Gcm>::from_slice(key.as_bytes());
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    /// Seal `record` valid for `ttl` from now
    pub fn issue(&self, record: &RowRecord, ttl: TtlSpec) -> Result<String, TokenError> {
        self.issue_at(record, ttl, Utc::now())
    }

    /// Seal `record` with `iat = now` and `exp = now + ttl`
    pub fn issue_at(
        &self,
        record: &RowRecord,
        ttl: TtlSpec,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        if let Some(reserved) = claims::RESERVED.iter().find(|name| record.contains(name)) {
            return Err(TokenError::ReservedClaim((*reserved).to_string()));
        }

        let issued_at = now.timestamp();
        let expires_at = issued_at
            .checked_add(ttl.as_secs())
            .ok_or_else(|| TokenError::InvalidDuration(ttl.to_string()))?;
        let claims = Claims::new(record.clone(), issued_at, expires_at);

        let body = serde_json::to_vec(&claims).map_err(|_| TokenError::EncryptionFailure)?;
        let header = serde_json::to_vec(&JoseHeader::direct_a256gcm())
            .map_err(|_| TokenError::EncryptionFailure)?;
        let protected = URL_SAFE_NO_PAD.encode(header);

        let iv = Aes256Gcm::generate_nonce(&mut OsRng);
        let mut sealed = self
            .cipher
            .encrypt(
                &iv,
                Payload {
                    msg: &body,
                    aad: protected.as_bytes(),
                },
            )
            .map_err(|_| TokenError::EncryptionFailure)?;
        let tag = sealed.split_off(sealed.len() - TAG_LEN);

        Ok(format!(
            "{protected}..{}.{}.{}",
            URL_SAFE_NO_PAD.encode(iv),
            URL_SAFE_NO_PAD.encode(&sealed),
            URL_SAFE_NO_PAD.encode(tag),
        ))
    }

    /// Open and check a token against the current time
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Open and check a token; `exp == now` is still valid
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let segments: Vec<&str> = token.trim().split('.').collect();
        let &[protected, encrypted_key, iv, ciphertext, tag] = segments.as_slice() else {
            return Err(TokenError::MalformedToken("expected five segments"));
        };
        if !encrypted_key.is_empty() {
            return Err(TokenError::MalformedToken("encrypted key must be empty"));
        }

        let decode = |segment: &str| {
            URL_SAFE_NO_PAD
                .decode(segment)
                .map_err(|_| TokenError::MalformedToken("invalid base64url"))
        };
        let header: JoseHeader = serde_json::from_slice(&decode(protected)?)
            .map_err(|_| TokenError::MalformedToken("invalid header"))?;
        if !header.is_supported() {
            return Err(TokenError::MalformedToken("unsupported alg or enc"));
        }

        let iv = decode(iv)?;
        if iv.len() != IV_LEN {
            return Err(TokenError::MalformedToken("iv must be 96 bits"));
        }
        let tag = decode(tag)?;
        if tag.len() != TAG_LEN {
            return Err(TokenError::MalformedToken("tag must be 128 bits"));
        }
        let mut sealed = decode(ciphertext)?;
        sealed.extend_from_slice(&tag);

        let body = self
            .cipher
            .decrypt(
                Nonce::from_slice(&iv),
                Payload {
                    msg: &sealed,
                    aad: protected.as_bytes(),
                },
            )
            .map_err(|_| {
                tracing::debug!("token authentication failed");
                TokenError::VerificationFailed
            })?;

        let claims = Claims::from_json(&body)?;
        if claims.exp() < now.timestamp() {
            let expired_at = claims
                .expires_at()
                .ok_or(TokenError::MalformedToken("exp out of range"))?;
            return Err(TokenError::ExpiredToken { expired_at });
        }
        Ok(claims)
    }
}
