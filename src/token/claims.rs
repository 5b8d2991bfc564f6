use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

use super::TokenError;
use crate::models::RowRecord;

/// Expiry claim name
pub const EXP: &str = "exp";
/// Issued-at claim name
pub const IAT: &str = "iat";

/// Claim names a record may not use
pub const RESERVED: [&str; 2] = [EXP, IAT];

/// Decrypted token body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    fields: RowRecord,
    issued_at: i64,
    expires_at: i64,
}

impl Claims {
    pub(crate) fn new(fields: RowRecord, issued_at: i64, expires_at: i64) -> Self {
        Self {
            fields,
            issued_at,
            expires_at,
        }
    }

    /// User fields only, in issue order
    pub fn fields(&self) -> &RowRecord {
        &self.fields
    }

    /// Take the user fields
    pub fn into_fields(self) -> RowRecord {
        self.fields
    }

    /// `iat` in seconds since the epoch
    pub fn iat(&self) -> i64 {
        self.issued_at
    }

    /// `exp` in seconds since the epoch
    pub fn exp(&self) -> i64 {
        self.expires_at
    }

    /// `iat` as a timestamp
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.issued_at, 0)
    }

    /// `exp` as a timestamp
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.expires_at, 0)
    }

    /// Parse a decrypted body. Non-string field values are kept as their JSON text.
    pub(crate) fn from_json(body: &[u8]) -> Result<Self, TokenError> {
        let object: IndexMap<String, Value> = serde_json::from_slice(body)
            .map_err(|_| TokenError::MalformedToken("body is not a JSON object"))?;

        let numeric = |name: &str| -> Result<i64, TokenError> {
            let value = object
                .get(name)
                .ok_or(TokenError::MalformedToken("missing exp or iat claim"))?;
            value
                .as_i64()
                .or_else(|| value.as_f64().map(|f| f.floor() as i64))
                .ok_or(TokenError::MalformedToken("exp and iat must be numeric"))
        };
        let expires_at = numeric(EXP)?;
        let issued_at = numeric(IAT)?;

        let fields = object
            .into_iter()
            .filter(|(name, _)| !RESERVED.contains(&name.as_str()))
            .map(|(name, value)| match value {
                Value::String(text) => (name, text),
                other => (name, other.to_string()),
            })
            .collect();

        Ok(Self::new(fields, issued_at, expires_at))
    }
}

/// Body layout: user fields in order, then `exp`, then `iat`
impl Serialize for Claims {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 2))?;
        for (name, value) in self.fields.iter() {
            map.serialize_entry(name, value)?;
        }
        map.serialize_entry(EXP, &self.expires_at)?;
        map.serialize_entry(IAT, &self.issued_at)?;
        map.end()
    }
}
