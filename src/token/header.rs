use serde::{Deserialize, Serialize};

/// Key management: the shared key is the content key
pub const ALG_DIRECT: &str = "dir";
/// Content encryption: AES-256-GCM
pub const ENC_A256GCM: &str = "A256GCM";
/// Media type
pub const TYP_JWT: &str = "JWT";

/// Protected JWE header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoseHeader {
    /// Key management algorithm
    pub alg: String,
    /// Content encryption algorithm
    pub enc: String,
    /// Usually `JWT`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
}

impl JoseHeader {
    /// `{"alg":"dir","enc":"A256GCM","typ":"JWT"}`
    pub fn direct_a256gcm() -> Self {
        Self {
            alg: ALG_DIRECT.to_string(),
            enc: ENC_A256GCM.to_string(),
            typ: Some(TYP_JWT.to_string()),
        }
    }

    /// Only `dir` with `A256GCM` is accepted
    pub fn is_supported(&self) -> bool {
        self.alg == ALG_DIRECT && self.enc == ENC_A256GCM
    }
}
