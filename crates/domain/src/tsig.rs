use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// HMAC algorithms accepted for transaction signatures (RFC 8945 §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
pub enum TsigAlgorithm {
    #[serde(rename = "hmac-sha256")]
    #[default]
    HmacSha256,
    #[serde(rename = "hmac-sha384")]
    HmacSha384,
    #[serde(rename = "hmac-sha512")]
    HmacSha512,
}

impl TsigAlgorithm {
    /// Algorithm name as it appears on the wire, without the root label.
    pub fn as_str(&self) -> &'static str {
        match self {
            TsigAlgorithm::HmacSha256 => "hmac-sha256",
            TsigAlgorithm::HmacSha384 => "hmac-sha384",
            TsigAlgorithm::HmacSha512 => "hmac-sha512",
        }
    }

    pub fn mac_len(&self) -> usize {
        match self {
            TsigAlgorithm::HmacSha256 => 32,
            TsigAlgorithm::HmacSha384 => 48,
            TsigAlgorithm::HmacSha512 => 64,
        }
    }
}

impl fmt::Display for TsigAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TsigAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_end_matches('.').to_lowercase().as_str() {
            "hmac-sha256" => Ok(TsigAlgorithm::HmacSha256),
            "hmac-sha384" => Ok(TsigAlgorithm::HmacSha384),
            "hmac-sha512" => Ok(TsigAlgorithm::HmacSha512),
            _ => Err(format!("Unsupported TSIG algorithm: {}", s)),
        }
    }
}

/// Shared secret the server accepts signed queries with.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TsigKeyConfig {
    /// Key name, e.g. `"transfer-key."`
    pub name: String,

    #[serde(default)]
    pub algorithm: TsigAlgorithm,

    /// Base64-encoded secret.
    pub secret: String,
}

impl TsigKeyConfig {
    pub fn new(name: impl Into<String>, algorithm: TsigAlgorithm, secret: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            algorithm,
            secret: secret.into(),
        }
    }

    /// Raw secret bytes. Whitespace around the base64 text is ignored.
    pub fn decode_secret(&self) -> Result<Vec<u8>, base64::DecodeError> {
        BASE64.decode(self.secret.trim())
    }
}
