//! Transaction signatures (RFC 8945) computed over raw message bytes.

use super::wire::{self, WireError, WireName, TYPE_TSIG};
use fakedns_domain::{TsigAlgorithm, TsigKeyConfig};
use ring::hmac;
use thiserror::Error;

/// Clock skew accepted on signed messages and written into signed replies.
pub const DEFAULT_FUDGE: u16 = 300;

const CLASS_ANY: u16 = 255;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TsigError {
    #[error("Unknown TSIG key: {0}")]
    UnknownKey(String),

    #[error("Key {key} does not use algorithm {algorithm}")]
    AlgorithmMismatch { key: String, algorithm: String },

    #[error("TSIG signature does not verify for key {0}")]
    BadSignature(String),

    #[error("TSIG time {signed} is outside {fudge}s of {now}")]
    BadTime { signed: u64, now: u64, fudge: u16 },

    #[error("Invalid TSIG key {name}: {reason}")]
    InvalidKey { name: String, reason: String },

    #[error("Message carries no TSIG record")]
    Unsigned,

    #[error("Malformed TSIG message: {0}")]
    Malformed(#[from] WireError),
}

fn ring_algorithm(algorithm: TsigAlgorithm) -> hmac::Algorithm {
    match algorithm {
        TsigAlgorithm::HmacSha256 => hmac::HMAC_SHA256,
        TsigAlgorithm::HmacSha384 => hmac::HMAC_SHA384,
        TsigAlgorithm::HmacSha512 => hmac::HMAC_SHA512,
    }
}

pub fn unix_now() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

/// A named shared secret.
pub struct TsigKey {
    name: WireName,
    algorithm: TsigAlgorithm,
    algorithm_name: WireName,
    key: hmac::Key,
}

impl TsigKey {
    pub fn new(name: &str, algorithm: TsigAlgorithm, secret: &[u8]) -> Result<Self, TsigError> {
        let invalid = |reason: String| TsigError::InvalidKey {
            name: name.to_string(),
            reason,
        };
        if secret.is_empty() {
            return Err(invalid("secret is empty".to_string()));
        }

        Ok(Self {
            name: WireName::parse(name)
                .map_err(|e| invalid(e.to_string()))?
                .to_lowercase(),
            algorithm,
            algorithm_name: WireName::parse(algorithm.as_str())?,
            key: hmac::Key::new(ring_algorithm(algorithm), secret),
        })
    }

    pub fn from_config(config: &TsigKeyConfig) -> Result<Self, TsigError> {
        let secret = config.decode_secret().map_err(|e| TsigError::InvalidKey {
            name: config.name.clone(),
            reason: e.to_string(),
        })?;
        Self::new(&config.name, config.algorithm, &secret)
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn algorithm(&self) -> TsigAlgorithm {
        self.algorithm
    }

    /// Signs an outgoing query. Returns the signed bytes and the MAC the
    /// reply will be verified against.
    pub fn sign_query(
        &self,
        message: &[u8],
        time_signed: u64,
    ) -> Result<(Vec<u8>, Vec<u8>), TsigError> {
        self.sign(message, None, time_signed)
    }

    pub fn sign_response(
        &self,
        reply: &[u8],
        request_mac: &[u8],
        time_signed: u64,
    ) -> Result<Vec<u8>, TsigError> {
        self.sign(reply, Some(request_mac), time_signed)
            .map(|(signed, _)| signed)
    }

    /// Checks a signed reply and returns it with the TSIG record removed.
    pub fn verify_response(
        &self,
        response: &[u8],
        request_mac: &[u8],
        now: u64,
    ) -> Result<Vec<u8>, TsigError> {
        let signed = SignedMessage::split(response)?.ok_or(TsigError::Unsigned)?;
        if !signed.tsig.key_name.eq_ignore_case(&self.name) {
            return Err(TsigError::UnknownKey(signed.tsig.key_name.as_str().to_string()));
        }
        self.verify(&signed, Some(request_mac), now)?;
        Ok(signed.unsigned)
    }

    fn sign(
        &self,
        message: &[u8],
        prior_mac: Option<&[u8]>,
        time_signed: u64,
    ) -> Result<(Vec<u8>, Vec<u8>), TsigError> {
        let original_id = wire::message_id(message)?;
        let fields = TsigFields {
            time_signed,
            fudge: DEFAULT_FUDGE,
            error: 0,
            other: &[],
        };

        let input = self.digest_input(prior_mac, message, &fields);
        let mac = hmac::sign(&self.key, &input).as_ref().to_vec();

        let mut signed = message.to_vec();
        let arcount = wire::arcount(&signed)?;
        wire::set_arcount(&mut signed, arcount.saturating_add(1))?;
        self.put_record(&mut signed, &fields, &mac, original_id);
        Ok((signed, mac))
    }

    fn verify(
        &self,
        signed: &SignedMessage,
        prior_mac: Option<&[u8]>,
        now: u64,
    ) -> Result<(), TsigError> {
        let tsig = &signed.tsig;
        let algorithm: Result<TsigAlgorithm, _> = tsig.algorithm.as_str().parse();
        if algorithm != Ok(self.algorithm) {
            return Err(TsigError::AlgorithmMismatch {
                key: self.name().to_string(),
                algorithm: tsig.algorithm.as_str().to_string(),
            });
        }

        let fields = TsigFields {
            time_signed: tsig.time_signed,
            fudge: tsig.fudge,
            error: tsig.error,
            other: &tsig.other,
        };
        let input = self.digest_input(prior_mac, &signed.unsigned, &fields);
        hmac::verify(&self.key, &input, &tsig.mac)
            .map_err(|_| TsigError::BadSignature(self.name().to_string()))?;

        if now.abs_diff(tsig.time_signed) > u64::from(tsig.fudge) {
            return Err(TsigError::BadTime {
                signed: tsig.time_signed,
                now,
                fudge: tsig.fudge,
            });
        }
        Ok(())
    }

    fn digest_input(&self, prior_mac: Option<&[u8]>, message: &[u8], fields: &TsigFields) -> Vec<u8> {
        let mut input = Vec::with_capacity(message.len() + 128);
        if let Some(mac) = prior_mac {
            wire::put_u16(&mut input, mac.len() as u16);
            input.extend_from_slice(mac);
        }
        input.extend_from_slice(message);

        input.extend_from_slice(self.name.as_bytes());
        wire::put_u16(&mut input, CLASS_ANY);
        wire::put_u32(&mut input, 0);
        input.extend_from_slice(self.algorithm_name.as_bytes());
        wire::put_u48(&mut input, fields.time_signed);
        wire::put_u16(&mut input, fields.fudge);
        wire::put_u16(&mut input, fields.error);
        wire::put_u16(&mut input, fields.other.len() as u16);
        input.extend_from_slice(fields.other);
        input
    }

    fn put_record(&self, out: &mut Vec<u8>, fields: &TsigFields, mac: &[u8], original_id: u16) {
        out.extend_from_slice(self.name.as_bytes());
        wire::put_u16(out, TYPE_TSIG);
        wire::put_u16(out, CLASS_ANY);
        wire::put_u32(out, 0);

        let rdata_len = self.algorithm_name.as_bytes().len() + 16 + mac.len() + fields.other.len();
        wire::put_u16(out, rdata_len as u16);
        out.extend_from_slice(self.algorithm_name.as_bytes());
        wire::put_u48(out, fields.time_signed);
        wire::put_u16(out, fields.fudge);
        wire::put_u16(out, mac.len() as u16);
        out.extend_from_slice(mac);
        wire::put_u16(out, original_id);
        wire::put_u16(out, fields.error);
        wire::put_u16(out, fields.other.len() as u16);
        out.extend_from_slice(fields.other);
    }
}

struct TsigFields<'a> {
    time_signed: u64,
    fudge: u16,
    error: u16,
    other: &'a [u8],
}

/// TSIG record found at the end of the additional section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsigRecord {
    pub key_name: WireName,
    pub algorithm: WireName,
    pub time_signed: u64,
    pub fudge: u16,
    pub mac: Vec<u8>,
    pub original_id: u16,
    pub error: u16,
    pub other: Vec<u8>,
}

/// A message split at its TSIG record.
#[derive(Debug, Clone)]
pub struct SignedMessage {
    /// Message as it was before signing: TSIG removed, ARCOUNT decremented,
    /// original ID restored.
    pub unsigned: Vec<u8>,
    pub tsig: TsigRecord,
}

impl SignedMessage {
    /// `None` when the last additional record is not a TSIG record.
    pub fn split(buf: &[u8]) -> Result<Option<Self>, WireError> {
        let Some(start) = wire::last_additional_offset(buf)? else {
            return Ok(None);
        };

        let (key_name, pos) = wire::read_name(buf, start)?;
        if wire::read_u16(buf, pos)? != TYPE_TSIG {
            return Ok(None);
        }

        let rdata = pos + 10;
        let (algorithm, pos) = wire::read_name(buf, rdata)?;
        let time_signed = wire::read_u48(buf, pos)?;
        let fudge = wire::read_u16(buf, pos + 6)?;
        let mac_len = wire::read_u16(buf, pos + 8)? as usize;
        let mac = buf
            .get(pos + 10..pos + 10 + mac_len)
            .ok_or(WireError::Truncated(pos + 10))?
            .to_vec();
        let pos = pos + 10 + mac_len;
        let original_id = wire::read_u16(buf, pos)?;
        let error = wire::read_u16(buf, pos + 2)?;
        let other_len = wire::read_u16(buf, pos + 4)? as usize;
        let other = buf
            .get(pos + 6..pos + 6 + other_len)
            .ok_or(WireError::Truncated(pos + 6))?
            .to_vec();

        let mut unsigned = buf[..start].to_vec();
        let arcount = wire::arcount(&unsigned)?;
        wire::set_arcount(&mut unsigned, arcount.saturating_sub(1))?;
        wire::set_u16(&mut unsigned, 0, original_id)?;

        Ok(Some(Self {
            unsigned,
            tsig: TsigRecord {
                key_name,
                algorithm,
                time_signed,
                fudge,
                mac,
                original_id,
                error,
                other,
            },
        }))
    }
}

/// Keys the server accepts signed queries with.
#[derive(Default)]
pub struct TsigKeyring {
    keys: Vec<TsigKey>,
}

impl TsigKeyring {
    pub fn new(keys: Vec<TsigKey>) -> Self {
        Self { keys }
    }

    pub fn from_configs(configs: &[TsigKeyConfig]) -> Result<Self, TsigError> {
        configs
            .iter()
            .map(TsigKey::from_config)
            .collect::<Result<Vec<_>, _>>()
            .map(Self::new)
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn find(&self, name: &WireName) -> Option<&TsigKey> {
        self.keys.iter().find(|key| key.name.eq_ignore_case(name))
    }

    /// Validates a signed request and returns the key its reply is signed with.
    pub fn verify_request(&self, signed: &SignedMessage, now: u64) -> Result<&TsigKey, TsigError> {
        let key = self
            .find(&signed.tsig.key_name)
            .ok_or_else(|| TsigError::UnknownKey(signed.tsig.key_name.as_str().to_string()))?;
        key.verify(signed, None, now)?;
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::wire::{put_u16, CLASS_IN};

    const NOW: u64 = 1_700_000_000;

    fn query() -> Vec<u8> {
        let mut buf = Vec::new();
        put_u16(&mut buf, 0x1234);
        put_u16(&mut buf, 0x0100);
        put_u16(&mut buf, 1);
        put_u16(&mut buf, 0);
        put_u16(&mut buf, 0);
        put_u16(&mut buf, 0);
        buf.extend_from_slice(WireName::parse("example.com.").unwrap().as_bytes());
        put_u16(&mut buf, 1);
        put_u16(&mut buf, CLASS_IN);
        buf
    }

    fn key(secret: &[u8]) -> TsigKey {
        TsigKey::new("transfer-key.", TsigAlgorithm::HmacSha256, secret).unwrap()
    }

    #[test]
    fn test_signed_query_verifies_with_same_key() {
        let (signed, mac) = key(b"secret").sign_query(&query(), NOW).unwrap();
        assert_eq!(mac.len(), TsigAlgorithm::HmacSha256.mac_len());
        assert_eq!(wire::arcount(&signed).unwrap(), 1);

        let split = SignedMessage::split(&signed).unwrap().unwrap();
        assert_eq!(split.unsigned, query());
        assert_eq!(split.tsig.mac, mac);
        assert_eq!(split.tsig.original_id, 0x1234);
        assert_eq!(split.tsig.fudge, DEFAULT_FUDGE);

        let keyring = TsigKeyring::new(vec![key(b"secret")]);
        let found = keyring.verify_request(&split, NOW + 10).unwrap();
        assert_eq!(found.name(), "transfer-key.");
    }

    #[test]
    fn test_wrong_secret_is_bad_signature() {
        let (signed, _) = key(b"secret").sign_query(&query(), NOW).unwrap();
        let split = SignedMessage::split(&signed).unwrap().unwrap();

        let keyring = TsigKeyring::new(vec![key(b"other")]);
        assert!(matches!(
            keyring.verify_request(&split, NOW),
            Err(TsigError::BadSignature(_))
        ));
    }

    #[test]
    fn test_unknown_key_name() {
        let other = TsigKey::new("other-key.", TsigAlgorithm::HmacSha256, b"secret").unwrap();
        let (signed, _) = other.sign_query(&query(), NOW).unwrap();
        let split = SignedMessage::split(&signed).unwrap().unwrap();

        let keyring = TsigKeyring::new(vec![key(b"secret")]);
        assert!(matches!(
            keyring.verify_request(&split, NOW),
            Err(TsigError::UnknownKey(_))
        ));
    }

    #[test]
    fn test_time_outside_fudge_is_rejected() {
        let (signed, _) = key(b"secret").sign_query(&query(), NOW).unwrap();
        let split = SignedMessage::split(&signed).unwrap().unwrap();

        let keyring = TsigKeyring::new(vec![key(b"secret")]);
        assert!(matches!(
            keyring.verify_request(&split, NOW + 301),
            Err(TsigError::BadTime { .. })
        ));
    }

    #[test]
    fn test_tampered_message_fails() {
        let (mut signed, _) = key(b"secret").sign_query(&query(), NOW).unwrap();
        signed[3] ^= 0x10;
        let split = SignedMessage::split(&signed).unwrap().unwrap();

        let keyring = TsigKeyring::new(vec![key(b"secret")]);
        assert!(keyring.verify_request(&split, NOW).is_err());
    }

    #[test]
    fn test_response_is_bound_to_request_mac() {
        let key = key(b"secret");
        let (_, request_mac) = key.sign_query(&query(), NOW).unwrap();
        let mut reply = query();
        reply[2] |= 0x80;

        let signed = key.sign_response(&reply, &request_mac, NOW).unwrap();
        assert_eq!(key.verify_response(&signed, &request_mac, NOW).unwrap(), reply);
        assert!(matches!(
            key.verify_response(&signed, &[0u8; 32], NOW),
            Err(TsigError::BadSignature(_))
        ));
    }

    #[test]
    fn test_unsigned_message_splits_to_none() {
        assert!(SignedMessage::split(&query()).unwrap().is_none());
        assert_eq!(
            key(b"secret").verify_response(&query(), &[], NOW),
            Err(TsigError::Unsigned)
        );
    }

    #[test]
    fn test_key_from_config_decodes_base64() {
        let config = TsigKeyConfig::new("k.", TsigAlgorithm::HmacSha512, "c2VjcmV0");
        let key = TsigKey::from_config(&config).unwrap();
        assert_eq!(key.algorithm(), TsigAlgorithm::HmacSha512);

        let padded = TsigKeyConfig::new("k.", TsigAlgorithm::HmacSha256, " c2VjcmV0\n");
        assert!(TsigKey::from_config(&padded).is_ok());

        let bad = TsigKeyConfig::new("k.", TsigAlgorithm::HmacSha256, "***");
        assert!(matches!(
            TsigKey::from_config(&bad),
            Err(TsigError::InvalidKey { .. })
        ));
    }
}
