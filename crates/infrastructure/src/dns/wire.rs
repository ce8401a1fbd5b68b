//! Byte-level DNS message handling for the responder.
//!
//! Inbound queries are parsed straight from the receive buffer and replies are
//! written without name compression: every owner and target name is emitted
//! as its full label sequence.

use fakedns_domain::{RecordData, ResourceRecord};
use thiserror::Error;

pub const HEADER_LEN: usize = 12;
pub const CLASS_IN: u16 = 1;
pub const TYPE_TSIG: u16 = 250;

const MAX_NAME_LEN: usize = 255;
const MAX_LABEL_LEN: usize = 63;
const MAX_CHARACTER_STRING: usize = 255;
const MAX_POINTER_HOPS: usize = 16;

const FLAG_QR: u16 = 0x8000;
const OPCODE_MASK: u16 = 0x7800;
const FLAG_TC: u16 = 0x0200;
const FLAG_RD: u16 = 0x0100;
const FLAG_CD: u16 = 0x0010;
const RCODE_MASK: u16 = 0x000F;

const ARCOUNT_OFFSET: usize = 10;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("Message truncated at offset {0}")]
    Truncated(usize),

    #[error("Message is a response, not a query")]
    NotAQuery,

    #[error("Invalid domain name: {0}")]
    InvalidName(String),

    #[error("Compression pointer loop at offset {0}")]
    PointerLoop(usize),

    #[error("Message too large: {0} bytes")]
    TooLarge(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Rcode {
    NoError = 0,
    FormErr = 1,
    ServFail = 2,
    NxDomain = 3,
    NotImp = 4,
    Refused = 5,
}

impl Rcode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rcode::NoError => "NOERROR",
            Rcode::FormErr => "FORMERR",
            Rcode::ServFail => "SERVFAIL",
            Rcode::NxDomain => "NXDOMAIN",
            Rcode::NotImp => "NOTIMP",
            Rcode::Refused => "REFUSED",
        }
    }
}

/// A domain name held both as uncompressed wire labels and in presentation form.
///
/// The presentation form always ends with the root dot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireName {
    wire: Vec<u8>,
    text: String,
}

impl WireName {
    pub fn root() -> Self {
        Self {
            wire: vec![0],
            text: ".".to_string(),
        }
    }

    /// Parses a dotted name. The trailing root dot is optional.
    pub fn parse(name: &str) -> Result<Self, WireError> {
        let trimmed = name.strip_suffix('.').unwrap_or(name);
        if trimmed.is_empty() {
            return Ok(Self::root());
        }

        let mut wire = Vec::with_capacity(trimmed.len() + 2);
        for label in trimmed.split('.') {
            if label.is_empty() || label.len() > MAX_LABEL_LEN {
                return Err(WireError::InvalidName(name.to_string()));
            }
            wire.push(label.len() as u8);
            wire.extend_from_slice(label.as_bytes());
        }
        wire.push(0);

        if wire.len() > MAX_NAME_LEN {
            return Err(WireError::InvalidName(name.to_string()));
        }

        Ok(Self {
            wire,
            text: format!("{}.", trimmed),
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.wire
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Canonical form: ASCII letters lowered in every label.
    pub fn to_lowercase(&self) -> Self {
        Self {
            wire: self.wire.to_ascii_lowercase(),
            text: self.text.to_ascii_lowercase(),
        }
    }

    /// DNS name equality, ignoring ASCII case.
    pub fn eq_ignore_case(&self, other: &WireName) -> bool {
        self.wire.eq_ignore_ascii_case(&other.wire)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub name: WireName,
    pub qtype: u16,
    pub qclass: u16,
}

/// Header and first question of an inbound query.
#[derive(Debug, Clone)]
pub struct QueryMessage {
    pub id: u16,
    pub flags: u16,
    pub question: Option<Question>,
}

impl QueryMessage {
    pub fn parse(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() < HEADER_LEN {
            return Err(WireError::Truncated(buf.len()));
        }

        let id = read_u16(buf, 0)?;
        let flags = read_u16(buf, 2)?;
        if flags & FLAG_QR != 0 {
            return Err(WireError::NotAQuery);
        }

        let qdcount = read_u16(buf, 4)?;
        let question = if qdcount == 0 {
            None
        } else {
            let (name, pos) = read_name(buf, HEADER_LEN)?;
            Some(Question {
                name,
                qtype: read_u16(buf, pos)?,
                qclass: read_u16(buf, pos + 2)?,
            })
        };

        Ok(Self {
            id,
            flags,
            question,
        })
    }

    pub fn opcode(&self) -> u8 {
        ((self.flags & OPCODE_MASK) >> 11) as u8
    }

    pub fn recursion_desired(&self) -> bool {
        self.flags & FLAG_RD != 0
    }

    pub fn checking_disabled(&self) -> bool {
        self.flags & FLAG_CD != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyHeader {
    pub id: u16,
    pub flags: u16,
}

impl ReplyHeader {
    /// Reply correlated to `query`: same ID, opcode, RD and CD bits; NOERROR.
    pub fn for_query(query: &QueryMessage) -> Self {
        Self {
            id: query.id,
            flags: FLAG_QR | (query.flags & (OPCODE_MASK | FLAG_RD | FLAG_CD)),
        }
    }

    pub fn with_rcode(mut self, rcode: Rcode) -> Self {
        self.flags = (self.flags & !RCODE_MASK) | rcode as u16;
        self
    }

    pub fn with_truncated(mut self, truncated: bool) -> Self {
        if truncated {
            self.flags |= FLAG_TC;
        } else {
            self.flags &= !FLAG_TC;
        }
        self
    }

    pub fn truncated(&self) -> bool {
        self.flags & FLAG_TC != 0
    }
}

/// Serializes a reply with the question echoed and `answers` in order.
pub fn encode_reply(
    header: ReplyHeader,
    question: Option<&Question>,
    answers: &[ResourceRecord],
) -> Result<Vec<u8>, WireError> {
    let ancount =
        u16::try_from(answers.len()).map_err(|_| WireError::TooLarge(answers.len()))?;

    let mut out = Vec::with_capacity(512);
    put_u16(&mut out, header.id);
    put_u16(&mut out, header.flags);
    put_u16(&mut out, u16::from(question.is_some()));
    put_u16(&mut out, ancount);
    put_u16(&mut out, 0);
    put_u16(&mut out, 0);

    if let Some(question) = question {
        out.extend_from_slice(question.name.as_bytes());
        put_u16(&mut out, question.qtype);
        put_u16(&mut out, question.qclass);
    }

    for record in answers {
        encode_record(record, &mut out)?;
    }

    if out.len() > u16::MAX as usize {
        return Err(WireError::TooLarge(out.len()));
    }
    Ok(out)
}

pub fn encode_record(record: &ResourceRecord, out: &mut Vec<u8>) -> Result<(), WireError> {
    let owner = WireName::parse(&record.name)?;
    out.extend_from_slice(owner.as_bytes());
    put_u16(out, record.record_type().to_u16());
    put_u16(out, CLASS_IN);
    put_u32(out, record.ttl);

    let rdlength_at = out.len();
    put_u16(out, 0);

    match &record.data {
        RecordData::A { address } => out.extend_from_slice(&address.octets()),
        RecordData::AAAA { address } => out.extend_from_slice(&address.octets()),
        RecordData::NS { nameserver } => put_name(out, nameserver)?,
        RecordData::CNAME { target } => put_name(out, target)?,
        RecordData::TXT { values } => {
            if values.is_empty() {
                out.push(0);
            }
            for value in values {
                put_character_strings(out, value.as_bytes());
            }
        }
        RecordData::MX {
            preference,
            exchange,
        } => {
            put_u16(out, *preference);
            put_name(out, exchange)?;
        }
        RecordData::SRV {
            priority,
            weight,
            port,
            target,
        } => {
            put_u16(out, *priority);
            put_u16(out, *weight);
            put_u16(out, *port);
            put_name(out, target)?;
        }
    }

    let rdlength = out.len() - rdlength_at - 2;
    let rdlength = u16::try_from(rdlength).map_err(|_| WireError::TooLarge(rdlength))?;
    out[rdlength_at..rdlength_at + 2].copy_from_slice(&rdlength.to_be_bytes());
    Ok(())
}

/// Reads a possibly compressed name starting at `pos`.
///
/// Returns the expanded name and the offset right after the name in the
/// original byte stream.
pub fn read_name(buf: &[u8], start: usize) -> Result<(WireName, usize), WireError> {
    let mut wire = Vec::new();
    let mut text = String::new();
    let mut resume_at = None;
    let mut hops = 0;
    let mut pos = start;

    loop {
        let len = *buf.get(pos).ok_or(WireError::Truncated(pos))? as usize;
        match len & 0xC0 {
            0x00 if len == 0 => {
                wire.push(0);
                if text.is_empty() {
                    text.push('.');
                }
                let end = resume_at.unwrap_or(pos + 1);
                return Ok((WireName { wire, text }, end));
            }
            0x00 => {
                let label = buf
                    .get(pos + 1..pos + 1 + len)
                    .ok_or(WireError::Truncated(pos))?;
                wire.push(len as u8);
                wire.extend_from_slice(label);
                if wire.len() >= MAX_NAME_LEN {
                    return Err(WireError::InvalidName(format!(
                        "name at offset {} exceeds {} bytes",
                        start, MAX_NAME_LEN
                    )));
                }
                text.push_str(&String::from_utf8_lossy(label));
                text.push('.');
                pos += 1 + len;
            }
            0xC0 => {
                let low = *buf.get(pos + 1).ok_or(WireError::Truncated(pos))? as usize;
                if resume_at.is_none() {
                    resume_at = Some(pos + 2);
                }
                hops += 1;
                if hops > MAX_POINTER_HOPS {
                    return Err(WireError::PointerLoop(pos));
                }
                pos = ((len & 0x3F) << 8) | low;
            }
            _ => {
                return Err(WireError::InvalidName(format!(
                    "unsupported label type at offset {}",
                    pos
                )))
            }
        }
    }
}

pub fn skip_name(buf: &[u8], mut pos: usize) -> Result<usize, WireError> {
    loop {
        let len = *buf.get(pos).ok_or(WireError::Truncated(pos))? as usize;
        match len & 0xC0 {
            0x00 if len == 0 => return Ok(pos + 1),
            0x00 => pos += 1 + len,
            0xC0 => return Ok(pos + 2),
            _ => {
                return Err(WireError::InvalidName(format!(
                    "unsupported label type at offset {}",
                    pos
                )))
            }
        }
    }
}

/// Offset just past the resource record starting at `pos`.
pub fn skip_record(buf: &[u8], pos: usize) -> Result<usize, WireError> {
    let fixed = skip_name(buf, pos)?;
    let rdlength = read_u16(buf, fixed + 8)? as usize;
    let end = fixed + 10 + rdlength;
    if end > buf.len() {
        return Err(WireError::Truncated(buf.len()));
    }
    Ok(end)
}

/// Offset of the last record of the additional section, if there is one.
pub fn last_additional_offset(buf: &[u8]) -> Result<Option<usize>, WireError> {
    let qdcount = read_u16(buf, 4)?;
    let ancount = read_u16(buf, 6)?;
    let nscount = read_u16(buf, 8)?;
    let arcount = read_u16(buf, ARCOUNT_OFFSET)?;
    if arcount == 0 {
        return Ok(None);
    }

    let mut pos = HEADER_LEN;
    for _ in 0..qdcount {
        pos = skip_name(buf, pos)? + 4;
    }
    for _ in 0..(ancount as usize + nscount as usize + arcount as usize - 1) {
        pos = skip_record(buf, pos)?;
    }
    Ok(Some(pos))
}

pub fn arcount(buf: &[u8]) -> Result<u16, WireError> {
    read_u16(buf, ARCOUNT_OFFSET)
}

pub fn set_arcount(buf: &mut [u8], count: u16) -> Result<(), WireError> {
    set_u16(buf, ARCOUNT_OFFSET, count)
}

pub fn message_id(buf: &[u8]) -> Result<u16, WireError> {
    read_u16(buf, 0)
}

pub fn is_response(buf: &[u8]) -> bool {
    read_u16(buf, 2).is_ok_and(|flags| flags & FLAG_QR != 0)
}

pub fn is_truncated(buf: &[u8]) -> bool {
    read_u16(buf, 2).is_ok_and(|flags| flags & FLAG_TC != 0)
}

pub fn read_u16(buf: &[u8], pos: usize) -> Result<u16, WireError> {
    buf.get(pos..pos + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .ok_or(WireError::Truncated(pos))
}

pub fn read_u32(buf: &[u8], pos: usize) -> Result<u32, WireError> {
    buf.get(pos..pos + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(WireError::Truncated(pos))
}

pub fn read_u48(buf: &[u8], pos: usize) -> Result<u64, WireError> {
    buf.get(pos..pos + 6)
        .map(|b| b.iter().fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte)))
        .ok_or(WireError::Truncated(pos))
}

pub fn set_u16(buf: &mut [u8], pos: usize, value: u16) -> Result<(), WireError> {
    let slot = buf.get_mut(pos..pos + 2).ok_or(WireError::Truncated(pos))?;
    slot.copy_from_slice(&value.to_be_bytes());
    Ok(())
}

pub fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

pub fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

pub fn put_u48(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_be_bytes()[2..]);
}

fn put_name(out: &mut Vec<u8>, name: &str) -> Result<(), WireError> {
    out.extend_from_slice(WireName::parse(name)?.as_bytes());
    Ok(())
}

/// Splits `value` into 255-byte character-strings.
fn put_character_strings(out: &mut Vec<u8>, value: &[u8]) {
    if value.is_empty() {
        out.push(0);
        return;
    }
    for chunk in value.chunks(MAX_CHARACTER_STRING) {
        out.push(chunk.len() as u8);
        out.extend_from_slice(chunk);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn query_bytes(name: &str, qtype: u16, flags: u16) -> Vec<u8> {
        let mut buf = Vec::new();
        put_u16(&mut buf, 0xBEEF);
        put_u16(&mut buf, flags);
        put_u16(&mut buf, 1);
        put_u16(&mut buf, 0);
        put_u16(&mut buf, 0);
        put_u16(&mut buf, 0);
        buf.extend_from_slice(WireName::parse(name).unwrap().as_bytes());
        put_u16(&mut buf, qtype);
        put_u16(&mut buf, CLASS_IN);
        buf
    }

    #[test]
    fn test_parse_name_adds_root_dot() {
        let name = WireName::parse("www.example.com").unwrap();
        assert_eq!(name.as_str(), "www.example.com.");
        assert_eq!(
            name.as_bytes(),
            b"\x03www\x07example\x03com\x00".as_slice()
        );
    }

    #[test]
    fn test_parse_root_name() {
        assert_eq!(WireName::parse(".").unwrap(), WireName::root());
        assert_eq!(WireName::parse("").unwrap().as_bytes(), &[0]);
    }

    #[test]
    fn test_parse_rejects_empty_label_and_long_label() {
        assert!(WireName::parse("a..b").is_err());
        let long = "x".repeat(64);
        assert!(WireName::parse(&format!("{}.com", long)).is_err());
    }

    #[test]
    fn test_name_case_insensitive_equality() {
        let upper = WireName::parse("WWW.Example.COM.").unwrap();
        let lower = WireName::parse("www.example.com").unwrap();
        assert!(upper.eq_ignore_case(&lower));
        assert_eq!(upper.to_lowercase(), lower);
    }

    #[test]
    fn test_read_name_follows_pointer() {
        let mut buf = vec![0u8; HEADER_LEN];
        buf.extend_from_slice(b"\x07example\x03com\x00");
        buf.extend_from_slice(b"\x03www\xC0\x0C");

        let (name, end) = read_name(&buf, 25).unwrap();
        assert_eq!(name.as_str(), "www.example.com.");
        assert_eq!(end, buf.len());
    }

    #[test]
    fn test_read_name_detects_pointer_loop() {
        let mut buf = vec![0u8; HEADER_LEN];
        buf.extend_from_slice(&[0xC0, 0x0C]);
        assert_eq!(read_name(&buf, 12), Err(WireError::PointerLoop(12)));
    }

    #[test]
    fn test_parse_query_reads_question_and_flags() {
        let buf = query_bytes("www.example.com.", 1, 0x0110);
        let query = QueryMessage::parse(&buf).unwrap();

        assert_eq!(query.id, 0xBEEF);
        assert!(query.recursion_desired());
        assert!(query.checking_disabled());
        let question = query.question.unwrap();
        assert_eq!(question.name.as_str(), "www.example.com.");
        assert_eq!(question.qtype, 1);
    }

    #[test]
    fn test_parse_rejects_response_and_short_buffer() {
        let buf = query_bytes("example.com.", 1, 0x8000);
        assert_eq!(QueryMessage::parse(&buf).unwrap_err(), WireError::NotAQuery);
        assert!(QueryMessage::parse(&[0u8; 5]).is_err());
    }

    #[test]
    fn test_reply_copies_id_opcode_rd_cd() {
        let buf = query_bytes("example.com.", 1, 0x2110);
        let query = QueryMessage::parse(&buf).unwrap();
        let header = ReplyHeader::for_query(&query);

        assert_eq!(header.id, 0xBEEF);
        assert_eq!(header.flags, 0x8000 | 0x2110);
        assert_eq!(header.with_rcode(Rcode::Refused).flags & 0x000F, 5);
        assert!(header.with_truncated(true).truncated());
    }

    #[test]
    fn test_encode_reply_has_no_compression_pointers() {
        let buf = query_bytes("www.example.com.", 1, 0x0100);
        let query = QueryMessage::parse(&buf).unwrap();
        let answers = vec![
            ResourceRecord::a("www.example.com.", Ipv4Addr::new(198, 51, 100, 1)),
            ResourceRecord::a("www.example.com.", Ipv4Addr::new(198, 51, 100, 2)),
        ];

        let reply =
            encode_reply(ReplyHeader::for_query(&query), query.question.as_ref(), &answers)
                .unwrap();

        // header + question + 2 * (name 17 + fixed 10 + rdata 4)
        assert_eq!(reply.len(), 12 + 21 + 2 * 31);
        assert!(!reply.contains(&0xC0));
        assert_eq!(read_u16(&reply, 6).unwrap(), 2);
        assert!(is_response(&reply));
    }

    #[test]
    fn test_encode_long_txt_splits_character_strings() {
        let record = ResourceRecord::txt("t.example.com.", ["y".repeat(300)]);
        let mut out = Vec::new();
        encode_record(&record, &mut out).unwrap();

        let rdata_at = 15 + 10;
        assert_eq!(read_u16(&out, rdata_at - 2).unwrap(), 302);
        assert_eq!(out[rdata_at], 255);
        assert_eq!(out[rdata_at + 256], 45);
    }

    #[test]
    fn test_last_additional_offset() {
        let mut buf = query_bytes("example.com.", 1, 0);
        assert_eq!(last_additional_offset(&buf).unwrap(), None);

        let record_at = buf.len();
        set_arcount(&mut buf, 1).unwrap();
        encode_record(
            &ResourceRecord::a("example.com.", Ipv4Addr::LOCALHOST),
            &mut buf,
        )
        .unwrap();
        assert_eq!(last_additional_offset(&buf).unwrap(), Some(record_at));
        assert_eq!(skip_record(&buf, record_at).unwrap(), buf.len());
    }

    #[test]
    fn test_read_u48() {
        let mut out = Vec::new();
        put_u48(&mut out, 0x0000_1234_5678_9ABC);
        assert_eq!(out.len(), 6);
        assert_eq!(read_u48(&out, 0).unwrap(), 0x1234_5678_9ABC);
    }
}
