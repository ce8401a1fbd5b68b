#![allow(dead_code)]
use fakedns_domain::{AnswerMode, ProbePolicy, Settings, TsigAlgorithm, TsigKeyConfig};
use std::time::Duration;

pub const EDGE_ZONE: &str = "example.com.";
pub const ANSWER_ZONE: &str = "cloud.example.com.";
pub const SENTINEL: &str = "tc.example.com.";

pub const TSIG_KEY_NAME: &str = "test-key.";
/// base64 of "fake dns shared secret"
pub const TSIG_SECRET: &str = "ZmFrZSBkbnMgc2hhcmVkIHNlY3JldA==";

pub fn settings() -> Settings {
    settings_on(0)
}

pub fn settings_on(port: u16) -> Settings {
    Settings::new(port, EDGE_ZONE, ANSWER_ZONE)
        .with_probe(ProbePolicy::new(20, Duration::from_millis(50), Duration::from_millis(500)))
}

pub fn reflecting_settings(mode: AnswerMode) -> Settings {
    settings().with_answer_mode(mode)
}

pub fn signed_settings() -> Settings {
    settings().with_tsig_key(TsigKeyConfig::new(
        TSIG_KEY_NAME,
        TsigAlgorithm::HmacSha256,
        TSIG_SECRET,
    ))
}

/// Port that was free a moment ago on 127.0.0.1 for both UDP and TCP.
pub fn free_port() -> u16 {
    loop {
        let udp = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = udp.local_addr().unwrap().port();
        if std::net::TcpListener::bind(("127.0.0.1", port)).is_ok() {
            return port;
        }
    }
}
