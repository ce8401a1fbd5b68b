#![allow(dead_code)]

/// Minimal valid configuration file, extended by individual tests.
pub const MINIMAL_CONFIG: &str = r#"
[server]
port = 0
edge_zone = "example.com."
answer_zone = "cloud.example.com."
"#;

pub fn config_with(extra: &str) -> String {
    format!("{}\n{}", MINIMAL_CONFIG, extra)
}

/// base64 of "fake dns shared secret"
pub const TSIG_SECRET: &str = "ZmFrZSBkbnMgc2hhcmVkIHNlY3JldA==";
