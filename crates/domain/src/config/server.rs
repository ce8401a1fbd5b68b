use crate::settings::{AnswerMode, Transport};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Zone routed to the responder; `tc.<edge_zone>` is the truncation sentinel.
    #[serde(default = "default_edge_zone")]
    pub edge_zone: String,

    /// Zone the readiness probe queries.
    #[serde(default = "default_answer_zone")]
    pub answer_zone: String,

    #[serde(default = "default_transports")]
    pub transports: Vec<Transport>,

    #[serde(default)]
    pub answer_mode: AnswerMode,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
            edge_zone: default_edge_zone(),
            answer_zone: default_answer_zone(),
            transports: default_transports(),
            answer_mode: AnswerMode::default(),
        }
    }
}

fn default_port() -> u16 {
    5353
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_edge_zone() -> String {
    "example.com.".to_string()
}

fn default_answer_zone() -> String {
    "cloud.example.com.".to_string()
}

fn default_transports() -> Vec<Transport> {
    vec![Transport::Udp, Transport::Tcp]
}
