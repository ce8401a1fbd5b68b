pub mod errors;
pub mod logging;
pub mod probe;
pub mod root;
pub mod server;

pub use errors::ConfigError;
pub use logging::LoggingConfig;
pub use probe::ProbeConfig;
pub use root::{CliOverrides, FakeDnsConfig};
pub use server::ServerConfig;
