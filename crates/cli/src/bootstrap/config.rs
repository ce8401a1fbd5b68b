use fakedns_domain::{CliOverrides, FakeDnsConfig};

/// Loads the file (or defaults) and applies command-line overrides.
pub fn load_config(path: Option<&str>, overrides: CliOverrides) -> anyhow::Result<FakeDnsConfig> {
    Ok(FakeDnsConfig::load(path, overrides)?)
}
