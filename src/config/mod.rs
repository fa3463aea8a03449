pub mod app_config;
pub mod probe_config;

pub use app_config::{AppConfig, load_config, setup_resolver};
pub use probe_config::{Config, SinkConfig, TargetConfig};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Invalid DNS host {host}: {source}")]
    DnsHost {
        host: String,
        #[source]
        source: std::net::AddrParseError,
    },
}
