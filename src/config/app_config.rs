use std::env;
use std::{net::IpAddr, time::Duration};

use trust_dns_resolver::{
    TokioAsyncResolver,
    config::{NameServerConfig, NameServerConfigGroup, Protocol, ResolverConfig, ResolverOpts},
};

use super::ConfigError;
use super::probe_config::{Config, SinkConfig};

pub struct AppConfig {
    pub config: Config,
    pub dns_hosts: Vec<String>,
}

/// Load the application configuration from a YAML file and environment variables
/// This function reads the configuration file specified by the `CONFIG_FILE` environment variable,
/// parses it into a `Config` struct, and applies the sink overrides from the environment
/// (`MIMIR_ENDPOINT` for a Mimir sink, `MONGODB_URI` for a MongoDB sink).
/// It also reads the DNS hosts used to resolve latency targets.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let config_file_location =
        env::var("CONFIG_FILE").unwrap_or_else(|_| "config.yml".to_string());
    let config_str =
        std::fs::read_to_string(&config_file_location).map_err(|source| ConfigError::Read {
            path: config_file_location.clone(),
            source,
        })?;

    let mut config = Config::from_yaml(&config_str)?;

    apply_sink_overrides(&mut config.sink, |key| env::var(key).ok());

    let dns_hosts = parse_dns_hosts(
        &env::var("DNS_HOSTS").unwrap_or_else(|_| "1.1.1.1,8.8.8.8".to_string()),
    );

    log::info!("Loaded {} targets from {}", config.targets.len(), config_file_location);
    log::info!("Using DNS hosts: {:?}", dns_hosts);

    Ok(AppConfig { config, dns_hosts })
}

/// Replaces the sink's address with the matching environment variable, if set.
fn apply_sink_overrides(sink: &mut SinkConfig, var: impl Fn(&str) -> Option<String>) {
    match sink {
        SinkConfig::Mimir { endpoint, .. } => {
            if let Some(overridden) = var("MIMIR_ENDPOINT") {
                *endpoint = overridden;
            }
        }
        SinkConfig::Mongodb { uri, .. } => {
            if let Some(overridden) = var("MONGODB_URI") {
                *uri = overridden;
            }
        }
        SinkConfig::Jsonl { .. } => {}
    }
}

fn parse_dns_hosts(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Setup a DNS resolver using the provided DNS hosts
/// This function creates a `TokioAsyncResolver` configured with the specified DNS hosts.
/// It sets the resolver options to have 2 attempts, a timeout of 100 milliseconds, and a cache size of 1024 for quick DNS lookups.
/// # Arguments
/// * `dns_hosts` - A slice of strings representing DNS host IPs (e.g., "1.1.1.1")
/// # Returns
/// A `Result` containing a `TokioAsyncResolver` if successful, or an error if a host is not an IP address.
pub fn setup_resolver(dns_hosts: &[String]) -> Result<TokioAsyncResolver, ConfigError> {
    let mut opts = ResolverOpts::default();
    opts.attempts = 2;
    opts.timeout = Duration::from_millis(100);
    opts.cache_size = 1024;

    let mut name_servers = NameServerConfigGroup::new();

    for host in dns_hosts {
        let ip: IpAddr = host.parse().map_err(|source| ConfigError::DnsHost {
            host: host.clone(),
            source,
        })?;
        name_servers.push(NameServerConfig {
            socket_addr: (ip, 53).into(),
            protocol: Protocol::Tcp,
            tls_dns_name: None,
            trust_negative_responses: false,
            bind_addr: None,
        });
    }

    let resolver_config = ResolverConfig::from_parts(None, vec![], name_servers);
    Ok(TokioAsyncResolver::tokio(resolver_config, opts))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dns_hosts() {
        assert_eq!(
            parse_dns_hosts("1.1.1.1, 8.8.8.8,,"),
            vec!["1.1.1.1".to_string(), "8.8.8.8".to_string()]
        );
    }

    fn vars(key: &str) -> Option<String> {
        match key {
            "MIMIR_ENDPOINT" => Some("http://mimir:9009".to_string()),
            "MONGODB_URI" => Some("mongodb://mongo:27017/monitor_db".to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_mongodb_uri_override() {
        let mut sink = SinkConfig::Mongodb {
            uri: "mongodb://localhost:27017/monitor_db".to_string(),
            database: None,
            collection: "metrics".to_string(),
        };
        apply_sink_overrides(&mut sink, vars);
        assert!(matches!(sink, SinkConfig::Mongodb { uri, .. } if uri == "mongodb://mongo:27017/monitor_db"));
    }

    #[test]
    fn test_mimir_endpoint_override() {
        let mut sink = SinkConfig::Mimir {
            endpoint: "http://localhost:9009".to_string(),
            tenant_id: None,
        };
        apply_sink_overrides(&mut sink, vars);
        assert!(matches!(sink, SinkConfig::Mimir { endpoint, .. } if endpoint == "http://mimir:9009"));
    }

    #[test]
    fn test_overrides_leave_unset_sinks_alone() {
        let mut sink = SinkConfig::Mongodb {
            uri: "mongodb://localhost:27017/monitor_db".to_string(),
            database: None,
            collection: "metrics".to_string(),
        };
        apply_sink_overrides(&mut sink, |_| None);
        assert!(matches!(sink, SinkConfig::Mongodb { uri, .. } if uri == "mongodb://localhost:27017/monitor_db"));

        let mut jsonl = SinkConfig::default();
        apply_sink_overrides(&mut jsonl, vars);
        assert_eq!(jsonl, SinkConfig::default());
    }

    #[tokio::test]
    async fn test_setup_resolver_rejects_hostname() {
        let err = setup_resolver(&["dns.google".to_string()]).expect_err("not an IP");
        assert!(matches!(err, ConfigError::DnsHost { host, .. } if host == "dns.google"));
    }

    #[tokio::test]
    async fn test_setup_resolver_accepts_ips() {
        assert!(setup_resolver(&["1.1.1.1".to_string(), "2606:4700:4700::1111".to_string()]).is_ok());
    }
}
