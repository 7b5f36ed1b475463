use crate::error::{Error, Result};
use crate::host::{Host, HostManager, OrderedHostManager, SingleHostManager};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// How a connection picks among the configured hosts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostPolicy {
    /// One host; connectivity failures surface immediately.
    Single,
    /// Hosts tried in order, sticking with the last one that answered.
    #[default]
    Ordered,
}

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub hosts: Vec<String>,
    #[serde(default)]
    pub policy: HostPolicy,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            hosts: vec!["http://localhost:8080".to_string()],
            policy: HostPolicy::default(),
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl ClientConfig {
    pub fn new<S: Into<String>>(hosts: impl IntoIterator<Item = S>) -> Self {
        Self {
            hosts: hosts.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: ClientConfig = serde_json::from_str(json)
            .map_err(|e| Error::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn policy(mut self, policy: HostPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.hosts.is_empty() {
            return Err(Error::Configuration("at least one host is required".to_string()));
        }
        if self.policy == HostPolicy::Single && self.hosts.len() != 1 {
            return Err(Error::Configuration(format!(
                "single host policy needs exactly one host, got {}",
                self.hosts.len()
            )));
        }
        self.parse_hosts().map(|_| ())
    }

    /// Builds the host manager described by this configuration.
    pub fn host_manager(&self) -> Result<Arc<dyn HostManager>> {
        self.validate()?;
        let mut hosts = self.parse_hosts()?;
        Ok(match self.policy {
            HostPolicy::Single => Arc::new(SingleHostManager::new(hosts.remove(0))),
            HostPolicy::Ordered => Arc::new(OrderedHostManager::new(hosts)),
        })
    }

    fn parse_hosts(&self) -> Result<Vec<Host>> {
        self.hosts.iter().map(|host| Host::parse(host)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_from_json() {
        let config = ClientConfig::from_json(r#"{"hosts":["http://localhost:8080"]}"#).unwrap();
        assert_eq!(config.policy, HostPolicy::Ordered);
        assert_eq!(config.connect_timeout(), Duration::from_secs(5));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_config_single_policy() {
        let config = ClientConfig::from_json(
            r#"{"hosts":["http://localhost:9000"],"policy":"single","request_timeout_ms":1000}"#,
        )
        .unwrap();
        assert_eq!(config.policy, HostPolicy::Single);
        assert_eq!(config.request_timeout_ms, 1000);

        let manager = config.host_manager().unwrap();
        let host = manager.next().unwrap();
        assert_eq!(host.address(), "http://localhost:9000");
        assert!(!manager.on_failure(&host));
    }

    #[test]
    fn test_config_rejects_empty_hosts() {
        let err = ClientConfig::from_json(r#"{"hosts":[]}"#).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_config_rejects_single_with_many_hosts() {
        let config = ClientConfig::new(["http://a:8080", "http://b:8080"]).policy(HostPolicy::Single);
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_config_rejects_bad_host() {
        let config = ClientConfig::new(["localhost:9999"]);
        assert!(matches!(config.validate(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_config_malformed_json() {
        assert!(matches!(
            ClientConfig::from_json("{"),
            Err(Error::Configuration(_))
        ));
    }
}
