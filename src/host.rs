//! Host selection and failover across the configured server addresses.

use crate::error::{Error, Result};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use url::Url;

/// Base address of one Terrastore server (scheme, host and port, plus an optional path prefix).
///
/// Two hosts are equal when their address strings are equal.
#[derive(Clone)]
pub struct Host {
    address: String,
    url: Url,
}

impl Host {
    /// Parses an `http` or `https` base URL.
    pub fn parse(address: &str) -> Result<Self> {
        let address = address.trim().trim_end_matches('/');
        let url = Url::parse(address)?;
        if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
            return Err(Error::InvalidArgument(format!(
                "host must be an http(s) base URL: {}",
                address
            )));
        }
        if url.host_str().is_none() {
            return Err(Error::InvalidArgument(format!(
                "host has no server name: {}",
                address
            )));
        }
        Ok(Self {
            address: address.to_string(),
            url,
        })
    }

    /// The address string this host was configured with.
    pub fn address(&self) -> &str {
        &self.address
    }

    pub(crate) fn url(&self) -> &Url {
        &self.url
    }
}

impl PartialEq for Host {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for Host {}

impl std::hash::Hash for Host {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.address.hash(state);
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Host({})", self.address)
    }
}

impl std::str::FromStr for Host {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Host::parse(s)
    }
}

/// A strategy for choosing which host each request attempt should target.
///
/// Implementations are shared by every operation issued through a connection,
/// so all methods take `&self` and must tolerate concurrent callers.
pub trait HostManager: Send + Sync {
    /// Returns the host to use for the next attempt.
    fn next(&self) -> Result<Host>;

    /// Records that a request against `host` got an HTTP response.
    fn on_success(&self, host: &Host);

    /// Records that `host` could not be reached.
    ///
    /// Returns `true` if another host should be tried for the same call.
    fn on_failure(&self, host: &Host) -> bool;
}

impl fmt::Debug for dyn HostManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HostManager")
    }
}

/// Always targets the one configured host; failures never switch hosts.
#[derive(Debug, Clone)]
pub struct SingleHostManager {
    host: Host,
}

impl SingleHostManager {
    pub fn new(host: Host) -> Self {
        Self { host }
    }

    pub fn parse(address: &str) -> Result<Self> {
        Ok(Self::new(Host::parse(address)?))
    }
}

impl HostManager for SingleHostManager {
    fn next(&self) -> Result<Host> {
        Ok(self.host.clone())
    }

    fn on_success(&self, _host: &Host) {}

    fn on_failure(&self, host: &Host) -> bool {
        tracing::warn!(host = %host, "single host unreachable, no alternate to try");
        false
    }
}

/// Walks a fixed list of hosts in order, sticking with the last host that worked.
///
/// The sticky index starts at the first host and only ever moves forward, one
/// host per recorded failure. It never wraps: once the last host has failed,
/// `on_failure` reports that nothing is left to try and later calls keep
/// targeting the last host.
#[derive(Debug)]
pub struct OrderedHostManager {
    hosts: Vec<Host>,
    sticky: AtomicUsize,
}

impl OrderedHostManager {
    pub fn new(hosts: Vec<Host>) -> Self {
        Self {
            hosts,
            sticky: AtomicUsize::new(0),
        }
    }

    pub fn parse<S: AsRef<str>>(addresses: &[S]) -> Result<Self> {
        let hosts = addresses
            .iter()
            .map(|address| Host::parse(address.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(hosts))
    }

    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }
}

impl HostManager for OrderedHostManager {
    fn next(&self) -> Result<Host> {
        let index = self.sticky.load(Ordering::Acquire);
        self.hosts
            .get(index)
            .cloned()
            .ok_or(Error::NoHostsAvailable)
    }

    fn on_success(&self, host: &Host) {
        tracing::trace!(host = %host, "host stays sticky");
    }

    fn on_failure(&self, host: &Host) -> bool {
        let Some(position) = self.hosts.iter().position(|candidate| candidate == host) else {
            return false;
        };
        let next = position + 1;
        if next >= self.hosts.len() {
            tracing::warn!(host = %host, "all configured hosts failed");
            return false;
        }

        // Concurrent failures may race; fetch_max keeps the index from moving backward.
        let previous = self.sticky.fetch_max(next, Ordering::AcqRel);
        tracing::warn!(
            failed = %host,
            next = %self.hosts[next.max(previous)],
            "failing over to next host"
        );
        true
    }
}

/// Picks the policy matching the number of hosts: single for one, ordered otherwise.
pub fn host_manager_for(mut hosts: Vec<Host>) -> Arc<dyn HostManager> {
    match hosts.len() {
        1 => Arc::new(SingleHostManager::new(hosts.remove(0))),
        _ => Arc::new(OrderedHostManager::new(hosts)),
    }
}
