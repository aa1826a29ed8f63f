use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// Target descriptor handed to a plugin's `execute`.
///
/// DNS facts are supplied by the caller; plugins never resolve names
/// themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Hostname or IP literal as given by the user
    pub host: String,

    /// Addresses the host is known to resolve to
    #[serde(default)]
    pub addresses: Vec<IpAddr>,

    /// CNAME chain of the host, outermost first
    #[serde(default)]
    pub cnames: Vec<String>,
}

impl Target {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            addresses: Vec::new(),
            cnames: Vec::new(),
        }
    }

    pub fn with_addresses(mut self, addresses: impl IntoIterator<Item = IpAddr>) -> Self {
        self.addresses.extend(addresses);
        self
    }

    pub fn with_cnames<S: Into<String>>(mut self, cnames: impl IntoIterator<Item = S>) -> Self {
        self.cnames.extend(cnames.into_iter().map(Into::into));
        self
    }
}

impl From<&str> for Target {
    /// IP literals are also recorded as the target's only address.
    fn from(host: &str) -> Self {
        let target = Target::new(host);
        match host.parse::<IpAddr>() {
            Ok(addr) => target.with_addresses([addr]),
            Err(_) => target,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.host)
    }
}
