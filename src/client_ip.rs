//! Client address resolution.
//!
//! Decides which address an update writes into DNS. In order:
//!
//! 1. A valid `myip` query parameter is used as-is.
//! 2. A peer outside the trusted remotes (or any peer, when none are configured) is the answer;
//!    its forwarding headers are ignored.
//! 3. For a trusted peer, the `X-Forwarded-For` chain is walked from the most recently appended
//!    entry backwards, returning the first valid entry that isn't itself trusted and, when
//!    local addresses are rejected, isn't an RFC 1918 address.
//! 4. If nothing qualifies and local addresses are rejected, the WAN address is discovered
//!    instead. Any remaining failure falls back to the peer address.

use crate::config::ServerConfig;
use crate::error::Error;
use crate::wan::{OpenDnsLookup, WanLookup};
use ipnetwork::IpNetwork;
use lazy_static::lazy_static;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;

lazy_static! {
    // See RFC 1918 section 3.
    static ref LOCAL_NETWORKS: [IpNetwork; 3] = [
        IpNetwork::from_str("10.0.0.0/8").unwrap(),
        IpNetwork::from_str("172.16.0.0/12").unwrap(),
        IpNetwork::from_str("192.168.0.0/16").unwrap(),
    ];
}

/// Whether `ip` is in one of the RFC 1918 private ranges.
#[must_use]
pub fn is_local(ip: IpAddr) -> bool {
    LOCAL_NETWORKS.iter().any(|network| network.contains(ip))
}

/// Split every header occurrence on commas. Entries that don't parse are kept as `None` so
/// positions in the chain are preserved.
#[must_use]
pub fn forwarded_chain<'a>(values: impl IntoIterator<Item = &'a str>) -> Vec<Option<IpAddr>> {
    values
        .into_iter()
        .flat_map(|value| value.split(','))
        .map(|entry| IpAddr::from_str(entry.trim()).ok())
        .collect()
}

#[derive(Clone, Default)]
pub struct ClientIpResolver {
    trusted: Option<Vec<IpNetwork>>,
    reject_local: bool,
    wan: Option<Arc<dyn WanLookup>>,
}

impl ClientIpResolver {
    #[must_use]
    pub fn new(trusted: Option<Vec<IpNetwork>>, reject_local: bool) -> Self {
        ClientIpResolver {
            trusted,
            reject_local,
            wan: None,
        }
    }

    #[must_use]
    pub fn from_config(config: &ServerConfig) -> Self {
        let resolver = Self::new(config.trusted_remotes.clone(), config.reject_local_ip);
        if config.wan_lookup {
            resolver.with_wan_lookup(Arc::new(OpenDnsLookup::default()))
        } else {
            resolver
        }
    }

    #[must_use]
    pub fn with_wan_lookup(mut self, wan: Arc<dyn WanLookup>) -> Self {
        self.wan = Some(wan);
        self
    }

    fn is_trusted(&self, ip: IpAddr) -> bool {
        self.trusted
            .as_ref()
            .is_some_and(|trusted| trusted.iter().any(|network| network.contains(ip)))
    }

    /// Resolve the client address for an update request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownRemote`] when no valid `myip` was given and the peer address is
    /// unknown. Problems with the forwarding chain never fail the request.
    pub async fn resolve<'a>(
        &self,
        myip: Option<&str>,
        remote: Option<SocketAddr>,
        forwarded_for: impl IntoIterator<Item = &'a str>,
    ) -> Result<IpAddr, Error> {
        // https://help.dyn.com/perform-update.html
        if let Some(ip) = myip.and_then(|value| IpAddr::from_str(value.trim()).ok()) {
            return Ok(ip);
        }

        let remote = canonical(remote.ok_or(Error::UnknownRemote)?.ip());
        if !self.is_trusted(remote) {
            return Ok(remote);
        }

        let chain = forwarded_chain(forwarded_for);
        let candidate = chain.iter().rev().flatten().copied().map(canonical).find(|ip| {
            !self.is_trusted(*ip) && !(self.reject_local && is_local(*ip))
        });
        if let Some(ip) = candidate {
            return Ok(ip);
        }

        if self.reject_local {
            if let Some(wan) = &self.wan {
                match wan.lookup().await {
                    Ok(ip) => return Ok(ip),
                    Err(err) => tracing::warn!("falling back to peer address {remote}: {err}"),
                }
            }
        }
        Ok(remote)
    }
}

fn canonical(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map_or(ip, IpAddr::V4),
        IpAddr::V4(_) => ip,
    }
}
