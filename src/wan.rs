//! WAN address discovery.
//!
//! Asks an external resolver which address our queries come from, the equivalent of
//! `dig +short @resolver1.opendns.com myip.opendns.com`.

use crate::error::Error;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;
use tokio::net::UdpSocket;
use trust_dns_client::client::{AsyncClient, ClientHandle};
use trust_dns_client::rr::{DNSClass, Name, RData, RecordType};
use trust_dns_client::udp::UdpClientStream;

pub const DEFAULT_RESOLVER: &str = "resolver1.opendns.com:53";
pub const DEFAULT_HOSTNAME: &str = "myip.opendns.com.";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Discovers the public address of this host.
#[async_trait::async_trait]
pub trait WanLookup: Send + Sync {
    async fn lookup(&self) -> Result<IpAddr, Error>;
}

#[derive(Debug, Clone)]
pub struct OpenDnsLookup {
    resolver: String,
    hostname: String,
    timeout: Duration,
}

impl Default for OpenDnsLookup {
    fn default() -> Self {
        OpenDnsLookup {
            resolver: DEFAULT_RESOLVER.to_string(),
            hostname: DEFAULT_HOSTNAME.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl OpenDnsLookup {
    async fn query(&self) -> Result<IpAddr, Error> {
        let resolver: SocketAddr = tokio::net::lookup_host(&self.resolver)
            .await?
            .next()
            .ok_or_else(|| Error::WanLookup(format!("{} did not resolve", self.resolver)))?;
        let name = Name::from_str(&self.hostname).map_err(|err| Error::WanLookup(err.to_string()))?;

        let stream = UdpClientStream::<UdpSocket>::with_timeout(resolver, self.timeout);
        let (mut client, background) = AsyncClient::connect(stream)
            .await
            .map_err(|err| Error::WanLookup(err.to_string()))?;
        let background = tokio::spawn(background);

        let response = client.query(name, DNSClass::IN, RecordType::A).await;
        background.abort();
        let response = response.map_err(|err| Error::WanLookup(err.to_string()))?;

        response
            .answers()
            .iter()
            .find_map(|record| match record.data() {
                Some(RData::A(ip)) => Some(IpAddr::V4(*ip)),
                Some(RData::AAAA(ip)) => Some(IpAddr::V6(*ip)),
                _ => None,
            })
            .ok_or_else(|| Error::WanLookup(format!("no address for {}", self.hostname)))
    }
}

#[async_trait::async_trait]
impl WanLookup for OpenDnsLookup {
    async fn lookup(&self) -> Result<IpAddr, Error> {
        match tokio::time::timeout(self.timeout, self.query()).await {
            Ok(res) => res,
            Err(_) => Err(Error::WanLookup(format!(
                "no answer from {} within {:?}",
                self.resolver, self.timeout
            ))),
        }
    }
}
