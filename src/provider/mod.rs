//! DNS provider capabilities.
//!
//! A backend implements [`RecordProvider`] (get, set, append and delete records in a zone) and,
//! when it can discover the zones it is authoritative for, [`ZoneLister`]. Backends that can't
//! list zones are wrapped in a [`StaticZones`] decorator answering from a configured list. The
//! dispatch engine only ever sees [`Provider`]s: a named, zone-aware capability object built once
//! at startup by the [`ProviderRegistry`][registry::ProviderRegistry].
//!
//! Two implementations are provided, [`memory::InMemoryProvider`] and [`file::FileProvider`].

use crate::context::Context;
use crate::error::Error;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr, DurationSeconds};
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use trust_dns_proto::rr::RecordType;

pub mod file;
pub mod memory;
pub mod registry;
mod static_zones;

pub use static_zones::StaticZones;

/// A failed provider operation.
#[derive(thiserror::Error, Debug)]
pub enum ProviderError {
    /// The request owning the operation went away before it completed.
    #[error("operation cancelled")]
    Cancelled,

    /// The provider isn't authoritative for the zone.
    #[error("zone \"{0}\" is not managed by this provider")]
    UnknownZone(String),

    /// Any other backend failure.
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl ProviderError {
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// A DNS resource record. `name` is relative to the zone it is stored in (`@` for the apex).
#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub name: String,
    #[serde(rename = "type")]
    #[serde_as(as = "DisplayFromStr")]
    pub rtype: RecordType,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub ttl: Duration,
    pub data: String,
}

impl Record {
    /// An `A` or `AAAA` record for `ip`, depending on its address family.
    #[must_use]
    pub fn address(name: impl Into<String>, ip: IpAddr, ttl: Duration) -> Self {
        let rtype = match ip {
            IpAddr::V4(_) => RecordType::A,
            IpAddr::V6(_) => RecordType::AAAA,
        };
        Record {
            name: name.into(),
            rtype,
            ttl,
            data: ip.to_string(),
        }
    }

    /// The record's name made absolute within `zone`, without a trailing dot.
    #[must_use]
    pub fn fqdn(&self, zone: &str) -> String {
        trim_dot(&absolute_name(&self.name, zone)).to_string()
    }
}

/// A zone a provider is authoritative for, as reported by the provider (possibly absolute).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Zone {
    pub name: String,
}

impl Zone {
    pub fn new(name: impl Into<String>) -> Self {
        Zone { name: name.into() }
    }

    /// The zone name without its trailing dot.
    #[must_use]
    pub fn trimmed(&self) -> &str {
        trim_dot(&self.name)
    }
}

#[must_use]
pub fn trim_dot(name: &str) -> &str {
    name.strip_suffix('.').unwrap_or(name)
}

/// Whether two DNS names are equal, ignoring ASCII case and a trailing dot.
#[must_use]
pub fn same_name(a: &str, b: &str) -> bool {
    trim_dot(a).eq_ignore_ascii_case(trim_dot(b))
}

/// `fqdn` relative to `zone`: `home.x.com` in `x.com` is `home`, `x.com` itself is `@`.
#[must_use]
pub fn relative_name(fqdn: &str, zone: &str) -> String {
    let fqdn = trim_dot(fqdn);
    let zone = trim_dot(zone);
    if fqdn.eq_ignore_ascii_case(zone) {
        return "@".to_string();
    }
    let split = fqdn.len().saturating_sub(zone.len() + 1);
    match (fqdn.get(split..), fqdn.get(..split)) {
        (Some(suffix), Some(prefix))
            if suffix.starts_with('.') && suffix[1..].eq_ignore_ascii_case(zone) =>
        {
            prefix.to_string()
        }
        _ => fqdn.to_string(),
    }
}

/// `name` made absolute within `zone`. Names ending in a dot are already absolute.
#[must_use]
pub fn absolute_name(name: &str, zone: &str) -> String {
    if name.ends_with('.') {
        return name.to_string();
    }
    if name.is_empty() || name == "@" {
        return zone.to_string();
    }
    format!("{name}.{}", trim_dot(zone))
}

/// Record-level operations every backend supports.
#[async_trait::async_trait]
pub trait RecordProvider: Send + Sync {
    /// All records in `zone`.
    async fn get_records(&self, ctx: &Context, zone: &str) -> Result<Vec<Record>, ProviderError>;

    /// Replace the record sets named by `records`, returning the records actually applied.
    /// Record sets that already held the requested data may be omitted from the result.
    async fn set_records(
        &self,
        ctx: &Context,
        zone: &str,
        records: &[Record],
    ) -> Result<Vec<Record>, ProviderError>;

    /// Add `records` to `zone`, returning the records added.
    async fn append_records(
        &self,
        ctx: &Context,
        zone: &str,
        records: &[Record],
    ) -> Result<Vec<Record>, ProviderError>;

    /// Remove `records` from `zone`, returning the records removed. An empty `data` matches
    /// every record of that name and type.
    async fn delete_records(
        &self,
        ctx: &Context,
        zone: &str,
        records: &[Record],
    ) -> Result<Vec<Record>, ProviderError>;
}

/// Backends able to discover the zones they are authoritative for.
#[async_trait::async_trait]
pub trait ZoneLister: Send + Sync {
    async fn list_zones(&self, ctx: &Context) -> Result<Vec<Zone>, ProviderError>;
}

/// A backend with both capabilities.
pub trait ZoneAwareProvider: RecordProvider + ZoneLister {}

impl<T: RecordProvider + ZoneLister> ZoneAwareProvider for T {}

/// What a plugin factory hands to the registry.
pub enum Backend {
    /// A backend that can't list zones; it needs a static zone list.
    Records(Arc<dyn RecordProvider>),
    ZoneAware(Arc<dyn ZoneAwareProvider>),
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Records(_) => f.write_str("Backend::Records"),
            Backend::ZoneAware(_) => f.write_str("Backend::ZoneAware"),
        }
    }
}

/// Where a provider's zone list comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneSource {
    Dynamic,
    Static(Vec<String>),
}

/// A registered backend with its identity.
///
/// Every operation is raced against the [`Context`] so a cancelled request returns
/// [`ProviderError::Cancelled`] promptly even when the backend ignores the context.
#[derive(Clone)]
pub struct Provider {
    name: String,
    plugin: String,
    zone_source: ZoneSource,
    inner: Arc<dyn ZoneAwareProvider>,
}

impl Provider {
    /// Compose a provider from a backend and its configured static zones. A non-empty `zones`
    /// list always takes precedence over the backend's own zone listing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoZoneSource`] if the backend can't list zones and `zones` is empty.
    pub fn new(
        name: impl Into<String>,
        plugin: impl Into<String>,
        backend: Backend,
        zones: Vec<String>,
    ) -> Result<Self, Error> {
        let name = name.into();
        let (inner, zone_source) = match backend {
            Backend::ZoneAware(inner) if zones.is_empty() => (inner, ZoneSource::Dynamic),
            Backend::ZoneAware(inner) => (with_static(inner, &zones), ZoneSource::Static(zones)),
            Backend::Records(inner) if !zones.is_empty() => {
                (with_static(inner, &zones), ZoneSource::Static(zones))
            }
            Backend::Records(_) => return Err(Error::NoZoneSource(name)),
        };
        Ok(Provider {
            name,
            plugin: plugin.into(),
            zone_source,
            inner,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    #[must_use]
    pub fn zone_source(&self) -> &ZoneSource {
        &self.zone_source
    }

    /// # Errors
    ///
    /// Returns the backend's error, or [`ProviderError::Cancelled`].
    pub async fn list_zones(&self, ctx: &Context) -> Result<Vec<Zone>, ProviderError> {
        ctx.run(self.inner.list_zones(ctx)).await
    }

    /// # Errors
    ///
    /// Returns the backend's error, or [`ProviderError::Cancelled`].
    pub async fn get_records(&self, ctx: &Context, zone: &str) -> Result<Vec<Record>, ProviderError> {
        ctx.run(self.inner.get_records(ctx, zone)).await
    }

    /// # Errors
    ///
    /// Returns the backend's error, or [`ProviderError::Cancelled`].
    pub async fn set_records(
        &self,
        ctx: &Context,
        zone: &str,
        records: &[Record],
    ) -> Result<Vec<Record>, ProviderError> {
        ctx.run(self.inner.set_records(ctx, zone, records)).await
    }

    /// # Errors
    ///
    /// Returns the backend's error, or [`ProviderError::Cancelled`].
    pub async fn append_records(
        &self,
        ctx: &Context,
        zone: &str,
        records: &[Record],
    ) -> Result<Vec<Record>, ProviderError> {
        ctx.run(self.inner.append_records(ctx, zone, records)).await
    }

    /// # Errors
    ///
    /// Returns the backend's error, or [`ProviderError::Cancelled`].
    pub async fn delete_records(
        &self,
        ctx: &Context,
        zone: &str,
        records: &[Record],
    ) -> Result<Vec<Record>, ProviderError> {
        ctx.run(self.inner.delete_records(ctx, zone, records)).await
    }
}

fn with_static<P>(inner: Arc<P>, zones: &[String]) -> Arc<dyn ZoneAwareProvider>
where
    P: RecordProvider + ?Sized + 'static,
{
    Arc::new(StaticZones::new(inner, zones))
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("name", &self.name)
            .field("plugin", &self.plugin)
            .field("zone_source", &self.zone_source)
            .finish_non_exhaustive()
    }
}
