//! Update and query dispatch.
//!
//! A [`Dispatcher`] owns the immutable, ordered provider list and fans every request out across
//! it. An update runs through these phases:
//!
//! 1. list every provider's zones concurrently ([`Dispatcher::list_zones`]),
//! 2. match each hostname to the first provider zone containing it,
//! 3. apply one `set_records` call per matched `(provider, zone)` group concurrently,
//! 4. aggregate one [`Status`] per hostname, in request order.
//!
//! Both fan-out phases are admitted through a [`Throttle`], and results are only read after it
//! has drained.

use crate::context::Context;
use crate::error::Error;
use crate::provider::{relative_name, same_name, trim_dot, Provider, ProviderError, Record, Zone};
use crate::throttle::Throttle;
use std::collections::BTreeMap;
use std::future::Future;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

mod batch;

pub use batch::{Status, UpdateBatch};

/// TTL of every address record written by an update.
pub const UPDATE_TTL: Duration = Duration::from_secs(5 * 60);

/// Split the `hostname` parameter of an update into its hosts.
///
/// # Errors
///
/// Returns [`Error::MissingHostname`] if the parameter is absent or blank.
pub fn parse_hostnames(param: Option<&str>) -> Result<Vec<String>, Error> {
    match param.map(str::trim) {
        None | Some("") => Err(Error::MissingHostname),
        Some(hosts) => Ok(hosts.split(',').map(|h| h.trim().to_string()).collect()),
    }
}

/// Whether `host` lies strictly below `zone`, i.e. ends with `"." + zone`.
#[must_use]
pub fn in_zone(host: &str, zone: &str) -> bool {
    let host = trim_dot(host);
    let zone = trim_dot(zone);
    if zone.is_empty() || host.len() <= zone.len() {
        return false;
    }
    let split = host.len() - zone.len();
    host.is_char_boundary(split)
        && host[split..].eq_ignore_ascii_case(zone)
        && host[..split].ends_with('.')
}

/// The result of listing zones across providers.
#[derive(Debug, Default)]
pub struct ZoneListing {
    /// Per provider position, its zones without the trailing dot, or `None` if listing failed
    /// or the provider wasn't asked.
    zones: Vec<Option<Vec<String>>>,
    asked: usize,
    failures: Vec<(String, ProviderError)>,
}

impl ZoneListing {
    /// Zones of the provider at `idx`, if its listing succeeded.
    #[must_use]
    pub fn zones_of(&self, idx: usize) -> Option<&[String]> {
        self.zones.get(idx).and_then(Option::as_deref)
    }

    /// Failed listings, as `(provider, error)` in provider order.
    #[must_use]
    pub fn failures(&self) -> &[(String, ProviderError)] {
        &self.failures
    }

    /// Whether at least one provider was asked and none answered.
    #[must_use]
    pub fn all_failed(&self) -> bool {
        self.asked > 0 && self.zones.iter().all(Option::is_none)
    }

    fn summary(&self) -> String {
        self.failures
            .iter()
            .map(|(name, err)| format!("{name}: {err}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Every record of one provider, grouped by zone.
#[derive(Debug)]
pub struct ProviderRecords {
    pub provider: String,
    pub zones: Vec<(Zone, Vec<Record>)>,
}

/// Work for one `(provider, zone)` pair.
#[derive(Debug, Default)]
struct UpdateGroup {
    hosts: Vec<usize>,
    records: Vec<Record>,
}

#[derive(Debug, Clone)]
pub struct Dispatcher {
    providers: Arc<[Provider]>,
    concurrency: usize,
}

impl Dispatcher {
    #[must_use]
    pub fn new(providers: Vec<Provider>, concurrency: usize) -> Self {
        Dispatcher {
            providers: providers.into(),
            concurrency,
        }
    }

    #[must_use]
    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }

    /// Positions of the providers named in `names` (all of them when `names` is empty), in
    /// configuration order.
    #[must_use]
    pub fn select(&self, names: &[String]) -> Vec<usize> {
        self.providers
            .iter()
            .enumerate()
            .filter(|(_, p)| names.is_empty() || names.iter().any(|n| n == p.name()))
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Run `op` against each selected provider through a fresh throttle, returning the outputs
    /// keyed by provider position, in provider order. Positions past the end are skipped.
    async fn fan_out<T, F, Fut>(&self, selected: &[usize], op: F) -> Result<Vec<(usize, T)>, Error>
    where
        T: Send + 'static,
        F: Fn(Provider) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let mut throttle = Throttle::new(self.concurrency);
        for &idx in selected {
            let Some(provider) = self.providers.get(idx) else {
                continue;
            };
            let task = op(provider.clone());
            throttle.spawn(async move { (idx, task.await) }).await?;
        }
        let mut outputs = throttle.drain().await;
        outputs.sort_unstable_by_key(|(idx, _)| *idx);
        Ok(outputs)
    }

    /// List the zones of every provider.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ThrottleClosed`] if a listing task couldn't be admitted. Provider
    /// failures are recorded in the [`ZoneListing`].
    pub async fn list_zones(&self, ctx: &Context) -> Result<ZoneListing, Error> {
        let all: Vec<usize> = (0..self.providers.len()).collect();
        self.list_zones_of(ctx, &all).await
    }

    /// List the zones of the providers at the `selected` positions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ThrottleClosed`] if a listing task couldn't be admitted.
    pub async fn list_zones_of(&self, ctx: &Context, selected: &[usize]) -> Result<ZoneListing, Error> {
        let outputs = self
            .fan_out(selected, |provider| {
                let ctx = ctx.clone();
                async move { provider.list_zones(&ctx).await }
            })
            .await?;

        let mut listing = ZoneListing {
            zones: vec![None; self.providers.len()],
            asked: selected
                .iter()
                .filter(|&&idx| idx < self.providers.len())
                .count(),
            failures: Vec::new(),
        };
        for (idx, res) in outputs {
            let name = self.providers[idx].name();
            match res {
                Ok(zones) => {
                    listing.zones[idx] =
                        Some(zones.iter().map(|z| z.trimmed().to_string()).collect());
                }
                Err(err) => {
                    if err.is_cancelled() {
                        tracing::debug!("zone listing for {name} cancelled");
                    } else {
                        tracing::error!("failed listing zones for {name}: {err}");
                    }
                    listing.failures.push((name.to_string(), err));
                }
            }
        }
        Ok(listing)
    }

    /// The first provider zone, in provider then zone order, containing `host`.
    ///
    /// `listing` must come from [`Dispatcher::list_zones`].
    #[must_use]
    pub fn find_zone<'a>(&self, listing: &'a ZoneListing, host: &str) -> Option<(usize, &'a str)> {
        (0..self.providers.len()).find_map(|idx| {
            let zones = listing.zones_of(idx)?;
            let zone = zones.iter().find(|zone| in_zone(host, zone))?;
            Some((idx, zone.as_str()))
        })
    }

    /// Point every host in `hosts` at `ip`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ZoneListing`] if every provider failed to list its zones. Failures
    /// applying an update are reported per host as [`Status::DnsErr`].
    pub async fn update(
        &self,
        ctx: &Context,
        hosts: Vec<String>,
        ip: IpAddr,
    ) -> Result<UpdateBatch, Error> {
        let listing = self.list_zones(ctx).await?;
        if listing.all_failed() {
            return Err(Error::ZoneListing(listing.summary()));
        }

        let mut batch = UpdateBatch::new(hosts, ip);
        let mut groups: BTreeMap<(usize, String), UpdateGroup> = BTreeMap::new();
        let mut unmatched = Vec::new();
        for (idx, host) in batch.hosts().iter().enumerate() {
            let Some((provider, zone)) = self.find_zone(&listing, host) else {
                tracing::debug!("no provider manages a zone for {host}");
                unmatched.push(idx);
                continue;
            };
            tracing::debug!(
                "hostname {host} matches zone {zone} of {}",
                self.providers[provider].name()
            );
            let group = groups.entry((provider, zone.to_string())).or_default();
            group.hosts.push(idx);
            let name = relative_name(host, zone);
            if !group.records.iter().any(|r| same_name(&r.name, &name)) {
                group.records.push(Record::address(name, ip, UPDATE_TTL));
            }
        }

        for idx in unmatched {
            batch.set(idx, Status::NoHost);
        }

        let groups: Vec<((usize, String), UpdateGroup)> = groups.into_iter().collect();
        let mut throttle = Throttle::new(self.concurrency);
        for (pos, ((provider, zone), group)) in groups.iter().enumerate() {
            let provider = self.providers[*provider].clone();
            let (ctx, zone, records) = (ctx.clone(), zone.clone(), group.records.clone());
            throttle
                .spawn(async move { (pos, provider.set_records(&ctx, &zone, &records).await) })
                .await?;
        }

        for (pos, res) in throttle.drain().await {
            let ((provider, zone), group) = &groups[pos];
            let provider = self.providers[*provider].name();
            match res {
                Ok(applied) => {
                    for record in applied {
                        let fqdn = record.fqdn(zone);
                        for &idx in &group.hosts {
                            if same_name(&fqdn, &batch.hosts()[idx]) {
                                batch.set(idx, Status::Good(ip));
                            }
                        }
                    }
                }
                Err(err) if err.is_cancelled() => {
                    tracing::debug!("update of zone {zone} on {provider} cancelled");
                }
                Err(err) => {
                    tracing::error!("failed updating records for zone {zone} on {provider}: {err}");
                    for &idx in &group.hosts {
                        batch.set(idx, Status::DnsErr);
                    }
                }
            }
        }
        Ok(batch)
    }

    /// Fetch every record of the providers at the `selected` positions, in provider order.
    /// A provider whose listing or fetch fails yields its error instead.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ThrottleClosed`] if a fetch task couldn't be admitted.
    pub async fn fetch_records(
        &self,
        ctx: &Context,
        selected: &[usize],
    ) -> Result<Vec<(String, Result<ProviderRecords, ProviderError>)>, Error> {
        let outputs = self
            .fan_out(selected, |provider| {
                let ctx = ctx.clone();
                async move {
                    let zones = provider.list_zones(&ctx).await?;
                    let mut records = Vec::with_capacity(zones.len());
                    for zone in zones {
                        let items = provider.get_records(&ctx, &zone.name).await?;
                        records.push((zone, items));
                    }
                    Ok::<_, ProviderError>(ProviderRecords {
                        provider: provider.name().to_string(),
                        zones: records,
                    })
                }
            })
            .await?;
        Ok(outputs
            .into_iter()
            .map(|(idx, res)| (self.providers[idx].name().to_string(), res))
            .collect())
    }

    /// Records named `hostname` of type `rtype` (compared case-insensitively), per provider in
    /// configuration order. Only zones equal to or containing `hostname` are fetched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ThrottleClosed`] if a lookup task couldn't be admitted.
    pub async fn lookup(
        &self,
        ctx: &Context,
        rtype: &str,
        hostname: &str,
    ) -> Result<Vec<(String, Result<Vec<Record>, ProviderError>)>, Error> {
        let all: Vec<usize> = (0..self.providers.len()).collect();
        let outputs = self
            .fan_out(&all, |provider| {
                let ctx = ctx.clone();
                let (rtype, hostname) = (rtype.to_string(), hostname.to_string());
                async move {
                    let mut found = Vec::new();
                    for zone in provider.list_zones(&ctx).await? {
                        if !same_name(&hostname, &zone.name) && !in_zone(&hostname, &zone.name) {
                            continue;
                        }
                        for record in provider.get_records(&ctx, &zone.name).await? {
                            if same_name(&record.fqdn(&zone.name), &hostname)
                                && record.rtype.to_string().eq_ignore_ascii_case(&rtype)
                            {
                                found.push(record);
                            }
                        }
                    }
                    Ok::<_, ProviderError>(found)
                }
            })
            .await?;
        Ok(outputs
            .into_iter()
            .map(|(idx, res)| (self.providers[idx].name().to_string(), res))
            .collect())
    }
}
