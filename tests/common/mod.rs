#![allow(dead_code)]

use async_trait::async_trait;
use ddns_srv::provider::{
    same_name, Backend, Provider, ProviderError, Record, RecordProvider, Zone, ZoneLister,
};
use ddns_srv::{Context, Dispatcher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How a [`FakeProvider`] answers `set_records`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SetBehaviour {
    /// Store the records and echo them back.
    #[default]
    Echo,
    /// Accept the records but report nothing applied.
    Silent,
    /// Fail with a backend error.
    Fail,
}

/// Counts how many calls run at once, across every provider sharing it.
#[derive(Debug, Default)]
pub struct Gauge {
    running: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl Gauge {
    fn enter(&self) {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.running.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }
}

/// A scriptable provider. Its delays ignore the context on purpose, so tests can check that
/// cancellation doesn't depend on the backend's cooperation.
#[derive(Debug, Default)]
pub struct FakeProvider {
    pub zones: Vec<String>,
    pub fail_listing: bool,
    pub set: SetBehaviour,
    pub list_delay: Duration,
    pub set_delay: Duration,
    pub gauge: Arc<Gauge>,
    pub written: Mutex<Vec<(String, Record)>>,
}

impl FakeProvider {
    pub fn with_zones(zones: &[&str]) -> Self {
        FakeProvider {
            zones: zones.iter().map(|z| (*z).to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn written(&self) -> Vec<(String, Record)> {
        self.written.lock().unwrap().clone()
    }
}

#[async_trait]
impl ZoneLister for FakeProvider {
    async fn list_zones(&self, _ctx: &Context) -> Result<Vec<Zone>, ProviderError> {
        self.gauge.enter();
        tokio::time::sleep(self.list_delay).await;
        self.gauge.leave();
        if self.fail_listing {
            return Err(anyhow::anyhow!("listing unavailable").into());
        }
        Ok(self.zones.iter().map(|z| Zone::new(format!("{z}."))).collect())
    }
}

#[async_trait]
impl RecordProvider for FakeProvider {
    async fn get_records(&self, _ctx: &Context, zone: &str) -> Result<Vec<Record>, ProviderError> {
        Ok(self
            .written()
            .into_iter()
            .filter(|(z, _)| same_name(z, zone))
            .map(|(_, r)| r)
            .collect())
    }

    async fn set_records(
        &self,
        _ctx: &Context,
        zone: &str,
        records: &[Record],
    ) -> Result<Vec<Record>, ProviderError> {
        self.gauge.enter();
        tokio::time::sleep(self.set_delay).await;
        self.gauge.leave();
        match self.set {
            SetBehaviour::Fail => Err(anyhow::anyhow!("backend rejected update").into()),
            SetBehaviour::Silent => Ok(Vec::new()),
            SetBehaviour::Echo => {
                let mut written = self.written.lock().unwrap();
                written.extend(records.iter().map(|r| (zone.to_string(), r.clone())));
                Ok(records.to_vec())
            }
        }
    }

    async fn append_records(
        &self,
        ctx: &Context,
        zone: &str,
        records: &[Record],
    ) -> Result<Vec<Record>, ProviderError> {
        self.set_records(ctx, zone, records).await
    }

    async fn delete_records(
        &self,
        _ctx: &Context,
        _zone: &str,
        _records: &[Record],
    ) -> Result<Vec<Record>, ProviderError> {
        Ok(Vec::new())
    }
}

pub fn provider(name: &str, fake: &Arc<FakeProvider>) -> Provider {
    Provider::new(name, "fake", Backend::ZoneAware(fake.clone()), Vec::new()).unwrap()
}

/// A dispatcher over `fakes`, named as given, in order.
pub fn dispatcher(fakes: &[(&str, &Arc<FakeProvider>)], concurrency: usize) -> Dispatcher {
    Dispatcher::new(
        fakes.iter().map(|(name, fake)| provider(name, fake)).collect(),
        concurrency,
    )
}
