use crate::context::Context;
use crate::provider::{ProviderError, Record, RecordProvider, Zone, ZoneLister};
use std::sync::Arc;

/// Decorator giving a backend a fixed zone list. Record operations are forwarded unchanged;
/// zone listing answers the configured zones without consulting the backend.
pub struct StaticZones<P: ?Sized> {
    inner: Arc<P>,
    zones: Vec<Zone>,
}

impl<P: RecordProvider + ?Sized> StaticZones<P> {
    pub fn new(inner: Arc<P>, zones: &[String]) -> Self {
        StaticZones {
            inner,
            zones: zones.iter().map(Zone::new).collect(),
        }
    }
}

#[async_trait::async_trait]
impl<P: RecordProvider + ?Sized> RecordProvider for StaticZones<P> {
    async fn get_records(&self, ctx: &Context, zone: &str) -> Result<Vec<Record>, ProviderError> {
        self.inner.get_records(ctx, zone).await
    }

    async fn set_records(
        &self,
        ctx: &Context,
        zone: &str,
        records: &[Record],
    ) -> Result<Vec<Record>, ProviderError> {
        self.inner.set_records(ctx, zone, records).await
    }

    async fn append_records(
        &self,
        ctx: &Context,
        zone: &str,
        records: &[Record],
    ) -> Result<Vec<Record>, ProviderError> {
        self.inner.append_records(ctx, zone, records).await
    }

    async fn delete_records(
        &self,
        ctx: &Context,
        zone: &str,
        records: &[Record],
    ) -> Result<Vec<Record>, ProviderError> {
        self.inner.delete_records(ctx, zone, records).await
    }
}

#[async_trait::async_trait]
impl<P: RecordProvider + ?Sized> ZoneLister for StaticZones<P> {
    async fn list_zones(&self, _ctx: &Context) -> Result<Vec<Zone>, ProviderError> {
        Ok(self.zones.clone())
    }
}
