use crate::context::Context;
use crate::provider::{trim_dot, ProviderError, Record, RecordProvider, Zone, ZoneLister};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// An in-process record store, keyed by zone.
///
/// Zone-aware: it lists the zones it was seeded with. Operations on any other zone fail with
/// [`ProviderError::UnknownZone`], unless the store was built to create zones on first write
/// (as the [`FileProvider`][super::file::FileProvider] does).
#[derive(Default, Debug)]
#[allow(clippy::module_name_repetitions)]
pub struct InMemoryProvider {
    zones: RwLock<BTreeMap<String, Vec<Record>>>,
    create_zones: bool,
}

fn zone_key(zone: &str) -> String {
    trim_dot(zone).to_ascii_lowercase()
}

fn same_set(a: &Record, b: &Record) -> bool {
    a.rtype == b.rtype && a.name.eq_ignore_ascii_case(&b.name)
}

impl InMemoryProvider {
    #[must_use]
    pub fn with_records(records: BTreeMap<String, Vec<Record>>) -> Self {
        InMemoryProvider {
            zones: RwLock::new(
                records
                    .into_iter()
                    .map(|(zone, records)| (zone_key(&zone), records))
                    .collect(),
            ),
            create_zones: false,
        }
    }

    pub(super) fn creating_zones(records: BTreeMap<String, Vec<Record>>) -> Self {
        InMemoryProvider {
            create_zones: true,
            ..Self::with_records(records)
        }
    }

    /// A copy of every zone and its records.
    pub async fn snapshot(&self) -> BTreeMap<String, Vec<Record>> {
        self.zones.read().await.clone()
    }

    /// Replace the whole store with `zones`, as taken by [`InMemoryProvider::snapshot`].
    pub(super) async fn restore(&self, zones: BTreeMap<String, Vec<Record>>) {
        *self.zones.write().await = zones;
    }

    async fn with_zone<T>(
        &self,
        zone: &str,
        f: impl FnOnce(&mut Vec<Record>) -> T + Send,
    ) -> Result<T, ProviderError> {
        let mut zones = self.zones.write().await;
        let key = zone_key(zone);
        let records = if self.create_zones {
            zones.entry(key).or_default()
        } else {
            zones
                .get_mut(&key)
                .ok_or_else(|| ProviderError::UnknownZone(zone.to_string()))?
        };
        Ok(f(records))
    }
}

/// Replace each `(name, type)` set named in `records`. Sets already holding exactly the
/// requested data and TTLs are left alone and not reported.
fn replace_sets(existing: &mut Vec<Record>, records: &[Record]) -> Vec<Record> {
    let mut applied = Vec::new();
    for (idx, record) in records.iter().enumerate() {
        if records[..idx].iter().any(|r| same_set(r, record)) {
            continue;
        }
        let wanted: Vec<Record> = records
            .iter()
            .filter(|r| same_set(r, record))
            .cloned()
            .collect();
        let unchanged = {
            let current: Vec<&Record> = existing.iter().filter(|r| same_set(r, record)).collect();
            current.len() == wanted.len()
                && wanted
                    .iter()
                    .all(|w| current.iter().any(|c| c.data == w.data && c.ttl == w.ttl))
        };
        if unchanged {
            continue;
        }
        existing.retain(|r| !same_set(r, record));
        existing.extend(wanted.iter().cloned());
        applied.extend(wanted);
    }
    applied
}

fn remove_matching(existing: &mut Vec<Record>, records: &[Record]) -> Vec<Record> {
    let mut removed = Vec::new();
    existing.retain(|r| {
        let hit = records
            .iter()
            .any(|d| same_set(d, r) && (d.data.is_empty() || d.data == r.data));
        if hit {
            removed.push(r.clone());
        }
        !hit
    });
    removed
}

#[async_trait::async_trait]
impl RecordProvider for InMemoryProvider {
    async fn get_records(&self, _ctx: &Context, zone: &str) -> Result<Vec<Record>, ProviderError> {
        let zones = self.zones.read().await;
        match zones.get(&zone_key(zone)) {
            Some(records) => Ok(records.clone()),
            None if self.create_zones => Ok(Vec::new()),
            None => Err(ProviderError::UnknownZone(zone.to_string())),
        }
    }

    async fn set_records(
        &self,
        _ctx: &Context,
        zone: &str,
        records: &[Record],
    ) -> Result<Vec<Record>, ProviderError> {
        self.with_zone(zone, |existing| replace_sets(existing, records))
            .await
    }

    async fn append_records(
        &self,
        _ctx: &Context,
        zone: &str,
        records: &[Record],
    ) -> Result<Vec<Record>, ProviderError> {
        self.with_zone(zone, |existing| {
            existing.extend_from_slice(records);
            records.to_vec()
        })
        .await
    }

    async fn delete_records(
        &self,
        _ctx: &Context,
        zone: &str,
        records: &[Record],
    ) -> Result<Vec<Record>, ProviderError> {
        self.with_zone(zone, |existing| remove_matching(existing, records))
            .await
    }
}

#[async_trait::async_trait]
impl ZoneLister for InMemoryProvider {
    async fn list_zones(&self, _ctx: &Context) -> Result<Vec<Zone>, ProviderError> {
        let zones = self.zones.read().await;
        Ok(zones.keys().map(|zone| Zone::new(format!("{zone}."))).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use trust_dns_proto::rr::RecordType;

    fn a(name: &str, data: &str) -> Record {
        Record::address(name, data.parse().unwrap(), Duration::from_secs(300))
    }

    fn seeded() -> InMemoryProvider {
        let mut seed = BTreeMap::new();
        seed.insert("Example.com.".to_string(), vec![a("home", "192.0.2.1")]);
        InMemoryProvider::with_records(seed)
    }

    #[tokio::test]
    async fn lists_normalized_absolute_zones() {
        let store = seeded();
        let zones = store.list_zones(&Context::background()).await.unwrap();
        assert_eq!(zones, vec![Zone::new("example.com.")]);
    }

    #[tokio::test]
    async fn set_reports_only_changed_sets() {
        let store = seeded();
        let ctx = Context::background();

        let same = store
            .set_records(&ctx, "example.com", &[a("home", "192.0.2.1")])
            .await
            .unwrap();
        assert!(same.is_empty());

        let changed = store
            .set_records(&ctx, "example.com", &[a("HOME", "192.0.2.2"), a("new", "192.0.2.3")])
            .await
            .unwrap();
        assert_eq!(changed.len(), 2);

        let records = store.get_records(&ctx, "example.com.").await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().any(|r| r.data == "192.0.2.2"));
        assert!(!records.iter().any(|r| r.data == "192.0.2.1"));
    }

    #[tokio::test]
    async fn unknown_zone_is_an_error() {
        let store = seeded();
        let err = store
            .set_records(&Context::background(), "other.com", &[a("x", "192.0.2.9")])
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownZone(zone) if zone == "other.com"));
    }

    #[tokio::test]
    async fn append_then_delete() {
        let store = seeded();
        let ctx = Context::background();
        store
            .append_records(&ctx, "example.com", &[a("home", "192.0.2.7")])
            .await
            .unwrap();
        assert_eq!(store.get_records(&ctx, "example.com").await.unwrap().len(), 2);

        let wildcard = Record {
            name: "home".to_string(),
            rtype: RecordType::A,
            ttl: Duration::ZERO,
            data: String::new(),
        };
        let removed = store
            .delete_records(&ctx, "example.com", &[wildcard])
            .await
            .unwrap();
        assert_eq!(removed.len(), 2);
        assert!(store.get_records(&ctx, "example.com").await.unwrap().is_empty());
    }
}
