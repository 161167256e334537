//! A JSON file-backed implementation of the [`RecordProvider`][super::RecordProvider] trait.
//!
//! Wraps a [`InMemoryProvider`][super::memory::InMemoryProvider] instance, persisting
//! updates to a JSON file on disk that can be reloaded across restarts.
use crate::context::Context;
use crate::error::Error;
use crate::provider::memory::InMemoryProvider;
use crate::provider::{ProviderError, Record, RecordProvider};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Mutex;

/// A file-backed record store. After each change the JSON file on disk is rewritten with the
/// new data, so it can be reloaded across restarts.
///
/// The store can't tell which zones it is authoritative for, so it must be registered with a
/// static `zones` list. Writes to a zone it hasn't seen yet create that zone.
///
/// Changes are applied one at a time. A change whose save fails is rolled back, so the store
/// never holds records the file doesn't.
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub struct FileProvider {
    store: InMemoryProvider,
    path: PathBuf,
    writer: Mutex<()>,
}

impl FileProvider {
    /// Save every zone as JSON to the provider's configured path, or return an Error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidJSON`] if a record can't be serialized to JSON.
    ///
    /// Returns [`Error::IO`] if the serialized state can't be written to the backing file path.
    pub async fn save(&self) -> Result<(), Error> {
        let _writer = self.writer.lock().await;
        self.write_state(&self.store.snapshot().await).await
    }

    /// Write `zones` next to the state file, then rename it into place.
    async fn write_state(&self, zones: &BTreeMap<String, Vec<Record>>) -> Result<(), Error> {
        let data = serde_json::to_string_pretty(zones)?;
        let staging = self.staging_path();
        let mut output_file = File::create(&staging).await?;
        output_file.write_all(data.as_bytes()).await?;
        output_file.sync_all().await?;
        tokio::fs::rename(&staging, &self.path).await?;
        Ok(())
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Load a [`FileProvider`] from the JSON state located at the given path, creating an empty
    /// state file if none exists yet, or return an Error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidJSON`] if the JSON state file is invalid.
    ///
    /// Returns [`Error::IO`] if the path can't be opened or read.
    pub async fn try_from_file(p: impl AsRef<Path>) -> Result<Self, Error> {
        let p = p.as_ref();
        let contents = match File::open(p).await {
            Ok(mut f) => {
                let mut buf = vec![];
                f.read_to_end(&mut buf).await?;
                buf
            }
            Err(err) => match err.kind() {
                ErrorKind::NotFound => Self::write_empty_state(File::create(p).await?).await?,
                _ => return Err(Error::IO(err)),
            },
        };

        let zones: BTreeMap<String, Vec<Record>> = serde_json::from_slice(&contents)?;
        Ok(Self {
            store: InMemoryProvider::creating_zones(zones),
            path: p.to_path_buf(),
            writer: Mutex::new(()),
        })
    }

    async fn write_empty_state(mut f: File) -> io::Result<Vec<u8>> {
        let default_data = serde_json::to_string_pretty(&BTreeMap::<String, Vec<Record>>::new())?;
        let default_bytes = default_data.as_bytes();
        f.write_all(default_bytes).await?;
        f.flush().await?;
        Ok(default_bytes.to_vec())
    }

    /// Save the store after a change, restoring `before` if the save fails. Must be called
    /// with the writer lock held.
    async fn persist(
        &self,
        before: BTreeMap<String, Vec<Record>>,
        changed: Vec<Record>,
    ) -> Result<Vec<Record>, ProviderError> {
        if changed.is_empty() {
            return Ok(changed);
        }
        if let Err(err) = self.write_state(&self.store.snapshot().await).await {
            self.store.restore(before).await;
            return Err(anyhow::Error::new(err)
                .context(format!("saving {}", self.path.display()))
                .into());
        }
        Ok(changed)
    }
}

#[async_trait::async_trait]
impl RecordProvider for FileProvider {
    async fn get_records(&self, ctx: &Context, zone: &str) -> Result<Vec<Record>, ProviderError> {
        self.store.get_records(ctx, zone).await
    }

    async fn set_records(
        &self,
        ctx: &Context,
        zone: &str,
        records: &[Record],
    ) -> Result<Vec<Record>, ProviderError> {
        let _writer = self.writer.lock().await;
        let before = self.store.snapshot().await;
        let changed = self.store.set_records(ctx, zone, records).await?;
        self.persist(before, changed).await
    }

    async fn append_records(
        &self,
        ctx: &Context,
        zone: &str,
        records: &[Record],
    ) -> Result<Vec<Record>, ProviderError> {
        let _writer = self.writer.lock().await;
        let before = self.store.snapshot().await;
        let changed = self.store.append_records(ctx, zone, records).await?;
        self.persist(before, changed).await
    }

    async fn delete_records(
        &self,
        ctx: &Context,
        zone: &str,
        records: &[Record],
    ) -> Result<Vec<Record>, ProviderError> {
        let _writer = self.writer.lock().await;
        let before = self.store.snapshot().await;
        let changed = self.store.delete_records(ctx, zone, records).await?;
        self.persist(before, changed).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn creates_missing_file_and_reloads_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");

        let provider = FileProvider::try_from_file(&path).await.unwrap();
        assert!(path.exists());

        let ctx = Context::background();
        let record = Record::address("home", "192.0.2.4".parse().unwrap(), Duration::from_secs(300));
        let applied = provider
            .set_records(&ctx, "example.org.", &[record.clone()])
            .await
            .unwrap();
        assert_eq!(applied, vec![record.clone()]);

        let reloaded = FileProvider::try_from_file(&path).await.unwrap();
        assert_eq!(
            reloaded.get_records(&ctx, "example.org").await.unwrap(),
            vec![record]
        );
        assert!(reloaded.get_records(&ctx, "unseen.org").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_state_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        tokio::fs::write(&path, b"not json").await.unwrap();
        let err = FileProvider::try_from_file(&path).await.unwrap_err();
        assert!(matches!(err, Error::InvalidJSON(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_zone_writes_are_all_saved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        let provider = std::sync::Arc::new(FileProvider::try_from_file(&path).await.unwrap());

        let mut writes = tokio::task::JoinSet::new();
        for i in 0..16 {
            let provider = provider.clone();
            writes.spawn(async move {
                let record =
                    Record::address("home", "192.0.2.4".parse().unwrap(), Duration::from_secs(300));
                provider
                    .set_records(&Context::background(), &format!("z{i}.org"), &[record])
                    .await
            });
        }
        while let Some(res) = writes.join_next().await {
            assert_eq!(res.unwrap().unwrap().len(), 1);
        }

        let reloaded = FileProvider::try_from_file(&path).await.unwrap();
        let zones = reloaded.store.snapshot().await;
        assert_eq!(zones.len(), 16);
        assert!(zones.values().all(|records| records.len() == 1));
        assert!(!provider.staging_path().exists());
    }

    #[tokio::test]
    async fn failed_save_leaves_store_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let state_dir = dir.path().join("state");
        std::fs::create_dir(&state_dir).unwrap();
        let path = state_dir.join("records.json");
        let provider = FileProvider::try_from_file(&path).await.unwrap();

        let ctx = Context::background();
        let record = Record::address("home", "192.0.2.4".parse().unwrap(), Duration::from_secs(300));

        std::fs::remove_dir_all(&state_dir).unwrap();
        let err = provider
            .set_records(&ctx, "example.org", &[record.clone()])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("saving"));
        assert!(provider.get_records(&ctx, "example.org").await.unwrap().is_empty());

        // Once the directory is back, the same change is applied again and saved.
        std::fs::create_dir(&state_dir).unwrap();
        let applied = provider
            .set_records(&ctx, "example.org", &[record.clone()])
            .await
            .unwrap();
        assert_eq!(applied, vec![record.clone()]);
        let reloaded = FileProvider::try_from_file(&path).await.unwrap();
        assert_eq!(
            reloaded.get_records(&ctx, "example.org").await.unwrap(),
            vec![record]
        );
    }
}
