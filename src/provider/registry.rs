//! Provider registry.
//!
//! Maps plugin names to factories that build a [`Backend`] from the provider's JSON options.
//! Plugins are linked into the binary and registered up front; [`ProviderRegistry::build`] then
//! turns the configured provider list into the ordered, immutable set of [`Provider`]s the
//! dispatch engine works with.

use crate::config::ProviderConfig;
use crate::error::Error;
use crate::provider::file::FileProvider;
use crate::provider::memory::InMemoryProvider;
use crate::provider::{Backend, Provider, Record};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

/// Builds a backend from its plugin options.
#[async_trait::async_trait]
pub trait ProviderFactory: Send + Sync {
    async fn create(&self, plugin: &str, options: &Map<String, Value>) -> Result<Backend, Error>;
}

#[derive(Default)]
pub struct ProviderRegistry {
    factories: HashMap<String, Box<dyn ProviderFactory>>,
}

impl ProviderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the `memory` and `file` plugins.
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register("memory", Box::new(MemoryFactory));
        registry.register("file", Box::new(FileFactory));
        registry
    }

    pub fn register(&mut self, plugin: impl Into<String>, factory: Box<dyn ProviderFactory>) {
        self.factories.insert(plugin.into(), factory);
    }

    #[must_use]
    pub fn has_plugin(&self, plugin: &str) -> bool {
        self.factories.contains_key(plugin)
    }

    /// Registered plugin names, sorted.
    #[must_use]
    pub fn plugins(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Build every configured provider, in configuration order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownPlugin`], [`Error::DuplicateProvider`] or
    /// [`Error::NoZoneSource`] for misconfigured entries, or the factory's own error.
    pub async fn build(&self, configs: &[ProviderConfig]) -> Result<Vec<Provider>, Error> {
        let mut seen = HashSet::new();
        let mut providers = Vec::with_capacity(configs.len());
        for config in configs {
            let name = config.identity();
            if !seen.insert(name.to_string()) {
                return Err(Error::DuplicateProvider(name.to_string()));
            }
            let factory = self
                .factories
                .get(&config.plugin)
                .ok_or_else(|| Error::UnknownPlugin(config.plugin.clone()))?;
            let backend = factory.create(&config.plugin, &config.options).await?;
            let provider = Provider::new(name, &config.plugin, backend, config.zones.clone())?;
            tracing::debug!(
                "registered provider {name} (plugin {}, zones {:?})",
                config.plugin,
                provider.zone_source()
            );
            providers.push(provider);
        }
        Ok(providers)
    }
}

fn options<T: DeserializeOwned>(plugin: &str, options: &Map<String, Value>) -> Result<T, Error> {
    serde_json::from_value(Value::Object(options.clone())).map_err(|source| {
        Error::InvalidProviderOptions {
            plugin: plugin.to_string(),
            source,
        }
    })
}

struct MemoryFactory;

#[derive(Deserialize)]
struct MemoryOptions {
    #[serde(default)]
    records: BTreeMap<String, Vec<Record>>,
}

#[async_trait::async_trait]
impl ProviderFactory for MemoryFactory {
    async fn create(&self, plugin: &str, opts: &Map<String, Value>) -> Result<Backend, Error> {
        let opts: MemoryOptions = options(plugin, opts)?;
        Ok(Backend::ZoneAware(Arc::new(InMemoryProvider::with_records(
            opts.records,
        ))))
    }
}

struct FileFactory;

#[derive(Deserialize)]
struct FileOptions {
    path: PathBuf,
}

#[async_trait::async_trait]
impl ProviderFactory for FileFactory {
    async fn create(&self, plugin: &str, opts: &Map<String, Value>) -> Result<Backend, Error> {
        let opts: FileOptions = options(plugin, opts)?;
        let provider = FileProvider::try_from_file(&opts.path).await?;
        Ok(Backend::Records(Arc::new(provider)))
    }
}
