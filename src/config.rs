use crate::error::Error;
use crate::throttle;
use ipnetwork::IpNetwork;
use serde::Deserialize;
use serde_with::{serde_as, DurationSeconds};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub type Shared = Arc<Config>;

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default, alias = "plugins")]
    pub providers: Vec<ProviderConfig>,
}

#[serde_as]
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub timeout: Duration,
    pub concurrency: usize,
    pub users: Option<Users>,
    pub trusted_remotes: Option<Vec<IpNetwork>>,
    #[serde(alias = "no_local_ip")]
    pub reject_local_ip: bool,
    pub wan_lookup: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            listen: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8080),
            timeout: Duration::from_secs(60),
            concurrency: throttle::DEFAULT_LIMIT,
            users: None,
            trusted_remotes: None,
            reject_local_ip: false,
            wan_lookup: true,
        }
    }
}

/// Basic authentication credentials, user name to password.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(transparent)]
pub struct Users(HashMap<String, String>);

impl Users {
    #[must_use]
    pub fn authenticate(&self, user: &str, password: &str) -> bool {
        self.0.get(user).is_some_and(|expected| expected == password)
    }
}

impl<const N: usize> From<[(&str, &str); N]> for Users {
    fn from(users: [(&str, &str); N]) -> Self {
        Users(
            users
                .into_iter()
                .map(|(user, password)| (user.to_string(), password.to_string()))
                .collect(),
        )
    }
}

/// One configured provider. Keys other than `plugin`, `name` and `zones` are handed to the
/// plugin's factory.
#[derive(Deserialize, Debug, Clone)]
pub struct ProviderConfig {
    #[serde(alias = "module")]
    pub plugin: String,
    pub name: Option<String>,
    #[serde(default)]
    pub zones: Vec<String>,
    #[serde(flatten)]
    pub options: serde_json::Map<String, serde_json::Value>,
}

impl ProviderConfig {
    /// The provider's identity: its `name`, or the plugin name.
    #[must_use]
    pub fn identity(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.plugin)
    }
}

impl Config {
    pub fn try_from_file(p: impl AsRef<Path>) -> Result<Self, Error> {
        let f = File::open(p)?;
        let reader = BufReader::new(f);
        let conf: Config = serde_json::from_reader(reader)?;
        conf.validate()?;
        Ok(conf)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.server.concurrency == 0 {
            return Err(Error::InvalidConfig(
                "server.concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_apply_to_sparse_config() {
        let conf: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(conf.server.listen, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(conf.server.concurrency, 5);
        assert_eq!(conf.server.timeout, Duration::from_secs(60));
        assert!(conf.server.wan_lookup);
        assert!(!conf.server.reject_local_ip);
        assert!(conf.providers.is_empty());
    }

    #[test]
    fn parses_full_config() {
        let conf: Config = serde_json::from_str(
            r#"{
                "server": {
                    "listen": "127.0.0.1:9000",
                    "timeout": 5,
                    "users": {"alice": "secret"},
                    "trusted_remotes": ["10.0.0.0/8", "::1/128"],
                    "no_local_ip": true
                },
                "plugins": [
                    {"module": "memory", "name": "lab", "records": {"example.com": []}},
                    {"plugin": "file", "path": "/tmp/x.json", "zones": ["example.org"]}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(conf.server.timeout, Duration::from_secs(5));
        assert!(conf.server.reject_local_ip);
        assert_eq!(conf.server.trusted_remotes.as_ref().unwrap().len(), 2);
        let users = conf.server.users.as_ref().unwrap();
        assert!(users.authenticate("alice", "secret"));
        assert!(!users.authenticate("alice", "wrong"));
        assert!(!users.authenticate("bob", "secret"));

        assert_eq!(conf.providers[0].identity(), "lab");
        assert!(conf.providers[0].options.contains_key("records"));
        assert_eq!(conf.providers[1].identity(), "file");
        assert_eq!(conf.providers[1].zones, vec!["example.org".to_string()]);
        assert_eq!(conf.providers[1].options["path"], "/tmp/x.json");
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"server": {{"concurrency": 0}}}}"#).unwrap();
        let err = Config::try_from_file(file.path()).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }
}
