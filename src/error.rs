//! Error types.

use axum::extract::rejection::QueryRejection;

/// Error enumerates the possible DDNS server error states.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Returned when a client calls the [`/nic/update` endpoint][crate::api#nicupdate-get]
    /// without a non-empty `hostname` query parameter.
    #[error("missing required hostname")]
    MissingHostname,

    /// Returned when no valid `myip` was supplied and the transport peer address of the
    /// request is unknown.
    #[error("unable to determine client address")]
    UnknownRemote,

    /// Returned when the query string of a request can't be deserialized.
    #[error(transparent)]
    QueryExtractorRejection(#[from] QueryRejection),

    /// Returned when every registered provider failed to list its zones, leaving no way to
    /// match hostnames to a provider.
    #[error("failed to list zones: {0}")]
    ZoneListing(String),

    /// Returned at startup when a provider configuration names a plugin that isn't registered
    /// in the [`ProviderRegistry`][crate::provider::registry::ProviderRegistry].
    #[error("no plugin registered for: {0}")]
    UnknownPlugin(String),

    /// Returned at startup when two providers resolve to the same identity.
    #[error("provider \"{0}\" is configured more than once")]
    DuplicateProvider(String),

    /// Returned at startup when a provider can't list zones and has no static `zones` list.
    #[error("could not determine zones for provider \"{0}\"")]
    NoZoneSource(String),

    /// Returned at startup when a plugin rejects its provider options.
    #[error("invalid options for plugin \"{plugin}\": {source}")]
    InvalidProviderOptions {
        plugin: String,
        #[source]
        source: serde_json::Error,
    },

    /// Returned when a configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Returned when the WAN address discovery query fails or times out.
    #[error("WAN address lookup failed: {0}")]
    WanLookup(String),

    /// Returned when the bounded task set can no longer admit work.
    #[error("task admission closed")]
    ThrottleClosed,

    /// Returned when the HTTP listener can't be bound or fails while serving.
    #[error("HTTP server error: {0}")]
    Http(#[from] hyper::Error),

    /// Returned when a generic IO error occurs.
    #[error("an IO error occurred")]
    IO(#[from] std::io::Error),

    /// Returned when processing JSON from disk (e.g. when
    /// [loading a `Config`][crate::config::Config::try_from_file], or
    /// [loading a `FileProvider`][crate::provider::file::FileProvider::try_from_file]) fails
    /// due to invalid JSON content.
    #[error("invalid JSON")]
    InvalidJSON(#[from] serde_json::Error),
}
