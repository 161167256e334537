//! DDNS Server
//!
//! A dynamic DNS update server speaking the dyndns2 `/nic/update` protocol used by most routers
//! and DDNS clients, writing the client's address into the zones of one or more DNS providers.
//!
//! Each requested hostname is routed to the first configured provider managing a zone that
//! contains it. Provider calls are fanned out concurrently, bounded by a small
//! [`Throttle`][throttle::Throttle], and cancelled when the request goes away. The client's
//! address can be given explicitly, taken from the connection, or recovered from the
//! `X-Forwarded-For` chain of a trusted reverse proxy.
//!
//! Providers are built at startup by a [`ProviderRegistry`][provider::registry::ProviderRegistry]
//! from plugins linked into the binary.
#![warn(clippy::pedantic)]

pub mod api;
pub mod cli;
pub mod client_ip;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod dump;
pub mod error;
pub mod provider;
pub mod throttle;
pub mod wan;

pub use api::new as new_http;
pub use client_ip::ClientIpResolver;
pub use config::{Config, Shared};
pub use context::{CancelHandle, Context};
pub use dispatch::{Dispatcher, Status, UpdateBatch};
pub use provider::file::FileProvider;
pub use provider::memory::InMemoryProvider;
