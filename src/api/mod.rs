//! HTTP API for dynamic DNS updates, in the dyndns2 dialect spoken by most DDNS clients and
//! routers.
//!
//! Every response body is `text/plain`. When `server.users` is configured every endpoint except
//! `/favicon.ico` requires HTTP basic authentication; missing or wrong credentials are answered
//! with HTTP 401 (Unauthorized) and a `WWW-Authenticate: Basic realm="DDNS Server"` challenge.
//!
//! # API Endpoints
//!
//! ## `/nic/update` (GET)
//!
//!   Expects the query parameters:
//!
//!   * `hostname`: a comma separated list of hostnames to update (required).
//!   * `myip`: the address to write (optional). Without it, the address of the client is used,
//!     see [`ClientIpResolver`][crate::client_ip::ClientIpResolver].
//!
//!   Each hostname is matched against the zones of the configured providers, in configuration
//!   order, and the first provider with a zone containing it gets an `A` or `AAAA` record with
//!   a TTL of 5 minutes. Returns HTTP 200 (OK) with one line per requested hostname, in request
//!   order:
//!
//!   ```text
//!   good 203.0.113.9
//!   nochg 203.0.113.9
//!   nohost
//!   dnserr
//!   ```
//!
//!   `good` means the record was written, `nochg` that it already held the address, `nohost`
//!   that no provider manages the hostname, and `dnserr` that the provider failed.
//!
//!   Returns HTTP 400 (Bad Request) when `hostname` is missing or the client address can't be
//!   determined, and HTTP 424 (Failed Dependency) when every provider failed to list its zones.
//!
//! ## `/zones` (GET)
//!
//!   Returns the zones of every provider as a tree.
//!
//! ## `/lookup/{type}/{hostname}` (GET)
//!
//!   Returns the data of every `type` record named `hostname`, one per line. The type may be
//!   left out (`/lookup/{hostname}`) and defaults to `A`.
//!
//! ## `/records` (GET)
//!
//!   Returns a table of every record of every provider. Any path not listed here returns the
//!   same dump.
//!
//! ## `/favicon.ico` (GET)
//!
//!   Returns the embedded icon, honouring `If-None-Match`.

mod api_error;
mod auth;
mod favicon;
mod model;
mod routes;
pub mod server;

pub use routes::new as router;
pub use server::{new, AppState};
