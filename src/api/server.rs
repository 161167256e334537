use crate::api::routes;
use crate::client_ip::ClientIpResolver;
use crate::config::Shared;
use crate::dispatch::Dispatcher;
use crate::error::Error;
use std::future::Future;
use std::net::SocketAddr;

#[derive(Clone)]
pub struct AppState {
    pub config: Shared,
    pub dispatcher: Dispatcher,
    pub resolver: ClientIpResolver,
}

impl AppState {
    #[must_use]
    pub fn new(config: Shared, dispatcher: Dispatcher) -> Self {
        let resolver = ClientIpResolver::from_config(&config.server);
        AppState {
            config,
            dispatcher,
            resolver,
        }
    }
}

/// Bind the configured listen address and serve the API until `shutdown` resolves.
///
/// # Errors
///
/// Returns [`Error::Http`] if the listen address can't be bound.
pub fn new(
    config: Shared,
    dispatcher: Dispatcher,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<impl Future<Output = hyper::Result<()>>, Error> {
    let listen = config.server.listen;
    let server = axum::Server::try_bind(&listen)?
        .serve(
            routes::new(AppState::new(config, dispatcher))
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown);
    Ok(server)
}
