use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{debug, error, info};

use crate::error::{Error, Result};
use crate::http::connection::Connection;
use crate::router::Dispatcher;
use crate::runtime::{Object, Service, WeakService};
use crate::server::endpoint::Endpoint;

/// A listening endpoint served on the service's main reactor.
///
/// Registered with the service, so a global stop closes it. Stopping only
/// closes the listener; connections already accepted run until their
/// peers hang up or the main reactor stops.
pub struct Server {
    endpoint: Endpoint,
    stopped: AtomicBool,
    shutdown: Arc<Notify>,
    service: WeakService,
}

impl Server {
    /// The bound endpoint, with the real port when bound to port 0.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

impl Object for Server {
    fn stop(&self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        // notify_one keeps a permit if the accept loop is not parked yet.
        self.shutdown.notify_one();

        remove_socket_file(&self.endpoint);

        if let Some(service) = self.service.upgrade() {
            service.remove_id(self as *const Server as *const () as usize);
        }
        info!(endpoint = %self.endpoint, "server stopped");
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

#[cfg(unix)]
fn remove_socket_file(endpoint: &Endpoint) {
    if let Endpoint::Local(path) = endpoint {
        if let Err(e) = std::fs::remove_file(path) {
            debug!(path = %path.display(), error = %e, "could not remove local socket");
        }
    }
}

#[cfg(not(unix))]
fn remove_socket_file(_endpoint: &Endpoint) {}

/// Binds `endpoint` on the calling thread and starts accepting on the main
/// reactor. Binding errors surface here, synchronously.
pub fn serve(service: &Service, endpoint: &Endpoint, dispatcher: Dispatcher) -> Result<Arc<Server>> {
    let shutdown = Arc::new(Notify::new());

    match endpoint {
        Endpoint::Tcp(addr) => {
            let listener = std::net::TcpListener::bind(addr).map_err(Error::Bind)?;
            listener.set_nonblocking(true).map_err(Error::Bind)?;
            let bound = Endpoint::Tcp(listener.local_addr().map_err(Error::Bind)?);

            let server = register(service, bound, shutdown.clone());
            service.spawn(async move {
                if let Err(e) = run_tcp(listener, dispatcher, shutdown).await {
                    error!(error = %e, "tcp listener failed");
                }
            })?;
            Ok(server)
        }

        #[cfg(unix)]
        Endpoint::Local(path) => {
            let listener = std::os::unix::net::UnixListener::bind(path).map_err(Error::Bind)?;
            listener.set_nonblocking(true).map_err(Error::Bind)?;

            let server = register(service, endpoint.clone(), shutdown.clone());
            service.spawn(async move {
                if let Err(e) = run_local(listener, dispatcher, shutdown).await {
                    error!(error = %e, "local listener failed");
                }
            })?;
            Ok(server)
        }
    }
}

fn register(service: &Service, endpoint: Endpoint, shutdown: Arc<Notify>) -> Arc<Server> {
    service.new_object(Server {
        endpoint,
        stopped: AtomicBool::new(false),
        shutdown,
        service: service.downgrade(),
    })
}

async fn run_tcp(
    listener: std::net::TcpListener,
    dispatcher: Dispatcher,
    shutdown: Arc<Notify>,
) -> anyhow::Result<()> {
    let listener = TcpListener::from_std(listener)?;
    info!("Listening on {}", listener.local_addr()?);

    loop {
        let accepted = tokio::select! {
            _ = shutdown.notified() => break,
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok((socket, peer)) => {
                debug!(%peer, "accepted connection");
                spawn_connection(socket, peer.to_string(), dispatcher.clone());
            }
            Err(e) => error!(error = %e, "accept failed"),
        }
    }

    Ok(())
}

#[cfg(unix)]
async fn run_local(
    listener: std::os::unix::net::UnixListener,
    dispatcher: Dispatcher,
    shutdown: Arc<Notify>,
) -> anyhow::Result<()> {
    let listener = tokio::net::UnixListener::from_std(listener)?;
    info!("Listening on {:?}", listener.local_addr()?);

    loop {
        let accepted = tokio::select! {
            _ = shutdown.notified() => break,
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok((socket, _)) => {
                debug!("accepted local connection");
                spawn_connection(socket, "local".to_string(), dispatcher.clone());
            }
            Err(e) => error!(error = %e, "accept failed"),
        }
    }

    Ok(())
}

fn spawn_connection<S>(stream: S, peer: String, dispatcher: Dispatcher)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut conn = Connection::new(stream, dispatcher);
        if let Err(e) = conn.run().await {
            error!("Connection error from {}: {}", peer, e);
        }
    });
}
