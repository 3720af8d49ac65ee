pub mod service;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use log::{debug, error, info, warn};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::{Notify, watch},
    task::JoinSet,
};
use tokio_rustls::TlsAcceptor;

use crate::{
    config::Config, error::ReloadError, reload::Reloader, tls::acceptor::build_tls_acceptor,
};

const SHUTDOWN_WAIT_PERIOD: u64 = 15; // seconds

/// An HTTPS server whose certificates can be swapped through its [`Reloader`] while it runs.
pub struct Server {
    /// The configuration for the server
    config: Config,

    /// Handle to the certificate store used for every handshake
    reloader: Reloader,

    /// The shutdown signal for the server
    signal: Arc<Notify>,

    /// Whether to shut down on Ctrl+C (default: true)
    graceful_shutdown: bool,
}

impl Server {
    pub fn new(config: Config, reloader: Reloader) -> Self {
        debug!("Creating a new hotcert server instance");

        Server {
            config,
            reloader,
            signal: Arc::new(Notify::new()),
            graceful_shutdown: true,
        }
    }

    /// Build a server and a reloader from the certificates listed in `config`
    pub fn from_config(config: Config) -> Result<Self, ReloadError> {
        let reloader = Reloader::with_store(Default::default());
        reloader.apply_config(&config)?;
        Ok(Self::new(config, reloader))
    }

    pub fn reloader(&self) -> &Reloader {
        &self.reloader
    }

    pub fn set_graceful_shutdown(&mut self, graceful: bool) {
        debug!("Setting graceful shutdown to {graceful}");
        self.graceful_shutdown = graceful;
    }

    /// A handle that stops the accept loop when notified
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.signal)
    }

    /// Watch for a shutdown signal (like Ctrl+C) and notify the server to shut down gracefully.
    fn watch_for_shutdown(&self) {
        if !self.graceful_shutdown {
            debug!("Graceful shutdown is disabled, skipping signal watcher");
            return;
        }

        debug!("Setting up Ctrl+C signal handler for graceful shutdown");

        let signal = Arc::clone(&self.signal);
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to install Ctrl+C handler: {e}");
                return;
            }

            debug!("Received shutdown signal, shutting down the server...");
            signal.notify_waiters();
        });
    }

    pub fn get_socket_address(&self) -> Result<SocketAddr, ReloadError> {
        self.config.socket_address()
    }

    /// Bind the configured address and serve until shutdown
    pub async fn run(&self) -> Result<(), ReloadError> {
        let listener = self.make_tcp_listener().await?;
        self.serve(listener).await
    }

    /// Run the accept loop on an already bound listener.
    ///
    /// Each connection completes its TLS handshake in its own task, so a slow or failing
    /// handshake never holds up the loop.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ReloadError> {
        let acceptor = build_tls_acceptor(self.reloader.resolver())?;
        if let Ok(addr) = listener.local_addr() {
            info!("Listening for TLS connections on {addr}");
        }

        self.watch_for_shutdown();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                _ = self.signal.notified() => {
                    drop(listener);
                    debug!("Shutdown signal received, exiting server loop");
                    break;
                }

                connection = listener.accept() => {
                    let (stream, addr) = connection.map_err(ReloadError::FailedToAcceptConnection)?;
                    debug!("Accepted connection from {addr}");
                    connections.spawn(handle_connection(
                        acceptor.clone(),
                        stream,
                        addr,
                        shutdown_rx.clone(),
                    ));
                }

                // Reap finished connections so the set does not grow unbounded
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }

        let _ = shutdown_tx.send(true);

        let drain = async { while connections.join_next().await.is_some() {} };
        tokio::select! {
            _ = drain => {
                debug!("Closed all connections gracefully");
                Ok(())
            }
            _ = tokio::time::sleep(Duration::from_secs(SHUTDOWN_WAIT_PERIOD)) => {
                error!("Timed out wait for all connections to close");
                Err(ReloadError::TimeoutWaitingForConnections)
            }
        }
    }

    /// Create the default TCP listener
    async fn make_tcp_listener(&self) -> Result<TcpListener, ReloadError> {
        let socket_addr = self.get_socket_address()?;
        TcpListener::bind(socket_addr)
            .await
            .map_err(ReloadError::FailedToBind)
    }
}

async fn handle_connection(
    acceptor: TlsAcceptor,
    stream: TcpStream,
    addr: SocketAddr,
    mut shutdown: watch::Receiver<bool>,
) {
    let tls_stream = match acceptor.accept(stream).await {
        Ok(tls_stream) => tls_stream,
        Err(e) => {
            warn!("TLS handshake with {addr} failed: {e}");
            return;
        }
    };

    let server_name = tls_stream.get_ref().1.server_name().map(str::to_string);
    debug!("TLS handshake with {addr} completed, SNI: {server_name:?}");

    let io = TokioIo::new(tls_stream);
    let connection = http1::Builder::new().serve_connection(io, service::Service::new(server_name));
    tokio::pin!(connection);

    let result = tokio::select! {
        result = connection.as_mut() => result,
        _ = shutdown.changed() => {
            connection.as_mut().graceful_shutdown();
            connection.await
        }
    };

    if let Err(err) = result {
        error!("Failed to serve connection from {addr}: {err:?}");
    }
}
