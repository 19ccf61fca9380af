//! gRPC server setup and lifecycle.

use crate::cog::Cog;
use crate::config::ServerConfig;
use crate::error::{CogError, Result};
use crate::proto::v1::{cog_service_server::CogServiceServer, FILE_DESCRIPTOR_SET};
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::server::Router;
use tonic::transport::Server;
use tracing::{error, info};

/// gRPC server wrapper for the Cog.
///
/// Owns service registration and the optional reflection and health services.
#[derive(Debug)]
pub struct GrpcServer {
    config: ServerConfig,
    cog: Cog,
}

impl GrpcServer {
    pub fn new(config: ServerConfig, cog: Cog) -> Self {
        Self { config, cog }
    }

    async fn router(&self) -> Result<Router> {
        let mut server = Server::builder()
            .http2_keepalive_interval(Some(Duration::from_secs(
                self.config.keepalive_interval_seconds,
            )))
            .http2_keepalive_timeout(Some(Duration::from_secs(
                self.config.keepalive_timeout_seconds,
            )))
            .max_concurrent_streams(Some(self.config.max_concurrent_streams));

        let mut router = server.add_service(CogServiceServer::new(self.cog.clone()));

        if self.config.enable_reflection {
            let reflection_service = tonic_reflection::server::Builder::configure()
                .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
                .build_v1()
                .map_err(|e| {
                    CogError::TransportError(format!("Failed to build reflection service: {e}"))
                })?;

            router = router.add_service(reflection_service);
            info!("gRPC reflection service enabled");
        }

        if self.config.enable_health_service {
            let (mut health_reporter, health_service) = tonic_health::server::health_reporter();
            health_reporter
                .set_serving::<CogServiceServer<Cog>>()
                .await;

            router = router.add_service(health_service);
            info!("gRPC health service (grpc.health.v1) enabled");
        }

        Ok(router)
    }

    /// Serve on the configured address until Ctrl-C.
    pub async fn serve(self) -> Result<()> {
        self.serve_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for Ctrl-C");
                return;
            }
            info!("Ctrl-C received, shutting down");
        })
        .await
    }

    /// Serve on the configured address until `signal` resolves, then drain in-flight calls.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let addr: SocketAddr = self.config.socket_addr()?;
        info!(
            address = %addr,
            reflection = self.config.enable_reflection,
            health = self.config.enable_health_service,
            steps = self.cog.registry().len(),
            "Starting Cog gRPC server"
        );

        self.router()
            .await?
            .serve_with_shutdown(addr, signal)
            .await
            .map_err(|e| {
                error!(error = %e, "Cog gRPC server error");
                CogError::from(e)
            })
    }

    /// Serve on an already bound listener. Used when the port is chosen by the OS.
    pub async fn serve_with_listener<F>(self, listener: TcpListener, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        if let Ok(addr) = listener.local_addr() {
            info!(address = %addr, "Starting Cog gRPC server on bound listener");
        }

        self.router()
            .await?
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), signal)
            .await
            .map_err(CogError::from)
    }

    /// Start the server in the background.
    ///
    /// Returns a handle that can be used to stop the server.
    pub fn spawn(self) -> GrpcServerHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let bind_address = self.config.bind_address.clone();

        let handle = tokio::spawn(async move {
            let shutdown = async {
                let _ = shutdown_rx.await;
                info!("Cog gRPC server shutting down");
            };
            self.serve_with_shutdown(shutdown).await
        });

        GrpcServerHandle {
            shutdown_tx: Some(shutdown_tx),
            handle,
            bind_address,
        }
    }
}

/// Handle for a running gRPC server.
#[derive(Debug)]
pub struct GrpcServerHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<Result<()>>,
    bind_address: String,
}

impl GrpcServerHandle {
    pub fn bind_address(&self) -> &str {
        &self.bind_address
    }

    /// Stop the server and wait for it to drain.
    pub async fn stop(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.handle
            .await
            .map_err(|e| CogError::TransportError(format!("gRPC server task failed: {e}")))?
    }
}
