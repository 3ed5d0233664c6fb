//! Blog server bootstrap

use crate::common::{Config, Error, Result, StorageBackend};
use crate::engine::Client;
use crate::service::grpc::BlogGrpcService;
use crate::service::http::{create_router, AdminState};
use crate::service::repository::BlogRepository;
use std::future::Future;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

pub struct BlogServer {
    config: Config,
}

impl BlogServer {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Open the configured engine.
    pub fn connect(&self) -> Result<Client> {
        let storage = &self.config.storage;
        let client = match storage.backend {
            StorageBackend::Memory => Client::memory(),
            #[cfg(feature = "sled")]
            StorageBackend::Sled => Client::open_sled(&storage.path)?,
            #[cfg(not(feature = "sled"))]
            StorageBackend::Sled => {
                return Err(Error::InvalidConfig(
                    "sled backend requires the sled-backend feature".into(),
                ))
            }
        };
        client.ping()?;
        Ok(client)
    }

    /// Bind the configured address and serve until Ctrl-C.
    pub async fn serve(self) -> Result<()> {
        let listener = TcpListener::bind(self.config.server.grpc_addr).await?;
        self.serve_with_listener(listener, shutdown_signal()).await
    }

    /// Serve gRPC on `listener` (and the admin API when configured) until `shutdown` resolves.
    pub async fn serve_with_listener<S>(self, listener: TcpListener, shutdown: S) -> Result<()>
    where
        S: Future<Output = ()> + Send + 'static,
    {
        let storage = &self.config.storage;
        tracing::info!("Starting blog server");
        tracing::info!("  gRPC API: {}", listener.local_addr()?);
        if let Some(addr) = self.config.server.http_addr {
            tracing::info!("  HTTP API: {}", addr);
        }
        tracing::info!("  Storage: {:?} ({})", storage.backend, storage.path.display());
        tracing::info!("  Collection: {}.{}", storage.database, storage.collection);

        let client = self.connect()?;
        let collection = client
            .database(&storage.database)
            .collection(&storage.collection)?;
        tracing::info!("connected to document store");

        let repo = BlogRepository::new(collection.clone()).with_batch_size(storage.scan_batch_size);
        let service =
            BlogGrpcService::new(repo).with_stream_buffer(self.config.server.stream_buffer);

        let reflection = tonic_reflection::server::Builder::configure()
            .register_encoded_file_descriptor_set(crate::proto::FILE_DESCRIPTOR_SET)
            .register_encoded_file_descriptor_set(tonic_reflection::pb::v1::FILE_DESCRIPTOR_SET)
            .build_v1()
            .map_err(|e| Error::Internal(format!("failed to build reflection service: {}", e)))?;

        let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
        tokio::spawn(async move {
            shutdown.await;
            let _ = stop_tx.send(true);
        });

        let admin = match self.config.server.http_addr {
            Some(addr) => {
                let http_listener = TcpListener::bind(addr).await?;
                let router = create_router(AdminState {
                    collection: collection.clone(),
                });
                let mut stop = stop_rx.clone();
                Some(tokio::spawn(async move {
                    let res = axum::serve(http_listener, router)
                        .with_graceful_shutdown(async move {
                            let _ = stop.wait_for(|stopped| *stopped).await;
                        })
                        .await;
                    if let Err(e) = res {
                        tracing::error!("HTTP server error: {}", e);
                    }
                }))
            }
            None => None,
        };

        let mut stop = stop_rx;
        tracing::info!("✓ Blog server ready");
        let res = tonic::transport::Server::builder()
            .layer(ServiceBuilder::new().layer(TraceLayer::new_for_grpc()).into_inner())
            .add_service(service.into_server())
            .add_service(reflection)
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async move {
                let _ = stop.wait_for(|stopped| *stopped).await;
            })
            .await;

        if let Some(handle) = admin {
            let _ = handle.await;
        }
        client.flush().await?;
        tracing::info!("blog server stopped");

        res.map_err(Into::into)
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("received interrupt signal, shutting down gracefully"),
        Err(e) => tracing::error!("failed to listen for shutdown signal: {}", e),
    }
}
