use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::application::pipeline::DEFAULT_MAX_DIMENSION;
use crate::application::routes::app_router;
use crate::application::state::{AppState, AppStateConfig};
use crate::infrastructure::fetcher::{DEFAULT_FETCH_TIMEOUT, HttpImageFetcher};
use crate::infrastructure::image_processing::{DEFAULT_JPEG_QUALITY, ImageProcessor};
use crate::infrastructure::placeholders::{PlaceholderError, Placeholders};

pub const DEFAULT_PORT: u16 = 4000;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Port must be a number between 1 and 65535, got {0:?}")]
    InvalidPort(String),
    #[error("failed to bind to {address}: {source}")]
    Bind {
        address: SocketAddr,
        source: std::io::Error,
    },
    #[error("server is already running on {0}")]
    AlreadyRunning(SocketAddr),
    #[error("HTTP server failed: {0}")]
    Serve(#[source] std::io::Error),
    #[error("HTTP server task failed: {0}")]
    TaskFailed(String),
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error(transparent)]
    Placeholders(#[from] PlaceholderError),
}

/// A validated, non-zero TCP port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Port(u16);

impl Port {
    pub fn get(self) -> u16 {
        self.0
    }
}

impl FromStr for Port {
    type Err = ServerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().parse::<u16>() {
            Ok(port) if port != 0 => Ok(Self(port)),
            _ => Err(ServerError::InvalidPort(value.to_string())),
        }
    }
}

impl TryFrom<u16> for Port {
    type Error = ServerError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        if value == 0 {
            return Err(ServerError::InvalidPort(value.to_string()));
        }
        Ok(Self(value))
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: Port,
    pub static_dir: Option<PathBuf>,
    pub fetch_timeout: Duration,
    pub max_dimension: u32,
    pub jpeg_quality: u8,
}

impl ServerConfig {
    /// Defaults for everything but the port, which is validated from text.
    pub fn for_port(port: &str) -> Result<Self, ServerError> {
        Ok(Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: port.parse()?,
            static_dir: None,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            max_dimension: DEFAULT_MAX_DIMENSION,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        })
    }

    pub fn address(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port.get())
    }
}

struct RunningServer {
    local_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<std::io::Result<()>>,
}

/// HTTP server lifecycle. Dropping a running server stops it.
pub struct Server {
    address: SocketAddr,
    state: AppState,
    running: Option<RunningServer>,
}

impl Server {
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let placeholders = match &config.static_dir {
            Some(dir) => Placeholders::load(dir)?,
            None => Placeholders::embedded(),
        };
        let fetcher = HttpImageFetcher::with_timeout(config.fetch_timeout)?;

        let state = AppState::new(AppStateConfig {
            fetcher: Arc::new(fetcher),
            generator: Arc::new(ImageProcessor::new(config.jpeg_quality)),
            placeholders,
            max_dimension: config.max_dimension,
        });

        Ok(Self::with_state(config.address(), state))
    }

    pub fn with_state(address: SocketAddr, state: AppState) -> Self {
        Self {
            address,
            state,
            running: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Address the listener is bound to while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|running| running.local_addr)
    }

    /// Bind the listening socket and start serving in the background.
    ///
    /// A failure is logged once and returned to the caller.
    pub async fn start(&mut self) -> Result<SocketAddr, ServerError> {
        match self.bind_and_spawn().await {
            Ok(local_addr) => {
                info!(address = %local_addr, "started HTTP server");
                Ok(local_addr)
            }
            Err(err) => {
                error!(error = %err, "failed to start HTTP server");
                Err(err)
            }
        }
    }

    async fn bind_and_spawn(&mut self) -> Result<SocketAddr, ServerError> {
        if let Some(running) = &self.running {
            return Err(ServerError::AlreadyRunning(running.local_addr));
        }

        let listener = TcpListener::bind(self.address)
            .await
            .map_err(|source| ServerError::Bind {
                address: self.address,
                source,
            })?;
        let local_addr = listener.local_addr().map_err(|source| ServerError::Bind {
            address: self.address,
            source,
        })?;

        let (shutdown, shutdown_rx) = oneshot::channel::<()>();
        let app = app_router(self.state.clone());
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    // A dropped sender also means shut down.
                    let _ = shutdown_rx.await;
                })
                .await
        });

        self.running = Some(RunningServer {
            local_addr,
            shutdown,
            task,
        });
        Ok(local_addr)
    }

    /// Stop serving and wait for the listener to be released.
    ///
    /// In-flight requests are allowed to finish first.
    pub async fn stop(&mut self) {
        if let Some(mut running) = self.running.take() {
            info!(address = %running.local_addr, "stopping HTTP server");
            let _ = running.shutdown.send(());
            if let Err(err) = join_serve_task(&mut running.task).await {
                error!(error = %err, "HTTP server failed during shutdown");
            }
        }
    }

    /// Stop the server and consume it.
    pub async fn shutdown(mut self) {
        self.stop().await;
    }

    /// Resolve once the server stops on its own, without `stop` being called.
    ///
    /// Never resolves while the server is not running.
    pub async fn finished(&mut self) -> Result<(), ServerError> {
        let Some(running) = self.running.as_mut() else {
            return std::future::pending().await;
        };
        let result = join_serve_task(&mut running.task).await;
        self.running = None;
        result
    }
}

async fn join_serve_task(task: &mut JoinHandle<std::io::Result<()>>) -> Result<(), ServerError> {
    match task.await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(ServerError::Serve(err)),
        Err(err) => Err(ServerError::TaskFailed(err.to_string())),
    }
}

/// Run the server until Ctrl+C or SIGTERM.
pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let mut server = Server::new(config).context("failed to initialise server")?;
    server.start().await.context("failed to start server")?;

    tokio::select! {
        () = shutdown_signal() => {}
        result = server.finished() => {
            result.context("HTTP server failed")?;
            anyhow::bail!("HTTP server stopped unexpectedly");
        }
    }
    server.shutdown().await;

    info!("server shutdown complete");
    Ok(())
}

#[allow(clippy::expect_used)] // Startup: panicking is appropriate if signal handlers fail
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
