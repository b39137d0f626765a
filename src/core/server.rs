use crate::utils::error::{DropError, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use url::Url;

/// Number of consecutive ports tried before falling back to an OS-assigned one.
pub const PORT_SCAN_WIDTH: u16 = 100;

/// How long `stop` waits for in-flight downloads before aborting them.
const STOP_GRACE: Duration = Duration::from_secs(5);

/// A running file server. Dropping the handle also shuts the server down.
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ServerHandle {
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stops accepting connections and waits briefly for the serve loop to
    /// exit. Safe to call more than once.
    pub async fn stop(&mut self) {
        let Some(shutdown) = self.shutdown.take() else {
            return;
        };
        let _ = shutdown.send(());

        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(STOP_GRACE, &mut task).await {
                Ok(_) => tracing::info!("File server on port {} stopped", self.port()),
                Err(_) => {
                    tracing::warn!("File server did not drain in {:?}, aborting", STOP_GRACE);
                    task.abort();
                }
            }
        }
    }
}

/// Serves `directory` on all interfaces, scanning ports from `port_start`.
pub async fn start_server(directory: &Path, port_start: u16) -> Result<ServerHandle> {
    start_server_on(directory, IpAddr::V4(Ipv4Addr::UNSPECIFIED), port_start).await
}

pub async fn start_server_on(
    directory: &Path,
    bind_ip: IpAddr,
    port_start: u16,
) -> Result<ServerHandle> {
    tokio::fs::create_dir_all(directory).await?;

    let listener = bind_listener(bind_ip, port_start, PORT_SCAN_WIDTH).await?;
    let local_addr = listener.local_addr()?;

    let router = build_router(directory.to_path_buf());
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let result = axum::serve(listener, router)
            .with_graceful_shutdown(async {
                // A dropped sender counts as a shutdown request too.
                let _ = shutdown_rx.await;
            })
            .await;
        if let Err(e) = result {
            tracing::error!("File server stopped with error: {}", e);
        }
    });

    tracing::info!(
        "Serving {} on {}",
        directory.display(),
        local_addr
    );

    Ok(ServerHandle {
        local_addr,
        shutdown: Some(shutdown_tx),
        task: Some(task),
    })
}

async fn bind_listener(ip: IpAddr, port_start: u16, width: u16) -> Result<TcpListener> {
    let end = (u32::from(port_start) + u32::from(width)).min(u32::from(u16::MAX) + 1);
    for port in u32::from(port_start)..end {
        // `end` is clamped to 65536, so every port fits.
        let port = port as u16;
        match TcpListener::bind((ip, port)).await {
            Ok(listener) => return Ok(listener),
            Err(e) => tracing::debug!("Port {} unavailable: {}", port, e),
        }
    }

    tracing::warn!(
        "Ports {}..{} all taken, letting the OS choose",
        port_start,
        end
    );
    TcpListener::bind((ip, 0))
        .await
        .map_err(|e| DropError::ServerError {
            message: format!("could not bind {}: {}", ip, e),
        })
}

fn build_router(directory: PathBuf) -> Router {
    let serve_dir = ServeDir::new(&directory);
    Router::new()
        .route("/", get(list_directory))
        .fallback_service(serve_dir)
        .with_state(Arc::new(directory))
        .layer(TraceLayer::new_for_http())
}

async fn list_directory(State(directory): State<Arc<PathBuf>>) -> Response {
    match read_listing(&directory).await {
        Ok(names) => Html(render_listing(&names)).into_response(),
        Err(e) => {
            tracing::warn!("Could not list {}: {}", directory.display(), e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Could not read serve directory").into_response()
        }
    }
}

async fn read_listing(directory: &Path) -> std::io::Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(directory).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

fn render_listing(names: &[String]) -> String {
    let mut items = String::new();
    for name in names {
        items.push_str(&format!(
            "<li><a href=\"{}\">{}</a></li>\n",
            html_escape::encode_double_quoted_attribute(&href_for(name)),
            html_escape::encode_text(name)
        ));
    }

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Kindle Drop</title>\n</head>\n<body>\n<h1>Kindle Drop</h1>\n<hr>\n\
         <ul>\n{}</ul>\n<hr>\n</body>\n</html>\n",
        items
    )
}

/// Percent-encoded absolute path for a single file name.
fn href_for(name: &str) -> String {
    let encoded = Url::parse("http://localhost/").ok().and_then(|mut url| {
        url.path_segments_mut().ok()?.pop_if_empty().push(name);
        Some(url.path().to_string())
    });
    encoded.unwrap_or_else(|| format!("/{}", name))
}
