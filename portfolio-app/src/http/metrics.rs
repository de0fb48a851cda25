use axum::routing::get;
use axum::Router;
use axum_prometheus::metrics_exporter_prometheus::PrometheusHandle;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::error;

pub(crate) async fn start(bind: SocketAddr, handle: PrometheusHandle) -> anyhow::Result<()> {
    // Bind everything now to catch any errors before spinning up the coroutines
    let listener = TcpListener::bind(bind).await?;

    let app = Router::new().route("/metrics", get(|| async move { handle.render() }));

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics HTTP server stopped: {e}");
        }
    });
    Ok(())
}
