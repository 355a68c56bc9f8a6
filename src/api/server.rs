//! Server lifecycle: binds the router to a TCP listener and runs it until
//! the shutdown future resolves.

use std::future::Future;

use tokio::net::TcpListener;

use crate::api::router::api_router;
use crate::api::types::ApiContext;

/// Serve the API on `listener` until `shutdown` completes.
pub async fn serve<F>(listener: TcpListener, ctx: ApiContext, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    let app = api_router(ctx);

    tracing::info!(%addr, "HTTP server started");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    tracing::info!("HTTP server stopped");
    Ok(())
}

/// Resolves on Ctrl-C.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::sync::oneshot;

    use crate::admin::{AdminSite, LoginWorkflow};
    use crate::db::sqlite::open_memory_database;
    use crate::messaging::MailSettings;
    use crate::notification::MemoryMailer;

    #[tokio::test]
    async fn serves_health_and_stops_on_signal() {
        let ctx = ApiContext::new(
            open_memory_database().unwrap(),
            AdminSite::configure(LoginWorkflow::AdminCredentials).unwrap(),
            Arc::new(MemoryMailer::new()),
            MailSettings::default(),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        let server = tokio::spawn(serve(listener, ctx, async move {
            let _ = rx.await;
        }));

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("\"status\":\"ok\""));

        tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }
}
