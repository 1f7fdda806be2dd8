//! HTTP liveness probe
//!
//! Answers `ok!` to any method on any path. It shares nothing with the sync
//! server beyond the process.

use std::net::SocketAddr;

use axum::Router;
use tracing::info;

use crate::error::Result;

/// Build the probe router
pub fn router() -> Router {
    Router::new().fallback(alive)
}

async fn alive() -> &'static str {
    "ok!"
}

/// Serve the probe on `addr` until the listener fails
pub async fn serve(addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Liveness probe listening on {}", listener.local_addr()?);

    axum::serve(listener, router()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request, StatusCode};
    use tower::ServiceExt;

    async fn probe(method: Method, uri: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = router().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_root_answers_ok() {
        assert_eq!(
            probe(Method::GET, "/").await,
            (StatusCode::OK, "ok!".to_string())
        );
    }

    #[tokio::test]
    async fn test_any_path_and_method() {
        assert_eq!(probe(Method::POST, "/anything/else").await.1, "ok!");
        assert_eq!(probe(Method::PUT, "/healthz?x=1").await.1, "ok!");
    }
}
