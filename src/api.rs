use axum::{
    routing::get,
    Json,
    Router,
};
use serde::Serialize;
use tracing::info;

use std::net::SocketAddr;

#[derive(Debug, Serialize)]
struct ApiInfo {
    message: &'static str,
}

async fn api_info() -> Json<ApiInfo> {
    Json(ApiInfo {
        message: "An API for use with your Dapp!",
    })
}

/// The informational router: a single read-only route used as a liveness
/// check. Nothing in the oracle core depends on it.
pub fn router() -> Router {
    Router::new().route("/api", get(api_info))
}

pub async fn serve(addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "informational api listening");
    axum::serve(listener, router()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{
            to_bytes,
            Body,
        },
        http::{
            Request,
            StatusCode,
        },
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn api_route_reports_liveness() {
        let response = router()
            .oneshot(Request::builder().uri("/api").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "An API for use with your Dapp!");
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let response = router()
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
