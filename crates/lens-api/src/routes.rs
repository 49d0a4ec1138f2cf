//! API routes.

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::{handle_offer, health};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .route("/offer", post(handle_offer))
        .route("/health", get(health))
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        CorsLayer::new()
            .allow_origin(parsed)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    use lens_media::{MediaResult, ObjectDetector, PipelineConfig};
    use lens_models::{Detection, SessionDescription};
    use lens_rtc::{PeerTransport, RtcError, RtcResult, SessionManager, TransportEvent, TransportFactory};

    use crate::config::ApiConfig;

    struct EchoTransport;

    #[async_trait]
    impl PeerTransport for EchoTransport {
        async fn negotiate(&self, offer: SessionDescription) -> RtcResult<SessionDescription> {
            Ok(SessionDescription::answer(offer.sdp))
        }

        async fn close(&self) -> RtcResult<()> {
            Ok(())
        }
    }

    struct EchoFactory;

    #[async_trait]
    impl TransportFactory for EchoFactory {
        async fn connect(
            &self,
        ) -> RtcResult<(Arc<dyn PeerTransport>, mpsc::Receiver<TransportEvent>)> {
            let (_tx, rx) = mpsc::channel(1);
            Ok((Arc::new(EchoTransport), rx))
        }
    }

    struct RejectingFactory;

    #[async_trait]
    impl TransportFactory for RejectingFactory {
        async fn connect(
            &self,
        ) -> RtcResult<(Arc<dyn PeerTransport>, mpsc::Receiver<TransportEvent>)> {
            Err(RtcError::transport("transport unavailable"))
        }
    }

    struct NoopDetector;

    impl ObjectDetector for NoopDetector {
        fn infer(&self, _image: &image::RgbImage) -> MediaResult<Vec<Detection>> {
            Ok(vec![])
        }

        fn name(&self) -> &'static str {
            "noop"
        }
    }

    fn test_app(factory: Arc<dyn TransportFactory>) -> Router {
        let manager = Arc::new(SessionManager::new(
            factory,
            Arc::new(NoopDetector),
            None,
            PipelineConfig::default(),
        ));
        create_router(AppState::new(ApiConfig::default(), manager), None)
    }

    fn offer_request(sdp: &str) -> Request<Body> {
        let body = serde_json::json!({ "type": "offer", "sdp": sdp }).to_string();
        Request::builder()
            .method("POST")
            .uri("/offer")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_offer_returns_answer() {
        let app = test_app(Arc::new(EchoFactory));

        let response = app.oneshot(offer_request("v=0 test")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["type"], "answer");
        assert_eq!(json["sdp"], "v=0 test");
    }

    #[tokio::test]
    async fn test_offer_with_empty_sdp_is_rejected() {
        let app = test_app(Arc::new(EchoFactory));

        let response = app.oneshot(offer_request("   ")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_transport_failure_is_a_server_error() {
        let app = test_app(Arc::new(RejectingFactory));

        let response = app.oneshot(offer_request("v=0")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(json["detail"].as_str().unwrap().contains("unavailable"));
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = test_app(Arc::new(EchoFactory));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
