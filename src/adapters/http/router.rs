//! Top-level router: routes plus the shared middleware stack.

use std::time::Duration;

use axum::{routing::get, Router};
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::health::health_handler;
use super::webhook::{webhook_routes, WebhookAppState};

/// Build the application router.
///
/// Every request gets an `x-request-id` (generated unless supplied), a
/// tracing span, and is cut off after `request_timeout`.
pub fn build_router(state: WebhookAppState, request_timeout: Duration) -> Router {
    Router::new()
        .merge(webhook_routes())
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TimeoutLayer::new(request_timeout)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryRoleJobStore;
    use crate::application::handlers::IngestWebhookHandler;
    use crate::domain::webhook::{signature_header, StripeWebhookVerifier};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use secrecy::SecretString;
    use std::sync::Arc;
    use tower::ServiceExt;

    const SECRET: &str = "whsec_router_test";

    fn app(store: Arc<InMemoryRoleJobStore>) -> Router {
        let verifier = StripeWebhookVerifier::new(Some(SecretString::new(SECRET.to_string())));
        let ingest = IngestWebhookHandler::new(Arc::new(verifier), store);
        build_router(WebhookAppState::new(ingest), Duration::from_secs(30))
    }

    #[tokio::test]
    async fn health_is_plain_ok() {
        let response = app(Arc::new(InMemoryRoleJobStore::new()))
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn signed_checkout_is_acknowledged_and_recorded() {
        let store = Arc::new(InMemoryRoleJobStore::new());
        let payload = serde_json::to_vec(&serde_json::json!({
            "id": "evt_router_1",
            "type": "checkout.session.completed",
            "data": { "object": { "client_reference_id": "u123" } }
        }))
        .unwrap();
        let signature = signature_header(SECRET, chrono::Utc::now().timestamp(), &payload);

        let response = app(store.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/stripe/webhook")
                    .header("Stripe-Signature", signature)
                    .header("content-type", "application/json")
                    .body(Body::from(payload))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({ "ok": true }));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn unsigned_delivery_is_bad_request() {
        let store = Arc::new(InMemoryRoleJobStore::new());

        let response = app(store.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/stripe/webhook")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn get_on_webhook_path_is_method_not_allowed() {
        let response = app(Arc::new(InMemoryRoleJobStore::new()))
            .oneshot(
                Request::builder()
                    .uri("/stripe/webhook")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
