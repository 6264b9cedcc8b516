//! HTTP front for [`AuditService`] (feature `server`).
//!
//! ```text
//! POST /api/analyze   AnalyzeRequest JSON → EvaluationRecord | { "error" }
//! GET  /healthz       "ok"
//! ```

use crate::error::AuditError;
use crate::request::{respond, AnalyzeRequest, AuditService};
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::net::SocketAddr;
use std::sync::Arc;

/// Request body ceiling: a 20 MiB upload grows by a third once base64-encoded.
pub const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

pub fn build_routes(service: AuditService) -> Router {
    Router::new()
        .route("/api/analyze", post(analyze))
        .route("/healthz", get(healthz))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(Arc::new(service))
}

/// Serve until the listener fails or ctrl-c is received.
pub async fn listen(addr: SocketAddr, service: AuditService) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening at {}", listener.local_addr()?);
    tokio::select! {
        r = axum::serve(listener, build_routes(service)) => {
            tracing::warn!("server ended unexpectedly: {:?}", &r)
        },
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received ctrl+c interrupt, closing server");
        }
    }
    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

async fn analyze(
    State(service): State<Arc<AuditService>>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> (StatusCode, Json<serde_json::Value>) {
    let (status, body) = match payload {
        Ok(Json(request)) => service.respond(request).await,
        Err(rejection) => respond(Err(AuditError::MalformedRequest {
            detail: rejection.body_text(),
        })),
    };
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuditConfig;
    use crate::document::{NormalizedDocument, RequestContext};
    use crate::pipeline::llm::Analyst;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::extract::FromRequest;
    use axum::http::{header, Request};

    struct Fixed(&'static str);

    #[async_trait]
    impl Analyst for Fixed {
        async fn analyze(
            &self,
            _ctx: &RequestContext,
            _document: &NormalizedDocument,
        ) -> Result<String, AuditError> {
            Ok(self.0.to_string())
        }
    }

    fn service(code: Option<&str>) -> Arc<AuditService> {
        let mut builder = AuditConfig::builder();
        if let Some(code) = code {
            builder = builder.access_code(code);
        }
        let reply = r#"{"globalScore":65,"maxScore":100,"percentage":65,"grade":"B","summary":"ok","criteria":[{"name":"Format","score":10,"maxScore":10,"status":"pass","details":"","recommendations":[]}],"generalRecommendations":[]}"#;
        Arc::new(AuditService::with_analyst(
            builder.build().unwrap(),
            Arc::new(Fixed(reply)),
        ))
    }

    fn request(code: Option<&str>) -> AnalyzeRequest {
        serde_json::from_value(serde_json::json!({
            "images": [{ "data": "iVBORw0KGgo=", "mediaType": "image/png" }],
            "fileName": "deck.pdf",
            "isPptx": false,
            "accessCode": code,
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn analyze_returns_record() {
        let (status, Json(body)) = analyze(State(service(None)), Ok(Json(request(None)))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["grade"], "B");
        assert_eq!(body["criteria"][0]["status"], "pass");
    }

    #[tokio::test]
    async fn wrong_code_is_forbidden() {
        let (status, Json(body)) =
            analyze(State(service(Some("pmo"))), Ok(Json(request(Some("nope"))))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body["error"].is_string());
    }

    /// Run a raw body through the real JSON extractor.
    async fn extract(body: &str) -> Result<Json<AnalyzeRequest>, JsonRejection> {
        let req = Request::builder()
            .method("POST")
            .uri("/api/analyze")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        Json::<AnalyzeRequest>::from_request(req, &()).await
    }

    #[tokio::test]
    async fn non_list_images_are_a_bad_request() {
        let payload = extract(r#"{"images":"abc","fileName":"deck.pdf","isPptx":false}"#).await;
        assert!(payload.is_ok());
        let (status, Json(body)) = analyze(State(service(None)), payload).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("images"));
    }

    #[tokio::test]
    async fn wrong_code_wins_over_malformed_images() {
        let payload = extract(r#"{"images":"abc","fileName":"deck.pdf","accessCode":"nope"}"#).await;
        let (status, _) = analyze(State(service(Some("pmo"))), payload).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn invalid_json_is_a_bad_request() {
        let payload = extract("{not json").await;
        assert!(payload.is_err());
        let (status, Json(body)) = analyze(State(service(None)), payload).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("Malformed request"));
    }

    #[tokio::test]
    async fn health() {
        assert_eq!(healthz().await, "ok");
    }
}
