//! Axum HTTP server for the frame and the transport bridge.
//!
//! Serves the embeddable frame page, its manifest and webhook, and the
//! bridge endpoint an external messaging client relays inbound events to.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::{DefaultBodyLimit, Request, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use bytes::Bytes;
use chrono::Utc;
use include_dir::{Dir, include_dir};
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;
use tokio::sync::oneshot;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::agent::Agent;
use crate::channels::RecordingTransport;
use crate::channels::web::types::*;
use crate::config::FrameConfig;
use crate::content::{InboundEvent, normalize};
use crate::error::ChannelError;

static WEB_STATIC_DIR: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/src/channels/web/static");
const WEB_STATIC_FS_ROOT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/src/channels/web/static");

const WEBHOOK_SERVICE: &str = "Aria Farcaster Webhook";
const XMTP_CHAT_BASE: &str = "https://xmtp.chat/dm";
const PROJECT_URL: &str = "https://aria.chat";

/// Shared state for all gateway handlers.
pub struct GatewayState {
    /// Agent the bridge runs inbound events through.
    pub agent: Arc<Agent>,
    pub frame: FrameConfig,
    /// Bearer token for the bridge. Open when unset.
    pub auth_token: Option<SecretString>,
    /// Shutdown signal sender.
    pub shutdown_tx: tokio::sync::RwLock<Option<oneshot::Sender<()>>>,
}

impl GatewayState {
    pub fn new(agent: Arc<Agent>, frame: FrameConfig, auth_token: Option<SecretString>) -> Self {
        Self {
            agent,
            frame,
            auth_token,
            shutdown_tx: tokio::sync::RwLock::new(None),
        }
    }

    /// Stop the server started by [`start_server`].
    pub async fn shutdown(&self) {
        if let Some(tx) = self.shutdown_tx.write().await.take() {
            let _ = tx.send(());
        }
    }
}

/// All gateway routes, without binding a listener.
pub fn router(state: Arc<GatewayState>) -> Router {
    // The manifest is fetched cross-origin by frame hosts.
    let manifest_cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET]);

    let manifest = Router::new()
        .route("/api/manifest", get(manifest_handler))
        .route("/.well-known/farcaster.json", get(manifest_handler))
        .layer(manifest_cors);

    let public = Router::new()
        .route("/", get(index_handler))
        .route("/favicon.ico", get(favicon_handler))
        .route("/api/health", get(health_handler))
        .route(
            "/api/webhook",
            get(webhook_status_handler).post(webhook_handler),
        );

    let bridge = Router::new()
        .route("/api/inbound", axum::routing::post(inbound_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            bridge_auth_middleware,
        ));

    Router::new()
        .merge(manifest)
        .merge(public)
        .merge(bridge)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(1024 * 1024)) // 1 MB max request body
        .with_state(state)
}

/// Start the gateway HTTP server.
///
/// Returns the actual bound `SocketAddr` (useful when binding to port 0).
pub async fn start_server(
    addr: SocketAddr,
    state: Arc<GatewayState>,
) -> Result<SocketAddr, ChannelError> {
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        ChannelError::StartupFailed {
            name: "gateway".to_string(),
            reason: format!("Failed to bind to {}: {}", addr, e),
        }
    })?;
    let bound_addr = listener
        .local_addr()
        .map_err(|e| ChannelError::StartupFailed {
            name: "gateway".to_string(),
            reason: format!("Failed to get local addr: {}", e),
        })?;

    let app = router(state.clone());

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    *state.shutdown_tx.write().await = Some(shutdown_tx);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Web gateway shutting down");
            })
            .await
        {
            tracing::error!("Web gateway server error: {}", e);
        }
    });

    tracing::info!(addr = %bound_addr, "Web gateway listening");
    Ok(bound_addr)
}

// --- Auth ---

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

async fn bridge_auth_middleware(
    State(state): State<Arc<GatewayState>>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(expected) = &state.auth_token {
        let authorized = bearer_token(request.headers()).is_some_and(|token| {
            bool::from(token.as_bytes().ct_eq(expected.expose_secret().as_bytes()))
        });
        if !authorized {
            return error_response(StatusCode::UNAUTHORIZED, "Invalid or missing auth token");
        }
    }
    next.run(request).await
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

// --- Static pages ---

fn read_static_asset(filename: &str) -> Option<String> {
    let mut path = PathBuf::from(WEB_STATIC_FS_ROOT);
    path.push(filename);
    if let Ok(contents) = std::fs::read_to_string(path) {
        return Some(contents);
    }
    WEB_STATIC_DIR
        .get_file(filename)
        .and_then(|file| file.contents_utf8())
        .map(str::to_string)
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Fill the frame page template from config.
pub fn render_index(template: &str, frame: &FrameConfig, chat_url: &str) -> String {
    [
        ("{{IMAGE_URL}}", frame.url("/api/image")),
        ("{{HOME_URL}}", frame.url("")),
        ("{{CHAT_URL}}", chat_url.to_string()),
        ("{{PROJECT_URL}}", PROJECT_URL.to_string()),
        ("{{SUBTITLE}}", frame.subtitle.clone()),
    ]
    .iter()
    .fold(template.to_string(), |page, (placeholder, value)| {
        page.replace(placeholder, &escape_html(value))
    })
}

fn chat_url(state: &GatewayState) -> String {
    match &state.agent.config().agent_address {
        Some(address) => format!("{XMTP_CHAT_BASE}/{address}"),
        None => state.frame.url(""),
    }
}

async fn index_handler(State(state): State<Arc<GatewayState>>) -> Response {
    let Some(template) = read_static_asset("index.html") else {
        return (StatusCode::NOT_FOUND, "Not found").into_response();
    };
    let mut response = Html(render_index(&template, &state.frame, &chat_url(&state))).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store, max-age=0"),
    );
    response
}

async fn favicon_handler() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

// --- Frame API ---

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        channel: "gateway",
    })
}

async fn manifest_handler(State(state): State<Arc<GatewayState>>) -> Json<FrameManifest> {
    Json(FrameManifest::from_config(&state.frame))
}

async fn webhook_status_handler() -> Json<WebhookStatus> {
    Json(WebhookStatus {
        status: "ok",
        service: WEBHOOK_SERVICE,
        timestamp: Utc::now(),
    })
}

async fn webhook_handler(body: Bytes) -> Response {
    let event: WebhookEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!("Rejected malformed webhook payload: {e}");
            return error_response(StatusCode::BAD_REQUEST, format!("Invalid JSON: {e}"));
        }
    };

    let fid = event.data_field("fid");
    match event.kind() {
        WebhookEventKind::Opened => {
            tracing::info!(event = "frame_opened", fid = ?fid, "Frame opened")
        }
        WebhookEventKind::Closed => {
            tracing::info!(event = "frame_closed", fid = ?fid, "Frame closed")
        }
        WebhookEventKind::ButtonClicked => tracing::info!(
            event = "frame_button_clicked",
            fid = ?fid,
            button = ?event.data_field("button"),
            "Frame button clicked"
        ),
        WebhookEventKind::Other => tracing::info!(
            event = "frame_unknown_event",
            event_type = ?event.event_type,
            "Unknown frame event"
        ),
    }

    Json(WebhookAck {
        success: true,
        message: "Webhook received successfully",
        timestamp: Utc::now(),
    })
    .into_response()
}

// --- Bridge ---

async fn inbound_handler(State(state): State<Arc<GatewayState>>, body: Bytes) -> Response {
    let event: InboundEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, format!("Invalid event: {e}")),
    };
    let message = match normalize(event) {
        Ok(message) => message,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    let transport = RecordingTransport::new();
    state.agent.handle(&message, &transport).await;

    Json(BridgeResponse {
        message_id: message.id,
        sends: transport.take(),
    })
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::config::AgentConfig;

    fn state(token: Option<&str>) -> Arc<GatewayState> {
        Arc::new(GatewayState::new(
            Arc::new(Agent::new(AgentConfig::default())),
            FrameConfig::default(),
            token.map(|t| SecretString::from(t.to_string())),
        ))
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[test]
    fn index_template_is_escaped() {
        let frame = FrameConfig {
            subtitle: "<b>hi</b> & \"bye\"".to_string(),
            ..FrameConfig::default()
        };
        let page = render_index("{{SUBTITLE}} {{IMAGE_URL}}", &frame, "x");
        assert_eq!(
            page,
            "&lt;b&gt;hi&lt;/b&gt; &amp; &quot;bye&quot; https://aria-miniapp.vercel.app/api/image"
        );
    }

    #[test]
    fn bearer_token_requires_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(bearer_token(&headers), Some("abc"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);
    }

    #[tokio::test]
    async fn manifest_is_served_with_cors() {
        let response = router(state(None))
            .oneshot(
                Request::builder()
                    .uri("/.well-known/farcaster.json")
                    .header(header::ORIGIN, "https://warpcast.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
        let json = body_json(response).await;
        assert_eq!(json["frame"]["name"], "aria");
        assert_eq!(json["frame"]["primaryCategory"], "entertainment");
    }

    #[tokio::test]
    async fn index_page_has_frame_meta() {
        let response = router(state(None))
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let page = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(page.contains("fc:frame"));
        assert!(page.contains("https://aria-miniapp.vercel.app/api/image"));
        assert!(!page.contains("{{"));
    }

    #[tokio::test]
    async fn webhook_acknowledges_events() {
        let response = router(state(None))
            .oneshot(post(
                "/api/webhook",
                r#"{"type":"frame.opened","data":{"fid":1}}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "Webhook received successfully");
        assert!(json["timestamp"].is_string());
    }

    #[tokio::test]
    async fn webhook_rejects_malformed_json() {
        let response = router(state(None))
            .oneshot(post("/api/webhook", "{not json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn webhook_status() {
        let response = router(state(None))
            .oneshot(Request::builder().uri("/api/webhook").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["service"], WEBHOOK_SERVICE);
    }

    #[tokio::test]
    async fn bridge_requires_token_when_configured() {
        let app = router(state(Some("s3cret")));
        let event = r#"{"senderInboxId":"alice","contentType":"xmtp.org/text:1.0","content":"/help"}"#;

        let response = app.clone().oneshot(post("/api/inbound", event)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let mut request = post("/api/inbound", event);
        request.headers_mut().insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer s3cret"),
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn bridge_runs_the_pipeline() {
        let response = router(state(None))
            .oneshot(post(
                "/api/inbound",
                r#"{"id":"m1","senderInboxId":"alice","contentType":{"authorityId":"xmtp.org","typeId":"text","versionMajor":1,"versionMinor":0},"content":"/about"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["messageId"], "m1");
        let sends = json["sends"].as_array().unwrap();
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0]["kind"], "text");
        assert_eq!(sends[0]["reference"], "m1");
        assert_eq!(sends[0]["contentType"], "xmtp.org/text:1.0");
    }

    #[tokio::test]
    async fn bridge_rejects_malformed_content() {
        let response = router(state(None))
            .oneshot(post(
                "/api/inbound",
                r#"{"senderInboxId":"alice","contentType":"xmtp.org/text:1.0","content":42}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
