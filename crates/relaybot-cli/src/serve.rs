//! SSE gateway — the HTTP surface plus server-mode orchestration.
//!
//! `relaybot sse` runs three things under one `tokio::select!`:
//! the agent's bus-driven loop, the cron service, and an axum listener
//! exposing:
//!
//! - `POST /v1/chat/completions` — SSE agent endpoint. The body is an
//!   [`SseRequest`]; the response is `text/event-stream` with
//!   `data: <json>\n\n` frames terminated by a `done` frame.
//! - `GET /health` — `{"status": "ok"}`.
//!
//! Each request gets its own context + emitter; the agent task feeds the
//! response body through a channel, so a client disconnect drops the
//! receiver and the loop's next emit unwinds it.

use std::convert::Infallible;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use futures::StreamExt;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use relaybot_agent::agent_loop::AgentLoopConfig;
use relaybot_agent::tools::registry::ToolDeps;
use relaybot_agent::tools::storage::StorageService;
use relaybot_agent::AgentLoop;
use relaybot_core::bus::queue::MessageBus;
use relaybot_core::config::load_config;
use relaybot_core::session::SessionManager;
use relaybot_cron::CronService;
use relaybot_providers::http_provider::create_provider;
use relaybot_providers::LlmRequestConfig;
use relaybot_sse::{RequestContext, SseEmitter, SseRequest};

use crate::helpers;

// ─────────────────────────────────────────────
// App state & router
// ─────────────────────────────────────────────

#[derive(Clone)]
struct ServeState {
    agent: Arc<AgentLoop>,
}

/// Build the HTTP router.
fn router(agent: Arc<AgentLoop>) -> Router {
    Router::new()
        .route("/v1/chat/completions", post(sse_chat))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(ServeState { agent })
}

// ─────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────

/// `GET /health`
async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

/// `POST /v1/chat/completions` — the unified SSE agent entry point.
async fn sse_chat(State(state): State<ServeState>, Json(req): Json<SseRequest>) -> Response {
    let ctx = Arc::new(RequestContext::from_request(&req));

    info!(
        session_id = %ctx.session_id,
        request_id = %ctx.request_id,
        agent_type = %ctx.agent_type,
        stream = ctx.stream,
        thinking = ctx.enable_thinking,
        "SSE request"
    );

    let (tx, rx) = mpsc::unbounded_channel::<String>();
    let emitter = SseEmitter::new(ctx.clone(), tx);
    let agent = state.agent.clone();
    let messages = req.message.clone();

    tokio::spawn(async move {
        match ctx.agent_type.as_str() {
            "agent" => agent.process_sse(&emitter, &messages).await,
            "workflow" => {
                let _ = emitter.emit_error("workflow agent type is not yet implemented");
                let _ = emitter.emit_done();
            }
            other => {
                let _ = emitter.emit_error(&format!("unknown agent_type: {other}"));
                let _ = emitter.emit_done();
            }
        }
    });

    let stream = UnboundedReceiverStream::new(rx).map(Ok::<_, Infallible>);

    Response::builder()
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .header("X-Accel-Buffering", "no")
        .body(Body::from_stream(stream))
        .unwrap_or_else(|e| {
            error!(error = %e, "failed to build SSE response");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        })
}

// ─────────────────────────────────────────────
// Server mode
// ─────────────────────────────────────────────

/// Run the SSE gateway until ctrl-c.
pub async fn run(port_override: Option<u16>) -> Result<()> {
    let config = load_config(None);
    let defaults = &config.agents.defaults;

    let workspace = helpers::expand_tilde(&defaults.workspace);
    std::fs::create_dir_all(&workspace)
        .with_context(|| format!("failed to create workspace: {}", workspace.display()))?;

    // Shared plumbing: one bus between the agent, cron, and future channels
    let bus = Arc::new(MessageBus::new(100));

    let model = &defaults.model;
    let providers_map = config.providers.to_map();
    let provider = create_provider(model, &providers_map).map_err(|e| anyhow::anyhow!(e))?;

    let brave_key = if config.tools.web.search.api_key.is_empty() {
        None
    } else {
        Some(config.tools.web.search.api_key.clone())
    };

    let storage = if config.storage.is_configured() {
        Some(Arc::new(StorageService::new(config.storage.clone())))
    } else {
        None
    };

    let session_manager =
        SessionManager::new(None).context("failed to create session manager")?;
    let cron_service = Arc::new(CronService::new(bus.clone(), None));

    let agent = Arc::new(AgentLoop::new(
        bus.clone(),
        Arc::new(provider),
        workspace.clone(),
        AgentLoopConfig {
            model: Some(model.to_string()),
            max_iterations: Some(defaults.max_tool_iterations as usize),
            request_config: Some(LlmRequestConfig {
                max_tokens: defaults.max_tokens,
                temperature: defaults.temperature,
            }),
            brave_api_key: brave_key,
            exec_timeout_secs: Some(config.tools.exec.timeout),
            restrict_to_workspace: config.tools.restrict_to_workspace,
            agent_name: None,
            session_manager: Some(session_manager),
            deps: ToolDeps {
                storage,
                cron: Some(cron_service.clone()),
            },
        },
    ));

    // Cron fires re-enter the agent through the direct entry point
    {
        let agent = agent.clone();
        cron_service
            .set_on_job(Arc::new(move |job: relaybot_cron::CronJob| {
                let agent = agent.clone();
                Box::pin(async move {
                    agent
                        .process_direct(&job.payload.message, "cron", &job.id)
                        .await
                })
            }))
            .await;
    }

    let port = port_override.unwrap_or(config.sse.port);
    let addr = format!("{}:{}", config.sse.host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(
        addr = %addr,
        model = %model,
        workspace = %workspace.display(),
        "SSE gateway listening"
    );
    println!("  Relaybot SSE gateway on http://{addr}");
    println!("  Ctrl+C to stop");

    let app = router(agent.clone());

    tokio::select! {
        _ = agent.run() => {
            info!("agent loop exited");
        }
        result = cron_service.start() => {
            if let Err(e) = result {
                error!(error = %e, "cron service error");
            }
        }
        result = axum::serve(listener, app) => {
            if let Err(e) = result {
                error!(error = %e, "HTTP server error");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            println!();
            println!("  Shutting down...");
            info!("received ctrl-c, shutting down");
            agent.stop();
            cron_service.stop();
        }
    }

    println!("  Gateway stopped.");
    Ok(())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
