use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use axum::Json;
use axum::extract::multipart::Multipart;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Query, Request, State};
use axum::http::{Method, StatusCode};
use axum::middleware::{self, Next};
use axum::routing::{get, post};
use axum::{
    Router,
    response::{IntoResponse, Response as AxumResponse},
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::Mutex as TokioMutex;
use tower_http::trace::TraceLayer;

use crate::config::models::ConfigDocument;
use crate::config::validation::ConfigValidator;
use crate::core::Compiler;
use crate::metrics::{CompileTimer, record_compilation, record_config_save};
use crate::ports::cert_store::{CertError, CertificateStore};
use crate::ports::config_store::ConfigStore;
use crate::ports::proxy_control::{CommandOutput, ProxyCommand, ProxyControl};

const UPLOAD_LIMIT_BYTES: usize = 10 << 20;

// Shared state for the admin handlers
#[derive(Clone)]
struct AppState {
    config_store: Arc<dyn ConfigStore>,
    cert_store: Arc<dyn CertificateStore>,
    proxy: Arc<dyn ProxyControl>,
    compiler: Arc<Compiler>,
    // Serialises every write of the document or the Caddyfile
    save_lock: Arc<TokioMutex<()>>,
    metrics: Option<PrometheusHandle>,
}

/// Raw Caddyfile payload for `/api/config`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawConfig {
    pub content: String,
}

/// Reply to a structured save
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveSummary {
    pub sites: usize,
    pub warnings: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CertQuery {
    file: String,
}

/// The admin HTTP API in front of the stores and the proxy binary
pub struct AdminServer {
    app_state: AppState,
}

impl AdminServer {
    pub fn with_dependencies(
        config_store: Arc<dyn ConfigStore>,
        cert_store: Arc<dyn CertificateStore>,
        proxy: Arc<dyn ProxyControl>,
        compiler: Compiler,
    ) -> Self {
        Self {
            app_state: AppState {
                config_store,
                cert_store,
                proxy,
                compiler: Arc::new(compiler),
                save_lock: Arc::new(TokioMutex::new(())),
                metrics: None,
            },
        }
    }

    /// Serve `/metrics` from this recorder handle
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.app_state.metrics = Some(handle);
        self
    }

    pub fn build_app(&self) -> Router {
        Router::new()
            .route("/api/config", get(get_config_handler).post(put_config_handler))
            .route(
                "/api/config/structured",
                get(get_structured_handler).post(save_structured_handler),
            )
            .route(
                "/api/validate",
                post(|state: State<AppState>| command_handler(state, ProxyCommand::Validate)),
            )
            .route(
                "/api/start",
                post(|state: State<AppState>| command_handler(state, ProxyCommand::Start)),
            )
            .route(
                "/api/stop",
                post(|state: State<AppState>| command_handler(state, ProxyCommand::Stop)),
            )
            .route(
                "/api/reload",
                post(|state: State<AppState>| command_handler(state, ProxyCommand::Reload)),
            )
            .route(
                "/api/certs",
                get(list_certs_handler)
                    .post(upload_cert_handler)
                    .delete(delete_cert_handler),
            )
            .route("/metrics", get(metrics_handler))
            .layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES))
            .layer(middleware::from_fn(csrf_guard))
            .with_state(self.app_state.clone())
            .layer(TraceLayer::new_for_http())
    }

    /// Serve until Ctrl-C.
    pub async fn run(&self, addr: SocketAddr) -> Result<()> {
        let app = self.build_app();
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind to address: {addr}"))?;

        tracing::info!(%addr, "Admin API listening");
        axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| anyhow!("HTTP Server error: {e}"))?;

        tracing::info!("Admin API stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}

/// State-changing API calls must come from the editing UI's XHR client.
async fn csrf_guard(req: Request, next: Next) -> AxumResponse {
    let mutating = matches!(*req.method(), Method::POST | Method::PUT | Method::DELETE);
    if mutating && req.uri().path().starts_with("/api/") {
        let from_xhr = req
            .headers()
            .get("x-requested-with")
            .and_then(|v| v.to_str().ok())
            == Some("XMLHttpRequest");
        if !from_xhr {
            tracing::warn!(path = %req.uri().path(), "Rejected request without X-Requested-With");
            return (
                StatusCode::FORBIDDEN,
                "CSRF check failed: missing X-Requested-With header",
            )
                .into_response();
        }
    }
    next.run(req).await
}

fn internal_error(context: &str, e: impl std::fmt::Display) -> AxumResponse {
    tracing::error!(error = %e, "{context}");
    (StatusCode::INTERNAL_SERVER_ERROR, context.to_string()).into_response()
}

fn bad_request(message: impl Into<String>) -> AxumResponse {
    (StatusCode::BAD_REQUEST, message.into()).into_response()
}

async fn get_config_handler(
    State(app_state): State<AppState>,
) -> Result<Json<RawConfig>, AxumResponse> {
    let content = app_state
        .config_store
        .read_caddyfile()
        .await
        .map_err(|e| internal_error("Failed to read Caddyfile", e))?;
    Ok(Json(RawConfig { content }))
}

async fn put_config_handler(
    State(app_state): State<AppState>,
    payload: Result<Json<RawConfig>, JsonRejection>,
) -> Result<StatusCode, AxumResponse> {
    let Json(payload) = payload.map_err(|e| bad_request(format!("Invalid request body: {e}")))?;
    let _guard = app_state.save_lock.lock().await;
    app_state
        .config_store
        .write_caddyfile(&payload.content)
        .await
        .map_err(|e| internal_error("Failed to write Caddyfile", e))?;
    tracing::info!(bytes = payload.content.len(), "Raw Caddyfile replaced");
    Ok(StatusCode::OK)
}

async fn get_structured_handler(
    State(app_state): State<AppState>,
) -> Result<Json<ConfigDocument>, AxumResponse> {
    let doc = app_state
        .config_store
        .load_document()
        .await
        .map_err(|e| internal_error("Failed to read config", e))?;
    Ok(Json(doc))
}

async fn save_structured_handler(
    State(app_state): State<AppState>,
    payload: Result<Json<ConfigDocument>, JsonRejection>,
) -> Result<Json<SaveSummary>, AxumResponse> {
    let Json(doc) = payload.map_err(|e| bad_request(format!("Invalid request body: {e}")))?;
    let _guard = app_state.save_lock.lock().await;

    let warnings: Vec<String> = ConfigValidator::lint(&doc)
        .iter()
        .map(ToString::to_string)
        .collect();
    for warning in &warnings {
        tracing::warn!(%warning, "Configuration lint");
    }

    if let Err(e) = app_state.config_store.save_document(&doc).await {
        record_config_save("failure");
        return Err(internal_error("Failed to save config", e));
    }

    let output = {
        let _timer = CompileTimer::new();
        app_state.compiler.compile_detailed(&doc)
    };
    record_compilation("success", output.sites);

    if let Err(e) = app_state.config_store.write_caddyfile(&output.text).await {
        record_config_save("failure");
        return Err(internal_error("Failed to write Caddyfile", e));
    }
    record_config_save("success");

    tracing::info!(
        sites = output.sites,
        warnings = warnings.len(),
        "Structured configuration saved and compiled"
    );
    Ok(Json(SaveSummary {
        sites: output.sites,
        warnings,
    }))
}

async fn command_handler(
    State(app_state): State<AppState>,
    command: ProxyCommand,
) -> Json<CommandOutput> {
    match app_state.proxy.run(command).await {
        Ok(output) => Json(output),
        Err(e) => {
            tracing::error!(%command, error = %e, "Proxy command could not run");
            Json(CommandOutput {
                output: String::new(),
                error: e.to_string(),
            })
        }
    }
}

fn cert_error_response(e: CertError) -> AxumResponse {
    match e {
        CertError::InvalidName(_) => bad_request("Invalid filename"),
        CertError::NotFound(_) => (StatusCode::NOT_FOUND, "File not found").into_response(),
        other => internal_error("Certificate storage failed", other),
    }
}

async fn list_certs_handler(
    State(app_state): State<AppState>,
) -> Result<Json<Vec<String>>, AxumResponse> {
    let names = app_state
        .cert_store
        .list()
        .await
        .map_err(cert_error_response)?;
    Ok(Json(names))
}

async fn upload_cert_handler(
    State(app_state): State<AppState>,
    mut multipart: Multipart,
) -> Result<StatusCode, AxumResponse> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("Failed to parse form: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let name = field
            .file_name()
            .map(base_name)
            .ok_or_else(|| bad_request("Failed to get file"))?;
        let contents = field
            .bytes()
            .await
            .map_err(|e| bad_request(format!("Failed to read file: {e}")))?;

        app_state
            .cert_store
            .save(&name, &contents)
            .await
            .map_err(cert_error_response)?;
        return Ok(StatusCode::OK);
    }
    Err(bad_request("Failed to get file"))
}

/// Last path component of an uploaded file name
fn base_name(name: &str) -> String {
    name.rsplit(['/', '\\']).next().unwrap_or(name).to_string()
}

async fn delete_cert_handler(
    State(app_state): State<AppState>,
    Query(query): Query<CertQuery>,
) -> Result<StatusCode, AxumResponse> {
    app_state
        .cert_store
        .delete(&query.file)
        .await
        .map_err(cert_error_response)?;
    Ok(StatusCode::OK)
}

async fn metrics_handler(State(app_state): State<AppState>) -> AxumResponse {
    match &app_state.metrics {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "Metrics recorder not installed").into_response(),
    }
}
