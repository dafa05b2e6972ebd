//! # tvdash Server Library (tvdash-server)
//!
//! Local dashboard server: serves each bundled front-end app from the apps
//! directory with client-side route fallback, plus a landing page, a health
//! endpoint and an optional forwarding proxy.

use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod apps;
pub mod config;
pub mod error;
pub mod listener;

use api::ProxyClient;
use config::ServerConfig;
use error::ServerError;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Directory holding one sub-directory per app
    pub apps_dir: Arc<PathBuf>,
    /// Forwarding proxy (None when disabled)
    pub proxy: Option<Arc<ProxyClient>>,
}

impl AppState {
    /// State serving `apps_dir` with the proxy disabled
    pub fn new(apps_dir: impl Into<PathBuf>) -> Self {
        Self {
            apps_dir: Arc::new(apps_dir.into()),
            proxy: None,
        }
    }

    /// Enable the forwarding proxy
    pub fn with_proxy(mut self, proxy: ProxyClient) -> Self {
        self.proxy = Some(Arc::new(proxy));
        self
    }

    /// State described by `config`
    pub fn from_config(config: &ServerConfig) -> Result<Self, ServerError> {
        let state = Self::new(config.apps_dir.clone());
        if config.proxy.enabled {
            Ok(state.with_proxy(ProxyClient::new(config.proxy.clone())?))
        } else {
            Ok(state)
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{any, get};

    let mut router = Router::new()
        .route("/", get(api::serve_index))
        .route("/api/apps", get(api::list_apps))
        .route("/build_info", get(api::get_build_info))
        .route("/apps/:app", get(api::redirect_app_root))
        .route("/apps/:app/", get(api::serve_app_root))
        .route("/apps/:app/*path", get(api::serve_app_path))
        .merge(api::health_routes());

    if state.proxy.is_some() {
        router = router.route("/proxy/*target", any(api::proxy_request));
    }

    router
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        // Local dashboard: apps on other origins may call the proxy
        .layer(CorsLayer::permissive())
}
