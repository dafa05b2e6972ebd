//! Static app serving with SPA fallback

use axum::{
    extract::{Path, Request, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Redirect, Response},
};
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::debug;

use crate::apps::{is_safe_segment, resolve, Resolved};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// GET /apps/:app
///
/// Redirects to the trailing-slash form so relative asset URLs resolve
pub async fn redirect_app_root(Path(app): Path<String>) -> ApiResult<Redirect> {
    if !is_safe_segment(&app) {
        return Err(ApiError::BadRequest(format!("Invalid app name: {:?}", app)));
    }
    Ok(Redirect::permanent(&format!("/apps/{}/", app)))
}

/// GET /apps/:app/
pub async fn serve_app_root(
    State(state): State<AppState>,
    Path(app): Path<String>,
    request: Request,
) -> ApiResult<Response> {
    serve(&state, &app, "", request).await
}

/// GET /apps/:app/*path
pub async fn serve_app_path(
    State(state): State<AppState>,
    Path((app, path)): Path<(String, String)>,
    request: Request,
) -> ApiResult<Response> {
    serve(&state, &app, &path, request).await
}

async fn serve(state: &AppState, app: &str, path: &str, request: Request) -> ApiResult<Response> {
    let resolved = resolve(&state.apps_dir, app, path).await?;
    debug!("/apps/{}/{} -> {:?}", app, path, resolved);

    let response = ServeFile::new(resolved.path())
        .oneshot(request)
        .await
        .unwrap_or_else(|never| match never {});
    let mut response = response.into_response();

    if let Resolved::SpaIndex(_) = resolved {
        // Rewritten routes are never served from cache
        response
            .headers_mut()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    }

    Ok(response)
}
