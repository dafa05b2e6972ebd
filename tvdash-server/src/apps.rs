//! App discovery and request path resolution
//!
//! Every sub-directory of the apps directory that contains an `index.html` is an
//! app, served under `/apps/<name>/`. Requests that do not name an existing file
//! fall back to the app's `index.html` so client-side routes survive a reload.

use crate::error::{ApiError, ApiResult};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Document served for directory requests and SPA routes
pub const INDEX_FILE: &str = "index.html";

/// App listed on the landing page and by `/api/apps`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppEntry {
    pub name: String,
    /// URL path the app is served under (always ends in `/`)
    pub path: String,
}

/// What a request under `/apps/<name>/` maps to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// Existing file (or a directory's index document)
    File(PathBuf),
    /// Client-side route rewritten to the app's index document
    SpaIndex(PathBuf),
}

impl Resolved {
    pub fn path(&self) -> &Path {
        match self {
            Resolved::File(path) | Resolved::SpaIndex(path) => path,
        }
    }
}

/// List apps under `apps_dir`, sorted by name
///
/// A missing or unreadable apps directory yields an empty list.
pub async fn discover_apps(apps_dir: &Path) -> Vec<AppEntry> {
    let mut entries = match tokio::fs::read_dir(apps_dir).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cannot read apps directory {}: {}", apps_dir.display(), e);
            return Vec::new();
        }
    };

    let mut apps = Vec::new();
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!("Error while listing {}: {}", apps_dir.display(), e);
                break;
            }
        };

        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if !is_safe_segment(&name) {
            continue;
        }
        if !is_file(&entry.path().join(INDEX_FILE)).await {
            debug!("Skipping {}: no {}", name, INDEX_FILE);
            continue;
        }

        apps.push(AppEntry {
            path: format!("/apps/{}/", name),
            name,
        });
    }

    apps.sort_by(|a, b| a.name.cmp(&b.name));
    apps
}

/// Whether `segment` is a plain file or directory name
///
/// Rejects empty names, `.`/`..`, hidden dot-names and anything containing a path
/// separator, drive colon or NUL.
pub fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && !segment.starts_with('.')
        && !segment.contains(['/', '\\', ':', '\0'])
}

/// Map `/apps/<app>/<rest>` to a file on disk
///
/// `rest` is the percent-decoded remainder of the path (may be empty).
pub async fn resolve(apps_dir: &Path, app: &str, rest: &str) -> ApiResult<Resolved> {
    if !is_safe_segment(app) {
        return Err(ApiError::BadRequest(format!("Invalid app name: {:?}", app)));
    }

    let app_root = apps_dir.join(app);
    if !is_dir(&app_root).await {
        return Err(ApiError::NotFound(format!("App '{}'", app)));
    }

    let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
    if let Some(bad) = segments.iter().find(|s| !is_safe_segment(s)) {
        return Err(ApiError::BadRequest(format!("Invalid path segment: {:?}", bad)));
    }

    let candidate = segments
        .iter()
        .fold(app_root.clone(), |path, segment| path.join(segment));

    if is_file(&candidate).await {
        return Ok(Resolved::File(candidate));
    }
    if is_dir(&candidate).await {
        let index = candidate.join(INDEX_FILE);
        if is_file(&index).await {
            return Ok(Resolved::File(index));
        }
    }

    // Paths with an extension are assets: no SPA fallback
    if let Some(last) = segments.last() {
        if Path::new(last).extension().is_some() {
            return Err(ApiError::NotFound(format!("{}/{}", app, rest)));
        }
    }

    let index = app_root.join(INDEX_FILE);
    if is_file(&index).await {
        Ok(Resolved::SpaIndex(index))
    } else {
        Err(ApiError::NotFound(format!("App '{}' has no {}", app, INDEX_FILE)))
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}
