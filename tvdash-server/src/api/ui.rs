//! Landing page and app listing

use axum::{extract::State, response::Html, Json};
use serde::Serialize;

use crate::apps::{discover_apps, AppEntry};
use crate::AppState;

const INDEX_TEMPLATE: &str = include_str!("../../ui/index.html");

/// GET /api/apps response
#[derive(Debug, Serialize)]
pub struct AppsResponse {
    pub apps: Vec<AppEntry>,
}

/// GET /
///
/// Lists the installed apps with links into each one
pub async fn serve_index(State(state): State<AppState>) -> Html<String> {
    let apps = discover_apps(&state.apps_dir).await;
    Html(render_index(&apps))
}

/// GET /api/apps
pub async fn list_apps(State(state): State<AppState>) -> Json<AppsResponse> {
    Json(AppsResponse {
        apps: discover_apps(&state.apps_dir).await,
    })
}

fn render_index(apps: &[AppEntry]) -> String {
    let list = if apps.is_empty() {
        "<li class=\"empty\">No apps installed</li>".to_string()
    } else {
        apps.iter()
            .map(|app| {
                format!(
                    "<li><a href=\"{}\">{}</a></li>",
                    escape_html(&app.path),
                    escape_html(&app.name)
                )
            })
            .collect::<Vec<_>>()
            .join("\n        ")
    };

    INDEX_TEMPLATE
        .replace("{{VERSION}}", env!("CARGO_PKG_VERSION"))
        .replace("{{APP_LIST}}", &list)
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_index_lists_apps() {
        let html = render_index(&[AppEntry {
            name: "player".to_string(),
            path: "/apps/player/".to_string(),
        }]);

        assert!(html.contains("<a href=\"/apps/player/\">player</a>"));
        assert!(!html.contains("{{APP_LIST}}"));
        assert!(!html.contains("{{VERSION}}"));
    }

    #[test]
    fn test_render_index_empty() {
        let html = render_index(&[]);
        assert!(html.contains("No apps installed"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a&b>\"'"), "&lt;a&amp;b&gt;&quot;&#39;");
    }
}
