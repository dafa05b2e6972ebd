//! HTTP API handlers for tvdash-server

pub mod apps;
pub mod buildinfo;
pub mod health;
pub mod proxy;
pub mod ui;

pub use apps::{redirect_app_root, serve_app_path, serve_app_root};
pub use buildinfo::get_build_info;
pub use health::health_routes;
pub use proxy::{proxy_request, ProxyClient};
pub use ui::{list_apps, serve_index};
