// HTTP routes: parameter-tree reads and writes as JSON

mod http;

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::store::CounterStore;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) store: Arc<CounterStore>,
}

pub fn app(store: Arc<CounterStore>) -> Router {
    let state = AppState { store };
    Router::new()
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/snmp", get(http::get_root).put(http::put_root)) // GET/PUT whole tree
        .route(
            "/api/snmp/{*path}",
            get(http::get_path)
                .put(http::put_path)
                .delete(http::delete_path),
        ) // GET/PUT/DELETE /api/snmp/<path>
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
