use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::api::handler;
use crate::application::UtrService;

/// Build the axum router with all UTR endpoints mounted under `api_prefix`.
pub fn build_router(service: UtrService, api_prefix: &str) -> Router {
    let routes = Router::new()
        .route("/getdata-utr", get(handler::list_handler))
        .route("/getutrByid", get(handler::get_by_doc_no_handler))
        .route("/insert-utr", post(handler::insert_handler))
        .route("/update-utr", put(handler::update_handler))
        .route("/delete_data_by_utrid", delete(handler::delete_handler))
        .route("/get-lastutrdata", get(handler::last_handler))
        .route("/get-firstutr-navigation", get(handler::first_handler))
        .route("/get-previousutr-navigation", get(handler::previous_handler))
        .route("/get-nextutr-navigation", get(handler::next_handler))
        .with_state(service);

    let prefix = normalize_prefix(api_prefix);
    let app = if prefix.is_empty() {
        routes
    } else {
        Router::new().nest(&prefix, routes)
    };

    app.route("/health", get(handler::health_handler))
        .layer(TraceLayer::new_for_http())
}

/// `"api/x/"` -> `"/api/x"`, `"/"` -> `""`
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}
