pub mod handlers;
pub mod resource;
pub mod soap;
pub mod xml;

use crate::catalog::builder::{ALBUM_ART_PATH, CONTENT_PATH};
use crate::state::AppState;
use axum::{
    routing::{any, get, post},
    Router,
};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root_handler))
        .route("/description.xml", get(handlers::description_handler))
        .route("/ContentDirectory.xml", get(handlers::content_directory_scpd))
        .route("/ConnectionManager.xml", get(handlers::connection_manager_scpd))
        .route("/X_MS_MediaReceiverRegistrar.xml", get(handlers::registrar_scpd))
        .route("/control/ContentDirectory", post(handlers::content_directory_control))
        .route("/control/ConnectionManager", post(handlers::connection_manager_control))
        .route("/control/X_MS_MediaReceiverRegistrar", post(handlers::registrar_control))
        .route(CONTENT_PATH, any(handlers::resource_handler))
        .route(ALBUM_ART_PATH, any(handlers::resource_handler))
        .with_state(state)
}
