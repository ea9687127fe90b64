use axum::{middleware, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::auth;
use crate::employee;
use crate::org;
use crate::shared::state::AppState;

/// Assembles the full HTTP surface. Directory routes sit behind the bearer
/// gate; the auth endpoints stay public so clients can obtain a token.
pub fn configure_api_routes(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .merge(org::configure_org_routes())
        .merge(employee::configure_employee_routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    Router::new()
        .merge(auth::configure_auth_routes())
        .merge(protected)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
