use axum::routing::{get, patch, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{
    accounts, admin, events, functions, health_check, method_not_allowed, not_found,
};
use crate::AppState;

fn event_routes() -> Router<AppState> {
    Router::new()
        .route("/events", get(events::list_events).post(events::submit_event))
        .route("/events/facets", get(events::event_facets))
        .route("/events/suggestions", get(events::event_suggestions))
        .route("/events/:id", get(events::get_event))
        .route("/me/events", get(events::my_events))
        .route("/me/events/:id", axum::routing::delete(events::delete_my_event))
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/events",
            get(admin::list_all_events).delete(admin::delete_all_events),
        )
        .route("/events/import", post(admin::import_events))
        .route("/events/export", get(admin::export_events))
        .route(
            "/events/:id",
            put(admin::update_event).delete(admin::delete_event),
        )
        .route("/events/:id/status", patch(admin::set_event_status))
        .route("/users", get(admin::list_users))
        .route("/users/:id/role", patch(admin::set_user_role))
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(accounts::sign_up))
        .route("/token", post(accounts::sign_in))
        .route("/logout", post(accounts::sign_out))
        .route(
            "/user",
            get(accounts::current_user).put(accounts::change_password),
        )
}

fn function_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/delete-user",
            post(functions::delete_user).fallback(method_not_allowed),
        )
        .route(
            "/notify-albo",
            post(functions::notify_albo).fallback(method_not_allowed),
        )
}

pub fn create_routes(state: AppState) -> Router {
    let production = state.config.production;
    let origins = state.config.cors_allowed_origins.clone();

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", event_routes())
        .nest("/api/admin", admin_routes())
        .nest("/auth/v1", auth_routes())
        .nest("/functions/v1", function_routes())
        .fallback(not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer(production))
        .layer(create_cors_layer(origins.as_deref()))
}
