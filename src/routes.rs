use std::sync::Arc;

use axum::routing::{delete, get, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route(
            "/sports",
            get(handlers::sports::list_sports).post(handlers::sports::create_sport),
        )
        .route(
            "/sports/:id",
            put(handlers::sports::update_sport).delete(handlers::sports::delete_sport),
        )
        .route("/price-quote", get(handlers::sports::price_quote))
        .route(
            "/courts",
            get(handlers::courts::list_courts).post(handlers::courts::create_court),
        )
        .route(
            "/courts/availability",
            get(handlers::courts::get_availability),
        )
        .route("/courts/:id", delete(handlers::courts::delete_court))
        .route("/courts/:id/status", put(handlers::courts::set_court_status))
        .route(
            "/bookings",
            get(handlers::bookings::get_bookings).post(handlers::bookings::create_booking),
        )
        .route("/bookings/all", get(handlers::bookings::get_ledger))
        .route("/bookings/active", get(handlers::bookings::get_active_bookings))
        .route(
            "/bookings/:id",
            get(handlers::bookings::get_booking).put(handlers::bookings::update_booking),
        )
        .route("/bookings/:id/payment", put(handlers::bookings::update_payment))
        .route("/bookings/:id/cancel", put(handlers::bookings::cancel_booking));

    Router::new()
        .route("/health", get(handlers::health::health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
