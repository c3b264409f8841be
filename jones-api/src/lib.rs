pub mod config;
pub mod models;
pub mod payment;
pub mod repositories;
pub mod routes;
pub mod schema;
pub mod services;

use std::sync::Arc;

use axum::extract::FromRef;
use axum::routing::{get, post};
use axum::{middleware, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use jones_shared::clients::db::DbPool;
use jones_shared::middleware::{metrics_middleware, JwtSecret};

use crate::config::AppConfig;
use crate::services::account_service::AccountService;
use crate::services::matching::MatchingEngine;
use crate::services::subscription_service::SubscriptionService;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Arc<AppConfig>,
    pub metrics: PrometheusHandle,
    pub access_secret: JwtSecret,
    pub accounts: AccountService,
    pub matching: MatchingEngine,
    pub subscriptions: SubscriptionService,
}

impl FromRef<AppState> for JwtSecret {
    fn from_ref(state: &AppState) -> Self {
        state.access_secret.clone()
    }
}

/// Billing routes (portal, provider callback) only exist when Stripe is on.
pub fn router(state: AppState) -> Router {
    let stripe_enabled = state.config.stripe_enabled;

    let mut api = Router::new()
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/refresh", post(routes::auth::refresh))
        .route("/users", get(routes::users::feed))
        .route("/users/me", get(routes::users::me))
        .route("/reactions", post(routes::reactions::swipe))
        .route("/reactions/likes", get(routes::reactions::likes))
        .route("/subscription", post(routes::subscriptions::subscribe))
        .route("/subscription/plans", get(routes::subscriptions::list_plans));
    if stripe_enabled {
        api = api.route("/subscription/portal", get(routes::subscriptions::portal));
    }

    let mut app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::health::metrics))
        .nest("/api/v1", api);
    if stripe_enabled {
        app = app.route("/payment/callback", post(routes::webhook::payment_callback));
    }

    app.layer(middleware::from_fn(metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
