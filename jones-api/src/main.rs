use std::sync::Arc;

use jones_api::config::AppConfig;
use jones_api::payment::stripe::{StripeGateway, StripeSettings};
use jones_api::payment::PaymentGateway;
use jones_api::repositories::{
    PgNotificationRepository, PgReactionRepository, PgSubscriptionRepository, PgUserRepository,
};
use jones_api::services::account_service::AccountService;
use jones_api::services::entitlement::EntitlementResolver;
use jones_api::services::matching::MatchingEngine;
use jones_api::services::notification::NotificationDispatcher;
use jones_api::services::subscription_service::SubscriptionService;
use jones_api::services::token_service::TokenKeys;
use jones_api::AppState;
use jones_shared::clients::db::create_pool;
use jones_shared::middleware::{init_metrics, init_tracing, JwtSecret};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("jones-api");

    let config = AppConfig::load()?;
    config.validate()?;
    let port = config.port;

    let metrics = init_metrics()?;
    let db = create_pool(&config.database_url, config.db_pool_size)?;

    let users = Arc::new(PgUserRepository::new(db.clone()));
    let reactions = Arc::new(PgReactionRepository::new(db.clone()));
    let subscriptions = Arc::new(PgSubscriptionRepository::new(db.clone()));
    let notifications = Arc::new(PgNotificationRepository::new(db.clone()));

    let (notifier, _notification_worker) = NotificationDispatcher::spawn(notifications);

    let access_secret = JwtSecret::new(&config.jwt_secret);
    let tokens = TokenKeys::new(
        access_secret.clone(),
        JwtSecret::new(&config.jwt_refresh_secret),
        config.jwt_access_ttl,
        config.jwt_refresh_ttl,
    );

    let payments: Option<Arc<dyn PaymentGateway>> = if config.stripe_enabled {
        tracing::info!(api_base = %config.stripe_api_base, "stripe billing enabled");
        Some(Arc::new(StripeGateway::new(StripeSettings {
            secret_key: config.stripe_secret_key.clone(),
            api_base: config.stripe_api_base.clone(),
            success_url: config.checkout_success_url.clone(),
            cancel_url: config.checkout_cancel_url.clone(),
            portal_return_url: config.portal_return_url.clone(),
        })))
    } else {
        tracing::info!("stripe billing disabled, plans are granted locally");
        None
    };

    let entitlements = EntitlementResolver::new(subscriptions.clone());
    let state = AppState {
        accounts: AccountService::new(users.clone(), reactions.clone(), tokens),
        matching: MatchingEngine::new(reactions, entitlements, notifier, config.daily_swipe_limit),
        subscriptions: SubscriptionService::new(users, subscriptions, payments, config.local_subscription_days),
        db,
        metrics,
        access_secret,
        config: Arc::new(config),
    };

    let app = jones_api::router(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "jones-api starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
