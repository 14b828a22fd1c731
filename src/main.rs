//! HypeKart storefront API server

use std::sync::Arc;

use anyhow::Result;
use hypekart::api::{router, AppState};
use hypekart::config::AppConfig;
use hypekart::gateway::RazorpayGateway;
use hypekart::repository::{InMemoryOrders, InMemoryProducts, InMemoryUsers, PgOrders, PgProducts, PgUsers};
use hypekart::webhooks::WebhookVerifier;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();

    let config = AppConfig::from_env()?;
    tracing::debug!(?config, "configuration loaded");

    let gateway = Arc::new(RazorpayGateway::new(&config.razorpay_api_base, &config.razorpay_key_id, &config.razorpay_key_secret)?);
    if config.razorpay_key_id.is_empty() || config.razorpay_key_secret.is_empty() {
        tracing::warn!("RAZORPAY_KEY_ID / RAZORPAY_KEY_SECRET not set; payment intents will fail");
    }
    let webhook = config.auth_webhook_secret.as_deref().map(WebhookVerifier::new).transpose()?;
    if webhook.is_none() {
        tracing::warn!("AUTH_WEBHOOK_SECRET not set; auth webhooks will be refused");
    }
    if config.admin_api_token.is_none() {
        tracing::warn!("ADMIN_API_TOKEN not set; admin routes are closed");
    }

    let state = match &config.database_url {
        Some(url) => {
            let db = PgPoolOptions::new().max_connections(config.database_max_connections).connect(url).await?;
            sqlx::migrate!("./migrations").run(&db).await?;
            AppState::new(
                &config,
                Arc::new(PgOrders::new(db.clone())),
                Arc::new(PgProducts::new(db.clone())),
                Arc::new(PgUsers::new(db)),
                gateway,
                webhook,
            )
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory storage, data is lost on restart");
            AppState::new(
                &config,
                Arc::new(InMemoryOrders::new()),
                Arc::new(InMemoryProducts::new()),
                Arc::new(InMemoryUsers::new()),
                gateway,
                webhook,
            )
        }
    };

    let app = router(state);
    tracing::info!("HypeKart API listening on 0.0.0.0:{}", config.port);
    axum::serve(tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?, app).await?;
    Ok(())
}
