use std::sync::{Arc, Mutex};

use axum::routing::{delete, get, patch, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use royalcut::config::AppConfig;
use royalcut::db;
use royalcut::handlers;
use royalcut::jobs;
use royalcut::services::notifications::resend::ResendEmailSender;
use royalcut::services::payments::stripe::StripeCheckoutProvider;
use royalcut::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    if config.stripe_secret_key.is_empty() {
        tracing::warn!("STRIPE_SECRET_KEY not set, checkout session creation will fail");
    }
    let payments = StripeCheckoutProvider::new(
        config.stripe_secret_key.clone(),
        config.stripe_currency.clone(),
        config.frontend_url.clone(),
        config.business_name.clone(),
    );
    let notifier = ResendEmailSender::new(config.resend_api_key.clone(), config.email_from.clone());

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        payments: Box::new(payments),
        notifier: Box::new(notifier),
    });

    jobs::reminders::spawn(Arc::clone(&state));

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/webhook/payments", post(handlers::webhook::payments_webhook))
        .route("/api/services", get(handlers::services::list_services))
        .route("/api/barbers", get(handlers::barbers::list_barbers))
        .route("/api/barbers/:id", get(handlers::barbers::get_barber))
        .route("/api/barbers/:id/slots", get(handlers::barbers::get_slots))
        .route("/api/bookings", post(handlers::bookings::create_booking))
        .route("/api/bookings/my", get(handlers::bookings::my_bookings))
        .route("/api/bookings/:id", get(handlers::bookings::get_booking))
        .route(
            "/api/bookings/:id/cancel",
            delete(handlers::bookings::cancel_booking),
        )
        .route("/api/admin/dashboard", get(handlers::admin::get_dashboard))
        .route("/api/admin/bookings", get(handlers::admin::list_bookings))
        .route(
            "/api/admin/bookings/:id/status",
            patch(handlers::admin::update_booking_status),
        )
        .route(
            "/api/admin/barbers/:id/schedule",
            get(handlers::admin::get_schedule).put(handlers::admin::put_schedule),
        )
        .route("/api/admin/stats/revenue", get(handlers::admin::get_revenue))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
