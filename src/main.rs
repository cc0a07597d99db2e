use adwuma_backend::api::{orders, payouts, wallets, AppState};
use adwuma_backend::clock::SystemClock;
use adwuma_backend::config::AppConfig;
use adwuma_backend::database;
use adwuma_backend::database::destination_repository::DestinationRepository;
use adwuma_backend::database::order_repository::OrderRepository;
use adwuma_backend::database::payout_repository::PayoutRepository;
use adwuma_backend::database::wallet_repository::WalletRepository;
use adwuma_backend::gateway::client::HttpTransferGateway;
use adwuma_backend::health::{self, HealthChecker};
use adwuma_backend::logging::init_tracing;
use adwuma_backend::middleware::logging::{request_logging_middleware, UuidRequestId};
use adwuma_backend::orders::lifecycle::OrderLifecycle;
use adwuma_backend::payouts::workflow::PayoutWorkflow;
use adwuma_backend::services::notification::NotificationService;
use adwuma_backend::workers::payout_reconciler::PayoutReconciler;
use anyhow::Context;
use axum::{
    middleware,
    routing::{get, patch, post, put},
    Router,
};
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;

    init_tracing(&config.logging);
    info!("starting adwuma escrow and payout engine");

    let pool = database::init_pool_from_config(&config.database)
        .await
        .context("failed to initialize database pool")?;

    let clock = Arc::new(SystemClock);
    let notifier = NotificationService::new();
    let gateway = Arc::new(
        HttpTransferGateway::new(config.gateway.clone())
            .map_err(|e| anyhow::anyhow!("failed to build transfer gateway: {}", e))?,
    );

    let lifecycle = Arc::new(OrderLifecycle::new(
        pool.clone(),
        clock.clone(),
        notifier.clone(),
    ));
    let payout_workflow = Arc::new(PayoutWorkflow::new(
        pool.clone(),
        gateway,
        config.payout.clone(),
        clock,
        notifier,
    ));

    let state = AppState {
        lifecycle,
        payouts: payout_workflow.clone(),
        order_repo: Arc::new(OrderRepository::new(pool.clone())),
        payout_repo: Arc::new(PayoutRepository::new(pool.clone())),
        wallet_repo: Arc::new(WalletRepository::new(pool.clone())),
        destination_repo: Arc::new(DestinationRepository::new(pool.clone())),
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let reconciler = PayoutReconciler::new(pool.clone(), payout_workflow, config.reconciler.clone());
    let reconciler_handle = tokio::spawn(reconciler.run(shutdown_rx));

    let app = build_router(state, HealthChecker::new(pool));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shutting down");
    let _ = shutdown_tx.send(true);
    let _ = reconciler_handle.await;

    Ok(())
}

fn build_router(state: AppState, health_checker: HealthChecker) -> Router {
    let api_routes = Router::new()
        .route("/api/orders", post(orders::create_order))
        .route("/api/orders/{order_id}", get(orders::get_order))
        .route("/api/orders/{order_id}/events", get(orders::list_order_events))
        .route("/api/orders/{order_id}/status", patch(orders::transition_order))
        .route("/api/payouts", post(payouts::create_payout))
        .route("/api/payout-requests/{payout_id}", get(payouts::get_payout))
        .route(
            "/api/payout-requests/{payout_id}/approve",
            post(payouts::approve_payout),
        )
        .route(
            "/api/payout-requests/{payout_id}/deny",
            post(payouts::deny_payout),
        )
        .route("/api/wallets/{provider_id}", get(wallets::get_wallet))
        .route(
            "/api/providers/{provider_id}/payout-destination",
            put(wallets::put_destination),
        )
        .with_state(state);

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::ready))
        .route("/health/live", get(health::live))
        .with_state(health_checker);

    api_routes
        .merge(health_routes)
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install sigterm handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
