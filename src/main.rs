//! Officebook - Office Betting Pool Backend
//! Mission: Pari-mutuel betting for office stakes, in play money

use anyhow::{Context, Result};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use dotenv::dotenv;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use officebook_backend::{
    auth::{api as auth_api, auth_middleware, AuthState, JwtHandler, UserStore},
    betting::{api as betting_api, AppState, BetStore},
    config::Config,
    middleware::request_logging,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    init_tracing();

    let config = Arc::new(Config::from_env()?);
    info!("Starting Officebook backend");

    // Both stores open the same database file.
    if let Some(parent) = Path::new(&config.db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).context("Failed to create database directory")?;
        }
    }

    let user_store = Arc::new(
        UserStore::new(&config.db_path, config.initial_balance)
            .context("Failed to initialize user store")?,
    );
    let bet_store = Arc::new(
        BetStore::new(&config.db_path, config.minimum_wager, config.early_bet_bonus)
            .context("Failed to initialize bet store")?,
    );
    let jwt_handler = Arc::new(JwtHandler::new(
        config.jwt_secret.clone(),
        config.jwt_expire_hours,
    ));

    let auth_state = AuthState {
        user_store: user_store.clone(),
        jwt_handler: jwt_handler.clone(),
    };

    let app_state = AppState {
        bets: bet_store,
        users: user_store,
        config: config.clone(),
    };

    // Registration and login (no token required)
    let auth_router = Router::new()
        .route("/api/auth/register", post(auth_api::register))
        .route("/api/auth/login", post(auth_api::login))
        .with_state(auth_state.clone());

    // Current-user endpoint needs auth state plus a valid token
    let me_router = Router::new()
        .route("/api/auth/me", get(auth_api::get_current_user))
        .route_layer(middleware::from_fn_with_state(
            jwt_handler.clone(),
            auth_middleware,
        ))
        .with_state(auth_state);

    // Protected betting routes
    let protected_routes = Router::new()
        .route("/api/bets", post(betting_api::create_bet))
        .route("/api/bets/:id/wager", post(betting_api::place_wager))
        .route("/api/bets/:id/resolve", post(betting_api::resolve_bet))
        .route("/api/bets/users/me/wagers", get(betting_api::my_wagers))
        .route_layer(middleware::from_fn_with_state(
            jwt_handler.clone(),
            auth_middleware,
        ))
        .with_state(app_state.clone());

    // Public routes (browsing needs no account)
    let public_routes = Router::new()
        .route("/health", get(betting_api::health_check))
        .route("/api/config", get(betting_api::get_public_config))
        .route("/api/bets", get(betting_api::list_bets))
        .route("/api/bets/:id", get(betting_api::get_bet))
        .route("/api/leaderboard", get(betting_api::leaderboard))
        .with_state(app_state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(auth_router)
        .merge(me_router)
        .layer(middleware::from_fn(request_logging))
        .layer(CorsLayer::permissive());

    // Start server
    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("API server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

/// Initialize tracing from RUST_LOG, with a sensible default
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "officebook_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
