mod api;
mod auth;
mod config;
mod db;

use axum::{Router, routing::get, routing::post};
use std::collections::HashMap;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use auth::{AppState, GoogleProvider, OAuthProvider};
use config::ServerConfig;
use db::Database;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().expect("failed to load configuration");
    tracing::info!("Loaded configuration");

    let cookie_key = config
        .auth
        .session_key()
        .expect("invalid session secret configuration");

    // The database handle connects lazily on first use; startup only warms
    // it up so a bad connection string is logged early rather than on the
    // first login.
    let database = Arc::new(Database::new(config.database_url.clone()));
    let warmup = database.clone();
    tokio::spawn(async move {
        match warmup.ensure_connected().await {
            Ok(()) => tracing::info!("Database connection established"),
            Err(e) => {
                tracing::warn!(error = %e, "Database unavailable at startup; will retry on demand");
            }
        }
    });

    let google = GoogleProvider::new(&config.oauth).expect("invalid OAuth configuration");
    let mut providers: HashMap<String, Arc<dyn OAuthProvider>> = HashMap::new();
    providers.insert(google.name().to_string(), Arc::new(google));

    let listen_addr = config.listen_addr.clone();
    let app_state = Arc::new(AppState::new(&config, cookie_key, database, providers));

    let app = Router::new()
        .route("/", get(api::banner))
        // Delegated login flow
        .route("/auth/{provider}", get(auth::login))
        .route("/auth/{provider}/callback", get(auth::callback))
        // Token-protected API
        .route("/api/user", get(api::current_user))
        .route("/api/login", post(api::password_login))
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .expect("failed to bind to address");

    tracing::info!("listening on http://{}", listen_addr);

    axum::serve(listener, app.into_make_service())
        .await
        .expect("server error");
}
