use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{
        HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use folio_api::auth::{self, AppState, AppStateInner};
use folio_api::middleware::require_auth;
use folio_api::storage::Storage;
use folio_api::{error, homepage, projects, uploads, users};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "folio=debug,tower_http=debug".into()),
        )
        .init();

    // Config — read once at startup
    let jwt_secret = std::env::var("FOLIO_JWT_SECRET").unwrap_or_default();
    if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
        eprintln!("FATAL: FOLIO_JWT_SECRET is unset or still a placeholder.");
        eprintln!("       Set it in your .env file and restart.");
        std::process::exit(1);
    }

    let dev_mode = std::env::var("FOLIO_ENV")
        .map(|v| v == "development")
        .unwrap_or(false);
    error::set_dev_mode(dev_mode);

    let db_path = std::env::var("FOLIO_DB_PATH").unwrap_or_else(|_| "folio.db".into());
    let upload_dir: PathBuf = std::env::var("FOLIO_UPLOAD_DIR")
        .unwrap_or_else(|_| "./uploads".into())
        .into();
    let host = std::env::var("FOLIO_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("FOLIO_PORT")
        .unwrap_or_else(|_| "8000".into())
        .parse()?;
    let max_upload_bytes: usize = std::env::var("FOLIO_MAX_UPLOAD_BYTES")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(16 * 1024 * 1024); // 16 MiB default
    let allowed_origins = std::env::var("FOLIO_ALLOWED_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000".into());

    // Init database and storage
    let db = folio_db::Database::open(&PathBuf::from(&db_path))?;
    let storage = Storage::new(upload_dir).await?;

    // Shared state
    let state: AppState = Arc::new(AppStateInner {
        db,
        storage,
        jwt_secret,
        dev_mode,
        max_upload_bytes,
    });

    // Routes
    let public_routes = Router::new()
        .route("/api/health", get(health))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/projects", get(projects::list_projects))
        .route("/api/projects/{id}", get(projects::get_project))
        .route("/api/homepage", get(homepage::get_homepage))
        .route("/api/images", get(uploads::list_images))
        .route("/api/images/{id}", get(uploads::serve_image))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/api/projects", post(projects::create_project))
        .route(
            "/api/projects/{id}",
            put(projects::update_project).delete(projects::delete_project),
        )
        .route("/api/homepage", put(homepage::update_homepage))
        .route("/api/homepage/stats", get(homepage::stats))
        .route("/api/users", get(users::list_users))
        .route(
            "/api/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/api/users/{id}/password", put(users::change_password))
        .route("/api/upload", post(uploads::upload_single))
        .route("/api/upload-multiple", post(uploads::upload_multiple))
        .route("/api/images/{id}", axum::routing::delete(uploads::delete_image))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    let origins = allowed_origins
        .split(',')
        .map(|origin| origin.trim().parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()?;
    info!("Allowed origins: {}", allowed_origins);

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        // Leave room for multipart framing around the file payload itself
        .layer(DefaultBodyLimit::max(max_upload_bytes + 1024 * 1024))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Portfolio Admin API listening on {}", addr);
    info!(
        "Environment: {}",
        if dev_mode { "development" } else { "production" }
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "message": "Portfolio Admin API is running",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
