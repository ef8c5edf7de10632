use anyhow::Context;
use axum::http::{HeaderValue, Method};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use storefront_api::{
    api_routes,
    auth::{AuthConfig, AuthService},
    config, db, AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_config = config::load_config().context("failed to load configuration")?;
    config::init_tracing(app_config.log_level(), app_config.log_json);

    info!(
        environment = %app_config.environment,
        "Starting storefront API"
    );

    let db = Arc::new(
        db::establish_connection_from_app_config(&app_config)
            .await
            .context("failed to connect to the database")?,
    );

    if app_config.auto_migrate {
        info!("Running database migrations");
        db::run_migrations(&db)
            .await
            .context("failed to run database migrations")?;
    }

    let auth = Arc::new(AuthService::new(AuthConfig::new(
        app_config.jwt_secret.clone(),
        Duration::from_secs(app_config.jwt_expiration as u64),
    )));

    let addr = format!("{}:{}", app_config.host, app_config.port);
    let cors = cors_layer(app_config.cors_allowed_origins.as_deref());
    let state = AppState::new(db, app_config, auth);

    let app = api_routes()
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server stopped");
    Ok(())
}

fn cors_layer(allowed_origins: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_headers(Any);

    match allowed_origins {
        Some(origins) if !origins.trim().is_empty() => {
            let parsed: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|origin| {
                    let origin = origin.trim();
                    match origin.parse::<HeaderValue>() {
                        Ok(value) => Some(value),
                        Err(_) => {
                            warn!(origin, "Ignoring unparseable CORS origin");
                            None
                        }
                    }
                })
                .collect();
            layer.allow_origin(parsed)
        }
        _ => layer.allow_origin(Any),
    }
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
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received ctrl-c, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
