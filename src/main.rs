use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trivia_room::abuse::{self, AbuseConfig};
use trivia_room::auth;
use trivia_room::config::AppConfig;
use trivia_room::directory::{self, GameDirectory};
use trivia_room::session::{self, AppServices};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trivia_room=debug,tower_http=debug,axum=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting trivia game service...");

    let config = AppConfig::from_env();
    let verifier = auth::build_verifier(&config);
    let abuse_config = Arc::new(AbuseConfig::from_env());
    let directory: Arc<GameDirectory> = GameDirectory::new();

    directory::spawn_idle_reaper(
        directory.clone(),
        Duration::from_secs(config.room_idle_grace_secs),
    );
    abuse::spawn_rate_limiter_cleanup(abuse_config.clone());

    let services = Arc::new(AppServices {
        directory,
        verifier,
        abuse: abuse_config,
    });

    let app = Router::new()
        .route("/ws", get(session::ws_handler))
        .route("/health", get(session::health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(services);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.bind_port));
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
