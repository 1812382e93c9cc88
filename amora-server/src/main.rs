use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod config;
mod routes;

use amora_notification::NotificationRelay;
use amora_shared::clients::db::{create_pool, DbPool};
use amora_shared::middleware::init_tracing;
use amora_shared::registry::ConnectionRegistry;
use config::AppConfig;

pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub registry: Arc<ConnectionRegistry>,
    pub relay: NotificationRelay,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("amora-server");

    let config = AppConfig::load()?;
    let port = config.port;

    let db = create_pool(&config.database_url)?;
    let registry = Arc::new(ConnectionRegistry::new());
    let relay = NotificationRelay::new(db.clone(), registry.clone());

    let state = Arc::new(AppState {
        db,
        config,
        registry,
        relay,
    });

    let app = Router::new()
        // Health
        .route("/health", get(routes::health::health_check))
        // Matching
        .route("/matching/browse", get(routes::matching::browse))
        .route("/matching/like", post(routes::matching::like))
        .route("/matching/unlike", post(routes::matching::unlike))
        .route("/matching/visit/:user_id", post(routes::matching::visit))
        // Blocks
        .route(
            "/blocks",
            get(routes::blocks::list_blocked).delete(routes::blocks::unblock),
        )
        .route("/blocks/:user_id", post(routes::blocks::block))
        // Chat
        .route("/chat/conversations", get(routes::chat::list_conversations))
        .route(
            "/chat/conversations/:id/messages",
            get(routes::chat::list_messages),
        )
        .route("/chat/send", post(routes::chat::send_message))
        .route("/chat/typing", post(routes::chat::typing))
        // Date negotiation
        .route("/dates/invite", post(routes::dates::invite))
        .route("/dates/respond", post(routes::dates::respond))
        .route("/dates/preferences", post(routes::dates::submit_preferences))
        // Notifications
        .route("/notifications", get(routes::notifications::list_notifications))
        .route(
            "/notifications/unread-count",
            get(routes::notifications::unread_count),
        )
        .route("/notifications/mark-read", post(routes::notifications::mark_read))
        // Housekeeping hook for the external daily job
        .route("/maintenance/reset-fame", post(routes::matching::reset_fame))
        // Live channels
        .route("/ws/chat/:conversation_id", get(routes::sockets::chat_socket))
        .route("/ws/video/:conversation_id", get(routes::sockets::video_socket))
        .route("/ws/notifications", get(routes::sockets::notification_socket))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "amora-server starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
