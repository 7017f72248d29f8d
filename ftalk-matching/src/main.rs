use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use socketioxide::SocketIo;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod config;
mod events;
mod matching;
mod models;
mod routes;
mod schema;
mod socket;
mod store;

use config::AppConfig;
use ftalk_shared::clients::db::{create_pool, DbPool};
use ftalk_shared::clients::rabbitmq::RabbitMQClient;
use ftalk_shared::clients::redis::RedisClient;

pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub rabbitmq: RabbitMQClient,
    pub redis: RedisClient,
    pub io: SocketIo,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ftalk_shared::middleware::init_tracing("ftalk-matching");

    let config = AppConfig::load()?;
    let port = config.port;

    let db = create_pool(&config.database_url);

    let rabbitmq = RabbitMQClient::connect(&config.rabbitmq_url).await?;
    let redis = RedisClient::connect(&config.redis_url).await?;

    // io lives in AppState so REST handlers can emit realtime events too.
    let (sio_layer, io) = SocketIo::builder().build_layer();

    let state = Arc::new(AppState {
        db,
        config,
        rabbitmq,
        redis,
        io: io.clone(),
    });

    io.ns("/", {
        let state = state.clone();
        move |socket: socketioxide::extract::SocketRef| {
            let state = state.clone();
            async move {
                socket::handlers::on_connect_with_state(socket, state).await;
            }
        }
    });

    let metrics_handle = ftalk_shared::middleware::init_metrics();

    let app = Router::new()
        // Health & metrics
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(move || async move { metrics_handle.render() }))
        // Session lifecycle
        .route("/sessions", post(routes::sessions::create_session))
        .route("/sessions/messages", post(routes::sessions::send_message))
        .route("/sessions/report", post(routes::safety::create_report))
        .route("/sessions/:id/match", post(routes::sessions::find_match))
        .route("/sessions/:id/skip", post(routes::sessions::skip_match))
        .route("/sessions/:id/end", post(routes::sessions::end_session))
        .route("/sessions/:id/messages", get(routes::sessions::list_messages))
        .route("/sessions/:id/block", post(routes::sessions::block_user))
        .route("/sessions/:id/call", post(routes::calls::initiate_call))
        // Calls
        .route("/calls/pending", get(routes::calls::pending_calls))
        .route("/calls/:id/ring", put(routes::calls::mark_ringing))
        .route("/calls/:id/respond", put(routes::calls::respond_call))
        .route("/calls/:id/end", post(routes::calls::end_call))
        // Preferences
        .route(
            "/preferences",
            get(routes::preferences::get_preferences).patch(routes::preferences::update_preferences),
        )
        // History & stats
        .route("/history", get(routes::stats::get_history))
        .route("/stats", get(routes::stats::get_stats))
        .route("/interests", get(routes::stats::get_interests))
        .route("/online-count", get(routes::stats::get_online_count))
        .layer(axum::middleware::from_fn(ftalk_shared::middleware::metrics_middleware))
        .layer(sio_layer)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "ftalk-matching starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
