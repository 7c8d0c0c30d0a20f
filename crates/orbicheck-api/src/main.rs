use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

use orbicheck_api::config::Config;
use orbicheck_api::state::AppState;
use orbicheck_api::{app, db};

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    // JSON logs in production (no TTY attached), pretty-printed locally —
    // matches how operators actually read these two contexts.
    if std::io::IsTerminal::is_terminal(&std::io::stdout()) {
        subscriber.init();
    } else {
        subscriber.json().init();
    }

    let db_pool = match db::init_pool().await {
        Ok(pool) => pool,
        Err(err) => {
            tracing::error!(error = %err, "failed to initialize database pool");
            std::process::exit(1);
        }
    };

    let port = config.port;
    let state = AppState::new(config, db_pool).await;
    let router = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "orbicheck-api listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind listener");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
