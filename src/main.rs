use bio_terminal::app::{AppState, build_router};
use bio_terminal::config::Config;
use bio_terminal::date::display_offset;
use bio_terminal::effects::DeviceProfile;
use bio_terminal::logger::{Logger, log_error};
use bio_terminal::net::{HttpJsonSource, JsonSource};
use bio_terminal::prefs::PreferencesStore;
use bio_terminal::sessions::SessionStore;
use bio_terminal::terminal::TerminalServices;
use bio_terminal::widgets::WidgetBoard;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_governor::GovernorLayer;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::SmartIpKeyExtractor;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let logger = Logger::for_local_host();
    let config = match Config::load() {
        Ok(config) => Arc::new(config),
        Err(error) => {
            log_error(&logger, "config.invalid", &error);
            return Err(error.into());
        }
    };

    if std::env::args().any(|arg| arg == "--config-check") {
        logger.info(
            "config.check_passed",
            json!({
                "port": config.port,
                "allowedOrigins": config.allowed_origins,
                "allowAllOrigins": config.allow_all_origins,
                "widgetsEnabled": config.widgets_enabled,
                "preferencesPath": config
                    .preferences_path
                    .as_ref()
                    .map(|path| path.display().to_string()),
            }),
        );
        return Ok(());
    }

    let device = DeviceProfile::detect(config.low_end_mode);
    let source: Arc<dyn JsonSource> = Arc::new(HttpJsonSource::new(config.http_timeout)?);

    let widgets = config.widgets_enabled.then(|| {
        WidgetBoard::new(
            source.clone(),
            config.widgets.clone(),
            config.github_username.clone(),
            display_offset(config.display_utc_offset_minutes),
            logger.clone(),
        )
    });
    if let Some(board) = &widgets {
        let pollers = board.spawn_pollers(device.low_end);
        logger.info(
            "widgets.polling_started",
            json!({ "pollers": pollers.len(), "lowEnd": device.low_end }),
        );
    }

    let prefs_store = PreferencesStore::new(config.preferences_path.clone());
    match prefs_store.check().await {
        Ok(clients) => logger.debug("preferences.loaded", json!({ "clients": clients })),
        Err(error) => logger.warn(
            "preferences.load_failed",
            json!({ "error": error.to_string() }),
        ),
    }

    let services = Arc::new(TerminalServices::new(
        config.clone(),
        source,
        widgets,
        device,
        logger.clone(),
    ));
    let sessions = SessionStore::new(services, prefs_store);
    sessions.spawn_janitor();

    let state = Arc::new(AppState::new(config.clone(), logger.clone(), sessions));

    let governor_config = GovernorConfigBuilder::default()
        .per_second(2)
        .burst_size(30)
        .key_extractor(SmartIpKeyExtractor)
        .finish()
        .expect("rate limiter config");

    let app = build_router(state).layer(GovernorLayer::new(governor_config));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    logger.info(
        "server.started",
        json!({
            "port": config.port,
            "cpuCores": device.cpu_cores,
            "lowEnd": device.low_end,
        }),
    );

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal(logger.clone()))
        .await?;
    Ok(())
}

async fn shutdown_signal(logger: Logger) {
    let ctrl_c = async {
        signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(error) => {
                log_error(&logger, "shutdown.sigterm_unavailable", error);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            logger.info("shutdown.ctrl_c", json!({ "message": "Received Ctrl+C" }));
        }
        _ = terminate => {
            logger.info("shutdown.terminate", json!({ "message": "Received SIGTERM" }));
        }
    }
}
