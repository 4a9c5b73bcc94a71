use actix_web::{
    middleware::{Compress, Logger, NormalizePath},
    web, App, HttpServer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use cfgadmin_service::config::{Config, LogFormat};
use cfgadmin_service::db::Database;
use cfgadmin_service::{middleware, routes, AppState};

fn init_tracing(format: LogFormat) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let result = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment
    let config = Config::from_env()?;

    init_tracing(config.log_format)?;
    info!("Starting cfgadmin service");

    // Initialize database
    let db = Database::new(&config).await?;
    info!("Database connected");

    if config.run_migrations {
        db.run_migrations().await?;
    }

    let addr = config.bind_addr()?;
    let state = web::Data::new(AppState::new(db.clone(), config));

    info!("Server running at http://{}", addr);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .app_data(routes::json_config())
            .app_data(routes::path_config())
            .wrap(middleware::build_cors(&state.config))
            .wrap(Compress::default())
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .configure(routes::create_routes)
    })
    .shutdown_timeout(30)
    .bind(addr)?
    .run()
    .await?;

    info!("Server stopped, closing database pool");
    db.close().await;

    Ok(())
}
