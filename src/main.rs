use std::env;

use actix_cors::Cors;
use actix_web::{http::header, middleware::NormalizePath, web, App, HttpServer};
use once_cell::sync::Lazy;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use portfolio_site::{
    background_task::start_sweep_task,
    cache::counter_store::build_counter_store,
    constants::{DB_MAX_CONNECTIONS, START_TIME},
    db::postgres::{create_pool, run_migrations},
    graceful_shutdown::shutdown_signal,
    handlers::json_error::not_found,
    media::build_media_storage,
    middlewares::{
        auth::AuthMiddleware, block_suspicious::BlockSuspicious, rate_limit::RateLimit,
        security_headers::SecurityHeaders, security_logging::SecurityLogging,
    },
    repositories::Repositories,
    routes::configure_routes,
    settings::AppConfig,
    AppState,
};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "portfolio_site=info,actix_web=info,sqlx=warn".into());
    let registry = tracing_subscriber::registry().with(filter);

    if env::var("APP_ENV").is_ok_and(|v| v.eq_ignore_ascii_case("production")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn build_cors(origins: &[String]) -> Cors {
    let cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
        .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .max_age(3600);

    if origins.iter().any(|o| o == "*") {
        return cors.allow_any_origin();
    }
    origins.iter().fold(cors, |cors, origin| cors.allowed_origin(origin))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    init_tracing();
    Lazy::force(&START_TIME);

    let config = match AppConfig::new() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let pool = match create_pool(&config.database_url, DB_MAX_CONNECTIONS).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Failed to create database connection pool: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run_migrations(&pool).await {
        tracing::error!("Database migrations failed: {}", e);
        std::process::exit(1);
    }

    let (counters, memory_store) = build_counter_store(config.redis_url.as_deref());
    tracing::info!("Rate limit counters backed by {}", counters.backend_name());
    let media = build_media_storage(&config.media);

    let server_addr = format!("{}:{}", config.host, config.port);
    let workers = config.worker_count.max(1);
    let development = config.is_development();
    let admin_prefix = config.admin_prefix();
    let origins = config.cors_origins();

    let app_state = web::Data::new(AppState::new(config, Repositories::postgres(pool), counters, media));
    let request_security = web::Data::new(app_state.request_security());

    if let Some(store) = memory_store {
        tokio::spawn(start_sweep_task(store));
    }

    tracing::info!(
        "🚀 Starting portfolio site v{} on {} ({} workers)",
        env!("CARGO_PKG_VERSION"),
        server_addr,
        workers
    );

    let server = HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .app_data(request_security.clone())
            .configure(|cfg| configure_routes(cfg, &admin_prefix))
            .default_service(web::to(not_found))
            .wrap(AuthMiddleware)
            .wrap(SecurityLogging)
            .wrap(RateLimit)
            .wrap(BlockSuspicious)
            .wrap(build_cors(&origins))
            .wrap(SecurityHeaders::new(development))
            .wrap(NormalizePath::trim())
            .wrap(TracingLogger::default())
    })
    .workers(workers)
    .bind(server_addr)?
    .run();

    tokio::select! {
        res = server => res,
        _ = shutdown_signal() => Ok(()),
    }
}
