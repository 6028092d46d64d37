use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use recipe_service::config::{AppConfig, MailBackend, StoreBackend};
use recipe_service::database::{DocumentStore, MemoryStore, MongoDB};
use recipe_service::services::{role_service, Mailer, OutboxMailer, WebhookMailer};
use recipe_service::state::AppState;
use recipe_service::{api, jobs, middleware, seeds};

fn io_error(message: String) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, message)
}

async fn connect_store(config: &AppConfig) -> std::io::Result<Arc<dyn DocumentStore>> {
    match config.store_backend {
        StoreBackend::Mongo => {
            log::info!("📊 Database: {}", config.database_url);
            let db = MongoDB::new(&config.database_url)
                .await
                .map_err(|e| io_error(format!("Failed to connect to MongoDB: {}", e)))?;
            log::info!("✅ MongoDB connected successfully");
            Ok(Arc::new(db))
        }
        StoreBackend::Memory => {
            log::warn!("⚠️  Using in-memory store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

fn build_mailer(config: &AppConfig) -> std::io::Result<Arc<dyn Mailer>> {
    match (config.mail_backend, config.mail_webhook_url.as_deref()) {
        (MailBackend::Webhook, Some(url)) => {
            log::info!("📧 Mail relay: {}", url);
            let mailer = WebhookMailer::new(url).map_err(|e| io_error(e.to_string()))?;
            Ok(Arc::new(mailer))
        }
        (MailBackend::Webhook, None) => Err(io_error(
            "MAIL_BACKEND=webhook requires MAIL_WEBHOOK_URL".to_string(),
        )),
        (MailBackend::Outbox, _) => {
            log::info!("📧 Mail outbox: messages are logged, not delivered");
            Ok(Arc::new(OutboxMailer::new()))
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env();
    log::info!("🚀 Starting Recipe Service (tenant: {})...", config.tenant);

    let store = connect_store(&config).await?;
    let mailer = build_mailer(&config)?;

    // One tenant per database
    role_service::claim_store(store.as_ref(), &config.tenant)
        .await
        .map_err(|e| io_error(e.to_string()))?;

    // 🌱 Seed the tenant's role set
    seeds::role_settings_seed::seed_default_roles(store.as_ref(), &config.tenant).await;

    let host = config.host.clone();
    let port = config.port;
    let origins = config.allowed_origins.clone();

    let state = Arc::new(AppState::new(config, store, mailer));
    let state_data = web::Data::from(state.clone());

    log::info!("📅 Starting background jobs...");
    jobs::ledger_sweeper::start_ledger_sweeper(state);
    log::info!("✅ Background jobs started");

    log::info!("🌐 Server starting on {}:{}", host, port);
    log::info!("📚 Swagger UI available at: http://{}:{}/swagger-ui/", host, port);
    log::info!("📄 OpenAPI spec at: http://{}:{}/api-docs/openapi.json", host, port);

    HttpServer::new(move || {
        let cors = origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::ACCEPT,
                actix_web::http::header::HeaderName::from_static("idempotency-key"),
            ])
            .expose_headers(vec![
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::HeaderName::from_static("idempotent-replayed"),
            ])
            .supports_credentials()
            .max_age(3600);

        // Generate OpenAPI specification
        let openapi = api::swagger::ApiDoc::openapi();

        App::new()
            .app_data(state_data.clone())
            .wrap(cors)
            .wrap(middleware::SecurityHeaders)
            .wrap(middleware::RequestMetrics)
            .wrap(Logger::default())
            .service(SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi))
            .configure(api::configure)
    })
    .bind(format!("{}:{}", host, port))?
    .run()
    .await
}
