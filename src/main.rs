use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_governor::{Governor, GovernorConfigBuilder};
use actix_web::{http::header, web, App, HttpServer};
use dotenvy::dotenv;
use tracing::{info, warn};
use tracing_actix_web::TracingLogger;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use fintrack::config::Settings;
use fintrack::openapi::ApiDoc;
use fintrack::routes;
use fintrack::store::{LedgerStore, MemoryLedgerStore, PgLedgerStore};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();

    // Initialize tracing subscriber for structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::from_env().map_err(io::Error::other)?;

    let store: Arc<dyn LedgerStore> = match settings.database_url.as_deref() {
        Some(url) => Arc::new(
            PgLedgerStore::connect(url, settings.database_max_connections)
                .await
                .map_err(io::Error::other)?,
        ),
        None => {
            warn!("DATABASE_URL not set, using the in-memory ledger store");
            Arc::new(MemoryLedgerStore::new())
        }
    };
    let store = web::Data::from(store);
    let jwt_secret = web::Data::new(settings.jwt_secret.clone());

    let governor_config = GovernorConfigBuilder::default()
        .seconds_per_request(1)
        .burst_size(settings.rate_limit_burst)
        .finish()
        .ok_or_else(|| io::Error::other("Invalid rate limiter configuration"))?;

    let allowed_origins = settings.allowed_origins.clone();

    info!(
        host = %settings.host,
        port = settings.port,
        store = store.backend(),
        "Starting ledger server"
    );

    HttpServer::new(move || {
        let allowed_origins = allowed_origins.clone();

        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _req_head| {
                let origin_str = origin.to_str().unwrap_or("");
                allowed_origins.iter().any(|allowed| allowed == origin_str)
            })
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE])
            .max_age(3600);

        App::new()
            // Middleware (order matters: outer to inner)
            .wrap(Governor::new(&governor_config))
            .wrap(TracingLogger::default())
            .wrap(cors)
            // Shared state
            .app_data(store.clone())
            .app_data(jwt_secret.clone())
            // Swagger UI
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", ApiDoc::openapi()),
            )
            .configure(routes::configure)
    })
    .bind((settings.host.as_str(), settings.port))?
    .run()
    .await
}
