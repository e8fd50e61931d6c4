use actix_web::{get, web, HttpResponse, Responder};

use crate::errors::{json_error_handler, query_error_handler};
use crate::store::LedgerStore;
use crate::{account, transaction};

/// Health check endpoint that verifies store connectivity
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Store reachable"),
        (status = 503, description = "Store unreachable")
    )
)]
#[get("/health")]
pub async fn health_check(store: web::Data<dyn LedgerStore>) -> impl Responder {
    match store.ping().await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "status": "healthy",
            "store": store.backend(),
        })),
        Err(_) => HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "status": "unhealthy",
            "store": store.backend(),
        })),
    }
}

/// Registers every endpoint and the extractor configs.
///
/// The caller provides `web::Data<dyn LedgerStore>` and
/// `web::Data<Secret<String>>` on the `App`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .service(health_check)
        .service(
            web::scope("/api")
                // Account endpoints (specific routes before generic {id} routes)
                .service(account::list_accounts)
                .service(account::create_account)
                .service(account::get_account)
                // Transaction endpoints
                .service(transaction::list_transactions)
                .service(transaction::create_transaction),
        );
}
