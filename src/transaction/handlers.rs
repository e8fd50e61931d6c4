use actix_web::{get, post, web, HttpResponse};
use validator::Validate;

use crate::errors::{AppError, ErrorResponse};
use crate::extractors::AuthenticatedUser;
use crate::store::LedgerStore;

use super::models::{
    CreateTransactionDto, PaginatedTransactionResponse, TransactionQueryParams,
    TransactionResponse,
};
use super::service::TransactionService;

/// GET /api/transactions - List one page of the caller's transactions
#[utoipa::path(
    get,
    path = "/api/transactions",
    tag = "Transactions",
    params(TransactionQueryParams),
    responses(
        (status = 200, description = "Paginated list of transactions", body = PaginatedTransactionResponse),
        (status = 400, description = "Invalid pagination or filter", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[get("/transactions")]
pub async fn list_transactions(
    store: web::Data<dyn LedgerStore>,
    auth: AuthenticatedUser,
    query: web::Query<TransactionQueryParams>,
) -> Result<HttpResponse, AppError> {
    let (transactions, pagination) =
        TransactionService::list_transactions(store.get_ref(), auth.user_id, &query).await?;

    Ok(HttpResponse::Ok().json(PaginatedTransactionResponse {
        transactions: transactions.into_iter().map(Into::into).collect(),
        pagination,
    }))
}

/// POST /api/transactions - Create a new transaction (atomically updates account balance)
#[utoipa::path(
    post,
    path = "/api/transactions",
    tag = "Transactions",
    request_body = CreateTransactionDto,
    responses(
        (status = 201, description = "Transaction created", body = TransactionResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 404, description = "Account not found", body = ErrorResponse),
        (status = 409, description = "Balance update could not be applied", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[post("/transactions")]
pub async fn create_transaction(
    store: web::Data<dyn LedgerStore>,
    auth: AuthenticatedUser,
    body: web::Json<CreateTransactionDto>,
) -> Result<HttpResponse, AppError> {
    body.validate()
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    let transaction =
        TransactionService::create_transaction(store.get_ref(), auth.user_id, &body).await?;

    Ok(HttpResponse::Created().json(TransactionResponse::from(transaction)))
}
