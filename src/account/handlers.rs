use actix_web::{get, post, web, HttpResponse};
use validator::Validate;

use crate::errors::{AppError, ErrorResponse};
use crate::extractors::AuthenticatedUser;
use crate::store::LedgerStore;

use super::models::{AccountIdPath, AccountResponse, AccountsListResponse, CreateAccountDto};
use super::service::AccountService;

/// Accounts owned by the caller, oldest first. Feeds the ledger's account filter.
#[utoipa::path(
    get,
    path = "/api/accounts",
    tag = "Accounts",
    responses(
        (status = 200, description = "Caller's accounts", body = AccountsListResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[get("/accounts")]
pub async fn list_accounts(
    store: web::Data<dyn LedgerStore>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let accounts: Vec<AccountResponse> =
        AccountService::list_accounts(store.get_ref(), auth.user_id)
            .await?
            .into_iter()
            .map(AccountResponse::from_account)
            .collect();

    Ok(HttpResponse::Ok().json(AccountsListResponse {
        count: accounts.len(),
        accounts,
    }))
}

/// One of the caller's accounts, with its current balance.
///
/// Someone else's account answers 404, like a missing one.
#[utoipa::path(
    get,
    path = "/api/accounts/{id}",
    tag = "Accounts",
    params(AccountIdPath),
    responses(
        (status = 200, description = "Account with current balance", body = AccountResponse),
        (status = 404, description = "No such account for this caller", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[get("/accounts/{id}")]
pub async fn get_account(
    store: web::Data<dyn LedgerStore>,
    auth: AuthenticatedUser,
    path: web::Path<AccountIdPath>,
) -> Result<HttpResponse, AppError> {
    let account = AccountService::get_account_by_id(store.get_ref(), path.id, auth.user_id)
        .await
        .map(AccountResponse::from_account)?;

    Ok(HttpResponse::Ok().json(account))
}

/// Open an account for the caller. Starts active, with the given opening balance.
#[utoipa::path(
    post,
    path = "/api/accounts",
    tag = "Accounts",
    request_body = CreateAccountDto,
    responses(
        (status = 201, description = "Account opened", body = AccountResponse),
        (status = 400, description = "Invalid name, type, currency or balance", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[post("/accounts")]
pub async fn create_account(
    store: web::Data<dyn LedgerStore>,
    auth: AuthenticatedUser,
    body: web::Json<CreateAccountDto>,
) -> Result<HttpResponse, AppError> {
    let dto = body.into_inner();
    dto.validate()
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    let created = AccountService::create_account(store.get_ref(), auth.user_id, &dto).await?;

    Ok(HttpResponse::Created().json(AccountResponse::from_account(created)))
}
