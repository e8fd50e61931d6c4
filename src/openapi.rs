use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::account::models::{AccountResponse, AccountType, AccountsListResponse, CreateAccountDto};
use crate::errors::ErrorResponse;
use crate::models::PaginationMeta;
use crate::transaction::models::{
    CreateTransactionDto, PaginatedTransactionResponse, TransactionResponse, TransactionType,
};

/// Security scheme modifier for Bearer token authentication
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT access token"))
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation configuration
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Fintrack Ledger API",
        version = "0.1.0",
        description = "Accounts and a paginated transaction ledger with atomic balance updates",
        license(
            name = "MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Development server"),
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Accounts", description = "Financial account lookup and creation"),
        (name = "Transactions", description = "Ledger queries and transaction creation")
    ),
    paths(
        crate::routes::health_check,
        // Account endpoints
        crate::account::handlers::list_accounts,
        crate::account::handlers::get_account,
        crate::account::handlers::create_account,
        // Transaction endpoints
        crate::transaction::handlers::list_transactions,
        crate::transaction::handlers::create_transaction,
    ),
    components(
        schemas(
            ErrorResponse,
            PaginationMeta,
            // Account schemas
            AccountType,
            AccountResponse,
            AccountsListResponse,
            CreateAccountDto,
            // Transaction schemas
            TransactionType,
            TransactionResponse,
            PaginatedTransactionResponse,
            CreateTransactionDto,
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;
