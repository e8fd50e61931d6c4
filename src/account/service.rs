use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use super::models::{Account, CreateAccountDto, NewAccount, DEFAULT_CURRENCY};
use crate::errors::AppError;
use crate::models::fits_money_column;
use crate::store::LedgerStore;

/// Service layer for account business logic.
pub struct AccountService;

impl AccountService {
    /// List all accounts for a user, oldest first.
    pub async fn list_accounts(
        store: &dyn LedgerStore,
        owner_id: Uuid,
    ) -> Result<Vec<Account>, AppError> {
        store.list_accounts(owner_id).await
    }

    /// Get an account by ID, ensuring the requesting user owns it.
    ///
    /// Accounts owned by someone else are reported exactly like missing ones.
    pub async fn get_account_by_id(
        store: &dyn LedgerStore,
        account_id: Uuid,
        owner_id: Uuid,
    ) -> Result<Account, AppError> {
        store
            .find_account(account_id)
            .await?
            .filter(|account| account.owner_id == owner_id)
            .ok_or_else(|| AppError::NotFound("Account not found".to_string()))
    }

    /// Create a new account.
    pub async fn create_account(
        store: &dyn LedgerStore,
        owner_id: Uuid,
        dto: &CreateAccountDto,
    ) -> Result<Account, AppError> {
        let name = dto.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::ValidationError(
                "Name cannot be empty".to_string(),
            ));
        }

        let currency = dto
            .currency
            .as_deref()
            .map(str::to_uppercase)
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

        let mut balance = dto.balance.unwrap_or(Decimal::ZERO);
        if !fits_money_column(balance) {
            return Err(AppError::ValidationError(
                "Balance is out of range".to_string(),
            ));
        }
        if balance.normalize().scale() > 2 {
            return Err(AppError::ValidationError(
                "Balance cannot have more than 2 decimal places".to_string(),
            ));
        }
        balance.rescale(2);

        let account = store
            .insert_account(NewAccount {
                owner_id,
                name,
                account_type: dto.account_type,
                balance,
                currency,
                is_active: true,
            })
            .await?;

        info!(account_id = %account.id, owner_id = %owner_id, "Created account");

        Ok(account)
    }
}
