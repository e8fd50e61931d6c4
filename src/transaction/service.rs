use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::models::{
    CreateTransactionDto, LedgerQuery, NewTransaction, Transaction, TransactionQueryParams,
    TransactionType,
};
use crate::account::service::AccountService;
use crate::errors::AppError;
use crate::models::{fits_money_column, PaginationMeta, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use crate::store::LedgerStore;

/// Service layer for ledger reads and writes.
/// Every balance change goes through `LedgerStore::insert_transaction`.
pub struct TransactionService;

impl TransactionService {
    /// Resolve raw query parameters into a caller-scoped store query and the
    /// effective offset and limit.
    pub fn resolve_query(
        user_id: Uuid,
        params: &TransactionQueryParams,
    ) -> Result<(LedgerQuery, i64, i64), AppError> {
        let offset = params.offset.unwrap_or(0);
        if offset < 0 {
            return Err(AppError::ValidationError(
                "Offset must be zero or greater".to_string(),
            ));
        }

        let limit = params.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        if limit <= 0 {
            return Err(AppError::ValidationError(
                "Limit must be greater than zero".to_string(),
            ));
        }
        let limit = limit.min(MAX_PAGE_LIMIT);

        let transaction_type = match params.transaction_type.as_deref().map(str::trim) {
            Some("") | None => None,
            Some(raw) => {
                Some(TransactionType::parse_request(raw).map_err(AppError::ValidationError)?)
            }
        };

        let category = params
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        let query = LedgerQuery {
            // Always the caller, never taken from the request
            owner_id: Some(user_id),
            account_id: params.account_id,
            category,
            transaction_type,
        };

        Ok((query, offset, limit))
    }

    /// List one page of the caller's ledger.
    pub async fn list_transactions(
        store: &dyn LedgerStore,
        user_id: Uuid,
        params: &TransactionQueryParams,
    ) -> Result<(Vec<Transaction>, PaginationMeta), AppError> {
        let (query, offset, limit) = Self::resolve_query(user_id, params)?;

        let (transactions, total) = store.query_transactions(&query, offset, limit).await?;

        debug!(
            user_id = %user_id,
            offset,
            limit,
            total,
            returned = transactions.len(),
            "Queried ledger page"
        );

        Ok((transactions, PaginationMeta::new(offset, limit, total)))
    }

    /// Validate a creation payload, producing the record to insert.
    fn prepare(dto: &CreateTransactionDto, account_id: Uuid) -> Result<NewTransaction, AppError> {
        let transaction_type =
            TransactionType::parse_request(&dto.transaction_type).map_err(AppError::ValidationError)?;

        if dto.amount.is_zero() {
            return Err(AppError::ValidationError(
                "Amount must not be zero".to_string(),
            ));
        }
        if !fits_money_column(dto.amount) {
            return Err(AppError::ValidationError(
                "Amount is out of range".to_string(),
            ));
        }
        if dto.amount.normalize().scale() > 2 {
            return Err(AppError::ValidationError(
                "Amount cannot have more than 2 decimal places".to_string(),
            ));
        }

        let category = dto.category.trim().to_string();
        if category.is_empty() {
            return Err(AppError::ValidationError(
                "Category is required".to_string(),
            ));
        }

        let mut amount = dto.amount;
        amount.rescale(2);

        let description = dto
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        Ok(NewTransaction {
            account_id,
            transaction_date: dto.date,
            description,
            category,
            transaction_type,
            amount: transaction_type.balance_delta(amount),
        })
    }

    /// Create a transaction and apply its balance effect atomically.
    pub async fn create_transaction(
        store: &dyn LedgerStore,
        user_id: Uuid,
        dto: &CreateTransactionDto,
    ) -> Result<Transaction, AppError> {
        let account_id = dto
            .account_id
            .ok_or_else(|| AppError::ValidationError("accountId is required".to_string()))?;

        let new_transaction = Self::prepare(dto, account_id)?;

        let account = AccountService::get_account_by_id(store, account_id, user_id)
            .await
            .inspect_err(|_| {
                warn!(user_id = %user_id, account_id = %account_id, "Rejected transaction for inaccessible account");
            })?;

        if !account.is_active {
            return Err(AppError::ValidationError(
                "Account is inactive".to_string(),
            ));
        }

        let delta: Decimal = new_transaction.amount;
        let transaction = store.insert_transaction(new_transaction).await?;

        info!(
            transaction_id = %transaction.id,
            account_id = %account_id,
            delta = %delta,
            "Recorded transaction"
        );

        Ok(transaction)
    }
}
