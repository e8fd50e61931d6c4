//! Persistence boundary for accounts and the transaction ledger.

mod memory;
mod postgres;

pub use memory::MemoryLedgerStore;
pub use postgres::PgLedgerStore;

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::account::models::{Account, NewAccount};
use crate::errors::AppError;
use crate::models::fits_money_column;
use crate::transaction::models::{LedgerQuery, NewTransaction, Transaction};

/// Durable table of accounts and transactions.
///
/// Pages are ordered by insertion, so the same query yields a stable order
/// across offsets. `insert_transaction` applies the row and the balance
/// adjustment as one unit: either both are observed or neither is.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Name reported by the health endpoint.
    fn backend(&self) -> &'static str;

    async fn ping(&self) -> Result<(), AppError>;

    async fn list_accounts(&self, owner_id: Uuid) -> Result<Vec<Account>, AppError>;

    async fn find_account(&self, account_id: Uuid) -> Result<Option<Account>, AppError>;

    async fn insert_account(&self, account: NewAccount) -> Result<Account, AppError>;

    /// Returns one page of matching transactions and the total match count.
    async fn query_transactions(
        &self,
        query: &LedgerQuery,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Transaction>, i64), AppError>;

    /// Inserts the transaction and adds its amount to the owning account's balance.
    ///
    /// Fails with `NotFound` for an unknown account and `ValidationError` for a
    /// blank category.
    async fn insert_transaction(&self, transaction: NewTransaction)
        -> Result<Transaction, AppError>;
}

fn validate_new_transaction(transaction: &NewTransaction) -> Result<(), AppError> {
    if transaction.category.trim().is_empty() {
        return Err(AppError::ValidationError(
            "Category is required".to_string(),
        ));
    }
    Ok(())
}

/// Balance after applying `delta`, rejected when it leaves the storable range.
fn checked_balance(balance: Decimal, delta: Decimal) -> Result<Decimal, AppError> {
    balance
        .checked_add(delta)
        .filter(|updated| fits_money_column(*updated))
        .ok_or_else(|| {
            AppError::ValidationError("Resulting account balance is out of range".to_string())
        })
}
