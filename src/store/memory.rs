use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{checked_balance, validate_new_transaction, LedgerStore};
use crate::account::models::{Account, NewAccount};
use crate::errors::AppError;
use crate::transaction::models::{LedgerQuery, NewTransaction, Transaction};

#[derive(Default)]
struct Tables {
    accounts: HashMap<Uuid, Account>,
    account_order: Vec<Uuid>,
    // insertion order is the ledger order
    transactions: Vec<Transaction>,
}

/// In-process ledger store. One mutex guards both tables, so an insert and
/// its balance adjustment are never observed separately.
#[derive(Default)]
pub struct MemoryLedgerStore {
    tables: Mutex<Tables>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, AppError> {
        self.tables
            .lock()
            .map_err(|_| AppError::InternalError("Ledger store lock poisoned".to_string()))
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.lock().map(|_| ())
    }

    async fn list_accounts(&self, owner_id: Uuid) -> Result<Vec<Account>, AppError> {
        let tables = self.lock()?;
        Ok(tables
            .account_order
            .iter()
            .filter_map(|id| tables.accounts.get(id))
            .filter(|account| account.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn find_account(&self, account_id: Uuid) -> Result<Option<Account>, AppError> {
        Ok(self.lock()?.accounts.get(&account_id).cloned())
    }

    async fn insert_account(&self, account: NewAccount) -> Result<Account, AppError> {
        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            owner_id: account.owner_id,
            name: account.name,
            account_type: account.account_type.as_str().to_string(),
            balance: account.balance,
            currency: account.currency,
            is_active: account.is_active,
            created_at: now,
            updated_at: now,
        };

        let mut tables = self.lock()?;
        tables.account_order.push(account.id);
        tables.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn query_transactions(
        &self,
        query: &LedgerQuery,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Transaction>, i64), AppError> {
        let tables = self.lock()?;
        let matching: Vec<&Transaction> = tables
            .transactions
            .iter()
            .filter(|t| {
                tables
                    .accounts
                    .get(&t.account_id)
                    .is_some_and(|account| query.matches(account.owner_id, t))
            })
            .collect();

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect();

        Ok((page, total))
    }

    async fn insert_transaction(
        &self,
        transaction: NewTransaction,
    ) -> Result<Transaction, AppError> {
        validate_new_transaction(&transaction)?;

        let mut tables = self.lock()?;
        let now = Utc::now();

        let account = tables
            .accounts
            .get_mut(&transaction.account_id)
            .ok_or_else(|| AppError::NotFound("Account not found".to_string()))?;
        // Checked before anything is mutated so a rejected insert leaves no trace
        account.balance = checked_balance(account.balance, transaction.amount)?;
        account.updated_at = now;

        let row = Transaction {
            id: Uuid::new_v4(),
            account_id: transaction.account_id,
            transaction_date: transaction.transaction_date,
            description: transaction.description,
            category: transaction.category,
            transaction_type: transaction.transaction_type.as_str().to_string(),
            amount: transaction.amount,
            created_at: now,
            updated_at: now,
        };
        tables.transactions.push(row.clone());

        Ok(row)
    }
}
