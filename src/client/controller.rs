use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};
use uuid::Uuid;

use super::{BalanceListener, ClientError, LedgerApi, PageRequest, TransactionFilterSet};
use crate::account::models::AccountResponse;
use crate::models::PaginationMeta;
use crate::transaction::models::{CreateTransactionDto, TransactionResponse, TransactionType};

/// Request lifecycle of the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Idle,
    Loading,
    Loaded,
    /// Holds the message shown next to the "try again" action
    Error(String),
}

/// Immutable copy of what the view currently shows.
#[derive(Debug, Clone)]
pub struct LedgerView {
    pub status: LoadStatus,
    pub filters: TransactionFilterSet,
    pub pagination: PaginationMeta,
    pub transactions: Vec<TransactionResponse>,
    /// Last failure of the creation flow, cleared by the next success
    pub creation_error: Option<String>,
}

/// What happened to a query issued by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOutcome {
    /// The response was merged into the view
    Applied,
    /// A newer request superseded this one; the response was dropped
    Stale,
    /// Nothing was issued (no next page, already loading, nothing to retry)
    Skipped,
    /// The query failed and the view is in the error state
    Failed,
}

#[derive(Debug, Clone)]
pub struct CreateOutcome {
    pub transaction: TransactionResponse,
    /// Result of re-querying the visible page after the insert
    pub refresh: QueryOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Merge {
    Replace,
    Append,
    /// Keep this many leading rows, replace everything after them
    KeepPrefix(usize),
}

struct Pending {
    generation: u64,
    request: PageRequest,
    merge: Merge,
}

struct ViewState {
    view: LedgerView,
    // bumped by every issued query; only the latest may apply its response
    generation: u64,
    failed: Option<(PageRequest, Merge)>,
    accounts: Vec<AccountResponse>,
}

impl ViewState {
    fn begin(&mut self, request: PageRequest, merge: Merge) -> Pending {
        self.generation += 1;
        self.view.status = LoadStatus::Loading;
        Pending {
            generation: self.generation,
            request,
            merge,
        }
    }
}

/// Client-side state machine for the transaction list.
///
/// Owns the filters, the accumulated rows and the pagination cursor. Every
/// issued query carries a generation token; a response whose token is no
/// longer current is discarded, so the newest request always wins.
pub struct LedgerViewController {
    api: Arc<dyn LedgerApi>,
    listener: Arc<dyn BalanceListener>,
    state: Mutex<ViewState>,
}

impl LedgerViewController {
    pub fn new(api: Arc<dyn LedgerApi>, listener: Arc<dyn BalanceListener>) -> Self {
        Self {
            api,
            listener,
            state: Mutex::new(ViewState {
                view: LedgerView {
                    status: LoadStatus::Idle,
                    filters: TransactionFilterSet::default(),
                    pagination: PaginationMeta::default(),
                    transactions: Vec::new(),
                    creation_error: None,
                },
                generation: 0,
                failed: None,
                accounts: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ViewState> {
        // The state is plain data; a panic elsewhere cannot leave it half-written
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> LedgerView {
        self.lock().view.clone()
    }

    /// Load the first page for the current filters.
    pub async fn load(&self) -> QueryOutcome {
        let pending = {
            let mut state = self.lock();
            let filters = state.view.filters.clone();
            state.view.transactions.clear();
            state.view.pagination = PaginationMeta::default();
            state.begin(PageRequest::first(filters), Merge::Replace)
        };
        self.run(pending).await
    }

    /// Replace the filter set: pagination restarts at offset 0 and the list
    /// is discarded before the new first page is requested.
    pub async fn set_filters(&self, filters: TransactionFilterSet) -> QueryOutcome {
        let filters = filters.normalized();
        let pending = {
            let mut state = self.lock();
            if state.view.filters == filters
                && matches!(state.view.status, LoadStatus::Loading | LoadStatus::Loaded)
            {
                return QueryOutcome::Skipped;
            }
            state.view.filters = filters.clone();
            state.view.transactions.clear();
            state.view.pagination = PaginationMeta::default();
            state.begin(PageRequest::first(filters), Merge::Replace)
        };
        self.run(pending).await
    }

    pub async fn set_account_filter(&self, account_id: Option<Uuid>) -> QueryOutcome {
        let mut filters = self.snapshot().filters;
        filters.account_id = account_id;
        self.set_filters(filters).await
    }

    pub async fn set_category_filter(&self, category: Option<String>) -> QueryOutcome {
        let mut filters = self.snapshot().filters;
        filters.category = category;
        self.set_filters(filters).await
    }

    pub async fn set_type_filter(&self, transaction_type: Option<TransactionType>) -> QueryOutcome {
        let mut filters = self.snapshot().filters;
        filters.transaction_type = transaction_type;
        self.set_filters(filters).await
    }

    pub async fn clear_filters(&self) -> QueryOutcome {
        if self.snapshot().filters.is_empty() {
            return QueryOutcome::Skipped;
        }
        self.set_filters(TransactionFilterSet::default()).await
    }

    /// Fetch the next page and append it to the list.
    pub async fn load_more(&self) -> QueryOutcome {
        let pending = {
            let mut state = self.lock();
            let pagination = state.view.pagination;
            if !pagination.has_next || state.view.status == LoadStatus::Loading {
                return QueryOutcome::Skipped;
            }
            let request = PageRequest {
                filters: state.view.filters.clone(),
                offset: pagination.next_offset(),
                limit: pagination.limit,
            };
            state.begin(request, Merge::Append)
        };
        self.run(pending).await
    }

    /// Re-issue the query that last failed, with identical parameters.
    pub async fn retry(&self) -> QueryOutcome {
        let pending = {
            let mut state = self.lock();
            if !matches!(state.view.status, LoadStatus::Error(_)) {
                return QueryOutcome::Skipped;
            }
            match state.failed.take() {
                Some((request, merge)) => state.begin(request, merge),
                None => return QueryOutcome::Skipped,
            }
        };
        self.run(pending).await
    }

    /// Re-query the current page, keeping the rows loaded before it.
    async fn refresh(&self) -> QueryOutcome {
        let pending = {
            let mut state = self.lock();
            let pagination = state.view.pagination;
            let keep = (pagination.offset.max(0) as usize).min(state.view.transactions.len());
            let request = PageRequest {
                filters: state.view.filters.clone(),
                offset: keep as i64,
                limit: pagination.limit,
            };
            state.begin(request, Merge::KeepPrefix(keep))
        };
        self.run(pending).await
    }

    /// Create a transaction, then tell the balance listener and refresh the
    /// visible page. A failed creation leaves the loaded list untouched.
    pub async fn create_transaction(
        &self,
        dto: CreateTransactionDto,
    ) -> Result<CreateOutcome, ClientError> {
        let transaction = match self.api.create_transaction(&dto).await {
            Ok(transaction) => transaction,
            Err(e) => {
                warn!(error = %e, "Transaction creation failed");
                self.lock().view.creation_error = Some(e.user_message());
                return Err(e);
            }
        };

        self.lock().view.creation_error = None;
        self.listener.balance_changed(transaction.account_id);

        let refresh = self.refresh().await;

        Ok(CreateOutcome {
            transaction,
            refresh,
        })
    }

    async fn run(&self, pending: Pending) -> QueryOutcome {
        let result = self.api.fetch_page(&pending.request).await;

        let mut state = self.lock();
        if pending.generation != state.generation {
            debug!(
                generation = pending.generation,
                current = state.generation,
                "Discarding stale ledger response"
            );
            return QueryOutcome::Stale;
        }

        match result {
            Ok(page) => {
                let rows = &mut state.view.transactions;
                match pending.merge {
                    Merge::Replace => *rows = page.transactions,
                    Merge::Append => rows.extend(page.transactions),
                    Merge::KeepPrefix(keep) => {
                        rows.truncate(keep);
                        rows.extend(page.transactions);
                    }
                }
                state.view.pagination = page.pagination;
                state.view.status = LoadStatus::Loaded;
                state.failed = None;
                QueryOutcome::Applied
            }
            Err(e) => {
                warn!(error = %e, offset = pending.request.offset, "Ledger query failed");
                state.view.status = LoadStatus::Error(e.user_message());
                state.failed = Some((pending.request, pending.merge));
                QueryOutcome::Failed
            }
        }
    }

    /// Fetch the caller's accounts for filter options and name lookups.
    pub async fn load_accounts(&self) -> Result<Vec<AccountResponse>, ClientError> {
        let accounts = self.api.list_accounts().await?;
        self.lock().accounts = accounts.clone();
        Ok(accounts)
    }

    pub fn account_name(&self, account_id: Uuid) -> String {
        self.lock()
            .accounts
            .iter()
            .find(|account| account.id == account_id)
            .map(|account| account.name.clone())
            .unwrap_or_else(|| "Unknown Account".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::models::PaginatedTransactionResponse;
    use async_trait::async_trait;
    use chrono::{NaiveDate, Utc};
    use futures::channel::oneshot;
    use rust_decimal::Decimal;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type PageResult = Result<PaginatedTransactionResponse, ClientError>;

    /// Answers page requests from a queue of channels so tests decide when
    /// (and in which order) each response arrives.
    #[derive(Default)]
    struct ScriptedApi {
        pages: Mutex<VecDeque<oneshot::Receiver<PageResult>>>,
        requests: Mutex<Vec<PageRequest>>,
        create_result: Mutex<Option<Result<TransactionResponse, ClientError>>>,
        accounts: Vec<AccountResponse>,
    }

    impl ScriptedApi {
        fn ready(&self, result: PageResult) {
            let (tx, rx) = oneshot::channel();
            let _ = tx.send(result);
            self.pages.lock().unwrap().push_back(rx);
        }

        fn deferred(&self) -> oneshot::Sender<PageResult> {
            let (tx, rx) = oneshot::channel();
            self.pages.lock().unwrap().push_back(rx);
            tx
        }

        fn requests(&self) -> Vec<PageRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LedgerApi for ScriptedApi {
        async fn fetch_page(&self, request: &PageRequest) -> PageResult {
            self.requests.lock().unwrap().push(request.clone());
            let rx = self
                .pages
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected page request");
            rx.await.expect("response sender dropped")
        }

        async fn create_transaction(
            &self,
            _dto: &CreateTransactionDto,
        ) -> Result<TransactionResponse, ClientError> {
            self.create_result
                .lock()
                .unwrap()
                .take()
                .expect("unexpected create request")
        }

        async fn list_accounts(&self) -> Result<Vec<AccountResponse>, ClientError> {
            Ok(self.accounts.clone())
        }
    }

    fn row(account_id: Uuid, category: &str) -> TransactionResponse {
        TransactionResponse {
            id: Uuid::new_v4(),
            account_id,
            transaction_date: NaiveDate::from_ymd_opt(2025, 4, 1).expect("valid date"),
            description: None,
            category: category.to_string(),
            transaction_type: "expense".to_string(),
            amount: Decimal::new(-1000, 2),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn page(rows: Vec<TransactionResponse>, offset: i64, total: i64) -> PageResult {
        Ok(PaginatedTransactionResponse {
            transactions: rows,
            pagination: PaginationMeta::new(offset, 20, total),
        })
    }

    fn rows(n: usize, category: &str) -> Vec<TransactionResponse> {
        let account_id = Uuid::new_v4();
        (0..n).map(|_| row(account_id, category)).collect()
    }

    fn server_error() -> ClientError {
        ClientError::Api {
            status: 500,
            code: "INTERNAL_ERROR".to_string(),
            message: "An internal error occurred".to_string(),
        }
    }

    fn controller(api: Arc<ScriptedApi>) -> (LedgerViewController, Arc<AtomicUsize>) {
        let notified = Arc::new(AtomicUsize::new(0));
        let counter = notified.clone();
        let listener = move |_account_id: Uuid| {
            counter.fetch_add(1, Ordering::SeqCst);
        };
        (LedgerViewController::new(api, Arc::new(listener)), notified)
    }

    fn food() -> TransactionFilterSet {
        TransactionFilterSet {
            category: Some("food".to_string()),
            ..Default::default()
        }
    }

    #[actix_rt::test]
    async fn test_initial_load_populates_view() {
        let api = Arc::new(ScriptedApi::default());
        api.ready(page(rows(20, "misc"), 0, 45));
        let (controller, _) = controller(api.clone());

        assert_eq!(controller.snapshot().status, LoadStatus::Idle);
        assert_eq!(controller.load().await, QueryOutcome::Applied);

        let view = controller.snapshot();
        assert_eq!(view.status, LoadStatus::Loaded);
        assert_eq!(view.transactions.len(), 20);
        assert!(view.pagination.has_next);
        assert_eq!(api.requests()[0], PageRequest::first(TransactionFilterSet::default()));
    }

    #[actix_rt::test]
    async fn test_load_more_appends_without_gaps() {
        let api = Arc::new(ScriptedApi::default());
        let first = rows(20, "misc");
        let second = rows(20, "misc");
        let third = rows(5, "misc");
        api.ready(page(first.clone(), 0, 45));
        api.ready(page(second.clone(), 20, 45));
        api.ready(page(third.clone(), 40, 45));
        let (controller, _) = controller(api.clone());

        controller.load().await;
        assert_eq!(controller.load_more().await, QueryOutcome::Applied);
        assert_eq!(controller.load_more().await, QueryOutcome::Applied);
        // nothing left
        assert_eq!(controller.load_more().await, QueryOutcome::Skipped);

        let view = controller.snapshot();
        let expected: Vec<Uuid> = first
            .iter()
            .chain(second.iter())
            .chain(third.iter())
            .map(|t| t.id)
            .collect();
        let actual: Vec<Uuid> = view.transactions.iter().map(|t| t.id).collect();
        assert_eq!(actual, expected);
        assert!(!view.pagination.has_next);

        let offsets: Vec<i64> = api.requests().iter().map(|r| r.offset).collect();
        assert_eq!(offsets, vec![0, 20, 40]);
    }

    #[actix_rt::test]
    async fn test_filter_change_resets_offset_and_replaces_list() {
        let api = Arc::new(ScriptedApi::default());
        api.ready(page(rows(20, "misc"), 0, 60));
        api.ready(page(rows(20, "misc"), 20, 60));
        api.ready(page(rows(3, "food"), 0, 3));
        let (controller, _) = controller(api.clone());

        controller.load().await;
        controller.load_more().await;
        assert_eq!(controller.snapshot().transactions.len(), 40);

        assert_eq!(controller.set_filters(food()).await, QueryOutcome::Applied);

        let view = controller.snapshot();
        assert_eq!(view.transactions.len(), 3);
        assert!(view.transactions.iter().all(|t| t.category == "food"));
        assert_eq!(view.pagination.offset, 0);
        let last = api.requests().pop().expect("request issued");
        assert_eq!(last.offset, 0);
        assert_eq!(last.filters, food());
    }

    #[actix_rt::test]
    async fn test_load_more_ignored_while_loading() {
        let api = Arc::new(ScriptedApi::default());
        api.ready(page(rows(20, "misc"), 0, 60));
        let (controller, _) = controller(api.clone());
        controller.load().await;

        let gate = api.deferred();
        let first = controller.load_more();
        let second = async {
            let outcome = controller.load_more().await;
            let _ = gate.send(page(rows(20, "misc"), 20, 60));
            outcome
        };
        let (first, second) = futures::join!(first, second);

        assert_eq!(first, QueryOutcome::Applied);
        assert_eq!(second, QueryOutcome::Skipped);
        assert_eq!(controller.snapshot().transactions.len(), 40);
        assert_eq!(api.requests().len(), 2);
    }

    #[actix_rt::test]
    async fn test_stale_response_never_overwrites_newer_filters() {
        let api = Arc::new(ScriptedApi::default());
        let slow_gate = api.deferred();
        let fresh = rows(2, "food");
        api.ready(page(fresh.clone(), 0, 2));
        let (controller, _) = controller(api.clone());

        let slow = controller.set_filters(TransactionFilterSet {
            category: Some("rent".to_string()),
            ..Default::default()
        });
        let fast = async {
            let outcome = controller.set_filters(food()).await;
            // the older response arrives only after the newer one was applied
            let _ = slow_gate.send(page(rows(7, "rent"), 0, 7));
            outcome
        };
        let (slow, fast) = futures::join!(slow, fast);

        assert_eq!(fast, QueryOutcome::Applied);
        assert_eq!(slow, QueryOutcome::Stale);

        let view = controller.snapshot();
        assert_eq!(view.filters, food());
        let ids: Vec<Uuid> = view.transactions.iter().map(|t| t.id).collect();
        assert_eq!(ids, fresh.iter().map(|t| t.id).collect::<Vec<_>>());
        assert_eq!(view.pagination.total, 2);
    }

    #[actix_rt::test]
    async fn test_failure_then_retry_uses_same_request() {
        let api = Arc::new(ScriptedApi::default());
        api.ready(page(rows(20, "misc"), 0, 30));
        api.ready(Err(server_error()));
        api.ready(page(rows(10, "misc"), 20, 30));
        let (controller, _) = controller(api.clone());

        controller.load().await;
        assert_eq!(controller.load_more().await, QueryOutcome::Failed);

        let view = controller.snapshot();
        assert_eq!(
            view.status,
            LoadStatus::Error("An internal error occurred".to_string())
        );
        // rows loaded before the failure stay visible
        assert_eq!(view.transactions.len(), 20);

        assert_eq!(controller.retry().await, QueryOutcome::Applied);
        let requests = api.requests();
        assert_eq!(requests[1], requests[2]);
        assert_eq!(controller.snapshot().transactions.len(), 30);
        assert_eq!(controller.retry().await, QueryOutcome::Skipped);
    }

    #[actix_rt::test]
    async fn test_create_refreshes_current_page_and_notifies() {
        let api = Arc::new(ScriptedApi::default());
        let first = rows(20, "misc");
        api.ready(page(first.clone(), 0, 25));
        api.ready(page(rows(5, "misc"), 20, 25));
        let (controller, notified) = controller(api.clone());
        controller.load().await;
        controller.load_more().await;

        let account_id = Uuid::new_v4();
        let created = row(account_id, "misc");
        *api.create_result.lock().unwrap() = Some(Ok(created.clone()));
        let mut refreshed = rows(5, "misc");
        refreshed.push(created.clone());
        api.ready(page(refreshed, 20, 26));

        let outcome = controller
            .create_transaction(CreateTransactionDto {
                account_id: Some(account_id),
                date: created.transaction_date,
                description: None,
                category: "misc".to_string(),
                transaction_type: "expense".to_string(),
                amount: Decimal::new(1000, 2),
            })
            .await
            .expect("Should create");

        assert_eq!(outcome.refresh, QueryOutcome::Applied);
        assert_eq!(notified.load(Ordering::SeqCst), 1);

        let last = api.requests().pop().expect("refresh issued");
        assert_eq!(last.offset, 20);

        let view = controller.snapshot();
        assert_eq!(view.transactions.len(), 26);
        assert_eq!(view.transactions[0].id, first[0].id);
        assert_eq!(view.transactions.last().map(|t| t.id), Some(created.id));
        assert_eq!(view.pagination.total, 26);
    }

    #[actix_rt::test]
    async fn test_failed_create_keeps_list() {
        let api = Arc::new(ScriptedApi::default());
        api.ready(page(rows(4, "misc"), 0, 4));
        let (controller, notified) = controller(api.clone());
        controller.load().await;

        *api.create_result.lock().unwrap() = Some(Err(ClientError::Api {
            status: 404,
            code: "NOT_FOUND".to_string(),
            message: "Account not found".to_string(),
        }));

        let result = controller
            .create_transaction(CreateTransactionDto {
                account_id: Some(Uuid::new_v4()),
                date: NaiveDate::from_ymd_opt(2025, 4, 2).expect("valid date"),
                description: None,
                category: "misc".to_string(),
                transaction_type: "income".to_string(),
                amount: Decimal::new(500, 2),
            })
            .await;

        assert!(result.is_err());
        assert_eq!(notified.load(Ordering::SeqCst), 0);
        let view = controller.snapshot();
        assert_eq!(view.status, LoadStatus::Loaded);
        assert_eq!(view.transactions.len(), 4);
        assert_eq!(view.creation_error.as_deref(), Some("Account not found"));
        assert_eq!(api.requests().len(), 1);
    }

    #[actix_rt::test]
    async fn test_clear_filters_and_account_names() {
        let account = AccountResponse {
            id: Uuid::new_v4(),
            name: "Everyday".to_string(),
            account_type: "checking".to_string(),
            balance: Decimal::ZERO,
            currency: "USD".to_string(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let api = Arc::new(ScriptedApi {
            accounts: vec![account.clone()],
            ..Default::default()
        });
        api.ready(page(rows(1, "food"), 0, 1));
        api.ready(page(rows(9, "misc"), 0, 9));
        let (controller, _) = controller(api.clone());

        assert_eq!(controller.clear_filters().await, QueryOutcome::Skipped);
        controller.set_category_filter(Some("food".to_string())).await;
        assert_eq!(controller.clear_filters().await, QueryOutcome::Applied);
        assert!(controller.snapshot().filters.is_empty());
        assert_eq!(controller.snapshot().transactions.len(), 9);

        controller.load_accounts().await.expect("Should list accounts");
        assert_eq!(controller.account_name(account.id), "Everyday");
        assert_eq!(controller.account_name(Uuid::new_v4()), "Unknown Account");
    }
}
