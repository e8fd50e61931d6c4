use std::net::TcpListener;
use std::sync::{Arc, Mutex};

use actix_web::{web, App, HttpServer};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use secrecy::Secret;
use uuid::Uuid;

use fintrack::auth::create_access_token;
use fintrack::client::{
    format_amount, HttpLedgerClient, LedgerApi, LedgerViewController, LoadStatus, QueryOutcome,
    StaticIdentity, TransactionFilterSet,
};
use fintrack::routes;
use fintrack::store::{LedgerStore, MemoryLedgerStore};
use fintrack::transaction::models::{CreateTransactionDto, TransactionType};

const JWT_SECRET: &str = "end_to_end_secret";

struct Server {
    base_url: String,
    handle: actix_web::dev::ServerHandle,
}

fn spawn_server() -> Server {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind test listener");
    let port = listener.local_addr().expect("local addr").port();

    let store: Arc<dyn LedgerStore> = Arc::new(MemoryLedgerStore::new());
    let store = web::Data::from(store);
    let secret = web::Data::new(Secret::new(JWT_SECRET.to_string()));

    let server = HttpServer::new(move || {
        App::new()
            .app_data(store.clone())
            .app_data(secret.clone())
            .configure(routes::configure)
    })
    .listen(listener)
    .expect("Failed to listen")
    .workers(1)
    .run();

    let handle = server.handle();
    actix_rt::spawn(server);

    Server {
        base_url: format!("http://127.0.0.1:{port}"),
        handle,
    }
}

fn client_for(server: &Server, user_id: Uuid) -> Arc<HttpLedgerClient> {
    let token = create_access_token(user_id, &Secret::new(JWT_SECRET.to_string()))
        .expect("Failed to create access token");
    Arc::new(HttpLedgerClient::new(
        server.base_url.clone(),
        Arc::new(StaticIdentity::new(token)),
    ))
}

async fn create_account(server: &Server, user_id: Uuid, balance: &str) -> Uuid {
    let token = create_access_token(user_id, &Secret::new(JWT_SECRET.to_string()))
        .expect("Failed to create access token");
    let response = reqwest::Client::new()
        .post(format!("{}/api/accounts", server.base_url))
        .bearer_auth(token)
        .json(&serde_json::json!({ "name": "Everyday", "type": "checking", "balance": balance }))
        .send()
        .await
        .expect("account request");
    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.expect("account body");
    body["id"]
        .as_str()
        .and_then(|id| id.parse().ok())
        .expect("account id")
}

fn dto(account_id: Uuid, transaction_type: &str, amount: i64, category: &str) -> CreateTransactionDto {
    CreateTransactionDto {
        account_id: Some(account_id),
        date: NaiveDate::from_ymd_opt(2025, 5, 1).expect("valid date"),
        description: None,
        category: category.to_string(),
        transaction_type: transaction_type.to_string(),
        amount: Decimal::new(amount, 2),
    }
}

#[actix_rt::test]
async fn test_controller_against_live_server() {
    let server = spawn_server();
    let user_id = Uuid::new_v4();
    let account_id = create_account(&server, user_id, "100.00").await;
    let api = client_for(&server, user_id);

    for i in 0..25 {
        let category = if i % 5 == 0 { "rent" } else { "food" };
        api.create_transaction(&dto(account_id, "expense", 100, category))
            .await
            .expect("Should create");
    }

    let changed = Arc::new(Mutex::new(Vec::new()));
    let sink = changed.clone();
    let controller = LedgerViewController::new(
        api.clone(),
        Arc::new(move |id: Uuid| sink.lock().unwrap().push(id)),
    );

    assert_eq!(controller.load().await, QueryOutcome::Applied);
    let view = controller.snapshot();
    assert_eq!(view.transactions.len(), 20);
    assert_eq!(view.pagination.total, 25);
    assert!(view.pagination.has_next);

    assert_eq!(controller.load_more().await, QueryOutcome::Applied);
    let view = controller.snapshot();
    assert_eq!(view.transactions.len(), 25);
    assert!(!view.pagination.has_next);

    assert_eq!(
        controller.set_category_filter(Some("rent".to_string())).await,
        QueryOutcome::Applied
    );
    let view = controller.snapshot();
    assert_eq!(view.pagination.total, 5);
    assert!(view.transactions.iter().all(|t| t.category == "rent"));

    let outcome = controller
        .create_transaction(dto(account_id, "expense", 5000, "rent"))
        .await
        .expect("Should create through controller");
    assert_eq!(outcome.refresh, QueryOutcome::Applied);
    assert_eq!(format_amount(&outcome.transaction), "-$50.00");
    assert_eq!(*changed.lock().unwrap(), vec![account_id]);

    let view = controller.snapshot();
    assert_eq!(view.pagination.total, 6);
    assert_eq!(
        view.transactions.last().map(|t| t.id),
        Some(outcome.transaction.id)
    );

    // 100.00 - 25 * 1.00 - 50.00
    let accounts = api.list_accounts().await.expect("Should list accounts");
    assert_eq!(accounts[0].balance, Decimal::new(2500, 2));

    controller.load_accounts().await.expect("Should load accounts");
    assert_eq!(controller.account_name(account_id), "Everyday");

    server.handle.stop(true).await;
}

#[actix_rt::test]
async fn test_rejected_creation_surfaces_error() {
    let server = spawn_server();
    let owner = Uuid::new_v4();
    let account_id = create_account(&server, owner, "10.00").await;
    let intruder = client_for(&server, Uuid::new_v4());

    let controller = LedgerViewController::new(intruder, Arc::new(|_: Uuid| {}));
    controller
        .set_filters(TransactionFilterSet {
            account_id: Some(account_id),
            transaction_type: Some(TransactionType::Expense),
            ..Default::default()
        })
        .await;
    let view = controller.snapshot();
    assert_eq!(view.status, LoadStatus::Loaded);
    assert_eq!(view.pagination.total, 0);

    let err = controller
        .create_transaction(dto(account_id, "expense", 500, "misc"))
        .await
        .expect_err("Should reject foreign account");
    assert!(!err.is_retryable());
    assert_eq!(
        controller.snapshot().creation_error.as_deref(),
        Some("Account not found")
    );

    let owner_api = client_for(&server, owner);
    let accounts = owner_api.list_accounts().await.expect("Should list accounts");
    assert_eq!(accounts[0].balance, Decimal::new(1000, 2));

    server.handle.stop(true).await;
}
