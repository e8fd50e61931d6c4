#![allow(dead_code)]

use std::sync::Arc;

use actix_web::{http::header, test, web, App};
use secrecy::Secret;
use serde_json::{json, Value};
use uuid::Uuid;

use fintrack::auth::create_access_token;
use fintrack::routes;
use fintrack::store::{LedgerStore, MemoryLedgerStore};

pub const JWT_SECRET: &str = "test_jwt_secret_for_integration_tests";

pub struct TestApp {
    pub store: Arc<dyn LedgerStore>,
    jwt_secret: Secret<String>,
}

pub struct TestResponse {
    status: u16,
    body: bytes::Bytes,
}

impl TestResponse {
    pub fn status(&self) -> u16 {
        self.status
    }

    pub async fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("Failed to parse JSON response")
    }
}

/// A caller with its own identity and token.
pub struct TestUser {
    pub id: Uuid,
    pub token: String,
}

impl TestApp {
    pub async fn new() -> Self {
        TestApp {
            store: Arc::new(MemoryLedgerStore::new()),
            jwt_secret: Secret::new(JWT_SECRET.to_string()),
        }
    }

    pub fn user(&self) -> TestUser {
        let id = Uuid::new_v4();
        let token =
            create_access_token(id, &self.jwt_secret).expect("Failed to create access token");
        TestUser { id, token }
    }

    async fn call(&self, req: test::TestRequest) -> TestResponse {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::from(self.store.clone()))
                .app_data(web::Data::new(self.jwt_secret.clone()))
                .configure(routes::configure),
        )
        .await;

        let resp = test::call_service(&app, req.to_request()).await;

        let status = resp.status().as_u16();
        let body = test::read_body(resp).await;

        TestResponse { status, body }
    }

    pub async fn get_anonymous(&self, path: &str) -> TestResponse {
        self.call(test::TestRequest::get().uri(path)).await
    }

    pub async fn get(&self, path: &str, user: &TestUser) -> TestResponse {
        self.call(
            test::TestRequest::get()
                .uri(path)
                .insert_header((header::AUTHORIZATION, format!("Bearer {}", user.token))),
        )
        .await
    }

    pub async fn post(&self, path: &str, user: &TestUser, payload: &Value) -> TestResponse {
        self.call(
            test::TestRequest::post()
                .uri(path)
                .insert_header((header::AUTHORIZATION, format!("Bearer {}", user.token)))
                .set_json(payload),
        )
        .await
    }

    pub async fn post_raw(&self, path: &str, user: &TestUser, body: &'static str) -> TestResponse {
        self.call(
            test::TestRequest::post()
                .uri(path)
                .insert_header((header::AUTHORIZATION, format!("Bearer {}", user.token)))
                .insert_header((header::CONTENT_TYPE, "application/json"))
                .set_payload(body),
        )
        .await
    }

    /// Create an account for `user` and return its id.
    pub async fn create_account(&self, user: &TestUser, name: &str, balance: &str) -> String {
        let response = self
            .post(
                "/api/accounts",
                user,
                &json!({ "name": name, "type": "checking", "balance": balance }),
            )
            .await;
        assert_eq!(response.status(), 201);
        response.json().await["id"]
            .as_str()
            .expect("account id")
            .to_string()
    }

    pub async fn create_transaction(
        &self,
        user: &TestUser,
        account_id: &str,
        transaction_type: &str,
        amount: &str,
        category: &str,
    ) -> TestResponse {
        self.post(
            "/api/transactions",
            user,
            &json!({
                "accountId": account_id,
                "date": "2025-04-01",
                "category": category,
                "type": transaction_type,
                "amount": amount,
            }),
        )
        .await
    }
}
