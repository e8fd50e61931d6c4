use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;

use super::{ClientError, IdentityProvider, LedgerApi, PageRequest};
use crate::account::models::{AccountResponse, AccountsListResponse};
use crate::errors::ErrorResponse;
use crate::transaction::models::{
    CreateTransactionDto, PaginatedTransactionResponse, TransactionResponse,
};

/// `LedgerApi` over the service's JSON endpoints.
pub struct HttpLedgerClient {
    http: reqwest::Client,
    base_url: String,
    identity: Arc<dyn IdentityProvider>,
}

impl HttpLedgerClient {
    pub fn new(base_url: impl Into<String>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, identity)
    }

    pub fn with_client(
        http: reqwest::Client,
        base_url: impl Into<String>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            identity,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    fn authorize(&self, builder: RequestBuilder) -> Result<RequestBuilder, ClientError> {
        let token = self
            .identity
            .bearer_token()
            .ok_or(ClientError::Unauthenticated)?;
        Ok(builder.bearer_auth(token.expose_secret()))
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let response = self
            .authorize(builder)?
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|e| ClientError::Transport(e.to_string()))?;

    if status.is_success() {
        return serde_json::from_slice(&body).map_err(|e| ClientError::Decode(e.to_string()));
    }

    let (code, message) = match serde_json::from_slice::<ErrorResponse>(&body) {
        Ok(err) => (err.error, err.message),
        Err(_) => (
            "UNKNOWN".to_string(),
            format!("Request failed with status {status}"),
        ),
    };

    Err(ClientError::Api {
        status: status.as_u16(),
        code,
        message,
    })
}

#[async_trait]
impl LedgerApi for HttpLedgerClient {
    async fn fetch_page(
        &self,
        request: &PageRequest,
    ) -> Result<PaginatedTransactionResponse, ClientError> {
        let builder = self
            .http
            .get(self.url("/transactions"))
            .query(&request.to_params());
        self.send(builder).await
    }

    async fn create_transaction(
        &self,
        dto: &CreateTransactionDto,
    ) -> Result<TransactionResponse, ClientError> {
        let builder = self.http.post(self.url("/transactions")).json(dto);
        self.send(builder).await
    }

    async fn list_accounts(&self) -> Result<Vec<AccountResponse>, ClientError> {
        let builder = self.http.get(self.url("/accounts"));
        let list: AccountsListResponse = self.send(builder).await?;
        Ok(list.accounts)
    }
}
