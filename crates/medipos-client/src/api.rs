//! # Pharmacy Backend API
//!
//! The REST calls the POS screen makes, behind the [`PosApi`] trait so the
//! dispatcher can be driven by a fake in tests.
//!
//! ## Endpoints
//! ```text
//! ┌────────────────────────────────┬──────────────────────────────────────┐
//! │  GET  /api/medicines           │  catalog                             │
//! │  GET  /api/patients            │  customers                           │
//! │  GET  /api/settings            │  shop settings document              │
//! │  POST /api/sales               │  SaleSubmission   → outcome          │
//! │  POST /api/returns             │  ReturnSubmission → outcome          │
//! │  GET  /api/sales/patient/{id}  │  customer's previous sales           │
//! └────────────────────────────────┴──────────────────────────────────────┘
//! ```
//!
//! Error bodies are `{"detail": "..."}`; the detail is kept on
//! [`ClientError::Server`] so it can be shown verbatim. Nothing is retried
//! and the HTTP client's default timeouts apply.

use std::future::Future;

use medipos_core::settings::ShopSettings;
use medipos_core::types::{
    CatalogItem, Customer, PastTransaction, TransactionOutcome, TransactionRequest,
};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

// =============================================================================
// PosApi Trait
// =============================================================================

/// Everything the workstation asks of the backend.
pub trait PosApi: Send + Sync {
    fn list_catalog(&self) -> impl Future<Output = ClientResult<Vec<CatalogItem>>> + Send;

    fn list_customers(&self) -> impl Future<Output = ClientResult<Vec<Customer>>> + Send;

    fn fetch_settings(&self) -> impl Future<Output = ClientResult<ShopSettings>> + Send;

    /// Creates a sale or a return, depending on the request variant.
    fn submit(
        &self,
        request: &TransactionRequest,
    ) -> impl Future<Output = ClientResult<TransactionOutcome>> + Send;

    fn customer_history(
        &self,
        customer_id: &str,
    ) -> impl Future<Output = ClientResult<Vec<PastTransaction>>> + Send;
}

// =============================================================================
// HTTP Implementation
// =============================================================================

#[derive(Debug, Clone)]
pub struct HttpPosApi {
    client: Client,
    base: Url,
}

impl HttpPosApi {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let base = config.api_base()?;
        let client = Client::builder().build().map_err(|e| ClientError::Connection {
            url: base.to_string(),
            message: format!("Failed to create HTTP client: {e}"),
        })?;
        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> ClientResult<Url> {
        Ok(self.base.join("api/")?.join(path)?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let url = self.endpoint(path)?;
        debug!(%url, "GET");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| connection_error(&self.base, &e))?;
        read_json(&url, response).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        let url = self.endpoint(path)?;
        debug!(%url, "POST");
        let response = self
            .client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| connection_error(&self.base, &e))?;
        read_json(&url, response).await
    }
}

impl PosApi for HttpPosApi {
    async fn list_catalog(&self) -> ClientResult<Vec<CatalogItem>> {
        self.get_json("medicines").await
    }

    async fn list_customers(&self) -> ClientResult<Vec<Customer>> {
        self.get_json("patients").await
    }

    async fn fetch_settings(&self) -> ClientResult<ShopSettings> {
        self.get_json("settings").await
    }

    async fn submit(&self, request: &TransactionRequest) -> ClientResult<TransactionOutcome> {
        match request {
            TransactionRequest::Sale(sale) => self.post_json("sales", sale).await,
            TransactionRequest::Return(ret) => self.post_json("returns", ret).await,
        }
    }

    async fn customer_history(&self, customer_id: &str) -> ClientResult<Vec<PastTransaction>> {
        let mut url = self.endpoint("sales/patient/")?;
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .push(customer_id);
        debug!(%url, "GET");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| connection_error(&self.base, &e))?;
        read_json(&url, response).await
    }
}

// =============================================================================
// Response Handling
// =============================================================================

async fn read_json<T: DeserializeOwned>(url: &Url, response: reqwest::Response) -> ClientResult<T> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| connection_error(url, &e))?;

    if !status.is_success() {
        return Err(server_error(status, &body));
    }

    serde_json::from_str(&body).map_err(|e| ClientError::Deserialization {
        endpoint: url.path().to_string(),
        message: e.to_string(),
    })
}

/// Builds [`ClientError::Server`] from a failed response body.
///
/// `detail` may be a string or, for request validation failures, a list of
/// objects; the latter is kept as compact JSON.
fn server_error(status: StatusCode, body: &str) -> ClientError {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| json.get("detail").cloned())
        .map(|detail| match detail {
            Value::String(text) => text,
            other => other.to_string(),
        })
        .filter(|detail| !detail.trim().is_empty());

    ClientError::Server {
        status: status.as_u16(),
        detail,
    }
}

fn connection_error(url: &Url, err: &reqwest::Error) -> ClientError {
    let message = if err.is_connect() {
        format!("Cannot reach the pharmacy server at {url}")
    } else if err.is_timeout() {
        format!("Connection to {url} timed out")
    } else if err.is_builder() {
        format!("Invalid pharmacy server URL: {url}")
    } else {
        format!("Network error communicating with {url}: {err}")
    };
    ClientError::Connection {
        url: url.to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(base: &str) -> HttpPosApi {
        let config = ClientConfig {
            api_url: base.to_string(),
            ..ClientConfig::default()
        };
        HttpPosApi::new(&config).unwrap()
    }

    #[test]
    fn test_endpoints_live_under_api() {
        let api = api("http://localhost:8001");
        assert_eq!(
            api.endpoint("medicines").unwrap().as_str(),
            "http://localhost:8001/api/medicines"
        );
        assert_eq!(
            api.endpoint("sales/patient/").unwrap().as_str(),
            "http://localhost:8001/api/sales/patient/"
        );
    }

    #[test]
    fn test_endpoints_keep_base_path() {
        let api = api("https://pharmacy.example.com/branch-2");
        assert_eq!(
            api.endpoint("returns").unwrap().as_str(),
            "https://pharmacy.example.com/branch-2/api/returns"
        );
    }

    #[test]
    fn test_server_error_string_detail() {
        let err = server_error(
            StatusCode::BAD_REQUEST,
            r#"{"detail": "Insufficient stock for Paracetamol"}"#,
        );
        assert_eq!(err.user_message(), "Insufficient stock for Paracetamol");
    }

    #[test]
    fn test_server_error_list_detail() {
        let err = server_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"detail": [{"loc": ["body", "items"], "msg": "field required"}]}"#,
        );
        match err {
            ClientError::Server { status, detail } => {
                assert_eq!(status, 422);
                assert!(detail.unwrap().contains("field required"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_server_error_without_json() {
        let err = server_error(StatusCode::BAD_GATEWAY, "<html>Bad Gateway</html>");
        assert!(matches!(
            err,
            ClientError::Server {
                status: 502,
                detail: None
            }
        ));
        assert_eq!(err.user_message(), "Pharmacy server error (HTTP 502)");
    }
}
