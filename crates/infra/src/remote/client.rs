//! Retry-wrapped remote spreadsheet client
//!
//! Failure semantics honoured per call:
//! - 401/403 surface as `Auth` and are never retried
//! - 4xx other than 429 are malformed requests, never retried
//! - 429 and 5xx retry with exponential backoff up to the configured
//!   attempt count, then surface the underlying error unchanged
//!
//! Every logical call claims a time-salted idempotency key for its
//! duration; an identical call arriving while the first is in flight
//! fails fast with `IdempotencyConflict` instead of double-executing.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use plansync_common::dedupe::DedupeGuard;
use plansync_common::retry::{
    BackoffStrategy, Jitter, RetryConfig, RetryDecision, RetryError, RetryExecutor, RetryPolicy,
};
use plansync_core::SheetService;
use plansync_domain::{
    Folder, FolderEntry, NewRow, PlansyncError, RemoteConfig, Result, RowUpdate, Sheet, SheetRow,
    WebhookSubscription,
};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client as ReqwestClient, Method, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::types::{
    ApiErrorBody, CopyRequest, CreateFolderRequest, ListEnvelope, ResultEnvelope, RowWritePayload,
    WebhookRequest,
};
use crate::errors::InfraError;

/// Upper bound on summed retry sleep per logical call.
const MAX_TOTAL_RETRY_DELAY: Duration = Duration::from_secs(120);

/// Retry classification for remote failures.
struct RemoteRetryPolicy;

impl RetryPolicy<PlansyncError> for RemoteRetryPolicy {
    fn should_retry(&self, error: &PlansyncError, _attempt: u32) -> RetryDecision {
        match error {
            PlansyncError::RateLimited(_) | PlansyncError::Network(_) => RetryDecision::Retry,
            _ => RetryDecision::Stop,
        }
    }
}

/// reqwest-backed implementation of the remote sheet service port.
pub struct RemoteSheetClient {
    http: ReqwestClient,
    base_url: String,
    retry: RetryExecutor<RemoteRetryPolicy>,
    dedupe: Arc<DedupeGuard>,
}

impl RemoteSheetClient {
    pub fn new(config: &RemoteConfig, dedupe: Arc<DedupeGuard>) -> Result<Self> {
        let token = config
            .access_token
            .as_deref()
            .ok_or_else(|| PlansyncError::Config("remote access token not configured".into()))?;

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|err| PlansyncError::Config(format!("invalid access token: {err}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http = ReqwestClient::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.max(1)))
            .default_headers(headers)
            .build()
            .map_err(|err| PlansyncError::from(InfraError::from(err)))?;

        let retry_config = RetryConfig {
            max_attempts: config.max_attempts.max(1),
            backoff: BackoffStrategy::Exponential {
                base: Duration::from_millis(config.base_backoff_ms),
                max_delay: Duration::from_millis(config.max_backoff_ms.max(config.base_backoff_ms)),
            },
            jitter: Jitter::Equal,
            max_total_delay: MAX_TOTAL_RETRY_DELAY,
        };
        retry_config.validate().map_err(PlansyncError::Config)?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            retry: RetryExecutor::new(retry_config, RemoteRetryPolicy),
            dedupe,
        })
    }

    /// Execute one logical call: claim the idempotency key, drive the
    /// attempt loop, surface either the result or the final error.
    async fn call<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        method: Method,
        path: String,
        body: Option<serde_json::Value>,
    ) -> Result<T> {
        let fingerprint = match &body {
            Some(body) => format!("{path}:{body}"),
            None => path.clone(),
        };
        let key = self.dedupe.derive_key(operation, fingerprint.as_bytes());
        let _ticket = self
            .dedupe
            .begin(&key)
            .map_err(|err| PlansyncError::IdempotencyConflict(err.to_string()))?;

        let outcome = self
            .retry
            .execute(|| self.send_once::<T>(&method, &path, body.as_ref()))
            .await;

        outcome.map_err(RetryError::into_source)
    }

    async fn send_once<T: DeserializeOwned>(
        &self,
        method: &Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<T> {
        let url = format!("{}/{path}", self.base_url);
        debug!(%method, url = url.as_str(), "remote call");

        let mut request = self.http.request(method.clone(), &url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response =
            request.send().await.map_err(|err| PlansyncError::Network(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let bytes =
                response.bytes().await.map_err(|err| PlansyncError::Network(err.to_string()))?;
            let payload: &[u8] = if bytes.is_empty() { b"null" } else { &bytes };
            return serde_json::from_slice(payload).map_err(|err| {
                PlansyncError::Internal(format!("malformed response from {path}: {err}"))
            });
        }

        let message = response
            .json::<ApiErrorBody>()
            .await
            .ok()
            .and_then(|body| body.message)
            .unwrap_or_else(|| status.to_string());

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PlansyncError::Auth(message),
            StatusCode::NOT_FOUND => PlansyncError::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => PlansyncError::RateLimited(message),
            status if status.is_client_error() => PlansyncError::Validation(message),
            status => PlansyncError::Network(format!("server error {status}: {message}")),
        })
    }

    fn json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value> {
        serde_json::to_value(value).map_err(|err| PlansyncError::Internal(err.to_string()))
    }
}

#[async_trait]
impl SheetService for RemoteSheetClient {
    async fn get_sheet(&self, sheet_id: i64) -> Result<Sheet> {
        self.call("get_sheet", Method::GET, format!("sheets/{sheet_id}"), None).await
    }

    async fn add_row(&self, sheet_id: i64, row: NewRow) -> Result<SheetRow> {
        let body = Self::json(&RowWritePayload::from(row))?;
        let envelope: ResultEnvelope<SheetRow> = self
            .call("add_row", Method::POST, format!("sheets/{sheet_id}/rows"), Some(body))
            .await?;
        Ok(envelope.result)
    }

    async fn update_rows(&self, sheet_id: i64, updates: Vec<RowUpdate>) -> Result<()> {
        let payload: Vec<RowWritePayload> =
            updates.into_iter().map(RowWritePayload::from).collect();
        let body = Self::json(&payload)?;
        self.call::<serde_json::Value>(
            "update_rows",
            Method::PUT,
            format!("sheets/{sheet_id}/rows"),
            Some(body),
        )
        .await?;
        Ok(())
    }

    async fn delete_rows(&self, sheet_id: i64, row_ids: Vec<i64>) -> Result<()> {
        let ids =
            row_ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(",");
        self.call::<serde_json::Value>(
            "delete_rows",
            Method::DELETE,
            format!("sheets/{sheet_id}/rows?ids={ids}"),
            None,
        )
        .await?;
        Ok(())
    }

    async fn create_folder(&self, parent_folder_id: i64, name: &str) -> Result<FolderEntry> {
        let body = Self::json(&CreateFolderRequest { name: name.to_string() })?;
        let envelope: ResultEnvelope<FolderEntry> = self
            .call(
                "create_folder",
                Method::POST,
                format!("folders/{parent_folder_id}/folders"),
                Some(body),
            )
            .await?;
        Ok(envelope.result)
    }

    async fn copy_sheet(
        &self,
        sheet_id: i64,
        new_name: &str,
        dest_folder_id: i64,
    ) -> Result<FolderEntry> {
        let body = Self::json(&CopyRequest {
            new_name: new_name.to_string(),
            destination_id: dest_folder_id,
            destination_type: "folder",
        })?;
        let envelope: ResultEnvelope<FolderEntry> = self
            .call("copy_sheet", Method::POST, format!("sheets/{sheet_id}/copy"), Some(body))
            .await?;
        Ok(envelope.result)
    }

    async fn copy_report(
        &self,
        report_id: i64,
        new_name: &str,
        dest_folder_id: i64,
    ) -> Result<FolderEntry> {
        let body = Self::json(&CopyRequest {
            new_name: new_name.to_string(),
            destination_id: dest_folder_id,
            destination_type: "folder",
        })?;
        let envelope: ResultEnvelope<FolderEntry> = self
            .call("copy_report", Method::POST, format!("reports/{report_id}/copy"), Some(body))
            .await?;
        Ok(envelope.result)
    }

    async fn copy_dashboard(
        &self,
        dashboard_id: i64,
        new_name: &str,
        dest_folder_id: i64,
    ) -> Result<FolderEntry> {
        let body = Self::json(&CopyRequest {
            new_name: new_name.to_string(),
            destination_id: dest_folder_id,
            destination_type: "folder",
        })?;
        let envelope: ResultEnvelope<FolderEntry> = self
            .call(
                "copy_dashboard",
                Method::POST,
                format!("dashboards/{dashboard_id}/copy"),
                Some(body),
            )
            .await?;
        Ok(envelope.result)
    }

    async fn get_folder(&self, folder_id: i64) -> Result<Folder> {
        self.call("get_folder", Method::GET, format!("folders/{folder_id}"), None).await
    }

    async fn create_webhook(
        &self,
        sheet_id: i64,
        name: &str,
        callback_url: &str,
    ) -> Result<WebhookSubscription> {
        let body = Self::json(&WebhookRequest {
            name: name.to_string(),
            callback_url: callback_url.to_string(),
            scope: "sheet",
            scope_object_id: sheet_id,
            version: 1,
        })?;
        let envelope: ResultEnvelope<WebhookSubscription> =
            self.call("create_webhook", Method::POST, "webhooks".to_string(), Some(body)).await?;
        Ok(envelope.result)
    }

    async fn delete_webhook(&self, webhook_id: i64) -> Result<()> {
        self.call::<serde_json::Value>(
            "delete_webhook",
            Method::DELETE,
            format!("webhooks/{webhook_id}"),
            None,
        )
        .await?;
        Ok(())
    }

    async fn list_webhooks(&self) -> Result<Vec<WebhookSubscription>> {
        let envelope: ListEnvelope<WebhookSubscription> =
            self.call("list_webhooks", Method::GET, "webhooks".to_string(), None).await?;
        Ok(envelope.data)
    }
}
