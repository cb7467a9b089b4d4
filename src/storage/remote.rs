//! HTTP client for a store hosted by another node.
//!
//! Every call to [`Store::execute`] becomes exactly one POST to [`ENDPOINT_BATCH`]. Failures are
//! returned to the caller as they are; retrying is left to the caller, which is safe because all
//! index writes are idempotent.

use super::protocol::{BatchRequest, BatchResponse, Command, ENDPOINT_BATCH, Reply};
use super::store::Store;
use crate::error::StoreError;

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use uuid::Uuid;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone)]
pub struct RemoteStoreConfig {
    /// Address of the node hosting the store.
    pub addr: SocketAddr,
    /// Optional path prefix the store routes are mounted under.
    pub base_path: String,
    /// Per-batch request timeout.
    pub timeout: Duration,
}

impl RemoteStoreConfig {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            base_path: String::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

pub struct RemoteStore {
    http_client: reqwest::Client,
    batch_url: String,
    timeout: Duration,
}

impl RemoteStore {
    pub fn new(config: RemoteStoreConfig) -> Self {
        let cleaned = config.base_path.trim_end_matches('/');
        let base_path = if cleaned.is_empty() {
            String::new()
        } else if cleaned.starts_with('/') {
            cleaned.to_string()
        } else {
            format!("/{}", cleaned)
        };

        Self {
            http_client: reqwest::Client::new(),
            batch_url: format!("http://{}{}{}", config.addr, base_path, ENDPOINT_BATCH),
            timeout: config.timeout,
        }
    }

    pub fn batch_url(&self) -> &str {
        &self.batch_url
    }

    async fn send_batch(&self, commands: Vec<Command>) -> Result<Vec<Reply>, StoreError> {
        let op_id = Uuid::new_v4().to_string();
        let expected = commands.len();
        tracing::debug!("Sending batch {} with {} command(s)", op_id, expected);

        let payload = BatchRequest {
            op_id: op_id.clone(),
            commands,
        };
        let response = self
            .http_client
            .post(&self.batch_url)
            .json(&payload)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        let body: BatchResponse = match response.json().await {
            Ok(body) => body,
            Err(e) if !status.is_success() => {
                return Err(StoreError::Remote {
                    op_id,
                    status: status.as_u16(),
                    message: e.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(fault) = body.fault {
            tracing::warn!(
                "Batch {} stopped after {} of {} command(s)",
                op_id,
                body.replies.len(),
                expected
            );
            return Err(fault.into_store_error(&op_id, status.as_u16()));
        }
        if !status.is_success() {
            return Err(StoreError::Remote {
                op_id,
                status: status.as_u16(),
                message: "batch failed without a fault description".to_string(),
            });
        }
        if body.replies.len() != expected {
            return Err(StoreError::ReplyCount {
                expected,
                got: body.replies.len(),
            });
        }
        Ok(body.replies)
    }
}

impl Store for RemoteStore {
    fn execute(
        &self,
        commands: Vec<Command>,
    ) -> impl Future<Output = Result<Vec<Reply>, StoreError>> + Send {
        self.send_batch(commands)
    }
}
