use axum::{Json, extract::Extension, http::StatusCode};
use std::sync::Arc;

use super::memory::MemoryStore;
use super::protocol::{BatchFault, BatchRequest, BatchResponse};

/// Executes a batch sent by a `RemoteStore` against the store hosted on this node.
pub async fn handle_batch(
    Extension(store): Extension<Arc<MemoryStore>>,
    Json(req): Json<BatchRequest>,
) -> (StatusCode, Json<BatchResponse>) {
    let count = req.commands.len();
    tracing::debug!("Batch {}: executing {} command(s)", req.op_id, count);

    let (replies, error) = store.run_batch(req.commands);

    match error {
        None => (
            StatusCode::OK,
            Json(BatchResponse {
                op_id: req.op_id,
                replies,
                fault: None,
            }),
        ),
        Some(e) => {
            tracing::error!(
                "Batch {} failed at command {} of {}: {}",
                req.op_id,
                replies.len() + 1,
                count,
                e
            );
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(BatchResponse {
                    op_id: req.op_id,
                    replies,
                    fault: Some(BatchFault::from(&e)),
                }),
            )
        }
    }
}
