use super::atoms::{SymbolPairExtractor, SymbolTree};
use super::engine::ExpressionIndex;
use super::ranker::FMeasureRanker;
use super::types::{
    AddOutcome, ErrorResponse, ExactSearchResponse, ExprId, ExpressionRecord, SearchResponse,
};
use crate::error::{IndexError, StoreError};
use crate::storage::store::Store;

use axum::extract::Path;
use axum::http::StatusCode;
use axum::{Extension, Json};
use std::sync::Arc;

/// The index served over HTTP: symbol layout trees scored by F-measure.
pub type SymbolIndex<S> = ExpressionIndex<S, SymbolPairExtractor, FMeasureRanker>;

type HandlerError = (StatusCode, Json<ErrorResponse>);

fn error_reply(operation: &str, err: IndexError) -> HandlerError {
    tracing::error!("{} failed: {}", operation, err);
    let status = match &err {
        IndexError::Store(StoreError::Http(_)) | IndexError::Store(StoreError::Remote { .. }) => {
            StatusCode::BAD_GATEWAY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            code: err.code().to_string(),
            error: err.to_string(),
        }),
    )
}

pub async fn handle_add<S: Store + 'static>(
    Extension(index): Extension<Arc<SymbolIndex<S>>>,
    Json(tree): Json<SymbolTree>,
) -> Result<(StatusCode, Json<AddOutcome>), HandlerError> {
    match index.add(&tree).await {
        Ok(outcome @ AddOutcome::Created(_)) => Ok((StatusCode::CREATED, Json(outcome))),
        Ok(outcome) => Ok((StatusCode::OK, Json(outcome))),
        Err(e) => Err(error_reply("add", e)),
    }
}

pub async fn handle_search<S: Store + 'static>(
    Extension(index): Extension<Arc<SymbolIndex<S>>>,
    Json(tree): Json<SymbolTree>,
) -> Result<Json<SearchResponse>, HandlerError> {
    let results = index
        .search(&tree)
        .await
        .map_err(|e| error_reply("search", e))?;
    let results = results
        .collect_all()
        .await
        .map_err(|e| error_reply("search", e))?;

    Ok(Json(SearchResponse {
        count: results.len(),
        results,
    }))
}

pub async fn handle_exact_search<S: Store + 'static>(
    Extension(index): Extension<Arc<SymbolIndex<S>>>,
    Json(tree): Json<SymbolTree>,
) -> Result<Json<ExactSearchResponse>, HandlerError> {
    let id = index
        .exact_search(&tree)
        .await
        .map_err(|e| error_reply("exact_search", e))?;
    Ok(Json(ExactSearchResponse { id }))
}

pub async fn handle_get_expression<S: Store + 'static>(
    Extension(index): Extension<Arc<SymbolIndex<S>>>,
    Path(id): Path<ExprId>,
) -> Result<Json<ExpressionRecord>, HandlerError> {
    match index.record(id).await {
        Ok(Some(record)) => Ok(Json(record)),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                code: "NOT_FOUND".to_string(),
                error: format!("expression {} does not exist", id),
            }),
        )),
        Err(e) => Err(error_reply("get_expression", e)),
    }
}
