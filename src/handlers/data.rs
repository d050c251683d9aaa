use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};

use super::AppState;
use crate::api::{DeleteBody, InsertBody, UpdateBody};
use crate::database::ConnectionSource;
use crate::filter::Row;
use crate::middleware::{ApiResponse, ApiResult};
use crate::types::Caller;

/// POST /api/data/:table - insert a batch, returning the inserted rows
pub async fn data_post<S: ConnectionSource>(
    State(state): State<AppState<S>>,
    Extension(caller): Extension<Caller>,
    Path(table): Path<String>,
    body: Result<Json<InsertBody>, JsonRejection>,
) -> ApiResult<Vec<Row>> {
    let Json(body) = body?;
    let rows = state.tables.insert(&caller, &table, &body.rows).await?;
    Ok(ApiResponse::created(rows))
}

/// PATCH /api/data/:table - update rows matching `where`
pub async fn data_patch<S: ConnectionSource>(
    State(state): State<AppState<S>>,
    Extension(caller): Extension<Caller>,
    Path(table): Path<String>,
    body: Result<Json<UpdateBody>, JsonRejection>,
) -> ApiResult<Vec<Row>> {
    let Json(body) = body?;
    let rows = state.tables.update(&caller, &table, &body.patch, &body.filters).await?;
    Ok(ApiResponse::rows(rows))
}

/// DELETE /api/data/:table - delete rows matching `where`
pub async fn data_delete<S: ConnectionSource>(
    State(state): State<AppState<S>>,
    Extension(caller): Extension<Caller>,
    Path(table): Path<String>,
    body: Result<Json<DeleteBody>, JsonRejection>,
) -> ApiResult<Vec<Row>> {
    let Json(body) = body?;
    let rows = state.tables.delete(&caller, &table, &body.filters).await?;
    Ok(ApiResponse::rows(rows))
}
