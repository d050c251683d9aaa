use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};

use super::AppState;
use crate::api::WireQuery;
use crate::database::ConnectionSource;
use crate::filter::Row;
use crate::middleware::{ApiResponse, ApiResult};
use crate::types::Caller;

/// POST /api/find/:table - filtered read
///
/// Body is a [`WireQuery`]: select, where, order, limit, offset. Rows are
/// scoped to the caller by the access policy.
pub async fn find_post<S: ConnectionSource>(
    State(state): State<AppState<S>>,
    Extension(caller): Extension<Caller>,
    Path(table): Path<String>,
    body: Result<Json<WireQuery>, JsonRejection>,
) -> ApiResult<Vec<Row>> {
    let Json(query) = body?;
    let request = query.into_request(table);
    let rows = state.tables.read(&caller, &request).await?;
    Ok(ApiResponse::rows(rows))
}

/// POST /api/count/:table - count matching rows
pub async fn count_post<S: ConnectionSource>(
    State(state): State<AppState<S>>,
    Extension(caller): Extension<Caller>,
    Path(table): Path<String>,
    body: Result<Json<WireQuery>, JsonRejection>,
) -> ApiResult<i64> {
    let Json(query) = body?;
    let request = query.into_request(table);
    let count = state.tables.count(&caller, &request).await?;
    Ok(ApiResponse::success(count))
}
