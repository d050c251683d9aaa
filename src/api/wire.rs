//! Request and response bodies shared by the HTTP handlers and the client.

use serde::{Deserialize, Serialize};

use crate::filter::{FilterCondition, FilterOrder, Pagination, QueryRequest, Row};

/// Read request body: `select` is a comma-joined column list or `*`, `order`
/// is comma-joined `column:direction` pairs, `where` is positional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select: Option<String>,
    #[serde(default, rename = "where", skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<FilterCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

impl WireQuery {
    pub fn into_request(self, table: impl Into<String>) -> QueryRequest {
        let select = match self.select.as_deref().map(str::trim) {
            None | Some("") | Some("*") => vec![],
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect(),
        };
        QueryRequest {
            table: table.into(),
            select,
            filters: self.filters,
            order: self.order.as_deref().map(FilterOrder::parse).unwrap_or_default(),
            pagination: Pagination { limit: self.limit, offset: self.offset },
        }
    }

    pub fn from_request(request: &QueryRequest) -> Self {
        Self {
            select: Some(if request.select.is_empty() { "*".to_string() } else { request.select.join(",") }),
            filters: request.filters.clone(),
            order: (!request.order.is_empty()).then(|| FilterOrder::format(&request.order)),
            limit: request.pagination.limit,
            offset: request.pagination.offset,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsertBody {
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateBody {
    pub patch: Row,
    #[serde(default, rename = "where")]
    pub filters: Vec<FilterCondition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeleteBody {
    #[serde(default, rename = "where")]
    pub filters: Vec<FilterCondition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireError {
    pub code: String,
    pub message: String,
    pub timestamp: String,
}

/// Envelope as seen by a client: either data (and count) or an error
#[derive(Debug, Clone, Deserialize)]
pub struct WireResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub error: Option<WireError>,
}
