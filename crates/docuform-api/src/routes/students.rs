//! Student record lookup.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use docuform_records::{DEFAULT_SEARCH_LIMIT, RecordDirectory, StudentRecord};
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::state::AppState;

/// Upper bound on `limit`.
pub const MAX_SEARCH_LIMIT: usize = 200;

/// `GET /api/students` query string.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    /// Substring of the student's name; empty lists the first students.
    #[serde(default)]
    pub q: String,
    /// Maximum number of results.
    pub limit: Option<usize>,
}

/// `GET /api/students` response.
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    /// Matching students in source order.
    pub students: Vec<StudentRecord>,
}

fn directory(state: &AppState) -> Result<Arc<RecordDirectory>> {
    Ok(state
        .records
        .clone()
        .ok_or(docuform_records::Error::NotConfigured)?)
}

/// `GET /api/students?q=&limit=`
pub async fn search_students(
    State(state): State<AppState>,
    params: std::result::Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchResponse>> {
    let Query(params) = params?;
    let records = directory(&state)?;
    let limit = params
        .limit
        .unwrap_or(DEFAULT_SEARCH_LIMIT)
        .clamp(1, MAX_SEARCH_LIMIT);
    let students = records.search(&params.q, limit).await?;
    Ok(Json(SearchResponse { students }))
}

/// `GET /api/students/{id}`
pub async fn get_student(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StudentRecord>> {
    let records = directory(&state)?;
    Ok(Json(records.lookup(&id).await?))
}
