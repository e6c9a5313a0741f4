//! Admin downloads of the generated exports

use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};

use crate::AppState;
use incentive_common::{
    auth::AuthContext,
    errors::{AppError, Result},
    records::RecordKind,
};

use super::ListResponse;

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

fn parse_kind(slug: &str) -> Result<RecordKind> {
    RecordKind::from_slug(slug).ok_or_else(|| AppError::Validation {
        message: "Invalid Excel file type".to_string(),
        field: Some("type".to_string()),
    })
}

/// Serve a kind's spreadsheet as an attachment. Never generated on demand.
pub async fn download(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(slug): Path<String>,
) -> Result<Response> {
    auth.require_admin()?;
    let kind = parse_kind(&slug)?;

    let path = state
        .exports
        .spreadsheet_path(kind)
        .await
        .ok_or(AppError::ExportFileNotFound { kind })?;
    let bytes = tokio::fs::read(&path).await?;

    tracing::info!(kind = %kind, user_id = auth.user_id(), size = bytes.len(), "Export downloaded");

    Ok((
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}.xlsx", kind.slug()),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// Current export rows (latest per Entry ID) keyed by column key
pub async fn current(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(slug): Path<String>,
) -> Result<Json<ListResponse<BTreeMap<String, String>>>> {
    auth.require_admin()?;
    let kind = parse_kind(&slug)?;

    let rows = state
        .exports
        .current_rows(kind)
        .await
        .map_err(|e| AppError::Internal {
            message: format!("Failed to read {kind} export: {e}"),
        })?;

    Ok(Json(ListResponse::new(rows)))
}
