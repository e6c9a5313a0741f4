//! Submission handlers shared by every record kind
//!
//! Each kind plugs in through [`FormRecord`]: how to build its fields and
//! patches from a multipart form, and which collection holds it.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::upload::SubmissionForm;
use crate::AppState;
use incentive_common::{
    auth::AuthContext,
    errors::{AppError, Result},
    metrics,
    records::{Entry, RecordFields},
    store::{Collection, ListFilter, RecordStore},
};

use super::{DataResponse, ListResponse};

pub trait FormRecord: RecordFields {
    /// Multipart fields that may carry an upload
    const FILE_FIELDS: &'static [&'static str];

    fn collection(store: &RecordStore) -> &Collection<Self>;

    /// Fields for a new record. Required uploads are checked here.
    fn from_form(form: &SubmissionForm) -> Result<Self>;

    /// Changes carried by an update form; absent values stay untouched
    fn patch_from_form(form: &SubmissionForm) -> Result<Self::Patch>;
}

/// Routes for one kind, nested under `/api/{slug}`
pub fn routes<F: FormRecord>() -> Router<AppState> {
    Router::new()
        .route("/", post(create::<F>).get(list::<F>))
        .route("/{id}", get(get_one::<F>).put(update::<F>).delete(remove::<F>))
}

fn forbidden<F: FormRecord>(action: &str) -> AppError {
    AppError::Forbidden {
        message: format!(
            "Not authorized to {action} this {}",
            F::KIND.label().to_lowercase()
        ),
    }
}

async fn find_accessible<F: FormRecord>(
    state: &AppState,
    auth: &AuthContext,
    id: u64,
    action: &str,
) -> Result<Entry<F>> {
    let entry = F::collection(&state.store)
        .find_by_id(id)
        .await
        .ok_or(AppError::RecordNotFound { kind: F::KIND, id })?;

    if !auth.can_access(entry.meta.owner.user_id) {
        return Err(forbidden::<F>(action));
    }
    Ok(entry)
}

/// Mirror a stored record into the export files. The outcome is only logged.
async fn export<F: FormRecord>(state: &AppState, entry: &Entry<F>) {
    if !state.exports.append_entry(&entry.clone().into()).await {
        tracing::warn!(
            kind = %F::KIND,
            id = entry.id(),
            "Failed to add entry to export files"
        );
    }
}

/// Create a record from a multipart submission
pub async fn create<F: FormRecord>(
    State(state): State<AppState>,
    auth: AuthContext,
    multipart: Multipart,
) -> Result<(StatusCode, Json<DataResponse<Entry<F>>>)> {
    let form = SubmissionForm::read(
        multipart,
        F::KIND,
        F::FILE_FIELDS,
        auth.user_id(),
        &state.uploads,
    )
    .await?;

    let created = match F::from_form(&form) {
        Ok(fields) => F::collection(&state.store).create(auth.owner(), fields).await,
        Err(e) => Err(e),
    };
    let entry = match created {
        Ok(entry) => entry,
        Err(e) => {
            form.discard(&state.uploads).await;
            return Err(e);
        }
    };

    metrics::record_record_op(F::KIND, "create");
    tracing::info!(
        kind = %F::KIND,
        id = entry.id(),
        user_id = auth.user_id(),
        request_id = %auth.request_id,
        "Record created"
    );

    export(&state, &entry).await;

    Ok((StatusCode::CREATED, Json(DataResponse::new(entry))))
}

/// List records: everything for admins, otherwise the caller's own
pub async fn list<F: FormRecord>(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<ListResponse<Entry<F>>>> {
    let filter = if auth.is_admin() {
        ListFilter::all()
    } else {
        ListFilter::owned_by(auth.user_id())
    };

    let entries = F::collection(&state.store).find(filter).await;
    Ok(Json(ListResponse::new(entries)))
}

pub async fn get_one<F: FormRecord>(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<u64>,
) -> Result<Json<DataResponse<Entry<F>>>> {
    let entry = find_accessible::<F>(&state, &auth, id, "access").await?;
    Ok(Json(DataResponse::new(entry)))
}

/// Merge a multipart update into a record.
///
/// A newly uploaded file replaces the old one on disk. The export gets a
/// fresh row for the updated record.
pub async fn update<F: FormRecord>(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<u64>,
    multipart: Multipart,
) -> Result<Json<DataResponse<Entry<F>>>> {
    let form = SubmissionForm::read(
        multipart,
        F::KIND,
        F::FILE_FIELDS,
        auth.user_id(),
        &state.uploads,
    )
    .await?;

    let (previous, updated) = match apply_update::<F>(&state, &auth, id, &form).await {
        Ok(pair) => pair,
        Err(e) => {
            form.discard(&state.uploads).await;
            return Err(e);
        }
    };

    let current = updated.fields.file_paths();
    for old in previous.fields.file_paths() {
        if !current.contains(&old) {
            state.uploads.remove(old).await;
        }
    }

    metrics::record_record_op(F::KIND, "update");
    tracing::info!(
        kind = %F::KIND,
        id,
        user_id = auth.user_id(),
        files = form.files().len(),
        "Record updated"
    );

    export(&state, &updated).await;

    Ok(Json(DataResponse::new(updated)))
}

async fn apply_update<F: FormRecord>(
    state: &AppState,
    auth: &AuthContext,
    id: u64,
    form: &SubmissionForm,
) -> Result<(Entry<F>, Entry<F>)> {
    let previous = find_accessible::<F>(state, auth, id, "update").await?;
    let patch = F::patch_from_form(form)?;

    let updated = F::collection(&state.store)
        .update(id, patch)
        .await?
        .ok_or(AppError::RecordNotFound { kind: F::KIND, id })?;

    Ok((previous, updated))
}

/// Delete a record and its uploaded files. The export keeps its rows.
pub async fn remove<F: FormRecord>(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<u64>,
) -> Result<Json<DataResponse<Value>>> {
    find_accessible::<F>(&state, &auth, id, "delete").await?;

    let removed = F::collection(&state.store)
        .delete(id)
        .await
        .ok_or(AppError::RecordNotFound { kind: F::KIND, id })?;

    for path in removed.fields.file_paths() {
        state.uploads.remove(path).await;
    }

    metrics::record_record_op(F::KIND, "delete");
    tracing::info!(kind = %F::KIND, id, user_id = auth.user_id(), "Record deleted");

    Ok(Json(DataResponse::new(json!({}))))
}
