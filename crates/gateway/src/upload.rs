//! Multipart submission forms and proof-document storage
//!
//! Text parts become form values; file parts are checked (PDF only, size
//! limit) and written under `<uploads_dir>/<kind>/<userId>_<unixMillis>.pdf`.
//! A form that fails part-way removes whatever it already stored.

use std::collections::HashMap;
use std::fmt::Display;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use axum::extract::multipart::{Field, Multipart, MultipartError};
use chrono::{DateTime, NaiveDate, Utc};
use incentive_common::errors::{AppError, Result};
use incentive_common::records::RecordKind;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// URL prefix uploaded files are served under
pub const PUBLIC_PREFIX: &str = "/uploads";

#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub root: PathBuf,
    pub max_bytes: usize,
}

impl UploadSettings {
    /// Disk location of a public `/uploads/...` path. Anything outside the
    /// uploads root maps to `None`.
    pub fn disk_path(&self, public_path: &str) -> Option<PathBuf> {
        let relative = Path::new(public_path.strip_prefix(PUBLIC_PREFIX)?.strip_prefix('/')?);

        if relative.as_os_str().is_empty()
            || !relative.components().all(|c| matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(self.root.join(relative))
    }

    /// Delete a stored upload by its public path. Missing files are ignored.
    pub async fn remove(&self, public_path: &str) {
        let Some(path) = self.disk_path(public_path) else {
            warn!(path = public_path, "Refusing to delete file outside uploads");
            return;
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!(path = %path.display(), "Removed upload"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove upload"),
        }
    }
}

/// An uploaded file already written to disk
#[derive(Debug, Clone)]
pub struct StoredFile {
    /// Form field the file arrived in
    pub field: String,
    pub public_path: String,
}

/// A parsed multipart submission
#[derive(Debug, Default)]
pub struct SubmissionForm {
    values: HashMap<String, String>,
    files: Vec<StoredFile>,
}

impl SubmissionForm {
    /// Read every part. Files are only accepted in `file_fields`.
    pub async fn read(
        mut multipart: Multipart,
        kind: RecordKind,
        file_fields: &[&str],
        user_id: u64,
        settings: &UploadSettings,
    ) -> Result<Self> {
        let mut form = SubmissionForm::default();

        if let Err(e) = form
            .collect(&mut multipart, kind, file_fields, user_id, settings)
            .await
        {
            form.discard(settings).await;
            return Err(e);
        }
        Ok(form)
    }

    async fn collect(
        &mut self,
        multipart: &mut Multipart,
        kind: RecordKind,
        file_fields: &[&str],
        user_id: u64,
        settings: &UploadSettings,
    ) -> Result<()> {
        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            if field.file_name().is_some() {
                if !file_fields.contains(&name.as_str()) {
                    return Err(AppError::Validation {
                        message: format!("Unexpected file field: {name}"),
                        field: Some(name),
                    });
                }
                let public_path = store_file(field, kind, user_id, settings).await?;
                self.files.push(StoredFile {
                    field: name,
                    public_path,
                });
            } else {
                let value = field.text().await.map_err(multipart_error)?;
                self.values.insert(name, value);
            }
        }
        Ok(())
    }

    /// Remove every file this form stored
    pub async fn discard(&self, settings: &UploadSettings) {
        for file in &self.files {
            settings.remove(&file.public_path).await;
        }
    }

    /// Public path of the file uploaded in `field`, if any
    pub fn file(&self, field: &str) -> Option<String> {
        self.files
            .iter()
            .find(|f| f.field == field)
            .map(|f| f.public_path.clone())
    }

    pub fn files(&self) -> &[StoredFile] {
        &self.files
    }

    fn raw(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn text(&self, name: &str) -> Result<String> {
        self.optional_text(name).ok_or_else(|| AppError::MissingField {
            field: name.to_string(),
        })
    }

    pub fn optional_text(&self, name: &str) -> Option<String> {
        self.raw(name).map(str::to_string)
    }

    /// Parse a required value: numbers and enumerated choices
    pub fn parse<T>(&self, name: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.optional_parse(name)?.ok_or_else(|| AppError::MissingField {
            field: name.to_string(),
        })
    }

    pub fn optional_parse<T>(&self, name: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.raw(name)
            .map(|value| {
                value.parse().map_err(|e| AppError::Validation {
                    message: format!("Invalid value for {name}: {e}"),
                    field: Some(name.to_string()),
                })
            })
            .transpose()
    }

    pub fn date(&self, name: &str) -> Result<NaiveDate> {
        self.optional_date(name)?.ok_or_else(|| AppError::MissingField {
            field: name.to_string(),
        })
    }

    /// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp
    pub fn optional_date(&self, name: &str) -> Result<Option<NaiveDate>> {
        self.raw(name)
            .map(|value| {
                NaiveDate::parse_from_str(value, "%Y-%m-%d")
                    .or_else(|_| DateTime::parse_from_rfc3339(value).map(|dt| dt.date_naive()))
                    .map_err(|_| AppError::Validation {
                        message: format!("Invalid date for {name}: {value}"),
                        field: Some(name.to_string()),
                    })
            })
            .transpose()
    }

    /// Form booleans are the literal string `true`; anything else is false
    pub fn flag(&self, name: &str) -> bool {
        self.optional_flag(name).unwrap_or(false)
    }

    /// `None` when the field was not sent at all
    pub fn optional_flag(&self, name: &str) -> Option<bool> {
        self.values.get(name).map(|v| v.trim() == "true")
    }
}

async fn store_file(
    mut field: Field<'_>,
    kind: RecordKind,
    user_id: u64,
    settings: &UploadSettings,
) -> Result<String> {
    if field.content_type() != Some(PDF_CONTENT_TYPE) {
        return Err(AppError::UnsupportedMediaType {
            message: "Only PDF files are allowed".to_string(),
        });
    }

    let mut bytes = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        if bytes.len() + chunk.len() > settings.max_bytes {
            return Err(AppError::PayloadTooLarge {
                limit: settings.max_bytes,
            });
        }
        bytes.extend_from_slice(&chunk);
    }

    let dir = settings.root.join(kind.slug());
    tokio::fs::create_dir_all(&dir).await?;

    // Two files in one request can land on the same millisecond
    let mut millis = Utc::now().timestamp_millis();
    let (file_name, mut file) = loop {
        let file_name = format!("{user_id}_{millis}.pdf");
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(dir.join(&file_name))
            .await
        {
            Ok(file) => break (file_name, file),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => millis += 1,
            Err(e) => return Err(e.into()),
        }
    };

    let public_path = format!("{PUBLIC_PREFIX}/{}/{file_name}", kind.slug());
    if let Err(e) = async {
        file.write_all(&bytes).await?;
        file.flush().await
    }
    .await
    {
        settings.remove(&public_path).await;
        return Err(e.into());
    }

    debug!(kind = %kind, user_id, path = %public_path, size = bytes.len(), "Stored upload");
    Ok(public_path)
}

fn multipart_error(e: MultipartError) -> AppError {
    AppError::InvalidFormat {
        message: e.body_text(),
    }
}
