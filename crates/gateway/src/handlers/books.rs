//! Book and book-chapter submissions

use incentive_common::{
    errors::{AppError, Result},
    records::{BookFields, BookPatch},
    store::{Collection, RecordStore},
};

use super::records::FormRecord;
use crate::upload::SubmissionForm;

/// Multipart field carrying the proof document
pub const PROOF_FILE: &str = "proofFile";

impl FormRecord for BookFields {
    const FILE_FIELDS: &'static [&'static str] = &[PROOF_FILE];

    fn collection(store: &RecordStore) -> &Collection<Self> {
        &store.books
    }

    fn from_form(form: &SubmissionForm) -> Result<Self> {
        let proof_file_path = form.file(PROOF_FILE).ok_or_else(|| AppError::Validation {
            message: "Please upload proof of publication".to_string(),
            field: Some(PROOF_FILE.to_string()),
        })?;

        Ok(BookFields {
            title: form.text("title")?,
            publisher: form.text("publisher")?,
            book_type: form.parse("type")?,
            publication_date: form.date("publicationDate")?,
            total_authors: form.parse("totalAuthors")?,
            srmist_authors: form.optional_parse("srmistAuthors")?.unwrap_or_default(),
            isbn: form.text("isbn")?,
            proof_file_path,
        })
    }

    fn patch_from_form(form: &SubmissionForm) -> Result<BookPatch> {
        Ok(BookPatch {
            title: form.optional_text("title"),
            publisher: form.optional_text("publisher"),
            book_type: form.optional_parse("type")?,
            publication_date: form.optional_date("publicationDate")?,
            total_authors: form.optional_parse("totalAuthors")?,
            srmist_authors: form.optional_parse("srmistAuthors")?,
            isbn: form.optional_text("isbn"),
            proof_file_path: form.file(PROOF_FILE),
        })
    }
}
