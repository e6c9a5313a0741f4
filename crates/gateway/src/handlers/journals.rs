//! Journal paper submissions

use incentive_common::{
    errors::{AppError, Result},
    records::{JournalFields, JournalPatch},
    store::{Collection, RecordStore},
};

use super::records::FormRecord;
use crate::upload::SubmissionForm;

pub const PROOF_FILE: &str = "proofFile";

impl FormRecord for JournalFields {
    const FILE_FIELDS: &'static [&'static str] = &[PROOF_FILE];

    fn collection(store: &RecordStore) -> &Collection<Self> {
        &store.journals
    }

    fn from_form(form: &SubmissionForm) -> Result<Self> {
        let proof_file_path = form.file(PROOF_FILE).ok_or_else(|| AppError::Validation {
            message: "Please upload proof of publication".to_string(),
            field: Some(PROOF_FILE.to_string()),
        })?;

        Ok(JournalFields {
            paper_title: form.text("paperTitle")?,
            journal_name: form.text("journalName")?,
            issn: form.text("issn")?,
            author_level: form.text("authorLevel")?,
            is_corresponding_author: form.flag("isCorrespondingAuthor"),
            affiliation_first_author: form.parse("affiliation1stAuthor")?,
            affiliation_corresponding_author: form.parse("affiliationCorrespondingAuthor")?,
            is_same_author: form.flag("isSameAuthor"),
            corresponding_authors_count: form
                .optional_parse("correspondingAuthorsCount")?
                .unwrap_or_default(),
            authors_count: form.optional_parse("authorsCount")?.unwrap_or_default(),
            citation_count: form.optional_parse("citationCount")?.unwrap_or_default(),
            is_interdisciplinary: form.flag("isInterdisciplinary"),
            interdisciplinary_type: form.optional_text("interdisciplinaryType"),
            indexed: form.parse("indexed")?,
            published_date: form.date("publishedDate")?,
            proof_file_path,
        })
    }

    fn patch_from_form(form: &SubmissionForm) -> Result<JournalPatch> {
        Ok(JournalPatch {
            paper_title: form.optional_text("paperTitle"),
            journal_name: form.optional_text("journalName"),
            issn: form.optional_text("issn"),
            author_level: form.optional_text("authorLevel"),
            is_corresponding_author: form.optional_flag("isCorrespondingAuthor"),
            affiliation_first_author: form.optional_parse("affiliation1stAuthor")?,
            affiliation_corresponding_author: form
                .optional_parse("affiliationCorrespondingAuthor")?,
            is_same_author: form.optional_flag("isSameAuthor"),
            corresponding_authors_count: form.optional_parse("correspondingAuthorsCount")?,
            authors_count: form.optional_parse("authorsCount")?,
            citation_count: form.optional_parse("citationCount")?,
            is_interdisciplinary: form.optional_flag("isInterdisciplinary"),
            interdisciplinary_type: form.optional_text("interdisciplinaryType"),
            indexed: form.optional_parse("indexed")?,
            published_date: form.optional_date("publishedDate")?,
            proof_file_path: form.file(PROOF_FILE),
        })
    }
}
