//! Record model for incentive claims
//!
//! Every submission is an [`Entry`]: shared [`RecordMeta`] (identity,
//! ownership, review state, timestamps) plus the kind-specific fields.
//! [`Record`] is the tagged union handed to the export layer.

mod book;
mod journal;
mod project;

pub use book::{Book, BookFields, BookPatch, BookType};
pub use journal::{Affiliation, IndexedIn, Journal, JournalFields, JournalPatch};
pub use project::{Project, ProjectFields, ProjectPatch, ProjectRole};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::{Validate, ValidationError};

/// Category of incentive-claim submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Book,
    Project,
    Journal,
}

impl RecordKind {
    pub const ALL: [RecordKind; 3] = [RecordKind::Book, RecordKind::Project, RecordKind::Journal];

    /// Plural slug used in URLs, upload folders and export file names
    pub fn slug(&self) -> &'static str {
        match self {
            RecordKind::Book => "books",
            RecordKind::Project => "projects",
            RecordKind::Journal => "journals",
        }
    }

    /// Worksheet name inside the generated spreadsheet
    pub fn sheet_name(&self) -> &'static str {
        match self {
            RecordKind::Book => "Books",
            RecordKind::Project => "Projects",
            RecordKind::Journal => "Journals",
        }
    }

    /// Human readable singular label
    pub fn label(&self) -> &'static str {
        match self {
            RecordKind::Book => "Book",
            RecordKind::Project => "Project",
            RecordKind::Journal => "Journal",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.slug() == slug)
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Owner metadata captured from the authenticated caller at creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    pub user_id: u64,
    pub employee_id: String,
    pub user_name: String,
    pub department: String,
}

/// Fields every record kind carries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMeta {
    pub id: u64,
    #[serde(flatten)]
    pub owner: Owner,
    /// Set only by the review workflow
    pub approved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored record: metadata plus kind-specific fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry<F> {
    #[serde(flatten)]
    pub meta: RecordMeta,
    #[serde(flatten)]
    pub fields: F,
}

impl<F> Entry<F> {
    pub fn id(&self) -> u64 {
        self.meta.id
    }

    pub fn owner(&self) -> &Owner {
        &self.meta.owner
    }

    pub fn is_owned_by(&self, user_id: u64) -> bool {
        self.meta.owner.user_id == user_id
    }
}

/// Behaviour shared by the kind-specific field sets
pub trait RecordFields: Clone + Validate + Serialize + Send + Sync + 'static {
    /// Field-merge update; every field optional
    type Patch: Default + Send;

    const KIND: RecordKind;

    /// Merge the patch into these fields
    fn apply(&mut self, patch: Self::Patch);

    /// Paths of uploaded files referenced by this record
    fn file_paths(&self) -> Vec<&str>;

    fn into_record(entry: Entry<Self>) -> Record;
}

/// Tagged union of every record kind
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Record {
    Book(Book),
    Project(Project),
    Journal(Journal),
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Book(_) => RecordKind::Book,
            Record::Project(_) => RecordKind::Project,
            Record::Journal(_) => RecordKind::Journal,
        }
    }

    pub fn meta(&self) -> &RecordMeta {
        match self {
            Record::Book(entry) => &entry.meta,
            Record::Project(entry) => &entry.meta,
            Record::Journal(entry) => &entry.meta,
        }
    }

    pub fn id(&self) -> u64 {
        self.meta().id
    }
}

impl<F: RecordFields> From<Entry<F>> for Record {
    fn from(entry: Entry<F>) -> Self {
        F::into_record(entry)
    }
}

/// Longest free-text value a record accepts, in characters
pub const MAX_TEXT_CHARS: usize = 2000;

/// Length cap for free-text fields. Usable from any `Validate` derive.
pub fn bounded_text(value: &str) -> Result<(), ValidationError> {
    if value.chars().count() > MAX_TEXT_CHARS {
        let mut error = ValidationError::new("too_long");
        error.message = Some(format!("Must be at most {MAX_TEXT_CHARS} characters").into());
        return Err(error);
    }
    Ok(())
}

/// Error returned when a string is not one of an enum's accepted values
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{value}' is not one of: {}", .expected.join(", "))]
pub struct InvalidChoice {
    pub value: String,
    pub expected: &'static [&'static str],
}

pub(crate) fn parse_choice<T: Copy>(
    value: &str,
    choices: &[(&'static str, T)],
    expected: &'static [&'static str],
) -> Result<T, InvalidChoice> {
    let trimmed = value.trim();
    choices
        .iter()
        .find(|(name, _)| *name == trimmed)
        .map(|(_, choice)| *choice)
        .ok_or_else(|| InvalidChoice {
            value: trimmed.to_string(),
            expected,
        })
}

impl FromStr for RecordKind {
    type Err = InvalidChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_choice(
            s,
            &[
                ("books", RecordKind::Book),
                ("projects", RecordKind::Project),
                ("journals", RecordKind::Journal),
            ],
            &["books", "projects", "journals"],
        )
    }
}
