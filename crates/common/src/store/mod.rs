//! In-memory record store
//!
//! Provides:
//! - One [`Collection`] per record kind with sequential ids
//! - Owner-filtered listings, newest first
//! - Field-merge updates validated on the merged value
//! - The registered-user directory ([`UserStore`])

mod users;

pub use users::{NewUser, Role, User, UserStore};

use crate::errors::Result;
use crate::records::{
    BookFields, Entry, JournalFields, Owner, ProjectFields, RecordFields, RecordMeta,
};
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;
use validator::Validate;

/// Listing filter
#[derive(Debug, Clone, Copy, Default)]
pub struct ListFilter {
    /// Only records owned by this user
    pub owner_id: Option<u64>,
}

impl ListFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn owned_by(user_id: u64) -> Self {
        Self {
            owner_id: Some(user_id),
        }
    }
}

struct CollectionState<F> {
    next_id: u64,
    entries: Vec<Entry<F>>,
}

/// Records of a single kind
pub struct Collection<F> {
    state: RwLock<CollectionState<F>>,
}

impl<F: RecordFields> Default for Collection<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: RecordFields> Collection<F> {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(CollectionState {
                next_id: 1,
                entries: Vec::new(),
            }),
        }
    }

    /// Validate and store a new record, assigning the next id
    pub async fn create(&self, owner: Owner, fields: F) -> Result<Entry<F>> {
        fields.validate()?;

        let mut state = self.state.write().await;
        let now = Utc::now();
        let entry = Entry {
            meta: RecordMeta {
                id: state.next_id,
                owner,
                approved: false,
                created_at: now,
                updated_at: now,
            },
            fields,
        };
        state.next_id += 1;
        state.entries.push(entry.clone());

        debug!(kind = %F::KIND, id = entry.id(), "Record created");
        Ok(entry)
    }

    pub async fn find_by_id(&self, id: u64) -> Option<Entry<F>> {
        let state = self.state.read().await;
        state.entries.iter().find(|e| e.id() == id).cloned()
    }

    /// List records matching the filter, newest first
    pub async fn find(&self, filter: ListFilter) -> Vec<Entry<F>> {
        let state = self.state.read().await;
        let mut results: Vec<Entry<F>> = state
            .entries
            .iter()
            .filter(|e| filter.owner_id.map_or(true, |owner| e.is_owned_by(owner)))
            .cloned()
            .collect();

        results.sort_by(|a, b| {
            b.meta
                .created_at
                .cmp(&a.meta.created_at)
                .then_with(|| b.id().cmp(&a.id()))
        });
        results
    }

    /// Merge a patch into an existing record.
    ///
    /// Returns `Ok(None)` if the id is unknown. The stored record is left
    /// untouched when the merged value fails validation.
    pub async fn update(&self, id: u64, patch: F::Patch) -> Result<Option<Entry<F>>> {
        let mut state = self.state.write().await;
        let Some(slot) = state.entries.iter_mut().find(|e| e.id() == id) else {
            return Ok(None);
        };

        let mut fields = slot.fields.clone();
        fields.apply(patch);
        fields.validate()?;

        slot.fields = fields;
        slot.meta.updated_at = Utc::now();

        debug!(kind = %F::KIND, id, "Record updated");
        Ok(Some(slot.clone()))
    }

    /// Remove a record, returning it if it existed
    pub async fn delete(&self, id: u64) -> Option<Entry<F>> {
        let mut state = self.state.write().await;
        let index = state.entries.iter().position(|e| e.id() == id)?;
        let removed = state.entries.remove(index);

        debug!(kind = %F::KIND, id, "Record deleted");
        Some(removed)
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// The three record collections owned by the process
#[derive(Default)]
pub struct RecordStore {
    pub books: Collection<BookFields>,
    pub projects: Collection<ProjectFields>,
    pub journals: Collection<JournalFields>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}
