//! Journal paper publications

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use super::{
    bounded_text, parse_choice, Entry, InvalidChoice, Record, RecordFields, RecordKind,
};

pub type Journal = Entry<JournalFields>;

/// Institutional affiliation of an author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Affiliation {
    #[serde(rename = "SRM")]
    Srm,
    Other,
}

impl Affiliation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Affiliation::Srm => "SRM",
            Affiliation::Other => "Other",
        }
    }
}

impl fmt::Display for Affiliation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Affiliation {
    type Err = InvalidChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_choice(
            s,
            &[("SRM", Affiliation::Srm), ("Other", Affiliation::Other)],
            &["SRM", "Other"],
        )
    }
}

/// Citation index the journal is listed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexedIn {
    #[serde(rename = "IF")]
    ImpactFactor,
    #[serde(rename = "SNIP")]
    Snip,
    Both,
}

impl IndexedIn {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexedIn::ImpactFactor => "IF",
            IndexedIn::Snip => "SNIP",
            IndexedIn::Both => "Both",
        }
    }
}

impl fmt::Display for IndexedIn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndexedIn {
    type Err = InvalidChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_choice(
            s,
            &[
                ("IF", IndexedIn::ImpactFactor),
                ("SNIP", IndexedIn::Snip),
                ("Both", IndexedIn::Both),
            ],
            &["IF", "SNIP", "Both"],
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct JournalFields {
    #[validate(
        length(min = 1, message = "Please provide the paper title"),
        custom(function = "bounded_text")
    )]
    pub paper_title: String,

    #[validate(
        length(min = 1, message = "Please provide the journal name"),
        custom(function = "bounded_text")
    )]
    pub journal_name: String,

    #[validate(
        length(min = 1, message = "Please provide the ISSN number"),
        custom(function = "bounded_text")
    )]
    pub issn: String,

    #[validate(
        length(min = 1, message = "Please specify your author level"),
        custom(function = "bounded_text")
    )]
    pub author_level: String,

    pub is_corresponding_author: bool,

    #[serde(rename = "affiliation1stAuthor")]
    pub affiliation_first_author: Affiliation,

    pub affiliation_corresponding_author: Affiliation,

    pub is_same_author: bool,

    #[serde(default)]
    pub corresponding_authors_count: u32,

    #[serde(default)]
    pub authors_count: u32,

    #[serde(default)]
    pub citation_count: u32,

    #[serde(default)]
    pub is_interdisciplinary: bool,

    #[validate(custom(function = "bounded_text"))]
    pub interdisciplinary_type: Option<String>,

    pub indexed: IndexedIn,

    pub published_date: NaiveDate,

    #[validate(length(min = 1, message = "Please upload proof of publication"))]
    pub proof_file_path: String,
}

#[derive(Debug, Clone, Default)]
pub struct JournalPatch {
    pub paper_title: Option<String>,
    pub journal_name: Option<String>,
    pub issn: Option<String>,
    pub author_level: Option<String>,
    pub is_corresponding_author: Option<bool>,
    pub affiliation_first_author: Option<Affiliation>,
    pub affiliation_corresponding_author: Option<Affiliation>,
    pub is_same_author: Option<bool>,
    pub corresponding_authors_count: Option<u32>,
    pub authors_count: Option<u32>,
    pub citation_count: Option<u32>,
    pub is_interdisciplinary: Option<bool>,
    pub interdisciplinary_type: Option<String>,
    pub indexed: Option<IndexedIn>,
    pub published_date: Option<NaiveDate>,
    pub proof_file_path: Option<String>,
}

impl RecordFields for JournalFields {
    type Patch = JournalPatch;

    const KIND: RecordKind = RecordKind::Journal;

    fn apply(&mut self, patch: JournalPatch) {
        if let Some(title) = patch.paper_title {
            self.paper_title = title;
        }
        if let Some(name) = patch.journal_name {
            self.journal_name = name;
        }
        if let Some(issn) = patch.issn {
            self.issn = issn;
        }
        if let Some(level) = patch.author_level {
            self.author_level = level;
        }
        if let Some(flag) = patch.is_corresponding_author {
            self.is_corresponding_author = flag;
        }
        if let Some(affiliation) = patch.affiliation_first_author {
            self.affiliation_first_author = affiliation;
        }
        if let Some(affiliation) = patch.affiliation_corresponding_author {
            self.affiliation_corresponding_author = affiliation;
        }
        if let Some(flag) = patch.is_same_author {
            self.is_same_author = flag;
        }
        if let Some(count) = patch.corresponding_authors_count {
            self.corresponding_authors_count = count;
        }
        if let Some(count) = patch.authors_count {
            self.authors_count = count;
        }
        if let Some(count) = patch.citation_count {
            self.citation_count = count;
        }
        if let Some(flag) = patch.is_interdisciplinary {
            self.is_interdisciplinary = flag;
        }
        if patch.interdisciplinary_type.is_some() {
            self.interdisciplinary_type = patch.interdisciplinary_type;
        }
        if let Some(indexed) = patch.indexed {
            self.indexed = indexed;
        }
        if let Some(date) = patch.published_date {
            self.published_date = date;
        }
        if let Some(path) = patch.proof_file_path {
            self.proof_file_path = path;
        }
    }

    fn file_paths(&self) -> Vec<&str> {
        vec![self.proof_file_path.as_str()]
    }

    fn into_record(entry: Entry<Self>) -> Record {
        Record::Journal(entry)
    }
}
