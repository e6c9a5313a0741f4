//! Book and book-chapter publications

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use super::{
    bounded_text, parse_choice, Entry, InvalidChoice, Record, RecordFields, RecordKind,
};

pub type Book = Entry<BookFields>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookType {
    Book,
    #[serde(rename = "Book Chapter", alias = "BookChapter")]
    BookChapter,
}

impl BookType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookType::Book => "Book",
            BookType::BookChapter => "Book Chapter",
        }
    }
}

impl fmt::Display for BookType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookType {
    type Err = InvalidChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_choice(
            s,
            &[
                ("Book", BookType::Book),
                ("Book Chapter", BookType::BookChapter),
                ("BookChapter", BookType::BookChapter),
            ],
            &["Book", "Book Chapter"],
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BookFields {
    #[validate(
        length(min = 1, message = "Please provide the title of the book"),
        custom(function = "bounded_text")
    )]
    pub title: String,

    #[validate(
        length(min = 1, message = "Please provide the publisher"),
        custom(function = "bounded_text")
    )]
    pub publisher: String,

    #[serde(rename = "type")]
    pub book_type: BookType,

    pub publication_date: NaiveDate,

    #[validate(range(min = 1, message = "Total authors must be at least 1"))]
    pub total_authors: u32,

    #[serde(default)]
    pub srmist_authors: u32,

    #[validate(
        length(min = 1, message = "Please provide the ISBN number"),
        custom(function = "bounded_text")
    )]
    pub isbn: String,

    #[validate(length(min = 1, message = "Please upload proof of publication"))]
    pub proof_file_path: String,
}

#[derive(Debug, Clone, Default)]
pub struct BookPatch {
    pub title: Option<String>,
    pub publisher: Option<String>,
    pub book_type: Option<BookType>,
    pub publication_date: Option<NaiveDate>,
    pub total_authors: Option<u32>,
    pub srmist_authors: Option<u32>,
    pub isbn: Option<String>,
    pub proof_file_path: Option<String>,
}

impl RecordFields for BookFields {
    type Patch = BookPatch;

    const KIND: RecordKind = RecordKind::Book;

    fn apply(&mut self, patch: BookPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(publisher) = patch.publisher {
            self.publisher = publisher;
        }
        if let Some(book_type) = patch.book_type {
            self.book_type = book_type;
        }
        if let Some(date) = patch.publication_date {
            self.publication_date = date;
        }
        if let Some(total) = patch.total_authors {
            self.total_authors = total;
        }
        if let Some(srmist) = patch.srmist_authors {
            self.srmist_authors = srmist;
        }
        if let Some(isbn) = patch.isbn {
            self.isbn = isbn;
        }
        if let Some(path) = patch.proof_file_path {
            self.proof_file_path = path;
        }
    }

    fn file_paths(&self) -> Vec<&str> {
        vec![self.proof_file_path.as_str()]
    }

    fn into_record(entry: Entry<Self>) -> Record {
        Record::Book(entry)
    }
}
