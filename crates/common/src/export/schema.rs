//! Export column schemas
//!
//! One ordered column table per record kind. Column order and header text
//! are part of the export contract: downstream spreadsheet consumers depend
//! on both. The second column of every kind is the export timestamp, not the
//! record's own creation time.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

use crate::records::{Book, Entry, Journal, Project, Record, RecordKind};

use super::delimited;

/// A single cell value before rendering
#[derive(Debug, Clone, PartialEq)]
pub enum ExportValue {
    Text(String),
    Integer(u64),
    Number(f64),
    Flag(bool),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
    Empty,
}

impl ExportValue {
    pub fn render(&self) -> String {
        match self {
            ExportValue::Text(text) => text.clone(),
            ExportValue::Integer(n) => n.to_string(),
            ExportValue::Number(n) => n.to_string(),
            ExportValue::Flag(true) => "Yes".to_string(),
            ExportValue::Flag(false) => "No".to_string(),
            ExportValue::Date(date) => date.to_string(),
            ExportValue::Timestamp(ts) => ts.to_rfc3339_opts(SecondsFormat::Millis, true),
            ExportValue::Empty => String::new(),
        }
    }
}

impl From<&str> for ExportValue {
    fn from(text: &str) -> Self {
        ExportValue::Text(text.to_string())
    }
}

impl<T: Into<ExportValue>> From<Option<T>> for ExportValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ExportValue::Empty, Into::into)
    }
}

impl From<String> for ExportValue {
    fn from(text: String) -> Self {
        ExportValue::Text(text)
    }
}

impl From<f64> for ExportValue {
    fn from(n: f64) -> Self {
        ExportValue::Number(n)
    }
}

impl From<NaiveDate> for ExportValue {
    fn from(date: NaiveDate) -> Self {
        ExportValue::Date(date)
    }
}

/// Where a column's value comes from
pub enum Source<T> {
    /// Time the row was generated
    SubmissionDate,
    Field(fn(&T) -> ExportValue),
}

pub struct Column<T> {
    pub header: &'static str,
    pub width: f64,
    pub source: Source<T>,
}

/// Kind-independent description of a column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub header: &'static str,
    pub key: String,
    pub width: f64,
}

/// Header text with all whitespace removed, used to key row values
pub fn column_key(header: &str) -> String {
    header.chars().filter(|c| !c.is_whitespace()).collect()
}

fn entry_id<F>(entry: &Entry<F>) -> ExportValue {
    ExportValue::Integer(entry.meta.id)
}

fn user_id<F>(entry: &Entry<F>) -> ExportValue {
    ExportValue::Integer(entry.meta.owner.user_id)
}

fn employee_id<F>(entry: &Entry<F>) -> ExportValue {
    entry.meta.owner.employee_id.as_str().into()
}

fn user_name<F>(entry: &Entry<F>) -> ExportValue {
    entry.meta.owner.user_name.as_str().into()
}

fn department<F>(entry: &Entry<F>) -> ExportValue {
    entry.meta.owner.department.as_str().into()
}

fn approved<F>(entry: &Entry<F>) -> ExportValue {
    ExportValue::Flag(entry.meta.approved)
}

#[rustfmt::skip]
pub static BOOK_COLUMNS: &[Column<Book>] = &[
    Column { header: "Entry ID", width: 10.0, source: Source::Field(entry_id) },
    Column { header: "Submission Date", width: 20.0, source: Source::SubmissionDate },
    Column { header: "User ID", width: 15.0, source: Source::Field(user_id) },
    Column { header: "Employee ID", width: 15.0, source: Source::Field(employee_id) },
    Column { header: "User Name", width: 20.0, source: Source::Field(user_name) },
    Column { header: "Department", width: 15.0, source: Source::Field(department) },
    Column { header: "Title", width: 30.0, source: Source::Field(|b| b.fields.title.as_str().into()) },
    Column { header: "Publisher", width: 30.0, source: Source::Field(|b| b.fields.publisher.as_str().into()) },
    Column { header: "Type", width: 15.0, source: Source::Field(|b| b.fields.book_type.as_str().into()) },
    Column { header: "Publication Date", width: 15.0, source: Source::Field(|b| b.fields.publication_date.into()) },
    Column { header: "Total Authors", width: 15.0, source: Source::Field(|b| ExportValue::Integer(b.fields.total_authors.into())) },
    Column { header: "SRMIST Authors", width: 15.0, source: Source::Field(|b| ExportValue::Integer(b.fields.srmist_authors.into())) },
    Column { header: "ISBN", width: 15.0, source: Source::Field(|b| b.fields.isbn.as_str().into()) },
    Column { header: "Proof File", width: 30.0, source: Source::Field(|b| b.fields.proof_file_path.as_str().into()) },
    Column { header: "Approved", width: 10.0, source: Source::Field(approved) },
];

#[rustfmt::skip]
pub static PROJECT_COLUMNS: &[Column<Project>] = &[
    Column { header: "Entry ID", width: 10.0, source: Source::Field(entry_id) },
    Column { header: "Submission Date", width: 20.0, source: Source::SubmissionDate },
    Column { header: "User ID", width: 15.0, source: Source::Field(user_id) },
    Column { header: "Employee ID", width: 15.0, source: Source::Field(employee_id) },
    Column { header: "User Name", width: 20.0, source: Source::Field(user_name) },
    Column { header: "Department", width: 15.0, source: Source::Field(department) },
    Column { header: "Title", width: 30.0, source: Source::Field(|p| p.fields.title.as_str().into()) },
    Column { header: "Funding Agency", width: 30.0, source: Source::Field(|p| p.fields.funding_agency.as_str().into()) },
    Column { header: "Role", width: 10.0, source: Source::Field(|p| p.fields.role.as_str().into()) },
    Column { header: "Principal Investigator", width: 25.0, source: Source::Field(|p| p.fields.principal_investigator.as_str().into()) },
    Column { header: "Co-Principal Investigator", width: 25.0, source: Source::Field(|p| p.fields.co_principal_investigator.as_deref().into()) },
    Column { header: "Number of Co-PIs", width: 15.0, source: Source::Field(|p| ExportValue::Integer(p.fields.number_of_co_pis.into())) },
    Column { header: "Grant Date", width: 15.0, source: Source::Field(|p| p.fields.grant_date.into()) },
    Column { header: "Grant Amount", width: 15.0, source: Source::Field(|p| p.fields.grant_amount.into()) },
    Column { header: "Sanction Order File", width: 30.0, source: Source::Field(|p| p.fields.sanction_order_file_path.as_str().into()) },
    Column { header: "Amount Received", width: 15.0, source: Source::Field(|p| p.fields.amount_received.into()) },
    Column { header: "DD File", width: 30.0, source: Source::Field(|p| p.fields.dd_file_path.as_deref().into()) },
    Column { header: "Date Received", width: 15.0, source: Source::Field(|p| p.fields.date_received.into()) },
    Column { header: "Approved", width: 10.0, source: Source::Field(approved) },
];

#[rustfmt::skip]
pub static JOURNAL_COLUMNS: &[Column<Journal>] = &[
    Column { header: "Entry ID", width: 10.0, source: Source::Field(entry_id) },
    Column { header: "Submission Date", width: 20.0, source: Source::SubmissionDate },
    Column { header: "User ID", width: 15.0, source: Source::Field(user_id) },
    Column { header: "Employee ID", width: 15.0, source: Source::Field(employee_id) },
    Column { header: "User Name", width: 20.0, source: Source::Field(user_name) },
    Column { header: "Department", width: 15.0, source: Source::Field(department) },
    Column { header: "Paper Title", width: 30.0, source: Source::Field(|j| j.fields.paper_title.as_str().into()) },
    Column { header: "Journal Name", width: 30.0, source: Source::Field(|j| j.fields.journal_name.as_str().into()) },
    Column { header: "ISSN", width: 15.0, source: Source::Field(|j| j.fields.issn.as_str().into()) },
    Column { header: "Author Level", width: 15.0, source: Source::Field(|j| j.fields.author_level.as_str().into()) },
    Column { header: "Is Corresponding Author", width: 20.0, source: Source::Field(|j| ExportValue::Flag(j.fields.is_corresponding_author)) },
    Column { header: "1st Author Affiliation", width: 20.0, source: Source::Field(|j| j.fields.affiliation_first_author.as_str().into()) },
    Column { header: "Corresponding Author Affiliation", width: 25.0, source: Source::Field(|j| j.fields.affiliation_corresponding_author.as_str().into()) },
    Column { header: "Is Same Author", width: 15.0, source: Source::Field(|j| ExportValue::Flag(j.fields.is_same_author)) },
    Column { header: "Corresponding Authors Count", width: 25.0, source: Source::Field(|j| ExportValue::Integer(j.fields.corresponding_authors_count.into())) },
    Column { header: "Authors Count", width: 15.0, source: Source::Field(|j| ExportValue::Integer(j.fields.authors_count.into())) },
    Column { header: "Citation Count", width: 15.0, source: Source::Field(|j| ExportValue::Integer(j.fields.citation_count.into())) },
    Column { header: "Is Interdisciplinary", width: 20.0, source: Source::Field(|j| ExportValue::Flag(j.fields.is_interdisciplinary)) },
    Column { header: "Interdisciplinary Type", width: 25.0, source: Source::Field(|j| j.fields.interdisciplinary_type.as_deref().into()) },
    Column { header: "Indexed", width: 10.0, source: Source::Field(|j| j.fields.indexed.as_str().into()) },
    Column { header: "Published Date", width: 15.0, source: Source::Field(|j| j.fields.published_date.into()) },
    Column { header: "Proof File", width: 30.0, source: Source::Field(|j| j.fields.proof_file_path.as_str().into()) },
    Column { header: "Approved", width: 10.0, source: Source::Field(approved) },
];

fn specs<T>(columns: &[Column<T>]) -> Vec<ColumnSpec> {
    columns
        .iter()
        .map(|c| ColumnSpec {
            header: c.header,
            key: column_key(c.header),
            width: c.width,
        })
        .collect()
}

fn values<T>(columns: &[Column<T>], entry: &T, submitted_at: DateTime<Utc>) -> Vec<ExportValue> {
    columns
        .iter()
        .map(|c| match &c.source {
            Source::SubmissionDate => ExportValue::Timestamp(submitted_at),
            Source::Field(extract) => extract(entry),
        })
        .collect()
}

/// Ordered column descriptions for a kind
pub fn columns(kind: RecordKind) -> Vec<ColumnSpec> {
    match kind {
        RecordKind::Book => specs(BOOK_COLUMNS),
        RecordKind::Project => specs(PROJECT_COLUMNS),
        RecordKind::Journal => specs(JOURNAL_COLUMNS),
    }
}

pub fn headers(kind: RecordKind) -> Vec<&'static str> {
    columns(kind).into_iter().map(|c| c.header).collect()
}

/// The header line of a kind's delimited file
pub fn header_line(kind: RecordKind) -> String {
    delimited::format_record(headers(kind))
}

/// Cell values of one export row, in column order
pub fn row_values(record: &Record, submitted_at: DateTime<Utc>) -> Vec<ExportValue> {
    match record {
        Record::Book(book) => values(BOOK_COLUMNS, book, submitted_at),
        Record::Project(project) => values(PROJECT_COLUMNS, project, submitted_at),
        Record::Journal(journal) => values(JOURNAL_COLUMNS, journal, submitted_at),
    }
}

/// Rendered cell values of one export row, in column order
pub fn render_row(record: &Record, submitted_at: DateTime<Utc>) -> Vec<String> {
    row_values(record, submitted_at)
        .iter()
        .map(ExportValue::render)
        .collect()
}
