//! Tabular export of submitted records
//!
//! Provides:
//! - A delimited-text file per record kind, the source of truth for exports
//! - A one-generation backup of that file, refreshed on every write
//! - A spreadsheet per kind, regenerated from the delimited file on every write
//!
//! Every write is a read-modify-rewrite of the whole file. Writes for one
//! kind are serialized behind a per-kind lock; different kinds proceed
//! independently. Export failures never undo the record that triggered them:
//! [`ExportManager::append_entry`] only reports success as a boolean.

pub mod delimited;
pub mod schema;
pub mod spreadsheet;

pub use schema::{column_key, ColumnSpec, ExportValue};

use std::collections::{BTreeMap, HashMap};
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::ExportConfig;
use crate::metrics;
use crate::records::{Record, RecordKind};

/// How a write treats existing rows with the same Entry ID
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportMode {
    /// Every write adds a row; the latest row per Entry ID is current
    #[default]
    Append,
    /// A row with a matching Entry ID is replaced in place
    Upsert,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Spreadsheet write failed: {0}")]
    SpreadsheetWrite(#[from] rust_xlsxwriter::XlsxError),

    #[error("Spreadsheet read failed: {0}")]
    SpreadsheetRead(#[from] calamine::XlsxError),

    #[error("Export task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ExportError + '_ {
    move |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// `<path>.tmp`, the staging file for atomic rewrites
pub(crate) fn temp_path(path: &Path) -> PathBuf {
    with_suffix(path, ".tmp")
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Result of a successful write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendOutcome {
    /// Data rows in the delimited file after the write
    pub data_rows: usize,
    /// Rows written to the spreadsheet
    pub spreadsheet_rows: usize,
    /// Data rows that could not be parsed and were left out of the spreadsheet
    pub skipped_rows: usize,
    /// Whether an existing row was replaced (upsert mode only)
    pub replaced: bool,
}

/// Parsed contents of a kind's delimited file
#[derive(Debug, Clone, PartialEq)]
pub struct ExportTable {
    pub columns: Vec<ColumnSpec>,
    /// Data rows in file order, one value per column
    pub rows: Vec<Vec<String>>,
    /// Data rows that failed to parse
    pub skipped: usize,
}

impl ExportTable {
    fn parse(kind: RecordKind, content: &str) -> Self {
        let columns = schema::columns(kind);
        let mut rows = Vec::new();
        let mut skipped = 0;

        // The stored header is ignored; the schema is authoritative.
        for (index, line) in delimited::lines(content).enumerate().skip(1) {
            match delimited::parse_line(line) {
                Ok(values) if values.len() == columns.len() => rows.push(values),
                Ok(values) => {
                    warn!(
                        kind = %kind,
                        row = index,
                        fields = values.len(),
                        expected = columns.len(),
                        "Skipping export row with wrong field count"
                    );
                    skipped += 1;
                }
                Err(e) => {
                    warn!(kind = %kind, row = index, error = %e, "Skipping malformed export row");
                    skipped += 1;
                }
            }
        }

        Self {
            columns,
            rows,
            skipped,
        }
    }

    fn empty(kind: RecordKind) -> Self {
        Self {
            columns: schema::columns(kind),
            rows: Vec::new(),
            skipped: 0,
        }
    }

    /// Rows keyed by column key (header text without whitespace)
    pub fn records(&self) -> Vec<BTreeMap<String, String>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row)
                    .map(|(column, value)| (column.key.clone(), value.clone()))
                    .collect()
            })
            .collect()
    }

    /// Latest row per Entry ID, in order of each id's first appearance
    pub fn current_rows(&self) -> Vec<Vec<String>> {
        let mut order: Vec<&str> = Vec::new();
        let mut latest: HashMap<&str, &Vec<String>> = HashMap::new();

        for row in &self.rows {
            let id = row[0].as_str();
            if latest.insert(id, row).is_none() {
                order.push(id);
            }
        }

        order.into_iter().map(|id| latest[id].clone()).collect()
    }
}

struct ExportTarget {
    kind: RecordKind,
    csv_path: PathBuf,
    xlsx_path: PathBuf,
    backup_path: PathBuf,
    write_lock: Mutex<()>,
}

impl ExportTarget {
    fn new(export_dir: &Path, kind: RecordKind, backup_suffix: &str) -> Self {
        let csv_path = export_dir.join(format!("{}.csv", kind.slug()));
        Self {
            kind,
            backup_path: with_suffix(&csv_path, backup_suffix),
            xlsx_path: export_dir.join(format!("{}.xlsx", kind.slug())),
            csv_path,
            write_lock: Mutex::new(()),
        }
    }
}

/// Owns the export files of every record kind
pub struct ExportManager {
    export_dir: PathBuf,
    mode: ExportMode,
    targets: HashMap<RecordKind, ExportTarget>,
}

impl ExportManager {
    pub fn new(export_dir: impl Into<PathBuf>, config: &ExportConfig) -> Self {
        let export_dir = export_dir.into();
        let targets = RecordKind::ALL
            .into_iter()
            .map(|kind| (kind, ExportTarget::new(&export_dir, kind, &config.backup_suffix)))
            .collect();

        Self {
            export_dir,
            mode: config.mode,
            targets,
        }
    }

    fn target(&self, kind: RecordKind) -> &ExportTarget {
        &self.targets[&kind]
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    pub fn mode(&self) -> ExportMode {
        self.mode
    }

    pub fn csv_path(&self, kind: RecordKind) -> &Path {
        &self.target(kind).csv_path
    }

    pub fn backup_path(&self, kind: RecordKind) -> &Path {
        &self.target(kind).backup_path
    }

    /// Spreadsheet path for a kind, if the file exists
    pub async fn spreadsheet_path(&self, kind: RecordKind) -> Option<PathBuf> {
        let path = &self.target(kind).xlsx_path;
        match tokio::fs::try_exists(path).await {
            Ok(true) => Some(path.clone()),
            _ => None,
        }
    }

    /// Create the export directory and a header-only spreadsheet for every
    /// kind whose spreadsheet is missing. Delimited files are left alone.
    pub async fn initialize(&self) -> Result<(), ExportError> {
        tokio::fs::create_dir_all(&self.export_dir)
            .await
            .map_err(io_error(&self.export_dir))?;

        for kind in RecordKind::ALL {
            let target = self.target(kind);
            let _guard = target.write_lock.lock().await;

            if tokio::fs::try_exists(&target.xlsx_path)
                .await
                .map_err(io_error(&target.xlsx_path))?
            {
                continue;
            }

            let path = target.xlsx_path.clone();
            tokio::task::spawn_blocking(move || {
                spreadsheet::write_workbook(&path, kind.sheet_name(), &schema::columns(kind), &[])
            })
            .await??;

            info!(kind = %kind, path = %target.xlsx_path.display(), "Created export spreadsheet");
        }

        Ok(())
    }

    /// Mirror a created or updated record into the export files.
    ///
    /// Returns `false` if any step failed; the failure is logged and never
    /// propagated.
    pub async fn append_entry(&self, record: &Record) -> bool {
        let kind = record.kind();
        let start = Instant::now();

        match self.try_append_entry(record).await {
            Ok(outcome) => {
                metrics::record_export(kind, true, start.elapsed().as_secs_f64());
                metrics::set_export_rows(kind, outcome.data_rows);
                info!(
                    kind = %kind,
                    entry_id = record.id(),
                    data_rows = outcome.data_rows,
                    skipped_rows = outcome.skipped_rows,
                    replaced = outcome.replaced,
                    "Export updated"
                );
                true
            }
            Err(e) => {
                metrics::record_export(kind, false, start.elapsed().as_secs_f64());
                error!(kind = %kind, entry_id = record.id(), error = %e, "Export failed");
                false
            }
        }
    }

    /// Backup, rewrite and regenerate the export files for one record.
    ///
    /// The delimited file is the source of truth: if spreadsheet
    /// regeneration fails after the rewrite, the rewrite stands.
    pub async fn try_append_entry(&self, record: &Record) -> Result<AppendOutcome, ExportError> {
        let target = self.target(record.kind());
        let _guard = target.write_lock.lock().await;

        tokio::fs::create_dir_all(&self.export_dir)
            .await
            .map_err(io_error(&self.export_dir))?;

        let existing = read_optional(&target.csv_path).await?;
        if existing.is_some() {
            tokio::fs::copy(&target.csv_path, &target.backup_path)
                .await
                .map_err(io_error(&target.backup_path))?;
        }

        let new_line = delimited::format_record(schema::render_row(record, Utc::now()));
        let mut lines: Vec<String> = existing
            .as_deref()
            .map(|content| delimited::lines(content).skip(1).map(str::to_string).collect())
            .unwrap_or_default();

        let replaced = match self.mode {
            ExportMode::Append => {
                lines.push(new_line);
                false
            }
            ExportMode::Upsert => upsert_line(&mut lines, record.id(), new_line),
        };

        let mut content = schema::header_line(target.kind);
        content.push('\n');
        for line in &lines {
            content.push_str(line);
            content.push('\n');
        }
        write_atomic(&target.csv_path, &content).await?;
        debug!(kind = %target.kind, rows = lines.len(), "Rewrote delimited export");

        let table = ExportTable::parse(target.kind, &content);
        let spreadsheet_rows = table.rows.len();
        let skipped_rows = table.skipped;

        let path = target.xlsx_path.clone();
        let kind = target.kind;
        tokio::task::spawn_blocking(move || {
            spreadsheet::write_workbook(&path, kind.sheet_name(), &table.columns, &table.rows)
        })
        .await??;

        Ok(AppendOutcome {
            data_rows: lines.len(),
            spreadsheet_rows,
            skipped_rows,
            replaced,
        })
    }

    /// Parse a kind's delimited file. A missing file is an empty table.
    pub async fn read_table(&self, kind: RecordKind) -> Result<ExportTable, ExportError> {
        let target = self.target(kind);
        Ok(match read_optional(&target.csv_path).await? {
            Some(content) => ExportTable::parse(kind, &content),
            None => ExportTable::empty(kind),
        })
    }

    /// Current state per Entry ID, keyed by column key
    pub async fn current_rows(
        &self,
        kind: RecordKind,
    ) -> Result<Vec<BTreeMap<String, String>>, ExportError> {
        let table = self.read_table(kind).await?;
        let current = ExportTable {
            rows: table.current_rows(),
            ..table
        };
        Ok(current.records())
    }
}

/// Replace the first line whose Entry ID matches, dropping any later
/// duplicates, or append if none matches. Unparseable lines are kept as-is.
fn upsert_line(lines: &mut Vec<String>, id: u64, new_line: String) -> bool {
    let id = id.to_string();
    let matches = |line: &String| {
        delimited::parse_line(line)
            .ok()
            .and_then(|values| values.into_iter().next())
            .is_some_and(|first| first == id)
    };

    let Some(position) = lines.iter().position(matches) else {
        lines.push(new_line);
        return false;
    };

    lines[position] = new_line;
    let mut index = 0;
    lines.retain(|line| {
        let keep = index <= position || !matches(line);
        index += 1;
        keep
    });
    true
}

async fn read_optional(path: &Path) -> Result<Option<String>, ExportError> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io_error(path)(e)),
    }
}

async fn write_atomic(path: &Path, content: &str) -> Result<(), ExportError> {
    let tmp = temp_path(path);
    tokio::fs::write(&tmp, content)
        .await
        .map_err(io_error(&tmp))?;
    tokio::fs::rename(&tmp, path).await.map_err(io_error(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{
        BookFields, BookType, Entry, Owner, ProjectFields, ProjectRole, RecordMeta,
    };
    use chrono::NaiveDate;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio_test::assert_ok;

    fn meta(id: u64) -> RecordMeta {
        let now = Utc::now();
        RecordMeta {
            id,
            owner: Owner {
                user_id: 1,
                employee_id: "EMP001".into(),
                user_name: "Asha".into(),
                department: "CSE".into(),
            },
            approved: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn book(id: u64, title: &str) -> Record {
        Record::Book(Entry {
            meta: meta(id),
            fields: BookFields {
                title: title.into(),
                publisher: "ACME".into(),
                book_type: BookType::Book,
                publication_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
                total_authors: 2,
                srmist_authors: 1,
                isbn: "123-456".into(),
                proof_file_path: format!("/uploads/books/1_{id}.pdf"),
            },
        })
    }

    fn project(id: u64, title: &str) -> Record {
        Record::Project(Entry {
            meta: meta(id),
            fields: ProjectFields {
                title: title.into(),
                funding_agency: "DST".into(),
                role: ProjectRole::PrincipalInvestigator,
                principal_investigator: "Asha".into(),
                co_principal_investigator: None,
                number_of_co_pis: 0,
                grant_date: NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
                grant_amount: 500000.0,
                sanction_order_file_path: format!("/uploads/projects/1_{id}.pdf"),
                amount_received: None,
                dd_file_path: None,
                date_received: None,
            },
        })
    }

    fn manager(dir: &TempDir, mode: ExportMode) -> ExportManager {
        let config = ExportConfig {
            mode,
            ..ExportConfig::default()
        };
        ExportManager::new(dir.path().join("exports"), &config)
    }

    async fn data_lines(manager: &ExportManager, kind: RecordKind) -> Vec<String> {
        let content = tokio::fs::read_to_string(manager.csv_path(kind)).await.unwrap();
        delimited::lines(&content).skip(1).map(str::to_string).collect()
    }

    fn column(table: &ExportTable, row: usize, header: &str) -> String {
        let index = table.columns.iter().position(|c| c.header == header).unwrap();
        table.rows[row][index].clone()
    }

    #[tokio::test]
    async fn test_single_book_export() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir, ExportMode::Append);

        assert!(manager.append_entry(&book(1, "Intro to X")).await);

        let table = manager.read_table(RecordKind::Book).await.unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].len(), 15);
        assert_eq!(column(&table, 0, "Entry ID"), "1");
        assert_eq!(column(&table, 0, "Title"), "Intro to X");
        assert_eq!(column(&table, 0, "Type"), "Book");
        assert_eq!(column(&table, 0, "Publication Date"), "2024-01-15");
        assert_eq!(column(&table, 0, "Total Authors"), "2");
        assert_eq!(column(&table, 0, "SRMIST Authors"), "1");
        assert_eq!(column(&table, 0, "ISBN"), "123-456");
        assert_eq!(column(&table, 0, "Approved"), "No");

        let path = manager.spreadsheet_path(RecordKind::Book).await.unwrap();
        let sheet = spreadsheet::read_workbook(&path, "Books").unwrap();
        assert_eq!(sheet, table.records());
    }

    #[tokio::test]
    async fn test_sequential_projects_keep_call_order() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir, ExportMode::Append);

        assert!(manager.append_entry(&project(1, "Solar Grid")).await);
        assert!(manager.append_entry(&project(2, "Wind Farm")).await);

        let table = manager.read_table(RecordKind::Project).await.unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(column(&table, 0, "Title"), "Solar Grid");
        assert_eq!(column(&table, 1, "Title"), "Wind Farm");
        assert_eq!(column(&table, 1, "Co-Principal Investigator"), "");
    }

    #[tokio::test]
    async fn test_quoted_title_survives_both_formats() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir, ExportMode::Append);

        assert!(manager.append_entry(&book(1, "My, \"Great\" Book")).await);

        let lines = data_lines(&manager, RecordKind::Book).await;
        assert!(lines[0].contains(",\"My, \"\"Great\"\" Book\","));

        let table = manager.read_table(RecordKind::Book).await.unwrap();
        assert_eq!(column(&table, 0, "Title"), "My, \"Great\" Book");

        let path = manager.spreadsheet_path(RecordKind::Book).await.unwrap();
        let sheet = spreadsheet::read_workbook(&path, "Books").unwrap();
        assert_eq!(sheet[0]["Title"], "My, \"Great\" Book");
    }

    #[tokio::test]
    async fn test_concurrent_appends_lose_no_rows() {
        let dir = TempDir::new().unwrap();
        let manager = Arc::new(manager(&dir, ExportMode::Append));

        let (book_one, book_two) = (book(1, "First"), book(2, "Second"));
        let (first, second) = tokio::join!(
            manager.append_entry(&book_one),
            manager.append_entry(&book_two),
        );
        assert!(first && second);

        let tasks: Vec<_> = (3..=10)
            .map(|id| {
                let manager = Arc::clone(&manager);
                tokio::spawn(async move { manager.append_entry(&book(id, "Spawned")).await })
            })
            .collect();
        for task in tasks {
            assert!(task.await.unwrap());
        }

        let table = manager.read_table(RecordKind::Book).await.unwrap();
        let mut ids: Vec<u64> = table.rows.iter().map(|r| r[0].parse().unwrap()).collect();
        ids.sort_unstable();
        assert_eq!(ids, (1..=10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_overlong_value_does_not_block_later_appends() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir, ExportMode::Append);

        let long_title = "L".repeat(40_000);
        let outcome = assert_ok!(manager.try_append_entry(&book(1, &long_title)).await);
        assert_eq!(outcome.spreadsheet_rows, 1);

        assert!(manager.append_entry(&book(2, "Normal")).await);
        assert!(manager.append_entry(&book(3, "Another")).await);

        let path = manager.spreadsheet_path(RecordKind::Book).await.unwrap();
        let sheet = spreadsheet::read_workbook(&path, "Books").unwrap();
        assert_eq!(sheet.len(), 3);
        assert_eq!(sheet[0]["Title"].chars().count(), spreadsheet::MAX_CELL_CHARS);
        assert_eq!(sheet[2]["Title"], "Another");

        let table = manager.read_table(RecordKind::Book).await.unwrap();
        assert_eq!(column(&table, 0, "Title"), long_title);
    }

    #[tokio::test]
    async fn test_append_monotonicity_and_header_stability() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir, ExportMode::Append);
        manager.initialize().await.unwrap();

        let mut header = None;
        for id in 1..=5 {
            assert!(manager.append_entry(&book(id, &format!("Book {id}"))).await);

            let content = tokio::fs::read_to_string(manager.csv_path(RecordKind::Book))
                .await
                .unwrap();
            let first_line = content.lines().next().unwrap().to_string();
            assert_eq!(first_line, schema::header_line(RecordKind::Book));
            if let Some(previous) = header.replace(first_line.clone()) {
                assert_eq!(previous, first_line);
            }

            let lines = data_lines(&manager, RecordKind::Book).await;
            assert_eq!(lines.len(), id as usize);
            assert!(lines.last().unwrap().starts_with(&format!("{id},")));
        }

        manager.initialize().await.unwrap();
        let table = manager.read_table(RecordKind::Book).await.unwrap();
        assert_eq!(table.rows.len(), 5);
    }

    #[tokio::test]
    async fn test_backup_holds_previous_generation() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir, ExportMode::Append);

        assert!(manager.append_entry(&book(1, "A")).await);
        assert!(!manager.backup_path(RecordKind::Book).exists());
        let after_first = tokio::fs::read_to_string(manager.csv_path(RecordKind::Book))
            .await
            .unwrap();

        assert!(manager.append_entry(&book(2, "B")).await);
        let backup = tokio::fs::read_to_string(manager.backup_path(RecordKind::Book))
            .await
            .unwrap();
        assert_eq!(backup, after_first);
        assert!(manager
            .backup_path(RecordKind::Book)
            .to_string_lossy()
            .ends_with("books.csv.bak"));
    }

    #[tokio::test]
    async fn test_initialize_writes_header_only_spreadsheets() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir, ExportMode::Append);

        assert!(manager.spreadsheet_path(RecordKind::Journal).await.is_none());
        manager.initialize().await.unwrap();

        for kind in RecordKind::ALL {
            let path = manager.spreadsheet_path(kind).await.unwrap();
            assert!(spreadsheet::read_workbook(&path, kind.sheet_name())
                .unwrap()
                .is_empty());
            assert!(!manager.csv_path(kind).exists());
        }
    }

    #[tokio::test]
    async fn test_update_appends_and_latest_row_wins() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir, ExportMode::Append);

        assert!(manager.append_entry(&book(1, "Draft")).await);
        assert!(manager.append_entry(&book(2, "Other")).await);
        assert!(manager.append_entry(&book(1, "Final")).await);

        let table = manager.read_table(RecordKind::Book).await.unwrap();
        assert_eq!(table.rows.len(), 3);

        let current = manager.current_rows(RecordKind::Book).await.unwrap();
        assert_eq!(current.len(), 2);
        assert_eq!(current[0]["EntryID"], "1");
        assert_eq!(current[0]["Title"], "Final");
        assert_eq!(current[1]["Title"], "Other");
    }

    #[tokio::test]
    async fn test_upsert_replaces_in_place() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir, ExportMode::Upsert);

        assert_ok!(manager.try_append_entry(&book(1, "Draft")).await);
        assert_ok!(manager.try_append_entry(&book(2, "Other")).await);
        let outcome = assert_ok!(manager.try_append_entry(&book(1, "Final")).await);

        assert!(outcome.replaced);
        assert_eq!(outcome.data_rows, 2);

        let table = manager.read_table(RecordKind::Book).await.unwrap();
        assert_eq!(column(&table, 0, "Title"), "Final");
        assert_eq!(column(&table, 1, "Title"), "Other");
    }

    #[test]
    fn test_upsert_drops_later_duplicates() {
        let mut lines = vec![
            "1,a".to_string(),
            "2,b".to_string(),
            "\"broken".to_string(),
            "1,c".to_string(),
        ];
        assert!(upsert_line(&mut lines, 1, "1,new".into()));
        assert_eq!(lines, vec!["1,new", "2,b", "\"broken"]);

        assert!(!upsert_line(&mut lines, 9, "9,z".into()));
        assert_eq!(lines.last().unwrap(), "9,z");
    }

    #[tokio::test]
    async fn test_corrupt_rows_are_skipped_not_fatal() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir, ExportMode::Append);
        assert!(manager.append_entry(&book(1, "Good")).await);

        let path = manager.csv_path(RecordKind::Book).to_path_buf();
        let mut content = tokio::fs::read_to_string(&path).await.unwrap();
        content.push_str("2,\"unterminated,field\n");
        content.push_str("3,too,few\n");
        tokio::fs::write(&path, content).await.unwrap();

        let outcome = manager.try_append_entry(&book(4, "Also good")).await.unwrap();
        assert_eq!(outcome.data_rows, 4);
        assert_eq!(outcome.spreadsheet_rows, 2);
        assert_eq!(outcome.skipped_rows, 2);

        let xlsx = manager.spreadsheet_path(RecordKind::Book).await.unwrap();
        let sheet = spreadsheet::read_workbook(&xlsx, "Books").unwrap();
        let titles: Vec<_> = sheet.iter().map(|r| r["Title"].as_str()).collect();
        assert_eq!(titles, vec!["Good", "Also good"]);
    }

    #[tokio::test]
    async fn test_unwritable_export_dir_reports_failure() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();
        let manager = ExportManager::new(blocker.join("exports"), &ExportConfig::default());

        assert!(!manager.append_entry(&book(1, "Lost")).await);
        assert!(matches!(
            manager.try_append_entry(&book(1, "Lost")).await,
            Err(ExportError::Io { .. })
        ));
    }

    #[test]
    fn test_current_rows_keeps_first_appearance_order() {
        let table = ExportTable {
            columns: schema::columns(RecordKind::Book),
            rows: vec![
                vec!["2".into(), "old".into()],
                vec!["1".into(), "only".into()],
                vec!["2".into(), "new".into()],
            ],
            skipped: 0,
        };
        let current = table.current_rows();
        assert_eq!(current, vec![vec!["2", "new"], vec!["1", "only"]]);
    }

    #[test]
    fn test_export_mode_parsing() {
        let mode: ExportMode = serde_json::from_str("\"upsert\"").unwrap();
        assert_eq!(mode, ExportMode::Upsert);
        assert_eq!(ExportMode::default(), ExportMode::Append);
    }
}
