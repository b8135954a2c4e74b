//! Bulk CSV import.
//!
//! ```text
//! ┌──────────┐   ┌─────────┐   ┌──────────┐   ┌───────────┐   ┌────────┐   ┌──────────────┐
//! │ CSV file │──▶│  Lexer  │──▶│ Resolver │──▶│ Validator │──▶│ Review │──▶│ Mapper+Store │
//! │ (bytes)  │   │per line │   │by header │   │  per row  │   │ (user) │   │  one batch   │
//! └──────────┘   └─────────┘   └──────────┘   └───────────┘   └────────┘   └──────────────┘
//! ```
//!
//! Parsing and submission are separate steps: [`BulkImporter::load`] builds
//! the preview, [`BulkImporter::submit`] sends the valid rows. A failed
//! submission keeps the preview so it can be retried; a successful one
//! clears it.

use std::path::Path;

use serde::Serialize;

use crate::config::{Settings, MAX_FILE_SIZE};
use crate::error::{FileError, ImportError, ImportResult, StoreError};
use crate::logs::{log_error, log_info, log_info_indent, log_success, log_warning};
use crate::mapper::{to_records, FlagPolicy};
use crate::models::{Field, MemberRecord, RawMember};
use crate::parser::{content_lines, decode_content, split_line, ColumnResolver};
use crate::store::MemberStore;
use crate::validation::{validate_row, ValidationRules};

// =============================================================================
// Parsed rows
// =============================================================================

/// One data line after lexing, column resolution and validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedRow {
    row_index: usize,
    #[serde(flatten)]
    fields: RawMember,
    errors: Vec<String>,
    is_valid: bool,
}

impl ParsedRow {
    pub fn new(row_index: usize, fields: RawMember, errors: Vec<String>) -> Self {
        let is_valid = errors.is_empty();
        Self { row_index, fields, errors, is_valid }
    }

    /// 1-based line number in the source file (the header is line 1).
    pub fn row_index(&self) -> usize {
        self.row_index
    }

    pub fn fields(&self) -> &RawMember {
        &self.fields
    }

    /// Validation messages, in rule order.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }
}

/// Resolve one lexed line into raw member fields.
fn resolve_row(resolver: &ColumnResolver, cells: &[String]) -> RawMember {
    let mut raw = RawMember::default();
    for field in Field::all() {
        raw.set(field, resolver.cell(cells, field.column()));
    }
    raw
}

/// Parse CSV text into rows.
///
/// Blank lines are ignored. The first remaining line is the header; with no
/// data line after it the result is empty, never an error.
pub fn parse_members_csv(content: &str, rules: &ValidationRules) -> Vec<ParsedRow> {
    let mut lines = content_lines(content);

    let Some((_, header_line)) = lines.next() else {
        return Vec::new();
    };
    let resolver = ColumnResolver::from_headers(&split_line(header_line));

    lines
        .map(|(line_number, line)| {
            let fields = resolve_row(&resolver, &split_line(line));
            let errors = validate_row(&fields, rules).err().unwrap_or_default();
            ParsedRow::new(line_number, fields, errors)
        })
        .collect()
}

/// Required columns absent from the header of `content`.
pub fn missing_required_columns(content: &str) -> Vec<&'static str> {
    match content_lines(content).next() {
        Some((_, header_line)) => ColumnResolver::from_headers(&split_line(header_line))
            .missing(Field::REQUIRED.into_iter().map(Field::column)),
        None => Vec::new(),
    }
}

/// Case-sensitive `.csv` extension check.
pub fn is_csv_file_name(file_name: &str) -> bool {
    file_name.ends_with(".csv")
}

/// "Successfully imported 3 members."
pub fn success_message(count: u64) -> String {
    let noun = if count == 1 { "member" } else { "members" };
    format!("Successfully imported {count} {noun}.")
}

// =============================================================================
// Import session
// =============================================================================

/// Options for an import session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOptions {
    pub rules: ValidationRules,
    pub flag_policy: FlagPolicy,
    pub max_file_size: usize,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            rules: ValidationRules::default(),
            flag_policy: FlagPolicy::default(),
            max_file_size: MAX_FILE_SIZE,
        }
    }
}

impl From<&Settings> for ImportOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            rules: settings.rules,
            flag_policy: settings.flag_policy,
            max_file_size: settings.max_file_size,
        }
    }
}

/// Batch submission state. Exactly one of these at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SubmissionState {
    #[default]
    Idle,
    InFlight,
    Succeeded {
        #[serde(rename = "importedCount")]
        imported_count: u64,
    },
    Failed {
        cause: String,
    },
}

/// Row counts shown before submitting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub file_name: Option<String>,
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
}

/// One import session: a selected file, its parsed rows and the state of
/// the batch submission.
#[derive(Debug, Default)]
pub struct BulkImporter {
    options: ImportOptions,
    file_name: Option<String>,
    rows: Vec<ParsedRow>,
    has_parsed: bool,
    state: SubmissionState,
}

impl BulkImporter {
    pub fn new(options: ImportOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// True once a file has been parsed, even if it had no rows.
    pub fn has_parsed(&self) -> bool {
        self.has_parsed
    }

    pub fn rows(&self) -> &[ParsedRow] {
        &self.rows
    }

    pub fn valid_rows(&self) -> impl Iterator<Item = &ParsedRow> {
        self.rows.iter().filter(|row| row.is_valid())
    }

    pub fn invalid_rows(&self) -> impl Iterator<Item = &ParsedRow> {
        self.rows.iter().filter(|row| !row.is_valid())
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    /// True while a batch submission is in flight.
    pub fn is_busy(&self) -> bool {
        self.state == SubmissionState::InFlight
    }

    pub fn summary(&self) -> ImportSummary {
        let valid = self.valid_rows().count();
        ImportSummary {
            file_name: self.file_name.clone(),
            total: self.rows.len(),
            valid,
            invalid: self.rows.len() - valid,
        }
    }

    /// Accept a file and parse it, replacing any previous preview.
    ///
    /// A rejected file leaves the current preview untouched.
    pub fn load(&mut self, file_name: &str, bytes: &[u8]) -> ImportResult<ImportSummary> {
        self.check_accepts(file_name, bytes.len())?;
        log_info(format!("📄 Reading {} ({} bytes)", file_name, bytes.len()));
        let content = decode_content(bytes);
        Ok(self.replace_with(file_name, &content))
    }

    /// Same as [`Self::load`] for text that is already decoded.
    pub fn load_text(&mut self, file_name: &str, content: &str) -> ImportResult<ImportSummary> {
        self.check_accepts(file_name, content.len())?;
        log_info(format!("📄 Reading {} ({} bytes)", file_name, content.len()));
        Ok(self.replace_with(file_name, content))
    }

    /// Read a file from disk and load it.
    pub async fn load_path(&mut self, path: &Path) -> ImportResult<ImportSummary> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.check_accepts(&file_name, 0)?;
        let size = tokio::fs::metadata(path).await.map_err(FileError::from)?.len();
        self.check_accepts(&file_name, usize::try_from(size).unwrap_or(usize::MAX))?;
        let bytes = tokio::fs::read(path).await.map_err(FileError::from)?;
        self.load(&file_name, &bytes)
    }

    fn check_accepts(&self, file_name: &str, size: usize) -> ImportResult<()> {
        if self.is_busy() {
            return Err(ImportError::Busy);
        }
        if !is_csv_file_name(file_name) {
            log_error(format!("Rejected {file_name}: not a .csv file"));
            return Err(FileError::NotCsv { file_name: file_name.to_string() }.into());
        }
        if size > self.options.max_file_size {
            log_error(format!("Rejected {file_name}: {size} bytes"));
            return Err(FileError::TooLarge {
                size,
                limit: self.options.max_file_size,
            }
            .into());
        }
        Ok(())
    }

    fn replace_with(&mut self, file_name: &str, content: &str) -> ImportSummary {
        self.discard();

        let missing = missing_required_columns(content);
        if !missing.is_empty() {
            log_warning(format!("Missing required columns: {}", missing.join(", ")));
        }

        self.rows = parse_members_csv(content, &self.options.rules);
        self.file_name = Some(file_name.to_string());
        self.has_parsed = true;

        let summary = self.summary();
        if summary.total == 0 {
            log_warning("No data rows found");
        } else {
            log_success(format!("Read {} rows", summary.total));
            log_info_indent(format!("Valid: {}", summary.valid), 1);
            if summary.invalid > 0 {
                log_warning(format!("{} rows with errors", summary.invalid));
                for row in self.invalid_rows().take(5) {
                    log_info_indent(format!("Row {}: {}", row.row_index(), row.errors().join(", ")), 1);
                }
            }
        }
        summary
    }

    /// Drop the current preview and submission state.
    fn discard(&mut self) {
        self.rows.clear();
        self.file_name = None;
        self.has_parsed = false;
        self.state = SubmissionState::Idle;
    }

    /// Clear everything ("Clear & Reset"). Refused while submitting.
    pub fn reset(&mut self) -> ImportResult<()> {
        if self.is_busy() {
            return Err(ImportError::Busy);
        }
        self.discard();
        Ok(())
    }

    /// Start a submission: mark it in flight and map the valid rows.
    ///
    /// Invalid rows are never part of the batch.
    pub fn begin_submission(&mut self) -> ImportResult<Vec<MemberRecord>> {
        if self.is_busy() {
            return Err(ImportError::Busy);
        }
        let records = to_records(
            self.valid_rows().map(ParsedRow::fields),
            self.options.flag_policy,
        );
        if records.is_empty() {
            return Err(ImportError::NothingToImport);
        }
        self.state = SubmissionState::InFlight;
        log_info(format!("⬆️  Submitting {} members...", records.len()));
        Ok(records)
    }

    /// Settle a submission started with [`Self::begin_submission`].
    pub fn finish_submission(&mut self, outcome: Result<u64, StoreError>) -> ImportResult<u64> {
        match outcome {
            Ok(count) => {
                log_success(success_message(count));
                self.rows.clear();
                self.file_name = None;
                self.has_parsed = false;
                self.state = SubmissionState::Succeeded { imported_count: count };
                Ok(count)
            }
            Err(e) => {
                log_error(format!("Import failed: {e}"));
                self.state = SubmissionState::Failed { cause: e.to_string() };
                Err(ImportError::Store(e))
            }
        }
    }

    /// Submit every valid row to `store` in one batch.
    pub async fn submit<S: MemberStore + ?Sized>(&mut self, store: &S) -> ImportResult<u64> {
        let records = self.begin_submission()?;
        let outcome = store.submit_batch(&records).await;
        self.finish_submission(outcome)
    }
}
