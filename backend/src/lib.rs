//! # Memberreg - membership registry import and export
//!
//! Memberreg validates membership spreadsheets exported as CSV, imports the
//! valid rows into a remote member store in one batch, registers single
//! members, and exports the whole registry back to CSV.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  CSV File   │────▶│   Parser    │────▶│ Validation  │────▶│   Import    │
//! │ (UTF-8/ISO) │     │ (lexer+cols)│     │  (per row)  │     │ (one batch) │
//! └─────────────┘     └─────────────┘     └─────────────┘     └──────┬──────┘
//!                                                                    │ mapper
//!        ┌─────────────┐                                     ┌───────▼──────┐
//!        │   Export    │◀────────────── list_all ────────────│ MemberStore  │
//!        │(CSV, Yes/No)│                                     │ (remote)     │
//!        └─────────────┘                                     └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use memberreg::{BulkImporter, HttpStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut importer = BulkImporter::default();
//!     let summary = importer.load_path("members.csv".as_ref()).await.unwrap();
//!     println!("{} valid, {} invalid", summary.valid, summary.invalid);
//!
//!     let store = HttpStore::new("http://localhost:8080");
//!     let count = importer.submit(&store).await.unwrap();
//!     println!("Imported {} members", count);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`config`] - Constants and environment settings
//! - [`models`] - Member shapes and the field descriptor table
//! - [`parser`] - CSV lexer, column resolver, byte decoding
//! - [`validation`] - Row and form rules
//! - [`mapper`] - Raw fields to store records
//! - [`import`] - Bulk import session
//! - [`export`] - CSV template and export
//! - [`register`] - Single-member registration
//! - [`search`] - Member list filtering
//! - [`store`] - Remote member store contract
//! - [`logs`] - Log broadcaster
//! - [`api`] - HTTP API server

// Core modules
pub mod config;
pub mod error;
pub mod logs;
pub mod models;

// Input
pub mod parser;
pub mod validation;

// Pipeline
pub mod export;
pub mod import;
pub mod mapper;
pub mod register;
pub mod search;

// Collaborators
pub mod store;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError, FileError, ImportError, RegisterError, ServerError, StoreError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    Field, MemberId, MemberRecord, MembershipYear, RawMember, StoredMember, YearEntry,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use config::Settings;
pub use export::{blank_template, export_file_name, render_members, sample_template};
pub use import::{parse_members_csv, BulkImporter, ImportOptions, ImportSummary, ParsedRow, SubmissionState};
pub use mapper::{to_record, FlagPolicy};
pub use parser::{decode_content, split_line, ColumnResolver};
pub use register::{FormState, RegisterForm, RegistrationState};
pub use search::{filter_members, member_count_label};
pub use validation::{validate_form, validate_row, ValidationRules};

// =============================================================================
// Re-exports - Store
// =============================================================================

pub use store::{HttpStore, InMemoryStore, MemberStore};

// Server
pub mod server {
    pub use crate::api::server::{router, start_server, AppState};
}
