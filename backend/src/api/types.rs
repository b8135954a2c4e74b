//! Request and response bodies of the HTTP API.
//!
//! Every error body has the shape `{"status": "error", "error": "..."}`,
//! optionally with `fieldErrors` and `form` for registrations.

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{ImportError, ServerError, StoreError};
use crate::import::{BulkImporter, ImportSummary, ParsedRow, SubmissionState};
use crate::models::{MemberId, RawMember, StoredMember};
use crate::validation::FormErrors;

/// Error half of every handler result.
pub type ApiError = (StatusCode, Json<Value>);

pub type ApiResult<T> = Result<T, ApiError>;

/// `GET /api/members` query.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub q: Option<String>,
}

/// `GET /api/template` query.
#[derive(Debug, Default, Deserialize)]
pub struct TemplateQuery {
    #[serde(default)]
    pub samples: bool,
}

/// Member list, possibly filtered.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MembersResponse {
    pub label: String,
    pub total: usize,
    pub members: Vec<StoredMember>,
}

/// Import preview and submission state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub has_parsed: bool,
    pub summary: ImportSummary,
    pub submission: SubmissionState,
    pub rows: Vec<ParsedRow>,
}

impl From<&BulkImporter> for UploadResponse {
    fn from(importer: &BulkImporter) -> Self {
        Self {
            has_parsed: importer.has_parsed(),
            summary: importer.summary(),
            submission: importer.state().clone(),
            rows: importer.rows().to_vec(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub imported_count: u64,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterResponse {
    pub id: MemberId,
    pub message: String,
}

/// Create an error body.
pub fn error_response(error: &str) -> Value {
    json!({
        "status": "error",
        "error": error,
    })
}

pub fn api_error(status: StatusCode, error: &str) -> ApiError {
    (status, Json(error_response(error)))
}

/// Registration failure: the message, per-field errors and the input as sent.
pub fn form_error(status: StatusCode, error: &str, field_errors: &FormErrors, form: &RawMember) -> ApiError {
    (
        status,
        Json(json!({
            "status": "error",
            "error": error,
            "fieldErrors": field_errors,
            "form": form,
        })),
    )
}

pub fn store_error(e: &StoreError) -> ApiError {
    api_error(StatusCode::BAD_GATEWAY, &e.to_string())
}

pub fn import_error(e: &ImportError) -> ApiError {
    let status = match e {
        ImportError::File(_) => StatusCode::BAD_REQUEST,
        ImportError::Busy | ImportError::NothingToImport => StatusCode::CONFLICT,
        ImportError::Store(_) => StatusCode::BAD_GATEWAY,
    };
    api_error(status, &e.to_string())
}

pub fn server_error(e: &ServerError) -> ApiError {
    let status = match e {
        ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    api_error(status, &e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FileError;

    #[test]
    fn test_import_error_status() {
        let rejected = ImportError::File(FileError::NotCsv { file_name: "a.txt".into() });
        assert_eq!(import_error(&rejected).0, StatusCode::BAD_REQUEST);
        assert_eq!(import_error(&ImportError::Busy).0, StatusCode::CONFLICT);
        let failed = ImportError::Store(StoreError::Unavailable("down".into()));
        let (status, Json(body)) = import_error(&failed);
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["status"], "error");
    }

    #[test]
    fn test_upload_response_shape() {
        let mut importer = BulkImporter::default();
        importer
            .load_text("m.csv", "Membership Number,Name\nMEM001,John")
            .unwrap();
        let body = serde_json::to_value(UploadResponse::from(&importer)).unwrap();
        assert_eq!(body["hasParsed"], true);
        assert_eq!(body["summary"]["total"], 1);
        assert_eq!(body["summary"]["invalid"], 1);
        assert_eq!(body["submission"]["status"], "idle");
        assert_eq!(body["rows"][0]["rowIndex"], 2);
        assert_eq!(body["rows"][0]["membershipNumber"], "MEM001");
        assert_eq!(body["rows"][0]["isValid"], false);
    }
}
