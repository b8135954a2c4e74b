//! HTTP server for the member registry.
//!
//! # API Endpoints
//!
//! | Method | Path                  | Description                              |
//! |--------|-----------------------|------------------------------------------|
//! | GET    | `/health`             | Health check                             |
//! | GET    | `/api/members`        | List members, `?q=` to search            |
//! | POST   | `/api/members`        | Register one member                      |
//! | GET    | `/api/members/export` | Download every member as CSV             |
//! | GET    | `/api/template`       | Download the CSV template, `?samples=true` |
//! | POST   | `/api/upload`         | Upload a CSV file for preview            |
//! | GET    | `/api/upload`         | Current preview and submission state     |
//! | DELETE | `/api/upload`         | Clear the preview                        |
//! | POST   | `/api/upload/submit`  | Import the valid rows                    |
//! | GET    | `/api/logs`           | SSE stream for real-time logs            |
//!
//! The server holds one import session. Its lock is only taken for the
//! synchronous steps, never across a store call.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use super::logs::sse_logs;
use super::types::{
    api_error, form_error, import_error, server_error, store_error, ApiResult, ListQuery,
    MembersResponse, RegisterResponse, SubmitResponse, TemplateQuery, UploadResponse,
};
use crate::config::{Settings, TEMPLATE_FILE_NAME};
use crate::error::{ImportResult, RegisterError, ServerError, ServerResult, StoreError, StoreResult};
use crate::export::{blank_template, export_file_name_today, render_members, sample_template};
use crate::import::{success_message, BulkImporter, ImportOptions};
use crate::logs::{log_error, log_info, log_warning};
use crate::models::{MemberRecord, RawMember, StoredMember};
use crate::register::RegisterForm;
use crate::search::{filter_members, member_count_label};
use crate::store::{HttpStore, InMemoryStore, MemberStore};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MemberStore>,
    pub importer: Arc<Mutex<BulkImporter>>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(store: Arc<dyn MemberStore>, settings: Settings) -> Self {
        let importer = BulkImporter::new(ImportOptions::from(&settings));
        Self {
            store,
            importer: Arc::new(Mutex::new(importer)),
            settings: Arc::new(settings),
        }
    }

    /// Use the configured remote store, or an in-memory one when none is set.
    pub fn from_settings(settings: Settings) -> Self {
        let store: Arc<dyn MemberStore> = match settings.store_url.as_deref() {
            Some(url) => {
                log_info(format!("Using member store at {url}"));
                Arc::new(HttpStore::new(url))
            }
            None => {
                log_warning("MEMBERREG_STORE_URL not set, members are kept in memory");
                Arc::new(InMemoryStore::new())
            }
        };
        Self::new(store, settings)
    }

    fn importer(&self) -> ApiResult<MutexGuard<'_, BulkImporter>> {
        self.importer
            .lock()
            .map_err(|_| server_error(&ServerError::Internal("import session lock poisoned".into())))
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    // Multipart framing needs a little room on top of the file itself.
    let body_limit = state.settings.max_file_size + 64 * 1024;

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/members", get(list_members).post(register_member))
        .route("/api/members/export", get(export_members))
        .route("/api/template", get(download_template))
        .route("/api/upload", post(upload_csv).get(upload_status).delete(reset_upload))
        .route("/api/upload/submit", post(submit_upload))
        .route("/api/logs", get(sse_logs))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(state: AppState, port: u16) -> ServerResult<()> {
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 Member registry running on http://localhost:{}", port);
    println!("   GET  /api/members        - List / search members");
    println!("   POST /api/members        - Register a member");
    println!("   POST /api/upload         - Upload CSV for preview");
    println!("   POST /api/upload/submit  - Import valid rows");
    println!("   GET  /api/logs           - SSE log stream");
    println!("   GET  /health             - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "memberreg",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

fn csv_download(file_name: &str, body: String) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{file_name}\"")),
        ],
        body,
    )
}

async fn fetch_members(state: &AppState) -> ApiResult<Vec<StoredMember>> {
    state.store.list_all().await.map_err(|e| {
        log_error(format!("Failed to load members: {e}"));
        store_error(&e)
    })
}

async fn list_members(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<MembersResponse>> {
    let members = fetch_members(&state).await?;
    let members: Vec<StoredMember> = filter_members(&members, query.q.as_deref().unwrap_or(""))
        .into_iter()
        .cloned()
        .collect();

    Ok(Json(MembersResponse {
        label: member_count_label(members.len()),
        total: members.len(),
        members,
    }))
}

async fn register_member(
    State(state): State<AppState>,
    Json(raw): Json<RawMember>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let mut session = RegisterForm::with_input(raw, state.settings.flag_policy);

    match session.submit(state.store.as_ref()).await {
        Ok(id) => {
            let message = session.state().message().unwrap_or_default().to_string();
            Ok((StatusCode::CREATED, Json(RegisterResponse { id, message })))
        }
        Err(RegisterError::Invalid(errors)) => Err(form_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Please correct the highlighted fields",
            &errors,
            session.form().values(),
        )),
        Err(e) => Err(form_error(
            StatusCode::BAD_GATEWAY,
            &e.to_string(),
            session.form().errors(),
            session.form().values(),
        )),
    }
}

async fn export_members(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let members = fetch_members(&state).await?;
    let records: Vec<MemberRecord> = members.into_iter().map(|member| member.record).collect();
    log_info(format!("Exporting {} members", records.len()));
    Ok(csv_download(&export_file_name_today(), render_members(&records)))
}

async fn download_template(Query(query): Query<TemplateQuery>) -> impl IntoResponse {
    let body = if query.samples {
        sample_template()
    } else {
        blank_template()
    };
    csv_download(TEMPLATE_FILE_NAME, body)
}

/// Upload CSV endpoint
async fn upload_csv(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, &format!("Multipart error: {}", e)))?
    {
        if field.name() == Some("file") {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| api_error(StatusCode::BAD_REQUEST, &format!("Read error: {}", e)))?;
            file = Some((file_name, bytes.to_vec()));
        }
    }

    let (file_name, bytes) =
        file.ok_or_else(|| server_error(&ServerError::BadRequest("No file provided".into())))?;

    let mut importer = state.importer()?;
    importer.load(&file_name, &bytes).map_err(|e| import_error(&e))?;
    Ok(Json(UploadResponse::from(&*importer)))
}

async fn upload_status(State(state): State<AppState>) -> ApiResult<Json<UploadResponse>> {
    let importer = state.importer()?;
    Ok(Json(UploadResponse::from(&*importer)))
}

async fn reset_upload(State(state): State<AppState>) -> ApiResult<Json<UploadResponse>> {
    let mut importer = state.importer()?;
    importer.reset().map_err(|e| import_error(&e))?;
    Ok(Json(UploadResponse::from(&*importer)))
}

/// Import the valid rows.
///
/// The store call and the settlement run in their own task, so the session
/// always leaves `InFlight` even if the client goes away mid-request.
async fn submit_upload(State(state): State<AppState>) -> ApiResult<Json<SubmitResponse>> {
    let records = {
        let mut importer = state.importer()?;
        importer.begin_submission().map_err(|e| import_error(&e))?
    };

    let store = Arc::clone(&state.store);
    let session = Arc::clone(&state.importer);
    let submission = tokio::spawn(async move {
        let outcome = store.submit_batch(&records).await;
        settle_submission(&session, outcome)
    });

    let result = match submission.await {
        Ok(result) => result,
        Err(e) => settle_submission(
            &state.importer,
            Err(StoreError::Unavailable(format!("submission task failed: {e}"))),
        ),
    };

    let imported_count = result.map_err(|e| import_error(&e))?;
    Ok(Json(SubmitResponse {
        imported_count,
        message: success_message(imported_count),
    }))
}

fn settle_submission(session: &Mutex<BulkImporter>, outcome: StoreResult<u64>) -> ImportResult<u64> {
    let mut importer = session.lock().unwrap_or_else(PoisonError::into_inner);
    importer.finish_submission(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MemberId;
    use async_trait::async_trait;
    use reqwest::multipart::{Form, Part};
    use std::time::Duration;

    const CSV: &str = "Membership Number,Name,Mobile No,Address,Area,Spouse Name,Alternate Mobile,Family Member Count,2024,Receipt 2024\n\
        MEM001,John Doe,9876543210,\"123 Main St, City\",Downtown,Jane Doe,9876543211,4,yes,R-1\n\
        MEM002,Alice Smith,8765432109,\"456 Oak Ave, Town\",Uptown,Bob Smith,,2,no,\n\
        MEM003,Bad Count,7654321098,789 Pine Rd,Midtown,Carol,,-1,,\n\
        MEM004,Ravi Kumar,6543210987,12 Lake View,Eastside,Priya,,,1,";

    async fn spawn(state: AppState) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn spawn_with(store: Arc<InMemoryStore>) -> String {
        spawn(AppState::new(store, Settings::default())).await
    }

    fn csv_form(file_name: &str, body: &str) -> Form {
        Form::new().part("file", Part::bytes(body.as_bytes().to_vec()).file_name(file_name.to_string()))
    }

    #[tokio::test]
    async fn test_health() {
        let base = spawn_with(Arc::new(InMemoryStore::new())).await;
        let body: Value = reqwest::get(format!("{base}/health")).await.unwrap().json().await.unwrap();
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_upload_then_submit() {
        let store = Arc::new(InMemoryStore::new());
        let base = spawn_with(store.clone()).await;
        let client = reqwest::Client::new();

        let preview: Value = client
            .post(format!("{base}/api/upload"))
            .multipart(csv_form("members.csv", CSV))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(preview["summary"]["total"], 4);
        assert_eq!(preview["summary"]["valid"], 3);
        assert_eq!(preview["rows"][2]["rowIndex"], 4);
        assert_eq!(preview["rows"][2]["errors"][0], "Family Member Count must be a non-negative number");
        assert!(store.is_empty().await);

        let response = client.post(format!("{base}/api/upload/submit")).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["importedCount"], 3);
        assert_eq!(body["message"], "Successfully imported 3 members.");

        let list: Value = reqwest::get(format!("{base}/api/members?q=downtown"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(list["total"], 1);
        assert_eq!(list["label"], "Showing 1 member");
        assert_eq!(list["members"][0]["year2024"], true);
        assert_eq!(list["members"][0]["receipt2024"], "R-1");

        let status: Value = reqwest::get(format!("{base}/api/upload")).await.unwrap().json().await.unwrap();
        assert_eq!(status["hasParsed"], false);
        assert_eq!(status["submission"]["importedCount"], 3);
    }

    #[tokio::test]
    async fn test_upload_rejects_non_csv() {
        let base = spawn_with(Arc::new(InMemoryStore::new())).await;
        let response = reqwest::Client::new()
            .post(format!("{base}/api/upload"))
            .multipart(csv_form("members.xlsx", CSV))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = response.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains(".csv"));
    }

    #[tokio::test]
    async fn test_submit_without_rows_conflicts() {
        let base = spawn_with(Arc::new(InMemoryStore::new())).await;
        let response = reqwest::Client::new()
            .post(format!("{base}/api/upload/submit"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_failed_submit_keeps_preview() {
        let store = Arc::new(InMemoryStore::new());
        let base = spawn_with(store.clone()).await;
        let client = reqwest::Client::new();
        client
            .post(format!("{base}/api/upload"))
            .multipart(csv_form("members.csv", CSV))
            .send()
            .await
            .unwrap();

        store.set_offline(true);
        let response = client.post(format!("{base}/api/upload/submit")).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let status: Value = reqwest::get(format!("{base}/api/upload")).await.unwrap().json().await.unwrap();
        assert_eq!(status["summary"]["total"], 4);
        assert_eq!(status["submission"]["status"], "failed");

        let cleared: Value = client.delete(format!("{base}/api/upload")).send().await.unwrap().json().await.unwrap();
        assert_eq!(cleared["summary"]["total"], 0);
    }

    /// Store that takes a while to accept a batch.
    struct SlowStore;

    #[async_trait]
    impl MemberStore for SlowStore {
        async fn submit_one(&self, _record: &MemberRecord) -> StoreResult<MemberId> {
            Ok("slow-1".into())
        }

        async fn submit_batch(&self, records: &[MemberRecord]) -> StoreResult<u64> {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok(records.len() as u64)
        }

        async fn list_all(&self) -> StoreResult<Vec<StoredMember>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_abandoned_submit_still_settles() {
        let base = spawn(AppState::new(Arc::new(SlowStore), Settings::default())).await;
        let client = reqwest::Client::new();
        client
            .post(format!("{base}/api/upload"))
            .multipart(csv_form("members.csv", CSV))
            .send()
            .await
            .unwrap();

        let err = client
            .post(format!("{base}/api/upload/submit"))
            .timeout(Duration::from_millis(100))
            .send()
            .await
            .unwrap_err();
        assert!(err.is_timeout());

        tokio::time::sleep(Duration::from_millis(1000)).await;
        let status: Value = reqwest::get(format!("{base}/api/upload")).await.unwrap().json().await.unwrap();
        assert_eq!(status["submission"]["status"], "succeeded");
        assert_eq!(status["submission"]["importedCount"], 3);
        assert_eq!(status["hasParsed"], false);

        let response = client.delete(format!("{base}/api/upload")).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_register_member() {
        let store = Arc::new(InMemoryStore::new());
        let base = spawn_with(store.clone()).await;
        let client = reqwest::Client::new();
        let form = json!({
            "membershipNumber": "MEM100",
            "name": "Asha Menon",
            "mobileNo": "98765 43210",
            "address": "4 Hill Road",
            "area": "Northside",
            "spouseName": "Ravi Menon",
            "year2023": true,
            "receipt2023": "R-23"
        });

        let response = client.post(format!("{base}/api/members")).json(&form).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["message"], "Asha Menon has been successfully registered as a member!");

        let stored = store.list_all().await.unwrap();
        assert_eq!(stored[0].record.mobile_no, "9876543210");

        let response = client
            .post(format!("{base}/api/members"))
            .json(&json!({ "name": "Nobody" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["fieldErrors"]["area"], "Area is required.");
        assert_eq!(body["form"]["name"], "Nobody");

        store.set_offline(true);
        let response = client.post(format!("{base}/api/members")).json(&form).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["fieldErrors"]["name"], "Registration failed. Please try again.");
        assert_eq!(body["form"]["membershipNumber"], "MEM100");
    }

    #[tokio::test]
    async fn test_export_and_template_downloads() {
        let store = Arc::new(InMemoryStore::with_records(crate::export::sample_records()));
        let base = spawn_with(store).await;

        let response = reqwest::get(format!("{base}/api/members/export")).await.unwrap();
        let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
        assert!(disposition.contains("members_database_"));
        let body = response.text().await.unwrap();
        assert_eq!(body.lines().count(), 3);
        assert!(body.starts_with("Membership Number,Name,Mobile No"));

        let response = reqwest::get(format!("{base}/api/template?samples=true")).await.unwrap();
        let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
        assert!(disposition.contains("members_template.csv"));
        assert_eq!(response.text().await.unwrap().lines().count(), 3);

        let blank = reqwest::get(format!("{base}/api/template")).await.unwrap().text().await.unwrap();
        assert_eq!(blank.lines().count(), 1);
    }
}
