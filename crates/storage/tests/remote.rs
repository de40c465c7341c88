//! Remote backends against in-process HTTP servers.

use axum::Router;
use axum::extract::{Multipart, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tribe_catalog::{Database, Repository};
use tribe_ident::LevelId;
use tribe_storage::backend::{FileManagerBackend, ObjectStoreBackend, RelayBackend};
use tribe_storage::error::ErrorKind;
use tribe_storage::{StorageBackend, UploadMeta};

const PAYLOAD: &str = "eyJuYW1lIjoidGVzdCJ90123456789abcdef0123456789abcdef01234567";

#[derive(Debug, Clone, Default)]
struct Received {
    query: HashMap<String, String>,
    cookie: Option<String>,
    field: Option<(String, Option<String>, Option<String>)>,
    body: String,
}

type Log = Arc<Mutex<Vec<Received>>>;

async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    format!("http://{addr}")
}

fn id() -> LevelId {
    "0123-4567-89AB-CDEF".parse().unwrap()
}

fn timeout() -> Duration {
    Duration::from_secs(1)
}

// =============================================================================
// Object store
// =============================================================================

async fn object_store(reply: &'static str) -> (String, Log) {
    let log = Log::default();
    let router = Router::new()
        .route(
            "/levels/",
            post(move |State(log): State<Log>, Query(query): Query<HashMap<String, String>>, body: String| async move {
                log.lock().await.push(Received { query, body, ..Received::default() });
                reply
            }),
        )
        .with_state(log.clone());
    (format!("{}/levels/", serve(router).await), log)
}

#[tokio::test]
async fn test_object_store_upload() {
    let (url, log) = object_store("uploaded").await;
    let backend = ObjectStoreBackend::new("store", &url, "secret", false, timeout()).unwrap();
    backend.upload(&id(), PAYLOAD, &UploadMeta::default()).await.unwrap();

    let log = log.lock().await;
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].query["upload"], "0123-4567-89AB-CDEF.swe");
    assert_eq!(log[0].query["key"], "secret");
    assert_eq!(log[0].body, PAYLOAD);
}

#[tokio::test]
async fn test_object_store_empty_reply_is_connection_error() {
    let (url, _log) = object_store("").await;
    let backend = ObjectStoreBackend::new("store", &url, "secret", false, timeout()).unwrap();
    let err = backend.upload(&id(), PAYLOAD, &UploadMeta::default()).await.unwrap_err();
    assert!(matches!(&*err, ErrorKind::Connection(_)));
}

#[tokio::test]
async fn test_unreachable_store_is_connection_error() {
    // Bind then drop, so the port is very likely closed.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let backend = ObjectStoreBackend::new("store", &format!("http://{addr}/"), "k", false, timeout()).unwrap();
    let err = backend.upload(&id(), PAYLOAD, &UploadMeta::default()).await.unwrap_err();
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_slow_store_times_out() {
    let router = Router::new().route(
        "/",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "late"
        }),
    );
    let url = format!("{}/", serve(router).await);
    let backend = ObjectStoreBackend::new("store", &url, "k", false, Duration::from_millis(200)).unwrap();
    let err = backend.upload(&id(), PAYLOAD, &UploadMeta::default()).await.unwrap_err();
    assert!(matches!(&*err, ErrorKind::Connection(_)));
}

// =============================================================================
// File manager
// =============================================================================

async fn file_manager(reply: &'static str) -> (String, Log) {
    let log = Log::default();
    let router = Router::new()
        .route(
            "/files/",
            post(
                move |State(log): State<Log>,
                 Query(query): Query<HashMap<String, String>>,
                 headers: HeaderMap,
                 mut multipart: Multipart| async move {
                    let mut received = Received {
                        query,
                        cookie: headers.get("cookie").and_then(|v| v.to_str().ok()).map(str::to_string),
                        ..Received::default()
                    };
                    while let Some(field) = multipart.next_field().await.unwrap() {
                        let name = field.name().unwrap_or_default().to_string();
                        let file_name = field.file_name().map(str::to_string);
                        let content_type = field.content_type().map(str::to_string);
                        received.body = field.text().await.unwrap();
                        received.field = Some((name, file_name, content_type));
                    }
                    log.lock().await.push(received);
                    reply
                },
            ),
        )
        .with_state(log.clone());
    (format!("{}/files/", serve(router).await), log)
}

#[tokio::test]
async fn test_file_manager_upload() {
    let (url, log) = file_manager("<html>done</html>").await;
    let backend = FileManagerBackend::new("manager", &url, "hunter2", timeout()).unwrap();
    backend.upload(&id(), PAYLOAD, &UploadMeta::default()).await.unwrap();

    let log = log.lock().await;
    assert_eq!(log[0].query["action"], "upsmallfile");
    let cookie = log[0].cookie.as_deref().unwrap();
    assert!(cookie.starts_with("admin="), "{cookie}");
    assert!(cookie.ends_with(')'), "{cookie}");
    let (name, file_name, content_type) = log[0].field.clone().unwrap();
    assert_eq!(name, "file1");
    assert_eq!(file_name.as_deref(), Some("0123-4567-89AB-CDEF.swe"));
    assert_eq!(content_type.as_deref(), Some("text/plain"));
    assert_eq!(log[0].body, PAYLOAD);
}

#[tokio::test]
async fn test_file_manager_error_page() {
    let (url, _log) = file_manager("\n{\"error\":\"not logged in\"}").await;
    let backend = FileManagerBackend::new("manager", &url, "wrong", timeout()).unwrap();
    let err = backend.upload(&id(), PAYLOAD, &UploadMeta::default()).await.unwrap_err();
    assert!(matches!(&*err, ErrorKind::Connection(_)));
}

// =============================================================================
// Attachment relay
// =============================================================================

async fn relay(status: StatusCode, reply: &'static str) -> (String, Arc<Mutex<Vec<serde_json::Value>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let router = Router::new()
        .route(
            "/upload",
            post(
                move |State(log): State<Arc<Mutex<Vec<serde_json::Value>>>>,
                      axum::Json(body): axum::Json<serde_json::Value>| async move {
                    log.lock().await.push(body);
                    (status, reply)
                },
            ),
        )
        .with_state(log.clone());
    (serve(router).await, log)
}

async fn relay_backend(api_url: &str) -> (RelayBackend, Repository) {
    let db = Database::in_memory().await.unwrap();
    let repo = Repository::from(&db);
    let backend =
        RelayBackend::new("relay", repo.clone(), api_url, "http://tribe.example.com/", "42", false, timeout()).unwrap();
    (backend, repo)
}

#[tokio::test]
async fn test_relay_upload_records_attachment() {
    let (api_url, log) = relay(StatusCode::OK, r#"{"status":"success","attachment_id":"987"}"#).await;
    let (backend, repo) = relay_backend(&api_url).await;
    let meta = UploadMeta { name: "Castle".into(), author: "mario".into(), tags: vec!["Tradicional".into(), "Música".into()] };
    backend.upload(&id(), PAYLOAD, &meta).await.unwrap();

    let log = log.lock().await;
    assert_eq!(log[0]["level_id"], "0123-4567-89AB-CDEF");
    assert_eq!(log[0]["level_data"], PAYLOAD);
    assert_eq!(log[0]["level_name"], "Castle");
    assert_eq!(log[0]["level_author"], "mario");
    assert_eq!(log[0]["level_tags"], "Tradicional,Música");
    assert_eq!(repo.get_attachment(&id()).await.unwrap().as_deref(), Some("987"));
    assert_eq!(
        backend.generate_url(&id()).await.unwrap(),
        "https://cdn.discordapp.com/attachments/42/987/0123-4567-89AB-CDEF.swe"
    );
}

#[tokio::test]
async fn test_relay_failure_status() {
    let (api_url, _log) = relay(StatusCode::OK, r#"{"status":"error"}"#).await;
    let (backend, repo) = relay_backend(&api_url).await;
    let err = backend.upload(&id(), PAYLOAD, &UploadMeta::default()).await.unwrap_err();
    assert!(matches!(&*err, ErrorKind::Connection(_)));
    assert_eq!(repo.get_attachment(&id()).await.unwrap(), None);
}

#[tokio::test]
async fn test_relay_server_error() {
    let (api_url, _log) = relay(StatusCode::INTERNAL_SERVER_ERROR, "oops").await;
    let (backend, _repo) = relay_backend(&api_url).await;
    let err = backend.upload(&id(), PAYLOAD, &UploadMeta::default()).await.unwrap_err();
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_relay_delete_forgets_attachment() {
    let (api_url, _log) = relay(StatusCode::OK, r#"{"status":"success","attachment_id":1}"#).await;
    let (backend, repo) = relay_backend(&api_url).await;
    backend.upload(&id(), PAYLOAD, &UploadMeta::default()).await.unwrap();
    backend.delete(&id()).await.unwrap();
    assert_eq!(repo.get_attachment(&id()).await.unwrap(), None);
    assert!(matches!(&*backend.delete(&id()).await.unwrap_err(), ErrorKind::NotFound(_)));
}
