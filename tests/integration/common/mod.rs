//! Common test utilities
//!
//! A fake library backend served by axum on an ephemeral port, and a portal
//! router wired to it with the in-memory session store.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, Method, Request, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use library_portal::{
    api,
    client::ApiClient,
    config::AppConfig,
    services::{
        sessions::{MemorySessionStore, SessionManager},
        Services,
    },
    AppState,
};

/// What the fake backend has seen
#[derive(Default)]
pub struct BackendState {
    pub revoked: Mutex<HashSet<String>>,
    pub borrow_calls: AtomicUsize,
    pub reserve_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub last_borrow: Mutex<Option<Value>>,
    pub last_return: Mutex<Option<Value>>,
    pub renew_calls: AtomicUsize,
    pub book_gets: AtomicUsize,
    /// Book lookups after this many succeed with 503
    pub busy_after_book_gets: Mutex<Option<usize>>,
    pub cancelled: Mutex<HashSet<i64>>,
    pub book_writes: AtomicUsize,
    pub last_book_write: Mutex<Option<Value>>,
    pub last_member_status: Mutex<Option<Value>>,
    pub deleted: Mutex<Vec<String>>,
}

impl BackendState {
    pub fn revoke(&self, token: &str) {
        self.revoked.lock().unwrap().insert(token.to_string());
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

type Shared = Arc<BackendState>;

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "statusCode": 401, "message": "Unauthorized" }))).into_response()
}

fn authorize(state: &BackendState, headers: &HeaderMap) -> Result<String, Response> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(unauthorized)?;
    if state.revoked.lock().unwrap().contains(token) {
        return Err(unauthorized());
    }
    Ok(token.to_string())
}

/// Catalog: six titles, three of which contain "the" (in any case)
pub fn books() -> Value {
    json!([
        {
            "id": 1,
            "title": "The Martian",
            "authors": [{ "author": { "id": 1, "name": "Andy Weir" } }],
            "genres": [{ "genre": { "id": 1, "name": "Science Fiction" } }],
            "copies": [
                { "id": 101, "inventoryCode": "BK-101", "status": "LOANED" },
                { "id": 102, "inventoryCode": "BK-102", "status": "AVAILABLE" }
            ]
        },
        {
            "id": 2,
            "title": "Dune",
            "authorNames": "Frank Herbert",
            "genreNames": "Science Fiction",
            "copiesCount": 10,
            "availableCount": 3
        },
        {
            "id": 3,
            "title": "THE HOBBIT",
            "authors": [{ "author": { "id": 2, "name": "J.R.R. Tolkien" } }],
            "genres": [{ "genre": { "id": 2, "name": "Fantasy" } }],
            "copies": [{ "id": 301, "inventoryCode": "BK-301", "status": "LOANED" }]
        },
        {
            "id": 4,
            "title": "Brave New World",
            "authors": null,
            "genres": [{ "genre": { "id": 3, "name": "Classics" } }],
            "totalCopies": 2,
            "availableCopies": 2
        },
        {
            "id": 5,
            "title": "Gone with the Wind",
            "genres": [{ "genre": { "id": 3, "name": "Classics" } }],
            "copies": []
        },
        {
            "id": 6,
            "title": "Emma",
            "genres": [{ "genre": { "id": 3, "name": "Classics" } }],
            "copiesCount": 1,
            "availableCount": 1
        }
    ])
}

fn loan(id: i64, status: &str, due: &str) -> Value {
    json!({
        "id": id,
        "memberId": 1,
        "copyId": 101,
        "loanDate": "2026-10-01T09:00:00.000Z",
        "dueDate": due,
        "status": status,
        "renewalCount": 0,
        "copy": {
            "id": 101,
            "inventoryCode": "BK-101",
            "book": { "id": 1, "title": "The Martian", "authors": [{ "author": { "name": "Andy Weir" } }] }
        },
        "member": { "id": 1, "user": { "name": "Alice Nguyen", "email": "alice@example.com" } }
    })
}

async fn login(Json(body): Json<Value>) -> Response {
    let user = match (body["username"].as_str(), body["password"].as_str()) {
        (Some("alice"), Some("secret1")) => json!({
            "id": 1, "name": "Alice Nguyen", "email": "alice@example.com",
            "username": "alice", "role": "MEMBER"
        }),
        (Some("admin"), Some("admin123")) => json!({
            "id": 99, "name": "Head Librarian", "email": "admin@example.com",
            "username": "admin", "role": "ADMIN"
        }),
        (Some("broken"), _) => return Json(json!({ "user": { "id": 5 } })).into_response(),
        _ => return unauthorized(),
    };
    let token = format!("token-{}", body["username"].as_str().unwrap_or_default());
    Json(json!({ "token": token, "user": user })).into_response()
}

async fn logout(State(state): State<Shared>) -> Response {
    state.logout_calls.fetch_add(1, Ordering::SeqCst);
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "message": "Logout exploded" }))).into_response()
}

async fn register(Json(body): Json<Value>) -> Response {
    if body["username"] == "taken" {
        return (StatusCode::CONFLICT, Json(json!({ "message": "Username already exists" }))).into_response();
    }
    (
        StatusCode::CREATED,
        Json(json!({ "user": { "id": 7, "name": body["name"], "username": body["username"], "role": "MEMBER" } })),
    )
        .into_response()
}

async fn list_books(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(r) = authorize(&state, &headers) {
        return r;
    }
    Json(json!({ "data": books(), "pagination": { "page": 1, "total": 6 } })).into_response()
}

async fn get_book(State(state): State<Shared>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    if let Err(r) = authorize(&state, &headers) {
        return r;
    }
    let seen = state.book_gets.fetch_add(1, Ordering::SeqCst);
    if let Some(limit) = *state.busy_after_book_gets.lock().unwrap() {
        if seen >= limit {
            return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "message": "catalog busy" }))).into_response();
        }
    }
    match books()
        .as_array()
        .and_then(|all| all.iter().find(|b| b["id"] == id).cloned())
    {
        Some(book) => Json(book).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({ "message": "Book not found" }))).into_response(),
    }
}

async fn create_book(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Err(r) = authorize(&state, &headers) {
        return r;
    }
    state.book_writes.fetch_add(1, Ordering::SeqCst);
    let book = json!({ "id": 7, "title": body["title"], "copies": [] });
    *state.last_book_write.lock().unwrap() = Some(body);
    (StatusCode::CREATED, Json(book)).into_response()
}

async fn update_book(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(r) = authorize(&state, &headers) {
        return r;
    }
    state.book_writes.fetch_add(1, Ordering::SeqCst);
    let book = json!({ "id": id, "title": body["title"], "copiesCount": 10, "availableCount": 3 });
    *state.last_book_write.lock().unwrap() = Some(body);
    Json(book).into_response()
}

async fn delete_resource(State(state): State<Shared>, headers: HeaderMap, uri: Uri) -> Response {
    if let Err(r) = authorize(&state, &headers) {
        return r;
    }
    state.deleted.lock().unwrap().push(uri.path().to_string());
    StatusCode::NO_CONTENT.into_response()
}

async fn borrow(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Err(r) = authorize(&state, &headers) {
        return r;
    }
    state.borrow_calls.fetch_add(1, Ordering::SeqCst);
    let due = body["dueDate"].as_str().unwrap_or_default().to_string();
    *state.last_borrow.lock().unwrap() = Some(body);
    (StatusCode::CREATED, Json(json!({ "success": true, "data": loan(50, "ACTIVE", &due) }))).into_response()
}

async fn my_loans(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(r) = authorize(&state, &headers) {
        return r;
    }
    Json(json!([
        loan(1, "OVERDUE", "2026-01-01T23:59:59.999Z"),
        loan(2, "RETURNED", "2026-02-01T23:59:59.999Z"),
        loan(3, "ACTIVE", "2099-01-01T23:59:59.999Z")
    ]))
    .into_response()
}

async fn get_loan(State(state): State<Shared>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    if let Err(r) = authorize(&state, &headers) {
        return r;
    }
    Json(loan(id, "ACTIVE", "2099-01-01T23:59:59.999Z")).into_response()
}

async fn return_loan(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(r) = authorize(&state, &headers) {
        return r;
    }
    *state.last_return.lock().unwrap() = Some(body);
    let mut returned = loan(id, "RETURNED", "2099-01-01T23:59:59.999Z");
    returned["returnDate"] = json!("2026-10-16T10:00:00.000Z");
    Json(returned).into_response()
}

/// Acknowledges without echoing the loan
async fn renew_loan(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(r) = authorize(&state, &headers) {
        return r;
    }
    state.renew_calls.fetch_add(1, Ordering::SeqCst);
    Json(json!({ "message": "Loan renewed" })).into_response()
}

async fn overdue_count(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(r) = authorize(&state, &headers) {
        return r;
    }
    Json(json!({ "count": 2 })).into_response()
}

async fn reserve(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Err(r) = authorize(&state, &headers) {
        return r;
    }
    state.reserve_calls.fetch_add(1, Ordering::SeqCst);
    // Only the Hobbit reply carries the nested book
    let book = if body["bookId"] == 3 {
        json!({ "id": 3, "title": "THE HOBBIT", "authors": [{ "author": { "name": "J.R.R. Tolkien" } }] })
    } else {
        Value::Null
    };
    (
        StatusCode::CREATED,
        Json(json!({
            "id": 20,
            "bookId": body["bookId"],
            "status": "PENDING",
            "startDate": body["startDate"],
            "endDate": body["endDate"],
            "book": book
        })),
    )
        .into_response()
}

fn reservations(state: &BackendState) -> Vec<Value> {
    let cancelled = state.cancelled.lock().unwrap();
    [(10, 3, "THE HOBBIT", "PENDING"), (11, 1, "The Martian", "FULFILLED"), (12, 4, "Brave New World", "CANCELLED")]
        .into_iter()
        .map(|(id, book_id, title, status)| {
            let status = if cancelled.contains(&id) { "CANCELLED" } else { status };
            json!({
                "id": id,
                "bookId": book_id,
                "status": status,
                "reservedAt": "2026-10-01T09:00:00.000Z",
                "book": { "id": book_id, "title": title }
            })
        })
        .collect()
}

async fn list_reservations(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(r) = authorize(&state, &headers) {
        return r;
    }
    Json(json!({ "data": reservations(&state) })).into_response()
}

async fn get_reservation(State(state): State<Shared>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    if let Err(r) = authorize(&state, &headers) {
        return r;
    }
    match reservations(&state).into_iter().find(|r| r["id"] == id) {
        Some(reservation) => Json(reservation).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({ "message": "Reservation not found" }))).into_response(),
    }
}

/// Answers 204 with no body
async fn cancel_reservation(State(state): State<Shared>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    if let Err(r) = authorize(&state, &headers) {
        return r;
    }
    state.cancelled.lock().unwrap().insert(id);
    StatusCode::NO_CONTENT.into_response()
}

async fn members(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if let Err(r) = authorize(&state, &headers) {
        return r;
    }
    Json(json!([member(1, "ACTIVE"), member(2, "SUSPENDED")])).into_response()
}

fn member(id: i64, status: &str) -> Value {
    let (name, username) = if id == 1 { ("Alice Nguyen", "alice") } else { ("Bob Tran", "bob") };
    json!({ "id": id, "memberCode": format!("MEM-{}", id), "status": status, "user": { "name": name, "username": username } })
}

async fn get_member(State(state): State<Shared>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    if let Err(r) = authorize(&state, &headers) {
        return r;
    }
    let status = state
        .last_member_status
        .lock()
        .unwrap()
        .as_ref()
        .and_then(|body| body["status"].as_str().map(str::to_string))
        .unwrap_or_else(|| "SUSPENDED".to_string());
    Json(member(id, &status)).into_response()
}

/// Acknowledges without echoing the member
async fn update_member_status(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Err(r) = authorize(&state, &headers) {
        return r;
    }
    *state.last_member_status.lock().unwrap() = Some(body);
    Json(json!({ "message": "Status updated" })).into_response()
}

/// Spawn the fake backend and return its base URL
async fn spawn_backend(state: Shared) -> String {
    let app = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/register", post(register))
        .route("/catalog/books", get(list_books).post(create_book))
        .route(
            "/catalog/books/:id",
            get(get_book).patch(update_book).delete(delete_resource),
        )
        .route("/loans", get(my_loans))
        .route("/loans/borrow", post(borrow))
        .route("/loans/overdue/count", get(overdue_count))
        .route("/loans/:id", get(get_loan))
        .route("/loans/:id/renew", post(renew_loan))
        .route("/loans/:id/return", post(return_loan))
        .route("/reservations", get(list_reservations).post(reserve))
        .route("/reservations/:id", get(get_reservation))
        .route("/reservations/:id/cancel", post(cancel_reservation))
        .route("/members", get(members))
        .route("/members/:id", get(get_member).delete(delete_resource))
        .route("/members/:id/status", patch(update_member_status))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Response as seen by the browser shell
pub struct PageResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl PageResponse {
    pub fn location(&self) -> Option<&str> {
        self.headers.get(header::LOCATION).and_then(|v| v.to_str().ok())
    }

    /// `name=value` part of the first Set-Cookie header
    pub fn cookie(&self) -> Option<String> {
        self.headers
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::to_string)
    }
}

/// Test application: the portal router against the fake backend
pub struct TestApp {
    pub router: Router,
    pub backend: Shared,
}

impl TestApp {
    pub async fn new() -> Self {
        let backend = Shared::default();
        let mut config = AppConfig::default();
        config.backend.base_url = spawn_backend(backend.clone()).await;
        config.backend.timeout_secs = 5;

        let client = ApiClient::new(&config.backend).unwrap();
        let sessions = SessionManager::new(Arc::new(MemorySessionStore::new()), config.session_ttl_secs());
        let state = AppState {
            config: Arc::new(config),
            services: Arc::new(Services::new(client, sessions)),
        };

        Self {
            router: api::router(state),
            backend,
        }
    }

    pub async fn request(&self, method: Method, uri: &str, cookie: Option<&str>, body: Option<Value>) -> PageResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        PageResponse { status, headers, body }
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> PageResponse {
        self.request(Method::GET, uri, cookie, None).await
    }

    pub async fn post(&self, uri: &str, cookie: Option<&str>, body: Value) -> PageResponse {
        self.request(Method::POST, uri, cookie, Some(body)).await
    }

    /// Log in and return the session cookie
    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .post("/login", None, json!({ "username": username, "password": password }))
            .await;
        assert_eq!(response.status, StatusCode::OK, "login failed: {}", response.body);
        response.cookie().expect("no session cookie set")
    }
}
