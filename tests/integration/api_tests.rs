//! API integration tests

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use serde_json::json;

use crate::common::{BackendState, TestApp};

fn in_days(days: i64) -> String {
    (Utc::now().date_naive() + Duration::days(days))
        .format("%Y-%m-%d")
        .to_string()
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new().await;

    let response = app.get("/health", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "healthy");

    let ready = app.get("/ready", None).await;
    assert_eq!(ready.status, StatusCode::OK);
    assert_eq!(ready.body["status"], "ready");
}

#[tokio::test]
async fn test_login_redirects_by_role() {
    let app = TestApp::new().await;

    let member = app
        .post("/login", None, json!({ "username": "alice", "password": "secret1" }))
        .await;
    assert_eq!(member.status, StatusCode::OK);
    assert_eq!(member.body["redirect_to"], "/user/homepage");
    assert!(member.cookie().unwrap().starts_with("library_session="));

    let admin = app
        .post("/login", None, json!({ "username": "admin", "password": "admin123" }))
        .await;
    assert_eq!(admin.body["redirect_to"], "/admin/dashboard");
    assert_eq!(admin.body["user"]["role"], "ADMIN");
}

#[tokio::test]
async fn test_login_rejections() {
    let app = TestApp::new().await;

    let wrong = app
        .post("/login", None, json!({ "username": "alice", "password": "nope" }))
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.body["message"], "Invalid username or password");
    assert!(wrong.cookie().is_none());

    let malformed = app
        .post("/login", None, json!({ "username": "broken", "password": "x" }))
        .await;
    assert_eq!(malformed.status, StatusCode::UNAUTHORIZED);
    assert_eq!(malformed.body["message"], "Invalid response from server");

    let empty = app.post("/login", None, json!({ "username": "", "password": "" })).await;
    assert_eq!(empty.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_state() {
    let app = TestApp::new().await;

    let anonymous = app.get("/session", None).await;
    assert_eq!(anonymous.body["authenticated"], false);

    let cookie = app.login("alice", "secret1").await;
    let session = app.get("/session", Some(&cookie)).await;
    assert_eq!(session.body["authenticated"], true);
    assert_eq!(session.body["user"]["username"], "alice");

    let login_page = app.get("/login", Some(&cookie)).await;
    assert_eq!(login_page.status, StatusCode::SEE_OTHER);
    assert_eq!(login_page.location(), Some("/user/homepage"));
}

#[tokio::test]
async fn test_role_guards() {
    let app = TestApp::new().await;

    let anonymous = app.get("/user/homepage", None).await;
    assert_eq!(anonymous.status, StatusCode::SEE_OTHER);
    assert_eq!(anonymous.location(), Some("/login"));

    let member = app.login("alice", "secret1").await;
    let denied = app.get("/admin/dashboard", Some(&member)).await;
    assert_eq!(denied.status, StatusCode::SEE_OTHER);
    assert_eq!(denied.location(), Some("/login"));

    let home = app.get("/user/homepage", Some(&member)).await;
    assert_eq!(home.status, StatusCode::OK);
    assert_eq!(home.body["featured"].as_array().unwrap().len(), 6);
    assert_eq!(home.body["popular_categories"][0]["name"], "Classics");

    let admin = app.login("admin", "admin123").await;
    let dashboard = app.get("/admin/dashboard", Some(&admin)).await;
    assert_eq!(dashboard.status, StatusCode::OK);
    assert_eq!(dashboard.body["total_books"], 6);
    assert_eq!(dashboard.body["books_on_loan"], 9);
    assert_eq!(dashboard.body["overdue_items"], 2);
    assert_eq!(dashboard.body["total_members"], 2);
}

#[tokio::test]
async fn test_catalog_search_is_case_insensitive() {
    let app = TestApp::new().await;
    let cookie = app.login("alice", "secret1").await;

    // "The Martian", "THE HOBBIT", "Gone with the Wind"
    for term in ["the", "THE", "tHe"] {
        let page = app
            .get(&format!("/user/books?q={}&per_page=100", term), Some(&cookie))
            .await;
        assert_eq!(page.status, StatusCode::OK);
        assert_eq!(page.body["total"], 3, "term {}", term);
        assert_eq!(page.body["books"].as_array().unwrap().len(), 3);
    }

    let classics = app
        .get("/user/books?category=classics&sort=title", Some(&cookie))
        .await;
    let titles: Vec<&str> = classics.body["books"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Brave New World", "Emma", "Gone with the Wind"]);
}

#[tokio::test]
async fn test_book_detail_status() {
    let app = TestApp::new().await;
    let cookie = app.login("alice", "secret1").await;

    let dune = app.get("/user/book/2", Some(&cookie)).await;
    assert_eq!(dune.body["status_label"], "Limited");
    assert_eq!(dune.body["availability"], "3 of 10 copies available");

    let hobbit = app.get("/user/book/3", Some(&cookie)).await;
    assert_eq!(hobbit.body["status_label"], "Out of Stock");
    assert_eq!(hobbit.body["can_borrow"], false);
    assert_ne!(hobbit.body["estimated_available_date"], "Unknown");

    let missing = app.get("/user/book/404", Some(&cookie)).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.body["message"], "Book not found");
}

#[tokio::test]
async fn test_borrow_date_window() {
    let app = TestApp::new().await;
    let cookie = app.login("alice", "secret1").await;

    for days in [0, 8] {
        let rejected = app
            .post("/user/book/1/borrow", Some(&cookie), json!({ "return_date": in_days(days) }))
            .await;
        assert_eq!(rejected.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            rejected.body["message"],
            "Return date must be between tomorrow and 7 days from today"
        );
    }
    let missing = app.post("/user/book/1/borrow", Some(&cookie), json!({})).await;
    assert_eq!(missing.body["message"], "Please select a return date");
    assert_eq!(BackendState::count(&app.backend.borrow_calls), 0);

    for days in [1, 7] {
        let accepted = app
            .post("/user/book/1/borrow", Some(&cookie), json!({ "return_date": in_days(days) }))
            .await;
        assert_eq!(accepted.status, StatusCode::CREATED, "{}", accepted.body);
        assert_eq!(accepted.body["message"], "Successfully borrowed \"The Martian\"!");
    }
    assert_eq!(BackendState::count(&app.backend.borrow_calls), 2);

    let sent = app.backend.last_borrow.lock().unwrap().clone().unwrap();
    assert_eq!(sent["copyId"], 102);
    assert_eq!(sent["dueDate"], format!("{}T23:59:59.999Z", in_days(7)));
}

#[tokio::test]
async fn test_borrow_without_available_copy() {
    let app = TestApp::new().await;
    let cookie = app.login("alice", "secret1").await;

    let response = app
        .post("/user/book/3/borrow", Some(&cookie), json!({ "return_date": in_days(2) }))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "No available copies found");
    assert_eq!(BackendState::count(&app.backend.borrow_calls), 0);
}

#[tokio::test]
async fn test_reserve_window() {
    let app = TestApp::new().await;
    let cookie = app.login("alice", "secret1").await;

    for (start, end) in [(3, 3), (5, 3)] {
        let rejected = app
            .post(
                "/user/book/3/reserve",
                Some(&cookie),
                json!({ "start_date": in_days(start), "end_date": in_days(end) }),
            )
            .await;
        assert_eq!(rejected.status, StatusCode::BAD_REQUEST);
        assert_eq!(rejected.body["message"], "End date must be after start date");
    }
    assert_eq!(BackendState::count(&app.backend.reserve_calls), 0);

    let accepted = app
        .post(
            "/user/book/3/reserve",
            Some(&cookie),
            json!({ "start_date": in_days(3), "end_date": in_days(5) }),
        )
        .await;
    assert_eq!(accepted.status, StatusCode::CREATED);
    assert_eq!(accepted.body["reservation"]["status"], "PENDING");
    assert_eq!(accepted.body["reservation"]["book_author"], "J.R.R. Tolkien");
    assert_eq!(BackendState::count(&app.backend.reserve_calls), 1);
}

#[tokio::test]
async fn test_my_loans_display_status() {
    let app = TestApp::new().await;
    let cookie = app.login("alice", "secret1").await;

    let page = app.get("/user/my-loans", Some(&cookie)).await;
    assert_eq!(page.status, StatusCode::OK);
    assert_eq!(page.body["overdue"], 1);
    let labels: Vec<&str> = page.body["loans"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["status_label"].as_str().unwrap())
        .collect();
    assert_eq!(labels, vec!["Overdue", "Returned", "Active"]);
}

#[tokio::test]
async fn test_logout_clears_session_when_backend_fails() {
    let app = TestApp::new().await;
    let cookie = app.login("alice", "secret1").await;

    let response = app.request(Method::POST, "/logout", Some(&cookie), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["redirect_to"], "/login");
    assert_eq!(BackendState::count(&app.backend.logout_calls), 1);

    let session = app.get("/session", Some(&cookie)).await;
    assert_eq!(session.body["authenticated"], false);

    let page = app.get("/user/my-loans", Some(&cookie)).await;
    assert_eq!(page.status, StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_backend_401_clears_session() {
    let app = TestApp::new().await;
    let cookie = app.login("alice", "secret1").await;
    app.backend.revoke("token-alice");

    let response = app.get("/user/my-loans", Some(&cookie)).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/login"));
    assert!(response.cookie().unwrap().starts_with("library_session="));

    let session = app.get("/session", Some(&cookie)).await;
    assert_eq!(session.body["authenticated"], false);
}

#[tokio::test]
async fn test_register() {
    let app = TestApp::new().await;
    let form = json!({
        "name": "Carol Le",
        "email": "carol@example.com",
        "username": "carol",
        "password": "secret1",
        "confirm_password": "secret1",
        "phone": "0901234567"
    });

    let created = app.post("/register", None, form.clone()).await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(
        created.body["message"],
        "Registration successful! Please login with your credentials."
    );
    assert!(created.cookie().is_none());

    let mut mismatch = form.clone();
    mismatch["confirm_password"] = json!("other");
    let rejected = app.post("/register", None, mismatch).await;
    assert_eq!(rejected.status, StatusCode::BAD_REQUEST);
    assert_eq!(rejected.body["message"], "Passwords do not match");

    let mut taken = form;
    taken["username"] = json!("taken");
    let conflict = app.post("/register", None, taken).await;
    assert_eq!(conflict.status, StatusCode::CONFLICT);
    assert_eq!(conflict.body["message"], "Username already exists");
}

#[tokio::test]
async fn test_admin_return_is_handled_by_current_admin() {
    let app = TestApp::new().await;
    let admin = app.login("admin", "admin123").await;

    let lookup = app.get("/admin/returns/3", Some(&admin)).await;
    assert_eq!(lookup.status, StatusCode::OK);
    assert_eq!(lookup.body["returnable"], true);
    assert_eq!(lookup.body["loan"]["member_name"], "Alice Nguyen");

    let confirmed = app
        .request(Method::POST, "/admin/returns/3", Some(&admin), None)
        .await;
    assert_eq!(confirmed.status, StatusCode::OK);
    assert_eq!(confirmed.body["loan"]["status_label"], "Returned");

    let sent = app.backend.last_return.lock().unwrap().clone().unwrap();
    assert_eq!(sent, json!({ "handledBy": 99 }));
}

#[tokio::test]
async fn test_borrow_succeeds_when_book_reload_fails() {
    let app = TestApp::new().await;
    let cookie = app.login("alice", "secret1").await;
    // The lookup before the loan works, the reload after it does not
    *app.backend.busy_after_book_gets.lock().unwrap() = Some(1);

    let response = app
        .post("/user/book/1/borrow", Some(&cookie), json!({ "return_date": in_days(3) }))
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    assert_eq!(response.body["message"], "Successfully borrowed \"The Martian\"!");
    assert_eq!(response.body["book"]["book"]["title"], "The Martian");
    assert_eq!(BackendState::count(&app.backend.borrow_calls), 1);
    assert_eq!(BackendState::count(&app.backend.book_gets), 2);
}

#[tokio::test]
async fn test_reserve_message_names_the_book_on_the_page() {
    let app = TestApp::new().await;
    let cookie = app.login("alice", "secret1").await;

    // This reply carries no nested book
    let response = app
        .post(
            "/user/book/1/reserve",
            Some(&cookie),
            json!({ "start_date": in_days(1), "end_date": in_days(4) }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(
        response.body["message"],
        "Successfully reserved \"The Martian\"! You will be notified when available."
    );
    assert_eq!(response.body["reservation"]["id"], 20);
}

#[tokio::test]
async fn test_reservations_page_and_cancel() {
    let app = TestApp::new().await;
    let cookie = app.login("alice", "secret1").await;

    let page = app.get("/user/reservations", Some(&cookie)).await;
    assert_eq!(page.status, StatusCode::OK);
    assert_eq!(page.body["stats"], json!({ "total": 3, "pending": 1, "fulfilled": 1, "cancelled": 1 }));
    let pending = page.body["reservations"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["id"] == 10)
        .cloned()
        .unwrap();
    assert_eq!(pending["cancellable"], true);
    assert_eq!(pending["status_label"], "Pending");

    let one = app.get("/user/reservations/11", Some(&cookie)).await;
    assert_eq!(one.body["status_label"], "Fulfilled");
    assert_eq!(one.body["book_title"], "The Martian");

    // The backend answers 204 with no body
    let cancelled = app
        .request(Method::POST, "/user/reservations/10/cancel", Some(&cookie), None)
        .await;
    assert_eq!(cancelled.status, StatusCode::OK, "{}", cancelled.body);
    assert_eq!(cancelled.body["message"], "Reservation cancelled successfully!");
    assert_eq!(cancelled.body["reservations"]["stats"]["pending"], 0);
    assert_eq!(cancelled.body["reservations"]["stats"]["cancelled"], 2);
}

#[tokio::test]
async fn test_renew_reads_back_the_loan() {
    let app = TestApp::new().await;
    let cookie = app.login("alice", "secret1").await;

    let response = app
        .request(Method::POST, "/user/my-loans/3/renew", Some(&cookie), None)
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    assert_eq!(response.body["message"], "Loan renewed successfully");
    assert_eq!(response.body["loan"]["id"], 3);
    assert_eq!(response.body["loan"]["status_label"], "Active");
    assert_eq!(BackendState::count(&app.backend.renew_calls), 1);
}

#[tokio::test]
async fn test_admin_book_management() {
    let app = TestApp::new().await;
    let admin = app.login("admin", "admin123").await;

    let duplicate = app
        .post("/admin/catalog", Some(&admin), json!({ "title": "Dune Messiah", "genreIds": [1, 1] }))
        .await;
    assert_eq!(duplicate.status, StatusCode::BAD_REQUEST);
    assert_eq!(duplicate.body["message"], "Duplicate genre selection");
    assert_eq!(BackendState::count(&app.backend.book_writes), 0);

    let created = app
        .post("/admin/catalog", Some(&admin), json!({ "title": "  Dune Messiah ", "genreIds": [1] }))
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["title"], "Dune Messiah");
    let sent = app.backend.last_book_write.lock().unwrap().clone().unwrap();
    assert_eq!(sent["title"], "Dune Messiah");
    assert_eq!(sent["genreIds"], json!([1]));

    let updated = app
        .request(Method::PATCH, "/admin/catalog/2", Some(&admin), Some(json!({ "title": "Dune (1965)" })))
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["title"], "Dune (1965)");
    assert_eq!(updated.body["status"], "Limited");

    let deleted = app.request(Method::DELETE, "/admin/catalog/2", Some(&admin), None).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    assert_eq!(*app.backend.deleted.lock().unwrap(), vec!["/catalog/books/2".to_string()]);

    let member = app.login("alice", "secret1").await;
    let denied = app
        .post("/admin/catalog", Some(&member), json!({ "title": "Sneaky" }))
        .await;
    assert_eq!(denied.status, StatusCode::SEE_OTHER);
    assert_eq!(BackendState::count(&app.backend.book_writes), 1);
}

#[tokio::test]
async fn test_admin_member_management() {
    let app = TestApp::new().await;
    let admin = app.login("admin", "admin123").await;

    let list = app.get("/admin/members?category=suspended", Some(&admin)).await;
    assert_eq!(list.body["total"], 1);
    assert_eq!(list.body["members"][0]["name"], "Bob Tran");

    let updated = app
        .request(
            Method::PATCH,
            "/admin/members/2/status",
            Some(&admin),
            Some(json!({ "status": "active" })),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK, "{}", updated.body);
    assert_eq!(updated.body["message"], "Member status set to Active");
    assert_eq!(updated.body["member"]["status_label"], "Active");
    assert_eq!(
        *app.backend.last_member_status.lock().unwrap(),
        Some(json!({ "status": "ACTIVE" }))
    );

    let unknown = app
        .request(
            Method::PATCH,
            "/admin/members/2/status",
            Some(&admin),
            Some(json!({ "status": "FROZEN" })),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::BAD_REQUEST);
    assert_eq!(unknown.body["message"], "Unknown member status");

    let deleted = app.request(Method::DELETE, "/admin/members/2", Some(&admin), None).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    assert_eq!(*app.backend.deleted.lock().unwrap(), vec!["/members/2".to_string()]);
}

#[tokio::test]
async fn test_unreadable_form_bodies_are_inline_errors() {
    let app = TestApp::new().await;
    let cookie = app.login("alice", "secret1").await;

    let borrow = app
        .request(Method::POST, "/user/book/1/borrow", Some(&cookie), None)
        .await;
    assert_eq!(borrow.status, StatusCode::BAD_REQUEST);
    assert_eq!(borrow.body["code"], 4);
    assert!(borrow.body["message"].as_str().is_some_and(|m| !m.is_empty()));
    assert_eq!(BackendState::count(&app.backend.book_gets), 0);

    let login = app.request(Method::POST, "/login", None, None).await;
    assert_eq!(login.status, StatusCode::BAD_REQUEST);
    assert_eq!(login.body["error"], "BadValue");

    let register = app.post("/register", None, json!(["not", "a", "form"])).await;
    assert_eq!(register.status, StatusCode::BAD_REQUEST);
    assert_eq!(register.body["code"], 4);
}
