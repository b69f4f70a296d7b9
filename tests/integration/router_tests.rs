//! In-process router tests over the in-memory record store

use std::sync::OnceLock;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use book_catalog_server::{
    config::{AppConfig, StorageBackend, UserAccount},
    create_router,
    models::Role,
    repository::Repository,
    services::auth::hash_password,
    AppState,
};

fn password_hash() -> &'static str {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| hash_password("secret").expect("hash password"))
}

fn test_app() -> Router {
    let mut config = AppConfig::default();
    config.database.backend = StorageBackend::Memory;
    config.auth.jwt_secret = "router-test-secret".to_string();
    config.auth.users = vec![
        UserAccount {
            username: "admin".to_string(),
            password_hash: password_hash().to_string(),
            role: Role::Admin,
        },
        UserAccount {
            username: "clerk".to_string(),
            password_hash: password_hash().to_string(),
            role: Role::User,
        },
    ];
    create_router(AppState::new(config, Repository::in_memory()))
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.expect("router response")
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).expect("request")
}

fn get_with_cookie(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .expect("request")
}

fn form_request(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// Log in through the HTML form and return the `name=value` session cookie
async fn web_login(app: &Router, username: &str) -> String {
    let response = send(
        app,
        form_request(
            "/login",
            &format!("username={}&password=secret", username),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/books");

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("session cookie");
    assert!(set_cookie.contains("HttpOnly"));
    set_cookie
        .split(';')
        .next()
        .expect("cookie pair")
        .to_string()
}

async fn create_book(app: &Router, body: Value) -> Value {
    let response = send(app, json_request("POST", "/api/books", body)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

fn sample(vendor_code: &str, title: &str, brand: &str, year: i32) -> Value {
    json!({
        "vendorCode": vendor_code,
        "title": title,
        "brand": brand,
        "year": year,
    })
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = test_app();

    let response = send(&app, get("/api/health")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "healthy");

    let response = send(&app, get("/api/ready")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ready");
}

#[tokio::test]
async fn test_create_get_and_list_books() {
    let app = test_app();

    let created = create_book(
        &app,
        json!({
            "vendorCode": "VC-1",
            "title": "Dune",
            "brand": "Ace",
            "year": 1965,
            "stock": 4,
            "price": "9.99"
        }),
    )
    .await;
    let id = created["id"].as_i64().expect("id");
    assert_eq!(created["vendorCode"], "VC-1");
    assert_eq!(created["createdAt"], created["updatedAt"]);

    let response = send(&app, get(&format!("/api/books/{}", id))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let fetched = body_json(response).await;
    assert_eq!(fetched["title"], "Dune");
    assert_eq!(fetched["stock"], 4);

    let response = send(&app, get("/api/books")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let all = body_json(response).await;
    assert_eq!(all.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_get_missing_book_is_404() {
    let app = test_app();

    let response = send(&app, get("/api/books/42")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert!(body["message"].as_str().unwrap_or_default().contains("42"));
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_create_rejects_missing_required_fields() {
    let app = test_app();

    let response = send(
        &app,
        json_request("POST", "/api/books", json!({ "vendorCode": "VC-1", "year": 2000 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let message = body_json(response).await["message"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    assert!(message.contains("title"));
    assert!(message.contains("brand"));

    let response = send(&app, get("/api/books")).await;
    assert_eq!(body_json(response).await, json!([]));
}

#[tokio::test]
async fn test_duplicate_vendor_code_is_rejected() {
    let app = test_app();
    create_book(&app, sample("VC-1", "Dune", "Ace", 1965)).await;

    let response = send(
        &app,
        json_request("POST", "/api/books", sample("VC-1", "Emma", "Penguin", 1815)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap_or_default()
        .contains("already exists"));
    assert!(body["timestamp"].is_string());

    let response = send(&app, get("/api/books")).await;
    assert_eq!(body_json(response).await.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_partial_update_keeps_absent_fields() {
    let app = test_app();
    let created = create_book(
        &app,
        json!({
            "vendorCode": "VC-1",
            "title": "Dune",
            "brand": "Ace",
            "year": 1965,
            "stock": 4,
            "price": "9.99"
        }),
    )
    .await;
    let id = created["id"].as_i64().expect("id");

    let response = send(
        &app,
        json_request("PUT", &format!("/api/books/{}", id), json!({ "stock": 9 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await;
    assert_eq!(updated["stock"], 9);
    assert_eq!(updated["title"], "Dune");
    assert_eq!(updated["vendorCode"], "VC-1");
    assert_eq!(updated["price"], created["price"]);
    assert_eq!(updated["createdAt"], created["createdAt"]);

    // Re-submitting its own vendor code is not a conflict
    let response = send(
        &app,
        json_request(
            "PUT",
            &format!("/api/books/{}", id),
            json!({ "vendorCode": "VC-1", "title": "Dune Messiah" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["title"], "Dune Messiah");
}

#[tokio::test]
async fn test_update_conflict_and_missing() {
    let app = test_app();
    create_book(&app, sample("VC-1", "Dune", "Ace", 1965)).await;
    let second = create_book(&app, sample("VC-2", "Emma", "Penguin", 1815)).await;
    let id = second["id"].as_i64().expect("id");

    let response = send(
        &app,
        json_request("PUT", &format!("/api/books/{}", id), json!({ "vendorCode": "VC-1" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&app, get(&format!("/api/books/{}", id))).await;
    assert_eq!(body_json(response).await["vendorCode"], "VC-2");

    let response = send(
        &app,
        json_request("PUT", "/api/books/999", json!({ "title": "Ghost" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_book() {
    let app = test_app();
    let created = create_book(&app, sample("VC-1", "Dune", "Ace", 1965)).await;
    let uri = format!("/api/books/{}", created["id"]);

    let delete = || {
        Request::builder()
            .method("DELETE")
            .uri(&uri)
            .body(Body::empty())
            .expect("request")
    };

    let response = send(&app, delete()).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(&app, delete()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, get(&uri)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_search_filters_and_pagination() {
    let app = test_app();
    create_book(&app, sample("VC-1", "The Hobbit", "Allen & Unwin", 1937)).await;
    create_book(&app, sample("VC-2", "Dune", "Ace", 1965)).await;
    create_book(&app, sample("VC-3", "Hobbit Companion", "Ace", 1965)).await;
    create_book(&app, sample("VC-4", "Emma", "Penguin", 1815)).await;

    let response = send(&app, get("/api/books/search?title=hobbit")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_json(response).await;
    assert_eq!(page["total"], 2);
    assert_eq!(page["items"][0]["title"], "Hobbit Companion");
    assert_eq!(page["items"][1]["title"], "The Hobbit");

    let response = send(&app, get("/api/books/search?brand=ACE&year=1965")).await;
    assert_eq!(body_json(response).await["total"], 2);

    // Blank filters are ignored
    let response = send(&app, get("/api/books/search?title=&brand=&year=")).await;
    assert_eq!(body_json(response).await["total"], 4);

    let response = send(&app, get("/api/books/search?page=1&size=3")).await;
    let page = body_json(response).await;
    assert_eq!(page["total"], 4);
    assert_eq!(page["totalPages"], 2);
    assert_eq!(page["items"].as_array().map(Vec::len), Some(1));
    assert_eq!(page["items"][0]["title"], "The Hobbit");

    let response = send(&app, get("/api/books/search?size=0")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_vendor_code_availability() {
    let app = test_app();
    let created = create_book(&app, sample("VC-1", "Dune", "Ace", 1965)).await;

    let response = send(&app, get("/api/books/vendor-code-availability?vendorCode=VC-1")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["available"], false);

    let response = send(
        &app,
        get(&format!(
            "/api/books/vendor-code-availability?vendorCode=VC-1&excludeId={}",
            created["id"]
        )),
    )
    .await;
    assert_eq!(body_json(response).await["available"], true);

    let response = send(&app, get("/api/books/vendor-code-availability?vendorCode=VC-9")).await;
    assert_eq!(body_json(response).await["available"], true);
}

#[tokio::test]
async fn test_api_login_and_me() {
    let app = test_app();

    let response = send(&app, get("/api/auth/me")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/auth/login",
            json!({ "username": "clerk", "password": "wrong" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/auth/login",
            json!({ "username": "clerk", "password": "secret" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let login = body_json(response).await;
    assert_eq!(login["role"], "USER");
    let token = login["token"].as_str().expect("token").to_string();

    let request = Request::builder()
        .uri("/api/auth/me")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .expect("request");
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let me = body_json(response).await;
    assert_eq!(me["username"], "clerk");
    assert_eq!(me["role"], "USER");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = test_app();

    let response = send(&app, get("/api-docs/openapi.json")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let doc = body_json(response).await;
    assert!(doc["paths"]["/books/{id}"].is_object());
}

#[tokio::test]
async fn test_book_list_page_is_public() {
    let app = test_app();
    create_book(&app, sample("VC-1", "Dune", "Ace", 1965)).await;

    let response = send(&app, get("/")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/books");

    let response = send(&app, get("/books?title=dun")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Dune"));
    assert!(!html.contains("/books/new"));
    assert!(!html.contains("/books/edit/"));
}

#[tokio::test]
async fn test_anonymous_editing_redirects_to_login() {
    let app = test_app();

    for uri in ["/books/new", "/books/edit/1", "/books/delete/1"] {
        let response = send(&app, get(uri)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{}", uri);
        assert_eq!(location(&response), "/login", "{}", uri);
    }

    let response = send(
        &app,
        form_request("/books/save", "vendor_code=VC-1&title=T&brand=B&year=2000", None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_user_role_can_add_but_not_edit() {
    let app = test_app();
    let created = create_book(&app, sample("VC-1", "Dune", "Ace", 1965)).await;
    let cookie = web_login(&app, "clerk").await;

    let response = send(&app, get_with_cookie("/books/new", &cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, get_with_cookie("/books", &cookie)).await;
    let html = body_text(response).await;
    assert!(html.contains("/books/new"));
    assert!(!html.contains("/books/edit/"));

    let edit = format!("/books/edit/{}", created["id"]);
    let response = send(&app, get_with_cookie(&edit, &cookie)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let delete = format!("/books/delete/{}", created["id"]);
    let response = send(&app, get_with_cookie(&delete, &cookie)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(&app, get(&format!("/api/books/{}", created["id"]))).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_web_login_failure_rerenders_form() {
    let app = test_app();

    let response = send(
        &app,
        form_request("/login", "username=admin&password=nope", None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let html = body_text(response).await;
    assert!(html.contains("Invalid username or password"));
}

#[tokio::test]
async fn test_save_form_validation_and_success() {
    let app = test_app();
    create_book(&app, sample("VC-1", "Dune", "Ace", 1965)).await;
    let cookie = web_login(&app, "clerk").await;

    // Duplicate vendor code and a bad year are reported on the form
    let response = send(
        &app,
        form_request(
            "/books/save",
            "vendor_code=VC-1&title=Emma&brand=Penguin&year=abc",
            Some(&cookie),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("This vendor code already exists"));
    assert!(html.contains("must be a number"));
    assert!(html.contains("Emma"));

    let response = send(
        &app,
        form_request(
            "/books/save",
            "vendor_code=VC-2&title=Emma&brand=Penguin&year=1815&stock=&price=7.50",
            Some(&cookie),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/books");

    let response = send(&app, get("/api/books/search?title=emma")).await;
    let page = body_json(response).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["vendorCode"], "VC-2");
}

#[tokio::test]
async fn test_admin_edit_update_and_delete_pages() {
    let app = test_app();
    let first = create_book(&app, sample("VC-1", "Dune", "Ace", 1965)).await;
    let second = create_book(&app, sample("VC-2", "Emma", "Penguin", 1815)).await;
    let cookie = web_login(&app, "admin").await;

    let response = send(
        &app,
        get_with_cookie(&format!("/books/edit/{}", second["id"]), &cookie),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("VC-2"));

    // Taking another record's vendor code re-renders with the error
    let update_uri = format!("/books/update/{}", second["id"]);
    let response = send(
        &app,
        form_request(
            &update_uri,
            "vendor_code=VC-1&title=Emma&brand=Penguin&year=1815",
            Some(&cookie),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response)
        .await
        .contains("This vendor code already exists"));

    let response = send(
        &app,
        form_request(
            &update_uri,
            "vendor_code=VC-2&title=Emma&brand=Penguin&year=1816",
            Some(&cookie),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = send(&app, get(&format!("/api/books/{}", second["id"]))).await;
    assert_eq!(body_json(response).await["year"], 1816);

    let response = send(
        &app,
        get_with_cookie(&format!("/books/delete/{}", first["id"]), &cookie),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/books");

    let response = send(&app, get(&format!("/api/books/{}", first["id"]))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Missing records send the browser back to the list
    let response = send(&app, get_with_cookie("/books/edit/999", &cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/books");
}

#[tokio::test]
async fn test_logout_clears_session() {
    let app = test_app();
    let cookie = web_login(&app, "admin").await;

    let response = send(&app, form_request("/logout", "", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/books?logout");
    let cleared = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(cleared.starts_with("catalog_session="));

    let response = send(&app, get("/login?logout")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_search_page_index_overflow_is_rejected() {
    let app = test_app();
    create_book(&app, sample("VC-1", "Dune", "Ace", 1965)).await;

    let response = send(&app, get("/api/books/search?page=9223372036854775807")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["message"].is_string());

    let response = send(&app, get("/books?page=9223372036854775807")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_requests_use_error_body() {
    let app = test_app();

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/books",
            json!({ "vendorCode": "v", "title": "t", "brand": "b", "year": "nineteen" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["message"].as_str().unwrap_or_default().contains("year"));
    assert!(body["timestamp"].is_string());

    let request = Request::builder()
        .method("POST")
        .uri("/api/books")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .expect("request");
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["message"].is_string());

    let response = send(&app, get("/api/books/abc")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["message"].is_string());

    let response = send(&app, get("/api/books/search?page=first")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["message"].is_string());

    assert_eq!(body_json(send(&app, get("/api/books")).await).await, json!([]));
}

#[tokio::test]
async fn test_update_rejects_out_of_bounds_fields() {
    let app = test_app();
    let created = create_book(&app, sample("VC-1", "Dune", "Ace", 1965)).await;
    let uri = format!("/api/books/{}", created["id"]);

    for body in [
        json!({ "vendorCode": "" }),
        json!({ "vendorCode": "x".repeat(60) }),
        json!({ "title": "t".repeat(201) }),
        json!({ "brand": "   " }),
    ] {
        let response = send(&app, json_request("PUT", &uri, body.clone())).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", body);
        assert!(body_json(response).await["message"].is_string());
    }

    let response = send(&app, get(&uri)).await;
    let stored = body_json(response).await;
    assert_eq!(stored["vendorCode"], "VC-1");
    assert_eq!(stored["title"], "Dune");
    assert_eq!(stored["brand"], "Ace");
}

#[tokio::test]
async fn test_delete_by_form_post() {
    let app = test_app();
    let created = create_book(&app, sample("VC-1", "Dune", "Ace", 1965)).await;
    let delete_uri = format!("/books/delete/{}", created["id"]);

    let response = send(&app, form_request(&delete_uri, "", None)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");

    let clerk = web_login(&app, "clerk").await;
    let response = send(&app, form_request(&delete_uri, "", Some(&clerk))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let admin = web_login(&app, "admin").await;
    let html = body_text(send(&app, get_with_cookie("/books", &admin)).await).await;
    assert!(html.contains(&format!(r#"<form method="post" action="{}""#, delete_uri)));

    let response = send(&app, form_request(&delete_uri, "", Some(&admin))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/books");

    let response = send(&app, get(&format!("/api/books/{}", created["id"]))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
