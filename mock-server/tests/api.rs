use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, ProductCollection, TokenResponse, CLIENT_ID, CLIENT_SECRET, SERVER_TOKEN, UBERX_ID, USER_TOKEN, VALID_CODE};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn get(uri: &str, authorization: &str) -> Request<String> {
    Request::builder()
        .uri(uri)
        .header(http::header::AUTHORIZATION, authorization)
        .body(String::new())
        .unwrap()
}

fn json_request(method: &str, uri: &str, authorization: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::AUTHORIZATION, authorization)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn form_request(uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(body.to_string())
        .unwrap()
}

fn server() -> String {
    format!("Token {SERVER_TOKEN}")
}

fn user() -> String {
    format!("Bearer {USER_TOKEN}")
}

// --- auth ---

#[tokio::test]
async fn missing_authorization_is_401() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/v1.2/products?latitude=38.9&longitude=-77.0")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["code"], "unauthorized");
}

#[tokio::test]
async fn profile_rejects_server_token() {
    let resp = app().oneshot(get("/v1.2/me", &server())).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- products ---

#[tokio::test]
async fn products_at_serviceable_location() {
    let resp = app()
        .oneshot(get("/v1.2/products?latitude=38.897572&longitude=-77.036517", &server()))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let products: ProductCollection = body_json(resp).await;
    assert_eq!(products.products.len(), 3);
}

#[tokio::test]
async fn products_at_south_pole_is_empty() {
    let resp = app()
        .oneshot(get("/v1.2/products?latitude=-76.9512303&longitude=22.8350835", &server()))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let products: ProductCollection = body_json(resp).await;
    assert!(products.products.is_empty());
}

#[tokio::test]
async fn unknown_product_details_is_404() {
    let resp = app().oneshot(get("/v1.2/products/nope", &server())).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["code"], "not_found");
}

// --- estimates ---

#[tokio::test]
async fn price_estimate_rejects_large_seat_count() {
    let resp = app()
        .oneshot(get(
            "/v1.2/estimates/price?start_latitude=38.9&start_longitude=-77.0&end_latitude=38.8&end_longitude=-77.1&seat_count=3",
            &server(),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = body_json(resp).await;
    assert!(body["fields"]["seat_count"].is_string());
}

#[tokio::test]
async fn time_estimate_rejects_blank_product_id() {
    let resp = app()
        .oneshot(get(
            "/v1.2/estimates/time?start_latitude=38.9&start_longitude=-77.0&product_id=",
            &server(),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn time_estimate_filters_by_product() {
    let resp = app()
        .oneshot(get(
            &format!("/v1.2/estimates/time?start_latitude=38.9&start_longitude=-77.0&product_id={UBERX_ID}"),
            &server(),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["times"].as_array().unwrap().len(), 1);
}

// --- requests ---

#[tokio::test]
async fn create_request_with_invalid_product_is_422() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/v1.2/requests",
            &user(),
            r#"{"product_id":"bogus","start_latitude":"38.89757","start_longitude":"-77.03652","end_latitude":"38.88979","end_longitude":"-77.00818"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["code"], "validation_failed");
    assert_eq!(body["fields"]["product_id"], "Invalid product_id");
}

#[tokio::test]
async fn unknown_request_map_has_empty_body() {
    let resp = app().oneshot(get("/v1.2/requests/missing/map", &user())).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(body_bytes(resp).await.is_empty());
}

#[tokio::test]
async fn ride_lifecycle() {
    use tower::Service;

    let mut app = app().into_service();

    // create
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "POST",
            "/v1.2/requests",
            &user(),
            &format!(
                r#"{{"product_id":"{UBERX_ID}","start_latitude":"38.89757","start_longitude":"-77.03652","end_latitude":"38.88979","end_longitude":"-77.00818"}}"#
            ),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let created: serde_json::Value = body_json(resp).await;
    assert_eq!(created["status"], "processing");
    let id = created["request_id"].as_str().unwrap().to_string();

    // details
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get(&format!("/v1.2/requests/{id}"), &user()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let details: serde_json::Value = body_json(resp).await;
    assert_eq!(details["pickup"]["latitude"], 38.89757);

    // cancel
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("DELETE", &format!("/v1.2/requests/{id}"), &user(), ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    // details after cancel — 404
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get(&format!("/v1.2/requests/{id}"), &user()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- oauth ---

#[tokio::test]
async fn token_with_invalid_code_is_rejected() {
    let resp = app()
        .oneshot(form_request(
            "/oauth/token",
            &format!(
                "client_id={CLIENT_ID}&client_secret={CLIENT_SECRET}&grant_type=authorization_code&code=INVALID&redirect_uri=x"
            ),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn token_with_wrong_secret_is_401() {
    let resp = app()
        .oneshot(form_request(
            "/oauth/token",
            &format!("client_id={CLIENT_ID}&client_secret=wrong&grant_type=authorization_code&code={VALID_CODE}"),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn issued_token_authorizes_and_revokes() {
    use tower::Service;

    let mut app = app().into_service();

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(form_request(
            "/oauth/token",
            &format!(
                "client_id={CLIENT_ID}&client_secret={CLIENT_SECRET}&grant_type=authorization_code&code={VALID_CODE}&redirect_uri=x"
            ),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let token: TokenResponse = body_json(resp).await;
    assert_eq!(token.token_type, "Bearer");

    let bearer = format!("Bearer {}", token.access_token);
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get("/v1.2/me", &bearer))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let revoke_body = format!(
        "client_id={CLIENT_ID}&client_secret={CLIENT_SECRET}&token={}",
        token.access_token
    );
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(form_request("/oauth/revoke", &revoke_body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // second revoke of the same token is refused
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(form_request("/oauth/revoke", &revoke_body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get("/v1.2/me", &bearer))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
