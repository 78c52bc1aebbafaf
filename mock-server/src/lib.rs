//! In-process fake of the rideshare API and its OAuth login host.
//!
//! Serves the `v1.2` resources plus `/oauth/token` and `/oauth/revoke` with
//! fixture data. The DTOs here are defined independently of the client crate
//! so the integration tests catch schema drift.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use axum::{
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const SERVER_TOKEN: &str = "server-token";
pub const USER_TOKEN: &str = "user-token";
pub const CLIENT_ID: &str = "client-id";
pub const CLIENT_SECRET: &str = "client-secret";
pub const VALID_CODE: &str = "valid-code";

pub const UBERX_ID: &str = "a1111c8c-c720-46c3-8534-2fcdd730040d";
pub const UBERXL_ID: &str = "821415d8-3bd5-4e27-9604-194e4359a449";
/// Product that always has surge pricing in effect.
pub const BLACK_ID: &str = "d4abaae7-f4d6-4152-91cc-77523e8165a4";

const SURGE_MULTIPLIER: f64 = 1.5;
const MAX_SERVICE_LATITUDE: f64 = 70.0;
const MAX_HISTORY_LIMIT: u32 = 50;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<HashMap<String, String>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Product {
    pub product_id: String,
    pub display_name: String,
    pub description: String,
    pub capacity: u32,
    pub image: String,
    pub shared: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProductCollection {
    pub products: Vec<Product>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ride {
    pub request_id: String,
    pub product_id: String,
    pub status: String,
    pub eta: u32,
    pub surge_multiplier: f64,
    pub pickup: Point,
    pub destination: Point,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Point {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub refresh_token: String,
    pub scope: String,
}

#[derive(Default)]
pub struct MockState {
    rides: RwLock<HashMap<String, Ride>>,
    access_tokens: RwLock<HashSet<String>>,
    refresh_tokens: RwLock<HashSet<String>>,
}

pub type Db = Arc<MockState>;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorBody>)>;

fn failure(status: StatusCode, code: &str, message: &str) -> (StatusCode, Json<ErrorBody>) {
    (
        status,
        Json(ErrorBody {
            message: message.to_string(),
            code: code.to_string(),
            fields: None,
        }),
    )
}

fn field_failure(field: &str, message: &str) -> (StatusCode, Json<ErrorBody>) {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ErrorBody {
            message: "Invalid request".to_string(),
            code: "validation_failed".to_string(),
            fields: Some(HashMap::from([(field.to_string(), message.to_string())])),
        }),
    )
}

pub fn app() -> Router {
    let db: Db = Arc::new(MockState::default());
    Router::new()
        .route("/v1.2/products", get(list_products))
        .route("/v1.2/products/{product_id}", get(product_details))
        .route("/v1.2/estimates/price", get(price_estimate))
        .route("/v1.2/estimates/time", get(time_estimate))
        .route("/v1.2/requests", post(create_request))
        .route("/v1.2/requests/{request_id}", get(request_details).delete(cancel_request))
        .route("/v1.2/requests/{request_id}/map", get(request_map))
        .route("/v1.2/promotions", get(promotion))
        .route("/v1.2/history", get(history))
        .route("/v1.2/me", get(me))
        .route("/oauth/token", post(token))
        .route("/oauth/revoke", post(revoke))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn catalog() -> Vec<Product> {
    [
        (UBERX_ID, "uberX", "The low-cost Uber", 4),
        (UBERXL_ID, "uberXL", "Low-cost rides for large groups", 6),
        (BLACK_ID, "UberBLACK", "The original Uber", 4),
    ]
    .into_iter()
    .map(|(id, name, description, capacity)| Product {
        product_id: id.to_string(),
        display_name: name.to_string(),
        description: description.to_string(),
        capacity,
        image: format!("https://d1a3f4spazzrp4.cloudfront.net/car-types/{}.png", name.to_lowercase()),
        shared: false,
    })
    .collect()
}

fn find_product(product_id: &str) -> Option<Product> {
    catalog().into_iter().find(|p| p.product_id == product_id)
}

fn serviceable(latitude: f64) -> bool {
    latitude.abs() <= MAX_SERVICE_LATITUDE
}

fn surge_for(product_id: &str) -> f64 {
    if product_id == BLACK_ID {
        SURGE_MULTIPLIER
    } else {
        1.0
    }
}

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

async fn authenticate(db: &Db, headers: &HeaderMap, user_only: bool) -> Result<(), (StatusCode, Json<ErrorBody>)> {
    let unauthorized = || failure(StatusCode::UNAUTHORIZED, "unauthorized", "Invalid OAuth 2.0 credentials provided.");
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(unauthorized)?;

    if let Some(token) = value.strip_prefix("Bearer ") {
        if token == USER_TOKEN || db.access_tokens.read().await.contains(token) {
            return Ok(());
        }
        return Err(unauthorized());
    }
    if let Some(token) = value.strip_prefix("Token ") {
        if token != SERVER_TOKEN {
            return Err(unauthorized());
        }
        if user_only {
            return Err(failure(
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "This endpoint requires a user access token.",
            ));
        }
        return Ok(());
    }
    Err(unauthorized())
}

// ---------------------------------------------------------------------------
// Products and estimates
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct LocationQuery {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Deserialize)]
pub struct TripQuery {
    pub start_latitude: f64,
    pub start_longitude: f64,
    pub end_latitude: f64,
    pub end_longitude: f64,
    pub seat_count: Option<u32>,
}

#[derive(Deserialize)]
pub struct TimeQuery {
    pub start_latitude: f64,
    pub start_longitude: f64,
    pub customer_uuid: Option<String>,
    pub product_id: Option<String>,
}

async fn list_products(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(query): Query<LocationQuery>,
) -> ApiResult<ProductCollection> {
    authenticate(&db, &headers, false).await?;
    let products = if serviceable(query.latitude) { catalog() } else { Vec::new() };
    Ok(Json(ProductCollection { products }))
}

async fn product_details(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(product_id): Path<String>,
) -> ApiResult<ProductCollection> {
    authenticate(&db, &headers, false).await?;
    let product = find_product(&product_id)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "not_found", "Product not found."))?;
    Ok(Json(ProductCollection { products: vec![product] }))
}

async fn price_estimate(State(db): State<Db>, headers: HeaderMap, Query(query): Query<TripQuery>) -> ApiResult<Value> {
    authenticate(&db, &headers, false).await?;
    let seat_count = query.seat_count.unwrap_or(2);
    if !(1..=2).contains(&seat_count) {
        return Err(field_failure("seat_count", "seat_count must be 1 or 2"));
    }
    if !serviceable(query.start_latitude) {
        return Ok(Json(json!({ "prices": [] })));
    }

    // Rough flat-earth distance in miles, good enough for fixtures.
    let distance = ((query.end_latitude - query.start_latitude).powi(2)
        + (query.end_longitude - query.start_longitude).powi(2))
    .sqrt()
        * 69.0;
    let prices: Vec<Value> = catalog()
        .into_iter()
        .map(|p| {
            let surge = surge_for(&p.product_id);
            let low = (2.5 + distance * 1.5) * surge;
            json!({
                "product_id": p.product_id,
                "display_name": p.display_name,
                "localized_display_name": p.display_name,
                "distance": distance,
                "duration": (distance * 180.0) as u32,
                "estimate": format!("${:.0}-{:.0}", low, low + 4.0),
                "currency_code": "USD",
                "low_estimate": low.floor(),
                "high_estimate": (low + 4.0).ceil(),
                "minimum": 5.0,
                "surge_multiplier": surge,
            })
        })
        .collect();
    Ok(Json(json!({ "prices": prices })))
}

async fn time_estimate(State(db): State<Db>, headers: HeaderMap, Query(query): Query<TimeQuery>) -> ApiResult<Value> {
    authenticate(&db, &headers, false).await?;
    if query.customer_uuid.as_deref().is_some_and(|v| v.trim().is_empty()) {
        return Err(field_failure("customer_uuid", "customer_uuid must not be blank"));
    }
    if query.product_id.as_deref().is_some_and(|v| v.trim().is_empty()) {
        return Err(field_failure("product_id", "product_id must not be blank"));
    }
    if !serviceable(query.start_latitude) {
        return Ok(Json(json!({ "times": [] })));
    }

    let times: Vec<Value> = catalog()
        .into_iter()
        .filter(|p| query.product_id.as_deref().map_or(true, |id| id == p.product_id))
        .enumerate()
        .map(|(i, p)| {
            json!({
                "product_id": p.product_id,
                "display_name": p.display_name,
                "localized_display_name": p.display_name,
                "estimate": 180 + 60 * i as u32,
            })
        })
        .collect();
    Ok(Json(json!({ "times": times })))
}

// ---------------------------------------------------------------------------
// Ride requests
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct CreateRide {
    pub product_id: String,
    pub start_latitude: String,
    pub start_longitude: String,
    pub end_latitude: String,
    pub end_longitude: String,
    pub surge_confirmation_id: Option<String>,
}

fn parse_coordinate(field: &str, raw: &str) -> Result<f64, (StatusCode, Json<ErrorBody>)> {
    raw.parse()
        .map_err(|_| field_failure(field, "coordinate must be a decimal number"))
}

async fn create_request(State(db): State<Db>, headers: HeaderMap, Json(input): Json<CreateRide>) -> ApiResult<Value> {
    authenticate(&db, &headers, true).await?;
    let product =
        find_product(&input.product_id).ok_or_else(|| field_failure("product_id", "Invalid product_id"))?;

    let pickup = Point {
        latitude: parse_coordinate("start_latitude", &input.start_latitude)?,
        longitude: parse_coordinate("start_longitude", &input.start_longitude)?,
    };
    let destination = Point {
        latitude: parse_coordinate("end_latitude", &input.end_latitude)?,
        longitude: parse_coordinate("end_longitude", &input.end_longitude)?,
    };

    let surge = surge_for(&product.product_id);
    if surge > 1.0 && input.surge_confirmation_id.is_none() {
        return Err(failure(
            StatusCode::CONFLICT,
            "surge",
            "Surge pricing is currently in effect for this product.",
        ));
    }

    let ride = Ride {
        request_id: Uuid::new_v4().to_string(),
        product_id: product.product_id,
        status: "processing".to_string(),
        eta: 5,
        surge_multiplier: surge,
        pickup,
        destination,
    };
    db.rides.write().await.insert(ride.request_id.clone(), ride.clone());

    Ok(Json(json!({
        "request_id": ride.request_id,
        "product_id": ride.product_id,
        "status": ride.status,
        "eta": ride.eta,
        "surge_multiplier": ride.surge_multiplier,
    })))
}

async fn request_details(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(request_id): Path<String>,
) -> ApiResult<Value> {
    authenticate(&db, &headers, true).await?;
    let rides = db.rides.read().await;
    let ride = rides
        .get(&request_id)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "not_found", "Request not found."))?;
    Ok(Json(json!({
        "request_id": ride.request_id,
        "product_id": ride.product_id,
        "status": ride.status,
        "eta": ride.eta,
        "surge_multiplier": ride.surge_multiplier,
        "pickup": ride.pickup,
        "destination": ride.destination,
        "shared": false,
    })))
}

async fn request_map(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(request_id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    authenticate(&db, &headers, true)
        .await
        .map_err(|(status, _)| status)?;
    let rides = db.rides.read().await;
    // Unknown rides answer with a bare status and no error document.
    let ride = rides.get(&request_id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(json!({
        "request_id": ride.request_id,
        "href": format!("https://trip.uber.com/abc123/{}", ride.request_id),
    })))
}

async fn cancel_request(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(request_id): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<ErrorBody>)> {
    authenticate(&db, &headers, true).await?;
    db.rides
        .write()
        .await
        .remove(&request_id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "not_found", "Request not found."))
}

// ---------------------------------------------------------------------------
// Promotions and riders
// ---------------------------------------------------------------------------

async fn promotion(State(db): State<Db>, headers: HeaderMap, Query(_query): Query<TripQuery>) -> ApiResult<Value> {
    authenticate(&db, &headers, false).await?;
    Ok(Json(json!({
        "display_text": "Free ride up to $30",
        "localized_value": "$30",
        "type": "trip_credit",
    })))
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub offset: u32,
    pub limit: u32,
}

async fn history(State(db): State<Db>, headers: HeaderMap, Query(query): Query<HistoryQuery>) -> ApiResult<Value> {
    authenticate(&db, &headers, true).await?;
    if query.limit > MAX_HISTORY_LIMIT {
        return Err(field_failure("limit", "limit must be at most 50"));
    }

    let trips: Vec<Value> = (0..3u32)
        .map(|i| {
            json!({
                "request_id": format!("trip-{i}"),
                "product_id": UBERX_ID,
                "status": "completed",
                "distance": 1.5 + f64::from(i),
                "request_time": 1_428_876_188 + i64::from(i) * 86_400,
                "start_time": 1_428_876_374 + i64::from(i) * 86_400,
                "end_time": 1_428_876_927 + i64::from(i) * 86_400,
                "start_city": {
                    "display_name": "Washington D.C.",
                    "latitude": 38.9072,
                    "longitude": -77.0369,
                },
            })
        })
        .collect();
    let count = trips.len();
    let page: Vec<Value> = trips
        .into_iter()
        .skip(query.offset as usize)
        .take(query.limit as usize)
        .collect();

    Ok(Json(json!({
        "offset": query.offset,
        "limit": query.limit,
        "count": count,
        "history": page,
    })))
}

async fn me(State(db): State<Db>, headers: HeaderMap) -> ApiResult<Value> {
    authenticate(&db, &headers, true).await?;
    Ok(Json(json!({
        "uuid": "f4a416e3-6016-4623-8ec9-d5ee105a6e27",
        "rider_id": "8OlTlUG1TyeAQf1JiBZZdkKxuSSOUwu2IkO0Hf9d2HV52Pm25A0NvsbmbnZr85tLVi-s8CckpBK8Eq0Nke4X-no3AcSHfeVh6J5O6LiQt5LsBZDSi4qyVUdSLeYDnTtirw==",
        "first_name": "Uber",
        "last_name": "Developer",
        "email": "developer@uber.com",
        "picture": "https://d1w2poirtb3as9.cloudfront.net/profile.jpeg",
        "promo_code": "teypo",
        "mobile_verified": true,
    })))
}

// ---------------------------------------------------------------------------
// OAuth
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct TokenForm {
    pub client_id: String,
    pub client_secret: String,
    pub grant_type: String,
    pub code: Option<String>,
    pub refresh_token: Option<String>,
    pub redirect_uri: Option<String>,
}

#[derive(Deserialize)]
pub struct RevokeForm {
    pub client_id: String,
    pub client_secret: String,
    pub token: String,
}

fn oauth_failure(status: StatusCode, error: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "error": error })))
}

async fn issue_token(db: &Db) -> TokenResponse {
    let token = TokenResponse {
        access_token: format!("access-{}", Uuid::new_v4()),
        token_type: "Bearer".to_string(),
        expires_in: 2_592_000,
        refresh_token: format!("refresh-{}", Uuid::new_v4()),
        scope: "profile history request".to_string(),
    };
    db.access_tokens.write().await.insert(token.access_token.clone());
    db.refresh_tokens.write().await.insert(token.refresh_token.clone());
    token
}

async fn token(State(db): State<Db>, Form(form): Form<TokenForm>) -> Result<Json<TokenResponse>, (StatusCode, Json<Value>)> {
    if form.client_id != CLIENT_ID || form.client_secret != CLIENT_SECRET {
        return Err(oauth_failure(StatusCode::UNAUTHORIZED, "invalid_client"));
    }
    let invalid_grant = || oauth_failure(StatusCode::BAD_REQUEST, "invalid_grant");

    match form.grant_type.as_str() {
        "authorization_code" => {
            if form.code.as_deref() != Some(VALID_CODE) || form.redirect_uri.is_none() {
                return Err(invalid_grant());
            }
        }
        "refresh_token" => {
            let presented = form.refresh_token.ok_or_else(invalid_grant)?;
            if !db.refresh_tokens.write().await.remove(&presented) {
                return Err(invalid_grant());
            }
        }
        _ => return Err(oauth_failure(StatusCode::BAD_REQUEST, "unsupported_grant_type")),
    }
    Ok(Json(issue_token(&db).await))
}

async fn revoke(State(db): State<Db>, Form(form): Form<RevokeForm>) -> StatusCode {
    if form.client_id != CLIENT_ID || form.client_secret != CLIENT_SECRET {
        return StatusCode::UNAUTHORIZED;
    }
    if db.access_tokens.write().await.remove(&form.token) {
        StatusCode::OK
    } else {
        StatusCode::UNAUTHORIZED
    }
}
