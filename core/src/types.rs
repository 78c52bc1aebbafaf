//! Domain DTOs for the rideshare API.
//!
//! # Design
//! Every record maps the service's snake_case JSON field names one to one.
//! Fields the service may leave out are `Option` (or default to an empty
//! list) so a sparse response still decodes. Collections keep their named
//! wrapper object (`products`, `prices`, `times`, `history`) because that
//! wrapper is part of the wire contract.

use serde::{Deserialize, Serialize};

/// Which kind of credential a client authenticates with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessTokenKind {
    /// Static application credential, sent as `Authorization: Token <t>`.
    Server,
    /// OAuth2 user credential, sent as `Authorization: Bearer <t>`.
    User,
}

impl AccessTokenKind {
    /// The authorization scheme used in the `Authorization` header.
    pub fn scheme(self) -> &'static str {
        match self {
            AccessTokenKind::Server => "Token",
            AccessTokenKind::User => "Bearer",
        }
    }
}

/// A geographic point used as an operation input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

// ---------------------------------------------------------------------------
// OAuth
// ---------------------------------------------------------------------------

/// Token issued by the authorization server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessToken {
    #[serde(rename = "access_token")]
    pub value: String,
    pub token_type: String,
    /// Lifetime in seconds. Informational only; nothing refreshes on expiry.
    pub expires_in: i64,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub scope: String,
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub product_id: String,
    pub display_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub shared: Option<bool>,
    #[serde(default)]
    pub price_details: Option<PriceDetails>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductCollection {
    pub products: Vec<Product>,
}

/// Fare structure of a product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceDetails {
    #[serde(default)]
    pub base: Option<f64>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub cost_per_minute: Option<f64>,
    #[serde(default)]
    pub cost_per_distance: Option<f64>,
    #[serde(default)]
    pub distance_unit: Option<String>,
    #[serde(default)]
    pub cancellation_fee: Option<f64>,
    #[serde(default)]
    pub currency_code: Option<String>,
    #[serde(default)]
    pub service_fees: Vec<ServiceFee>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceFee {
    pub name: String,
    pub fee: f64,
}

// ---------------------------------------------------------------------------
// Estimates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceEstimate {
    pub product_id: String,
    pub display_name: String,
    #[serde(default)]
    pub localized_display_name: Option<String>,
    #[serde(default)]
    pub distance: Option<f64>,
    /// Expected trip duration in seconds.
    #[serde(default)]
    pub duration: Option<u32>,
    /// Formatted estimate, e.g. `"$13-17"`.
    #[serde(default)]
    pub estimate: Option<String>,
    #[serde(default)]
    pub currency_code: Option<String>,
    #[serde(default)]
    pub low_estimate: Option<f64>,
    #[serde(default)]
    pub high_estimate: Option<f64>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub surge_multiplier: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceEstimateCollection {
    pub prices: Vec<PriceEstimate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeEstimate {
    pub product_id: String,
    pub display_name: String,
    #[serde(default)]
    pub localized_display_name: Option<String>,
    /// Pickup ETA in seconds.
    pub estimate: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeEstimateCollection {
    pub times: Vec<TimeEstimate>,
}

// ---------------------------------------------------------------------------
// Promotions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Promotion {
    pub display_text: String,
    #[serde(default)]
    pub localized_value: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromotionApplied {
    pub promotion_code: String,
    #[serde(default)]
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// Ride requests
// ---------------------------------------------------------------------------

/// Response to a newly created ride request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Request {
    pub request_id: String,
    pub status: String,
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub vehicle: Option<Vehicle>,
    #[serde(default)]
    pub driver: Option<Driver>,
    #[serde(default)]
    pub location: Option<Location>,
    /// Minutes until pickup.
    #[serde(default)]
    pub eta: Option<u32>,
    #[serde(default)]
    pub surge_multiplier: Option<f64>,
}

/// Current state of an existing ride request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestDetails {
    pub request_id: String,
    pub status: String,
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub vehicle: Option<Vehicle>,
    #[serde(default)]
    pub driver: Option<Driver>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub pickup: Option<Location>,
    #[serde(default)]
    pub destination: Option<Location>,
    #[serde(default)]
    pub eta: Option<u32>,
    #[serde(default)]
    pub surge_multiplier: Option<f64>,
    #[serde(default)]
    pub shared: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Vehicle {
    pub make: String,
    pub model: String,
    pub license_plate: String,
    #[serde(default)]
    pub picture_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Driver {
    pub name: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub picture_url: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub bearing: Option<i32>,
    #[serde(default)]
    pub eta: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestMap {
    pub request_id: String,
    pub href: String,
}

/// JSON body of a ride request. Coordinates are pre-formatted strings with
/// exactly five decimals.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct CreateRequestBody<'a> {
    pub product_id: &'a str,
    pub start_latitude: String,
    pub start_longitude: String,
    pub end_latitude: String,
    pub end_longitude: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surge_confirmation_id: Option<&'a str>,
}

// ---------------------------------------------------------------------------
// Riders
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub uuid: String,
    #[serde(default)]
    pub rider_id: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub promo_code: Option<String>,
    #[serde(default)]
    pub mobile_verified: bool,
}

/// One page of the rider's trip history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserActivity {
    pub offset: u32,
    pub limit: u32,
    pub count: u32,
    #[serde(default)]
    pub history: Vec<UserHistory>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserHistory {
    pub request_id: String,
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub distance: Option<f64>,
    /// Unix timestamps in seconds.
    #[serde(default)]
    pub request_time: Option<i64>,
    #[serde(default)]
    pub start_time: Option<i64>,
    #[serde(default)]
    pub end_time: Option<i64>,
    #[serde(default)]
    pub start_city: Option<City>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct City {
    pub display_name: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}
