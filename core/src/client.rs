//! Authenticated client for the versioned rideshare REST API.
//!
//! # Design
//! `RideshareClient` fixes its base URL and its `Authorization` / `Accept`
//! headers at construction and keeps no other state, so one instance can
//! serve concurrent calls. Every operation is split in two:
//!
//! - `build_*` produces the `HttpRequest` (pure, no I/O);
//! - the operation method sends it through the transport and decodes the
//!   response into an `ApiResponse`.
//!
//! Optional string inputs are `Option<&str>`; `None`, empty and
//! whitespace-only values are all treated as absent and never reach the
//! query string or body.

use std::fmt;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::de::DeserializeOwned;
use url::form_urlencoded;

use crate::envelope::{self, ApiResponse};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::transport::{Transport, UreqTransport};
use crate::types::{
    AccessTokenKind, Coordinate, CreateRequestBody, PriceEstimateCollection, ProductCollection, Promotion,
    Request, RequestDetails, RequestMap, TimeEstimateCollection, UserActivity, UserProfile,
};

pub const PRODUCTION_BASE_URL: &str = "https://api.uber.com";
pub const SANDBOX_BASE_URL: &str = "https://sandbox-api.uber.com";

const API_VERSION: &str = "v1.2";
const DEFAULT_SEAT_COUNT: u32 = 2;

/// RFC 3986 `pchar`: unreserved, sub-delims, `:` and `@` stay literal.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=')
    .remove(b':')
    .remove(b'@');

/// Client for the rideshare API, authenticated with a server or user token.
#[derive(Clone)]
pub struct RideshareClient<T = UreqTransport> {
    base_url: String,
    kind: AccessTokenKind,
    headers: Vec<(String, String)>,
    transport: T,
}

impl RideshareClient<UreqTransport> {
    /// Creates a client using the default ureq transport.
    ///
    /// Fails with `ApiError::MissingParameter` when `token` or `base_url` is
    /// blank; no network activity happens here.
    pub fn new(kind: AccessTokenKind, token: &str, base_url: &str) -> Result<Self, ApiError> {
        Self::with_transport(kind, token, base_url, UreqTransport::new())
    }

    /// Server-token client against the production host.
    pub fn server(token: &str) -> Result<Self, ApiError> {
        Self::new(AccessTokenKind::Server, token, PRODUCTION_BASE_URL)
    }

    /// User-token client against the production host.
    pub fn user(token: &str) -> Result<Self, ApiError> {
        Self::new(AccessTokenKind::User, token, PRODUCTION_BASE_URL)
    }
}

impl<T: Transport> RideshareClient<T> {
    pub fn with_transport(
        kind: AccessTokenKind,
        token: &str,
        base_url: &str,
        transport: T,
    ) -> Result<Self, ApiError> {
        let token = require(token, "token")?;
        let base_url = require(base_url, "base_url")?;

        let headers = vec![
            ("authorization".to_string(), format!("{} {token}", kind.scheme())),
            ("accept".to_string(), "application/json".to_string()),
        ];

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            kind,
            headers,
            transport,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token_kind(&self) -> AccessTokenKind {
        self.kind
    }

    // -----------------------------------------------------------------------
    // Request builders
    // -----------------------------------------------------------------------

    pub fn build_products(&self, location: Coordinate) -> HttpRequest {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("latitude", &location.latitude.to_string())
            .append_pair("longitude", &location.longitude.to_string())
            .finish();
        self.request(HttpMethod::Get, format!("products?{query}"), None)
    }

    pub fn build_product_details(&self, product_id: &str) -> HttpRequest {
        self.request(HttpMethod::Get, format!("products/{}", segment(product_id)), None)
    }

    pub fn build_price_estimate(&self, start: Coordinate, end: Coordinate, seat_count: Option<u32>) -> HttpRequest {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("start_latitude", &start.latitude.to_string())
            .append_pair("start_longitude", &start.longitude.to_string())
            .append_pair("end_latitude", &end.latitude.to_string())
            .append_pair("end_longitude", &end.longitude.to_string())
            .append_pair("seat_count", &seat_count.unwrap_or(DEFAULT_SEAT_COUNT).to_string())
            .finish();
        self.request(HttpMethod::Get, format!("estimates/price?{query}"), None)
    }

    pub fn build_time_estimate(
        &self,
        start: Coordinate,
        customer_id: Option<&str>,
        product_id: Option<&str>,
    ) -> HttpRequest {
        let mut query = form_urlencoded::Serializer::new(String::new());
        query
            .append_pair("start_latitude", &start.latitude.to_string())
            .append_pair("start_longitude", &start.longitude.to_string());
        if let Some(customer_id) = non_blank(customer_id) {
            query.append_pair("customer_uuid", customer_id);
        }
        if let Some(product_id) = non_blank(product_id) {
            query.append_pair("product_id", product_id);
        }
        self.request(HttpMethod::Get, format!("estimates/time?{}", query.finish()), None)
    }

    pub fn build_create_request(
        &self,
        product_id: &str,
        start: Coordinate,
        end: Coordinate,
        surge_confirmation_id: Option<&str>,
    ) -> Result<HttpRequest, ApiError> {
        let body = CreateRequestBody {
            product_id,
            start_latitude: format_coordinate(start.latitude),
            start_longitude: format_coordinate(start.longitude),
            end_latitude: format_coordinate(end.latitude),
            end_longitude: format_coordinate(end.longitude),
            surge_confirmation_id: non_blank(surge_confirmation_id),
        };
        let body = serde_json::to_string(&body).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(self.request(HttpMethod::Post, "requests".to_string(), Some(body)))
    }

    pub fn build_request_details(&self, request_id: &str) -> HttpRequest {
        self.request(HttpMethod::Get, format!("requests/{}", segment(request_id)), None)
    }

    pub fn build_request_map(&self, request_id: &str) -> HttpRequest {
        self.request(HttpMethod::Get, format!("requests/{}/map", segment(request_id)), None)
    }

    pub fn build_cancel_request(&self, request_id: &str) -> HttpRequest {
        self.request(HttpMethod::Delete, format!("requests/{}", segment(request_id)), None)
    }

    pub fn build_promotion(&self, start: Coordinate, end: Coordinate) -> HttpRequest {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("start_latitude", &start.latitude.to_string())
            .append_pair("start_longitude", &start.longitude.to_string())
            .append_pair("end_latitude", &end.latitude.to_string())
            .append_pair("end_longitude", &end.longitude.to_string())
            .finish();
        self.request(HttpMethod::Get, format!("promotions?{query}"), None)
    }

    pub fn build_user_activity(&self, offset: u32, limit: u32) -> HttpRequest {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("offset", &offset.to_string())
            .append_pair("limit", &limit.to_string())
            .finish();
        self.request(HttpMethod::Get, format!("history?{query}"), None)
    }

    pub fn build_user_profile(&self) -> HttpRequest {
        self.request(HttpMethod::Get, "me".to_string(), None)
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Products available at a location. An unserviceable location yields an
    /// empty collection, not an error.
    pub fn products(&self, location: Coordinate) -> Result<ApiResponse<ProductCollection>, ApiError> {
        self.send(&self.build_products(location))
    }

    pub fn product_details(&self, product_id: &str) -> Result<ApiResponse<ProductCollection>, ApiError> {
        self.send(&self.build_product_details(product_id))
    }

    /// Price ranges per product. `seat_count` defaults to 2.
    pub fn price_estimate(
        &self,
        start: Coordinate,
        end: Coordinate,
        seat_count: Option<u32>,
    ) -> Result<ApiResponse<PriceEstimateCollection>, ApiError> {
        self.send(&self.build_price_estimate(start, end, seat_count))
    }

    /// Pickup ETAs per product, optionally narrowed to one product.
    pub fn time_estimate(
        &self,
        start: Coordinate,
        customer_id: Option<&str>,
        product_id: Option<&str>,
    ) -> Result<ApiResponse<TimeEstimateCollection>, ApiError> {
        self.send(&self.build_time_estimate(start, customer_id, product_id))
    }

    /// Requests a ride. Pass the id from a surge confirmation when the
    /// previous attempt was rejected for surge pricing.
    pub fn create_request(
        &self,
        product_id: &str,
        start: Coordinate,
        end: Coordinate,
        surge_confirmation_id: Option<&str>,
    ) -> Result<ApiResponse<Request>, ApiError> {
        let request = self.build_create_request(product_id, start, end, surge_confirmation_id)?;
        self.send(&request)
    }

    pub fn request_details(&self, request_id: &str) -> Result<ApiResponse<RequestDetails>, ApiError> {
        self.send(&self.build_request_details(request_id))
    }

    pub fn request_map(&self, request_id: &str) -> Result<ApiResponse<RequestMap>, ApiError> {
        self.send(&self.build_request_map(request_id))
    }

    /// Cancels a ride request. Success carries `true`; the body is ignored.
    pub fn cancel_request(&self, request_id: &str) -> Result<ApiResponse<bool>, ApiError> {
        let response = self.round_trip(&self.build_cancel_request(request_id))?;
        Ok(envelope::decode_flag(&response))
    }

    pub fn promotion(&self, start: Coordinate, end: Coordinate) -> Result<ApiResponse<Promotion>, ApiError> {
        self.send(&self.build_promotion(start, end))
    }

    pub fn user_activity(&self, offset: u32, limit: u32) -> Result<ApiResponse<UserActivity>, ApiError> {
        self.send(&self.build_user_activity(offset, limit))
    }

    pub fn user_profile(&self) -> Result<ApiResponse<UserProfile>, ApiError> {
        self.send(&self.build_user_profile())
    }

    // -----------------------------------------------------------------------
    // Execution
    // -----------------------------------------------------------------------

    fn request(&self, method: HttpMethod, resource: String, body: Option<String>) -> HttpRequest {
        let mut headers = self.headers.clone();
        if body.is_some() {
            headers.push(("content-type".to_string(), "application/json".to_string()));
        }
        HttpRequest {
            method,
            url: format!("{}/{API_VERSION}/{resource}", self.base_url),
            headers,
            body,
        }
    }

    fn send<R: DeserializeOwned>(&self, request: &HttpRequest) -> Result<ApiResponse<R>, ApiError> {
        let response = self.round_trip(request)?;
        envelope::decode(&response)
    }

    fn round_trip(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        tracing::debug!(method = %request.method, url = %request.url, "sending api request");
        let response = self.transport.execute(request)?;
        if response.is_success() {
            tracing::debug!(status = response.status, url = %request.url, "api request succeeded");
        } else {
            tracing::warn!(status = response.status, url = %request.url, "api request failed");
        }
        Ok(response)
    }
}

impl<T> fmt::Debug for RideshareClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RideshareClient")
            .field("base_url", &self.base_url)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Coordinates in request bodies always carry exactly five decimals.
fn format_coordinate(value: f64) -> String {
    format!("{value:.5}")
}

/// Ids are opaque; a `/`, `?` or `#` inside one must not change the route.
fn segment(id: &str) -> String {
    utf8_percent_encode(id, PATH_SEGMENT).to_string()
}

/// Treat empty and whitespace-only strings as absent.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

pub(crate) fn require<'a>(value: &'a str, name: &'static str) -> Result<&'a str, ApiError> {
    non_blank(Some(value)).ok_or(ApiError::MissingParameter(name))
}
