//! Client library for the rideshare REST API.
//!
//! # Overview
//! [`RideshareClient`] calls the versioned API (products, estimates, ride
//! requests, promotions, rider profile and history) with a server or user
//! token and returns every result as an [`ApiResponse`]: either the decoded
//! data or the service's [`ErrorInfo`]. [`OAuthClient`] obtains, refreshes
//! and revokes the user tokens the API client is constructed with.
//!
//! # Design
//! - Requests and responses are plain data ([`HttpRequest`],
//!   [`HttpResponse`]); each operation has a pure `build_*` counterpart.
//! - Network I/O goes through the [`Transport`] trait. [`UreqTransport`] is
//!   the default and shares one connection pool across threads.
//! - Remote failures are values, not errors. [`ApiError`] covers only bad
//!   construction arguments, transport failures and malformed success bodies.

pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod http;
pub mod oauth;
pub mod transport;
pub mod types;

pub use client::{RideshareClient, PRODUCTION_BASE_URL, SANDBOX_BASE_URL};
pub use config::ClientConfig;
pub use envelope::{ApiResponse, ErrorInfo};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use oauth::{OAuthClient, DEFAULT_AUTH_URL};
pub use transport::{Transport, UreqTransport};
pub use types::{
    AccessToken, AccessTokenKind, City, Coordinate, Driver, Location, PriceDetails, PriceEstimate,
    PriceEstimateCollection, Product, ProductCollection, Promotion, PromotionApplied, Request, RequestDetails,
    RequestMap, ServiceFee, TimeEstimate, TimeEstimateCollection, UserActivity, UserHistory, UserProfile, Vehicle,
};
