//! REST API client module for the clinic management backend.
//!
//! This module provides the `ApiClient` for communicating with the API:
//! authentication, transparent token refresh, and typed calls for each
//! resource (products, inventory, sales, deliveries, users, tutors, exams).
//!
//! The API uses bearer token authentication. Access tokens are short lived
//! and are rotated through `/auth/refresh` when a call comes back 401.

pub mod client;
pub mod error;
pub mod request;
pub mod services;

pub use client::{ApiClient, LoginResponse};
pub use error::ApiError;
pub use request::{MultipartField, PendingRequest, RequestBody};
