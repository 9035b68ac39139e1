//! vetdesk-core - client library for the clinic and store management API.
//!
//! The centrepiece is `api::ApiClient`, which attaches the session's access
//! token to every request and transparently refreshes it once when a call
//! comes back 401. Everything else builds on it:
//!
//! - `auth`: explicit `Session` over injectable token storage, session events
//!   for the application shell, and permission checks on the current user
//! - `api`: the client, typed resource calls, and `ApiError`
//! - `import`: CSV bulk import and staged exam attachment upload
//! - `models`: records exchanged with the API
//! - `config`: endpoint, timeout and storage configuration
//! - `utils`: display formatting helpers

pub mod api;
pub mod auth;
pub mod config;
pub mod import;
pub mod models;
pub mod utils;

pub use api::{ApiClient, ApiError};
pub use auth::{Session, SessionEvent};
pub use config::Config;
