//! Authentication module for managing the token session.
//!
//! This module provides:
//! - `Session`: explicit session handle holding the access/refresh token pair
//!   and broadcasting `SessionEvent`s to the application shell
//! - `TokenStorage`: injectable storage backends (memory, JSON file, keychain)
//! - `CurrentUser`: the logged-in account with role/permission checks

pub mod session;
pub mod storage;
pub mod user;

pub use session::{Session, SessionEvent, TokenPair, ACCESS_TOKEN_KEY, LOGIN_ROUTE, REFRESH_TOKEN_KEY};
pub use storage::{FileStorage, KeyringStorage, MemoryStorage, StorageError, TokenStorage};
pub use user::CurrentUser;
