//! Client for the backend's authentication endpoints.
//!
//! One request per call. Failures are returned to the caller as
//! [`ApiError`](crate::error::ApiError); nothing is retried or cached.

mod client;
mod transport;
mod types;

pub use client::AuthClient;
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Method, ReqwestTransport};
pub use types::{LoginRequest, ProfileUpdate, Token};
