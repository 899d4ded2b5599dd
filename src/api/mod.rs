//! API client module for communicating with the prediction backend.

mod client;

pub use client::{ApiClient, DEFAULT_API_BASE};
