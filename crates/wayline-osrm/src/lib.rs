//! OSRM routing engine for wayline sessions.

pub mod client;

pub use client::{OsrmClient, DEFAULT_BASE_URL, DEFAULT_PROFILE};
