//! Data models representing database entities.
//!
//! This module contains all data structures that map to database tables.

/// API key record and key-management request/response types
pub mod api_key;
