//! HTTP middleware components.
//!
//! Middleware are functions that run before route handlers.
//! They can:
//! - Authenticate requests
//! - Log requests
//! - Modify request/response
//! - Short-circuit requests (reject unauthorized)
//!
//! The two credential checks here are deliberately separate middlewares
//! composed at the route layer: holding an issued API key never grants
//! access to the admin surface, and the admin secret never authenticates
//! as an organization.

/// API key authentication middleware
pub mod auth;
/// Administrator credential middleware for key management
pub mod admin;
