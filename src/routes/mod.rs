//! Router Module Index
//!
//! Splits the routing into a public and an authenticated module so the session
//! requirement is applied once, at the router layer, instead of per handler.

/// Routes accessible to anonymous callers (catalog browsing, login).
pub mod public;

/// Routes protected by the `AuthUser` extractor middleware.
/// Unauthenticated callers are redirected to the login view.
pub mod authenticated;
