//! Authentication extractors.
//!
//! - [`auth::AuthUser`] -- Extracts the authenticated user from a JWT Bearer token.
//! - [`rbac::RequireManager`] -- Requires the `manager` role.
//!
//! Workflow permissions (who may move a case, report a status, resolve a
//! warning) are decided in `millwright_core`, not here.

pub mod auth;
pub mod rbac;
