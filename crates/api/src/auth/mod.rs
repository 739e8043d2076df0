//! Bearer-token verification.
//!
//! Tokens are issued elsewhere; this service only validates them and reads
//! the user id and role they carry.

pub mod jwt;
