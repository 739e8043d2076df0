//! Row models and input DTOs, one module per table family.
//!
//! Enum-valued `TEXT` columns decode straight into `millwright-core` enums via
//! `#[sqlx(try_from = "String")]`.

pub mod case;
pub mod collection;
pub mod machine;
pub mod machine_status_change;
pub mod notification;
pub mod user;
pub mod warning;
