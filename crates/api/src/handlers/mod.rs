//! HTTP handlers, one module per resource. Routes live in [`crate::routes`].

pub mod case;
pub mod collection;
pub mod machine;
pub mod notification;
pub mod warning;
