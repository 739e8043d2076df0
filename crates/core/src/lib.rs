//! Domain logic for the Millwright maintenance service.
//!
//! This crate has no I/O. It owns the case state machine, the machine status
//! derivation and the role tables that gate both; persistence lives in
//! `millwright-db` and orchestration in `millwright-api`.

mod text_enum;

pub mod case_workflow;
pub mod error;
pub mod machine;
pub mod machine_status;
pub mod notification;
pub mod roles;
pub mod types;
pub mod warning;
