//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async functions. Reads
//! that are useful both standalone and mid-transaction take any
//! [`sqlx::PgExecutor`]; multi-statement steps take `&mut PgConnection` so the
//! caller controls the transaction boundary.

pub mod case_repo;
pub mod collection_repo;
pub mod machine_repo;
pub mod machine_status_change_repo;
pub mod notification_preference_repo;
pub mod notification_repo;
pub mod user_repo;
pub mod warning_repo;

pub use case_repo::CaseRepo;
pub use collection_repo::CollectionRepo;
pub use machine_repo::MachineRepo;
pub use machine_status_change_repo::MachineStatusChangeRepo;
pub use notification_preference_repo::NotificationPreferenceRepo;
pub use notification_repo::NotificationRepo;
pub use user_repo::UserRepo;
pub use warning_repo::WarningRepo;
