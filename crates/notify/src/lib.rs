//! Notification fan-out and email delivery.
//!
//! - [`NotificationDispatcher`] persists one notification per distinct active
//!   recipient and queues email for recipients who opted in.
//! - [`EmailQueue`] / [`EmailWorker`] move queued email onto a background task
//!   backed by a bounded `tokio::sync::mpsc` channel.
//! - [`EmailDelivery`] sends a single message over SMTP with `lettre`.

pub mod dispatcher;
pub mod email;
pub mod queue;

pub use dispatcher::{DispatchError, DispatchReport, Notice, NotificationDispatcher};
pub use email::{EmailConfig, EmailDelivery, EmailError, OutgoingEmail};
pub use queue::{EmailJob, EmailQueue, EmailWorker};
