//! Installation persistence and lifecycle reconciliation.
//!
//! Two uncoordinated event channels mutate the installation table: the
//! user-driven browser callback (claim) and the asynchronous signed webhook
//! (create/suspend/unsuspend/delete). Consistency comes from idempotent
//! upserts and single-statement conditional updates, not from locking
//! across the two entry points.

pub mod lifecycle;
pub mod store;
