//! Kernel services.
//!
//! Long-lived services held in application state: the audit trail and the
//! bulk artifact importer.

pub mod audit;
pub mod import;

pub use audit::{AuditEntry, AuditService};
pub use import::{ImportReport, ImportService};
