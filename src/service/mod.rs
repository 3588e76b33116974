//! Account and attachment use cases
//!
//! Both services combine the two stores and the notifier into multi-step operations.
//! Every operation takes the caller's `Deadline`, narrows it to the configured
//! per-operation timeout, and runs each store call under that bound.
//!
//! Uploads check that the owner exists and then write the attachment. The two steps
//! are not atomic: an account deleted in between leaves an orphaned attachment, and
//! account deletion does not cascade to attachments.

pub mod deadline;
pub mod accounts;
pub mod files;

pub use deadline::Deadline;
pub use accounts::AccountService;
pub use files::AttachmentService;
