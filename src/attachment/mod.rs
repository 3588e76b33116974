//! Per-account file attachments held in the secondary store

pub mod types;
pub mod store;
pub mod rocks_store;

pub use types::{is_valid_attachment_id, new_attachment_id, Attachment, AttachmentId, AttachmentMeta, NewAttachment};
pub use store::{AttachmentStore, InMemoryAttachmentStore};
pub use rocks_store::RocksAttachmentStore;
