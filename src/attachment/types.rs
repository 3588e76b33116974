use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::account::AccountId;

/// Store-assigned attachment identifier: 24 lowercase hex characters
pub type AttachmentId = String;

const ID_BYTES: usize = 12;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Attachment {
    pub id: AttachmentId,
    /// Owning account. Checked at upload time only; the secondary store does not enforce it.
    pub owner_id: AccountId,
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewAttachment {
    pub owner_id: AccountId,
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Listing view of an attachment, without the payload
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AttachmentMeta {
    pub id: AttachmentId,
    pub filename: String,
}

impl Attachment {
    pub fn from_new(id: AttachmentId, new: NewAttachment) -> Self {
        Self {
            id,
            owner_id: new.owner_id,
            filename: new.filename,
            content_type: new.content_type,
            data: new.data,
        }
    }

    pub fn meta(&self) -> AttachmentMeta {
        AttachmentMeta {
            id: self.id.clone(),
            filename: self.filename.clone(),
        }
    }
}

/// Generate a new attachment id: big-endian unix seconds followed by 8 random bytes
pub fn new_attachment_id() -> AttachmentId {
    let mut bytes = [0u8; ID_BYTES];
    let secs = chrono::Utc::now().timestamp() as u32;
    bytes[..4].copy_from_slice(&secs.to_be_bytes());
    rand::thread_rng().fill_bytes(&mut bytes[4..]);
    hex::encode(bytes)
}

pub fn is_valid_attachment_id(id: &str) -> bool {
    id.len() == ID_BYTES * 2 && id.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
