//! Attachment store capability and the in-memory implementation

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::types::{
    is_valid_attachment_id, new_attachment_id, Attachment, AttachmentId, AttachmentMeta, NewAttachment,
};
use crate::account::AccountId;
use crate::error::StoreError;

/// Storage operations over attachments, scoped by owning account
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// Persist an attachment and return its store-assigned id
    async fn insert(&self, attachment: NewAttachment) -> Result<AttachmentId, StoreError>;

    /// Fetch one attachment. Fails with `InvalidId` when `id` is not in the store's id format.
    async fn find_by_id(&self, id: &str) -> Result<Option<Attachment>, StoreError>;

    /// Metadata of every attachment of one owner, oldest first. Payloads are not read.
    async fn list_by_owner(&self, owner_id: AccountId) -> Result<Vec<AttachmentMeta>, StoreError>;

    /// Remove one attachment, returning the number of removed records
    async fn delete_by_id(&self, id: &str) -> Result<u64, StoreError>;

    /// Remove every attachment of one owner, returning the number of removed records
    async fn delete_by_owner(&self, owner_id: AccountId) -> Result<u64, StoreError>;
}

#[derive(Default)]
pub struct InMemoryAttachmentStore {
    files: Mutex<BTreeMap<AttachmentId, Attachment>>,
}

impl InMemoryAttachmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<AttachmentId, Attachment>>, StoreError> {
        self.files
            .lock()
            .map_err(|e| StoreError::Backend(format!("attachment store poisoned: {}", e)))
    }
}

fn check_id(id: &str) -> Result<(), StoreError> {
    if is_valid_attachment_id(id) {
        Ok(())
    } else {
        Err(StoreError::InvalidId(id.to_string()))
    }
}

#[async_trait]
impl AttachmentStore for InMemoryAttachmentStore {
    async fn insert(&self, attachment: NewAttachment) -> Result<AttachmentId, StoreError> {
        let id = new_attachment_id();
        self.lock()?
            .insert(id.clone(), Attachment::from_new(id.clone(), attachment));
        Ok(id)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Attachment>, StoreError> {
        check_id(id)?;
        Ok(self.lock()?.get(id).cloned())
    }

    async fn list_by_owner(&self, owner_id: AccountId) -> Result<Vec<AttachmentMeta>, StoreError> {
        Ok(self
            .lock()?
            .values()
            .filter(|f| f.owner_id == owner_id)
            .map(Attachment::meta)
            .collect())
    }

    async fn delete_by_id(&self, id: &str) -> Result<u64, StoreError> {
        check_id(id)?;
        Ok(self.lock()?.remove(id).map_or(0, |_| 1))
    }

    async fn delete_by_owner(&self, owner_id: AccountId) -> Result<u64, StoreError> {
        let mut files = self.lock()?;
        let before = files.len();
        files.retain(|_, f| f.owner_id != owner_id);
        Ok((before - files.len()) as u64)
    }
}
