use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::deadline::Deadline;
use crate::account::{AccountId, AccountStore};
use crate::attachment::{Attachment, AttachmentId, AttachmentMeta, AttachmentStore, NewAttachment};
use crate::error::ServiceError;

/// File attachments scoped to an owning account
pub struct AttachmentService {
    accounts: Arc<dyn AccountStore>,
    files: Arc<dyn AttachmentStore>,
    timeout: Duration,
}

impl AttachmentService {
    pub fn new(accounts: Arc<dyn AccountStore>, files: Arc<dyn AttachmentStore>, timeout: Duration) -> Self {
        Self {
            accounts,
            files,
            timeout,
        }
    }

    /// Store a file for `owner_id`. The owner must exist at the time of the check;
    /// nothing is written otherwise.
    pub async fn upload(
        &self,
        deadline: Deadline,
        owner_id: AccountId,
        filename: String,
        content_type: String,
        data: Vec<u8>,
    ) -> Result<AttachmentId, ServiceError> {
        let deadline = deadline.bounded(self.timeout);

        if deadline.run(self.accounts.get_by_id(owner_id)).await?.is_none() {
            return Err(ServiceError::AccountNotFound);
        }

        let size = data.len();
        let id = deadline
            .run(self.files.insert(NewAttachment {
                owner_id,
                filename,
                content_type,
                data,
            }))
            .await?;
        info!("Stored attachment {} ({} bytes) for account {}", id, size, owner_id);

        Ok(id)
    }

    pub async fn get_attachment(&self, deadline: Deadline, id: &str) -> Result<Attachment, ServiceError> {
        let deadline = deadline.bounded(self.timeout);

        deadline
            .run(self.files.find_by_id(id))
            .await?
            .ok_or(ServiceError::NotFound)
    }

    /// Owner's attachments without payloads
    pub async fn list_attachments(
        &self,
        deadline: Deadline,
        owner_id: AccountId,
    ) -> Result<Vec<AttachmentMeta>, ServiceError> {
        let deadline = deadline.bounded(self.timeout);

        deadline.run(self.files.list_by_owner(owner_id)).await
    }

    pub async fn delete_attachment(&self, deadline: Deadline, id: &str) -> Result<(), ServiceError> {
        let deadline = deadline.bounded(self.timeout);

        match deadline.run(self.files.delete_by_id(id)).await? {
            0 => Err(ServiceError::NotFound),
            _ => {
                info!("Deleted attachment {}", id);
                Ok(())
            }
        }
    }

    /// Remove every attachment of `owner_id`. Succeeds when there is nothing to remove.
    pub async fn delete_attachments(&self, deadline: Deadline, owner_id: AccountId) -> Result<u64, ServiceError> {
        let deadline = deadline.bounded(self.timeout);

        let removed = deadline.run(self.files.delete_by_owner(owner_id)).await?;
        debug!("Removed {} attachments of account {}", removed, owner_id);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{InMemoryAccountStore, NewAccount};
    use crate::attachment::InMemoryAttachmentStore;

    struct Fixture {
        service: AttachmentService,
        accounts: Arc<InMemoryAccountStore>,
        files: Arc<InMemoryAttachmentStore>,
    }

    fn fixture() -> Fixture {
        let accounts = Arc::new(InMemoryAccountStore::new());
        let files = Arc::new(InMemoryAttachmentStore::new());
        Fixture {
            service: AttachmentService::new(accounts.clone(), files.clone(), Duration::from_secs(5)),
            accounts,
            files,
        }
    }

    fn deadline() -> Deadline {
        Deadline::after(Duration::from_secs(10))
    }

    async fn account(f: &Fixture, email: &str) -> AccountId {
        f.accounts
            .create(NewAccount {
                name: "Ann".into(),
                email: email.into(),
                password_hash: "hash".into(),
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_upload_round_trips_exact_payload() {
        let f = fixture();
        let owner = account(&f, "ann@x.com").await;
        let payload = vec![0u8, 159, 146, 150, 255];

        let id = f
            .service
            .upload(deadline(), owner, "blob.bin".into(), "application/octet-stream".into(), payload.clone())
            .await
            .unwrap();
        let file = f.service.get_attachment(deadline(), &id).await.unwrap();

        assert_eq!(file.data, payload);
        assert_eq!(file.filename, "blob.bin");
        assert_eq!(file.content_type, "application/octet-stream");
        assert_eq!(file.owner_id, owner);
    }

    #[tokio::test]
    async fn test_upload_for_unknown_owner_writes_nothing() {
        let f = fixture();

        let err = f
            .service
            .upload(deadline(), 404, "a.txt".into(), "text/plain".into(), b"a".to_vec())
            .await
            .unwrap_err();

        assert_eq!(err, ServiceError::AccountNotFound);
        assert!(f.service.list_attachments(deadline(), 404).await.unwrap().is_empty());
        assert!(f.files.list_by_owner(404).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_and_malformed_ids_are_not_found() {
        let f = fixture();

        let malformed = f.service.get_attachment(deadline(), "abc123").await;
        let missing = f.service.get_attachment(deadline(), "65a1b2c3d4e5f60718293a4b").await;

        assert_eq!(malformed.unwrap_err(), ServiceError::NotFound);
        assert_eq!(missing.unwrap_err(), ServiceError::NotFound);
    }

    #[tokio::test]
    async fn test_listing_is_metadata_only() {
        let f = fixture();
        let owner = account(&f, "ann@x.com").await;
        let id = f
            .service
            .upload(deadline(), owner, "notes.txt".into(), "text/plain".into(), b"secret".to_vec())
            .await
            .unwrap();

        let listed = f.service.list_attachments(deadline(), owner).await.unwrap();
        assert_eq!(listed, vec![AttachmentMeta { id, filename: "notes.txt".into() }]);
    }

    #[tokio::test]
    async fn test_bulk_delete_is_idempotent() {
        let f = fixture();
        let owner = account(&f, "ann@x.com").await;
        for name in ["a.txt", "b.txt"] {
            f.service
                .upload(deadline(), owner, name.into(), "text/plain".into(), name.as_bytes().to_vec())
                .await
                .unwrap();
        }

        assert_eq!(f.service.delete_attachments(deadline(), owner).await, Ok(2));
        assert!(f.service.list_attachments(deadline(), owner).await.unwrap().is_empty());
        assert_eq!(f.service.delete_attachments(deadline(), owner).await, Ok(0));
        assert!(f.service.list_attachments(deadline(), owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_single_attachment() {
        let f = fixture();
        let owner = account(&f, "ann@x.com").await;
        let id = f
            .service
            .upload(deadline(), owner, "a.txt".into(), "text/plain".into(), b"a".to_vec())
            .await
            .unwrap();

        assert_eq!(f.service.delete_attachment(deadline(), &id).await, Ok(()));
        assert_eq!(f.service.delete_attachment(deadline(), &id).await, Err(ServiceError::NotFound));
    }

    #[tokio::test]
    async fn test_account_deletion_leaves_attachments() {
        let f = fixture();
        let owner = account(&f, "ann@x.com").await;
        let id = f
            .service
            .upload(deadline(), owner, "a.txt".into(), "text/plain".into(), b"a".to_vec())
            .await
            .unwrap();

        f.accounts.delete(owner).await.unwrap();

        // Orphaned but still addressable
        assert!(f.service.get_attachment(deadline(), &id).await.is_ok());
        assert_eq!(f.service.list_attachments(deadline(), owner).await.unwrap().len(), 1);
    }
}
