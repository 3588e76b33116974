use async_trait::async_trait;
use rocksdb::{Direction, IteratorMode, Options, WriteBatch, DB};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use super::store::AttachmentStore;
use super::types::{
    is_valid_attachment_id, new_attachment_id, Attachment, AttachmentId, AttachmentMeta, NewAttachment,
};
use crate::account::AccountId;
use crate::error::{blocking, StoreError};

/// RocksDB-backed attachment store.
///
/// Layout:
/// - `file:<id>` holds the bincode-encoded attachment
/// - `owner:<account>:<id>` holds the bincode-encoded `AttachmentMeta`, so owner
///   listings and bulk deletes never read payloads
///
/// RocksDB calls block; trait methods run them on the blocking pool.
#[derive(Clone)]
pub struct RocksAttachmentStore {
    db: Arc<DB>,
}

impl RocksAttachmentStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = DB::open(&opts, path)?;
        Ok(Self { db: Arc::new(db) })
    }

    // Generic Helper: Get
    fn get<T: for<'a> Deserialize<'a>>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.db.get(key.as_bytes())? {
            Some(data) => Ok(Some(bincode::deserialize(&data)?)),
            None => Ok(None),
        }
    }

    fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
        Ok(bincode::serialize(value)?)
    }

    /// Marker entries under an owner's prefix, in key order
    fn owned(&self, owner_id: AccountId) -> Result<Vec<AttachmentMeta>, StoreError> {
        let prefix = owner_prefix(owner_id);
        let mut files = Vec::new();

        let iter = self
            .db
            .iterator(IteratorMode::From(prefix.as_bytes(), Direction::Forward));
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            files.push(bincode::deserialize(&value)?);
        }

        Ok(files)
    }

    fn write_new(&self, attachment: NewAttachment) -> Result<AttachmentId, StoreError> {
        let id = new_attachment_id();
        let attachment = Attachment::from_new(id.clone(), attachment);

        let mut batch = WriteBatch::default();
        batch.put(file_key(&id).as_bytes(), Self::encode(&attachment)?);
        batch.put(
            owner_key(attachment.owner_id, &id).as_bytes(),
            Self::encode(&attachment.meta())?,
        );
        self.db.write(batch)?;

        Ok(id)
    }

    fn remove(&self, id: &str) -> Result<u64, StoreError> {
        let Some(attachment) = self.get::<Attachment>(&file_key(id))? else {
            return Ok(0);
        };

        let mut batch = WriteBatch::default();
        batch.delete(file_key(id).as_bytes());
        batch.delete(owner_key(attachment.owner_id, id).as_bytes());
        self.db.write(batch)?;
        Ok(1)
    }

    fn remove_owned(&self, owner_id: AccountId) -> Result<u64, StoreError> {
        let files = self.owned(owner_id)?;
        if files.is_empty() {
            return Ok(0);
        }

        let mut batch = WriteBatch::default();
        for file in &files {
            batch.delete(file_key(&file.id).as_bytes());
            batch.delete(owner_key(owner_id, &file.id).as_bytes());
        }
        self.db.write(batch)?;
        Ok(files.len() as u64)
    }
}

fn file_key(id: &str) -> String {
    format!("file:{}", id)
}

fn owner_prefix(owner_id: AccountId) -> String {
    format!("owner:{}:", owner_id)
}

fn owner_key(owner_id: AccountId, id: &str) -> String {
    format!("{}{}", owner_prefix(owner_id), id)
}

fn check_id(id: &str) -> Result<(), StoreError> {
    if is_valid_attachment_id(id) {
        Ok(())
    } else {
        Err(StoreError::InvalidId(id.to_string()))
    }
}

#[async_trait]
impl AttachmentStore for RocksAttachmentStore {
    async fn insert(&self, attachment: NewAttachment) -> Result<AttachmentId, StoreError> {
        let store = self.clone();
        blocking(move || store.write_new(attachment)).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Attachment>, StoreError> {
        check_id(id)?;
        let store = self.clone();
        let key = file_key(id);
        blocking(move || store.get(&key)).await
    }

    async fn list_by_owner(&self, owner_id: AccountId) -> Result<Vec<AttachmentMeta>, StoreError> {
        let store = self.clone();
        blocking(move || store.owned(owner_id)).await
    }

    async fn delete_by_id(&self, id: &str) -> Result<u64, StoreError> {
        check_id(id)?;
        let store = self.clone();
        let id = id.to_string();
        blocking(move || store.remove(&id)).await
    }

    async fn delete_by_owner(&self, owner_id: AccountId) -> Result<u64, StoreError> {
        let store = self.clone();
        blocking(move || store.remove_owned(owner_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(owner_id: AccountId, filename: &str, data: &[u8]) -> NewAttachment {
        NewAttachment {
            owner_id,
            filename: filename.to_string(),
            content_type: "application/pdf".to_string(),
            data: data.to_vec(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let store = RocksAttachmentStore::open(dir.path()).unwrap();

        let id = store.insert(upload(7, "cv.pdf", b"%PDF-1.7")).await.unwrap();
        let file = store.find_by_id(&id).await.unwrap().unwrap();

        assert_eq!(file.owner_id, 7);
        assert_eq!(file.filename, "cv.pdf");
        assert_eq!(file.content_type, "application/pdf");
        assert_eq!(file.data, b"%PDF-1.7");
    }

    #[tokio::test]
    async fn test_owner_prefix_does_not_leak() {
        let dir = tempfile::tempdir().unwrap();
        let store = RocksAttachmentStore::open(dir.path()).unwrap();

        store.insert(upload(1, "one.txt", b"1")).await.unwrap();
        store.insert(upload(10, "ten.txt", b"10")).await.unwrap();
        store.insert(upload(11, "eleven.txt", b"11")).await.unwrap();

        let owned = store.list_by_owner(1).await.unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].filename, "one.txt");
    }

    #[tokio::test]
    async fn test_delete_by_owner_is_repeatable() {
        let dir = tempfile::tempdir().unwrap();
        let store = RocksAttachmentStore::open(dir.path()).unwrap();

        store.insert(upload(3, "a", b"a")).await.unwrap();
        store.insert(upload(3, "b", b"b")).await.unwrap();
        let kept = store.insert(upload(4, "c", b"c")).await.unwrap();

        assert_eq!(store.delete_by_owner(3).await.unwrap(), 2);
        assert_eq!(store.delete_by_owner(3).await.unwrap(), 0);
        assert!(store.list_by_owner(3).await.unwrap().is_empty());
        assert!(store.find_by_id(&kept).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_malformed_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = RocksAttachmentStore::open(dir.path()).unwrap();

        assert!(matches!(store.find_by_id("../etc").await, Err(StoreError::InvalidId(_))));
        assert!(matches!(store.delete_by_id("").await, Err(StoreError::InvalidId(_))));
    }

    #[tokio::test]
    async fn test_listing_comes_from_owner_markers() {
        let dir = tempfile::tempdir().unwrap();
        let store = RocksAttachmentStore::open(dir.path()).unwrap();

        let id = store.insert(upload(5, "big.bin", &[7u8; 4096])).await.unwrap();

        // Listing and bulk delete only touch the marker keys
        let marker = store.db.get(owner_key(5, &id).as_bytes()).unwrap().unwrap();
        let meta: AttachmentMeta = bincode::deserialize(&marker).unwrap();
        assert_eq!(meta, AttachmentMeta { id: id.clone(), filename: "big.bin".into() });
        assert_eq!(store.list_by_owner(5).await.unwrap(), vec![meta]);

        assert_eq!(store.delete_by_owner(5).await.unwrap(), 1);
        assert!(store.db.get(file_key(&id).as_bytes()).unwrap().is_none());
        assert!(store.db.get(owner_key(5, &id).as_bytes()).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_by_id_clears_marker() {
        let dir = tempfile::tempdir().unwrap();
        let store = RocksAttachmentStore::open(dir.path()).unwrap();

        let id = store.insert(upload(2, "a", b"a")).await.unwrap();
        assert_eq!(store.delete_by_id(&id).await.unwrap(), 1);
        assert_eq!(store.delete_by_id(&id).await.unwrap(), 0);
        assert!(store.list_by_owner(2).await.unwrap().is_empty());
    }
}
