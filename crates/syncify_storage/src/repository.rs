//! The repository contract.

use crate::error::StorageResult;
use crate::id::{Identifiable, ItemId};
use async_trait::async_trait;

/// Async keyed collection.
///
/// Implementations may be in memory, on disk or behind a network API. All
/// of them must enforce the same add/update/delete rules.
#[async_trait]
pub trait Repository<T>: Send + Sync
where
    T: Identifiable + Clone + Send + Sync + 'static,
{
    /// Returns true if an item with `id` is stored.
    async fn contains(&self, id: &ItemId) -> StorageResult<bool>;

    /// Returns every item.
    async fn get_all(&self) -> StorageResult<Vec<T>>;

    /// Returns the item with `id`.
    ///
    /// Fails with [`StorageError::NotFound`](crate::StorageError::NotFound)
    /// if absent.
    async fn get(&self, id: &ItemId) -> StorageResult<T>;

    /// Stores a new item.
    ///
    /// Fails with
    /// [`StorageError::AlreadyExists`](crate::StorageError::AlreadyExists) if
    /// the id is taken.
    async fn add(&self, item: T) -> StorageResult<()>;

    /// Replaces an existing item.
    ///
    /// Fails with [`StorageError::NotFound`](crate::StorageError::NotFound)
    /// if absent.
    async fn update(&self, item: T) -> StorageResult<()>;

    /// Removes an item.
    ///
    /// Fails with [`StorageError::NotFound`](crate::StorageError::NotFound)
    /// if absent.
    async fn delete(&self, id: &ItemId) -> StorageResult<()>;

    /// Returns the item with `id`, or `None`.
    async fn find(&self, id: &ItemId) -> StorageResult<Option<T>> {
        if self.contains(id).await? {
            self.get(id).await.map(Some)
        } else {
            Ok(None)
        }
    }

    /// Adds the item or replaces the stored one.
    async fn upsert(&self, item: T) -> StorageResult<()> {
        if self.contains(&item.id()).await? {
            self.update(item).await
        } else {
            self.add(item).await
        }
    }
}
