//! In-memory observable repository.

use crate::error::{StorageError, StorageResult};
use crate::id::{Identifiable, ItemId};
use crate::repository::Repository;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use tokio::sync::broadcast;

/// Capacity of the event channel. Slow subscribers lag rather than block
/// writers.
const EVENT_CAPACITY: usize = 256;

/// A change published by an [`InMemoryRepository`].
#[derive(Debug, Clone, PartialEq)]
pub enum RepositoryEvent<T> {
    /// An item was added.
    Added(T),
    /// An item was replaced; carries the new value.
    Updated(T),
    /// An item was removed; carries the removed value.
    Deleted(T),
}

/// A repository backed by an ordered map.
///
/// Every successful mutation is published to subscribers after the write
/// lock is released.
///
/// # Example
///
/// ```rust,ignore
/// let repo = InMemoryRepository::new();
/// let mut events = repo.subscribe();
/// repo.add(item).await?;
/// assert!(matches!(events.recv().await?, RepositoryEvent::Added(_)));
/// ```
#[derive(Debug)]
pub struct InMemoryRepository<T> {
    items: RwLock<BTreeMap<ItemId, T>>,
    events: broadcast::Sender<RepositoryEvent<T>>,
}

impl<T> InMemoryRepository<T>
where
    T: Identifiable + Clone + Send + Sync + 'static,
{
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            items: RwLock::new(BTreeMap::new()),
            events,
        }
    }

    /// Creates a repository holding `items`.
    ///
    /// Fails with [`StorageError::AlreadyExists`] if two items share an id.
    pub fn with_items(items: impl IntoIterator<Item = T>) -> StorageResult<Self> {
        let mut map = BTreeMap::new();
        for item in items {
            let id = item.id();
            if map.contains_key(&id) {
                return Err(StorageError::AlreadyExists { id });
            }
            map.insert(id, item);
        }

        let repo = Self::new();
        *repo.items.write() = map;
        Ok(repo)
    }

    /// Subscribes to future changes.
    pub fn subscribe(&self) -> broadcast::Receiver<RepositoryEvent<T>> {
        self.events.subscribe()
    }

    /// Returns the number of stored items.
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    fn publish(&self, event: RepositoryEvent<T>) {
        // No receivers is not an error.
        let _ = self.events.send(event);
    }
}

impl<T> Default for InMemoryRepository<T>
where
    T: Identifiable + Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> Repository<T> for InMemoryRepository<T>
where
    T: Identifiable + Clone + Send + Sync + 'static,
{
    async fn contains(&self, id: &ItemId) -> StorageResult<bool> {
        Ok(self.items.read().contains_key(id))
    }

    async fn get_all(&self) -> StorageResult<Vec<T>> {
        Ok(self.items.read().values().cloned().collect())
    }

    async fn get(&self, id: &ItemId) -> StorageResult<T> {
        self.items
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound { id: id.clone() })
    }

    async fn add(&self, item: T) -> StorageResult<()> {
        {
            let mut items = self.items.write();
            let id = item.id();
            if items.contains_key(&id) {
                return Err(StorageError::AlreadyExists { id });
            }
            items.insert(id, item.clone());
        }
        self.publish(RepositoryEvent::Added(item));
        Ok(())
    }

    async fn update(&self, item: T) -> StorageResult<()> {
        {
            let mut items = self.items.write();
            let id = item.id();
            match items.get_mut(&id) {
                Some(slot) => *slot = item.clone(),
                None => return Err(StorageError::NotFound { id }),
            }
        }
        self.publish(RepositoryEvent::Updated(item));
        Ok(())
    }

    async fn delete(&self, id: &ItemId) -> StorageResult<()> {
        let removed = self
            .items
            .write()
            .remove(id)
            .ok_or_else(|| StorageError::NotFound { id: id.clone() })?;
        self.publish(RepositoryEvent::Deleted(removed));
        Ok(())
    }

    async fn upsert(&self, item: T) -> StorageResult<()> {
        let previous = self.items.write().insert(item.id(), item.clone());
        self.publish(match previous {
            Some(_) => RepositoryEvent::Updated(item),
            None => RepositoryEvent::Added(item),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Note {
        id: u64,
        text: &'static str,
    }

    impl Identifiable for Note {
        fn id(&self) -> ItemId {
            ItemId::Number(self.id)
        }
    }

    fn note(id: u64, text: &'static str) -> Note {
        Note { id, text }
    }

    #[tokio::test]
    async fn add_and_get() {
        let repo: InMemoryRepository<Note> = InMemoryRepository::new();
        repo.add(note(1, "a")).await.unwrap();

        assert!(repo.contains(&1u64.into()).await.unwrap());
        assert_eq!(repo.get(&1u64.into()).await.unwrap(), note(1, "a"));
        assert_eq!(repo.get_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn add_rejects_existing_id() {
        let repo: InMemoryRepository<Note> = InMemoryRepository::new();
        repo.add(note(1, "a")).await.unwrap();

        let err = repo.add(note(1, "b")).await.unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists { .. }));
        assert_eq!(repo.get(&1u64.into()).await.unwrap().text, "a");
    }

    #[tokio::test]
    async fn update_and_delete_require_existing_id() {
        let repo: InMemoryRepository<Note> = InMemoryRepository::new();

        let err = repo.update(note(1, "a")).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));

        let err = repo.delete(&1u64.into()).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));

        let err = repo.get(&1u64.into()).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[tokio::test]
    async fn find_and_upsert() {
        let repo: InMemoryRepository<Note> = InMemoryRepository::new();
        assert_eq!(repo.find(&1u64.into()).await.unwrap(), None);

        repo.upsert(note(1, "a")).await.unwrap();
        repo.upsert(note(1, "b")).await.unwrap();
        assert_eq!(repo.find(&1u64.into()).await.unwrap(), Some(note(1, "b")));
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn publishes_events() {
        let repo: InMemoryRepository<Note> = InMemoryRepository::new();
        let mut events = repo.subscribe();

        repo.add(note(1, "a")).await.unwrap();
        repo.update(note(1, "b")).await.unwrap();
        repo.delete(&1u64.into()).await.unwrap();
        // Failed mutations publish nothing.
        let _ = repo.delete(&1u64.into()).await;

        assert_eq!(events.recv().await.unwrap(), RepositoryEvent::Added(note(1, "a")));
        assert_eq!(events.recv().await.unwrap(), RepositoryEvent::Updated(note(1, "b")));
        assert_eq!(events.recv().await.unwrap(), RepositoryEvent::Deleted(note(1, "b")));
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn with_items_rejects_duplicates() {
        let err = InMemoryRepository::with_items(vec![note(1, "a"), note(1, "b")]).unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists { .. }));

        let repo = InMemoryRepository::with_items(vec![note(1, "a"), note(2, "b")]).unwrap();
        assert_eq!(repo.len(), 2);
    }
}
