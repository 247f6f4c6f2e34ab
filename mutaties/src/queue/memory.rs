//! In-process mutation store.
//!
//! Behaves like the Postgres store, minus durability. Producer and worker have to live
//! in the same process and share the store through an [`Arc`](std::sync::Arc).
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};

use super::{Error, Mutation, MutationStore, Queue};

#[derive(Debug, Default)]
struct Inner {
    queues: HashMap<Queue, BTreeMap<i64, Mutation>>,
    next_id: HashMap<Queue, i64>,
}

/// Mutations kept in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MutationStore for MemoryStore {
    async fn insert(&self, mut mutation: Mutation) -> Result<Mutation, Error> {
        let mut inner = self.inner.lock();

        let id = {
            let next_id = inner.next_id.entry(mutation.queue).or_insert(0);
            *next_id += 1;
            *next_id
        };
        mutation.id = Some(id);

        inner
            .queues
            .entry(mutation.queue)
            .or_default()
            .insert(id, mutation.clone());

        Ok(mutation)
    }

    async fn get(&self, queue: Queue, id: i64) -> Result<Mutation, Error> {
        self.inner
            .lock()
            .queues
            .get(&queue)
            .and_then(|rows| rows.get(&id))
            .cloned()
            .ok_or(Error::NotFound(id))
    }

    async fn find_pending(&self, mutation: &Mutation) -> Result<Option<Mutation>, Error> {
        Ok(self.inner.lock().queues.get(&mutation.queue).and_then(|rows| {
            rows.values()
                .find(|row| mutation.same_pending(row))
                .cloned()
        }))
    }

    async fn count(&self, queue: Queue) -> Result<i64, Error> {
        Ok(self
            .inner
            .lock()
            .queues
            .get(&queue)
            .map(|rows| rows.len() as i64)
            .unwrap_or(0))
    }

    async fn latest_id(&self, queue: Queue) -> Result<Option<i64>, Error> {
        Ok(self
            .inner
            .lock()
            .queues
            .get(&queue)
            .and_then(|rows| rows.keys().next_back().copied()))
    }

    async fn pending_ids(&self, queue: Queue, after: Option<i64>) -> Result<Vec<i64>, Error> {
        let after = after.unwrap_or(i64::MIN);

        Ok(self
            .inner
            .lock()
            .queues
            .get(&queue)
            .map(|rows| {
                rows.range(after.saturating_add(1)..)
                    .filter(|(_, row)| !row.processed)
                    .map(|(id, _)| *id)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn mark_processed(&self, queue: Queue, id: i64) -> Result<(), Error> {
        let mut inner = self.inner.lock();
        let row = inner
            .queues
            .get_mut(&queue)
            .and_then(|rows| rows.get_mut(&id))
            .ok_or(Error::NotFound(id))?;
        row.processed = true;

        Ok(())
    }

    async fn count_pending(&self, queue: Queue) -> Result<i64, Error> {
        Ok(self
            .inner
            .lock()
            .queues
            .get(&queue)
            .map(|rows| rows.values().filter(|row| !row.processed).count() as i64)
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_ids_per_queue() {
        let store = MemoryStore::new();

        let a = store.insert(Mutation::new(Queue::Bestel, 1)).await.unwrap();
        let b = store.insert(Mutation::new(Queue::Bestel, 1)).await.unwrap();
        let c = store.insert(Mutation::new(Queue::Betaal, 1)).await.unwrap();

        assert_eq!(a.id, Some(1));
        assert_eq!(b.id, Some(2));
        assert_eq!(c.id, Some(1));
        assert_eq!(store.count(Queue::Bestel).await.unwrap(), 2);
        assert_eq!(store.count(Queue::Scheids).await.unwrap(), 0);
        assert_eq!(store.latest_id(Queue::Bestel).await.unwrap(), Some(2));
        assert_eq!(store.latest_id(Queue::Scheids).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_pending() {
        let store = MemoryStore::new();

        for code in 1..=4 {
            store
                .insert(
                    Mutation::new(Queue::Competitie, code)
                        .payload(json!({"deelnemer": code}))
                        .unwrap(),
                )
                .await
                .unwrap();
        }

        store.mark_processed(Queue::Competitie, 2).await.unwrap();

        assert_eq!(
            store.pending_ids(Queue::Competitie, None).await.unwrap(),
            vec![1, 3, 4]
        );
        assert_eq!(
            store.pending_ids(Queue::Competitie, Some(3)).await.unwrap(),
            vec![4]
        );
        assert_eq!(store.count_pending(Queue::Competitie).await.unwrap(), 3);
        assert!(store.get(Queue::Competitie, 2).await.unwrap().processed);
        assert!(matches!(
            store.get(Queue::Competitie, 9).await,
            Err(Error::NotFound(9))
        ));
        assert!(matches!(
            store.mark_processed(Queue::Bestel, 1).await,
            Err(Error::NotFound(1))
        ));

        let probe = Mutation::new(Queue::Competitie, 3)
            .payload(json!({"deelnemer": 3}))
            .unwrap();
        assert_eq!(
            store.find_pending(&probe).await.unwrap().and_then(|m| m.id),
            Some(3)
        );

        store.mark_processed(Queue::Competitie, 3).await.unwrap();
        assert!(store.find_pending(&probe).await.unwrap().is_none());
    }
}
