use crate::domain::ThemeId;
use crate::infrastructure::{keys, KeyValueStore, Scope};
use anyhow::Result;
use serde_json::Value;

/// Monotonic theme id counter. The next free id is written to the durable
/// scope before an id is handed out, so ids are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdAllocator {
    next: ThemeId,
}

impl IdAllocator {
    pub fn new(next: ThemeId) -> Self {
        Self { next: next.max(1) }
    }

    /// The id the next allocation will return.
    pub fn peek(&self) -> ThemeId {
        self.next
    }

    pub fn next(&mut self, store: &dyn KeyValueStore) -> Result<ThemeId> {
        let id = self.next;
        store.set(Scope::Durable, keys::NEXT_ID, Value::from(id + 1))?;
        self.next = id + 1;
        Ok(id)
    }

    /// Make sure future ids stay above `id`.
    pub(crate) fn reserve_past(&mut self, id: ThemeId) {
        if self.next <= id {
            self.next = id + 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::MemoryStore;
    use serde_json::json;

    #[test]
    fn test_next_persists_before_returning() {
        let store = MemoryStore::new();
        let mut ids = IdAllocator::new(8);

        assert_eq!(ids.next(&store).unwrap(), 8);
        assert_eq!(store.get(Scope::Durable, keys::NEXT_ID).unwrap(), Some(json!(9)));
        assert_eq!(ids.next(&store).unwrap(), 9);
        assert_eq!(ids.peek(), 10);
    }

    #[test]
    fn test_counter_never_starts_at_zero() {
        assert_eq!(IdAllocator::new(0).peek(), 1);
    }

    #[test]
    fn test_reserve_past_only_moves_forward() {
        let mut ids = IdAllocator::new(5);
        ids.reserve_past(3);
        assert_eq!(ids.peek(), 5);
        ids.reserve_past(11);
        assert_eq!(ids.peek(), 12);
    }
}
