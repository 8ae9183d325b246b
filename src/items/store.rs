//! In-memory item storage keyed by integer id.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

const MAX_NAME_LEN: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item {
    pub id: u64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Client-supplied item fields for create and update.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemPayload {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl ItemPayload {
    /// Returns the trimmed name, or why it is unacceptable.
    pub fn validated_name(&self) -> Result<String, String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("Item name must not be empty.".to_string());
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(format!("Item name must be at most {MAX_NAME_LEN} characters."));
        }
        Ok(name.to_string())
    }
}

#[derive(Debug)]
pub struct ItemStore {
    items: DashMap<u64, Item>,
    next_id: AtomicU64,
}

impl Default for ItemStore {
    fn default() -> Self {
        Self {
            items: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }
}

impl ItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All items ordered by id.
    pub fn list(&self) -> Vec<Item> {
        let mut items: Vec<Item> = self.items.iter().map(|r| r.value().clone()).collect();
        items.sort_by_key(|item| item.id);
        items
    }

    pub fn get(&self, id: u64) -> Option<Item> {
        self.items.get(&id).map(|r| r.value().clone())
    }

    pub fn create(&self, name: String, description: Option<String>) -> Item {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let item = Item {
            id,
            name,
            description,
        };
        self.items.insert(id, item.clone());
        item
    }

    pub fn update(&self, id: u64, name: String, description: Option<String>) -> Option<Item> {
        let mut item = self.items.get_mut(&id)?;
        item.name = name;
        item.description = description;
        Some(item.clone())
    }

    pub fn delete(&self, id: u64) -> Option<Item> {
        self.items.remove(&id).map(|(_, item)| item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crud_cycle() {
        let store = ItemStore::new();
        let a = store.create("alpha".into(), None);
        let b = store.create("beta".into(), Some("second".into()));
        assert_eq!((a.id, b.id), (1, 2));
        assert_eq!(store.list(), vec![a.clone(), b.clone()]);

        let updated = store.update(a.id, "alpha2".into(), None).unwrap();
        assert_eq!(updated.name, "alpha2");
        assert!(store.update(99, "x".into(), None).is_none());

        assert_eq!(store.delete(b.id), Some(b));
        assert!(store.get(2).is_none());
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn test_ids_are_not_reused() {
        let store = ItemStore::new();
        let a = store.create("a".into(), None);
        store.delete(a.id);
        let b = store.create("b".into(), None);
        assert!(b.id > a.id);
    }

    #[test]
    fn test_payload_validation() {
        let payload = |name: &str| ItemPayload {
            name: name.to_string(),
            description: None,
        };
        assert_eq!(payload("  widget ").validated_name(), Ok("widget".to_string()));
        assert!(payload("   ").validated_name().is_err());
        assert!(payload(&"x".repeat(300)).validated_name().is_err());
    }
}
