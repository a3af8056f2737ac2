use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::errors::{LedgerError, Result};

/// keyed hierarchical document store
///
/// Documents are addressed by slash-delimited paths
/// (`Deposits/ApprovedDeposits/{member}/{txn}`). The engine depends on
/// these four primitives only, never on a specific store's query
/// language. `get` of an interior node returns the whole subtree.
pub trait Store: Send + Sync {
    fn get(&self, path: &str) -> Result<Option<Value>>;

    fn set(&self, path: &str, doc: Value) -> Result<()>;

    /// shallow-merge the fields of `partial` into the document at
    /// `path`, creating it if absent
    fn update(&self, path: &str, partial: Value) -> Result<()>;

    /// single-key conditional write: refuses with
    /// [`LedgerError::Conflict`] when the key already holds a document.
    /// This is the serialization point for the idempotency guard.
    fn create(&self, path: &str, doc: Value) -> Result<()>;
}

/// blob storage for proof-of-payment uploads
pub trait BlobStore: Send + Sync {
    /// store the bytes and return a retrieval url
    fn upload(&self, path: &str, bytes: &[u8]) -> Result<String>;
}

fn segments(path: &str) -> Result<Vec<&str>> {
    let parts: Vec<&str> = path.split('/').collect();
    if parts.is_empty() || parts.iter().any(|s| s.is_empty()) {
        return Err(LedgerError::Store {
            message: format!("malformed path: {path:?}"),
        });
    }
    Ok(parts)
}

/// in-memory [`Store`] backed by a tree of JSON objects
///
/// Suitable for tests and as the reference implementation of the store
/// contract; interior mutability through a single `RwLock` makes
/// `create` genuinely check-and-insert.
#[derive(Debug, Default)]
pub struct MemoryStore {
    root: RwLock<Map<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn get(&self, path: &str) -> Result<Option<Value>> {
        let parts = segments(path)?;
        let root = self.root.read();
        let mut node: &Value = match root.get(parts[0]) {
            Some(v) => v,
            None => return Ok(None),
        };
        for part in &parts[1..] {
            match node.as_object().and_then(|o| o.get(*part)) {
                Some(v) => node = v,
                None => return Ok(None),
            }
        }
        Ok(Some(node.clone()))
    }

    fn set(&self, path: &str, doc: Value) -> Result<()> {
        let parts = segments(path)?;
        let mut root = self.root.write();
        let mut node = &mut *root;
        for part in &parts[..parts.len() - 1] {
            node = node
                .entry(part.to_string())
                .or_insert_with(|| Value::Object(Map::new()))
                .as_object_mut()
                .ok_or_else(|| LedgerError::Store {
                    message: format!("path {path:?} crosses a leaf document"),
                })?;
        }
        node.insert(parts[parts.len() - 1].to_string(), doc);
        Ok(())
    }

    fn update(&self, path: &str, partial: Value) -> Result<()> {
        let fields = match partial {
            Value::Object(fields) => fields,
            other => {
                return Err(LedgerError::Store {
                    message: format!("update expects an object, got {other}"),
                })
            }
        };
        let parts = segments(path)?;
        let mut root = self.root.write();
        let mut node = &mut *root;
        for part in &parts[..parts.len() - 1] {
            node = node
                .entry(part.to_string())
                .or_insert_with(|| Value::Object(Map::new()))
                .as_object_mut()
                .ok_or_else(|| LedgerError::Store {
                    message: format!("path {path:?} crosses a leaf document"),
                })?;
        }
        let doc = node
            .entry(parts[parts.len() - 1].to_string())
            .or_insert_with(|| Value::Object(Map::new()))
            .as_object_mut()
            .ok_or_else(|| LedgerError::Store {
                message: format!("document at {path:?} is not an object"),
            })?;
        for (k, v) in fields {
            doc.insert(k, v);
        }
        Ok(())
    }

    fn create(&self, path: &str, doc: Value) -> Result<()> {
        let parts = segments(path)?;
        let mut root = self.root.write();
        let mut node = &mut *root;
        for part in &parts[..parts.len() - 1] {
            node = node
                .entry(part.to_string())
                .or_insert_with(|| Value::Object(Map::new()))
                .as_object_mut()
                .ok_or_else(|| LedgerError::Store {
                    message: format!("path {path:?} crosses a leaf document"),
                })?;
        }
        let leaf = parts[parts.len() - 1];
        if node.contains_key(leaf) {
            return Err(LedgerError::Conflict {
                path: path.to_string(),
            });
        }
        node.insert(leaf.to_string(), doc);
        Ok(())
    }
}

/// in-memory [`BlobStore`]
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }
}

impl BlobStore for MemoryBlobStore {
    fn upload(&self, path: &str, bytes: &[u8]) -> Result<String> {
        if path.is_empty() {
            return Err(LedgerError::Store {
                message: "empty blob path".to_string(),
            });
        }
        self.blobs.write().insert(path.to_string(), bytes.to_vec());
        Ok(format!("memory://{path}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_then_get_leaf() {
        let store = MemoryStore::new();
        store.set("Members/m-001", json!({"balance": "100.00"})).unwrap();
        let doc = store.get("Members/m-001").unwrap().unwrap();
        assert_eq!(doc["balance"], "100.00");
    }

    #[test]
    fn test_get_interior_node_returns_subtree() {
        let store = MemoryStore::new();
        store.set("Deposits/PendingDeposits/m-001/111111", json!({"amount": "10"})).unwrap();
        store.set("Deposits/PendingDeposits/m-002/222222", json!({"amount": "20"})).unwrap();

        let tree = store.get("Deposits/PendingDeposits").unwrap().unwrap();
        let members = tree.as_object().unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members["m-001"]["111111"]["amount"], "10");
    }

    #[test]
    fn test_missing_path_is_none() {
        let store = MemoryStore::new();
        assert_eq!(store.get("Funds/pool").unwrap(), None);
    }

    #[test]
    fn test_update_merges_shallowly() {
        let store = MemoryStore::new();
        store.set("Members/m-001", json!({"balance": "100.00", "name": "Ana"})).unwrap();
        store.update("Members/m-001", json!({"balance": "150.00"})).unwrap();
        let doc = store.get("Members/m-001").unwrap().unwrap();
        assert_eq!(doc["balance"], "150.00");
        assert_eq!(doc["name"], "Ana");
    }

    #[test]
    fn test_create_refuses_existing_key() {
        let store = MemoryStore::new();
        store.create("Deposits/ApprovedDeposits/m-001/111111", json!({"a": 1})).unwrap();
        let err = store
            .create("Deposits/ApprovedDeposits/m-001/111111", json!({"a": 2}))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Conflict { .. }));

        // first write wins
        let doc = store.get("Deposits/ApprovedDeposits/m-001/111111").unwrap().unwrap();
        assert_eq!(doc["a"], 1);
    }

    #[test]
    fn test_malformed_paths_rejected() {
        let store = MemoryStore::new();
        assert!(store.get("Members//m-001").is_err());
        assert!(store.set("", json!({})).is_err());
    }

    #[test]
    fn test_blob_upload_returns_url() {
        let blobs = MemoryBlobStore::new();
        let url = blobs.upload("proofs/m-001/receipt.jpg", b"bytes").unwrap();
        assert_eq!(url, "memory://proofs/m-001/receipt.jpg");
        assert_eq!(blobs.len(), 1);
    }
}
