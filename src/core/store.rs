use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Byte-oriented key-value storage shared by every collection.
///
/// Keys are namespaced strings such as `feed:{id}` or `follow_edge:{a}:{b}`.
/// The JSON helpers mirror the Spin store API so collection code reads the
/// same against either backend.
pub trait KvStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;

    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()>;

    /// Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> anyhow::Result<()>;

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>>
    where
        Self: Sized,
    {
        match self.get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()>
    where
        Self: Sized,
    {
        self.set(key, &serde_json::to_vec(value)?)
    }
}

/// In-process store used by the native server and by tests.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        entries.remove(key);
        Ok(())
    }
}

impl<T: KvStore> KvStore for Arc<T> {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        (**self).set(key, value)
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        (**self).delete(key)
    }
}

#[cfg(target_arch = "wasm32")]
impl KvStore for spin_sdk::key_value::Store {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(spin_sdk::key_value::Store::get(self, key)?)
    }

    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        Ok(spin_sdk::key_value::Store::set(self, key, value)?)
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        Ok(spin_sdk::key_value::Store::delete(self, key)?)
    }
}

/// Append `id` to the JSON id list stored at `list_key`.
pub fn push_id<S: KvStore>(store: &S, list_key: &str, id: &str) -> anyhow::Result<()> {
    let mut ids: Vec<String> = store.get_json(list_key)?.unwrap_or_default();
    if !ids.iter().any(|existing| existing == id) {
        ids.push(id.to_string());
        store.set_json(list_key, &ids)?;
    }
    Ok(())
}

pub fn remove_id<S: KvStore>(store: &S, list_key: &str, id: &str) -> anyhow::Result<()> {
    let mut ids: Vec<String> = store.get_json(list_key)?.unwrap_or_default();
    ids.retain(|existing| existing != id);
    store.set_json(list_key, &ids)
}

pub fn list_ids<S: KvStore>(store: &S, list_key: &str) -> anyhow::Result<Vec<String>> {
    Ok(store.get_json(list_key)?.unwrap_or_default())
}
