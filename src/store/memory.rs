use std::collections::HashMap;
use std::sync::Mutex;

use super::traits::{KvStore, StoreError};

/// In-process store. Nothing survives the process; used for `--ephemeral`
/// runs and tests.
#[derive(Default)]
pub struct MemoryStore {
  entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  #[cfg(test)]
  pub fn len(&self) -> usize {
    self.entries.lock().map(|e| e.len()).unwrap_or_default()
  }
}

impl KvStore for MemoryStore {
  fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
    let entries = self
      .entries
      .lock()
      .map_err(|e| StoreError::Poisoned(e.to_string()))?;
    Ok(entries.get(key).cloned())
  }

  fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
    let mut entries = self
      .entries
      .lock()
      .map_err(|e| StoreError::Poisoned(e.to_string()))?;
    entries.insert(key.to_string(), value.to_string());
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<(), StoreError> {
    let mut entries = self
      .entries
      .lock()
      .map_err(|e| StoreError::Poisoned(e.to_string()))?;
    entries.remove(key);
    Ok(())
  }
}
