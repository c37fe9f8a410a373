//! In-process storage for tests and dry runs.

use crate::{check_key, StorageError, StorageInterface};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemoryStorage {
	entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStorage {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl StorageInterface for MemoryStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		self.entries
			.read()
			.await
			.get(key)
			.cloned()
			.ok_or(StorageError::NotFound)
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		check_key(key)?;
		self.entries.write().await.insert(key.to_string(), value);
		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		self.entries.write().await.remove(key);
		Ok(())
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		Ok(self.entries.read().await.contains_key(key))
	}

	async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
		Ok(self
			.entries
			.read()
			.await
			.keys()
			.filter(|key| key.starts_with(prefix))
			.cloned()
			.collect())
	}
}
