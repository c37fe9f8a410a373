//! Persistence for benchmark artifacts.
//!
//! Routes, executions and reports are written as JSON documents under a
//! namespace (`token-routes`, `reports`, ...), mirroring the `run-data/`
//! layout used between benchmark runs.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

pub mod implementations;

pub use implementations::file::{create_storage, FileStorage};
pub use implementations::memory::MemoryStorage;

/// Namespace for quoted routes.
pub const ROUTES: &str = "token-routes";
/// Namespace for on-chain execution results.
pub const EXECUTIONS: &str = "executions";
/// Namespace for normalized reports.
pub const REPORTS: &str = "reports";

#[derive(Debug, Error)]
pub enum StorageError {
	#[error("Not found")]
	NotFound,
	#[error("Serialization error: {0}")]
	Serialization(String),
	#[error("Backend error: {0}")]
	Backend(String),
	#[error("Invalid key: {0}")]
	InvalidKey(String),
}

/// Low-level key/value backend. Keys have the form `namespace/id`.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

	/// Deleting a missing key succeeds.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;

	async fn exists(&self, key: &str) -> Result<bool, StorageError>;

	/// Keys starting with `prefix`, sorted.
	async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}

/// Rejects keys that could escape a namespace.
pub(crate) fn check_key(key: &str) -> Result<(), StorageError> {
	let valid = !key.is_empty()
		&& key
			.split('/')
			.all(|part| !part.is_empty() && part != "." && part != "..");
	if valid {
		Ok(())
	} else {
		Err(StorageError::InvalidKey(key.to_string()))
	}
}

/// Typed JSON storage on top of a [`StorageInterface`] backend.
pub struct StorageService {
	backend: Box<dyn StorageInterface>,
}

impl StorageService {
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self { backend }
	}

	fn key(namespace: &str, id: &str) -> String {
		format!("{}/{}", namespace, id)
	}

	/// Stores `data` as pretty-printed JSON.
	pub async fn store<T: Serialize>(&self, namespace: &str, id: &str, data: &T) -> Result<(), StorageError> {
		let bytes = serde_json::to_vec_pretty(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend.set_bytes(&Self::key(namespace, id), bytes).await
	}

	pub async fn retrieve<T: DeserializeOwned>(&self, namespace: &str, id: &str) -> Result<T, StorageError> {
		let bytes = self.backend.get_bytes(&Self::key(namespace, id)).await?;
		serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))
	}

	pub async fn remove(&self, namespace: &str, id: &str) -> Result<(), StorageError> {
		self.backend.delete(&Self::key(namespace, id)).await
	}

	pub async fn contains(&self, namespace: &str, id: &str) -> Result<bool, StorageError> {
		self.backend.exists(&Self::key(namespace, id)).await
	}

	/// Ids stored under `namespace`.
	pub async fn list(&self, namespace: &str) -> Result<Vec<String>, StorageError> {
		let prefix = format!("{}/", namespace);
		Ok(self
			.backend
			.list(&prefix)
			.await?
			.into_iter()
			.filter_map(|key| key.strip_prefix(&prefix).map(str::to_string))
			.collect())
	}

	/// Every document under `namespace`, in id order.
	pub async fn retrieve_all<T: DeserializeOwned>(&self, namespace: &str) -> Result<Vec<T>, StorageError> {
		let mut documents = Vec::new();
		for id in self.list(namespace).await? {
			documents.push(self.retrieve(namespace, &id).await?);
		}
		Ok(documents)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde::Deserialize;

	#[derive(Debug, PartialEq, Serialize, Deserialize)]
	struct Quote {
		protocol: String,
		amount: String,
	}

	#[test]
	fn test_keys_cannot_escape_namespace() {
		assert!(check_key("reports/lifi-1").is_ok());
		assert!(check_key("reports/../secrets").is_err());
		assert!(check_key("/etc").is_err());
		assert!(check_key("").is_err());
	}

	#[tokio::test]
	async fn test_service_round_trips_and_lists() {
		let service = StorageService::new(Box::new(MemoryStorage::new()));
		let quote = Quote {
			protocol: "lifi".to_string(),
			amount: "1000".to_string(),
		};

		service.store(ROUTES, "lifi-eth-polygon", &quote).await.unwrap();
		service.store(ROUTES, "socket-eth-polygon", &quote).await.unwrap();
		service.store(REPORTS, "lifi-eth-polygon", &quote).await.unwrap();

		let ids = service.list(ROUTES).await.unwrap();
		assert_eq!(ids, vec!["lifi-eth-polygon", "socket-eth-polygon"]);

		let stored: Quote = service.retrieve(ROUTES, "lifi-eth-polygon").await.unwrap();
		assert_eq!(stored, quote);
		assert_eq!(service.retrieve_all::<Quote>(ROUTES).await.unwrap().len(), 2);

		service.remove(ROUTES, "lifi-eth-polygon").await.unwrap();
		assert!(!service.contains(ROUTES, "lifi-eth-polygon").await.unwrap());
		assert!(matches!(
			service.retrieve::<Quote>(ROUTES, "lifi-eth-polygon").await,
			Err(StorageError::NotFound)
		));
	}
}
