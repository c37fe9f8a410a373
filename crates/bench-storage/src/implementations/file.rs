//! JSON files on disk, one per key.

use crate::{check_key, StorageError, StorageInterface};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Stores `namespace/id` as `<base>/namespace/id.json`.
pub struct FileStorage {
	base_path: PathBuf,
}

impl FileStorage {
	pub fn new(base_path: impl Into<PathBuf>) -> Self {
		Self {
			base_path: base_path.into(),
		}
	}

	pub fn base_path(&self) -> &Path {
		&self.base_path
	}

	fn file_path(&self, key: &str) -> Result<PathBuf, StorageError> {
		check_key(key)?;
		Ok(self.base_path.join(format!("{}.json", key)))
	}
}

fn backend(e: std::io::Error) -> StorageError {
	StorageError::Backend(e.to_string())
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let path = self.file_path(key)?;

		match fs::read(&path).await {
			Ok(data) => Ok(data),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound),
			Err(e) => Err(backend(e)),
		}
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let path = self.file_path(key)?;

		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent).await.map_err(backend)?;
		}

		// Write to a sibling temp file, then rename over the target.
		let temp_path = path.with_extension("json.tmp");
		fs::write(&temp_path, value).await.map_err(backend)?;
		fs::rename(&temp_path, &path).await.map_err(backend)?;

		debug!(path = %path.display(), "Stored");
		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let path = self.file_path(key)?;

		match fs::remove_file(&path).await {
			Ok(_) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(backend(e)),
		}
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		let path = self.file_path(key)?;
		fs::try_exists(&path).await.map_err(backend)
	}

	async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
		// Only the namespace directory named by the prefix is scanned.
		let namespace = prefix.rsplit_once('/').map(|(dir, _)| dir);
		let dir = match namespace {
			Some(ns) => self.base_path.join(ns),
			None => self.base_path.clone(),
		};

		let mut entries = match fs::read_dir(&dir).await {
			Ok(entries) => entries,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
			Err(e) => return Err(backend(e)),
		};

		let mut keys = Vec::new();
		while let Some(entry) = entries.next_entry().await.map_err(backend)? {
			let name = entry.file_name();
			let Some(id) = name.to_str().and_then(|n| n.strip_suffix(".json")) else {
				continue;
			};
			let key = match namespace {
				Some(ns) => format!("{}/{}", ns, id),
				None => id.to_string(),
			};
			if key.starts_with(prefix) {
				keys.push(key);
			}
		}
		keys.sort();
		Ok(keys)
	}
}

/// Creates file storage from a `[storage]`-style table.
///
/// - `storage_path`: base directory (default: `./run-data`)
pub fn create_storage(config: &toml::Value) -> Box<dyn StorageInterface> {
	let storage_path = config
		.get("storage_path")
		.and_then(|v| v.as_str())
		.unwrap_or("./run-data");

	Box::new(FileStorage::new(storage_path))
}
