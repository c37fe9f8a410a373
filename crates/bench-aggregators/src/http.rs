//! Response handling shared by the REST plugins.

use crate::AggregatorError;
use serde::de::DeserializeOwned;
use tracing::warn;

/// Decodes a JSON body, mapping non-2xx responses to `RequestFailed`.
pub(crate) async fn read_json<T: DeserializeOwned>(
	response: reqwest::Response,
) -> Result<T, AggregatorError> {
	let status = response.status();
	if !status.is_success() {
		let body = response.text().await.unwrap_or_default();
		warn!(status = status.as_u16(), body = %body, "Vendor request failed");
		return Err(AggregatorError::RequestFailed(status.as_u16()));
	}

	Ok(response.json().await?)
}

/// Reads a string option from a plugin table.
pub(crate) fn table_str<'a>(table: &'a toml::Value, key: &str) -> Option<&'a str> {
	table.get(key).and_then(|v| v.as_str())
}

/// Reads a non-negative integer option from a plugin table.
pub(crate) fn table_u64(table: &toml::Value, key: &str) -> Option<u64> {
	table
		.get(key)
		.and_then(|v| v.as_integer())
		.and_then(|v| u64::try_from(v).ok())
}
