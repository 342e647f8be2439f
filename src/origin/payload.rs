//! Wire format of the upstream app list.
//!
//! ```json
//! {"applist": {"apps": [{"appid": 10, "name": "Counter-Strike"}]}}
//! ```

use serde::Deserialize;

use crate::core::entry::CatalogEntry;

#[derive(Debug, Deserialize)]
struct AppListResponse {
    applist: AppList,
}

#[derive(Debug, Deserialize)]
struct AppList {
    #[serde(default)]
    apps: Vec<RawApp>,
}

#[derive(Debug, Deserialize)]
struct RawApp {
    #[serde(alias = "id")]
    appid: i64,
    #[serde(default)]
    name: Option<String>,
}

/// Decode a full response body into catalog entries.
///
/// Apps published without a name cannot be looked up and are dropped.
///
/// # Errors
///
/// Returns the JSON error if the body does not match the expected shape.
pub fn decode(body: &[u8]) -> Result<Vec<CatalogEntry>, serde_json::Error> {
    let response: AppListResponse = serde_json::from_slice(body)?;

    let total = response.applist.apps.len();
    let entries: Vec<CatalogEntry> = response
        .applist
        .apps
        .into_iter()
        .filter_map(|app| app.name.map(|name| CatalogEntry::new(app.appid, name)))
        .collect();

    if entries.len() < total {
        tracing::debug!(
            "Dropped {} unnamed apps from origin payload",
            total - entries.len()
        );
    }

    Ok(entries)
}
