//! Current maximum surrogate ids read from a remote catalog
//!
//! Used for incremental loads: ids of new rows continue after the ids
//! already stored, so the output can be appended to an existing catalog.

use crate::error::{MeltError, Result};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::{debug, info};

/// Source of per-table id seeds
pub trait IdSeedSource {
    /// Current maximum id for each of `tables`; tables unknown to the
    /// source are seeded at zero
    fn fetch_seeds(&self, tables: &[String]) -> Result<HashMap<String, u64>>;
}

/// Blocking client for an ERMrest-style catalog
///
/// `base_url` is the catalog URL, e.g. `https://host/ermrest/catalog/1`.
pub struct CatalogClient {
    base_url: String,
    schema: String,
    client: reqwest::blocking::Client,
}

#[derive(Debug, Deserialize)]
struct SchemaDescription {
    #[serde(default)]
    tables: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct MaxRow {
    max: Option<u64>,
}

impl CatalogClient {
    pub fn new(base_url: impl Into<String>, schema: impl Into<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| MeltError::Catalog(format!("Failed to create HTTP client: {}", e)))?;

        Ok(CatalogClient {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            schema: schema.into(),
            client,
        })
    }

    fn get(&self, url: &str) -> Result<String> {
        debug!(url, "Fetching from catalog");

        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .map_err(|e| MeltError::Catalog(format!("Failed to fetch {}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(MeltError::Catalog(format!(
                "HTTP error {} when fetching {}",
                response.status(),
                url
            )));
        }

        response
            .text()
            .map_err(|e| MeltError::Catalog(format!("Failed to read response from {}: {}", url, e)))
    }

    /// Names of the tables that already exist in the remote schema
    pub fn remote_tables(&self) -> Result<HashSet<String>> {
        let url = format!(
            "{}/schema/{}",
            self.base_url,
            urlencoding::encode(&self.schema)
        );
        parse_schema_tables(&self.get(&url)?)
    }

    /// Current maximum `id` of one remote table
    pub fn max_id(&self, table: &str) -> Result<u64> {
        let url = format!(
            "{}/aggregate/{}:{}/max:=max(id)",
            self.base_url,
            urlencoding::encode(&self.schema),
            urlencoding::encode(table)
        );
        parse_max_id(&self.get(&url)?)
    }
}

impl IdSeedSource for CatalogClient {
    fn fetch_seeds(&self, tables: &[String]) -> Result<HashMap<String, u64>> {
        let remote = self.remote_tables()?;

        let mut seeds = HashMap::with_capacity(tables.len());
        for table in tables {
            let seed = if remote.contains(table) {
                self.max_id(table)?
            } else {
                0
            };
            seeds.insert(table.clone(), seed);
        }

        info!(schema = %self.schema, tables = seeds.len(), "Fetched id seeds from catalog");
        Ok(seeds)
    }
}

fn parse_schema_tables(body: &str) -> Result<HashSet<String>> {
    let description: SchemaDescription = serde_json::from_str(body)
        .map_err(|e| MeltError::Catalog(format!("Invalid schema description: {}", e)))?;
    Ok(description.tables.into_keys().collect())
}

fn parse_max_id(body: &str) -> Result<u64> {
    let rows: Vec<MaxRow> = serde_json::from_str(body)
        .map_err(|e| MeltError::Catalog(format!("Invalid aggregate response: {}", e)))?;
    Ok(rows.first().and_then(|r| r.max).unwrap_or(0))
}
