//! Configuration types for catalog client construction.

use std::collections::BTreeMap;

/// Configuration for catalog client construction.
#[derive(Debug, Clone)]
pub struct CatalogClientConfig {
    /// Base URL of the product API, e.g. `https://api.escuelajs.co/api/v1`.
    pub catalog_url: String,
    /// Optional bearer token sent with every request.
    pub auth_token: Option<String>,
    /// Additional headers to include in requests.
    pub extra_headers: BTreeMap<String, String>,
    pub user_agent: Option<String>,
}

impl CatalogClientConfig {
    pub fn new(catalog_url: impl Into<String>) -> Self {
        Self {
            catalog_url: catalog_url.into(),
            auth_token: None,
            extra_headers: BTreeMap::new(),
            user_agent: None,
        }
    }
}
