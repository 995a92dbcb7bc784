use std::path::PathBuf;

use anyhow::{Context, bail};
use product_catalog::{
    CatalogClient,
    CatalogClientConfig,
    Client,
    HttpImageUploader,
    MockClient,
};
use tracing::debug;

use crate::config::Config;

/// Path to a JSON file of mock responses.
/// When set, no requests are sent to the product API.
pub const CATALOG_ADMIN_MOCK_DATA_VAR: &str = "_CATALOG_ADMIN_USE_MOCK";

/// Initialize the product API client
///
/// - Initialize a mock client if `_CATALOG_ADMIN_USE_MOCK` points to mock data
/// - Initialize a real client otherwise
pub fn init_catalog_client(config: &Config) -> Result<Client, anyhow::Error> {
    if let Ok(path_str) = std::env::var(CATALOG_ADMIN_MOCK_DATA_VAR) {
        let path = PathBuf::from(path_str);
        if !path.exists() {
            bail!("path to mock data file doesn't exist: {}", path.display());
        }

        debug!(mock_data_path = %path.display(), "using mock catalog client");
        return Ok(MockClient::new(Some(path))?.into());
    }

    let mut client_config = CatalogClientConfig::new(&config.catalog_url);
    client_config.auth_token = config.auth_token.clone().filter(|token| !token.is_empty());
    client_config.user_agent = Some(format!("catalog-admin/{}", env!("CARGO_PKG_VERSION")));

    // Pass in a bool if we are running in CI, so requests can reflect this in the headers
    if std::env::var("CI").is_ok() {
        client_config
            .extra_headers
            .insert("x-catalog-admin-ci".to_string(), "true".to_string());
    }

    debug!("using catalog client with url: {}", config.catalog_url);
    let client = CatalogClient::new(client_config)
        .with_context(|| format!("Invalid catalog url '{}'", config.catalog_url))?;
    Ok(client.into())
}

/// Initialize the image uploader, unconfigured if no `upload_url` is set.
pub fn init_image_uploader(config: &Config) -> Result<HttpImageUploader, anyhow::Error> {
    match &config.upload_url {
        Some(url) => {
            debug!(%url, "using image upload endpoint");
            Ok(HttpImageUploader::new(url.clone())?)
        },
        None => Ok(HttpImageUploader::unconfigured()),
    }
}
