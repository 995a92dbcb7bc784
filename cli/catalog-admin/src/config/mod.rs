use std::collections::HashMap;
use std::env;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config as HierarchicalConfig, Environment};
use log::debug;
use product_catalog::ConsoleSettings;
use serde::{Deserialize, Serialize};
use url::Url;
use xdg::BaseDirectories;

/// Name of the directory holding the configuration file
pub const CATALOG_ADMIN_DIR_NAME: &str = "catalog-admin";
pub const CATALOG_ADMIN_CONFIG_DIR_VAR: &str = "CATALOG_ADMIN_CONFIG_DIR";
pub const CATALOG_ADMIN_CONFIG_FILE: &str = "catalog-admin.toml";
/// Prefix of environment variables overriding config values,
/// e.g. `CATALOG_ADMIN_CATALOG_URL`
const ENV_PREFIX: &str = "CATALOG_ADMIN_";

pub const DEFAULT_CATALOG_URL: &str = "https://api.escuelajs.co/api/v1";

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Config {
    /// Base URL of the product API
    // Kept as a String, `Url` would add a trailing slash.
    pub catalog_url: String,

    /// Endpoint images are uploaded to.
    /// Uploads fail with a hint when unset.
    pub upload_url: Option<Url>,

    /// Bearer token sent with every request
    pub auth_token: Option<String>,

    /// Products shown per page by `list`
    pub page_size: NonZeroU32,

    /// Category assigned to products created without one
    pub category_id: u32,

    /// How long notifications stay visible
    pub toast_ttl_secs: u64,

    /// Directory the user configuration file is read from.
    /// Set by the loader and cannot be changed by the file itself.
    pub config_dir: Option<PathBuf>,
}

impl Config {
    /// Read the configuration from files and environment.
    ///
    /// Sources in increasing precedence:
    ///
    /// 1. built-in defaults
    /// 2. `/etc/catalog-admin.toml`
    /// 3. `catalog-admin.toml` in `$XDG_CONFIG_DIRS` and `$XDG_CONFIG_HOME`
    /// 4. `catalog-admin.toml` in `$CATALOG_ADMIN_CONFIG_DIR`
    /// 5. `CATALOG_ADMIN_*` environment variables
    pub fn parse() -> Result<Config> {
        let env_vars = env::vars()
            .filter_map(|(key, value)| {
                key.strip_prefix(ENV_PREFIX)
                    .map(|key| (key.to_owned(), value))
            })
            .filter(|(key, _)| key != "CONFIG_DIR")
            .collect::<HashMap<_, _>>();

        let raw = read_raw_config(env_vars)?;
        raw.try_deserialize()
            .context("Could not parse catalog-admin configuration")
    }

    /// How long a notification is shown.
    pub fn toast_ttl(&self) -> Duration {
        Duration::from_secs(self.toast_ttl_secs)
    }

    pub fn console_settings(&self) -> ConsoleSettings {
        ConsoleSettings {
            page_size: self.page_size,
            toast_ttl: self.toast_ttl(),
            category_id: self.category_id,
        }
    }
}

fn read_raw_config(env_vars: HashMap<String, String>) -> Result<HierarchicalConfig> {
    let dirs = BaseDirectories::with_prefix(CATALOG_ADMIN_DIR_NAME);

    let config_dir = match env::var(CATALOG_ADMIN_CONFIG_DIR_VAR) {
        Ok(dir) => {
            debug!("`${CATALOG_ADMIN_CONFIG_DIR_VAR}` set: {dir}");
            Some(PathBuf::from(dir))
        },
        Err(_) => {
            let config_dir = dirs.get_config_home();
            debug!("`${CATALOG_ADMIN_CONFIG_DIR_VAR}` not set, using {config_dir:?}");
            config_dir
        },
    };

    let mut builder = HierarchicalConfig::builder()
        .set_default("catalog_url", DEFAULT_CATALOG_URL)?
        .set_default("page_size", 10)?
        .set_default("category_id", 1)?
        .set_default("toast_ttl_secs", 3)?;

    if let Some(config_dir) = &config_dir {
        let config_dir = config_dir
            .to_str()
            .context("Config directory is not valid UTF-8")?;
        // The config file cannot change the config dir.
        builder = builder.set_override("config_dir", config_dir)?;
    }

    // read from /etc
    builder = builder.add_source(
        config::File::from(PathBuf::from("/etc").join(CATALOG_ADMIN_CONFIG_FILE))
            .format(config::FileFormat::Toml)
            .required(false),
    );

    // look for files in XDG_CONFIG_DIRS locations
    for file in dirs.find_config_files(CATALOG_ADMIN_CONFIG_FILE) {
        debug!("reading config file {file:?}");
        builder = builder.add_source(config::File::from(file).format(config::FileFormat::Toml));
    }

    // Add explicit config dir file last
    if let Some(config_dir) = &config_dir {
        builder = builder.add_source(
            config::File::from(config_dir.join(CATALOG_ADMIN_CONFIG_FILE))
                .format(config::FileFormat::Toml)
                .required(false),
        );
    }

    // override via env variables
    let builder = builder.add_source(
        Environment::default()
            .source(Some(env_vars))
            .try_parsing(true),
    );

    Ok(builder.build()?)
}
