//! Client and session state for administering a product catalog REST API.
//!
//! This crate provides:
//! - A typed HTTP client for the `/products` endpoints, and a mock client
//! - Paginated, searchable listings with last-request-wins fetch ordering
//! - Form validation and create, update and delete of products
//! - Row selection, notifications and image upload
//! - [CatalogConsole], which ties the above together for a front end
//!
//! ## Usage
//!
//! ```ignore
//! use product_catalog::{
//!     CatalogClient, CatalogClientConfig, CatalogConsole, ConsoleSettings, HttpImageUploader,
//! };
//!
//! let client = CatalogClient::new(CatalogClientConfig::new("https://api.escuelajs.co/api/v1"))?;
//! let mut console = CatalogConsole::new(client, HttpImageUploader::unconfigured(), ConsoleSettings::default());
//! console.mount().await;
//! for product in console.products() {
//!     println!("{} {}", product.id, product.title);
//! }
//! ```

pub mod client;
mod config;
pub mod console;
mod error;
pub mod mutation;
pub mod notify;
pub mod query;
pub mod selection;
pub mod types;
pub mod upload;

pub use client::{CatalogClient, Client, ClientTrait, MockClient};
pub use config::CatalogClientConfig;
pub use console::{CatalogConsole, ConsoleSettings};
pub use error::CatalogClientError;
pub use types::{Category, Product, ProductId, ProductPayload, SearchFilter};
pub use upload::{HttpImageUploader, ImageFile, ImageUploader};
