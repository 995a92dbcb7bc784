//! Records exchanged with the product API.

use std::fmt;

use derive_more::{Deref, Display};
use serde::{Deserialize, Deserializer, Serialize};

/// Identifier of a product as assigned by the backend.
///
/// The backend may send identifiers as JSON numbers or strings,
/// both are kept as their decimal text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Deref, Serialize)]
pub struct ProductId(String);

impl ProductId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ProductId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ProductId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for ProductId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        number_or_string(deserializer).map(ProductId)
    }
}

/// A catalog record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    /// Price as sent by the backend, kept as text.
    #[serde(deserialize_with = "number_or_string")]
    pub price: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}

impl Product {
    /// The image shown next to the product in listings.
    pub fn thumbnail(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    pub fn category_id(&self) -> Option<u32> {
        self.category.as_ref().map(|category| category.id)
    }
}

/// The category a product belongs to, as embedded in product responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: u32,
    #[serde(default)]
    pub name: String,
}

/// Body of `POST /products` and `PUT /products/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPayload {
    pub title: String,
    pub price: f64,
    pub description: String,
    pub category_id: u32,
    pub images: Vec<String>,
}

/// Free text matched against product titles.
///
/// Surrounding whitespace is ignored and a blank filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchFilter(Option<String>);

impl SearchFilter {
    pub fn new(text: impl AsRef<str>) -> Self {
        let trimmed = text.as_ref().trim();
        if trimmed.is_empty() {
            Self(None)
        } else {
            Self(Some(trimmed.to_string()))
        }
    }

    pub fn none() -> Self {
        Self(None)
    }

    pub fn title(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }
}

impl fmt::Display for SearchFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title().unwrap_or(""))
    }
}

impl From<&str> for SearchFilter {
    fn from(value: &str) -> Self {
        SearchFilter::new(value)
    }
}

/// The `(offset, limit)` slice of the result set requested for one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageWindow {
    pub offset: u64,
    pub limit: u32,
}

/// Parameters of a windowed `GET /products` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductQuery {
    pub window: Option<PageWindow>,
    pub filter: SearchFilter,
}

impl ProductQuery {
    pub fn page(window: PageWindow, filter: SearchFilter) -> Self {
        Self {
            window: Some(window),
            filter,
        }
    }

    /// Query parameters in the order the API documents them.
    pub(crate) fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::with_capacity(3);
        if let Some(window) = self.window {
            params.push(("offset", window.offset.to_string()));
            params.push(("limit", window.limit.to_string()));
        }
        if let Some(title) = self.filter.title() {
            params.push(("title", title.to_string()));
        }
        params
    }
}

/// Accept a JSON number or string and keep its text.
fn number_or_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(serde_json::Number),
        String(String),
    }

    Ok(match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => n.to_string(),
        NumberOrString::String(s) => s,
    })
}

#[cfg(any(test, feature = "tests"))]
pub mod test_helpers {
    use super::*;

    /// A product with a single image and a price derived from its id.
    pub fn product(id: impl Into<String>, title: impl Into<String>) -> Product {
        let id = id.into();
        Product {
            price: format!("{}.00", id.len() * 10),
            images: vec![format!("https://images.example.com/{id}.png")],
            description: "A fine product".to_string(),
            category: None,
            title: title.into(),
            id: ProductId::new(id),
        }
    }

    /// `count` products with consecutive ids starting at `first_id`.
    pub fn products(first_id: usize, count: usize) -> Vec<Product> {
        (first_id..first_id + count)
            .map(|id| product(id.to_string(), format!("Product {id}")))
            .collect()
    }
}
