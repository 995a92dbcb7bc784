//! Creating, editing and deleting products.
//!
//! Forms are validated before any request is made.
//! Rejections by the backend are classified so a duplicate title
//! can be reported differently from other failures.

use std::collections::BTreeMap;
use std::error::Error as _;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::client::ClientTrait;
use crate::error::CatalogClientError;
use crate::types::{Product, ProductId, ProductPayload};
use crate::upload::{ImageFile, ImageUploader, UploadError};

pub const DEFAULT_CATEGORY_ID: u32 = 1;

/// An editable field of a [ProductForm].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Title,
    Price,
    Description,
    CategoryId,
    Images,
}

impl Field {
    /// Name shown next to the field and in its messages.
    pub fn label(&self) -> &'static str {
        match self {
            Field::Title => "Title",
            Field::Price => "Price",
            Field::Description => "Description",
            Field::CategoryId => "Category",
            Field::Images => "Image",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Title => "title",
            Field::Price => "price",
            Field::Description => "description",
            Field::CategoryId => "categoryId",
            Field::Images => "images",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown form field '{0}'")]
pub struct UnknownField(String);

impl FromStr for Field {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "title" => Ok(Field::Title),
            "price" => Ok(Field::Price),
            "description" => Ok(Field::Description),
            "categoryId" | "category_id" | "category" => Ok(Field::CategoryId),
            "images" | "image" => Ok(Field::Images),
            other => Err(UnknownField(other.to_string())),
        }
    }
}

/// Messages of the fields that failed validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(BTreeMap<Field, String>);

impl ValidationErrors {
    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }

    fn insert(&mut self, field: Field, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    fn remove(&mut self, field: Field) {
        self.0.remove(&field);
    }

    fn required(&mut self, field: Field) {
        self.insert(field, format!("{} is required", field.label()));
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (_, message) in self.iter() {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{message}")?;
            first = false;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum MutationError {
    #[error("invalid product: {0}")]
    Validation(ValidationErrors),
    #[error("a product titled '{title}' already exists")]
    DuplicateTitle { title: String },
    #[error("request to the product API failed")]
    Request(#[source] CatalogClientError),
    #[error("{0}")]
    Unknown(String),
}

impl MutationError {
    /// Classify a failed request for a product titled `title`.
    fn from_client_error(err: CatalogClientError, title: Option<&str>) -> Self {
        if err.is_unique_violation() {
            return MutationError::DuplicateTitle {
                title: title.unwrap_or_default().to_string(),
            };
        }
        match err {
            CatalogClientError::Status { .. } | CatalogClientError::Transport(_) => {
                MutationError::Request(err)
            },
            other => {
                let mut message = other.to_string();
                let mut source = other.source();
                while let Some(cause) = source {
                    message.push_str(&format!(": {cause}"));
                    source = cause.source();
                }
                MutationError::Unknown(message)
            },
        }
    }

    /// The notification text for a failed `action`.
    pub fn notification(&self, action: Action) -> String {
        match self {
            MutationError::Validation(_) => "Please fill in all required fields".to_string(),
            MutationError::DuplicateTitle { title } => {
                format!("A product with the title '{title}' already exists")
            },
            MutationError::Request(_) | MutationError::Unknown(_) => {
                format!("Failed to {} product", action.verb())
            },
        }
    }
}

/// The kind of change made to a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Update,
    Delete,
}

impl Action {
    fn verb(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }

    pub fn success_message(&self) -> &'static str {
        match self {
            Action::Create => "Product created successfully",
            Action::Update => "Product updated successfully",
            Action::Delete => "Product deleted successfully",
        }
    }
}

/// Where to go after a successful change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// Back to the product listing
    Listing,
}

/// How a form is validated.
#[derive(Debug, Clone, Copy)]
pub enum FormMode<'a> {
    /// Every required field must be filled in.
    Create,
    /// Blank fields keep the values of the product being edited.
    Edit(&'a Product),
}

/// Field values of a product being created or edited.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductForm {
    title: String,
    price: String,
    description: String,
    category_id: String,
    images: Vec<String>,
    default_category_id: Option<u32>,
    errors: ValidationErrors,
}

impl ProductForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// A form pre-filled with the values of an existing product.
    pub fn for_edit(product: &Product) -> Self {
        Self {
            title: product.title.clone(),
            price: product.price.clone(),
            description: product.description.clone(),
            category_id: product
                .category_id()
                .map(|id| id.to_string())
                .unwrap_or_default(),
            images: product.images.clone(),
            ..Self::default()
        }
    }

    /// The category used when the form leaves it blank.
    pub fn with_default_category(mut self, category_id: u32) -> Self {
        self.default_category_id = Some(category_id);
        self
    }

    pub fn value(&self, field: Field) -> &str {
        match field {
            Field::Title => &self.title,
            Field::Price => &self.price,
            Field::Description => &self.description,
            Field::CategoryId => &self.category_id,
            Field::Images => "",
        }
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    /// Set a field and clear its error.
    ///
    /// Setting [Field::Images] replaces the images with the given URL.
    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();
        match field {
            Field::Title => self.title = value,
            Field::Price => self.price = value,
            Field::Description => self.description = value,
            Field::CategoryId => self.category_id = value,
            Field::Images => self.images = vec![value],
        }
        self.errors.remove(field);
    }

    /// Set a field by its name, e.g. `"title"`.
    pub fn set_by_name(&mut self, name: &str, value: impl Into<String>) -> Result<(), UnknownField> {
        let field = name.parse()?;
        self.set(field, value);
        Ok(())
    }

    /// Add an already hosted image.
    pub fn attach_url(&mut self, url: impl Into<String>) {
        self.images.push(url.into());
        self.errors.remove(Field::Images);
    }

    pub fn clear_images(&mut self) {
        self.images.clear();
    }

    /// Upload an image and add its URL.
    ///
    /// The form stays borrowed until the upload finished,
    /// so a form has at most one upload in flight.
    pub async fn attach_image(
        &mut self,
        uploader: &impl ImageUploader,
        image: ImageFile,
    ) -> Result<String, UploadError> {
        let url = uploader.upload(image).await?;
        self.attach_url(url.clone());
        Ok(url)
    }

    /// Check the form and build the request body.
    pub fn validate(&self, mode: FormMode<'_>) -> Result<ProductPayload, ValidationErrors> {
        let existing = match mode {
            FormMode::Create => None,
            FormMode::Edit(product) => Some(product),
        };
        let mut errors = ValidationErrors::default();

        let title = filled_or(&self.title, existing.map(|p| p.title.as_str()));
        if title.is_none() {
            errors.required(Field::Title);
        }

        let price = match filled_or(&self.price, existing.map(|p| p.price.as_str())) {
            None => {
                errors.required(Field::Price);
                None
            },
            Some(text) => {
                let price = parse_price(text);
                if price.is_none() {
                    errors.insert(Field::Price, "Price must be a valid number");
                }
                price
            },
        };

        let description = filled_or(&self.description, existing.map(|p| p.description.as_str()));
        if description.is_none() && existing.is_none() {
            errors.required(Field::Description);
        }

        let category_id = match self.category_id.trim() {
            "" => Some(
                existing
                    .and_then(|product| product.category_id())
                    .or(self.default_category_id)
                    .unwrap_or(DEFAULT_CATEGORY_ID),
            ),
            text => {
                let id = text.parse::<u32>().ok();
                if id.is_none() {
                    errors.insert(Field::CategoryId, "Category must be a valid number");
                }
                id
            },
        };

        let images = match existing {
            _ if !self.images.is_empty() => self.images.clone(),
            Some(product) => product.images.clone(),
            None => {
                errors.required(Field::Images);
                Vec::new()
            },
        };

        match (title, price, category_id) {
            (Some(title), Some(price), Some(category_id)) if errors.is_empty() => {
                Ok(ProductPayload {
                    title: title.to_string(),
                    price,
                    description: description.unwrap_or_default().to_string(),
                    category_id,
                    images,
                })
            },
            _ => Err(errors),
        }
    }

    /// Validate and remember the errors for display next to the fields.
    pub fn check(&mut self, mode: FormMode<'_>) -> Result<ProductPayload, MutationError> {
        match self.validate(mode) {
            Ok(payload) => {
                self.errors = ValidationErrors::default();
                Ok(payload)
            },
            Err(errors) => {
                debug!(%errors, "product form is invalid");
                self.errors = errors.clone();
                Err(MutationError::Validation(errors))
            },
        }
    }
}

/// The trimmed value, or the fallback if the value is blank.
fn filled_or<'a>(value: &'a str, fallback: Option<&'a str>) -> Option<&'a str> {
    let value = value.trim();
    if !value.is_empty() {
        return Some(value);
    }
    fallback.map(str::trim).filter(|fallback| !fallback.is_empty())
}

fn parse_price(text: &str) -> Option<f64> {
    text.parse::<f64>()
        .ok()
        .filter(|price| price.is_finite() && *price >= 0.0)
}

/// Validate the form and create a product from it.
#[instrument(skip_all)]
pub async fn create_product(
    client: &impl ClientTrait,
    form: &mut ProductForm,
) -> Result<Product, MutationError> {
    let payload = form.check(FormMode::Create)?;
    client.create_product(&payload).await.map_err(|err| {
        warn!(error = %err, title = %payload.title, "creating product failed");
        MutationError::from_client_error(err, Some(&payload.title))
    })
}

/// Validate the form and apply it to `existing`.
#[instrument(skip_all, fields(id = %existing.id))]
pub async fn update_product(
    client: &impl ClientTrait,
    existing: &Product,
    form: &mut ProductForm,
) -> Result<Product, MutationError> {
    let payload = form.check(FormMode::Edit(existing))?;
    client
        .update_product(&existing.id, &payload)
        .await
        .map_err(|err| {
            warn!(error = %err, title = %payload.title, "updating product failed");
            MutationError::from_client_error(err, Some(&payload.title))
        })
}

/// A delete waiting for the user's confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDelete {
    id: ProductId,
    title: String,
}

impl PendingDelete {
    pub fn new(product: &Product) -> Self {
        Self {
            id: product.id.clone(),
            title: product.title.clone(),
        }
    }

    pub fn id(&self) -> &ProductId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn prompt(&self) -> String {
        format!(
            "Are you sure you want to delete the product '{}'?",
            self.title
        )
    }

    pub fn confirm(self) -> ConfirmedDelete {
        ConfirmedDelete {
            id: self.id,
            title: self.title,
        }
    }
}

/// A delete the user agreed to, only obtainable through [PendingDelete::confirm].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedDelete {
    id: ProductId,
    title: String,
}

impl ConfirmedDelete {
    pub fn id(&self) -> &ProductId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}

#[instrument(skip_all, fields(id = %confirmed.id))]
pub async fn delete_product(
    client: &impl ClientTrait,
    confirmed: ConfirmedDelete,
) -> Result<ProductId, MutationError> {
    match client.delete_product(&confirmed.id).await {
        Ok(()) => Ok(confirmed.id),
        Err(err) => {
            warn!(error = %err, "deleting product failed");
            Err(MutationError::from_client_error(err, Some(&confirmed.title)))
        },
    }
}
