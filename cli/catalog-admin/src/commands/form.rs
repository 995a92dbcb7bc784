use std::path::PathBuf;

use anyhow::Result;
use bpaf::Bpaf;
use product_catalog::mutation::{Field, ProductForm};
use product_catalog::{ImageFile, ImageUploader};
use tracing::debug;

use crate::utils::dialog::{Dialog, Spinner};

// Field values given on the command line
#[derive(Bpaf, Clone, Debug, Default)]
pub struct FormArgs {
    /// Title of the product, must be unique
    #[bpaf(long, argument("TITLE"))]
    title: Option<String>,

    /// Price of the product, e.g. 12.50
    #[bpaf(long, argument("PRICE"))]
    price: Option<String>,

    /// Description of the product
    #[bpaf(long, argument("DESCRIPTION"))]
    description: Option<String>,

    /// Numeric id of the product category
    #[bpaf(long("category-id"), argument("ID"))]
    category_id: Option<String>,

    /// Upload an image file and attach it, may be repeated
    #[bpaf(long("image"), argument("PATH"), many)]
    images: Vec<PathBuf>,

    /// Attach an already hosted image, may be repeated
    #[bpaf(long("image-url"), argument("URL"), many)]
    image_urls: Vec<String>,
}

impl FormArgs {
    /// Copy the given values into `form`.
    ///
    /// Given images replace the images already in the form.
    /// Image files are uploaded one after the other.
    pub async fn fill(self, form: &mut ProductForm, uploader: &impl ImageUploader) -> Result<()> {
        let fields = [
            (Field::Title, self.title),
            (Field::Price, self.price),
            (Field::Description, self.description),
            (Field::CategoryId, self.category_id),
        ];
        for (field, value) in fields {
            if let Some(value) = value {
                form.set(field, value);
            }
        }

        if self.images.is_empty() && self.image_urls.is_empty() {
            return Ok(());
        }
        form.clear_images();

        for url in self.image_urls {
            form.attach_url(url);
        }

        for path in self.images {
            let image = ImageFile::read(&path)?;
            let message = format!("Uploading '{}'...", image.file_name);
            let url = Dialog {
                message: &message,
                help_message: None,
                typed: Spinner::new(form.attach_image(uploader, image)),
            }
            .spin()
            .await?;
            debug!(path = %path.display(), %url, "attached uploaded image");
        }

        Ok(())
    }
}

#[cfg(test)]
impl FormArgs {
    pub(crate) fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub(crate) fn with_price(mut self, price: &str) -> Self {
        self.price = Some(price.to_string());
        self
    }

    pub(crate) fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub(crate) fn with_image_url(mut self, url: &str) -> Self {
        self.image_urls.push(url.to_string());
        self
    }

    pub(crate) fn with_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.images.push(path.into());
        self
    }
}
