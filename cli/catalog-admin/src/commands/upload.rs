use std::path::PathBuf;

use anyhow::Result;
use bpaf::Bpaf;
use product_catalog::{ImageFile, ImageUploader};
use tracing::instrument;

use super::Session;
use crate::utils::dialog::{Dialog, Spinner};

// Upload an image and print its URL
#[derive(Bpaf, Clone, Debug)]
pub struct Upload {
    /// Image file to upload
    #[bpaf(positional("PATH"))]
    path: PathBuf,
}

impl Upload {
    #[instrument(name = "upload", skip_all, fields(path = %self.path.display()))]
    pub async fn handle(self, session: Session) -> Result<()> {
        let image = ImageFile::read(&self.path)?;
        let message = format!("Uploading '{}'...", image.file_name);
        let url = Dialog {
            message: &message,
            help_message: None,
            typed: Spinner::new(session.uploader.upload(image)),
        }
        .spin()
        .await?;

        println!("{url}");
        Ok(())
    }
}
