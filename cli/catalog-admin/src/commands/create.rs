use anyhow::Result;
use bpaf::Bpaf;
use product_catalog::mutation::{self, Action};
use tracing::instrument;

use super::Session;
use super::form::{FormArgs, form_args};
use crate::utils::dialog::{Dialog, Spinner};
use crate::utils::message;

// Create a product
#[derive(Bpaf, Clone, Debug)]
pub struct Create {
    #[bpaf(external(form_args))]
    fields: FormArgs,
}

impl Create {
    #[instrument(name = "create", skip_all)]
    pub async fn handle(self, session: Session) -> Result<()> {
        let mut form = mutation::ProductForm::new().with_default_category(session.settings.category_id);
        self.fields.fill(&mut form, &session.uploader).await?;

        let product = Dialog {
            message: "Creating product...",
            help_message: None,
            typed: Spinner::new(mutation::create_product(&session.client, &mut form)),
        }
        .spin()
        .await?;

        message::created(format!(
            "{} (id {})",
            Action::Create.success_message(),
            product.id
        ));
        Ok(())
    }
}
