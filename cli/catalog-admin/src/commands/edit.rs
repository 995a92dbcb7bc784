use anyhow::Result;
use bpaf::Bpaf;
use product_catalog::mutation::{self, Action, ProductForm};
use product_catalog::{ClientTrait, ProductId};
use tracing::instrument;

use super::Session;
use super::form::{FormArgs, form_args};
use crate::utils::dialog::{Dialog, Spinner};
use crate::utils::message;

// Change fields of a product
//
// Fields that are not given keep their current value.
#[derive(Bpaf, Clone, Debug)]
pub struct Edit {
    #[bpaf(external(form_args))]
    fields: FormArgs,

    /// Id of the product
    #[bpaf(positional("ID"))]
    id: String,
}

impl Edit {
    #[instrument(name = "edit", skip_all, fields(id = %self.id))]
    pub async fn handle(self, session: Session) -> Result<()> {
        let id = ProductId::new(self.id);
        let existing = Dialog {
            message: "Loading product...",
            help_message: None,
            typed: Spinner::new(session.client.get_product(&id)),
        }
        .spin()
        .await?;

        let mut form =
            ProductForm::for_edit(&existing).with_default_category(session.settings.category_id);
        self.fields.fill(&mut form, &session.uploader).await?;

        let product = Dialog {
            message: "Updating product...",
            help_message: None,
            typed: Spinner::new(mutation::update_product(
                &session.client,
                &existing,
                &mut form,
            )),
        }
        .spin()
        .await?;

        message::updated(format!(
            "{} (id {})",
            Action::Update.success_message(),
            product.id
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use product_catalog::client::{RecordedRequest, Response};
    use product_catalog::types::test_helpers::product;
    use product_catalog::{Category, MockClient, ProductPayload};

    use super::*;
    use crate::commands::test_helpers::mock_session;
    use crate::utils::message::history::History;

    #[tokio::test]
    async fn keeps_values_that_are_not_given() {
        let history = History::global();
        history.clear();

        let mut existing = product("7", "Widget");
        existing.category = Some(Category {
            id: 4,
            name: "Shoes".to_string(),
        });
        let mut updated = existing.clone();
        updated.price = "15.00".to_string();

        let client = MockClient::default();
        client.push_response(Response::Product(existing.clone()));
        client.push_response(Response::Product(updated));

        Edit {
            fields: FormArgs::default().with_price("15"),
            id: "7".to_string(),
        }
        .handle(mock_session(&client))
        .await
        .unwrap();

        assert_eq!(client.requests(), vec![
            RecordedRequest::Get(ProductId::new("7")),
            RecordedRequest::Update(ProductId::new("7"), ProductPayload {
                title: "Widget".to_string(),
                price: 15.0,
                description: existing.description.clone(),
                category_id: 4,
                images: existing.images.clone(),
            }),
        ]);
        assert_eq!(history.messages(), [
            "✅ Product updated successfully (id 7)"
        ]);
    }

    #[tokio::test]
    async fn image_url_replaces_images() {
        let client = MockClient::default();
        client.push_response(Response::Product(product("7", "Widget")));
        client.push_response(Response::Product(product("7", "Widget")));

        Edit {
            fields: FormArgs::default().with_image_url("https://images.example.com/new.png"),
            id: "7".to_string(),
        }
        .handle(mock_session(&client))
        .await
        .unwrap();

        let Some(RecordedRequest::Update(_, payload)) = client.requests().pop() else {
            panic!("expected an update request");
        };
        assert_eq!(payload.images, vec![
            "https://images.example.com/new.png".to_string()
        ]);
    }

    #[tokio::test]
    async fn unknown_product_is_not_updated() {
        let client = MockClient::default();
        client.push_error_response(404, "");

        let result = Edit {
            fields: FormArgs::default().with_title("Renamed"),
            id: "99".to_string(),
        }
        .handle(mock_session(&client))
        .await;

        assert!(result.is_err());
        assert_eq!(client.requests(), vec![RecordedRequest::Get(ProductId::new("99"))]);
    }
}
