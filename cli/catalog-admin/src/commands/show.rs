use anyhow::Result;
use bpaf::Bpaf;
use product_catalog::{ClientTrait, ProductId};
use tracing::instrument;

use super::Session;
use crate::utils::dialog::{Dialog, Spinner};
use crate::utils::display::DisplayProduct;

// Show all fields of a product
#[derive(Bpaf, Clone, Debug)]
pub struct Show {
    /// Print the product as JSON
    #[bpaf(long)]
    json: bool,

    /// Id of the product
    #[bpaf(positional("ID"))]
    id: String,
}

impl Show {
    #[instrument(name = "show", skip_all, fields(id = %self.id))]
    pub async fn handle(self, session: Session) -> Result<()> {
        let id = ProductId::new(self.id);
        let product = Dialog {
            message: "Loading product...",
            help_message: None,
            typed: Spinner::new(session.client.get_product(&id)),
        }
        .spin()
        .await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&product)?);
        } else {
            print!("{}", DisplayProduct(&product));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use product_catalog::client::{RecordedRequest, Response};
    use product_catalog::types::test_helpers::product;
    use product_catalog::{CatalogClientError, MockClient};

    use super::*;
    use crate::commands::test_helpers::mock_session;

    #[tokio::test]
    async fn fetches_product_by_id() {
        let client = MockClient::default();
        client.push_response(Response::Product(product("7", "Widget")));

        Show {
            json: true,
            id: "7".to_string(),
        }
        .handle(mock_session(&client))
        .await
        .unwrap();

        assert_eq!(client.requests(), vec![RecordedRequest::Get(ProductId::new("7"))]);
    }

    #[tokio::test]
    async fn missing_product_keeps_client_error() {
        let client = MockClient::default();
        client.push_error_response(404, "not found");

        let err = Show {
            json: false,
            id: "404".to_string(),
        }
        .handle(mock_session(&client))
        .await
        .unwrap_err();

        let client_error = err.downcast_ref::<CatalogClientError>().unwrap();
        assert_eq!(client_error.status().map(|s| s.as_u16()), Some(404));
    }
}
