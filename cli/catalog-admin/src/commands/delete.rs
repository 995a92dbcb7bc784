use anyhow::{Result, bail};
use bpaf::Bpaf;
use product_catalog::mutation::{self, Action, PendingDelete};
use product_catalog::{ClientTrait, ProductId};
use tracing::instrument;

use super::Session;
use crate::utils::dialog::{Confirm, Dialog, Spinner};
use crate::utils::message;

// Delete a product
#[derive(Bpaf, Clone, Debug)]
pub struct Delete {
    /// Delete the product without confirmation
    #[bpaf(short, long)]
    yes: bool,

    /// Id of the product
    #[bpaf(positional("ID"))]
    id: String,
}

impl Delete {
    #[instrument(name = "delete", skip_all, fields(id = %self.id))]
    pub async fn handle(self, session: Session) -> Result<()> {
        let id = ProductId::new(self.id);
        let product = session.client.get_product(&id).await?;
        let pending = PendingDelete::new(&product);

        if !self.yes {
            if !Dialog::can_prompt() {
                bail!(
                    "Can't ask for confirmation to delete '{}', use '--yes' to delete without confirmation",
                    pending.title()
                );
            }

            let prompt = pending.prompt();
            let confirm = Dialog {
                message: &prompt,
                help_message: Some("Use `--yes` to skip this confirmation"),
                typed: Confirm {
                    default: Some(false),
                },
            };
            if !confirm.prompt().await? {
                message::plain(format!("Product '{}' was not deleted", pending.title()));
                return Ok(());
            }
        }

        let deleted = Dialog {
            message: "Deleting product...",
            help_message: None,
            typed: Spinner::new(mutation::delete_product(&session.client, pending.confirm())),
        }
        .spin()
        .await?;

        message::deleted(format!(
            "{} (id {deleted})",
            Action::Delete.success_message()
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use product_catalog::client::{RecordedRequest, Response};
    use product_catalog::mutation::MutationError;
    use product_catalog::types::test_helpers::product;
    use product_catalog::MockClient;
    use serial_test::serial;

    use super::*;
    use crate::commands::test_helpers::mock_session;
    use crate::utils::dialog::NO_PROMPT_VAR;
    use crate::utils::message::history::History;

    #[tokio::test]
    async fn deletes_with_yes() {
        let history = History::global();
        history.clear();

        let client = MockClient::default();
        client.push_response(Response::Product(product("7", "Widget")));
        client.push_response(Response::Deleted);

        Delete {
            yes: true,
            id: "7".to_string(),
        }
        .handle(mock_session(&client))
        .await
        .unwrap();

        assert_eq!(client.requests(), vec![
            RecordedRequest::Get(ProductId::new("7")),
            RecordedRequest::Delete(ProductId::new("7")),
        ]);
        assert_eq!(history.messages(), [
            "🗑️  Product deleted successfully (id 7)"
        ]);
    }

    #[tokio::test]
    #[serial]
    async fn refuses_without_confirmation() {
        let client = MockClient::default();
        client.push_response(Response::Product(product("7", "Widget")));

        let result = temp_env::async_with_vars(
            [(NO_PROMPT_VAR, Some("1"))],
            Delete {
                yes: false,
                id: "7".to_string(),
            }
            .handle(mock_session(&client)),
        )
        .await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("--yes"));
        assert_eq!(client.requests(), vec![RecordedRequest::Get(ProductId::new("7"))]);
    }

    #[tokio::test]
    async fn failed_delete_is_reported() {
        let client = MockClient::default();
        client.push_response(Response::Product(product("7", "Widget")));
        client.push_error_response(500, "database unavailable");

        let err = Delete {
            yes: true,
            id: "7".to_string(),
        }
        .handle(mock_session(&client))
        .await
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<MutationError>(),
            Some(MutationError::Request(_))
        ));
    }
}
