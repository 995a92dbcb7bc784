use std::num::NonZeroU32;

use anyhow::{Result, bail};
use bpaf::Bpaf;
use product_catalog::SearchFilter;
use product_catalog::query::FetchStatus;
use tracing::instrument;

use super::Session;
use crate::utils::dialog::{Dialog, Spinner};
use crate::utils::display::{DisplayPageSummary, DisplayProducts};
use crate::utils::message;

// List products page by page
#[derive(Bpaf, Clone, Debug)]
pub struct List {
    /// Page to show, starting at 1
    #[bpaf(long, short, argument("PAGE"), fallback(NonZeroU32::MIN))]
    page: NonZeroU32,

    /// Only show products whose title contains SEARCH
    #[bpaf(long, short, argument("SEARCH"))]
    search: Option<String>,

    /// Print the products of the page as JSON
    #[bpaf(long)]
    json: bool,
}

impl List {
    #[instrument(name = "list", skip_all, fields(page = self.page.get()))]
    pub async fn handle(self, session: Session) -> Result<()> {
        let filter = SearchFilter::new(self.search.as_deref().unwrap_or_default());
        let mut console = session.console().with_view(self.page, filter);

        let status = Dialog {
            message: "Loading products...",
            help_message: None,
            typed: Spinner::new(console.mount()),
        }
        .spin()
        .await
        .clone();

        if let FetchStatus::Failed(reason) = status {
            bail!("Failed to load products: {reason}");
        }

        if let Some(last_page) = console.query().overshot_page() {
            message::warning(format!(
                "Page {} does not exist, showing page {last_page} instead",
                self.page
            ));
            let status = Dialog {
                message: "Loading products...",
                help_message: None,
                typed: Spinner::new(async {
                    console.return_to_last_page().await;
                    console.query().status().clone()
                }),
            }
            .spin()
            .await;

            if let FetchStatus::Failed(reason) = status {
                bail!("Failed to load products: {reason}");
            }
        }

        let query = console.query();
        if self.json {
            println!("{}", serde_json::to_string_pretty(query.products())?);
            return Ok(());
        }

        if query.products().is_empty() {
            match query.filter().title() {
                Some(title) => message::plain(format!("No products matching '{title}'")),
                None => message::plain("No products found"),
            }
            return Ok(());
        }

        print!("{}", DisplayProducts(query.products()));
        message::plain(DisplayPageSummary(query));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use product_catalog::client::{RecordedRequest, Response};
    use product_catalog::types::test_helpers::products;
    use product_catalog::types::{PageWindow, ProductQuery};
    use product_catalog::MockClient;

    use super::*;
    use crate::commands::test_helpers::mock_session;
    use crate::utils::message::history::History;

    fn list(page: u32, search: Option<&str>) -> List {
        List {
            page: NonZeroU32::new(page).unwrap(),
            search: search.map(str::to_string),
            json: false,
        }
    }

    #[tokio::test]
    async fn lists_requested_page() {
        let history = History::global();
        history.clear();

        let client = MockClient::default();
        client.push_response(Response::Count(23));
        client.push_response(Response::Products(products(11, 10)));

        list(2, Some(" shirt ")).handle(mock_session(&client)).await.unwrap();

        assert_eq!(client.requests(), vec![
            RecordedRequest::Count("shirt".into()),
            RecordedRequest::List(ProductQuery::page(
                PageWindow { offset: 10, limit: 10 },
                "shirt".into()
            )),
        ]);
        assert_eq!(history.messages(), [
            "Page 2 of 3 (23 products matching 'shirt')"
        ]);
    }

    #[tokio::test]
    async fn no_matches_skips_listing() {
        let history = History::global();
        history.clear();

        let client = MockClient::default();
        client.push_response(Response::Count(0));

        list(1, Some("nothing")).handle(mock_session(&client)).await.unwrap();

        assert_eq!(client.requests(), vec![RecordedRequest::Count("nothing".into())]);
        assert_eq!(history.messages(), ["No products matching 'nothing'"]);
    }

    #[tokio::test]
    async fn page_past_the_end_shows_last_page() {
        let history = History::global();
        history.clear();

        let client = MockClient::default();
        client.push_response(Response::Count(12));
        client.push_response(Response::Products(vec![]));
        client.push_response(Response::Count(12));
        client.push_response(Response::Products(products(11, 2)));

        list(5, None).handle(mock_session(&client)).await.unwrap();

        assert_eq!(history.messages(), [
            "⚠️  Page 5 does not exist, showing page 2 instead",
            "Page 2 of 2 (12 products)",
        ]);
    }

    #[tokio::test]
    async fn page_past_the_end_fails_when_reload_fails() {
        let history = History::global();
        history.clear();

        let client = MockClient::default();
        client.push_response(Response::Count(12));
        client.push_response(Response::Products(vec![]));
        client.push_error_response(500, "boom");

        let err = list(5, None).handle(mock_session(&client)).await.unwrap_err();

        assert!(err.to_string().starts_with("Failed to load products"));
        assert_eq!(history.messages(), [
            "⚠️  Page 5 does not exist, showing page 2 instead"
        ]);
    }

    #[tokio::test]
    async fn failed_fetch_is_an_error() {
        let client = MockClient::default();
        client.push_error_response(500, "boom");

        let err = list(1, None).handle(mock_session(&client)).await.unwrap_err();
        assert!(err.to_string().starts_with("Failed to load products"));
    }
}
