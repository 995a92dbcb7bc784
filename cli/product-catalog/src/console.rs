//! The coordinating state of a product admin session.
//!
//! [CatalogConsole] owns the listing, the selection, the notifications
//! and the delete confirmation, and exposes the operations a front end
//! triggers from user input.

use std::num::NonZeroU32;
use std::time::Duration;

use tracing::{debug, error, instrument};

use crate::client::ClientTrait;
use crate::mutation::{
    self,
    Action,
    ConfirmedDelete,
    MutationError,
    Navigation,
    PendingDelete,
    ProductForm,
};
use crate::notify::{Toasts, DEFAULT_TOAST_TTL};
use crate::query::{Applied, FetchOutcome, FetchStatus, PendingFetch, QueryState, DEFAULT_PAGE_SIZE};
use crate::selection::Selection;
use crate::types::{Product, ProductId, SearchFilter};
use crate::upload::{ImageFile, ImageUploader, UploadError};

/// Settings of a [CatalogConsole].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleSettings {
    pub page_size: NonZeroU32,
    pub toast_ttl: Duration,
    /// Category of products created without one
    pub category_id: u32,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            toast_ttl: DEFAULT_TOAST_TTL,
            category_id: mutation::DEFAULT_CATEGORY_ID,
        }
    }
}

#[derive(Debug)]
pub struct CatalogConsole<C, U> {
    client: C,
    uploader: U,
    settings: ConsoleSettings,
    query: QueryState,
    selection: Selection,
    toasts: Toasts,
    pending_delete: Option<PendingDelete>,
}

impl<C: ClientTrait, U: ImageUploader> CatalogConsole<C, U> {
    pub fn new(client: C, uploader: U, settings: ConsoleSettings) -> Self {
        Self {
            client,
            uploader,
            query: QueryState::new(settings.page_size),
            selection: Selection::new(),
            toasts: Toasts::new(settings.toast_ttl),
            pending_delete: None,
            settings,
        }
    }

    /// Start at another page and filter, shown by the next fetch.
    pub fn with_view(mut self, page_index: NonZeroU32, filter: SearchFilter) -> Self {
        self.query = QueryState::new(self.settings.page_size)
            .with_page(page_index)
            .with_filter(filter);
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn query(&self) -> &QueryState {
        &self.query
    }

    pub fn products(&self) -> &[Product] {
        self.query.products()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn toasts(&self) -> &Toasts {
        &self.toasts
    }

    pub fn toasts_mut(&mut self) -> &mut Toasts {
        &mut self.toasts
    }

    /// The delete waiting for confirmation, if the dialog is open.
    pub fn pending_delete(&self) -> Option<&PendingDelete> {
        self.pending_delete.as_ref()
    }

    /// A form for a new product.
    pub fn new_form(&self) -> ProductForm {
        ProductForm::new().with_default_category(self.settings.category_id)
    }

    /// Load the current page.
    pub async fn mount(&mut self) -> &FetchStatus {
        self.refresh().await;
        self.query.status()
    }

    /// Show another page. Returns false if it is the page already shown.
    pub async fn go_to_page(&mut self, page_index: NonZeroU32) -> bool {
        if !self.query.set_page(page_index) {
            return false;
        }
        self.refresh().await;
        true
    }

    pub async fn next_page(&mut self) -> bool {
        if !self.query.has_next_page() {
            return false;
        }
        match self.query.page_index().checked_add(1) {
            Some(next) => self.go_to_page(next).await,
            None => false,
        }
    }

    pub async fn previous_page(&mut self) -> bool {
        match NonZeroU32::new(self.query.page_index().get() - 1) {
            Some(previous) => self.go_to_page(previous).await,
            None => false,
        }
    }

    /// Filter by title, starting over at the first page.
    pub async fn search(&mut self, text: &str) -> bool {
        if !self.query.set_filter(SearchFilter::new(text)) {
            return false;
        }
        self.refresh().await;
        true
    }

    /// Fetch the current page again.
    ///
    /// A page past the end stays selected and comes back empty,
    /// see [Self::return_to_last_page].
    #[instrument(skip_all)]
    pub async fn refresh(&mut self) -> Applied {
        let pending = self.begin_refresh();
        let outcome = pending.run(&self.client).await;
        self.apply_fetch(outcome)
    }

    /// Move to the last page if the current one came back empty past the end.
    ///
    /// Returns the page moved to.
    #[instrument(skip_all)]
    pub async fn return_to_last_page(&mut self) -> Option<NonZeroU32> {
        let last_page = self.query.overshot_page()?;
        debug!(
            from = self.query.page_index().get(),
            to = last_page.get(),
            "page past the end, returning to last page"
        );
        self.query.set_page(last_page);
        self.refresh().await;
        Some(last_page)
    }

    /// Refresh after a mutation, which may have emptied the current page.
    async fn refresh_after_change(&mut self) {
        self.refresh().await;
        self.return_to_last_page().await;
    }

    /// Start a fetch to be run outside of the console, see [Self::apply_fetch].
    pub fn begin_refresh(&mut self) -> PendingFetch {
        self.query.begin_fetch()
    }

    /// Install the outcome of a fetch started with [Self::begin_refresh].
    pub fn apply_fetch(&mut self, outcome: FetchOutcome) -> Applied {
        let applied = self.query.apply(outcome);
        if applied == Applied::Current {
            self.selection.clear();
            if let FetchStatus::Failed(message) = self.query.status() {
                error!(%message, "failed to load products");
                self.toasts.error("Failed to load products");
            }
        }
        applied
    }

    /// Flip the checked state of a visible row.
    pub fn toggle_row(&mut self, id: &ProductId) -> Option<bool> {
        self.selection.toggle(id, self.query.visible_ids())
    }

    pub fn toggle_all(&mut self) {
        self.selection.toggle_all(self.query.visible_ids());
    }

    pub fn all_selected(&self) -> bool {
        self.selection.all_selected(self.query.visible_ids())
    }

    /// Fetch a product and prepare a form pre-filled with its values.
    pub async fn load_for_edit(
        &mut self,
        id: &ProductId,
    ) -> Result<(Product, ProductForm), MutationError> {
        match self.client.get_product(id).await {
            Ok(product) => {
                let form = ProductForm::for_edit(&product)
                    .with_default_category(self.settings.category_id);
                Ok((product, form))
            },
            Err(err) => {
                error!(error = %err, %id, "failed to load product");
                self.toasts.error("Failed to load product");
                Err(MutationError::Request(err))
            },
        }
    }

    pub async fn submit_create(&mut self, form: &mut ProductForm) -> Result<Navigation, MutationError> {
        let result = mutation::create_product(&self.client, form).await;
        self.finish(Action::Create, result).await
    }

    pub async fn submit_update(
        &mut self,
        existing: &Product,
        form: &mut ProductForm,
    ) -> Result<Navigation, MutationError> {
        let result = mutation::update_product(&self.client, existing, form).await;
        self.finish(Action::Update, result).await
    }

    /// Upload an image into a form.
    pub async fn attach_image(
        &mut self,
        form: &mut ProductForm,
        image: ImageFile,
    ) -> Result<String, UploadError> {
        match form.attach_image(&self.uploader, image).await {
            Ok(url) => Ok(url),
            Err(err) => {
                error!(error = %err, "image upload failed");
                self.toasts.error("Failed to upload image");
                Err(err)
            },
        }
    }

    /// Open the delete confirmation for a visible product.
    pub fn request_delete(&mut self, id: &ProductId) -> Option<&PendingDelete> {
        let pending = PendingDelete::new(self.query.find(id)?);
        self.pending_delete = Some(pending);
        self.pending_delete.as_ref()
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Delete the product of the open confirmation.
    ///
    /// Returns `Ok(None)` if no confirmation was open.
    pub async fn confirm_delete(&mut self) -> Result<Option<ProductId>, MutationError> {
        let Some(pending) = self.pending_delete.take() else {
            return Ok(None);
        };
        self.delete(pending.confirm()).await.map(Some)
    }

    pub async fn delete(&mut self, confirmed: ConfirmedDelete) -> Result<ProductId, MutationError> {
        let result = mutation::delete_product(&self.client, confirmed).await;
        match result {
            Ok(id) => {
                self.toasts.success(Action::Delete.success_message());
                self.refresh_after_change().await;
                Ok(id)
            },
            Err(err) => {
                self.toasts.error(err.notification(Action::Delete));
                Err(err)
            },
        }
    }

    /// Notify about a create or update and refresh the listing on success.
    async fn finish(
        &mut self,
        action: Action,
        result: Result<Product, MutationError>,
    ) -> Result<Navigation, MutationError> {
        match result {
            Ok(product) => {
                debug!(id = %product.id, ?action, "product saved");
                self.toasts.success(action.success_message());
                self.refresh_after_change().await;
                Ok(Navigation::Listing)
            },
            // shown next to the fields
            Err(err @ MutationError::Validation(_)) => Err(err),
            Err(err) => {
                self.toasts.error(err.notification(action));
                Err(err)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::client::{CatalogClient, MockClient, RecordedRequest, Response};
    use crate::config::CatalogClientConfig;
    use crate::mutation::Field;
    use crate::notify::Level;
    use crate::types::test_helpers::{product, products};
    use crate::types::{PageWindow, ProductQuery};
    use crate::upload::HttpImageUploader;

    type TestConsole = CatalogConsole<MockClient, HttpImageUploader>;

    fn console(client: &MockClient) -> TestConsole {
        CatalogConsole::new(
            client.clone(),
            HttpImageUploader::unconfigured(),
            ConsoleSettings::default(),
        )
    }

    fn page(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).unwrap()
    }

    fn list(offset: u64, filter: &str) -> RecordedRequest {
        RecordedRequest::List(ProductQuery::page(
            PageWindow { offset, limit: 10 },
            filter.into(),
        ))
    }

    fn last_toast(console: &TestConsole) -> (Level, String) {
        let toast = console.toasts().last().expect("a notification");
        (toast.level, toast.message.clone())
    }

    #[tokio::test]
    async fn mount_loads_first_page() {
        let client = MockClient::default();
        client.push_response(Response::Count(23));
        client.push_response(Response::Products(products(1, 10)));

        let mut console = console(&client);
        assert_eq!(console.mount().await, &FetchStatus::Ready);

        assert_eq!(console.products().len(), 10);
        assert_eq!(console.query().total_pages(), 3);
        assert_eq!(client.requests(), vec![
            RecordedRequest::Count(SearchFilter::none()),
            list(0, "")
        ]);
    }

    #[tokio::test]
    async fn paging_moves_window_and_clears_selection() {
        let client = MockClient::default();
        client.push_response(Response::Count(23));
        client.push_response(Response::Products(products(1, 10)));
        client.push_response(Response::Count(23));
        client.push_response(Response::Products(products(11, 10)));
        client.push_response(Response::Count(23));
        client.push_response(Response::Products(products(21, 3)));

        let mut console = console(&client);
        console.mount().await;
        console.toggle_row(&"3".into());
        assert_eq!(console.selection().len(), 1);

        assert!(console.next_page().await);
        assert!(console.selection().is_empty());
        assert!(console.go_to_page(page(3)).await);
        assert!(!console.next_page().await);
        assert_eq!(console.products().len(), 3);

        assert_eq!(client.requests()[5], list(20, ""));
    }

    #[tokio::test]
    async fn previous_page_stops_at_first() {
        let client = MockClient::default();
        let mut console = console(&client);
        assert!(!console.previous_page().await);
        assert!(client.requests().is_empty());
    }

    #[tokio::test]
    async fn search_resets_page() {
        let client = MockClient::default();
        client.push_response(Response::Count(30));
        client.push_response(Response::Products(products(11, 10)));
        client.push_response(Response::Count(1));
        client.push_response(Response::Products(vec![product("12", "Blue shirt")]));

        let mut console = console(&client);
        console.go_to_page(page(2)).await;
        assert!(console.search("  shirt ").await);
        assert!(!console.search("shirt").await);

        assert_eq!(console.query().page_index(), page(1));
        assert_eq!(client.requests()[3], list(0, "shirt"));
    }

    #[tokio::test]
    async fn failed_load_notifies_and_clears() {
        let client = MockClient::default();
        client.push_error_response(503, "unavailable");

        let mut console = console(&client);
        console.mount().await;

        assert!(console.products().is_empty());
        assert!(matches!(console.query().status(), FetchStatus::Failed(_)));
        assert_eq!(last_toast(&console), (Level::Error, "Failed to load products".to_string()));
    }

    #[tokio::test]
    async fn toggle_all_over_visible_rows() {
        let client = MockClient::default();
        client.push_response(Response::Count(2));
        client.push_response(Response::Products(products(1, 2)));

        let mut console = console(&client);
        assert!(!console.all_selected());
        console.toggle_all();
        assert!(!console.all_selected());

        console.mount().await;
        console.toggle_all();
        assert!(console.all_selected());
        assert_eq!(console.toggle_row(&"9".into()), None);
        console.toggle_all();
        assert!(console.selection().is_empty());
    }

    #[tokio::test]
    async fn stale_fetch_is_not_applied() {
        let client = MockClient::default();
        let mut console = console(&client);

        let first = console.begin_refresh();
        let second = console.begin_refresh();

        let outcome = |pending: PendingFetch, title: &str| FetchOutcome {
            token: pending.token,
            result: Ok(crate::query::ProductPage {
                total_matches: 1,
                products: vec![product("1", title)],
            }),
        };

        assert_eq!(console.apply_fetch(outcome(second, "new")), Applied::Current);
        assert_eq!(console.apply_fetch(outcome(first, "old")), Applied::Stale);
        assert_eq!(console.products()[0].title, "new");
    }

    #[tokio::test]
    async fn confirmed_delete_requests_once_then_reloads_same_page() {
        let client = MockClient::default();
        client.push_response(Response::Count(1));
        client.push_response(Response::Products(vec![product("7", "Widget")]));
        client.push_response(Response::Deleted);
        client.push_response(Response::Count(1));
        client.push_response(Response::Products(vec![product("8", "Widget 2")]));

        let mut console = console(&client);
        console.search("Wid").await;

        let pending = console.request_delete(&"7".into()).unwrap();
        assert_eq!(
            pending.prompt(),
            "Are you sure you want to delete the product 'Widget'?"
        );
        let deleted = console.confirm_delete().await.unwrap();

        assert_eq!(deleted, Some("7".into()));
        assert!(console.pending_delete().is_none());
        assert_eq!(client.requests()[2..], [
            RecordedRequest::Delete("7".into()),
            RecordedRequest::Count("Wid".into()),
            list(0, "Wid"),
        ]);
        assert_eq!(
            last_toast(&console),
            (Level::Success, "Product deleted successfully".to_string())
        );
        assert_eq!(console.products()[0].id, ProductId::new("8"));
    }

    #[tokio::test]
    async fn delete_hits_backend_once_and_refetches_page() {
        let server = MockServer::start_async().await;
        let count = server.mock(|when, then| {
            when.method(GET)
                .path("/products")
                .query_param("offset", "0")
                .query_param("limit", "1000");
            then.status(200).json_body(json!([
                { "id": 7, "title": "Widget", "price": 10, "images": [] }
            ]));
        });
        let window = server.mock(|when, then| {
            when.method(GET)
                .path("/products")
                .query_param("offset", "0")
                .query_param("limit", "10");
            then.status(200).json_body(json!([
                { "id": 7, "title": "Widget", "price": 10, "images": [] }
            ]));
        });
        let delete = server.mock(|when, then| {
            when.method(DELETE).path("/products/7");
            then.status(200).json_body(json!(true));
        });

        let client = CatalogClient::new(CatalogClientConfig::new(server.base_url())).unwrap();
        let mut console = CatalogConsole::new(
            client,
            HttpImageUploader::unconfigured(),
            ConsoleSettings::default(),
        );
        console.mount().await;

        console.request_delete(&"7".into());
        console.confirm_delete().await.unwrap();

        delete.assert_hits(1);
        count.assert_hits(2);
        window.assert_hits(2);
    }

    #[tokio::test]
    async fn emptied_last_page_steps_back() {
        let client = MockClient::default();
        client.push_response(Response::Count(11));
        client.push_response(Response::Products(vec![product("11", "Last")]));
        client.push_response(Response::Deleted);
        client.push_response(Response::Count(10));
        client.push_response(Response::Products(vec![]));
        client.push_response(Response::Count(10));
        client.push_response(Response::Products(products(1, 10)));

        let mut console = console(&client);
        console.go_to_page(page(2)).await;
        console.request_delete(&"11".into());
        console.confirm_delete().await.unwrap();

        assert_eq!(console.query().page_index(), page(1));
        assert_eq!(console.products().len(), 10);
        assert_eq!(client.requests().last(), Some(&list(0, "")));
    }

    #[tokio::test]
    async fn page_past_the_end_is_kept_until_asked() {
        let client = MockClient::default();
        client.push_response(Response::Count(12));
        client.push_response(Response::Products(vec![]));
        client.push_response(Response::Count(12));
        client.push_response(Response::Products(products(11, 2)));

        let mut console = console(&client);
        assert!(console.go_to_page(page(5)).await);

        assert_eq!(console.query().page_index(), page(5));
        assert!(console.products().is_empty());
        assert_eq!(console.query().overshot_page(), Some(page(2)));
        assert_eq!(client.requests().len(), 2);

        assert_eq!(console.return_to_last_page().await, Some(page(2)));
        assert_eq!(console.query().page_index(), page(2));
        assert_eq!(console.products().len(), 2);
        assert_eq!(console.return_to_last_page().await, None);
        assert_eq!(client.requests().last(), Some(&list(10, "")));
    }

    #[tokio::test]
    async fn cancelled_delete_sends_nothing() {
        let client = MockClient::default();
        client.push_response(Response::Count(1));
        client.push_response(Response::Products(vec![product("7", "Widget")]));

        let mut console = console(&client);
        console.mount().await;
        assert!(console.request_delete(&"8".into()).is_none());
        console.request_delete(&"7".into());
        console.cancel_delete();

        assert_eq!(console.confirm_delete().await.unwrap(), None);
        assert_eq!(client.requests().len(), 2);
    }

    #[tokio::test]
    async fn failed_delete_notifies() {
        let client = MockClient::default();
        client.push_response(Response::Count(1));
        client.push_response(Response::Products(vec![product("7", "Widget")]));
        client.push_error_response(500, "");

        let mut console = console(&client);
        console.mount().await;
        console.request_delete(&"7".into());
        assert!(console.confirm_delete().await.is_err());

        assert_eq!(
            last_toast(&console),
            (Level::Error, "Failed to delete product".to_string())
        );
        assert_eq!(client.pending_responses(), 0);
        assert_eq!(client.requests().len(), 3);
    }

    #[tokio::test]
    async fn created_product_returns_to_listing() {
        let client = MockClient::default();
        client.push_response(Response::Product(product("31", "Widget")));
        client.push_response(Response::Count(1));
        client.push_response(Response::Products(vec![product("31", "Widget")]));

        let mut console = console(&client);
        let mut form = console.new_form();
        form.set(Field::Title, "Widget");
        form.set(Field::Price, "10");
        form.set(Field::Description, "A widget");
        form.attach_url("https://images.example.com/w.png");

        assert_eq!(console.submit_create(&mut form).await.unwrap(), Navigation::Listing);
        assert_eq!(
            last_toast(&console),
            (Level::Success, "Product created successfully".to_string())
        );
        assert_eq!(console.products().len(), 1);
    }

    #[tokio::test]
    async fn invalid_form_is_not_notified() {
        let client = MockClient::default();
        let mut console = console(&client);
        let mut form = console.new_form();

        let err = console.submit_create(&mut form).await.unwrap_err();
        assert!(matches!(err, MutationError::Validation(_)));
        assert!(console.toasts().is_empty());
        assert_eq!(form.errors().get(Field::Title), Some("Title is required"));
        assert!(client.requests().is_empty());
    }

    #[tokio::test]
    async fn duplicate_title_on_update_has_own_message() {
        let client = MockClient::default();
        let existing = product("7", "Widget");
        client.push_response(Response::Product(existing.clone()));
        client.push_error_response(400, "Product with this title already exists");

        let mut console = console(&client);
        let (existing, mut form) = console.load_for_edit(&"7".into()).await.unwrap();
        form.set(Field::Title, "Gadget");

        let err = console.submit_update(&existing, &mut form).await.unwrap_err();
        assert!(matches!(err, MutationError::DuplicateTitle { .. }));
        assert_eq!(
            last_toast(&console),
            (
                Level::Error,
                "A product with the title 'Gadget' already exists".to_string()
            )
        );
    }

    #[tokio::test]
    async fn failed_upload_notifies() {
        let client = MockClient::default();
        let mut console = console(&client);
        let mut form = console.new_form();

        let err = console
            .attach_image(&mut form, ImageFile::new("a.png", vec![1]))
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::NotConfigured));
        assert!(form.images().is_empty());
        assert_eq!(last_toast(&console), (Level::Error, "Failed to upload image".to_string()));
    }
}
