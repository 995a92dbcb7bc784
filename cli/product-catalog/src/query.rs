//! Pagination and search bookkeeping for the product listing.
//!
//! A fetch happens in three steps so overlapping fetches can be ordered:
//!
//! 1. [QueryState::begin_fetch] snapshots the page parameters and
//!    hands out a new [RequestToken].
//! 2. [PendingFetch::run] performs the count and window requests
//!    without borrowing the state.
//! 3. [QueryState::apply] installs the outcome, unless a newer fetch
//!    has been started in the meantime.

use std::num::NonZeroU32;

use tracing::{debug, warn};

use crate::client::ClientTrait;
use crate::error::CatalogClientError;
use crate::types::{PageWindow, Product, ProductId, ProductQuery, SearchFilter};

pub const DEFAULT_PAGE_SIZE: NonZeroU32 = NonZeroU32::new(10).unwrap();
pub const FIRST_PAGE: NonZeroU32 = NonZeroU32::MIN;

impl PageWindow {
    /// The window of a 1-based page index.
    pub fn for_page(page_index: NonZeroU32, page_size: NonZeroU32) -> Self {
        let offset = u64::from(page_index.get() - 1) * u64::from(page_size.get());
        PageWindow {
            offset,
            limit: page_size.get(),
        }
    }
}

/// Number of pages needed to show `total_matches` records.
pub fn total_pages(total_matches: u64, page_size: NonZeroU32) -> u32 {
    let pages = total_matches.div_ceil(u64::from(page_size.get()));
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// Identifies a fetch, later fetches carry larger tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RequestToken(u64);

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FetchStatus {
    /// Nothing has been requested yet
    #[default]
    Idle,
    Loading,
    Ready,
    Failed(String),
}

/// Whether [QueryState::apply] installed an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The outcome replaced the result set.
    Current,
    /// A newer fetch was started, the outcome was discarded.
    Stale,
}

/// The state of a paginated, searchable product listing.
#[derive(Debug, Clone)]
pub struct QueryState {
    page_index: NonZeroU32,
    page_size: NonZeroU32,
    filter: SearchFilter,

    total_matches: u64,
    total_pages: u32,
    products: Vec<Product>,
    status: FetchStatus,

    latest_token: RequestToken,
    applied_token: Option<RequestToken>,
}

impl Default for QueryState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl QueryState {
    pub fn new(page_size: NonZeroU32) -> Self {
        Self {
            page_index: FIRST_PAGE,
            page_size,
            filter: SearchFilter::none(),
            total_matches: 0,
            total_pages: 0,
            products: Vec::new(),
            status: FetchStatus::Idle,
            latest_token: RequestToken::default(),
            applied_token: None,
        }
    }

    pub fn with_page(mut self, page_index: NonZeroU32) -> Self {
        self.page_index = page_index;
        self
    }

    pub fn with_filter(mut self, filter: SearchFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn page_index(&self) -> NonZeroU32 {
        self.page_index
    }

    pub fn page_size(&self) -> NonZeroU32 {
        self.page_size
    }

    pub fn filter(&self) -> &SearchFilter {
        &self.filter
    }

    pub fn total_matches(&self) -> u64 {
        self.total_matches
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    /// The result set of the last applied fetch.
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn status(&self) -> &FetchStatus {
        &self.status
    }

    pub fn is_loading(&self) -> bool {
        self.status == FetchStatus::Loading
    }

    pub fn window(&self) -> PageWindow {
        PageWindow::for_page(self.page_index, self.page_size)
    }

    pub fn visible_ids(&self) -> impl Iterator<Item = &ProductId> {
        self.products.iter().map(|product| &product.id)
    }

    pub fn find(&self, id: &ProductId) -> Option<&Product> {
        self.products.iter().find(|product| &product.id == id)
    }

    pub fn has_previous_page(&self) -> bool {
        self.page_index > FIRST_PAGE
    }

    pub fn has_next_page(&self) -> bool {
        self.page_index.get() < self.total_pages
    }

    /// Move to another page, returns whether the page changed.
    pub fn set_page(&mut self, page_index: NonZeroU32) -> bool {
        let changed = self.page_index != page_index;
        self.page_index = page_index;
        changed
    }

    /// Change the search filter and return to the first page,
    /// returns whether the filter changed.
    pub fn set_filter(&mut self, filter: SearchFilter) -> bool {
        if self.filter == filter {
            return false;
        }
        self.filter = filter;
        self.page_index = FIRST_PAGE;
        true
    }

    /// The last page that has records, if any.
    ///
    /// Used to step back after the current page ran empty, e.g. after
    /// deleting the only record on the last page.
    pub fn overshot_page(&self) -> Option<NonZeroU32> {
        if !self.products.is_empty() || self.status != FetchStatus::Ready {
            return None;
        }
        let last_page = NonZeroU32::new(self.total_pages)?;
        (self.page_index > last_page).then_some(last_page)
    }

    /// Start a fetch of the current page and filter.
    ///
    /// Any fetch started earlier becomes stale.
    pub fn begin_fetch(&mut self) -> PendingFetch {
        self.latest_token = RequestToken(self.latest_token.0 + 1);
        self.status = FetchStatus::Loading;
        debug!(
            token = self.latest_token.0,
            page = self.page_index.get(),
            filter = %self.filter,
            "starting product fetch"
        );
        PendingFetch {
            token: self.latest_token,
            page_index: self.page_index,
            page_size: self.page_size,
            filter: self.filter.clone(),
        }
    }

    /// Install the outcome of a fetch if it is the latest one started.
    ///
    /// A failed fetch clears the result set,
    /// so records of a previous filter are never shown under a new one.
    pub fn apply(&mut self, outcome: FetchOutcome) -> Applied {
        if outcome.token != self.latest_token {
            debug!(
                token = outcome.token.0,
                latest = self.latest_token.0,
                "discarding stale product fetch"
            );
            return Applied::Stale;
        }

        self.applied_token = Some(outcome.token);
        match outcome.result {
            Ok(page) => {
                self.total_matches = page.total_matches;
                self.total_pages = total_pages(page.total_matches, self.page_size);
                self.products = page.products;
                self.status = FetchStatus::Ready;
            },
            Err(err) => {
                warn!(error = %err, "fetching products failed");
                self.total_matches = 0;
                self.total_pages = 0;
                self.products.clear();
                self.status = FetchStatus::Failed(err.to_string());
            },
        }
        Applied::Current
    }

    /// Token of the fetch whose outcome is currently shown.
    pub fn applied_token(&self) -> Option<RequestToken> {
        self.applied_token
    }
}

/// A page of products together with the number of all matches.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductPage {
    pub total_matches: u64,
    pub products: Vec<Product>,
}

/// Parameters of a started fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingFetch {
    pub token: RequestToken,
    pub page_index: NonZeroU32,
    pub page_size: NonZeroU32,
    pub filter: SearchFilter,
}

/// The result of a fetch, tagged with the token it was started with.
#[derive(Debug)]
pub struct FetchOutcome {
    pub token: RequestToken,
    pub result: Result<ProductPage, CatalogClientError>,
}

impl PendingFetch {
    pub fn query(&self) -> ProductQuery {
        ProductQuery::page(
            PageWindow::for_page(self.page_index, self.page_size),
            self.filter.clone(),
        )
    }

    /// Count the matches, then fetch the page window.
    pub async fn run(self, client: &impl ClientTrait) -> FetchOutcome {
        let result = self.fetch(client).await;
        FetchOutcome {
            token: self.token,
            result,
        }
    }

    async fn fetch(&self, client: &impl ClientTrait) -> Result<ProductPage, CatalogClientError> {
        let total_matches = client.count_products(&self.filter).await?;
        if total_matches == 0 {
            return Ok(ProductPage {
                total_matches,
                products: Vec::new(),
            });
        }
        let products = client.list_products(&self.query()).await?;
        Ok(ProductPage {
            total_matches,
            products,
        })
    }
}
