//! HTTP client for the product API.

use std::collections::VecDeque;
use std::fmt::Debug;
use std::future::{ready, Future};
use std::num::NonZeroU32;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_stream::try_stream;
use enum_dispatch::enum_dispatch;
use futures::stream::Stream;
use futures::TryStreamExt;
use reqwest::header::{self, HeaderMap};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::CatalogClientConfig;
use crate::error::CatalogClientError;
use crate::types::{PageWindow, Product, ProductId, ProductPayload, ProductQuery, SearchFilter};

/// Window size used when walking all records to count matches.
const COUNT_PAGE_SIZE: NonZeroU32 = NonZeroU32::new(1000).unwrap();

const PRODUCTS_PATH: &str = "products";

/// Either a client for the actual product API,
/// or a mock client for testing.
#[derive(Debug)]
#[enum_dispatch(ClientTrait)]
pub enum Client {
    Catalog(CatalogClient),
    Mock(MockClient),
}

/// A client for the product API.
///
/// Handles base URL resolution, default headers, timeouts,
/// and maps every response onto [CatalogClientError].
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: Url,
    config: CatalogClientConfig,
}

impl Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("catalog_url", &self.config.catalog_url)
            .finish_non_exhaustive()
    }
}

impl CatalogClient {
    /// Create a new catalog client from configuration.
    pub fn new(config: CatalogClientConfig) -> Result<Self, CatalogClientError> {
        let base_url = parse_base_url(&config.catalog_url)?;
        let http = build_http_client(&config)?;
        Ok(Self {
            http,
            base_url,
            config,
        })
    }

    /// Get the configured catalog URL.
    pub fn catalog_url(&self) -> &str {
        &self.config.catalog_url
    }

    /// Update the client configuration and recreate the client.
    pub fn update_config(
        &mut self,
        update: impl FnOnce(&mut CatalogClientConfig),
    ) -> Result<(), CatalogClientError> {
        let mut modified_config = self.config.clone();
        update(&mut modified_config);
        *self = Self::new(modified_config)?;
        Ok(())
    }

    fn url(&self, path: &str) -> Result<Url, CatalogClientError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(CatalogClientError::InvalidUrl)
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, CatalogClientError> {
        Ok(self.http.request(method, self.url(path)?))
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, CatalogClientError> {
        let request = self.request(Method::GET, path)?.query(query);
        decode_json(send(request).await?).await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, CatalogClientError> {
        let request = self.request(Method::POST, path)?.json(body);
        decode_json(send(request).await?).await
    }

    pub async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, CatalogClientError> {
        let request = self.request(Method::PUT, path)?.json(body);
        decode_json(send(request).await?).await
    }

    pub async fn patch<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, CatalogClientError> {
        let request = self.request(Method::PATCH, path)?.json(body);
        decode_json(send(request).await?).await
    }

    /// Issue a `DELETE`, the response body is not inspected.
    pub async fn delete(&self, path: &str) -> Result<(), CatalogClientError> {
        let request = self.request(Method::DELETE, path)?;
        send(request).await?;
        Ok(())
    }
}

/// Ensure the base URL ends in a slash so relative joins keep its path.
fn parse_base_url(catalog_url: &str) -> Result<Url, CatalogClientError> {
    let mut base_url = Url::parse(catalog_url).map_err(CatalogClientError::InvalidUrl)?;
    if !base_url.path().ends_with('/') {
        let path = format!("{}/", base_url.path());
        base_url.set_path(&path);
    }
    Ok(base_url)
}

async fn send(request: RequestBuilder) -> Result<reqwest::Response, CatalogClientError> {
    let response = request.send().await.map_err(CatalogClientError::Transport)?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    debug!(%status, body = %body, "request rejected by product API");
    Err(CatalogClientError::Status { status, body })
}

async fn decode_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, CatalogClientError> {
    let bytes = response
        .bytes()
        .await
        .map_err(CatalogClientError::Transport)?;
    serde_json::from_slice(&bytes).map_err(CatalogClientError::Decode)
}

// ---------------------------------------------------------------------------
// Client trait
// ---------------------------------------------------------------------------

/// The product API as used by the console.
///
/// This trait enables alternate implementations:
/// - **HTTP**: REST calls via [`CatalogClient`]
/// - **Mock**: canned responses without HTTP via [`MockClient`]
#[enum_dispatch]
#[allow(async_fn_in_trait)]
pub trait ClientTrait {
    /// Fetch one window of products matching the query.
    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, CatalogClientError>;

    /// Count all products matching the filter.
    async fn count_products(&self, filter: &SearchFilter) -> Result<u64, CatalogClientError>;

    /// Fetch a single product, e.g. to pre-fill an edit form.
    async fn get_product(&self, id: &ProductId) -> Result<Product, CatalogClientError>;

    async fn create_product(&self, payload: &ProductPayload)
        -> Result<Product, CatalogClientError>;

    async fn update_product(
        &self,
        id: &ProductId,
        payload: &ProductPayload,
    ) -> Result<Product, CatalogClientError>;

    async fn delete_product(&self, id: &ProductId) -> Result<(), CatalogClientError>;
}

impl ClientTrait for CatalogClient {
    #[instrument(skip_all, fields(window = ?query.window, filter = %query.filter))]
    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, CatalogClientError> {
        let products: Vec<Product> = self.get(PRODUCTS_PATH, &query.to_params()).await?;
        debug!(n_products = products.len(), "received products");
        Ok(products)
    }

    #[instrument(skip_all, fields(filter = %filter))]
    async fn count_products(&self, filter: &SearchFilter) -> Result<u64, CatalogClientError> {
        let stream = make_window_stream(
            |window| {
                let query = ProductQuery::page(window, filter.clone());
                async move { self.list_products(&query).await }
            },
            COUNT_PAGE_SIZE,
        );
        let count = stream
            .try_fold(0_u64, |count, _| ready(Ok(count + 1)))
            .await?;
        debug!(count, "counted matching products");
        Ok(count)
    }

    #[instrument(skip(self))]
    async fn get_product(&self, id: &ProductId) -> Result<Product, CatalogClientError> {
        self.get(&product_path(id), &[]).await
    }

    #[instrument(skip_all, fields(title = %payload.title))]
    async fn create_product(
        &self,
        payload: &ProductPayload,
    ) -> Result<Product, CatalogClientError> {
        let product: Product = self.post(PRODUCTS_PATH, payload).await?;
        debug!(id = %product.id, "created product");
        Ok(product)
    }

    #[instrument(skip(self, payload))]
    async fn update_product(
        &self,
        id: &ProductId,
        payload: &ProductPayload,
    ) -> Result<Product, CatalogClientError> {
        self.put(&product_path(id), payload).await
    }

    #[instrument(skip(self))]
    async fn delete_product(&self, id: &ProductId) -> Result<(), CatalogClientError> {
        self.delete(&product_path(id)).await?;
        debug!("deleted product");
        Ok(())
    }
}

fn product_path(id: &ProductId) -> String {
    format!("{PRODUCTS_PATH}/{id}")
}

/// Create a stream over all records by requesting consecutive windows.
///
/// Stops after the first window that is not full.
/// A full window starting with the same record as the previous one
/// means the server ignored the offset; it is dropped and the stream ends.
fn make_window_stream<T, E, Fut>(
    generator: impl Fn(PageWindow) -> Fut,
    page_size: NonZeroU32,
) -> impl Stream<Item = Result<T, E>>
where
    T: PartialEq + Clone,
    Fut: Future<Output = Result<Vec<T>, E>>,
{
    try_stream! {
        let mut offset = 0;
        let mut previous_first: Option<T> = None;

        loop {
            let results = generator(PageWindow { offset, limit: page_size.get() }).await?;
            let items_on_page = results.len();

            if previous_first.is_some() && results.first() == previous_first.as_ref() {
                warn!(offset, "server repeated the previous window, ignoring offset");
                break;
            }
            previous_first = results.first().cloned();

            for result in results {
                yield result;
            }

            if items_on_page != page_size.get() as usize {
                break;
            }
            offset += items_on_page as u64;
        }
    }
}

// ---------------------------------------------------------------------------
// Mock client
// ---------------------------------------------------------------------------

// Arc allows you to push things into the client from outside the client if necessary
// Mutex allows you to share across threads (necessary because of tokio)
type MockField<T> = Arc<Mutex<T>>;

/// An error response served by the [MockClient].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenericResponse {
    pub status: u16,
    #[serde(default)]
    pub body: String,
}

/// A canned response served by the [MockClient].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Response {
    Products(Vec<Product>),
    Product(Product),
    Count(u64),
    Deleted,
    Error(GenericResponse),
}

/// A request as seen by the [MockClient].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedRequest {
    List(ProductQuery),
    Count(SearchFilter),
    Get(ProductId),
    Create(ProductPayload),
    Update(ProductId, ProductPayload),
    Delete(ProductId),
}

#[derive(Debug, Error)]
pub enum MockDataError {
    /// Failed to read the mock data file
    #[error("failed to read mock response file")]
    ReadMockFile(#[source] std::io::Error),
    /// Failed to parse the contents of the mock data file as JSON
    #[error("failed to parse mock data as JSON")]
    ParseJson(#[source] serde_json::Error),
}

/// Reads a list of mock responses from disk.
fn read_mock_responses(path: impl AsRef<Path>) -> Result<Vec<Response>, MockDataError> {
    let contents = std::fs::read_to_string(path).map_err(MockDataError::ReadMockFile)?;
    serde_json::from_str(&contents).map_err(MockDataError::ParseJson)
}

/// A client that can be seeded with mock responses.
///
/// Responses are served in the order they were pushed,
/// regardless of which operation asks for them.
#[derive(Debug, Default, Clone)]
pub struct MockClient {
    pub mock_responses: MockField<VecDeque<(Response, Option<Duration>)>>,
    pub requests: MockField<Vec<RecordedRequest>>,
}

impl MockClient {
    /// Create a new mock client, potentially reading mock responses from disk
    pub fn new(mock_data_path: Option<impl AsRef<Path>>) -> Result<Self, MockDataError> {
        let client = Self::default();
        if let Some(path) = mock_data_path {
            for response in read_mock_responses(path)? {
                client.push_response(response);
            }
        }
        Ok(client)
    }

    /// Push a new response into the list of mock responses
    pub fn push_response(&self, response: Response) {
        self.mock_responses
            .lock()
            .expect("couldn't acquire mock lock")
            .push_back((response, None));
    }

    /// Push a response that is only delivered after `delay`
    pub fn push_delayed_response(&self, response: Response, delay: Duration) {
        self.mock_responses
            .lock()
            .expect("couldn't acquire mock lock")
            .push_back((response, Some(delay)));
    }

    /// Push an API error into the list of mock responses
    pub fn push_error_response(&self, status: u16, body: impl Into<String>) {
        self.push_response(Response::Error(GenericResponse {
            status,
            body: body.into(),
        }));
    }

    /// Snapshot of all requests received so far, oldest first.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .expect("couldn't acquire mock lock")
            .clone()
    }

    /// Responses that were pushed but never requested.
    pub fn pending_responses(&self) -> usize {
        self.mock_responses
            .lock()
            .expect("couldn't acquire mock lock")
            .len()
    }

    async fn respond(&self, request: RecordedRequest) -> Result<Response, CatalogClientError> {
        self.requests
            .lock()
            .expect("couldn't acquire mock lock")
            .push(request.clone());

        let next = self
            .mock_responses
            .lock()
            .expect("couldn't acquire mock lock")
            .pop_front();

        let Some((response, delay)) = next else {
            return Err(CatalogClientError::Other(format!(
                "no mock response queued for {request:?}"
            )));
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match response {
            Response::Error(GenericResponse { status, body }) => {
                let status = StatusCode::from_u16(status).map_err(|_| {
                    CatalogClientError::Other(format!("invalid mock status code {status}"))
                })?;
                Err(CatalogClientError::Status { status, body })
            },
            response => Ok(response),
        }
    }
}

fn unexpected_mock(expected: &str, found: Response) -> CatalogClientError {
    CatalogClientError::Other(format!(
        "expected {expected} mock response, found {found:?}"
    ))
}

impl ClientTrait for MockClient {
    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, CatalogClientError> {
        match self.respond(RecordedRequest::List(query.clone())).await? {
            Response::Products(products) => Ok(products),
            other => Err(unexpected_mock("products", other)),
        }
    }

    async fn count_products(&self, filter: &SearchFilter) -> Result<u64, CatalogClientError> {
        match self.respond(RecordedRequest::Count(filter.clone())).await? {
            Response::Count(count) => Ok(count),
            Response::Products(products) => Ok(products.len() as u64),
            other => Err(unexpected_mock("count", other)),
        }
    }

    async fn get_product(&self, id: &ProductId) -> Result<Product, CatalogClientError> {
        match self.respond(RecordedRequest::Get(id.clone())).await? {
            Response::Product(product) => Ok(product),
            other => Err(unexpected_mock("product", other)),
        }
    }

    async fn create_product(
        &self,
        payload: &ProductPayload,
    ) -> Result<Product, CatalogClientError> {
        match self.respond(RecordedRequest::Create(payload.clone())).await? {
            Response::Product(product) => Ok(product),
            other => Err(unexpected_mock("product", other)),
        }
    }

    async fn update_product(
        &self,
        id: &ProductId,
        payload: &ProductPayload,
    ) -> Result<Product, CatalogClientError> {
        match self
            .respond(RecordedRequest::Update(id.clone(), payload.clone()))
            .await?
        {
            Response::Product(product) => Ok(product),
            other => Err(unexpected_mock("product", other)),
        }
    }

    async fn delete_product(&self, id: &ProductId) -> Result<(), CatalogClientError> {
        match self.respond(RecordedRequest::Delete(id.clone())).await? {
            Response::Deleted => Ok(()),
            other => Err(unexpected_mock("deleted", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// HTTP client builder
// ---------------------------------------------------------------------------

/// Build HTTP client with default headers and timeouts.
fn build_http_client(config: &CatalogClientConfig) -> Result<reqwest::Client, CatalogClientError> {
    let mut headers = HeaderMap::new();

    if let Some(token) = &config.auth_token {
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| CatalogClientError::Other(e.to_string()))?,
        );
    }

    for (key, value) in &config.extra_headers {
        headers.insert(
            header::HeaderName::from_str(key).map_err(
                |e: reqwest::header::InvalidHeaderName| CatalogClientError::Other(e.to_string()),
            )?,
            header::HeaderValue::from_str(value).map_err(
                |e: reqwest::header::InvalidHeaderValue| CatalogClientError::Other(e.to_string()),
            )?,
        );
    }

    debug!(
        catalog_url = %config.catalog_url,
        has_token = config.auth_token.is_some(),
        extra_headers = config.extra_headers.len(),
        "building catalog HTTP client"
    );

    let client_builder = reqwest::Client::builder()
        .default_headers(headers)
        .connect_timeout(Duration::from_secs(15))
        .timeout(Duration::from_secs(60));

    let client_builder = if let Some(ref user_agent) = config.user_agent {
        client_builder.user_agent(user_agent)
    } else {
        client_builder
    };

    client_builder
        .build()
        .map_err(|e| CatalogClientError::Other(e.to_string()))
}
