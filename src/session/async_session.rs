//! Async REST session

use super::{ApiResponse, SessionCore};
use crate::config::SessionConfig;
use crate::error::Result;
use crate::http::{ConcurrencyGate, Decision, Outcome, ReqwestTransport, RequestDescriptor, Transport};
use crate::pagination::{page_items, PageAccumulator, PageRequest, Pager, Pages};
use crate::types::JsonValue;
use futures::Stream;
use std::collections::VecDeque;
use tracing::debug;

/// Async Dashboard API session
///
/// Cheap to share by reference across tasks; at most
/// `maximum_concurrent_requests` logical requests run at once; the rest
/// wait for a slot. A slot is held for the whole retry loop of one request
/// (one page, for paginated calls).
pub struct AsyncRestSession<T = ReqwestTransport> {
    core: SessionCore,
    transport: T,
    gate: ConcurrencyGate,
}

impl AsyncRestSession<ReqwestTransport> {
    /// Create a session backed by reqwest
    pub fn new(config: SessionConfig) -> Result<Self> {
        let core = SessionCore::new(config)?;
        let transport = ReqwestTransport::from_config(core.config())?;
        Ok(Self::from_parts(core, transport))
    }
}

impl<T: Transport> AsyncRestSession<T> {
    /// Create a session with a custom transport
    pub fn with_transport(config: SessionConfig, transport: T) -> Result<Self> {
        Ok(Self::from_parts(SessionCore::new(config)?, transport))
    }

    fn from_parts(core: SessionCore, transport: T) -> Self {
        let gate = ConcurrencyGate::new(core.config().maximum_concurrent_requests);
        Self {
            core,
            transport,
            gate,
        }
    }

    /// Session configuration (after environment fallbacks)
    pub fn config(&self) -> &SessionConfig {
        self.core.config()
    }

    /// Logical requests currently holding a concurrency slot
    pub fn in_flight(&self) -> usize {
        self.gate.in_flight()
    }

    /// Send one logical request, retrying per the session's policy
    pub async fn request(&self, request: &RequestDescriptor) -> Result<ApiResponse> {
        if let Some(simulated) = self.core.simulated(request) {
            return Ok(simulated);
        }

        let _slot = self.gate.acquire().await?;
        let mut retries = 0;
        let mut hops = 0;
        let mut redirected_to: Option<String> = None;

        loop {
            let attempt = retries + 1;
            if let Some(limiter) = self.core.limiter() {
                limiter.wait().await;
            }

            let http = self.core.prepare(request, redirected_to.as_deref());
            let url = http.url.clone();
            debug!(method = %request.method, %url, attempt, "Sending request");
            let result = self.transport.send(http).await;

            match self.core.policy().decide(request, Outcome::classify(result), attempt) {
                Decision::Accept(response) => {
                    debug!(method = %request.method, path = %request.path, status = response.status.as_u16(), "Request succeeded");
                    return ApiResponse::from_http(response);
                }
                Decision::Redirect { location, .. } => {
                    redirected_to = Some(self.core.follow_redirect(request, &url, &location, &mut hops)?);
                }
                Decision::Retry {
                    wait,
                    reason,
                    status,
                } => {
                    self.core.log_retry(request, attempt, wait, reason, status);
                    retries = attempt;
                    tokio::time::sleep(wait).await;
                }
                Decision::Fail(err) => {
                    self.core.log_failure(request, &err);
                    return Err(err);
                }
            }
        }
    }

    /// Send a request and return its body
    pub async fn send(&self, request: &RequestDescriptor) -> Result<Option<JsonValue>> {
        Ok(self.request(request).await?.into_body())
    }

    /// GET a resource
    pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Option<JsonValue>> {
        let mut request = RequestDescriptor::get(path);
        for (key, value) in query {
            request = request.query(*key, value);
        }
        self.send(&request).await
    }

    /// POST a JSON body
    pub async fn post(&self, path: &str, body: Option<JsonValue>) -> Result<Option<JsonValue>> {
        self.send(&with_body(RequestDescriptor::post(path), body)).await
    }

    /// PUT a JSON body
    pub async fn put(&self, path: &str, body: Option<JsonValue>) -> Result<Option<JsonValue>> {
        self.send(&with_body(RequestDescriptor::put(path), body)).await
    }

    /// DELETE a resource
    pub async fn delete(&self, path: &str) -> Result<Option<JsonValue>> {
        self.send(&RequestDescriptor::delete(path)).await
    }

    /// Fetch every page within budget and merge them
    ///
    /// An error on any page aborts the whole call; pages already fetched
    /// are discarded.
    pub async fn get_pages(&self, request: PageRequest) -> Result<JsonValue> {
        let mut pager = Pager::new(request);
        let mut merged = PageAccumulator::new(pager.direction());

        while let Some(next) = pager.next_request() {
            let response = self.request(&next).await?;
            let page = pager.record_page(&response.headers, response.body);
            debug!(path = %next.path, page = pager.pages_fetched(), "Fetched page");
            merged.push(page)?;
        }

        Ok(merged.finish())
    }

    /// Lazily iterate over the items of every page within budget
    pub fn iter_pages(&self, request: PageRequest) -> PageStream<'_, T> {
        PageStream {
            session: self,
            pager: Pager::new(request),
            buffer: VecDeque::new(),
            failed: false,
        }
    }

    /// Paginate in the mode selected by `use_iterator_for_get_pages`
    pub async fn pages(&self, request: PageRequest) -> Result<Pages<PageStream<'_, T>>> {
        if self.config().use_iterator_for_get_pages {
            Ok(Pages::Lazy(self.iter_pages(request)))
        } else {
            Ok(Pages::Collected(self.get_pages(request).await?))
        }
    }

    /// Close the session, releasing its connection pool
    pub fn close(self) {
        debug!(in_flight = self.in_flight(), "Closing Dashboard API session");
    }
}

fn with_body(request: RequestDescriptor, body: Option<JsonValue>) -> RequestDescriptor {
    match body {
        Some(body) => request.json(body),
        None => request,
    }
}

impl<T> std::fmt::Debug for AsyncRestSession<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncRestSession")
            .field("core", &self.core)
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}

/// Lazy, single-pass sequence of page items
///
/// Pages are fetched only when the buffered items run out. The sequence is
/// not restartable: build a new one from the session to start over. After
/// an error it yields nothing further.
pub struct PageStream<'a, T> {
    session: &'a AsyncRestSession<T>,
    pager: Pager,
    buffer: VecDeque<JsonValue>,
    failed: bool,
}

impl<'a, T: Transport> PageStream<'a, T> {
    /// Next item, fetching the next page if needed
    ///
    /// Returns `Ok(None)` when all pages within budget are exhausted.
    pub async fn next(&mut self) -> Result<Option<JsonValue>> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Ok(Some(item));
            }
            if self.failed {
                return Ok(None);
            }
            let Some(request) = self.pager.next_request() else {
                return Ok(None);
            };

            let response = match self.session.request(&request).await {
                Ok(response) => response,
                Err(err) => {
                    self.failed = true;
                    return Err(err);
                }
            };
            let page = self.pager.record_page(&response.headers, response.body);
            debug!(path = %request.path, page = self.pager.pages_fetched(), "Fetched page");
            self.buffer.extend(page_items(page));
        }
    }

    /// Pages fetched so far
    pub fn pages_fetched(&self) -> u32 {
        self.pager.pages_fetched()
    }

    /// Collect all remaining items into a `Vec`
    pub async fn collect_all(mut self) -> Result<Vec<JsonValue>> {
        let mut all = Vec::new();
        while let Some(item) = self.next().await? {
            all.push(item);
        }
        Ok(all)
    }

    /// Adapt into a [`futures::Stream`]
    pub fn into_stream(self) -> impl Stream<Item = Result<JsonValue>> + 'a
    where
        T: 'a,
    {
        futures::stream::unfold(self, |mut stream| async move {
            match stream.next().await {
                Ok(Some(item)) => Some((Ok(item), stream)),
                Ok(None) => None,
                Err(err) => Some((Err(err), stream)),
            }
        })
    }
}
